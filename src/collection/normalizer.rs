//! # Metric Normalizer
//!
//! Turns one device's upstream record into a canonically ordered sequence of
//! single-metric entries tagged with the device class.

use crate::domain::{DeviceClass, DeviceRecord, MetricName, NormalizedMetric};

/// Order the record's metrics canonically and tag each with `device`
///
/// Canonical metrics come first in canonical order; metrics outside the
/// canonical list follow them, ordered by name. The sort is stable.
pub fn normalize(record: DeviceRecord, device: DeviceClass) -> Vec<NormalizedMetric> {
    if let Some(form_factor) = record.key.form_factor.as_deref() {
        if form_factor != device.as_str() {
            tracing::warn!(
                "Upstream answered a {} query with a {} record",
                device,
                form_factor
            );
        }
    }

    let mut entries: Vec<(MetricName, _)> = record
        .metrics
        .into_iter()
        .map(|(name, data)| (MetricName::from(name), data))
        .collect();
    entries.sort_by(|(a, _), (b, _)| a.cmp(b));

    entries
        .into_iter()
        .map(|(name, data)| NormalizedMetric { name, device, data })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MetricData, RecordKey, CANONICAL_METRIC_ORDER};
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn data(p75: u64) -> MetricData {
        MetricData::new(json!([]), json!({ "p75": p75 }))
    }

    fn record(form_factor: &str, names: &[&str]) -> DeviceRecord {
        DeviceRecord {
            key: RecordKey {
                form_factor: Some(form_factor.to_string()),
                ..RecordKey::default()
            },
            metrics: names
                .iter()
                .enumerate()
                .map(|(i, name)| ((*name).to_string(), data(i as u64)))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn full_record_comes_out_in_canonical_order() {
        let normalized = normalize(
            record(
                "PHONE",
                &[
                    "first_contentful_paint",
                    "cumulative_layout_shift",
                    "first_input_delay",
                    "largest_contentful_paint",
                ],
            ),
            DeviceClass::Phone,
        );

        let names: Vec<_> = normalized.iter().map(|m| m.name.clone()).collect();
        assert_eq!(names, CANONICAL_METRIC_ORDER.to_vec());
        assert!(normalized.iter().all(|m| m.device == DeviceClass::Phone));
    }

    #[test]
    fn payload_is_carried_unchanged() {
        let mut raw = record("DESKTOP", &[]);
        raw.metrics
            .insert("first_contentful_paint".to_string(), data(1000));

        let normalized = normalize(raw, DeviceClass::Desktop);
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].name, MetricName::FirstContentfulPaint);
        assert_eq!(normalized[0].data, data(1000));
    }

    #[test]
    fn omitted_metrics_shorten_the_sequence() {
        let normalized = normalize(
            record("PHONE", &["first_contentful_paint", "largest_contentful_paint"]),
            DeviceClass::Phone,
        );
        let names: Vec<_> = normalized.iter().map(|m| m.name.as_str().to_string()).collect();
        assert_eq!(names, ["largest_contentful_paint", "first_contentful_paint"]);
    }

    #[test]
    fn unknown_metrics_follow_canonical_ones() {
        let normalized = normalize(
            record(
                "PHONE",
                &[
                    "interaction_to_next_paint",
                    "first_input_delay",
                    "experimental_time_to_first_byte",
                ],
            ),
            DeviceClass::Phone,
        );
        let names: Vec<_> = normalized.iter().map(|m| m.name.as_str().to_string()).collect();
        assert_eq!(
            names,
            [
                "first_input_delay",
                "experimental_time_to_first_byte",
                "interaction_to_next_paint"
            ]
        );
    }

    #[test]
    fn empty_record_normalizes_to_nothing() {
        assert!(normalize(record("TABLET", &[]), DeviceClass::Tablet).is_empty());
    }

    #[test]
    fn mismatched_form_factor_keeps_requested_device() {
        let normalized = normalize(
            record("DESKTOP", &["first_input_delay"]),
            DeviceClass::Phone,
        );
        assert_eq!(normalized[0].device, DeviceClass::Phone);
    }

    const POOL: [&str; 7] = [
        "largest_contentful_paint",
        "first_input_delay",
        "cumulative_layout_shift",
        "first_contentful_paint",
        "interaction_to_next_paint",
        "experimental_time_to_first_byte",
        "round_trip_time",
    ];

    proptest! {
        #[test]
        fn output_is_sorted_by_canonical_rank(
            names in proptest::sample::subsequence(POOL.to_vec(), 0..=POOL.len())
                .prop_shuffle()
        ) {
            let normalized = normalize(record("PHONE", &names), DeviceClass::Phone);

            prop_assert_eq!(normalized.len(), names.len());
            for pair in normalized.windows(2) {
                prop_assert!(pair[0].name < pair[1].name);
            }

            let first_unknown = normalized.iter().position(|m| !m.name.is_canonical());
            if let Some(boundary) = first_unknown {
                prop_assert!(normalized[boundary..].iter().all(|m| !m.name.is_canonical()));
            }
        }
    }
}
