//! # Metric Value Objects
//!
//! Device classes (form factors), metric names with their canonical ordering,
//! and the opaque per-metric payload forwarded from the upstream API.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Form factor the upstream API segments field data by
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceClass {
    Phone,
    Desktop,
    Tablet,
}

impl DeviceClass {
    /// Wire label used by the upstream API and in merged records
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Phone => "PHONE",
            Self::Desktop => "DESKTOP",
            Self::Tablet => "TABLET",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PHONE" => Ok(Self::Phone),
            "DESKTOP" => Ok(Self::Desktop),
            "TABLET" => Ok(Self::Tablet),
            other => Err(format!("Unknown device class: {other}")),
        }
    }
}

/// Metric identifier as reported by the upstream API
///
/// The four Core Web Vitals get dedicated variants; anything else the API
/// returns is carried through as [`MetricName::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetricName {
    LargestContentfulPaint,
    FirstInputDelay,
    CumulativeLayoutShift,
    FirstContentfulPaint,
    Other(String),
}

/// Canonical output order of merged metrics
pub const CANONICAL_METRIC_ORDER: [MetricName; 4] = [
    MetricName::LargestContentfulPaint,
    MetricName::FirstInputDelay,
    MetricName::CumulativeLayoutShift,
    MetricName::FirstContentfulPaint,
];

impl MetricName {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::LargestContentfulPaint => "largest_contentful_paint",
            Self::FirstInputDelay => "first_input_delay",
            Self::CumulativeLayoutShift => "cumulative_layout_shift",
            Self::FirstContentfulPaint => "first_contentful_paint",
            Self::Other(name) => name,
        }
    }

    /// Position within [`CANONICAL_METRIC_ORDER`], `None` for unrecognised metrics
    #[must_use]
    pub fn canonical_index(&self) -> Option<usize> {
        CANONICAL_METRIC_ORDER.iter().position(|known| known == self)
    }

    /// Returns true for the four recognised Core Web Vitals
    #[must_use]
    pub fn is_canonical(&self) -> bool {
        self.canonical_index().is_some()
    }
}

impl From<&str> for MetricName {
    fn from(name: &str) -> Self {
        match name {
            "largest_contentful_paint" => Self::LargestContentfulPaint,
            "first_input_delay" => Self::FirstInputDelay,
            "cumulative_layout_shift" => Self::CumulativeLayoutShift,
            "first_contentful_paint" => Self::FirstContentfulPaint,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for MetricName {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Canonical metrics first in canonical order, unrecognised metrics after them by name.
impl Ord for MetricName {
    fn cmp(&self, other: &Self) -> Ordering {
        let rank = |name: &Self| name.canonical_index().unwrap_or(CANONICAL_METRIC_ORDER.len());
        rank(self)
            .cmp(&rank(other))
            .then_with(|| self.as_str().cmp(other.as_str()))
    }
}

impl PartialOrd for MetricName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for MetricName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MetricName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from(name))
    }
}

/// Distribution data for one metric on one device, forwarded untouched
///
/// Some metrics carry no histogram; an absent part stays absent on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub histogram: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentiles: Option<serde_json::Value>,
}

impl MetricData {
    pub fn new(histogram: serde_json::Value, percentiles: serde_json::Value) -> Self {
        Self {
            histogram: Some(histogram),
            percentiles: Some(percentiles),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("PHONE", DeviceClass::Phone)]
    #[case("desktop", DeviceClass::Desktop)]
    #[case(" Tablet ", DeviceClass::Tablet)]
    fn device_class_parses_labels(#[case] label: &str, #[case] expected: DeviceClass) {
        assert_eq!(label.parse::<DeviceClass>().unwrap(), expected);
    }

    #[test]
    fn device_class_rejects_unknown_label() {
        assert!("ALL_FORM_FACTORS".parse::<DeviceClass>().is_err());
    }

    #[test]
    fn device_class_serializes_as_upstream_label() {
        let json = serde_json::to_string(&DeviceClass::Phone).unwrap();
        assert_eq!(json, "\"PHONE\"");
        let back: DeviceClass = serde_json::from_str("\"DESKTOP\"").unwrap();
        assert_eq!(back, DeviceClass::Desktop);
    }

    #[test]
    fn canonical_metrics_sort_in_declared_order() {
        let mut names: Vec<MetricName> = vec![
            "first_contentful_paint".into(),
            "cumulative_layout_shift".into(),
            "largest_contentful_paint".into(),
            "first_input_delay".into(),
        ];
        names.sort();
        assert_eq!(names, CANONICAL_METRIC_ORDER.to_vec());
    }

    #[test]
    fn unknown_metrics_sort_after_canonical_ones() {
        let mut names: Vec<MetricName> = vec![
            "interaction_to_next_paint".into(),
            "first_input_delay".into(),
            "experimental_time_to_first_byte".into(),
        ];
        names.sort();
        assert_eq!(
            names,
            vec![
                MetricName::FirstInputDelay,
                MetricName::Other("experimental_time_to_first_byte".to_string()),
                MetricName::Other("interaction_to_next_paint".to_string()),
            ]
        );
    }

    #[test]
    fn metric_name_round_trips_through_its_string_form() {
        let name: MetricName = serde_json::from_str("\"cumulative_layout_shift\"").unwrap();
        assert_eq!(name, MetricName::CumulativeLayoutShift);
        assert!(name.is_canonical());
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"cumulative_layout_shift\"");

        let other = MetricName::from("round_trip_time");
        assert_eq!(other.canonical_index(), None);
        assert_eq!(other.to_string(), "round_trip_time");
    }

    #[test]
    fn metric_data_keeps_payload_verbatim() {
        let raw = serde_json::json!({
            "histogram": [{"start": 0, "end": 2500, "density": 0.81}],
            "percentiles": {"p75": "0.05"}
        });
        let data: MetricData = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&data).unwrap(), raw);
    }

    #[test]
    fn missing_parts_are_left_out_of_the_payload() {
        let raw = serde_json::json!({ "percentiles": { "p75": 120 } });
        let data: MetricData = serde_json::from_value(raw.clone()).unwrap();
        assert!(data.histogram.is_none());

        let encoded = serde_json::to_value(&data).unwrap();
        assert_eq!(encoded, raw);
        assert!(encoded.get("histogram").is_none());

        let fractions_only: MetricData =
            serde_json::from_value(serde_json::json!({ "fractions": { "navigate": 0.9 } })).unwrap();
        assert_eq!(serde_json::to_value(&fractions_only).unwrap(), serde_json::json!({}));
    }
}
