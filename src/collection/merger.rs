//! # Record Merger
//!
//! Joins the normalized sequences of every device class for one page into a
//! single list of per-metric records. The join is keyed by metric name, so
//! devices reporting different metric sets never misalign; each metric a
//! device did not report becomes a [`MetricGap`].

use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::{
    DeviceClass, MergeOutcome, MergedMetric, MetricData, MetricGap, MetricName, NormalizedMetric,
};

/// Normalized metrics for one device; `None` when that device's fetch failed
pub type DeviceMetrics = (DeviceClass, Option<Vec<NormalizedMetric>>);

/// Merge per-device sequences, given in configured device order
///
/// Output metrics follow canonical order over the union of reported metrics.
/// A device absent from the input, or present with `None`, contributes a gap
/// for every output metric.
pub fn merge(devices: Vec<DeviceMetrics>) -> MergeOutcome {
    let device_order: Vec<DeviceClass> = devices.iter().map(|(device, _)| *device).collect();

    let mut by_metric: BTreeMap<MetricName, BTreeMap<DeviceClass, MetricData>> = BTreeMap::new();
    for (device, metrics) in devices {
        for metric in metrics.into_iter().flatten() {
            by_metric
                .entry(metric.name)
                .or_default()
                .insert(device, metric.data);
        }
    }

    let mut outcome = MergeOutcome::default();
    for (name, reported) in by_metric {
        outcome.gaps.extend(
            device_order
                .iter()
                .filter(|device| !reported.contains_key(device))
                .map(|device| MetricGap {
                    metric: name.clone(),
                    device: *device,
                }),
        );

        outcome.metrics.push(MergedMetric {
            id: Uuid::new_v4(),
            name,
            devices: reported,
        });
    }

    outcome
}
