//! # Record Types
//!
//! Upstream query responses, their normalized per-device form, and the
//! merged per-metric records handed to the storage service.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use super::metrics::{DeviceClass, MetricData, MetricName};
use super::page::PageId;

/// Envelope returned by `records:queryRecord`
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRecordResponse {
    pub record: DeviceRecord,
}

/// Raw field data for one (page, device class) pair
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeviceRecord {
    #[serde(default)]
    pub key: RecordKey,
    #[serde(default)]
    pub metrics: BTreeMap<String, MetricData>,
}

/// Identifies what an upstream record describes
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordKey {
    pub form_factor: Option<String>,
    pub origin: Option<String>,
    pub url: Option<String>,
}

/// One metric of one device response after normalization
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMetric {
    pub name: MetricName,
    pub device: DeviceClass,
    pub data: MetricData,
}

/// One metric's data for every device class that reported it
///
/// Serialized as `{"_id": .., "name": .., "PHONE": {..}, "DESKTOP": {..}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedMetric {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: MetricName,
    #[serde(flatten)]
    pub devices: BTreeMap<DeviceClass, MetricData>,
}

impl MergedMetric {
    #[must_use]
    pub fn device(&self, device: DeviceClass) -> Option<&MetricData> {
        self.devices.get(&device)
    }
}

/// A metric some device class did not report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricGap {
    pub metric: MetricName,
    pub device: DeviceClass,
}

impl fmt::Display for MetricGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} missing for {}", self.metric, self.device)
    }
}

/// Result of joining the per-device sequences of one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    pub metrics: Vec<MergedMetric>,
    pub gaps: Vec<MetricGap>,
}

impl MergeOutcome {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.gaps.is_empty()
    }
}

/// Payload of `POST /records`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecordRequest {
    pub page_id: PageId,
    pub metrics: Vec<MergedMetric>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_data(p75: u64) -> MetricData {
        MetricData::new(json!([]), json!({ "p75": p75 }))
    }

    #[test]
    fn query_response_decodes_upstream_shape() {
        let raw = json!({
            "record": {
                "key": { "formFactor": "PHONE", "origin": "https://a.test" },
                "metrics": {
                    "first_contentful_paint": { "histogram": [], "percentiles": { "p75": 1000 } }
                }
            },
            "urlNormalizationDetails": { "originalUrl": "https://a.test/" }
        });
        let response: QueryRecordResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(response.record.key.form_factor.as_deref(), Some("PHONE"));
        assert_eq!(response.record.metrics.len(), 1);
        assert_eq!(
            response.record.metrics["first_contentful_paint"],
            sample_data(1000)
        );
    }

    #[test]
    fn merged_metric_serializes_devices_as_top_level_keys() {
        let id = Uuid::new_v4();
        let metric = MergedMetric {
            id,
            name: MetricName::FirstContentfulPaint,
            devices: BTreeMap::from([
                (DeviceClass::Phone, sample_data(1000)),
                (DeviceClass::Desktop, sample_data(800)),
            ]),
        };

        let value = serde_json::to_value(&metric).unwrap();
        assert_eq!(value["_id"], json!(id.to_string()));
        assert_eq!(value["name"], json!("first_contentful_paint"));
        assert_eq!(value["PHONE"]["percentiles"]["p75"], json!(1000));
        assert_eq!(value["DESKTOP"]["percentiles"]["p75"], json!(800));
        assert!(value.get("TABLET").is_none());
    }

    #[test]
    fn stored_record_request_uses_camel_case_page_id() {
        let request = StoredRecordRequest {
            page_id: PageId::new("p1"),
            metrics: Vec::new(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "pageId": "p1", "metrics": [] })
        );
    }

    #[test]
    fn metric_gap_describes_missing_device() {
        let gap = MetricGap {
            metric: MetricName::FirstInputDelay,
            device: DeviceClass::Desktop,
        };
        assert_eq!(gap.to_string(), "first_input_delay missing for DESKTOP");
    }
}
