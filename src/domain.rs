//! Domain module - Core types of the Web Vitals collector
//!
//! Pure data types (pages, device classes, metrics, merged records) and the
//! repository seams the collection pipeline talks through. Nothing here
//! performs I/O.

pub mod metrics;
pub mod page;
pub mod records;
pub mod repositories;

// Re-export commonly used items
pub use metrics::{DeviceClass, MetricData, MetricName, CANONICAL_METRIC_ORDER};
pub use page::{Page, PageId};
pub use records::{
    DeviceRecord, MergeOutcome, MergedMetric, MetricGap, NormalizedMetric, QueryRecordResponse,
    RecordKey, StoredRecordRequest,
};
pub use repositories::{PageRepository, RecordSource};
