//! Collection pipeline
//!
//! list pages -> fetch per device -> normalize -> merge -> store,
//! driven by the [`CollectionOrchestrator`] and triggered by the
//! [`CollectionScheduler`].

pub mod fetcher;
pub mod merger;
pub mod normalizer;
pub mod orchestrator;
pub mod scheduler;

pub use fetcher::RecordFetcher;
pub use merger::{DeviceMetrics, merge};
pub use normalizer::normalize;
pub use orchestrator::{CollectionOrchestrator, PageOutcome, RunSummary};
pub use scheduler::CollectionScheduler;
