//! Execution report construction and persistence.
//!
//! The aggregator consumes lifecycle events into an in-memory
//! [`ReportDocument`] that seals and flushes to disk at suite end.

/// Persisted report document and suite counters.
pub mod document;

mod aggregator;

pub use aggregator::ReportAggregator;
pub use document::{ReportDocument, SuiteCounters};
