//! wd-harness: a test execution harness for browser-driven acceptance
//! suites.
//!
//! The harness owns the machinery around a suite run: per-worker
//! session bookkeeping, failure-driven retries, an ordered event
//! pipeline for diagnostics and reporting, and a JSON suite report.
//! Test bodies receive a live [`Session`] and stay unaware of all of
//! it.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use harness::{HarnessConfig, Suite, TestCase, assertion};
//!
//! #[tokio::main]
//! async fn main() -> harness::Result<()> {
//!     harness::init_logging(1);
//!
//!     let mut config = HarnessConfig::load("harness.json")?;
//!     config.apply_env_overrides();
//!
//!     let backend: Arc<dyn wd_protocol::AutomationBackend> = make_backend();
//!
//!     let report = Suite::new("smoke")
//!         .case(TestCase::new("landing page title", |session| async move {
//!             session.navigate("https://qa.example.com").await?;
//!             Ok(())
//!         }))
//!         .case(TestCase::new("search returns results", |session| async move {
//!             let shot = session.screenshot().await?;
//!             if shot.is_empty() {
//!                 return Err(assertion!("blank page"));
//!             }
//!             Ok(())
//!         }))
//!         .run(config, backend)
//!         .await?;
//!
//!     println!("passed {} / {}", report.counters.passed, report.counters.total());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod logging;
pub mod record;
pub mod report;
pub mod retry;
pub mod runner;
pub mod session;
pub mod suite;
pub mod worker;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::HarnessConfig;
pub use diagnostics::DiagnosticsCapturer;
pub use error::{HarnessError, Result};
pub use events::{EventBus, EventStage, ExecutionEvent};
pub use logging::init_logging;
pub use record::{ArtifactRef, ErrorInfo, ExecutionRecord, RecordKey, RecordStore, TestStatus};
pub use report::{ReportAggregator, ReportDocument, SuiteCounters};
pub use retry::RetryPolicy;
pub use runner::{Harness, TestInfo};
pub use session::{Session, SessionRegistry, SessionState};
pub use suite::{Suite, TestCase};
pub use worker::WorkerId;

// Collaborator contract types live in wd-protocol.
pub use wd_protocol;
