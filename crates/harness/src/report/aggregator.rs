//! Event consumer that builds the suite report.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::document::{ReportDocument, SuiteCounters};
use crate::error::Result;
use crate::events::{EventStage, ExecutionEvent};
use crate::record::{ExecutionRecord, RecordKey, RecordStore, TestStatus};
use crate::retry::RetryPolicy;

/// Accumulates lifecycle events into the [`ReportDocument`].
///
/// Runs as the last bus stage so diagnostics artifacts are already
/// attached when a record is finalized. The document sits behind one
/// lock; counters update atomically with each append, which is the
/// serializing discipline for concurrent worker finalization.
pub struct ReportAggregator {
	store: RecordStore,
	policy: RetryPolicy,
	document: Mutex<ReportDocument>,
	reports_dir: PathBuf,
}

impl ReportAggregator {
	pub fn new(store: RecordStore, policy: RetryPolicy, suite: impl Into<String>, metadata: BTreeMap<String, String>, reports_dir: PathBuf) -> Self {
		Self {
			store,
			policy,
			document: Mutex::new(ReportDocument::new(suite, metadata)),
			reports_dir,
		}
	}

	async fn on_started(&self, key: &RecordKey, tags: &[String], description: &Option<String>) {
		let created = self.store.open(key.clone(), tags.to_vec(), description.clone()).await;
		if created {
			info!(target = "harness.report", test = %key, "test started");
		} else {
			// At-least-once delivery or a retry re-start; resume.
			debug!(target = "harness.report", test = %key, "started event for open record; resuming");
		}
	}

	async fn on_outcome(&self, key: &RecordKey, status: TestStatus, error: Option<&crate::record::ErrorInfo>) {
		let policy = self.policy;
		let decision = self
			.store
			.with_record(key, |record| {
				if let Some(error) = error {
					record.push_error(error.clone());
				}
				record.status = status;
				if status == TestStatus::Failed && policy.should_retry(record) {
					false
				} else {
					record.finished_at = Some(Utc::now());
					true
				}
			})
			.await;

		match decision {
			None => {
				// Terminal status is immutable; late duplicates are dropped.
				warn!(target = "harness.report", test = %key, "outcome for unknown or finalized record; ignoring");
			}
			Some(false) => {
				debug!(target = "harness.report", test = %key, "record stays open for retry");
			}
			Some(true) => {
				if let Some(record) = self.store.take(key).await {
					self.finalize(record).await;
				}
			}
		}
	}

	async fn finalize(&self, record: ExecutionRecord) {
		info!(
			target = "harness.report",
			test = %record.key,
			status = %record.status,
			attempts = record.attempts,
			artifacts = record.artifacts.len(),
			"test finalized"
		);
		self.document.lock().await.append(record);
	}

	pub(crate) async fn seal_and_flush(&self) -> Result<PathBuf> {
		let mut document = self.document.lock().await;
		let counters = document.counters;
		info!(
			target = "harness.report",
			suite = %document.suite,
			total = counters.total(),
			passed = counters.passed,
			failed = counters.failed,
			skipped = counters.skipped,
			"suite finished"
		);
		document.flush(&self.reports_dir).await
	}

	/// Current counters snapshot.
	pub async fn counters(&self) -> SuiteCounters {
		self.document.lock().await.counters
	}

	/// Most recent finalized record for `key`.
	pub async fn finalized(&self, key: &RecordKey) -> Option<ExecutionRecord> {
		self.document.lock().await.latest(key).cloned()
	}

	/// Clone of the current document state.
	pub async fn snapshot(&self) -> ReportDocument {
		self.document.lock().await.clone()
	}
}

#[async_trait]
impl EventStage for ReportAggregator {
	fn name(&self) -> &'static str {
		"report-aggregator"
	}

	async fn on_event(&self, event: &ExecutionEvent) -> Result<()> {
		match event {
			ExecutionEvent::Started { key, tags, description, .. } => {
				self.on_started(key, tags, description).await;
			}
			ExecutionEvent::Outcome { key, status, error, .. } => {
				self.on_outcome(key, *status, error.as_ref()).await;
			}
			ExecutionEvent::SuiteFinished => {
				self.seal_and_flush().await?;
			}
		}
		Ok(())
	}
}
