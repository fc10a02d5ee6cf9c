//! Suite report document.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::record::{ExecutionRecord, TestStatus};

/// Suite-level pass/fail/skip totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteCounters {
	pub passed: u32,
	pub failed: u32,
	pub skipped: u32,
}

impl SuiteCounters {
	pub fn total(&self) -> u32 {
		self.passed + self.failed + self.skipped
	}

	fn count(&mut self, status: TestStatus) {
		match status {
			TestStatus::Passed => self.passed += 1,
			TestStatus::Failed => self.failed += 1,
			TestStatus::Skipped => self.skipped += 1,
			TestStatus::Running => {}
		}
	}
}

/// One suite run's execution report.
///
/// Append-only while the run is live; immutable once sealed. Records
/// appear in finalization order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument {
	pub suite: String,
	pub started_at: DateTime<Utc>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub finished_at: Option<DateTime<Utc>>,
	pub records: Vec<ExecutionRecord>,
	pub counters: SuiteCounters,
	/// System metadata (os, browser, environment, ...).
	pub metadata: BTreeMap<String, String>,
	#[serde(skip)]
	flushed_to: Option<PathBuf>,
}

impl ReportDocument {
	pub fn new(suite: impl Into<String>, metadata: BTreeMap<String, String>) -> Self {
		Self {
			suite: suite.into(),
			started_at: Utc::now(),
			finished_at: None,
			records: Vec::new(),
			counters: SuiteCounters::default(),
			metadata,
			flushed_to: None,
		}
	}

	pub fn is_sealed(&self) -> bool {
		self.finished_at.is_some()
	}

	/// Appends a finalized record and updates the suite counters in
	/// the same step. Appends after sealing are dropped with a warning
	/// rather than corrupting a flushed report.
	pub fn append(&mut self, record: ExecutionRecord) {
		if self.is_sealed() {
			warn!(target = "harness.report", test = %record.key, "record finalized after seal; dropping");
			return;
		}
		self.counters.count(record.status);
		self.records.push(record);
	}

	/// Marks the run finished. Idempotent.
	pub fn seal(&mut self) {
		if self.finished_at.is_none() {
			self.finished_at = Some(Utc::now());
		}
	}

	/// Writes the document as JSON under `dir` with a timestamped
	/// name. A second flush is a no-op returning the original path,
	/// since teardown paths may flush more than once.
	pub async fn flush(&mut self, dir: &Path) -> Result<PathBuf> {
		if let Some(path) = &self.flushed_to {
			return Ok(path.clone());
		}
		self.seal();

		tokio::fs::create_dir_all(dir).await?;
		let name = format!("report_{}.json", self.started_at.format("%Y-%m-%d_%H-%M-%S"));
		let path = dir.join(name);
		tokio::fs::write(&path, serde_json::to_vec_pretty(self)?).await?;

		info!(
			target = "harness.report",
			suite = %self.suite,
			path = %path.display(),
			passed = self.counters.passed,
			failed = self.counters.failed,
			skipped = self.counters.skipped,
			"report flushed"
		);
		self.flushed_to = Some(path.clone());
		Ok(path)
	}

	/// Where this document was flushed, once it has been.
	pub fn flushed_path(&self) -> Option<&Path> {
		self.flushed_to.as_deref()
	}

	/// Most recent finalized record for a test identity.
	pub fn latest(&self, key: &crate::record::RecordKey) -> Option<&ExecutionRecord> {
		self.records.iter().rev().find(|r| &r.key == key)
	}
}
