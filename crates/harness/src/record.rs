//! Execution records and the in-flight record store.
//!
//! A record is open from its `Started` event until the aggregator
//! finalizes it; open records live in the shared [`RecordStore`] so
//! the diagnostics stage can attach artifacts before finalization.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::HarnessError;

/// Test identity: name plus an optional parameter signature so each
/// data-driven row gets its own record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
	pub name: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub params: Option<String>,
}

impl RecordKey {
	pub fn new(name: impl Into<String>) -> Self {
		Self { name: name.into(), params: None }
	}

	pub fn with_params(name: impl Into<String>, params: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			params: Some(params.into()),
		}
	}
}

impl std::fmt::Display for RecordKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match &self.params {
			Some(params) => write!(f, "{}[{}]", self.name, params),
			None => write!(f, "{}", self.name),
		}
	}
}

/// Execution status of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
	Running,
	Passed,
	Failed,
	Skipped,
}

impl TestStatus {
	/// Whether this status finalizes a record (barring a retry).
	pub fn is_terminal(self) -> bool {
		!matches!(self, TestStatus::Running)
	}
}

impl std::fmt::Display for TestStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			TestStatus::Running => write!(f, "running"),
			TestStatus::Passed => write!(f, "passed"),
			TestStatus::Failed => write!(f, "failed"),
			TestStatus::Skipped => write!(f, "skipped"),
		}
	}
}

/// Error captured from one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
	/// Stable category label, see [`HarnessError::kind`].
	pub kind: String,
	pub message: String,
	/// Fatal setup errors are recorded but never retried.
	#[serde(default = "retryable_default")]
	pub retryable: bool,
}

fn retryable_default() -> bool {
	true
}

impl ErrorInfo {
	pub fn from_error(err: &HarnessError) -> Self {
		Self {
			kind: err.kind().to_string(),
			message: err.to_string(),
			retryable: !err.is_fatal_for_worker(),
		}
	}
}

/// Reference to a captured diagnostic artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRef {
	/// Artifact kind, e.g. "screenshot".
	pub kind: String,
	pub path: PathBuf,
}

/// Per-test execution record.
///
/// Attempt counting: `attempts` is 1 on the first run and bumped by
/// the retry policy, so `attempts <= max_retries + 1` holds at
/// finalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
	pub key: RecordKey,
	pub status: TestStatus,
	pub attempts: u32,
	/// Most recent error; authoritative for reporting.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub last_error: Option<ErrorInfo>,
	/// Errors from every failed attempt, oldest first.
	pub error_history: Vec<ErrorInfo>,
	pub artifacts: Vec<ArtifactRef>,
	/// Ordered category tags (test groups).
	pub tags: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	pub started_at: DateTime<Utc>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub finished_at: Option<DateTime<Utc>>,
}

impl ExecutionRecord {
	pub fn open(key: RecordKey, tags: Vec<String>, description: Option<String>) -> Self {
		Self {
			key,
			status: TestStatus::Running,
			attempts: 1,
			last_error: None,
			error_history: Vec::new(),
			artifacts: Vec::new(),
			tags,
			description,
			started_at: Utc::now(),
			finished_at: None,
		}
	}

	/// Records an attempt error without dropping earlier ones.
	pub fn push_error(&mut self, error: ErrorInfo) {
		self.last_error = Some(error.clone());
		self.error_history.push(error);
	}
}

/// Shared store of open (not yet finalized) records.
#[derive(Default, Clone)]
pub struct RecordStore {
	inner: Arc<Mutex<HashMap<RecordKey, ExecutionRecord>>>,
}

impl RecordStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Opens a record, or resumes it when already open (duplicate
	/// `Started` deliveries and retry re-starts are no-ops).
	///
	/// Returns true when a new record was created.
	pub async fn open(&self, key: RecordKey, tags: Vec<String>, description: Option<String>) -> bool {
		let mut records = self.inner.lock().await;
		if records.contains_key(&key) {
			return false;
		}
		records.insert(key.clone(), ExecutionRecord::open(key, tags, description));
		true
	}

	/// Runs `f` against the open record for `key`, if any.
	pub async fn with_record<T>(&self, key: &RecordKey, f: impl FnOnce(&mut ExecutionRecord) -> T) -> Option<T> {
		let mut records = self.inner.lock().await;
		records.get_mut(key).map(f)
	}

	/// Removes and returns the open record for `key`.
	pub async fn take(&self, key: &RecordKey) -> Option<ExecutionRecord> {
		self.inner.lock().await.remove(key)
	}

	/// Whether a record is still open.
	pub async fn is_open(&self, key: &RecordKey) -> bool {
		self.inner.lock().await.contains_key(key)
	}

	/// Appends an artifact to the open record for `key`.
	pub async fn attach_artifact(&self, key: &RecordKey, artifact: ArtifactRef) -> bool {
		self.with_record(key, |record| record.artifacts.push(artifact)).await.is_some()
	}
}
