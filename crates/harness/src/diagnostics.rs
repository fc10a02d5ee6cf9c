//! Failure snapshot capture.
//!
//! Registered on the bus ahead of the report aggregator, so captured
//! artifacts are attached to the still-open record before it is
//! finalized. Capture problems are logged and never escalated: a
//! failing screenshot must not change a test's outcome.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{HarnessError, Result};
use crate::events::{EventStage, ExecutionEvent};
use crate::record::{ArtifactRef, RecordKey, RecordStore, TestStatus};
use crate::retry::RetryPolicy;
use crate::session::SessionRegistry;
use crate::worker::WorkerId;

/// Captures a screenshot from the worker's current session when a
/// test reaches a terminal outcome.
pub struct DiagnosticsCapturer {
	registry: Arc<SessionRegistry>,
	store: RecordStore,
	policy: RetryPolicy,
	capture_on_fail: bool,
	capture_on_pass: bool,
	screenshots_dir: PathBuf,
}

impl DiagnosticsCapturer {
	pub fn new(
		registry: Arc<SessionRegistry>,
		store: RecordStore,
		policy: RetryPolicy,
		capture_on_fail: bool,
		capture_on_pass: bool,
		screenshots_dir: PathBuf,
	) -> Self {
		Self {
			registry,
			store,
			policy,
			capture_on_fail,
			capture_on_pass,
			screenshots_dir,
		}
	}

	fn wants_capture(&self, status: TestStatus) -> bool {
		match status {
			TestStatus::Failed => self.capture_on_fail,
			TestStatus::Passed => self.capture_on_pass,
			_ => false,
		}
	}

	async fn handle_outcome(&self, worker: WorkerId, key: &RecordKey, status: TestStatus) {
		if !self.wants_capture(status) {
			return;
		}

		// Look ahead at the retry decision: intermediate failures get
		// their screenshot on the terminal attempt only.
		let Some(attempts) = self.store.with_record(key, |r| r.attempts).await else {
			debug!(target = "harness.diagnostics", test = %key, "no open record; skipping capture");
			return;
		};
		if self.policy.would_retry(status, attempts) {
			debug!(target = "harness.diagnostics", test = %key, attempt = attempts, "non-terminal failure; capture deferred");
			return;
		}

		let Some(session) = self.registry.current(worker).await else {
			// Setup failures reach here with no session ever registered.
			info!(target = "harness.diagnostics", %worker, test = %key, "no session registered; skipping capture");
			return;
		};

		match self.capture(key, status, session.as_ref()).await {
			Ok(artifact) => {
				info!(target = "harness.diagnostics", test = %key, path = %artifact.path.display(), "screenshot captured");
				if !self.store.attach_artifact(key, artifact).await {
					warn!(target = "harness.diagnostics", test = %key, "record closed before artifact attach");
				}
			}
			Err(err) => {
				warn!(target = "harness.diagnostics", test = %key, error = %err, "screenshot capture failed; outcome unaffected");
			}
		}
	}

	async fn capture(&self, key: &RecordKey, status: TestStatus, session: &crate::session::Session) -> Result<ArtifactRef> {
		let bytes = session
			.screenshot()
			.await
			.map_err(|e| HarnessError::DiagnosticsCapture(e.to_string()))?;

		tokio::fs::create_dir_all(&self.screenshots_dir).await?;
		let name = format!(
			"{}_{}_{}.png",
			sanitize(&key.to_string()),
			status.to_string().to_uppercase(),
			Utc::now().format("%Y-%m-%d_%H-%M-%S%.3f")
		);
		let path = self.screenshots_dir.join(name);
		tokio::fs::write(&path, &bytes).await?;

		Ok(ArtifactRef { kind: "screenshot".into(), path })
	}
}

fn sanitize(name: &str) -> String {
	name.chars().map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' }).collect()
}

#[async_trait]
impl EventStage for DiagnosticsCapturer {
	fn name(&self) -> &'static str {
		"diagnostics-capturer"
	}

	async fn on_event(&self, event: &ExecutionEvent) -> Result<()> {
		if let ExecutionEvent::Outcome { worker, key, status, .. } = event {
			self.handle_outcome(*worker, key, *status).await;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::Ordering;

	use tempfile::tempdir;

	use super::*;
	use crate::config::HarnessConfig;
	use crate::testutil::MockBackend;

	fn capturer(
		registry: Arc<SessionRegistry>,
		store: RecordStore,
		max_retries: u32,
		on_pass: bool,
		dir: PathBuf,
	) -> DiagnosticsCapturer {
		DiagnosticsCapturer::new(registry, store, RetryPolicy::new(max_retries), true, on_pass, dir)
	}

	fn outcome(worker: WorkerId, name: &str, status: TestStatus) -> ExecutionEvent {
		ExecutionEvent::Outcome {
			worker,
			key: RecordKey::new(name),
			status,
			error: None,
		}
	}

	#[tokio::test]
	async fn captures_on_terminal_failure() {
		let dir = tempdir().unwrap();
		let backend = MockBackend::new();
		let registry = Arc::new(SessionRegistry::new(backend.clone()));
		let store = RecordStore::new();
		let worker = WorkerId(0);
		let key = RecordKey::new("t");

		registry.acquire(worker, &HarnessConfig::default()).await.unwrap();
		store.open(key.clone(), Vec::new(), None).await;

		let stage = capturer(registry, store.clone(), 0, false, dir.path().to_path_buf());
		stage.on_event(&outcome(worker, "t", TestStatus::Failed)).await.unwrap();

		let artifacts = store.with_record(&key, |r| r.artifacts.clone()).await.unwrap();
		assert_eq!(artifacts.len(), 1);
		assert_eq!(artifacts[0].kind, "screenshot");
		assert!(artifacts[0].path.exists());
		assert_eq!(backend.state.snapshots.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn skips_capture_for_retryable_failure() {
		let dir = tempdir().unwrap();
		let backend = MockBackend::new();
		let registry = Arc::new(SessionRegistry::new(backend.clone()));
		let store = RecordStore::new();
		let worker = WorkerId(0);

		registry.acquire(worker, &HarnessConfig::default()).await.unwrap();
		store.open(RecordKey::new("t"), Vec::new(), None).await;

		// attempts=1 with one retry remaining: not terminal yet.
		let stage = capturer(registry, store, 1, false, dir.path().to_path_buf());
		stage.on_event(&outcome(worker, "t", TestStatus::Failed)).await.unwrap();

		assert_eq!(backend.state.snapshots.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn missing_session_is_a_logged_skip() {
		let dir = tempdir().unwrap();
		let backend = MockBackend::new();
		let registry = Arc::new(SessionRegistry::new(backend.clone()));
		let store = RecordStore::new();
		store.open(RecordKey::new("t"), Vec::new(), None).await;

		let stage = capturer(registry, store.clone(), 0, false, dir.path().to_path_buf());
		stage.on_event(&outcome(WorkerId(9), "t", TestStatus::Failed)).await.unwrap();

		let artifacts = store.with_record(&RecordKey::new("t"), |r| r.artifacts.len()).await.unwrap();
		assert_eq!(artifacts, 0);
	}

	#[tokio::test]
	async fn snapshot_failure_never_escalates() {
		let dir = tempdir().unwrap();
		let backend = MockBackend::new();
		backend.state.fail_snapshots.store(true, Ordering::SeqCst);
		let registry = Arc::new(SessionRegistry::new(backend.clone()));
		let store = RecordStore::new();
		let worker = WorkerId(0);

		registry.acquire(worker, &HarnessConfig::default()).await.unwrap();
		store.open(RecordKey::new("t"), Vec::new(), None).await;

		let stage = capturer(registry, store.clone(), 0, false, dir.path().to_path_buf());
		assert!(stage.on_event(&outcome(worker, "t", TestStatus::Failed)).await.is_ok());

		let artifacts = store.with_record(&RecordKey::new("t"), |r| r.artifacts.len()).await.unwrap();
		assert_eq!(artifacts, 0);
	}

	#[tokio::test]
	async fn passes_capture_only_when_configured() {
		let dir = tempdir().unwrap();
		let backend = MockBackend::new();
		let registry = Arc::new(SessionRegistry::new(backend.clone()));
		let store = RecordStore::new();
		let worker = WorkerId(0);

		registry.acquire(worker, &HarnessConfig::default()).await.unwrap();
		store.open(RecordKey::new("t"), Vec::new(), None).await;

		let off = capturer(registry.clone(), store.clone(), 0, false, dir.path().to_path_buf());
		off.on_event(&outcome(worker, "t", TestStatus::Passed)).await.unwrap();
		assert_eq!(backend.state.snapshots.load(Ordering::SeqCst), 0);

		let on = capturer(registry, store, 0, true, dir.path().to_path_buf());
		on.on_event(&outcome(worker, "t", TestStatus::Passed)).await.unwrap();
		assert_eq!(backend.state.snapshots.load(Ordering::SeqCst), 1);
	}
}
