//! Suite assembly and parallel execution.
//!
//! A [`Suite`] is an ordered list of cases drained by a pool of
//! workers. Each worker holds at most one browser session at a time,
//! so concurrency never exceeds the configured worker count.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tracing::{error, info};
use wd_protocol::AutomationBackend;

use crate::config::HarnessConfig;
use crate::error::Result;
use crate::report::ReportDocument;
use crate::runner::{Harness, TestInfo};
use crate::session::Session;
use crate::worker::WorkerId;

type CaseBody = Arc<dyn Fn(Arc<Session>) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// One registered test case: identity plus the async body to run
/// against a live session.
#[derive(Clone)]
pub struct TestCase {
	pub info: TestInfo,
	body: CaseBody,
}

impl TestCase {
	pub fn new<F, Fut>(name: impl Into<String>, body: F) -> Self
	where
		F: Fn(Arc<Session>) -> Fut + Send + Sync + 'static,
		Fut: std::future::Future<Output = Result<()>> + Send + 'static,
	{
		Self {
			info: TestInfo::new(name),
			body: Arc::new(move |session| -> BoxFuture<'static, Result<()>> { Box::pin(body(session)) }),
		}
	}

	pub fn with_params(mut self, params: impl Into<String>) -> Self {
		self.info = self.info.with_params(params);
		self
	}

	pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
		self.info = self.info.with_tags(tags);
		self
	}

	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		self.info = self.info.with_description(description);
		self
	}
}

impl std::fmt::Debug for TestCase {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TestCase").field("info", &self.info).finish_non_exhaustive()
	}
}

/// A named collection of test cases.
#[derive(Debug, Default)]
pub struct Suite {
	name: String,
	cases: Vec<TestCase>,
}

impl Suite {
	pub fn new(name: impl Into<String>) -> Self {
		Self { name: name.into(), cases: Vec::new() }
	}

	pub fn case(mut self, case: TestCase) -> Self {
		self.cases.push(case);
		self
	}

	pub fn len(&self) -> usize {
		self.cases.len()
	}

	pub fn is_empty(&self) -> bool {
		self.cases.is_empty()
	}

	/// Runs every case and returns the sealed, flushed report.
	///
	/// Cases are drained from a shared queue by up to
	/// `config.workers` concurrent workers. A fatal setup error
	/// (unsupported browser, broken config) stops the worker that hit
	/// it; the remaining workers keep draining the queue. The report
	/// is sealed and sessions released even when every worker aborts.
	pub async fn run(self, config: HarnessConfig, backend: Arc<dyn AutomationBackend>) -> Result<ReportDocument> {
		let workers = config.workers.min(self.cases.len()).max(1);
		let harness = Arc::new(Harness::new(self.name.clone(), config, backend)?);
		let queue = Arc::new(Mutex::new(self.cases.into_iter().collect::<VecDeque<_>>()));

		info!(target = "harness.suite", suite = %self.name, workers, "suite starting");

		let mut handles = Vec::with_capacity(workers);
		for slot in 0..workers as u32 {
			let harness = harness.clone();
			let queue = queue.clone();
			handles.push(tokio::spawn(async move {
				let worker = WorkerId(slot);
				loop {
					let case = { queue.lock().await.pop_front() };
					let Some(case) = case else { break };

					let body = case.body.clone();
					let result = harness.run_case(worker, &case.info, move |session| body(session)).await;
					if let Err(err) = result {
						error!(target = "harness.suite", %worker, test = %case.info.key, error = %err, "worker aborting");
						break;
					}
				}
			}));
		}

		for handle in handles {
			// A panicked worker must not leave the suite unsealed.
			if let Err(err) = handle.await {
				error!(target = "harness.suite", error = %err, "worker task panicked");
			}
		}

		harness.finalize_suite().await
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::Ordering;

	use tempfile::tempdir;

	use super::*;
	use crate::assertion;
	use crate::record::TestStatus;
	use crate::testutil::MockBackend;

	fn test_config(dir: &std::path::Path, workers: usize) -> HarnessConfig {
		HarnessConfig {
			workers,
			retry_count: 0,
			output_dir: dir.to_path_buf(),
			..HarnessConfig::default()
		}
	}

	#[tokio::test]
	async fn suite_runs_all_cases_and_seals_report() {
		let dir = tempdir().unwrap();
		let backend = MockBackend::new();

		let suite = Suite::new("smoke")
			.case(TestCase::new("login", |_s| async { Ok(()) }))
			.case(TestCase::new("search", |_s| async { Err(assertion!("no results")) }))
			.case(TestCase::new("checkout", |_s| async { Ok(()) }));

		let doc = suite.run(test_config(dir.path(), 2), backend.clone()).await.unwrap();

		assert!(doc.is_sealed());
		assert_eq!(doc.counters.passed, 2);
		assert_eq!(doc.counters.failed, 1);
		assert_eq!(doc.records.len(), 3);
		assert_eq!(backend.state.closes.load(Ordering::SeqCst), backend.state.opens.load(Ordering::SeqCst));
	}

	#[tokio::test]
	async fn one_failing_case_does_not_poison_its_worker() {
		let dir = tempdir().unwrap();
		let backend = MockBackend::new();

		// Single worker runs everything in order; the failure in the
		// middle must not stop the cases behind it.
		let suite = Suite::new("serial")
			.case(TestCase::new("a", |_s| async { Ok(()) }))
			.case(TestCase::new("b", |_s| async { Err(assertion!("boom")) }))
			.case(TestCase::new("c", |_s| async { Ok(()) }));

		let doc = suite.run(test_config(dir.path(), 1), backend).await.unwrap();
		assert_eq!(doc.counters.total(), 3);
		assert_eq!(doc.counters.passed, 2);
	}

	#[tokio::test]
	async fn parallel_workers_get_isolated_sessions() {
		let dir = tempdir().unwrap();
		let backend = MockBackend::new();

		let mut suite = Suite::new("parallel");
		for i in 0..5 {
			suite = suite.case(TestCase::new(format!("case-{i}"), |session| async move {
				session.navigate("https://example.com").await?;
				Ok(())
			}));
		}

		let doc = suite.run(test_config(dir.path(), 5), backend.clone()).await.unwrap();

		assert_eq!(doc.counters.passed, 5);
		// One session per case, all torn down.
		assert_eq!(backend.state.opens.load(Ordering::SeqCst), 5);
		assert_eq!(backend.state.closes.load(Ordering::SeqCst), 5);
	}

	#[tokio::test]
	async fn fatal_config_aborts_workers_but_report_still_flushes() {
		let dir = tempdir().unwrap();
		let backend = MockBackend::new();
		let config = HarnessConfig {
			browser: "netscape".into(),
			..test_config(dir.path(), 2)
		};

		let suite = Suite::new("doomed")
			.case(TestCase::new("a", |_s| async { Ok(()) }))
			.case(TestCase::new("b", |_s| async { Ok(()) }));

		let doc = suite.run(config, backend).await.unwrap();
		assert!(doc.is_sealed());
		assert_eq!(doc.counters.passed, 0);
		assert!(doc.records.iter().all(|r| r.status == TestStatus::Failed));
	}

	#[tokio::test]
	async fn empty_suite_produces_empty_sealed_report() {
		let dir = tempdir().unwrap();
		let backend = MockBackend::new();

		let doc = Suite::new("empty").run(test_config(dir.path(), 3), backend).await.unwrap();
		assert!(doc.is_sealed());
		assert_eq!(doc.counters.total(), 0);
	}
}
