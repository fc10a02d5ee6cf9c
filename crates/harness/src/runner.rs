//! Test execution entry points.
//!
//! [`Harness::run_test`] is the composition point: session
//! acquisition, the retry policy, event publication and session
//! release are wired around the test body explicitly, never injected
//! behind the caller's back.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, error, info};
use wd_protocol::AutomationBackend;

use crate::config::HarnessConfig;
use crate::diagnostics::DiagnosticsCapturer;
use crate::error::{HarnessError, Result};
use crate::events::{EventBus, ExecutionEvent};
use crate::record::{ErrorInfo, ExecutionRecord, RecordKey, RecordStore, TestStatus};
use crate::report::{ReportAggregator, ReportDocument};
use crate::retry::RetryPolicy;
use crate::session::{Session, SessionRegistry};
use crate::worker::WorkerId;

/// Identity and report metadata for one test invocation.
#[derive(Debug, Clone)]
pub struct TestInfo {
	pub key: RecordKey,
	pub tags: Vec<String>,
	pub description: Option<String>,
}

impl TestInfo {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			key: RecordKey::new(name),
			tags: Vec::new(),
			description: None,
		}
	}

	/// Distinguishes data-driven rows of the same test.
	pub fn with_params(mut self, params: impl Into<String>) -> Self {
		self.key.params = Some(params.into());
		self
	}

	pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
		self.tags = tags.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());
		self
	}
}

/// Execution harness for one suite run.
///
/// Owns the session registry, the retry policy and the event
/// pipeline; the diagnostics stage is registered ahead of the report
/// aggregator so artifacts land before records finalize.
pub struct Harness {
	config: Arc<HarnessConfig>,
	registry: Arc<SessionRegistry>,
	policy: RetryPolicy,
	store: RecordStore,
	aggregator: Arc<ReportAggregator>,
	bus: EventBus,
}

impl Harness {
	pub fn new(suite: impl Into<String>, config: HarnessConfig, backend: Arc<dyn AutomationBackend>) -> Result<Self> {
		config.ensure_output_dirs()?;

		let suite = suite.into();
		let config = Arc::new(config);
		let registry = Arc::new(SessionRegistry::new(backend));
		let policy = RetryPolicy::new(config.max_retries());
		let store = RecordStore::new();

		let aggregator = Arc::new(ReportAggregator::new(
			store.clone(),
			policy,
			suite.clone(),
			system_metadata(&config),
			config.reports_dir(),
		));
		let capturer = Arc::new(DiagnosticsCapturer::new(
			registry.clone(),
			store.clone(),
			policy,
			config.screenshot_on_fail,
			config.screenshot_on_pass,
			config.screenshots_dir(),
		));

		let mut bus = EventBus::new();
		bus.register(capturer);
		bus.register(aggregator.clone());

		info!(
			target = "harness.runner",
			%suite,
			browser = %config.browser,
			max_retries = policy.max_retries(),
			workers = config.workers,
			"harness initialized"
		);

		Ok(Self {
			config,
			registry,
			policy,
			store,
			aggregator,
			bus,
		})
	}

	pub fn config(&self) -> &HarnessConfig {
		&self.config
	}

	pub fn registry(&self) -> &Arc<SessionRegistry> {
		&self.registry
	}

	/// Runs a named test body on `worker` and returns its finalized
	/// record.
	pub async fn run_test<F, Fut>(&self, worker: WorkerId, name: &str, body: F) -> Result<ExecutionRecord>
	where
		F: Fn(Arc<Session>) -> Fut,
		Fut: Future<Output = Result<()>>,
	{
		self.run_case(worker, &TestInfo::new(name), body).await
	}

	/// Runs a test body with full identity/metadata, driving the
	/// acquire -> run -> report -> release sequence for each attempt
	/// the retry policy grants. Every attempt gets a fresh session.
	///
	/// Only fatal setup errors (unsupported browser, broken config)
	/// propagate; all other failures are captured into the record.
	pub async fn run_case<F, Fut>(&self, worker: WorkerId, info: &TestInfo, body: F) -> Result<ExecutionRecord>
	where
		F: Fn(Arc<Session>) -> Fut,
		Fut: Future<Output = Result<()>>,
	{
		let key = &info.key;
		let max_attempts = self.policy.max_retries() + 1;

		for attempt in 1..=max_attempts {
			self.bus
				.publish(&ExecutionEvent::Started {
					worker,
					key: key.clone(),
					tags: info.tags.clone(),
					description: info.description.clone(),
				})
				.await;
			debug!(target = "harness.runner", %worker, test = %key, attempt, "attempt starting");

			let outcome = self.attempt(worker, &body).await;
			let (status, error_info) = match &outcome {
				Ok(()) => (TestStatus::Passed, None),
				Err(HarnessError::Skipped { .. }) => (TestStatus::Skipped, outcome.as_ref().err().map(ErrorInfo::from_error)),
				Err(_) => (TestStatus::Failed, outcome.as_ref().err().map(ErrorInfo::from_error)),
			};

			// Outcome is published while the session is still
			// registered so diagnostics can reach it; release follows.
			self.bus
				.publish(&ExecutionEvent::Outcome {
					worker,
					key: key.clone(),
					status,
					error: error_info,
				})
				.await;
			self.registry.release(worker).await;

			if let Err(err) = outcome {
				if err.is_fatal_for_worker() {
					error!(target = "harness.runner", %worker, test = %key, error = %err, "fatal setup error; aborting worker");
					return Err(err);
				}
			}

			if !self.store.is_open(key).await {
				break;
			}
		}

		self.aggregator
			.finalized(key)
			.await
			.ok_or_else(|| HarnessError::Other(anyhow::anyhow!("record for {key} was never finalized")))
	}

	async fn attempt<F, Fut>(&self, worker: WorkerId, body: &F) -> Result<()>
	where
		F: Fn(Arc<Session>) -> Fut,
		Fut: Future<Output = Result<()>>,
	{
		let session = self.registry.acquire(worker, &self.config).await?;
		session.mark_in_use();

		if let Some(url) = self.config.resolved_url() {
			session.navigate(url).await?;
			debug!(target = "harness.runner", %worker, url, "navigated to application");
		}

		body(session).await
	}

	/// Seals and flushes the report and releases every still-open
	/// session. Safe to call more than once; teardown and abort paths
	/// both funnel here.
	pub async fn finalize_suite(&self) -> Result<ReportDocument> {
		self.registry.release_all().await;
		self.bus.publish(&ExecutionEvent::SuiteFinished).await;
		// The bus isolates stage errors; flush again directly so a
		// report-write failure reaches the caller. Idempotent.
		self.aggregator.seal_and_flush().await?;
		Ok(self.aggregator.snapshot().await)
	}
}

fn system_metadata(config: &HarnessConfig) -> BTreeMap<String, String> {
	BTreeMap::from([
		("harnessVersion".to_string(), env!("CARGO_PKG_VERSION").to_string()),
		("os".to_string(), std::env::consts::OS.to_string()),
		("arch".to_string(), std::env::consts::ARCH.to_string()),
		("browser".to_string(), config.browser.clone()),
		("environment".to_string(), config.environment.clone()),
		("headless".to_string(), config.headless.to_string()),
		("mode".to_string(), if config.remote { "remote".into() } else { "local".into() }),
	])
}
