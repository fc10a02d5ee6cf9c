//! Worker-keyed session ownership.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use wd_protocol::{AutomationBackend, BackendError, BrowserKind, OpenRequest, SessionMode};

use super::handle::{Session, SessionState};
use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::worker::WorkerId;

/// Owns creation, worker-scoped storage, and teardown of automation
/// sessions.
///
/// The registry is an explicit map keyed by worker identity; it is
/// injected into workers rather than living in ambient thread-local
/// state. Only the map is shared; each session belongs to exactly one
/// worker at a time.
pub struct SessionRegistry {
	backend: Arc<dyn AutomationBackend>,
	sessions: Mutex<HashMap<WorkerId, Arc<Session>>>,
	next_id: AtomicU64,
}

impl SessionRegistry {
	pub fn new(backend: Arc<dyn AutomationBackend>) -> Self {
		Self {
			backend,
			sessions: Mutex::new(HashMap::new()),
			next_id: AtomicU64::new(1),
		}
	}

	/// Creates (or reuses) a session exclusively bound to `worker`.
	///
	/// On success the session has timeouts applied, is maximized
	/// unless headless, and is registered for later [`Self::current`]
	/// lookups. Nothing is registered on failure.
	pub async fn acquire(&self, worker: WorkerId, config: &HarnessConfig) -> Result<Arc<Session>> {
		if let Some(existing) = self.current(worker).await {
			debug!(target = "harness.session", %worker, session = existing.id(), "reusing registered session");
			return Ok(existing);
		}

		let browser = BrowserKind::parse(&config.browser)
			.ok_or_else(|| HarnessError::UnsupportedBrowser { name: config.browser.clone() })?;

		let mode = if config.remote { SessionMode::Remote } else { SessionMode::Local };
		let request = OpenRequest {
			browser,
			headless: config.headless,
			mode,
			grid_url: config.remote.then(|| config.grid_url.clone()),
		};

		let driver = self.backend.open_session(&request).await.map_err(|err| match err {
			BackendError::Unreachable { .. } => HarnessError::EndpointUnreachable {
				endpoint: config.grid_url.clone(),
				source: err,
			},
			other => HarnessError::Backend(other),
		})?;

		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let session = Arc::new(Session::new(id, worker, browser, mode, driver));

		if let Err(err) = self.configure(&session, config).await {
			session.set_state(SessionState::Failed);
			if let Err(close_err) = session.driver().close().await {
				warn!(target = "harness.session", %worker, error = %close_err, "failed to close misconfigured session");
			}
			return Err(err);
		}
		session.set_state(SessionState::Ready);

		info!(
			target = "harness.session",
			%worker,
			session = id,
			%browser,
			%mode,
			headless = config.headless,
			"session ready"
		);

		self.sessions.lock().await.insert(worker, session.clone());
		Ok(session)
	}

	async fn configure(&self, session: &Session, config: &HarnessConfig) -> Result<()> {
		session.driver().apply_timeouts(&config.timeouts()).await?;
		if !config.headless {
			session.driver().maximize_window().await?;
		}
		Ok(())
	}

	/// Non-blocking lookup of the session registered for `worker`.
	/// Never creates one.
	pub async fn current(&self, worker: WorkerId) -> Option<Arc<Session>> {
		self.sessions.lock().await.get(&worker).cloned()
	}

	/// Tears down and removes the session for `worker`.
	///
	/// Idempotent: releasing an unregistered worker is a no-op. The
	/// registry entry is removed before protocol teardown runs, so a
	/// failure mid-teardown can never leave a dangling registration;
	/// teardown errors are logged and swallowed.
	pub async fn release(&self, worker: WorkerId) {
		let session = self.sessions.lock().await.remove(&worker);
		let Some(session) = session else {
			debug!(target = "harness.session", %worker, "release with no registered session");
			return;
		};
		self.close_session(&session).await;
	}

	/// Releases every registered session. Called on suite finish and
	/// on abort paths; remote sessions must never be orphaned.
	pub async fn release_all(&self) {
		let sessions: Vec<_> = self.sessions.lock().await.drain().collect();
		for (worker, session) in sessions {
			debug!(target = "harness.session", %worker, session = session.id(), "releasing at suite teardown");
			self.close_session(&session).await;
		}
	}

	async fn close_session(&self, session: &Session) {
		if session.state() == SessionState::Closed {
			return;
		}
		match session.driver().close().await {
			Ok(()) => {
				session.set_state(SessionState::Closed);
				info!(target = "harness.session", worker = %session.worker(), session = session.id(), "session closed");
			}
			Err(err) => {
				session.set_state(SessionState::Failed);
				warn!(
					target = "harness.session",
					worker = %session.worker(),
					session = session.id(),
					error = %err,
					"session teardown failed; entry already removed"
				);
			}
		}
	}

	/// Number of currently registered sessions.
	pub async fn active(&self) -> usize {
		self.sessions.lock().await.len()
	}
}
