//! Live session handle and lifecycle state.

use std::sync::Mutex;

use wd_protocol::{BackendError, BrowserKind, DriverSession, SessionMode};

use crate::worker::WorkerId;

/// Lifecycle state of an automation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	/// Opened but not yet configured.
	Created,
	/// Timeouts applied, window sized; available to its worker.
	Ready,
	/// A test body is running against it.
	InUse,
	/// Torn down. Terminal.
	Closed,
	/// Creation or teardown raised. Terminal.
	Failed,
}

/// A live automation session bound to one worker.
///
/// Owned by the [`super::SessionRegistry`]; the owning worker has
/// exclusive use between `Ready` and release.
pub struct Session {
	id: u64,
	worker: WorkerId,
	browser: BrowserKind,
	mode: SessionMode,
	state: Mutex<SessionState>,
	driver: Box<dyn DriverSession>,
}

impl Session {
	pub(crate) fn new(id: u64, worker: WorkerId, browser: BrowserKind, mode: SessionMode, driver: Box<dyn DriverSession>) -> Self {
		Self {
			id,
			worker,
			browser,
			mode,
			state: Mutex::new(SessionState::Created),
			driver,
		}
	}

	pub fn id(&self) -> u64 {
		self.id
	}

	pub fn worker(&self) -> WorkerId {
		self.worker
	}

	pub fn browser(&self) -> BrowserKind {
		self.browser
	}

	pub fn mode(&self) -> SessionMode {
		self.mode
	}

	pub fn state(&self) -> SessionState {
		*self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	pub(crate) fn set_state(&self, state: SessionState) {
		*self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = state;
	}

	/// Marks the session as running a test body.
	pub fn mark_in_use(&self) {
		self.set_state(SessionState::InUse);
	}

	/// Underlying driver handle for page interaction and snapshots.
	pub fn driver(&self) -> &dyn DriverSession {
		self.driver.as_ref()
	}

	/// Navigates the session to a URL.
	pub async fn navigate(&self, url: &str) -> Result<(), BackendError> {
		self.driver.navigate(url).await
	}

	/// Captures a screenshot as PNG bytes.
	pub async fn screenshot(&self) -> Result<Vec<u8>, BackendError> {
		self.driver.screenshot().await
	}
}

impl std::fmt::Debug for Session {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Session")
			.field("id", &self.id)
			.field("worker", &self.worker)
			.field("browser", &self.browser)
			.field("mode", &self.mode)
			.field("state", &self.state())
			.finish()
	}
}
