//! In-memory driver backend used across unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use std::sync::Mutex;
use wd_protocol::{AutomationBackend, BackendError, DriverSession, OpenRequest, Timeouts};

/// Shared observable state for a [`MockBackend`] and its sessions.
#[derive(Default)]
pub(crate) struct MockState {
	pub opens: AtomicU32,
	pub closes: AtomicU32,
	pub maximizes: AtomicU32,
	pub snapshots: AtomicU32,
	pub timeouts_applied: AtomicU32,
	/// Fail this many upcoming opens with `Unreachable`.
	pub fail_opens: AtomicU32,
	pub fail_closes: AtomicBool,
	pub fail_snapshots: AtomicBool,
	pub navigations: Mutex<Vec<String>>,
}

pub(crate) struct MockBackend {
	pub state: Arc<MockState>,
}

impl MockBackend {
	pub fn new() -> Arc<Self> {
		Arc::new(Self { state: Arc::new(MockState::default()) })
	}
}

#[async_trait]
impl AutomationBackend for MockBackend {
	async fn open_session(&self, request: &OpenRequest) -> Result<Box<dyn DriverSession>, BackendError> {
		if self.state.fail_opens.load(Ordering::SeqCst) > 0 {
			self.state.fail_opens.fetch_sub(1, Ordering::SeqCst);
			return Err(BackendError::Unreachable {
				endpoint: request.grid_url.clone().unwrap_or_else(|| "local".into()),
				source: None,
			});
		}
		self.state.opens.fetch_add(1, Ordering::SeqCst);
		Ok(Box::new(MockSession { state: self.state.clone() }))
	}
}

pub(crate) struct MockSession {
	state: Arc<MockState>,
}

#[async_trait]
impl DriverSession for MockSession {
	async fn apply_timeouts(&self, _timeouts: &Timeouts) -> Result<(), BackendError> {
		self.state.timeouts_applied.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}

	async fn maximize_window(&self) -> Result<(), BackendError> {
		self.state.maximizes.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}

	async fn navigate(&self, url: &str) -> Result<(), BackendError> {
		self.state.navigations.lock().unwrap().push(url.to_string());
		Ok(())
	}

	async fn screenshot(&self) -> Result<Vec<u8>, BackendError> {
		if self.state.fail_snapshots.load(Ordering::SeqCst) {
			return Err(BackendError::Protocol("snapshot unavailable".into()));
		}
		self.state.snapshots.fetch_add(1, Ordering::SeqCst);
		Ok(b"\x89PNG-mock".to_vec())
	}

	async fn close(&self) -> Result<(), BackendError> {
		if self.state.fail_closes.load(Ordering::SeqCst) {
			return Err(BackendError::Protocol("close failed".into()));
		}
		self.state.closes.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}
}
