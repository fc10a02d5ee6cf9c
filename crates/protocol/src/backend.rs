//! Collaborator traits implemented by concrete driver clients.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{OpenRequest, Timeouts};

/// Errors surfaced by a driver backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Remote grid endpoint could not be reached.
    #[error("endpoint unreachable: {endpoint}")]
    Unreachable {
        /// Endpoint that failed to connect.
        endpoint: String,
        /// Underlying transport failure, when available.
        #[source]
        source: Option<std::io::Error>,
    },

    /// Local browser launch failed.
    #[error("browser launch failed: {0}")]
    Launch(String),

    /// Driver protocol rejected or garbled an operation.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Operation exceeded its configured timeout.
    #[error("timeout after {ms}ms: {operation}")]
    Timeout {
        /// Elapsed budget in milliseconds.
        ms: u64,
        /// Operation that timed out.
        operation: String,
    },
}

/// Opens driver sessions.
///
/// Implemented by the page-interaction collaborator (a WebDriver or
/// CDP client); the harness only ever talks to this trait.
#[async_trait]
pub trait AutomationBackend: Send + Sync {
    /// Opens a session for `request` and returns its live handle.
    async fn open_session(&self, request: &OpenRequest) -> Result<Box<dyn DriverSession>, BackendError>;
}

/// Live automation session handle.
///
/// Page-level interaction (locators, clicks, reads) belongs to the
/// collaborator; the harness only needs lifecycle, navigation and
/// snapshot operations.
#[async_trait]
pub trait DriverSession: Send + Sync {
    /// Applies implicit-wait/page-load/script timeouts.
    async fn apply_timeouts(&self, timeouts: &Timeouts) -> Result<(), BackendError>;

    /// Maximizes the browser window.
    async fn maximize_window(&self) -> Result<(), BackendError>;

    /// Navigates to a URL.
    async fn navigate(&self, url: &str) -> Result<(), BackendError>;

    /// Captures a screenshot and returns PNG bytes.
    async fn screenshot(&self) -> Result<Vec<u8>, BackendError>;

    /// Terminates the session.
    async fn close(&self) -> Result<(), BackendError>;
}
