use thiserror::Error;

use wd_protocol::BackendError;

pub type Result<T> = std::result::Result<T, HarnessError>;

#[derive(Debug, Error)]
pub enum HarnessError {
	/// Requested browser is outside the supported set. Fatal for the
	/// worker that requested it; never retried.
	#[error("unsupported browser: {name}")]
	UnsupportedBrowser { name: String },

	/// Remote grid connection setup failed during acquire.
	#[error("grid endpoint unreachable: {endpoint}")]
	EndpointUnreachable {
		endpoint: String,
		#[source]
		source: BackendError,
	},

	/// Test body assertion failed. Recoverable; feeds the retry policy.
	#[error("assertion failed: {message}")]
	Assertion { message: String },

	/// Test body opted out of the run.
	#[error("test skipped: {reason}")]
	Skipped { reason: String },

	/// Snapshot capture failed. Always recovered where it occurs and
	/// logged; never escalated past the diagnostics stage.
	#[error("diagnostics capture failed: {0}")]
	DiagnosticsCapture(String),

	#[error("configuration error: {0}")]
	Config(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Backend(#[from] BackendError),

	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl HarnessError {
	/// Short stable label for the error category, recorded alongside
	/// the message in execution records.
	pub fn kind(&self) -> &'static str {
		match self {
			HarnessError::UnsupportedBrowser { .. } => "unsupported-browser",
			HarnessError::EndpointUnreachable { .. } => "endpoint-unreachable",
			HarnessError::Assertion { .. } => "assertion",
			HarnessError::Skipped { .. } => "skipped",
			HarnessError::DiagnosticsCapture(_) => "diagnostics-capture",
			HarnessError::Config(_) => "config",
			HarnessError::Io(_) => "io",
			HarnessError::Json(_) => "json",
			HarnessError::Backend(_) => "backend",
			HarnessError::Other(_) => "other",
		}
	}

	/// Whether this error must abort the owning worker instead of
	/// being captured into the execution record.
	pub fn is_fatal_for_worker(&self) -> bool {
		matches!(self, HarnessError::UnsupportedBrowser { .. } | HarnessError::Config(_))
	}
}

/// Builds an assertion failure, `format!`-style.
#[macro_export]
macro_rules! assertion {
	($($arg:tt)*) => {
		$crate::error::HarnessError::Assertion { message: format!($($arg)*) }
	};
}
