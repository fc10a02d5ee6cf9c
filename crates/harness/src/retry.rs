//! Retry decisions for failed test attempts.

use tracing::{error, warn};

use crate::record::{ExecutionRecord, TestStatus};

/// Stateless retry decision function over per-record attempt state.
///
/// The budget is resolved once from configuration; a budget of 0
/// makes every failure terminal on its first attempt. Retried
/// attempts stay on the worker that owns the record and always
/// acquire a fresh browser session, since a corrupted browser is a
/// common cause of spurious failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
	max_retries: u32,
}

impl RetryPolicy {
	pub fn new(max_retries: u32) -> Self {
		Self { max_retries }
	}

	pub fn max_retries(&self) -> u32 {
		self.max_retries
	}

	/// Pure lookahead: would a failure with `attempts` completed
	/// attempts be retried? Used by stages that must know whether an
	/// outcome is terminal before the record is mutated.
	pub fn would_retry(&self, status: TestStatus, attempts: u32) -> bool {
		status == TestStatus::Failed && attempts <= self.max_retries
	}

	/// Decides a failed record's fate. On retry the attempt counter is
	/// bumped and status returns to Running; accumulated errors are
	/// kept for diagnostics.
	pub fn should_retry(&self, record: &mut ExecutionRecord) -> bool {
		if record.status == TestStatus::Skipped {
			return false;
		}
		if record.status != TestStatus::Failed {
			return false;
		}
		if record.last_error.as_ref().is_some_and(|e| !e.retryable) {
			// Fatal setup errors (unsupported browser, bad config)
			// would fail identically on every attempt.
			return false;
		}

		if record.attempts <= self.max_retries {
			record.attempts += 1;
			record.status = TestStatus::Running;
			warn!(
				target = "harness.retry",
				test = %record.key,
				attempt = record.attempts,
				max_retries = self.max_retries,
				"retrying failed test"
			);
			true
		} else {
			if self.max_retries > 0 {
				error!(
					target = "harness.retry",
					test = %record.key,
					attempts = record.attempts,
					"test failed after exhausting retries"
				);
			}
			false
		}
	}
}
