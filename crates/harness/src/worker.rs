//! Worker identity.

use serde::{Deserialize, Serialize};

/// Identity of a logical test worker.
///
/// Sessions and events are keyed by worker, never by ambient thread
/// state; the registry binds at most one session to each worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerId(pub u32);

impl std::fmt::Display for WorkerId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "worker-{}", self.0)
	}
}
