//! Session lifecycle subsystem.
//!
//! This module centralizes session creation, worker-scoped storage,
//! and teardown. Sessions are exclusively bound to their owning
//! worker between acquire and release, so nothing beyond the registry
//! map itself needs locking.

/// Live session value and its lifecycle state machine.
pub mod handle;
/// Worker-keyed session ownership and teardown.
pub mod registry;

pub use handle::{Session, SessionState};
pub use registry::SessionRegistry;
