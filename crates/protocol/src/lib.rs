//! Driver-facing types and traits for the wd-harness execution core.
//!
//! This crate defines the boundary between the harness and whatever
//! drives a real browser: the browser/timeout/request types exchanged
//! across that boundary, and the [`AutomationBackend`] / [`DriverSession`]
//! traits a concrete driver client implements.
//!
//! Types in this crate are:
//! - **Pure data and contracts**: no orchestration behavior
//! - **Stable**: change only when the collaborator boundary changes
//!
//! The harness itself (session registry, retry, reporting) lives in
//! `wd-harness` and is built on top of these contracts.

pub mod backend;
pub mod types;

pub use backend::*;
pub use types::*;
