//! Lifecycle event model and fan-out bus.
//!
//! Each worker publishes its own events sequentially, so per-test
//! ordering is FIFO by construction; no cross-worker order is
//! guaranteed or needed. Delivery is at-least-once per stage, and
//! stages are expected to treat duplicate `Started` events on an
//! already-open record as a resume.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::Result;
use crate::record::{ErrorInfo, RecordKey, TestStatus};
use crate::worker::WorkerId;

/// Lifecycle event produced by a test worker.
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
	/// A test attempt sequence has begun (or resumed, on retry).
	Started {
		worker: WorkerId,
		key: RecordKey,
		tags: Vec<String>,
		description: Option<String>,
	},
	/// A test attempt produced an outcome. Not necessarily terminal:
	/// the aggregator may keep the record open for a retry.
	Outcome {
		worker: WorkerId,
		key: RecordKey,
		status: TestStatus,
		error: Option<ErrorInfo>,
	},
	/// The suite is done; reports seal and flush.
	SuiteFinished,
}

/// A consumer stage on the bus.
///
/// Stages run in registration order for every event, which is how the
/// harness guarantees diagnostics are attached before aggregation
/// finalizes a record.
#[async_trait]
pub trait EventStage: Send + Sync {
	/// Stage name used in isolation logs.
	fn name(&self) -> &'static str;

	async fn on_event(&self, event: &ExecutionEvent) -> Result<()>;
}

/// Ordered fan-out of execution events to consumer stages.
///
/// A failing stage is isolated: the error is logged and delivery
/// continues to remaining stages and later events. A broken consumer
/// never blocks the run.
#[derive(Default)]
pub struct EventBus {
	stages: Vec<Arc<dyn EventStage>>,
}

impl EventBus {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a stage. Registration order is delivery order.
	pub fn register(&mut self, stage: Arc<dyn EventStage>) {
		self.stages.push(stage);
	}

	pub async fn publish(&self, event: &ExecutionEvent) {
		for stage in &self.stages {
			if let Err(err) = stage.on_event(event).await {
				warn!(
					target = "harness.events",
					stage = stage.name(),
					error = %err,
					"event stage failed; continuing delivery"
				);
			}
		}
	}
}
