// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Outbound notifications to the pipeline orchestrator.
//!
//! Notifications are the only way the orchestrator learns that a job failed,
//! disappeared, or that a run's bookkeeping stopped advancing. Delivery is
//! fire-and-forget: callers log failures and move on, relying on the
//! redundant detection paths (watch plus four periodic sweeps) rather than
//! on a retry queue.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::model::RunId;
use crate::worker::WorkerKind;

/// Error raised when a notification could not be delivered.
#[derive(Debug, thiserror::Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// The wire-level event sent to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
	/// A cluster job reported a failure condition and was removed.
	JobFailed {
		run_id: RunId,
		worker: WorkerKind,
		trace_id: String,
	},
	/// The database says the job is active but no cluster job exists.
	JobLost { run_id: RunId, worker: WorkerKind },
	/// A run is still marked active although all of its jobs (or none at
	/// all) exist, every one of them in a terminal state.
	RunStuck { run_id: RunId, trace_id: String },
}

/// Sends notifications to the orchestrator.
#[async_trait]
pub trait Notifier: Send + Sync {
	async fn send_job_failed(
		&self,
		run_id: RunId,
		worker: WorkerKind,
		trace_id: &str,
	) -> Result<(), NotifyError>;

	async fn send_job_lost(&self, run_id: RunId, worker: WorkerKind) -> Result<(), NotifyError>;

	async fn send_run_stuck(&self, run_id: RunId, trace_id: &str) -> Result<(), NotifyError>;
}

/// A [`Notifier`] that records every notification, for use in tests.
///
/// Responses can be scripted to fail: each call consumes one entry from the
/// failure queue if present, otherwise it succeeds.
#[derive(Debug, Default)]
pub struct MockNotifier {
	sent: Mutex<Vec<Notification>>,
	failures: Mutex<Vec<String>>,
}

impl MockNotifier {
	pub fn new() -> Self {
		Self::default()
	}

	/// Queue an error message; the next send will fail with it.
	pub fn fail_next(&self, message: &str) {
		self.failures.lock().unwrap().push(message.to_string());
	}

	/// All notifications delivered so far, in order.
	pub fn sent(&self) -> Vec<Notification> {
		self.sent.lock().unwrap().clone()
	}

	fn record(&self, notification: Notification) -> Result<(), NotifyError> {
		let mut failures = self.failures.lock().unwrap();
		if !failures.is_empty() {
			return Err(NotifyError(failures.remove(0)));
		}
		self.sent.lock().unwrap().push(notification);
		Ok(())
	}
}

#[async_trait]
impl Notifier for MockNotifier {
	async fn send_job_failed(
		&self,
		run_id: RunId,
		worker: WorkerKind,
		trace_id: &str,
	) -> Result<(), NotifyError> {
		self.record(Notification::JobFailed {
			run_id,
			worker,
			trace_id: trace_id.to_string(),
		})
	}

	async fn send_job_lost(&self, run_id: RunId, worker: WorkerKind) -> Result<(), NotifyError> {
		self.record(Notification::JobLost { run_id, worker })
	}

	async fn send_run_stuck(&self, run_id: RunId, trace_id: &str) -> Result<(), NotifyError> {
		self.record(Notification::RunStuck {
			run_id,
			trace_id: trace_id.to_string(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn mock_records_notifications_in_order() {
		let mock = MockNotifier::new();

		mock
			.send_job_failed(1, WorkerKind::Scanner, "trace-a")
			.await
			.unwrap();
		mock.send_job_lost(2, WorkerKind::Reporter).await.unwrap();
		mock.send_run_stuck(3, "trace-b").await.unwrap();

		assert_eq!(
			mock.sent(),
			vec![
				Notification::JobFailed {
					run_id: 1,
					worker: WorkerKind::Scanner,
					trace_id: "trace-a".to_string(),
				},
				Notification::JobLost {
					run_id: 2,
					worker: WorkerKind::Reporter,
				},
				Notification::RunStuck {
					run_id: 3,
					trace_id: "trace-b".to_string(),
				},
			]
		);
	}

	#[tokio::test]
	async fn scripted_failures_are_consumed_in_fifo_order() {
		let mock = MockNotifier::new();
		mock.fail_next("broker down");

		let err = mock
			.send_job_lost(1, WorkerKind::Analyzer)
			.await
			.unwrap_err();
		assert!(err.to_string().contains("broker down"));

		mock.send_job_lost(1, WorkerKind::Analyzer).await.unwrap();
		assert_eq!(mock.sent().len(), 1);
	}

	#[test]
	fn notification_serializes_with_event_tag() {
		let json = serde_json::to_value(Notification::JobLost {
			run_id: 7,
			worker: WorkerKind::Evaluator,
		})
		.unwrap();

		assert_eq!(json["event"], "job_lost");
		assert_eq!(json["run_id"], 7);
		assert_eq!(json["worker"], "evaluator");
	}
}
