// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP delivery of notifications to the orchestrator.
//!
//! Delivery is fire-and-forget: there is no retry queue here. The callers
//! either log a failed send and move on, or (for the job-failed path) keep
//! the cluster job around so the next sweep tries again.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use argus_core::{Notification, Notifier, NotifyError, RunId, WorkerKind};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Posts notifications as JSON to the orchestrator's event endpoint.
pub struct HttpNotifier {
	client: Client,
	endpoint: String,
}

impl HttpNotifier {
	pub fn new(base_url: &str) -> Result<Self, NotifyError> {
		let client = Client::builder()
			.timeout(REQUEST_TIMEOUT)
			.build()
			.map_err(|err| NotifyError(format!("failed to build HTTP client: {err}")))?;

		Ok(Self {
			client,
			endpoint: format!("{}/events", base_url.trim_end_matches('/')),
		})
	}

	async fn post(&self, notification: &Notification) -> Result<(), NotifyError> {
		let response = self
			.client
			.post(&self.endpoint)
			.json(notification)
			.send()
			.await
			.map_err(|err| NotifyError(err.to_string()))?;

		let status = response.status();
		if !status.is_success() {
			return Err(NotifyError(format!("orchestrator returned {status}")));
		}

		debug!(endpoint = %self.endpoint, "notification delivered");
		Ok(())
	}
}

#[async_trait]
impl Notifier for HttpNotifier {
	async fn send_job_failed(
		&self,
		run_id: RunId,
		worker: WorkerKind,
		trace_id: &str,
	) -> Result<(), NotifyError> {
		self
			.post(&Notification::JobFailed {
				run_id,
				worker,
				trace_id: trace_id.to_string(),
			})
			.await
	}

	async fn send_job_lost(&self, run_id: RunId, worker: WorkerKind) -> Result<(), NotifyError> {
		self.post(&Notification::JobLost { run_id, worker }).await
	}

	async fn send_run_stuck(&self, run_id: RunId, trace_id: &str) -> Result<(), NotifyError> {
		self
			.post(&Notification::RunStuck {
				run_id,
				trace_id: trace_id.to_string(),
			})
			.await
	}
}
