// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event-driven detection of failed worker jobs.
//!
//! The watch path exists for latency: a failed job triggers its notification
//! within moments instead of waiting for the next reaper sweep. Everything
//! the watch misses is caught by the periodic finders, so this loop only has
//! to care about failure transitions.

use std::sync::Arc;
use tracing::info;

use argus_k8s::{JobExt, JobHandler, JobWatchHelper};

/// Consumes the job change stream and reacts to failure transitions.
pub struct JobMonitor {
	watch: JobWatchHelper,
	handler: Arc<JobHandler>,
}

impl JobMonitor {
	pub fn new(watch: JobWatchHelper, handler: Arc<JobHandler>) -> Self {
		Self { watch, handler }
	}

	/// Run the watch loop forever. Cancellation happens from outside by
	/// dropping the task.
	pub async fn watch(mut self) {
		info!("job watch loop started");
		loop {
			self.step().await;
		}
	}

	/// Wait for the next job modification and handle it.
	async fn step(&mut self) {
		let job = self.watch.next_event().await;
		if job.is_failed() {
			self.handler.delete_and_notify_if_failed(&job).await;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use argus_core::{Clock, FixedClock, MockNotifier, Notification, WorkerKind};
	use argus_k8s::{JobEvent, MockJobApi};
	use chrono::{DateTime, Utc};
	use k8s_openapi::api::batch::v1::{Job, JobCondition, JobStatus};
	use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
	use std::collections::BTreeMap;
	use std::time::Duration;

	fn base_time() -> DateTime<Utc> {
		"2024-03-15T10:00:00Z".parse().unwrap()
	}

	fn monitor_with(api: Arc<MockJobApi>, notifier: Arc<MockNotifier>) -> JobMonitor {
		let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(base_time()));
		let handler = Arc::new(JobHandler::new(
			api.clone(),
			notifier,
			clock,
			Duration::from_secs(60),
		));
		let watch = JobWatchHelper::new(api, Some("rv1".to_string()));
		JobMonitor::new(watch, handler)
	}

	fn job(name: &str, failed: bool) -> Job {
		let mut labels = BTreeMap::new();
		labels.insert("run-id".to_string(), "42".to_string());
		labels.insert("trace-id-0".to_string(), "some-trace".to_string());

		let conditions = failed.then(|| {
			vec![JobCondition {
				type_: "Failed".to_string(),
				status: "True".to_string(),
				..Default::default()
			}]
		});

		Job {
			metadata: ObjectMeta {
				name: Some(name.to_string()),
				labels: Some(labels),
				..Default::default()
			},
			status: Some(JobStatus {
				conditions,
				..Default::default()
			}),
			..Default::default()
		}
	}

	#[tokio::test]
	async fn a_failed_job_event_triggers_delete_and_notification() {
		let api = Arc::new(MockJobApi::new());
		let notifier = Arc::new(MockNotifier::new());
		api.queue_watch(vec![Ok(JobEvent::Modified(job("scanner-42-abc", true)))]);

		let mut monitor = monitor_with(api.clone(), notifier.clone());
		monitor.step().await;

		assert_eq!(api.deleted_jobs(), vec!["scanner-42-abc"]);
		assert_eq!(
			notifier.sent(),
			vec![Notification::JobFailed {
				run_id: 42,
				worker: WorkerKind::Scanner,
				trace_id: "some-trace".to_string(),
			}]
		);
	}

	#[tokio::test]
	async fn a_running_job_event_is_ignored() {
		let api = Arc::new(MockJobApi::new());
		let notifier = Arc::new(MockNotifier::new());
		api.queue_watch(vec![Ok(JobEvent::Modified(job("scanner-42-abc", false)))]);

		let mut monitor = monitor_with(api.clone(), notifier.clone());
		monitor.step().await;

		assert!(api.deleted_jobs().is_empty());
		assert!(notifier.sent().is_empty());
	}

	#[tokio::test]
	async fn repeated_failure_events_are_handled_once() {
		let api = Arc::new(MockJobApi::new());
		let notifier = Arc::new(MockNotifier::new());
		api.queue_watch(vec![
			Ok(JobEvent::Modified(job("scanner-42-abc", true))),
			Ok(JobEvent::Modified(job("scanner-42-abc", true))),
		]);

		let mut monitor = monitor_with(api.clone(), notifier.clone());
		monitor.step().await;
		monitor.step().await;

		// The handler's dedup window absorbs the second event.
		assert_eq!(api.deleted_jobs(), vec!["scanner-42-abc"]);
		assert_eq!(notifier.sent().len(), 1);
	}
}
