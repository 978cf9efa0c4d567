// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Periodic cleanup of jobs that exceeded their per-worker time budget.
//!
//! Killing a hung job is deliberately separated from declaring its run
//! failed: this finder only deletes, and the disappearance is then picked up
//! by the lost-jobs sweep, which owns the notification. A job that finishes
//! naturally in the moment between the two sweeps is therefore never
//! reported as failed.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use argus_core::{Clock, WorkerKind};
use argus_k8s::{JobExt, JobHandler};
use argus_scheduler::Task;

use crate::config::TimeoutConfig;

pub struct LongRunningJobsFinder {
	handler: Arc<JobHandler>,
	clock: Arc<dyn Clock>,
	timeouts: TimeoutConfig,
}

impl LongRunningJobsFinder {
	pub fn new(handler: Arc<JobHandler>, clock: Arc<dyn Clock>, timeouts: TimeoutConfig) -> Self {
		Self {
			handler,
			clock,
			timeouts,
		}
	}

	async fn check_worker(&self, worker: WorkerKind) -> anyhow::Result<()> {
		let Some(timeout) = self.timeouts.for_worker(worker) else {
			return Ok(());
		};

		let threshold = self.clock.before(timeout);
		let jobs = self.handler.find_jobs_for_worker(worker).await?;

		for job in jobs {
			if job.is_timeout(threshold) {
				if let Some(name) = job.job_name() {
					info!(job = %name, worker = %worker, "removing long-running job");
					self.handler.delete_job(name).await;
				}
			}
		}

		Ok(())
	}
}

#[async_trait]
impl Task for LongRunningJobsFinder {
	fn name(&self) -> &str {
		"long-running-jobs-finder"
	}

	async fn run(&self) -> anyhow::Result<()> {
		for worker in WorkerKind::ALL {
			self.check_worker(worker).await?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use argus_core::{FixedClock, MockNotifier};
	use argus_k8s::MockJobApi;
	use chrono::{DateTime, Utc};
	use k8s_openapi::api::batch::v1::{Job, JobStatus};
	use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
	use std::time::Duration;

	fn base_time() -> DateTime<Utc> {
		"2024-03-15T10:00:00Z".parse().unwrap()
	}

	fn finder_with(
		api: Arc<MockJobApi>,
		notifier: Arc<MockNotifier>,
		timeouts: TimeoutConfig,
	) -> LongRunningJobsFinder {
		let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(base_time()));
		let handler = Arc::new(JobHandler::new(
			api,
			notifier,
			clock.clone(),
			Duration::from_secs(60),
		));
		LongRunningJobsFinder::new(handler, clock, timeouts)
	}

	fn running_job(name: &str, started: &str) -> Job {
		Job {
			metadata: ObjectMeta {
				name: Some(name.to_string()),
				..Default::default()
			},
			status: Some(JobStatus {
				start_time: Some(Time(started.parse().unwrap())),
				..Default::default()
			}),
			..Default::default()
		}
	}

	fn completed_job(name: &str, started: &str, completed: &str) -> Job {
		Job {
			metadata: ObjectMeta {
				name: Some(name.to_string()),
				..Default::default()
			},
			status: Some(JobStatus {
				start_time: Some(Time(started.parse().unwrap())),
				completion_time: Some(Time(completed.parse().unwrap())),
				..Default::default()
			}),
			..Default::default()
		}
	}

	#[tokio::test]
	async fn jobs_over_their_budget_are_deleted_without_notification() {
		let api = Arc::new(MockJobApi::new());
		let notifier = Arc::new(MockNotifier::new());
		// Scanner timeout 60 minutes puts the threshold at 09:00:00.
		api.queue_job_list(
			"rv1",
			vec![
				running_job("scanner-1-a", "2024-03-15T08:00:00Z"),
				running_job("scanner-2-b", "2024-03-15T09:30:00Z"),
			],
		);

		let finder = finder_with(
			api.clone(),
			notifier.clone(),
			TimeoutConfig::from_minutes(&[(WorkerKind::Scanner, 60)]),
		);
		finder.run().await.unwrap();

		assert_eq!(api.deleted_jobs(), vec!["scanner-1-a"]);
		assert!(notifier.sent().is_empty());
	}

	#[tokio::test]
	async fn a_job_started_exactly_at_the_threshold_is_deleted() {
		let api = Arc::new(MockJobApi::new());
		let notifier = Arc::new(MockNotifier::new());
		api.queue_job_list("rv1", vec![running_job("scanner-1-a", "2024-03-15T09:00:00Z")]);

		let finder = finder_with(
			api.clone(),
			notifier,
			TimeoutConfig::from_minutes(&[(WorkerKind::Scanner, 60)]),
		);
		finder.run().await.unwrap();

		assert_eq!(api.deleted_jobs(), vec!["scanner-1-a"]);
	}

	#[tokio::test]
	async fn completed_jobs_are_left_for_the_reaper() {
		let api = Arc::new(MockJobApi::new());
		let notifier = Arc::new(MockNotifier::new());
		api.queue_job_list(
			"rv1",
			vec![completed_job(
				"scanner-1-a",
				"2024-03-15T07:00:00Z",
				"2024-03-15T08:00:00Z",
			)],
		);

		let finder = finder_with(
			api.clone(),
			notifier,
			TimeoutConfig::from_minutes(&[(WorkerKind::Scanner, 60)]),
		);
		finder.run().await.unwrap();

		assert!(api.deleted_jobs().is_empty());
	}

	#[tokio::test]
	async fn workers_without_a_timeout_are_not_even_listed() {
		let api = Arc::new(MockJobApi::new());
		let notifier = Arc::new(MockNotifier::new());
		api.queue_job_list("rv1", vec![running_job("analyzer-1-a", "2024-03-15T00:00:00Z")]);

		let finder = finder_with(
			api.clone(),
			notifier,
			TimeoutConfig::from_minutes(&[(WorkerKind::Analyzer, 60)]),
		);
		finder.run().await.unwrap();

		// Only the analyzer selector was queried.
		assert_eq!(api.list_selectors(), vec![Some("worker=analyzer".to_string())]);
		assert_eq!(api.deleted_jobs(), vec!["analyzer-1-a"]);
	}
}
