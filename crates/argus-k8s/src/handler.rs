// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared job operations for the watch path and the periodic sweeps.
//!
//! Both the event-driven monitor and the reaper converge on the same
//! primitive: delete a completed job and, if it failed, tell the
//! orchestrator first. Because those two callers can race on the same job,
//! the handler keeps a short-lived cache of recently processed job names so
//! the orchestrator is not notified twice.

use chrono::{DateTime, Utc};
use k8s_openapi::api::batch::v1::Job;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info};

use argus_core::{Clock, Notifier, WorkerKind};

use crate::api::JobApi;
use crate::error::Result;
use crate::job_ext::{all_workers_selector, worker_selector, JobExt};

/// Names of jobs processed within the dedup window, oldest first.
#[derive(Default)]
struct RecentJobs {
	names: HashSet<String>,
	times: VecDeque<(DateTime<Utc>, String)>,
}

/// List, classify, and delete worker jobs.
pub struct JobHandler {
	api: Arc<dyn JobApi>,
	notifier: Arc<dyn Notifier>,
	clock: Arc<dyn Clock>,
	recently_processed_interval: Duration,
	recent: Mutex<RecentJobs>,
}

impl JobHandler {
	pub fn new(
		api: Arc<dyn JobApi>,
		notifier: Arc<dyn Notifier>,
		clock: Arc<dyn Clock>,
		recently_processed_interval: Duration,
	) -> Self {
		Self {
			api,
			notifier,
			clock,
			recently_processed_interval,
			recent: Mutex::new(RecentJobs::default()),
		}
	}

	/// All worker jobs that completed before the given instant.
	pub async fn find_jobs_completed_before(&self, time: DateTime<Utc>) -> Result<Vec<Job>> {
		let list = self
			.api
			.list_jobs(Some(&all_workers_selector()), None)
			.await?;

		Ok(
			list
				.items
				.into_iter()
				.filter(|job| job.completed_before(time))
				.collect(),
		)
	}

	/// All jobs of a single worker kind currently present in the cluster.
	pub async fn find_jobs_for_worker(&self, worker: WorkerKind) -> Result<Vec<Job>> {
		let list = self
			.api
			.list_jobs(Some(&worker_selector(worker)), None)
			.await?;
		Ok(list.items)
	}

	/// Delete the given job; if it carries a failure condition, notify the
	/// orchestrator first.
	///
	/// When the notification cannot be delivered the delete is skipped, so
	/// the job survives for the next sweep and the orchestrator still gets
	/// its notification eventually. Jobs processed within the dedup window
	/// are skipped entirely.
	pub async fn delete_and_notify_if_failed(&self, job: &Job) {
		let Some(name) = job.job_name().map(str::to_string) else {
			return;
		};

		if !self.mark_processed(&name) {
			debug!(job = %name, "job was recently processed, skipping");
			return;
		}

		if job.is_failed() {
			let trace_id = job.trace_id();
			match (job.run_id(), WorkerKind::from_job_name(&name)) {
				(Some(run_id), Some(worker)) if !trace_id.is_empty() => {
					info!(
						job = %name,
						run_id,
						worker = %worker,
						trace_id = %trace_id,
						"detected a failed job"
					);

					if let Err(err) = self.notifier.send_job_failed(run_id, worker, &trace_id).await {
						error!(job = %name, error = %err, "failed to notify about failed job");
						return;
					}
				}
				_ => {
					debug!(job = %name, "failed job lacks run or trace labels, not notifying");
				}
			}
		}

		self.delete_job(&name).await;
	}

	/// Delete a job and the pods it spawned. Kubernetes does not remove
	/// completed pods on its own. Errors are logged and swallowed; every
	/// caller would handle them the same way.
	pub async fn delete_job(&self, name: &str) {
		if let Err(err) = self.api.delete_job(name).await {
			error!(job = %name, error = %err, "could not remove job");
		}

		match self.api.list_pods_for_job(name).await {
			Ok(pods) => {
				for pod in pods {
					info!(pod = %pod, "deleting pod");
					if let Err(err) = self.api.delete_pod(&pod).await {
						error!(pod = %pod, error = %err, "could not remove pod");
					}
				}
			}
			Err(err) => {
				error!(job = %name, error = %err, "could not list pods for job");
			}
		}
	}

	/// Record the job as processed. Returns `false` if it was already
	/// processed within the dedup window.
	fn mark_processed(&self, name: &str) -> bool {
		let now = self.clock.now();
		let threshold = self.clock.before(self.recently_processed_interval);

		let mut recent = self.recent.lock().unwrap();

		while recent
			.times
			.front()
			.is_some_and(|(time, _)| *time < threshold)
		{
			if let Some((_, expired)) = recent.times.pop_front() {
				recent.names.remove(&expired);
			}
		}

		if recent.names.contains(name) {
			return false;
		}

		recent.names.insert(name.to_string());
		recent.times.push_back((now, name.to_string()));
		true
	}
}
