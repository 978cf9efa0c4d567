// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Periodic reconciliation of database job records against the cluster.
//!
//! A job record that is active in the database but has no matching cluster
//! job is lost: the job was deleted manually, evicted with its node, killed
//! by the long-running sweep, or its terminal watch event was missed while
//! it never reached a completed state. Without this sweep such a run would
//! stay "running" in the database forever.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

use argus_core::{
	Clock, Notifier, PipelineRunRepository, RunId, WorkerJobRepository, WorkerKind,
};
use argus_k8s::{JobExt, JobHandler};
use argus_scheduler::Task;

pub struct LostJobsFinder {
	handler: Arc<JobHandler>,
	notifier: Arc<dyn Notifier>,
	jobs: Arc<dyn WorkerJobRepository>,
	runs: Arc<dyn PipelineRunRepository>,
	clock: Arc<dyn Clock>,
	/// Grace period for records the dispatcher has written but whose cluster
	/// job may not have materialized yet.
	min_age: Duration,
}

impl LostJobsFinder {
	pub fn new(
		handler: Arc<JobHandler>,
		notifier: Arc<dyn Notifier>,
		jobs: Arc<dyn WorkerJobRepository>,
		runs: Arc<dyn PipelineRunRepository>,
		clock: Arc<dyn Clock>,
		min_age: Duration,
	) -> Self {
		Self {
			handler,
			notifier,
			jobs,
			runs,
			clock,
			min_age,
		}
	}

	async fn check_worker(&self, worker: WorkerKind) -> anyhow::Result<()> {
		let cluster_runs: HashSet<RunId> = self
			.handler
			.find_jobs_for_worker(worker)
			.await?
			.iter()
			.filter_map(|job| job.run_id())
			.collect();

		let threshold = self.clock.before(self.min_age);
		let records = self.jobs.list_active(worker, threshold).await?;

		for record in records {
			if cluster_runs.contains(&record.run_id) {
				continue;
			}
			self.report_lost(record.run_id, worker).await?;
		}

		Ok(())
	}

	async fn report_lost(&self, run_id: RunId, worker: WorkerKind) -> anyhow::Result<()> {
		let trace_id = self
			.runs
			.get(run_id)
			.await?
			.map(|run| run.trace_id)
			.unwrap_or_default();

		warn!(run_id, worker = %worker, trace_id = %trace_id, "job lost from the cluster");

		if let Err(err) = self.notifier.send_job_lost(run_id, worker).await {
			error!(run_id, worker = %worker, error = %err, "failed to notify about lost job");
		}

		Ok(())
	}
}

#[async_trait]
impl Task for LostJobsFinder {
	fn name(&self) -> &str {
		"lost-jobs-finder"
	}

	async fn run(&self) -> anyhow::Result<()> {
		for worker in WorkerKind::ALL {
			self.check_worker(worker).await?;
		}
		Ok(())
	}
}
