// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Periodic detection of runs whose bookkeeping stopped advancing.
//!
//! This catches a failure mode the job-level sweeps cannot see: the run is
//! still marked active although every job record it owns reached a terminal
//! state, or the orchestrator never created any job for it at all. In both
//! cases the run will never progress on its own.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

use argus_core::{Clock, Notifier, PipelineRun, PipelineRunRepository, WorkerJobRepository, WorkerKind};
use argus_scheduler::Task;

pub struct StuckRunsFinder {
	notifier: Arc<dyn Notifier>,
	jobs: Arc<dyn WorkerJobRepository>,
	runs: Arc<dyn PipelineRunRepository>,
	clock: Arc<dyn Clock>,
	/// Only runs active at least this long are examined, giving fresh runs
	/// time to get their first job dispatched.
	min_age: Duration,
}

impl StuckRunsFinder {
	pub fn new(
		notifier: Arc<dyn Notifier>,
		jobs: Arc<dyn WorkerJobRepository>,
		runs: Arc<dyn PipelineRunRepository>,
		clock: Arc<dyn Clock>,
		min_age: Duration,
	) -> Self {
		Self {
			notifier,
			jobs,
			runs,
			clock,
			min_age,
		}
	}

	async fn check_run(&self, run: &PipelineRun) -> anyhow::Result<()> {
		let mut jobs_total = 0;
		let mut jobs_finished = 0;

		for worker in WorkerKind::ALL {
			if let Some(job) = self.jobs.get_for_run(run.run_id, worker).await? {
				jobs_total += 1;
				if job.status.is_terminal() {
					jobs_finished += 1;
				}
			}
		}

		if jobs_total == 0 || jobs_total == jobs_finished {
			warn!(
				run_id = run.run_id,
				trace_id = %run.trace_id,
				jobs_total,
				jobs_finished,
				"run is stuck"
			);

			if let Err(err) = self.notifier.send_run_stuck(run.run_id, &run.trace_id).await {
				error!(run_id = run.run_id, error = %err, "failed to notify about stuck run");
			}
		}

		Ok(())
	}
}

#[async_trait]
impl Task for StuckRunsFinder {
	fn name(&self) -> &str {
		"stuck-runs-finder"
	}

	async fn run(&self) -> anyhow::Result<()> {
		let threshold = self.clock.before(self.min_age);
		let runs = self.runs.list_active(threshold).await?;

		for run in &runs {
			self.check_run(run).await?;
		}

		Ok(())
	}
}
