// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Periodic sweep over completed jobs.
//!
//! The reaper is the safety net behind the watch path: any completed job
//! still present in the cluster after `max_age` is cleaned up here, and a
//! failed one still produces its notification even if its watch event was
//! missed.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use argus_core::Clock;
use argus_k8s::JobHandler;
use argus_scheduler::Task;

pub struct Reaper {
	handler: Arc<JobHandler>,
	clock: Arc<dyn Clock>,
	max_age: Duration,
}

impl Reaper {
	pub fn new(handler: Arc<JobHandler>, clock: Arc<dyn Clock>, max_age: Duration) -> Self {
		Self {
			handler,
			clock,
			max_age,
		}
	}
}

#[async_trait]
impl Task for Reaper {
	fn name(&self) -> &str {
		"reaper"
	}

	async fn run(&self) -> anyhow::Result<()> {
		let threshold = self.clock.before(self.max_age);
		let jobs = self.handler.find_jobs_completed_before(threshold).await?;

		debug!(count = jobs.len(), "reaping completed jobs");
		for job in &jobs {
			self.handler.delete_and_notify_if_failed(job).await;
		}

		Ok(())
	}
}
