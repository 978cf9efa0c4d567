// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::worker::WorkerKind;

/// Identifier of one execution of the full compliance pipeline.
pub type RunId = i64;

/// Lifecycle states of a worker job as tracked in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
	Created,
	Running,
	Finished,
	Failed,
	FinishedWithIssues,
}

impl JobStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			JobStatus::Created => "created",
			JobStatus::Running => "running",
			JobStatus::Finished => "finished",
			JobStatus::Failed => "failed",
			JobStatus::FinishedWithIssues => "finished_with_issues",
		}
	}

	/// Whether this status marks the end of a job's lifecycle. Jobs in a
	/// terminal state are never expected to change again.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			JobStatus::Finished | JobStatus::Failed | JobStatus::FinishedWithIssues
		)
	}
}

impl std::str::FromStr for JobStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"created" => Ok(JobStatus::Created),
			"running" => Ok(JobStatus::Running),
			"finished" => Ok(JobStatus::Finished),
			"failed" => Ok(JobStatus::Failed),
			"finished_with_issues" => Ok(JobStatus::FinishedWithIssues),
			_ => Err(format!("unknown job status: {s}")),
		}
	}
}

/// One worker job as recorded in the database, one row per pipeline run per
/// stage. Argus only reads these records; they are owned by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerJob {
	pub id: i64,
	pub run_id: RunId,
	pub worker: WorkerKind,
	pub status: JobStatus,
	pub started_at: DateTime<Utc>,
}

/// An active pipeline run. The trace id correlates log output across the
/// orchestrator, the workers, and Argus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
	pub run_id: RunId,
	pub created_at: DateTime<Utc>,
	pub trace_id: String,
}
