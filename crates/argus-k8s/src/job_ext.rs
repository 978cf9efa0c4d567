// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Classification predicates and label accessors for cluster jobs.
//!
//! Worker jobs carry three kinds of metadata Argus relies on: the `worker`
//! label naming the pipeline stage, the `run-id` label tying the job to a
//! pipeline run, and the `trace-id-N` labels carrying the log-correlation
//! id. Trace ids are split over several labels because Kubernetes caps
//! label values at 63 characters; they are re-concatenated in index order.

use chrono::{DateTime, Utc};
use k8s_openapi::api::batch::v1::Job;

use argus_core::{RunId, WorkerKind};

/// Label holding the pipeline run id.
pub const RUN_ID_LABEL: &str = "run-id";

/// Prefix of the labels holding the chunks of the trace id.
pub const TRACE_LABEL_PREFIX: &str = "trace-id-";

/// Label naming the worker kind of a job.
pub const WORKER_LABEL: &str = "worker";

/// Condition type reported by jobs that have failed.
const FAILED_CONDITION: &str = "Failed";

/// Condition type reported by jobs that completed normally.
const COMPLETE_CONDITION: &str = "Complete";

/// Label selector matching the jobs of a single worker kind.
pub fn worker_selector(worker: WorkerKind) -> String {
	format!("{WORKER_LABEL}={worker}")
}

/// Label selector matching the jobs of all pipeline workers. Other jobs in
/// the namespace (for instance operator-owned ones) are never touched.
pub fn all_workers_selector() -> String {
	let kinds = WorkerKind::ALL
		.iter()
		.map(|k| k.as_str())
		.collect::<Vec<_>>()
		.join(",");
	format!("{WORKER_LABEL} in ({kinds})")
}

/// Read-side helpers over raw [`Job`] objects.
pub trait JobExt {
	/// The job's name, if the metadata carries one.
	fn job_name(&self) -> Option<&str>;

	/// Whether the job reports a `Failed` condition. Still-running jobs
	/// report no such condition.
	fn is_failed(&self) -> bool;

	/// Whether the job has finished, successfully or not.
	fn is_completed(&self) -> bool;

	/// Whether the job has exceeded its allowed running time: it is not yet
	/// completed and was started at or before `threshold`. The comparison is
	/// inclusive, so a job started exactly at the threshold instant counts
	/// as timed out.
	fn is_timeout(&self, threshold: DateTime<Utc>) -> bool;

	/// Whether the job completed before `time`. Failed jobs carry no
	/// completion time; they are treated as completed arbitrarily long ago
	/// so they are handled immediately.
	fn completed_before(&self, time: DateTime<Utc>) -> bool;

	/// The pipeline run id from the `run-id` label, if present and numeric.
	fn run_id(&self) -> Option<RunId>;

	/// The trace id assembled from the `trace-id-N` labels, empty if none
	/// are present.
	fn trace_id(&self) -> String;
}

impl JobExt for Job {
	fn job_name(&self) -> Option<&str> {
		self.metadata.name.as_deref()
	}

	fn is_failed(&self) -> bool {
		self
			.status
			.as_ref()
			.and_then(|s| s.conditions.as_ref())
			.is_some_and(|conditions| conditions.iter().any(|c| c.type_ == FAILED_CONDITION))
	}

	fn is_completed(&self) -> bool {
		let Some(status) = self.status.as_ref() else {
			return false;
		};

		status.completion_time.is_some()
			|| status.conditions.as_ref().is_some_and(|conditions| {
				conditions
					.iter()
					.any(|c| c.type_ == COMPLETE_CONDITION || c.type_ == FAILED_CONDITION)
			})
	}

	fn is_timeout(&self, threshold: DateTime<Utc>) -> bool {
		if self.is_completed() {
			return false;
		}

		self
			.status
			.as_ref()
			.and_then(|s| s.start_time.as_ref())
			.is_some_and(|start| start.0 <= threshold)
	}

	fn completed_before(&self, time: DateTime<Utc>) -> bool {
		if !self.is_completed() {
			return false;
		}

		match self.status.as_ref().and_then(|s| s.completion_time.as_ref()) {
			Some(completion) => completion.0 < time,
			None => true,
		}
	}

	fn run_id(&self) -> Option<RunId> {
		self
			.metadata
			.labels
			.as_ref()?
			.get(RUN_ID_LABEL)?
			.parse()
			.ok()
	}

	fn trace_id(&self) -> String {
		let Some(labels) = self.metadata.labels.as_ref() else {
			return String::new();
		};

		let mut chunks: Vec<(usize, &str)> = labels
			.iter()
			.filter_map(|(key, value)| {
				let index = key.strip_prefix(TRACE_LABEL_PREFIX)?.parse().ok()?;
				Some((index, value.as_str()))
			})
			.collect();
		chunks.sort_by_key(|(index, _)| *index);

		chunks.into_iter().map(|(_, value)| value).collect()
	}
}
