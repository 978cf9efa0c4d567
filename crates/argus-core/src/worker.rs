// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};

/// The pipeline stages that run as Kubernetes jobs, one per pipeline run.
///
/// The worker kind shows up in three places: as the `worker` label on the
/// cluster job, as the prefix of the job name (`scanner-<run>-<suffix>`), and
/// as the discriminator for the per-worker timeout configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerKind {
	Analyzer,
	Advisor,
	Scanner,
	Evaluator,
	Reporter,
	Notifier,
}

impl WorkerKind {
	/// All worker kinds in pipeline order.
	pub const ALL: [WorkerKind; 6] = [
		WorkerKind::Analyzer,
		WorkerKind::Advisor,
		WorkerKind::Scanner,
		WorkerKind::Evaluator,
		WorkerKind::Reporter,
		WorkerKind::Notifier,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			WorkerKind::Analyzer => "analyzer",
			WorkerKind::Advisor => "advisor",
			WorkerKind::Scanner => "scanner",
			WorkerKind::Evaluator => "evaluator",
			WorkerKind::Reporter => "reporter",
			WorkerKind::Notifier => "notifier",
		}
	}

	/// Derive the worker kind from a cluster job name. Job names are built as
	/// `<worker>-<run id>-<suffix>`, so everything before the first dash
	/// identifies the worker.
	pub fn from_job_name(name: &str) -> Option<WorkerKind> {
		let prefix = name.split('-').next()?;
		prefix.parse().ok()
	}
}

impl std::fmt::Display for WorkerKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for WorkerKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"analyzer" => Ok(WorkerKind::Analyzer),
			"advisor" => Ok(WorkerKind::Advisor),
			"scanner" => Ok(WorkerKind::Scanner),
			"evaluator" => Ok(WorkerKind::Evaluator),
			"reporter" => Ok(WorkerKind::Reporter),
			"notifier" => Ok(WorkerKind::Notifier),
			_ => Err(format!("unknown worker kind: {s}")),
		}
	}
}
