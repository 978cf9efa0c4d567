// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Read-only views onto the run-state database.
//!
//! The tables behind these traits are owned by the worker-dispatch side of
//! the pipeline; Argus only ever reads them to reconcile against the
//! cluster. The error type is deliberately opaque here so implementations
//! can wrap whatever driver they use.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{PipelineRun, RunId, WorkerJob};
use crate::worker::WorkerKind;

/// Error raised by a repository implementation.
#[derive(Debug, thiserror::Error)]
#[error("repository error: {0}")]
pub struct RepositoryError(pub String);

/// Access to the per-worker job records.
#[async_trait]
pub trait WorkerJobRepository: Send + Sync {
	/// List jobs of the given worker kind that are active (not in a terminal
	/// state) and were started at or before `older_than`. The age cutoff is
	/// the lost-jobs grace period: records younger than it may not have
	/// materialized in the cluster yet.
	async fn list_active(
		&self,
		worker: WorkerKind,
		older_than: DateTime<Utc>,
	) -> Result<Vec<WorkerJob>, RepositoryError>;

	/// Look up the job record of the given worker kind for one pipeline run,
	/// if the dispatcher ever created one.
	async fn get_for_run(
		&self,
		run_id: RunId,
		worker: WorkerKind,
	) -> Result<Option<WorkerJob>, RepositoryError>;
}

/// Access to the pipeline run records.
#[async_trait]
pub trait PipelineRunRepository: Send + Sync {
	/// List runs that are still active and were created at or before
	/// `older_than`.
	async fn list_active(
		&self,
		older_than: DateTime<Utc>,
	) -> Result<Vec<PipelineRun>, RepositoryError>;

	/// Look up a single run by id.
	async fn get(&self, run_id: RunId) -> Result<Option<PipelineRun>, RepositoryError>;
}
