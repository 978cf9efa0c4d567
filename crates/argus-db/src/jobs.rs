// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use argus_core::{RepositoryError, RunId, WorkerJob, WorkerJobRepository, WorkerKind};

use crate::error::{DbError, Result};
use crate::{format_time, parse_time};

/// Reads worker job rows written by the dispatcher.
#[derive(Clone)]
pub struct SqliteWorkerJobRepository {
	pool: SqlitePool,
}

type JobRow = (i64, i64, String, String, String);

impl SqliteWorkerJobRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	fn from_row((id, run_id, worker, status, started_at): JobRow) -> Result<WorkerJob> {
		Ok(WorkerJob {
			id,
			run_id,
			worker: worker.parse().map_err(DbError::Internal)?,
			status: status.parse().map_err(DbError::Internal)?,
			started_at: parse_time(&started_at).map_err(DbError::Internal)?,
		})
	}

	async fn query_active(
		&self,
		worker: WorkerKind,
		older_than: DateTime<Utc>,
	) -> Result<Vec<WorkerJob>> {
		let rows = sqlx::query_as::<_, JobRow>(
			r#"
            SELECT id, run_id, worker, status, started_at
            FROM worker_jobs
            WHERE worker = ? AND status IN ('created', 'running') AND started_at <= ?
            ORDER BY started_at
            "#,
		)
		.bind(worker.as_str())
		.bind(format_time(older_than))
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(Self::from_row).collect()
	}

	async fn query_for_run(&self, run_id: RunId, worker: WorkerKind) -> Result<Option<WorkerJob>> {
		let row = sqlx::query_as::<_, JobRow>(
			"SELECT id, run_id, worker, status, started_at FROM worker_jobs WHERE run_id = ? AND worker = ?",
		)
		.bind(run_id)
		.bind(worker.as_str())
		.fetch_optional(&self.pool)
		.await?;

		row.map(Self::from_row).transpose()
	}
}

#[async_trait]
impl WorkerJobRepository for SqliteWorkerJobRepository {
	#[tracing::instrument(skip(self), fields(worker = %worker))]
	async fn list_active(
		&self,
		worker: WorkerKind,
		older_than: DateTime<Utc>,
	) -> std::result::Result<Vec<WorkerJob>, RepositoryError> {
		Ok(self.query_active(worker, older_than).await?)
	}

	#[tracing::instrument(skip(self), fields(worker = %worker))]
	async fn get_for_run(
		&self,
		run_id: RunId,
		worker: WorkerKind,
	) -> std::result::Result<Option<WorkerJob>, RepositoryError> {
		Ok(self.query_for_run(run_id, worker).await?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{create_test_pool, create_worker_jobs_table, insert_worker_job};
	use argus_core::JobStatus;
	use chrono::TimeZone;

	fn at(minute: u32) -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2025, 6, 1, 12, minute, 0).unwrap()
	}

	#[tokio::test]
	async fn lists_only_active_jobs_for_the_worker() {
		let pool = create_test_pool().await;
		create_worker_jobs_table(&pool).await;
		insert_worker_job(&pool, 1, 10, WorkerKind::Analyzer, JobStatus::Running, at(0)).await;
		insert_worker_job(&pool, 2, 11, WorkerKind::Analyzer, JobStatus::Created, at(1)).await;
		insert_worker_job(&pool, 3, 12, WorkerKind::Analyzer, JobStatus::Finished, at(2)).await;
		insert_worker_job(&pool, 4, 13, WorkerKind::Scanner, JobStatus::Running, at(3)).await;

		let repo = SqliteWorkerJobRepository::new(pool);
		let jobs = repo
			.list_active(WorkerKind::Analyzer, at(30))
			.await
			.unwrap();

		let ids: Vec<i64> = jobs.iter().map(|j| j.id).collect();
		assert_eq!(ids, vec![1, 2]);
	}

	#[tokio::test]
	async fn excludes_jobs_started_after_the_threshold() {
		let pool = create_test_pool().await;
		create_worker_jobs_table(&pool).await;
		insert_worker_job(&pool, 1, 10, WorkerKind::Advisor, JobStatus::Running, at(0)).await;
		insert_worker_job(&pool, 2, 11, WorkerKind::Advisor, JobStatus::Running, at(20)).await;

		let repo = SqliteWorkerJobRepository::new(pool);
		let jobs = repo.list_active(WorkerKind::Advisor, at(10)).await.unwrap();

		assert_eq!(jobs.len(), 1);
		assert_eq!(jobs[0].id, 1);
	}

	#[tokio::test]
	async fn includes_jobs_started_exactly_at_the_threshold() {
		let pool = create_test_pool().await;
		create_worker_jobs_table(&pool).await;
		insert_worker_job(&pool, 1, 10, WorkerKind::Reporter, JobStatus::Created, at(5)).await;

		let repo = SqliteWorkerJobRepository::new(pool);
		let jobs = repo.list_active(WorkerKind::Reporter, at(5)).await.unwrap();

		assert_eq!(jobs.len(), 1);
	}

	#[tokio::test]
	async fn gets_a_job_for_a_run_and_worker() {
		let pool = create_test_pool().await;
		create_worker_jobs_table(&pool).await;
		insert_worker_job(&pool, 1, 10, WorkerKind::Evaluator, JobStatus::Failed, at(0)).await;

		let repo = SqliteWorkerJobRepository::new(pool);
		let job = repo
			.get_for_run(10, WorkerKind::Evaluator)
			.await
			.unwrap()
			.unwrap();

		assert_eq!(job.id, 1);
		assert_eq!(job.status, JobStatus::Failed);
		assert_eq!(job.started_at, at(0));

		let missing = repo.get_for_run(10, WorkerKind::Notifier).await.unwrap();
		assert!(missing.is_none());
	}
}
