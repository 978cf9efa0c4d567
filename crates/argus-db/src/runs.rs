// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use argus_core::{PipelineRun, PipelineRunRepository, RepositoryError, RunId};

use crate::error::{DbError, Result};
use crate::{format_time, parse_time};

/// Reads pipeline run rows written by the orchestrator.
#[derive(Clone)]
pub struct SqlitePipelineRunRepository {
	pool: SqlitePool,
}

type RunRow = (i64, String, String);

impl SqlitePipelineRunRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	fn from_row((run_id, created_at, trace_id): RunRow) -> Result<PipelineRun> {
		Ok(PipelineRun {
			run_id,
			created_at: parse_time(&created_at).map_err(DbError::Internal)?,
			trace_id,
		})
	}

	async fn query_active(&self, older_than: DateTime<Utc>) -> Result<Vec<PipelineRun>> {
		let rows = sqlx::query_as::<_, RunRow>(
			r#"
            SELECT run_id, created_at, trace_id
            FROM pipeline_runs
            WHERE status = 'active' AND created_at <= ?
            ORDER BY created_at
            "#,
		)
		.bind(format_time(older_than))
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(Self::from_row).collect()
	}

	async fn query_get(&self, run_id: RunId) -> Result<Option<PipelineRun>> {
		let row = sqlx::query_as::<_, RunRow>(
			"SELECT run_id, created_at, trace_id FROM pipeline_runs WHERE run_id = ?",
		)
		.bind(run_id)
		.fetch_optional(&self.pool)
		.await?;

		row.map(Self::from_row).transpose()
	}
}

#[async_trait]
impl PipelineRunRepository for SqlitePipelineRunRepository {
	#[tracing::instrument(skip(self))]
	async fn list_active(
		&self,
		older_than: DateTime<Utc>,
	) -> std::result::Result<Vec<PipelineRun>, RepositoryError> {
		Ok(self.query_active(older_than).await?)
	}

	#[tracing::instrument(skip(self))]
	async fn get(&self, run_id: RunId) -> std::result::Result<Option<PipelineRun>, RepositoryError> {
		Ok(self.query_get(run_id).await?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{create_pipeline_runs_table, create_test_pool, insert_pipeline_run};
	use chrono::TimeZone;

	fn at(minute: u32) -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2025, 6, 1, 12, minute, 0).unwrap()
	}

	#[tokio::test]
	async fn lists_only_active_runs_older_than_the_threshold() {
		let pool = create_test_pool().await;
		create_pipeline_runs_table(&pool).await;
		insert_pipeline_run(&pool, 10, "active", at(0), "trace-10").await;
		insert_pipeline_run(&pool, 11, "active", at(20), "trace-11").await;
		insert_pipeline_run(&pool, 12, "finished", at(0), "trace-12").await;

		let repo = SqlitePipelineRunRepository::new(pool);
		let runs = repo.list_active(at(10)).await.unwrap();

		assert_eq!(runs.len(), 1);
		assert_eq!(runs[0].run_id, 10);
		assert_eq!(runs[0].trace_id, "trace-10");
	}

	#[tokio::test]
	async fn gets_a_run_by_id() {
		let pool = create_test_pool().await;
		create_pipeline_runs_table(&pool).await;
		insert_pipeline_run(&pool, 42, "active", at(0), "trace-42").await;

		let repo = SqlitePipelineRunRepository::new(pool);
		let run = repo.get(42).await.unwrap().unwrap();

		assert_eq!(run.run_id, 42);
		assert_eq!(run.created_at, at(0));
		assert_eq!(run.trace_id, "trace-42");

		assert!(repo.get(43).await.unwrap().is_none());
	}
}
