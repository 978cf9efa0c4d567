// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory pools and schema helpers for tests. The production tables are
//! created and populated by the dispatcher, not by Argus.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;

use argus_core::{JobStatus, WorkerKind};

use crate::format_time;

pub async fn create_test_pool() -> SqlitePool {
	SqlitePool::connect(":memory:").await.unwrap()
}

pub async fn create_worker_jobs_table(pool: &SqlitePool) {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS worker_jobs (
			id INTEGER PRIMARY KEY,
			run_id INTEGER NOT NULL,
			worker TEXT NOT NULL,
			status TEXT NOT NULL,
			started_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await
	.unwrap();
}

pub async fn create_pipeline_runs_table(pool: &SqlitePool) {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS pipeline_runs (
			run_id INTEGER PRIMARY KEY,
			status TEXT NOT NULL,
			created_at TEXT NOT NULL,
			trace_id TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await
	.unwrap();
}

pub async fn insert_worker_job(
	pool: &SqlitePool,
	id: i64,
	run_id: i64,
	worker: WorkerKind,
	status: JobStatus,
	started_at: DateTime<Utc>,
) {
	sqlx::query("INSERT INTO worker_jobs (id, run_id, worker, status, started_at) VALUES (?, ?, ?, ?, ?)")
		.bind(id)
		.bind(run_id)
		.bind(worker.as_str())
		.bind(status.as_str())
		.bind(format_time(started_at))
		.execute(pool)
		.await
		.unwrap();
}

pub async fn insert_pipeline_run(
	pool: &SqlitePool,
	run_id: i64,
	status: &str,
	created_at: DateTime<Utc>,
	trace_id: &str,
) {
	sqlx::query("INSERT INTO pipeline_runs (run_id, status, created_at, trace_id) VALUES (?, ?, ?, ?)")
		.bind(run_id)
		.bind(status)
		.bind(format_time(created_at))
		.bind(trace_id)
		.execute(pool)
		.await
		.unwrap();
}
