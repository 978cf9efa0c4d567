// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqliteSynchronous};
use std::str::FromStr;

use crate::error::DbError;

/// Open a pool onto the run-state database.
///
/// The database file is created and migrated by the dispatcher; Argus only
/// reads it, so a missing file is a deployment error and is reported as
/// such rather than papered over with an empty database. WAL mode keeps
/// these reads from blocking the dispatcher's writes.
///
/// # Arguments
/// * `database_url` - SQLite connection string (e.g., "sqlite:./argus.db")
///
/// # Errors
/// Returns `DbError::Internal` for an invalid URL, `DbError::Sqlx` when the
/// database cannot be opened.
#[tracing::instrument(skip(database_url))]
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, DbError> {
	let options = SqliteConnectOptions::from_str(database_url)
		.map_err(|e| DbError::Internal(format!("Invalid database URL: {e}")))?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal);

	let pool = SqlitePool::connect_with(options).await?;

	tracing::debug!("database pool created");
	Ok(pool)
}
