// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite-backed implementations of the Argus repository traits.
//!
//! The `worker_jobs` and `pipeline_runs` tables are owned and written by the
//! worker-dispatch side of the pipeline; Argus only reads them. Timestamps
//! are stored as RFC 3339 text with fixed-width nanoseconds so that string
//! comparison orders the same way the instants do.

pub mod error;
pub mod jobs;
pub mod pool;
pub mod runs;
pub mod testing;

pub use error::{DbError, Result};
pub use jobs::SqliteWorkerJobRepository;
pub use pool::create_pool;
pub use runs::SqlitePipelineRunRepository;

use chrono::{DateTime, SecondsFormat, Utc};

/// Render a timestamp the way the pipeline stores them.
pub(crate) fn format_time(time: DateTime<Utc>) -> String {
	time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse a stored timestamp.
pub(crate) fn parse_time(value: &str) -> std::result::Result<DateTime<Utc>, String> {
	DateTime::parse_from_rfc3339(value)
		.map(|t| t.with_timezone(&Utc))
		.map_err(|err| format!("invalid timestamp '{value}': {err}"))
}
