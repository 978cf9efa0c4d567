// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resumable cursor over the cluster's job change stream.
//!
//! Kubernetes expires old stream positions, so a watch cannot simply be
//! reopened at the last version it saw: if the position is gone, the server
//! rejects the resume. [`JobWatchHelper`] follows the standard recovery
//! pattern: track the version of the last bookmark, and whenever a stream
//! has to be reopened without the cursor having advanced since the previous
//! open, refresh the version from a fresh (single-item) listing first.

use futures::StreamExt;
use k8s_openapi::api::batch::v1::Job;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::api::{JobApi, JobEvent, WatchStream};
use crate::job_ext::all_workers_selector;

/// Pause after a failed listing or watch open, so a dead API server does
/// not turn the loop hot.
const REOPEN_DELAY: Duration = Duration::from_secs(1);

/// Maintains an open watch over worker jobs and hands out, one at a time,
/// the events the monitor cares about.
pub struct JobWatchHelper {
	api: Arc<dyn JobApi>,
	selector: String,
	/// Last known position in the change stream, advanced by bookmarks.
	resource_version: Option<String>,
	/// Position the currently (or most recently) open stream was opened at.
	watch_resource_version: Option<String>,
	stream: Option<WatchStream>,
}

impl JobWatchHelper {
	/// Create a helper. If `resource_version` is `None`, the initial
	/// position is obtained from a fresh listing before the first watch.
	pub fn new(api: Arc<dyn JobApi>, resource_version: Option<String>) -> Self {
		Self {
			api,
			selector: all_workers_selector(),
			resource_version,
			watch_resource_version: None,
			stream: None,
		}
	}

	/// Block until the next job modification arrives.
	///
	/// Bookmark events advance the internal cursor and are never returned.
	/// Stream errors and exhausted streams are logged and answered by
	/// reopening; this method never fails, it only waits.
	pub async fn next_event(&mut self) -> Job {
		loop {
			let Some(stream) = self.stream.as_mut() else {
				self.open_stream().await;
				continue;
			};

			match stream.next().await {
				None => {
					debug!("watch stream exhausted, reopening");
					self.stream = None;
				}
				Some(Err(err)) => {
					warn!(error = %err, "error on watch stream, reopening");
					self.stream = None;
				}
				Some(Ok(JobEvent::Bookmark(version))) => {
					debug!(resource_version = %version, "watch bookmark");
					self.resource_version = Some(version);
				}
				Some(Ok(JobEvent::Modified(job))) => return job,
				Some(Ok(_)) => {
					// Additions and deletions are reconciled by the periodic
					// finders, not the watch path.
				}
			}
		}
	}

	/// Open a new stream at the current cursor position, refreshing the
	/// position from a listing if the previous stream made no progress.
	async fn open_stream(&mut self) {
		if self.resource_version == self.watch_resource_version {
			match self.api.list_jobs(Some(&self.selector), Some(1)).await {
				Ok(list) => {
					debug!(resource_version = ?list.resource_version, "refreshed resource version");
					self.resource_version = list.resource_version;
				}
				Err(err) => {
					warn!(error = %err, "could not refresh resource version");
					tokio::time::sleep(REOPEN_DELAY).await;
					return;
				}
			}
		}

		self.watch_resource_version = self.resource_version.clone();
		let version = self.resource_version.clone().unwrap_or_default();

		match self.api.watch_jobs(Some(&self.selector), &version).await {
			Ok(stream) => self.stream = Some(stream),
			Err(err) => {
				warn!(error = %err, "could not open watch stream");
				tokio::time::sleep(REOPEN_DELAY).await;
			}
		}
	}
}
