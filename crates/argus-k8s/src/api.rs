// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The seam between Argus and the cluster's job API.
//!
//! [`JobApi`] is the narrow surface the monitor actually needs: list jobs,
//! watch them, delete jobs and their pods. [`KubeJobApi`] backs it with the
//! `kube` client; [`MockJobApi`] scripts responses for tests without a
//! cluster.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DeleteParams, ListParams, WatchParams};
use kube::core::WatchEvent;
use kube::Client;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::error::{K8sError, Result};

/// A snapshot of jobs plus the stream position it was taken at.
#[derive(Debug, Clone, Default)]
pub struct JobList {
	pub resource_version: Option<String>,
	pub items: Vec<Job>,
}

/// One entry of the job change stream.
#[derive(Debug, Clone)]
pub enum JobEvent {
	Added(Job),
	Modified(Job),
	Deleted(Job),
	/// A checkpoint carrying only cursor progress, no state change.
	Bookmark(String),
}

/// The change stream itself. Items are `Err` for transport, decode, and
/// server-side watch errors; consumers are expected to discard the stream
/// and reopen.
pub type WatchStream = BoxStream<'static, Result<JobEvent>>;

/// Minimal surface of the cluster job API used by the monitor.
///
/// All deletes are idempotent: removing an object that no longer exists is
/// success, which is what lets the watch path, the reaper, and the finders
/// race on the same job safely.
#[async_trait]
pub trait JobApi: Send + Sync {
	/// List jobs in the monitored namespace, optionally filtered by a label
	/// selector and capped at `limit` items.
	async fn list_jobs(&self, selector: Option<&str>, limit: Option<u32>) -> Result<JobList>;

	/// Open the change stream at the given resource version.
	async fn watch_jobs(&self, selector: Option<&str>, resource_version: &str)
		-> Result<WatchStream>;

	/// Delete a job by name. Deleting an absent job is not an error.
	async fn delete_job(&self, name: &str) -> Result<()>;

	/// Names of the pods created for the given job.
	async fn list_pods_for_job(&self, job_name: &str) -> Result<Vec<String>>;

	/// Delete a pod by name. Deleting an absent pod is not an error.
	async fn delete_pod(&self, name: &str) -> Result<()>;
}

/// [`JobApi`] implementation on top of the `kube` client.
#[derive(Clone)]
pub struct KubeJobApi {
	jobs: Api<Job>,
	pods: Api<Pod>,
}

impl KubeJobApi {
	/// Create an adapter scoped to the given namespace.
	pub fn new(client: Client, namespace: &str) -> Self {
		Self {
			jobs: Api::namespaced(client.clone(), namespace),
			pods: Api::namespaced(client, namespace),
		}
	}
}

/// Translate a raw watch event into a [`JobEvent`]. Server-side error
/// events (for instance a 410 Gone for an expired resource version) become
/// stream errors so the caller reopens the watch.
fn convert_event(event: WatchEvent<Job>) -> Result<JobEvent> {
	match event {
		WatchEvent::Added(job) => Ok(JobEvent::Added(job)),
		WatchEvent::Modified(job) => Ok(JobEvent::Modified(job)),
		WatchEvent::Deleted(job) => Ok(JobEvent::Deleted(job)),
		WatchEvent::Bookmark(bookmark) => Ok(JobEvent::Bookmark(bookmark.metadata.resource_version)),
		WatchEvent::Error(response) => Err(K8sError::Stream(response.to_string())),
	}
}

/// Whether a kube error is a 404 for the object being deleted.
fn is_not_found(err: &kube::Error) -> bool {
	matches!(err, kube::Error::Api(response) if response.code == 404)
}

#[async_trait]
impl JobApi for KubeJobApi {
	async fn list_jobs(&self, selector: Option<&str>, limit: Option<u32>) -> Result<JobList> {
		let mut params = ListParams::default();
		if let Some(selector) = selector {
			params = params.labels(selector);
		}
		if let Some(limit) = limit {
			params = params.limit(limit);
		}

		let list = self.jobs.list(&params).await?;
		Ok(JobList {
			resource_version: list.metadata.resource_version,
			items: list.items,
		})
	}

	async fn watch_jobs(
		&self,
		selector: Option<&str>,
		resource_version: &str,
	) -> Result<WatchStream> {
		let mut params = WatchParams::default();
		if let Some(selector) = selector {
			params = params.labels(selector);
		}

		let stream = self.jobs.watch(&params, resource_version).await?;
		Ok(
			stream
				.map(|item| item.map_err(K8sError::from).and_then(convert_event))
				.boxed(),
		)
	}

	async fn delete_job(&self, name: &str) -> Result<()> {
		match self.jobs.delete(name, &DeleteParams::background()).await {
			Ok(_) => Ok(()),
			Err(err) if is_not_found(&err) => Ok(()),
			Err(err) => Err(err.into()),
		}
	}

	async fn list_pods_for_job(&self, job_name: &str) -> Result<Vec<String>> {
		let params = ListParams::default().labels(&format!("job-name={job_name}"));
		let pods = self.pods.list(&params).await?;

		Ok(
			pods
				.items
				.into_iter()
				.filter_map(|pod| pod.metadata.name)
				.collect(),
		)
	}

	async fn delete_pod(&self, name: &str) -> Result<()> {
		match self.pods.delete(name, &DeleteParams::default()).await {
			Ok(_) => Ok(()),
			Err(err) if is_not_found(&err) => Ok(()),
			Err(err) => Err(err.into()),
		}
	}
}

/// A scriptable [`JobApi`] for tests.
///
/// List and watch responses are consumed FIFO; once a queue is empty, lists
/// return an empty snapshot and watches return a stream that never yields,
/// mimicking a quiet cluster.
#[derive(Default)]
pub struct MockJobApi {
	lists: Mutex<VecDeque<Result<JobList>>>,
	watches: Mutex<VecDeque<Result<Vec<Result<JobEvent>>>>>,
	pods: Mutex<HashMap<String, Vec<String>>>,
	job_delete_errors: Mutex<VecDeque<String>>,
	list_selectors: Mutex<Vec<Option<String>>>,
	watch_versions: Mutex<Vec<String>>,
	deleted_jobs: Mutex<Vec<String>>,
	deleted_pods: Mutex<Vec<String>>,
}

impl MockJobApi {
	pub fn new() -> Self {
		Self::default()
	}

	/// Queue a listing response.
	pub fn queue_job_list(&self, resource_version: &str, items: Vec<Job>) {
		self.lists.lock().unwrap().push_back(Ok(JobList {
			resource_version: Some(resource_version.to_string()),
			items,
		}));
	}

	/// Queue a failing listing response.
	pub fn queue_list_error(&self, message: &str) {
		self
			.lists
			.lock()
			.unwrap()
			.push_back(Err(K8sError::Stream(message.to_string())));
	}

	/// Queue a watch stream yielding the given items.
	pub fn queue_watch(&self, events: Vec<Result<JobEvent>>) {
		self.watches.lock().unwrap().push_back(Ok(events));
	}

	/// Queue a watch open that fails outright.
	pub fn queue_watch_error(&self, message: &str) {
		self
			.watches
			.lock()
			.unwrap()
			.push_back(Err(K8sError::Stream(message.to_string())));
	}

	/// Register pods that belong to a job.
	pub fn set_pods_for_job(&self, job_name: &str, pods: &[&str]) {
		self.pods.lock().unwrap().insert(
			job_name.to_string(),
			pods.iter().map(|p| p.to_string()).collect(),
		);
	}

	/// Make the next job delete fail with the given message.
	pub fn fail_next_job_delete(&self, message: &str) {
		self
			.job_delete_errors
			.lock()
			.unwrap()
			.push_back(message.to_string());
	}

	/// Selectors passed to `list_jobs`, in call order.
	pub fn list_selectors(&self) -> Vec<Option<String>> {
		self.list_selectors.lock().unwrap().clone()
	}

	/// Resource versions watches were opened at, in call order.
	pub fn watch_versions(&self) -> Vec<String> {
		self.watch_versions.lock().unwrap().clone()
	}

	/// Names of deleted jobs, in call order.
	pub fn deleted_jobs(&self) -> Vec<String> {
		self.deleted_jobs.lock().unwrap().clone()
	}

	/// Names of deleted pods, in call order.
	pub fn deleted_pods(&self) -> Vec<String> {
		self.deleted_pods.lock().unwrap().clone()
	}
}

#[async_trait]
impl JobApi for MockJobApi {
	async fn list_jobs(&self, selector: Option<&str>, _limit: Option<u32>) -> Result<JobList> {
		self
			.list_selectors
			.lock()
			.unwrap()
			.push(selector.map(|s| s.to_string()));

		match self.lists.lock().unwrap().pop_front() {
			Some(response) => response,
			None => Ok(JobList::default()),
		}
	}

	async fn watch_jobs(
		&self,
		_selector: Option<&str>,
		resource_version: &str,
	) -> Result<WatchStream> {
		self
			.watch_versions
			.lock()
			.unwrap()
			.push(resource_version.to_string());

		match self.watches.lock().unwrap().pop_front() {
			Some(Ok(events)) => Ok(futures::stream::iter(events).boxed()),
			Some(Err(err)) => Err(err),
			None => Ok(futures::stream::pending().boxed()),
		}
	}

	async fn delete_job(&self, name: &str) -> Result<()> {
		if let Some(message) = self.job_delete_errors.lock().unwrap().pop_front() {
			return Err(K8sError::Stream(message));
		}
		self.deleted_jobs.lock().unwrap().push(name.to_string());
		Ok(())
	}

	async fn list_pods_for_job(&self, job_name: &str) -> Result<Vec<String>> {
		Ok(
			self
				.pods
				.lock()
				.unwrap()
				.get(job_name)
				.cloned()
				.unwrap_or_default(),
		)
	}

	async fn delete_pod(&self, name: &str) -> Result<()> {
		self.deleted_pods.lock().unwrap().push(name.to_string());
		Ok(())
	}
}
