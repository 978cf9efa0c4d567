// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Kubernetes adapter for the Argus job monitor.
//!
//! This crate wraps the cluster's Batch and Core APIs behind the [`JobApi`]
//! trait, adds classification predicates over raw `Job` objects
//! ([`JobExt`]), maintains a resumable cursor over the job change stream
//! ([`JobWatchHelper`]), and bundles the delete/notify primitives every
//! reconciler shares ([`JobHandler`]).
//!
//! Argus never creates jobs; it only lists, watches, and deletes them.

pub mod api;
pub mod error;
pub mod handler;
pub mod job_ext;
pub mod watch;

pub use api::{JobApi, JobEvent, JobList, KubeJobApi, MockJobApi, WatchStream};
pub use error::{K8sError, Result};
pub use handler::JobHandler;
pub use job_ext::{all_workers_selector, worker_selector, JobExt};
pub use watch::JobWatchHelper;
