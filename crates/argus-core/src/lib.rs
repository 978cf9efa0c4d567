// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Domain model and seam traits for the Argus job monitor.
//!
//! Argus reconciles two independently-mutating sources of truth: the
//! Kubernetes job state and the pipeline run-state database. This crate
//! holds the types shared by both sides plus the traits at the seams
//! (repositories, orchestrator notifier, clock) so the reconcilers can be
//! tested without a cluster or a database.

pub mod model;
pub mod notify;
pub mod repository;
pub mod time;
pub mod worker;

pub use model::{JobStatus, PipelineRun, RunId, WorkerJob};
pub use notify::{MockNotifier, Notification, Notifier, NotifyError};
pub use repository::{PipelineRunRepository, RepositoryError, WorkerJobRepository};
pub use time::{Clock, FixedClock, SystemClock};
pub use worker::WorkerKind;
