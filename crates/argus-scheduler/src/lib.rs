// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Periodic task runner for the Argus reconcilers.
//!
//! Each registered task gets its own tokio task running a sleep/run loop:
//! the first invocation happens one interval after registration, and the
//! next tick's delay starts only after the current invocation finished, so
//! a task never overlaps itself. Different tasks run concurrently. A tick
//! that returns an error is logged and does not unregister the task.
//!
//! [`Scheduler::close`] cancels everything immediately; there is no drain
//! period. Ticks only perform idempotent cluster deletes and read-only
//! database queries, so an abandoned tick is safe.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// A unit of periodic work.
#[async_trait]
pub trait Task: Send + Sync {
	/// Short identifier used in log output.
	fn name(&self) -> &str;

	/// Run one tick.
	async fn run(&self) -> anyhow::Result<()>;
}

/// Runs registered tasks at fixed intervals until closed.
pub struct Scheduler {
	shutdown_tx: broadcast::Sender<()>,
	handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
	pub fn new() -> Self {
		let (shutdown_tx, _) = broadcast::channel(1);
		Self {
			shutdown_tx,
			handles: Mutex::new(Vec::new()),
		}
	}

	/// Register a task to run every `interval`, starting one interval from
	/// now.
	pub async fn schedule(&self, interval: Duration, task: Arc<dyn Task>) {
		let mut shutdown_rx = self.shutdown_tx.subscribe();

		let handle = tokio::spawn(async move {
			loop {
				tokio::select! {
					_ = tokio::time::sleep(interval) => {
						debug!(task = task.name(), "running scheduled task");
						if let Err(err) = task.run().await {
							error!(task = task.name(), error = %err, "scheduled task failed");
						}
					}
					_ = shutdown_rx.recv() => {
						info!(task = task.name(), "stopping scheduled task");
						break;
					}
				}
			}
		});

		self.handles.lock().await.push(handle);
	}

	/// Cancel all registered tasks. In-flight ticks are aborted.
	pub async fn close(&self) {
		let _ = self.shutdown_tx.send(());

		let mut handles = self.handles.lock().await;
		for handle in handles.drain(..) {
			handle.abort();
			let _ = handle.await;
		}

		info!("scheduler closed");
	}
}

impl Default for Scheduler {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};
	use tokio::sync::Notify;

	struct CountingTask {
		runs: AtomicU32,
		fail_first: bool,
		notify: Notify,
	}

	impl CountingTask {
		fn new(fail_first: bool) -> Self {
			Self {
				runs: AtomicU32::new(0),
				fail_first,
				notify: Notify::new(),
			}
		}

		fn runs(&self) -> u32 {
			self.runs.load(Ordering::SeqCst)
		}
	}

	#[async_trait]
	impl Task for CountingTask {
		fn name(&self) -> &str {
			"counting"
		}

		async fn run(&self) -> anyhow::Result<()> {
			let run = self.runs.fetch_add(1, Ordering::SeqCst);
			self.notify.notify_one();
			if self.fail_first && run == 0 {
				anyhow::bail!("first tick fails");
			}
			Ok(())
		}
	}

	#[tokio::test(start_paused = true)]
	async fn first_run_happens_after_one_interval() {
		let scheduler = Scheduler::new();
		let task = Arc::new(CountingTask::new(false));
		scheduler
			.schedule(Duration::from_secs(60), task.clone())
			.await;

		// Nothing runs before the interval has elapsed.
		tokio::time::sleep(Duration::from_secs(59)).await;
		assert_eq!(task.runs(), 0);

		tokio::time::sleep(Duration::from_secs(2)).await;
		task.notify.notified().await;
		assert_eq!(task.runs(), 1);

		scheduler.close().await;
	}

	#[tokio::test(start_paused = true)]
	async fn a_failing_tick_does_not_stop_the_task() {
		let scheduler = Scheduler::new();
		let task = Arc::new(CountingTask::new(true));
		scheduler
			.schedule(Duration::from_secs(10), task.clone())
			.await;

		tokio::time::sleep(Duration::from_secs(11)).await;
		task.notify.notified().await;
		assert_eq!(task.runs(), 1);

		// The failure above must not unregister the task.
		tokio::time::sleep(Duration::from_secs(10)).await;
		task.notify.notified().await;
		assert_eq!(task.runs(), 2);

		scheduler.close().await;
	}

	#[tokio::test(start_paused = true)]
	async fn tasks_run_independently() {
		let scheduler = Scheduler::new();
		let fast = Arc::new(CountingTask::new(false));
		let slow = Arc::new(CountingTask::new(false));
		scheduler
			.schedule(Duration::from_secs(10), fast.clone())
			.await;
		scheduler
			.schedule(Duration::from_secs(100), slow.clone())
			.await;

		tokio::time::sleep(Duration::from_secs(45)).await;
		assert_eq!(fast.runs(), 4);
		assert_eq!(slow.runs(), 0);

		scheduler.close().await;
	}

	#[tokio::test(start_paused = true)]
	async fn close_stops_future_ticks() {
		let scheduler = Scheduler::new();
		let task = Arc::new(CountingTask::new(false));
		scheduler
			.schedule(Duration::from_secs(10), task.clone())
			.await;

		scheduler.close().await;

		tokio::time::sleep(Duration::from_secs(60)).await;
		assert_eq!(task.runs(), 0);
	}
}
