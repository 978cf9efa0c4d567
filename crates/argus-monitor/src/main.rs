// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Argus daemon binary.
//!
//! Wires the watch loop and the four periodic finders onto a shared kube
//! client, database pool, and orchestrator notifier, then runs until ctrl-c.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use argus_core::{Clock, Notifier, PipelineRunRepository, SystemClock, WorkerJobRepository};
use argus_db::{create_pool, SqlitePipelineRunRepository, SqliteWorkerJobRepository};
use argus_k8s::{JobApi, JobHandler, JobWatchHelper, KubeJobApi};
use argus_scheduler::Scheduler;

mod config;
mod long_running;
mod lost_jobs;
mod monitor;
mod notifier;
mod reaper;
mod stuck_runs;

use config::MonitorConfig;
use long_running::LongRunningJobsFinder;
use lost_jobs::LostJobsFinder;
use monitor::JobMonitor;
use notifier::HttpNotifier;
use reaper::Reaper;
use stuck_runs::StuckRunsFinder;

/// Argus - Kubernetes job monitor for the compliance-scanning pipeline.
#[derive(Parser, Debug)]
#[command(name = "argus-monitor", about = "Compliance pipeline job monitor", version)]
struct Args {
	/// Path to the TOML config file.
	#[arg(long)]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version information
	Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("argus-monitor {}", env!("CARGO_PKG_VERSION"));
		return Ok(());
	}

	dotenvy::dotenv().ok();

	let config = MonitorConfig::load(args.config.as_deref())?;

	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
		)
		.init();

	info!(
		namespace = %config.namespace,
		orchestrator = %config.orchestrator_url,
		"starting argus-monitor"
	);

	let client = kube::Client::try_default().await?;
	let api: Arc<dyn JobApi> = Arc::new(KubeJobApi::new(client, &config.namespace));

	let pool = create_pool(&config.database_url).await?;
	let job_repo: Arc<dyn WorkerJobRepository> =
		Arc::new(SqliteWorkerJobRepository::new(pool.clone()));
	let run_repo: Arc<dyn PipelineRunRepository> = Arc::new(SqlitePipelineRunRepository::new(pool));

	let notifier: Arc<dyn Notifier> = Arc::new(HttpNotifier::new(&config.orchestrator_url)?);
	let clock: Arc<dyn Clock> = Arc::new(SystemClock);

	let handler = Arc::new(JobHandler::new(
		api.clone(),
		notifier.clone(),
		clock.clone(),
		config.recently_processed_interval(),
	));

	let watch_task = if config.watcher_enabled {
		let monitor = JobMonitor::new(JobWatchHelper::new(api.clone(), None), handler.clone());
		Some(tokio::spawn(monitor.watch()))
	} else {
		None
	};

	let scheduler = Scheduler::new();

	if config.reaper_enabled {
		scheduler
			.schedule(
				config.reaper_interval(),
				Arc::new(Reaper::new(
					handler.clone(),
					clock.clone(),
					config.reaper_max_age(),
				)),
			)
			.await;
	}

	if config.long_running_jobs_enabled {
		scheduler
			.schedule(
				config.long_running_jobs_interval(),
				Arc::new(LongRunningJobsFinder::new(
					handler.clone(),
					clock.clone(),
					config.timeouts.clone(),
				)),
			)
			.await;
	}

	if config.lost_jobs_enabled {
		scheduler
			.schedule(
				config.lost_jobs_interval(),
				Arc::new(LostJobsFinder::new(
					handler.clone(),
					notifier.clone(),
					job_repo.clone(),
					run_repo.clone(),
					clock.clone(),
					config.lost_jobs_min_age(),
				)),
			)
			.await;
	}

	if config.stuck_jobs_enabled {
		scheduler
			.schedule(
				config.stuck_jobs_interval(),
				Arc::new(StuckRunsFinder::new(
					notifier.clone(),
					job_repo.clone(),
					run_repo.clone(),
					clock.clone(),
					config.stuck_jobs_min_age(),
				)),
			)
			.await;
	}

	tokio::signal::ctrl_c().await?;

	info!("shutting down");
	scheduler.close().await;
	if let Some(task) = watch_task {
		task.abort();
	}

	Ok(())
}
