// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Daemon configuration.
//!
//! Loaded once at startup from a TOML file, with `ARGUS_*` environment
//! variables overriding the deployment-specific values. Every knob has a
//! default so an empty file (or none at all) yields a runnable config.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use argus_core::WorkerKind;

/// Default location probed when no `--config` flag is given.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/argus/monitor.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("failed to read config file {path}: {source}")]
	Read {
		path: String,
		source: std::io::Error,
	},

	#[error("failed to parse config file {path}: {source}")]
	Parse {
		path: String,
		source: toml::de::Error,
	},

	#[error("invalid config value: {0}")]
	Invalid(String),
}

/// Per-worker maximum running times, in minutes. Workers without an entry
/// are never treated as long-running.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct TimeoutConfig {
	minutes: HashMap<WorkerKind, u64>,
}

impl TimeoutConfig {
	pub fn for_worker(&self, worker: WorkerKind) -> Option<Duration> {
		self
			.minutes
			.get(&worker)
			.map(|minutes| Duration::from_secs(minutes * 60))
	}

	#[cfg(test)]
	pub fn from_minutes(entries: &[(WorkerKind, u64)]) -> Self {
		Self {
			minutes: entries.iter().copied().collect(),
		}
	}
}

/// Immutable daemon configuration. Never mutated after load.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
	/// Cluster namespace whose worker jobs are monitored.
	pub namespace: String,

	pub watcher_enabled: bool,
	pub reaper_enabled: bool,
	pub lost_jobs_enabled: bool,
	pub long_running_jobs_enabled: bool,
	pub stuck_jobs_enabled: bool,

	pub reaper_interval_secs: u64,
	pub lost_jobs_interval_secs: u64,
	pub long_running_jobs_interval_secs: u64,
	pub stuck_jobs_interval_secs: u64,
	/// Window within which a job name is processed at most once, shared by
	/// the watch path and the reaper.
	pub recently_processed_interval_secs: u64,

	pub reaper_max_age_secs: u64,
	pub lost_jobs_min_age_secs: u64,
	pub stuck_jobs_min_age_secs: u64,

	pub timeouts: TimeoutConfig,

	pub database_url: String,
	pub orchestrator_url: String,
	pub log_level: String,
}

impl Default for MonitorConfig {
	fn default() -> Self {
		Self {
			namespace: "compliance".to_string(),
			watcher_enabled: true,
			reaper_enabled: true,
			lost_jobs_enabled: true,
			long_running_jobs_enabled: true,
			stuck_jobs_enabled: true,
			reaper_interval_secs: 600,
			lost_jobs_interval_secs: 120,
			long_running_jobs_interval_secs: 1200,
			stuck_jobs_interval_secs: 600,
			recently_processed_interval_secs: 60,
			reaper_max_age_secs: 600,
			lost_jobs_min_age_secs: 30,
			stuck_jobs_min_age_secs: 300,
			timeouts: TimeoutConfig::default(),
			database_url: "sqlite:./argus.db".to_string(),
			orchestrator_url: "http://localhost:8080".to_string(),
			log_level: "info".to_string(),
		}
	}
}

impl MonitorConfig {
	/// Load configuration with standard precedence: defaults, then the TOML
	/// file, then `ARGUS_*` environment variables.
	///
	/// An explicitly given path must exist; the system path is optional.
	pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
		let mut config = match path {
			Some(path) => Self::from_file(path)?,
			None => {
				let system = Path::new(SYSTEM_CONFIG_PATH);
				if system.exists() {
					Self::from_file(system)?
				} else {
					Self::default()
				}
			}
		};

		config.apply_env_with(|key| std::env::var(key).ok());
		config.validate()?;
		Ok(config)
	}

	fn from_file(path: &Path) -> Result<Self, ConfigError> {
		let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
			path: path.display().to_string(),
			source,
		})?;
		toml::from_str(&contents).map_err(|source| ConfigError::Parse {
			path: path.display().to_string(),
			source,
		})
	}

	/// Apply environment overrides via the given lookup. Only deployment
	/// wiring is overridable from the environment; tuning stays in the file.
	fn apply_env_with(&mut self, get: impl Fn(&str) -> Option<String>) {
		if let Some(namespace) = get("ARGUS_NAMESPACE") {
			self.namespace = namespace;
		}
		if let Some(url) = get("ARGUS_DATABASE_URL") {
			self.database_url = url;
		}
		if let Some(url) = get("ARGUS_ORCHESTRATOR_URL") {
			self.orchestrator_url = url;
		}
		if let Some(level) = get("ARGUS_LOG_LEVEL") {
			self.log_level = level;
		}
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.namespace.is_empty() {
			return Err(ConfigError::Invalid("namespace must not be empty".into()));
		}
		if self.orchestrator_url.is_empty() {
			return Err(ConfigError::Invalid(
				"orchestrator_url must not be empty".into(),
			));
		}
		Ok(())
	}

	pub fn reaper_interval(&self) -> Duration {
		Duration::from_secs(self.reaper_interval_secs)
	}

	pub fn lost_jobs_interval(&self) -> Duration {
		Duration::from_secs(self.lost_jobs_interval_secs)
	}

	pub fn long_running_jobs_interval(&self) -> Duration {
		Duration::from_secs(self.long_running_jobs_interval_secs)
	}

	pub fn stuck_jobs_interval(&self) -> Duration {
		Duration::from_secs(self.stuck_jobs_interval_secs)
	}

	pub fn recently_processed_interval(&self) -> Duration {
		Duration::from_secs(self.recently_processed_interval_secs)
	}

	pub fn reaper_max_age(&self) -> Duration {
		Duration::from_secs(self.reaper_max_age_secs)
	}

	pub fn lost_jobs_min_age(&self) -> Duration {
		Duration::from_secs(self.lost_jobs_min_age_secs)
	}

	pub fn stuck_jobs_min_age(&self) -> Duration {
		Duration::from_secs(self.stuck_jobs_min_age_secs)
	}
}
