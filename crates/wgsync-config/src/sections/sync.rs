// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reconciliation loop settings.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
const DEFAULT_STATE_FILE_NAME: &str = "sync-service-state.json";

#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
	pub poll_interval: Duration,
	pub state_file: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SyncConfigLayer {
	#[serde(default)]
	pub poll_interval_secs: Option<u64>,
	#[serde(default)]
	pub state_file: Option<PathBuf>,
}

impl SyncConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.poll_interval_secs.is_some() {
			self.poll_interval_secs = other.poll_interval_secs;
		}
		if other.state_file.is_some() {
			self.state_file = other.state_file;
		}
	}

	/// The state file defaults to living next to the WireGuard config.
	pub fn finalize(self, wireguard_config_path: &Path) -> Result<SyncConfig, ConfigError> {
		let secs = self.poll_interval_secs.unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
		if secs == 0 {
			return Err(ConfigError::InvalidValue {
				key: "sync.poll_interval_secs".to_string(),
				message: "must be greater than zero".to_string(),
			});
		}

		Ok(SyncConfig {
			poll_interval: Duration::from_secs(secs),
			state_file: self
				.state_file
				.unwrap_or_else(|| wireguard_config_path.join(DEFAULT_STATE_FILE_NAME)),
		})
	}
}
