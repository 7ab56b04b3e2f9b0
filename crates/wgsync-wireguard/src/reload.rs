// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};

use crate::error::ReloadError;
use crate::exec::ExecChannel;

/// Makes the running tunnel daemon pick up config changes.
#[async_trait]
pub trait ReloadTrigger: Send + Sync {
	async fn apply(&self) -> Result<(), ReloadError>;
}

/// Applies the config diff with `wg syncconf`, leaving existing sessions up.
pub struct SyncconfReload {
	exec: Arc<dyn ExecChannel>,
	interface: String,
	container_config_path: String,
	timeout: Duration,
}

impl SyncconfReload {
	pub fn new(
		exec: Arc<dyn ExecChannel>,
		interface: impl Into<String>,
		container_config_path: impl Into<String>,
		timeout: Duration,
	) -> Self {
		Self {
			exec,
			interface: interface.into(),
			container_config_path: container_config_path.into(),
			timeout,
		}
	}

	pub fn command(&self) -> String {
		let base = self.container_config_path.trim_end_matches('/');
		format!(
			"wg syncconf {iface} <(wg-quick strip {base}/wg_confs/{iface}.conf)",
			iface = self.interface,
		)
	}
}

#[async_trait]
impl ReloadTrigger for SyncconfReload {
	#[instrument(skip(self), fields(interface = %self.interface))]
	async fn apply(&self) -> Result<(), ReloadError> {
		let command = self.command();
		let output = tokio::time::timeout(self.timeout, self.exec.exec(&command))
			.await
			.map_err(|_| ReloadError::Timeout(self.timeout))??;

		if !output.success() {
			error!(
				exit_code = ?output.exit_code,
				output = %output.output,
				"wireguard reload failed"
			);
			return Err(ReloadError::Failed {
				exit_code: output.exit_code,
				output: output.output,
			});
		}

		info!("wireguard configuration reloaded");
		Ok(())
	}
}
