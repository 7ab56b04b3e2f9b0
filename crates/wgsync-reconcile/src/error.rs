// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;
use wgsync_directory::DirectoryError;
use wgsync_keys::KeyError;
use wgsync_state::StateError;
use wgsync_wireguard::{AllocError, ConfigWriteError, ReloadError};

/// Cycle-level failure. The cycle ends early and is retried after the
/// poll interval.
#[derive(Debug, Error)]
pub enum ReconcileError {
	#[error("directory unavailable: {0}")]
	DirectoryUnavailable(#[from] DirectoryError),
}

/// Failure provisioning a single node. Artifacts written by earlier stages
/// (key files, config block) are left in place.
#[derive(Debug, Error)]
pub enum ProvisionError {
	#[error("key generation failed: {0}")]
	KeyGenerationFailed(#[source] KeyError),

	#[error("address allocation failed: {0}")]
	PoolExhausted(#[source] AllocError),

	#[error("config write failed: {0}")]
	ConfigWriteFailed(#[source] ConfigWriteError),

	#[error("reload failed: {0}")]
	ReloadFailed(#[source] ReloadError),

	#[error("state persist failed: {0}")]
	StatePersistFailed(#[source] StateError),
}

impl ProvisionError {
	/// Pipeline stage that failed, for logs and the status report.
	pub fn stage(&self) -> &'static str {
		match self {
			Self::KeyGenerationFailed(_) => "key_generation",
			Self::PoolExhausted(_) => "allocation",
			Self::ConfigWriteFailed(_) => "config_write",
			Self::ReloadFailed(_) => "reload",
			Self::StatePersistFailed(_) => "state_persist",
		}
	}
}
