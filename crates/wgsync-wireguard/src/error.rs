// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use wgsync_keys::KeyError;

#[derive(Debug, Error)]
pub enum AllocError {
	#[error("address pool {start}-{end} exhausted")]
	PoolExhausted { start: Ipv4Addr, end: Ipv4Addr },

	#[error("invalid address pool: {0}")]
	InvalidPool(String),
}

#[derive(Debug, Error)]
pub enum ConfigWriteError {
	#[error("failed to append peer to {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

#[derive(Debug, Error)]
pub enum ReloadError {
	#[error("failed to run reload command: {0}")]
	Exec(#[from] std::io::Error),

	#[error("reload exited with code {exit_code:?}: {output}")]
	Failed {
		exit_code: Option<i32>,
		output: String,
	},

	#[error("reload did not finish within {0:?}")]
	Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum RenderError {
	#[error("peer template not found at {path}")]
	MissingTemplate { path: PathBuf },

	#[error("missing key material for peer {peer_id}: {path}")]
	MissingKeyMaterial { peer_id: String, path: PathBuf },

	#[error("failed to read {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error(transparent)]
	Keys(KeyError),
}
