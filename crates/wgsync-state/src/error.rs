// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
	#[error("failed to write state file {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to serialize state: {0}")]
	Serialize(#[from] serde_json::Error),

	#[error("state write task failed: {0}")]
	Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, StateError>;
