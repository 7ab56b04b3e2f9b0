// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
	#[error("HTTP request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("directory returned status {status}: {message}")]
	Status { status: u16, message: String },

	#[error("invalid directory response: {0}")]
	Decode(#[from] serde_json::Error),

	#[error("invalid directory URL: {0}")]
	InvalidUrl(String),
}

pub type Result<T> = std::result::Result<T, DirectoryError>;
