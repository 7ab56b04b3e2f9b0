// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeyError {
	#[error("invalid key length: expected 32 bytes, got {0}")]
	InvalidLength(usize),

	#[error("invalid base64 encoding: {0}")]
	InvalidBase64(#[from] base64::DecodeError),

	#[error("invalid peer id {0:?}")]
	InvalidPeerId(String),

	#[error("key file missing: {}", path.display())]
	Missing { path: PathBuf },

	#[error("key file I/O failed at {}: {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

impl KeyError {
	pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
		KeyError::Io {
			path: path.into(),
			source,
		}
	}

	/// A read of an absent file maps to [`KeyError::Missing`].
	pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
		let path = path.into();
		if source.kind() == std::io::ErrorKind::NotFound {
			KeyError::Missing { path }
		} else {
			KeyError::Io { path, source }
		}
	}
}

pub type Result<T> = std::result::Result<T, KeyError>;
