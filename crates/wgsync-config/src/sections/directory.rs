// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Headscale directory connection settings.

use serde::Deserialize;
use std::time::Duration;
use url::Url;
use wgsync_common_config::SecretString;

use crate::error::ConfigError;

pub const DEFAULT_DIRECTORY_URL: &str = "http://headscale:8080";

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
	pub url: Url,
	pub api_key: SecretString,
	pub timeout: Duration,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryConfigLayer {
	#[serde(default)]
	pub url: Option<String>,
	#[serde(default)]
	pub api_key: Option<SecretString>,
	#[serde(default)]
	pub timeout_secs: Option<u64>,
}

impl DirectoryConfigLayer {
	pub fn merge(&mut self, other: DirectoryConfigLayer) {
		if other.url.is_some() {
			self.url = other.url;
		}
		if other.api_key.is_some() {
			self.api_key = other.api_key;
		}
		if other.timeout_secs.is_some() {
			self.timeout_secs = other.timeout_secs;
		}
	}

	pub fn finalize(self) -> Result<DirectoryConfig, ConfigError> {
		let raw_url = self
			.url
			.unwrap_or_else(|| DEFAULT_DIRECTORY_URL.to_string());
		let url = Url::parse(&raw_url).map_err(|e| ConfigError::InvalidValue {
			key: "directory.url".to_string(),
			message: format!("'{raw_url}': {e}"),
		})?;
		if !matches!(url.scheme(), "http" | "https") {
			return Err(ConfigError::InvalidValue {
				key: "directory.url".to_string(),
				message: format!("unsupported scheme '{}'", url.scheme()),
			});
		}

		let api_key = self
			.api_key
			.filter(|k| !k.expose().is_empty())
			.ok_or_else(|| ConfigError::MissingEnvVar("WGSYNC_DIRECTORY_API_KEY".to_string()))?;

		let timeout = match self.timeout_secs {
			Some(0) => {
				return Err(ConfigError::InvalidValue {
					key: "directory.timeout_secs".to_string(),
					message: "must be greater than zero".to_string(),
				})
			}
			Some(secs) => Duration::from_secs(secs),
			None => wgsync_common_http::DEFAULT_TIMEOUT,
		};

		Ok(DirectoryConfig {
			url,
			api_key,
			timeout,
		})
	}
}
