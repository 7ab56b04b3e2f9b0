// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};
use wgsync_common_config::{load_first_secret_env, SecretString};

use crate::error::ConfigError;
use crate::layer::ServiceConfigLayer;
use crate::sections::{
	DirectoryConfigLayer, HttpConfigLayer, LogFormat, LoggingConfigLayer, SyncConfigLayer,
	WireguardConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServiceConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServiceConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServiceConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/wgsync/config.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServiceConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServiceConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServiceConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

enum EnvLookup {
	Process,
	Vars(HashMap<String, String>),
}

/// Environment variable source.
///
/// Convention: WGSYNC_<SECTION>_<FIELD>, with the older unprefixed names
/// (`HEADSCALE_URL`, `WIREGUARD_SUBNET`, ...) accepted as fallbacks.
pub struct EnvSource {
	lookup: EnvLookup,
}

impl Default for EnvSource {
	fn default() -> Self {
		Self::new()
	}
}

impl EnvSource {
	/// Reads the process environment. Secrets honour the `VAR_FILE` convention.
	pub fn new() -> Self {
		Self {
			lookup: EnvLookup::Process,
		}
	}

	/// Reads from a fixed set of variables instead of the process environment.
	pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
	where
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			lookup: EnvLookup::Vars(
				vars
					.into_iter()
					.map(|(k, v)| (k.into(), v.into()))
					.collect(),
			),
		}
	}

	fn var(&self, name: &str) -> Option<String> {
		let value = match &self.lookup {
			EnvLookup::Process => std::env::var(name).ok(),
			EnvLookup::Vars(vars) => vars.get(name).cloned(),
		};
		value.filter(|s| !s.is_empty())
	}

	/// First non-empty value among `names`, with the name it came from.
	fn first_var<'a>(&self, names: &[&'a str]) -> Option<(&'a str, String)> {
		names
			.iter()
			.find_map(|name| self.var(name).map(|value| (*name, value)))
	}

	fn string(&self, names: &[&str]) -> Option<String> {
		self.first_var(names).map(|(_, value)| value)
	}

	fn parsed<T>(&self, names: &[&str]) -> Result<Option<T>, ConfigError>
	where
		T: FromStr,
		T::Err: std::fmt::Display,
	{
		match self.first_var(names) {
			Some((key, value)) => value
				.trim()
				.parse()
				.map(Some)
				.map_err(|e: T::Err| ConfigError::InvalidValue {
					key: key.to_string(),
					message: e.to_string(),
				}),
			None => Ok(None),
		}
	}

	fn secret(&self, names: &[&str]) -> Result<Option<SecretString>, ConfigError> {
		match &self.lookup {
			EnvLookup::Process => {
				load_first_secret_env(names).map_err(|e| ConfigError::Secret(e.to_string()))
			}
			EnvLookup::Vars(_) => Ok(self.string(names).map(SecretString::new)),
		}
	}

	fn load_http(&self) -> Result<HttpConfigLayer, ConfigError> {
		Ok(HttpConfigLayer {
			host: self.string(&["WGSYNC_HOST"]),
			port: self.parsed(&["WGSYNC_PORT", "API_PORT"])?,
		})
	}

	fn load_directory(&self) -> Result<DirectoryConfigLayer, ConfigError> {
		Ok(DirectoryConfigLayer {
			url: self.string(&["WGSYNC_DIRECTORY_URL", "HEADSCALE_URL"]),
			api_key: self.secret(&["WGSYNC_DIRECTORY_API_KEY", "HEADSCALE_API_KEY"])?,
			timeout_secs: self.parsed(&["WGSYNC_DIRECTORY_TIMEOUT_SECS"])?,
		})
	}

	fn load_wireguard(&self) -> Result<WireguardConfigLayer, ConfigError> {
		Ok(WireguardConfigLayer {
			container_name: self.string(&["WGSYNC_WG_CONTAINER", "WIREGUARD_CONTAINER_NAME"]),
			config_path: self
				.string(&["WGSYNC_WG_CONFIG_PATH", "WIREGUARD_CONFIG_PATH"])
				.map(PathBuf::from),
			container_config_path: self.string(&["WGSYNC_WG_CONTAINER_CONFIG_PATH"]),
			interface: self.string(&["WGSYNC_WG_INTERFACE", "WIREGUARD_INTERFACE"]),
			subnet: self.parsed(&["WGSYNC_WG_SUBNET", "WIREGUARD_SUBNET"])?,
			server_ip: self.parsed(&["WGSYNC_WG_SERVER_IP", "WIREGUARD_SERVER_IP"])?,
			peer_start_ip: self.parsed(&["WGSYNC_WG_PEER_START_IP", "WIREGUARD_PEER_START_IP"])?,
			peer_end_ip: self.parsed(&["WGSYNC_WG_PEER_END_IP"])?,
			server_endpoint: self.string(&["WGSYNC_WG_SERVER_ENDPOINT"]),
			server_port: self.parsed(&["WGSYNC_WG_SERVER_PORT"])?,
			peer_dns: self.string(&["WGSYNC_WG_PEER_DNS"]),
			reload_timeout_secs: self.parsed(&["WGSYNC_WG_RELOAD_TIMEOUT_SECS"])?,
		})
	}

	fn load_sync(&self) -> Result<SyncConfigLayer, ConfigError> {
		Ok(SyncConfigLayer {
			poll_interval_secs: self.parsed(&["WGSYNC_POLL_INTERVAL_SECS", "POLL_INTERVAL"])?,
			state_file: self
				.string(&["WGSYNC_STATE_FILE", "STATE_FILE_PATH"])
				.map(PathBuf::from),
		})
	}

	fn load_logging(&self) -> Result<LoggingConfigLayer, ConfigError> {
		Ok(LoggingConfigLayer {
			level: self.string(&["WGSYNC_LOG_LEVEL"]),
			format: self.parsed::<LogFormat>(&["WGSYNC_LOG_FORMAT"])?,
		})
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServiceConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServiceConfigLayer {
			http: Some(self.load_http()?),
			directory: Some(self.load_directory()?),
			wireguard: Some(self.load_wireguard()?),
			sync: Some(self.load_sync()?),
			logging: Some(self.load_logging()?),
		})
	}
}
