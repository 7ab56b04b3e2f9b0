// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the WireGuard sync service.
//!
//! Layered from defaults, an optional TOML file and the environment
//! (`WGSYNC_*`, plus the unprefixed names older deployments use).
//!
//! # Usage
//!
//! ```ignore
//! use wgsync_config::load_config;
//!
//! let config = load_config()?;
//! println!("Query API listening on {}", config.socket_addr());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServiceConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
	pub http: HttpConfig,
	pub directory: DirectoryConfig,
	pub wireguard: WireguardConfig,
	pub sync: SyncConfig,
	pub logging: LoggingConfig,
}

impl ServiceConfig {
	/// Get the socket address string for binding.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`WGSYNC_*` and legacy aliases)
/// 2. Config file (`/etc/wgsync/config.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServiceConfig, ConfigError> {
	load_config_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource::new()),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServiceConfig, ConfigError> {
	load_config_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource::new()),
	])
}

/// Merge the given sources in precedence order and resolve the result.
pub fn load_config_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<ServiceConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServiceConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: ServiceConfigLayer) -> Result<ServiceConfig, ConfigError> {
	let http = layer.http.unwrap_or_default().finalize();
	let directory = layer.directory.unwrap_or_default().finalize()?;
	let wireguard = layer.wireguard.unwrap_or_default().finalize()?;
	let sync = layer
		.sync
		.unwrap_or_default()
		.finalize(&wireguard.config_path)?;
	let logging = layer.logging.unwrap_or_default().finalize();

	info!(
		host = %http.host,
		port = http.port,
		directory_url = %directory.url,
		container = %wireguard.container_name,
		interface = %wireguard.interface,
		subnet = %wireguard.subnet,
		pool_start = %wireguard.peer_start_ip,
		pool_end = %wireguard.peer_end_ip,
		poll_interval_secs = sync.poll_interval.as_secs(),
		state_file = %sync.state_file.display(),
		"Sync service configuration loaded"
	);

	Ok(ServiceConfig {
		http,
		directory,
		wireguard,
		sync,
		logging,
	})
}
