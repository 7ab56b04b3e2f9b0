// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! WireGuard server and address pool settings.

use ipnet::Ipv4Net;
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

const DEFAULT_CONTAINER_NAME: &str = "wireguard-server";
const DEFAULT_CONFIG_PATH: &str = "/config";
const DEFAULT_INTERFACE: &str = "wg0";
const DEFAULT_SUBNET_ADDR: Ipv4Addr = Ipv4Addr::new(10, 13, 13, 0);
const DEFAULT_SUBNET_PREFIX: u8 = 24;
const DEFAULT_SERVER_IP: Ipv4Addr = Ipv4Addr::new(10, 13, 13, 1);
const DEFAULT_PEER_START_IP: Ipv4Addr = Ipv4Addr::new(10, 13, 13, 2);
const DEFAULT_SERVER_PORT: u16 = 51820;
const DEFAULT_RELOAD_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct WireguardConfig {
	pub container_name: String,
	/// Host-side config directory shared with the WireGuard container.
	pub config_path: PathBuf,
	/// The same directory as mounted inside the container.
	pub container_config_path: String,
	pub interface: String,
	pub subnet: Ipv4Net,
	pub server_ip: Ipv4Addr,
	pub peer_start_ip: Ipv4Addr,
	pub peer_end_ip: Ipv4Addr,
	/// Host or IP clients dial; rendered into `Endpoint =`.
	pub server_endpoint: String,
	pub server_port: u16,
	pub peer_dns: String,
	pub reload_timeout: Duration,
}

impl WireguardConfig {
	pub fn peers_dir(&self) -> PathBuf {
		self.config_path.join("peers")
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct WireguardConfigLayer {
	#[serde(default)]
	pub container_name: Option<String>,
	#[serde(default)]
	pub config_path: Option<PathBuf>,
	#[serde(default)]
	pub container_config_path: Option<String>,
	#[serde(default)]
	pub interface: Option<String>,
	#[serde(default)]
	pub subnet: Option<Ipv4Net>,
	#[serde(default)]
	pub server_ip: Option<Ipv4Addr>,
	#[serde(default)]
	pub peer_start_ip: Option<Ipv4Addr>,
	#[serde(default)]
	pub peer_end_ip: Option<Ipv4Addr>,
	#[serde(default)]
	pub server_endpoint: Option<String>,
	#[serde(default)]
	pub server_port: Option<u16>,
	#[serde(default)]
	pub peer_dns: Option<String>,
	#[serde(default)]
	pub reload_timeout_secs: Option<u64>,
}

macro_rules! overlay {
	($self:ident, $other:ident, $($field:ident),+ $(,)?) => {
		$(
			if $other.$field.is_some() {
				$self.$field = $other.$field;
			}
		)+
	};
}

impl WireguardConfigLayer {
	pub fn merge(&mut self, other: Self) {
		overlay!(
			self,
			other,
			container_name,
			config_path,
			container_config_path,
			interface,
			subnet,
			server_ip,
			peer_start_ip,
			peer_end_ip,
			server_endpoint,
			server_port,
			peer_dns,
			reload_timeout_secs,
		);
	}

	pub fn finalize(self) -> Result<WireguardConfig, ConfigError> {
		let subnet = match self.subnet {
			Some(net) => net.trunc(),
			None => default_subnet(),
		};
		let server_ip = self.server_ip.unwrap_or(DEFAULT_SERVER_IP);
		let peer_start_ip = self.peer_start_ip.unwrap_or(DEFAULT_PEER_START_IP);
		let peer_end_ip = self.peer_end_ip.unwrap_or_else(|| last_usable_host(&subnet));

		for (key, ip) in [
			("wireguard.server_ip", server_ip),
			("wireguard.peer_start_ip", peer_start_ip),
			("wireguard.peer_end_ip", peer_end_ip),
		] {
			if !subnet.contains(&ip) {
				return Err(ConfigError::InvalidValue {
					key: key.to_string(),
					message: format!("{ip} is outside subnet {subnet}"),
				});
			}
		}
		if peer_start_ip > peer_end_ip {
			return Err(ConfigError::Validation(format!(
				"peer pool start {peer_start_ip} is after pool end {peer_end_ip}"
			)));
		}

		// Interface and container path end up inside a `bash -c` command.
		let interface = self
			.interface
			.unwrap_or_else(|| DEFAULT_INTERFACE.to_string());
		require_shell_safe("wireguard.interface", &interface)?;
		let container_config_path = self
			.container_config_path
			.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
		require_shell_safe("wireguard.container_config_path", &container_config_path)?;

		let container_name = self
			.container_name
			.unwrap_or_else(|| DEFAULT_CONTAINER_NAME.to_string());
		if container_name.is_empty() {
			return Err(ConfigError::InvalidValue {
				key: "wireguard.container_name".to_string(),
				message: "must not be empty".to_string(),
			});
		}

		let reload_timeout_secs = self
			.reload_timeout_secs
			.unwrap_or(DEFAULT_RELOAD_TIMEOUT_SECS);
		if reload_timeout_secs == 0 {
			return Err(ConfigError::InvalidValue {
				key: "wireguard.reload_timeout_secs".to_string(),
				message: "must be greater than zero".to_string(),
			});
		}

		Ok(WireguardConfig {
			container_name,
			config_path: self
				.config_path
				.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
			container_config_path,
			interface,
			subnet,
			server_ip,
			peer_start_ip,
			peer_end_ip,
			server_endpoint: self
				.server_endpoint
				.unwrap_or_else(|| server_ip.to_string()),
			server_port: self.server_port.unwrap_or(DEFAULT_SERVER_PORT),
			peer_dns: self.peer_dns.unwrap_or_else(|| server_ip.to_string()),
			reload_timeout: Duration::from_secs(reload_timeout_secs),
		})
	}
}

fn default_subnet() -> Ipv4Net {
	Ipv4Net::new(DEFAULT_SUBNET_ADDR, DEFAULT_SUBNET_PREFIX).unwrap_or_else(|_| Ipv4Net::from(DEFAULT_SUBNET_ADDR))
}

fn last_usable_host(subnet: &Ipv4Net) -> Ipv4Addr {
	let broadcast = u32::from(subnet.broadcast());
	if subnet.prefix_len() >= 31 {
		Ipv4Addr::from(broadcast)
	} else {
		Ipv4Addr::from(broadcast - 1)
	}
}

fn require_shell_safe(key: &str, value: &str) -> Result<(), ConfigError> {
	let safe = !value.is_empty()
		&& value
			.chars()
			.all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | '+' | '='));
	if safe {
		Ok(())
	} else {
		Err(ConfigError::InvalidValue {
			key: key.to_string(),
			message: format!("'{value}' may only contain letters, digits and / . _ - + ="),
		})
	}
}
