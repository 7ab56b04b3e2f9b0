// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use ipnet::Ipv4Net;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};
use wgsync_keys::{KeyError, PeerKeyStore};

use crate::error::RenderError;

const TEMPLATE_FILE: &str = "templates/peer.conf";
const SERVER_PUBLIC_KEY_FILE: &str = "server/publickey-server";

/// Values substituted into the client template besides the peer's keys.
#[derive(Debug, Clone)]
pub struct RenderSettings {
	/// Host-side WireGuard config directory.
	pub config_path: PathBuf,
	/// The same directory as seen from inside the container. The template's
	/// `$(cat ...)` placeholders are written against this path.
	pub container_config_path: String,
	pub subnet: Ipv4Net,
	pub server_endpoint: String,
	pub server_port: u16,
	pub peer_dns: String,
}

/// Renders a ready-to-import client config for a provisioned peer.
pub struct PeerConfigRenderer {
	settings: RenderSettings,
	keys: PeerKeyStore,
}

impl PeerConfigRenderer {
	pub fn new(settings: RenderSettings, keys: PeerKeyStore) -> Self {
		Self { settings, keys }
	}

	pub fn template_path(&self) -> PathBuf {
		self.settings.config_path.join(TEMPLATE_FILE)
	}

	#[instrument(skip(self), fields(%peer_id, %address))]
	pub async fn render(&self, peer_id: &str, address: Ipv4Addr) -> Result<String, RenderError> {
		let template_path = self.template_path();
		let template = match read_trimmed(&template_path).await? {
			Some(template) => template,
			None => return Err(RenderError::MissingTemplate { path: template_path }),
		};

		let stored = self.keys.load(peer_id).await.map_err(|e| match e {
			KeyError::Missing { path } => RenderError::MissingKeyMaterial {
				peer_id: peer_id.to_string(),
				path,
			},
			other => RenderError::Keys(other),
		})?;

		let server_key_path = self.settings.config_path.join(SERVER_PUBLIC_KEY_FILE);
		let server_public_key = match read_trimmed(&server_key_path).await? {
			Some(key) => key,
			None => {
				return Err(RenderError::MissingKeyMaterial {
					peer_id: peer_id.to_string(),
					path: server_key_path,
				})
			}
		};

		let base = self.settings.container_config_path.trim_end_matches('/');
		let replacements = [
			("${CLIENT_IP}".to_string(), format!("{address}/32")),
			("${PEER_ID}".to_string(), peer_id.to_string()),
			("${PEERDNS}".to_string(), self.settings.peer_dns.clone()),
			("${SERVERURL}".to_string(), self.settings.server_endpoint.clone()),
			("${SERVERPORT}".to_string(), self.settings.server_port.to_string()),
			("${ALLOWEDIPS}".to_string(), self.settings.subnet.to_string()),
			(
				format!("$(cat {base}/{peer_id}/privatekey-{peer_id})"),
				stored.private_key.expose().clone(),
			),
			(
				format!("$(cat {base}/{peer_id}/presharedkey-{peer_id})"),
				stored.preshared_key.expose().clone(),
			),
			(
				format!("$(cat {base}/server/publickey-server)"),
				server_public_key,
			),
		];

		let rendered = replacements
			.iter()
			.fold(template, |acc, (placeholder, value)| {
				acc.replace(placeholder.as_str(), value)
			});

		debug!("rendered peer config");
		Ok(rendered)
	}
}

/// File contents trimmed, or `None` if the file does not exist or is blank.
async fn read_trimmed(path: &Path) -> Result<Option<String>, RenderError> {
	match tokio::fs::read_to_string(path).await {
		Ok(contents) => {
			let trimmed = contents.trim();
			Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
		}
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
		Err(source) => Err(RenderError::Io {
			path: path.to_path_buf(),
			source,
		}),
	}
}
