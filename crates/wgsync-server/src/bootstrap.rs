// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Builds the production component graph from resolved configuration.

use std::sync::Arc;

use wgsync_config::ServiceConfig;
use wgsync_directory::HeadscaleClient;
use wgsync_keys::PeerKeyStore;
use wgsync_reconcile::Reconciler;
use wgsync_state::StateStore;
use wgsync_wireguard::{
	AddressPool, AllocError, CommandExec, ConfigMutator, PeerConfigRenderer, RenderSettings,
	SyncconfReload,
};

pub struct Components {
	pub reconciler: Arc<Reconciler>,
	pub state: Arc<StateStore>,
	pub renderer: Arc<PeerConfigRenderer>,
}

impl Components {
	pub fn from_config(config: &ServiceConfig) -> Result<Self, AllocError> {
		let wg = &config.wireguard;

		let pool = AddressPool::new(wg.subnet, wg.server_ip, wg.peer_start_ip, wg.peer_end_ip)?;
		let state = Arc::new(StateStore::new(&config.sync.state_file));
		let keys = PeerKeyStore::new(wg.peers_dir());

		let directory = Arc::new(HeadscaleClient::new(
			config.directory.url.clone(),
			config.directory.api_key.clone(),
			config.directory.timeout,
		));
		let reload = Arc::new(SyncconfReload::new(
			Arc::new(CommandExec::docker(&wg.container_name)),
			wg.interface.clone(),
			wg.container_config_path.clone(),
			wg.reload_timeout,
		));
		let config_file = Arc::new(ConfigMutator::for_interface(&wg.config_path, &wg.interface));

		let reconciler = Arc::new(Reconciler::new(
			directory,
			Arc::clone(&state),
			pool,
			Arc::new(keys.clone()),
			config_file,
			reload,
		));

		let renderer = Arc::new(PeerConfigRenderer::new(
			RenderSettings {
				config_path: wg.config_path.clone(),
				container_config_path: wg.container_config_path.clone(),
				subnet: wg.subnet,
				server_endpoint: wg.server_endpoint.clone(),
				server_port: wg.server_port,
				peer_dns: wg.peer_dns.clone(),
			},
			keys,
		));

		Ok(Self {
			reconciler,
			state,
			renderer,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;
	use wgsync_config::{load_config_from_sources, EnvSource};

	#[test]
	fn builds_from_resolved_config() {
		let temp = TempDir::new().unwrap();
		let config = load_config_from_sources(vec![Box::new(EnvSource::from_vars([
			("WGSYNC_DIRECTORY_API_KEY", "key".to_string()),
			(
				"WGSYNC_WG_CONFIG_PATH",
				temp.path().display().to_string(),
			),
		]))])
		.unwrap();

		let components = Components::from_config(&config).unwrap();
		assert_eq!(
			components.state.path(),
			temp.path().join("sync-service-state.json")
		);
		assert_eq!(
			components.renderer.template_path(),
			temp.path().join("templates/peer.conf")
		);
	}
}
