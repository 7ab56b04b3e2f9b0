// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use wgsync_directory::{Directory, Node};
use wgsync_keys::KeyMaterialGenerator;
use wgsync_state::{PersistentState, StateStore};
use wgsync_wireguard::{AddressPool, ConfigMutator, PeerBlock, ReloadTrigger};

use crate::error::{ProvisionError, ReconcileError};
use crate::report::{CycleReport, NodeFailure, ProvisionedPeer};

pub struct Reconciler {
	directory: Arc<dyn Directory>,
	state: Arc<StateStore>,
	pool: AddressPool,
	keys: Arc<dyn KeyMaterialGenerator>,
	config: Arc<ConfigMutator>,
	reload: Arc<dyn ReloadTrigger>,
}

impl Reconciler {
	pub fn new(
		directory: Arc<dyn Directory>,
		state: Arc<StateStore>,
		pool: AddressPool,
		keys: Arc<dyn KeyMaterialGenerator>,
		config: Arc<ConfigMutator>,
		reload: Arc<dyn ReloadTrigger>,
	) -> Self {
		Self {
			directory,
			state,
			pool,
			keys,
			config,
			reload,
		}
	}

	/// Runs one fetch-diff-provision pass. Never fails as a whole: directory
	/// and per-node errors are logged and recorded in the report.
	#[instrument(skip(self))]
	pub async fn run_cycle(&self) -> CycleReport {
		let mut report = CycleReport::begin();

		let nodes = match self.fetch().await {
			Ok(nodes) => nodes,
			Err(e) => {
				error!(error = %e, "skipping cycle");
				report.directory_error = Some(e.to_string());
				let state = self.state.load().await;
				report.processed_total = state.len();
				report.last_allocated = state.last_allocated;
				return report.finish();
			}
		};
		report.nodes_seen = nodes.len();

		// Updated after every commit so a node listed twice is provisioned once.
		let mut state = self.state.load().await;

		for node in &nodes {
			let Some(node_id) = node.identifier() else {
				warn!(?node, "node has no identifier, skipping");
				report.skipped += 1;
				continue;
			};

			if state.is_processed(node_id) {
				debug!(%node_id, "node already provisioned");
				report.already_processed += 1;
				continue;
			}

			match self.provision(node_id, &state).await {
				Ok(address) => {
					state.record(node_id, address);
					report.provisioned.push(ProvisionedPeer {
						node_id: node_id.to_string(),
						address,
					});
				}
				Err(e) => {
					error!(%node_id, stage = e.stage(), error = %e, "failed to provision node");
					report.failed.push(NodeFailure {
						node_id: node_id.to_string(),
						stage: e.stage(),
						error: e.to_string(),
					});
				}
			}
		}

		report.processed_total = state.len();
		report.last_allocated = state.last_allocated;

		info!(
			nodes_seen = report.nodes_seen,
			provisioned = report.provisioned.len(),
			failed = report.failed.len(),
			skipped = report.skipped,
			"reconciliation cycle complete"
		);
		report.finish()
	}

	async fn fetch(&self) -> Result<Vec<Node>, ReconcileError> {
		Ok(self.directory.list_nodes().await?)
	}

	#[instrument(skip(self, state), fields(%node_id))]
	async fn provision(
		&self,
		node_id: &str,
		state: &PersistentState,
	) -> Result<Ipv4Addr, ProvisionError> {
		let material = self
			.keys
			.generate(node_id)
			.await
			.map_err(ProvisionError::KeyGenerationFailed)?;

		let address = self
			.pool
			.allocate(state)
			.map_err(ProvisionError::PoolExhausted)?;

		self
			.config
			.append_peer(&PeerBlock {
				peer_id: node_id,
				public_key: &material.public_key,
				preshared_key: &material.preshared_key,
				address,
			})
			.await
			.map_err(ProvisionError::ConfigWriteFailed)?;

		self
			.reload
			.apply()
			.await
			.map_err(ProvisionError::ReloadFailed)?;

		self
			.state
			.mark_processed(node_id, address)
			.await
			.map_err(ProvisionError::StatePersistFailed)?;

		info!(%address, public_key = %material.public_key, "provisioned peer");
		Ok(address)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use std::collections::HashSet;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Mutex;
	use tempfile::TempDir;
	use wgsync_directory::DirectoryError;
	use wgsync_keys::{KeyError, KeyMaterial, PeerKeyStore};
	use wgsync_wireguard::ReloadError;

	struct FakeDirectory {
		nodes: Mutex<Result<Vec<Node>, u16>>,
		calls: AtomicUsize,
	}

	impl FakeDirectory {
		fn with_ids(ids: &[&str]) -> Arc<Self> {
			let nodes = ids.iter().map(|id| node(id)).collect();
			Arc::new(Self {
				nodes: Mutex::new(Ok(nodes)),
				calls: AtomicUsize::new(0),
			})
		}

		fn failing(status: u16) -> Arc<Self> {
			Arc::new(Self {
				nodes: Mutex::new(Err(status)),
				calls: AtomicUsize::new(0),
			})
		}
	}

	#[async_trait]
	impl Directory for FakeDirectory {
		async fn list_nodes(&self) -> wgsync_directory::Result<Vec<Node>> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			match &*self.nodes.lock().unwrap() {
				Ok(nodes) => Ok(nodes.clone()),
				Err(status) => Err(DirectoryError::Status {
					status: *status,
					message: "unavailable".to_string(),
				}),
			}
		}

		async fn get_node(&self, node_id: &str) -> wgsync_directory::Result<Option<Node>> {
			let nodes = self.list_nodes().await?;
			Ok(nodes.into_iter().find(|n| n.identifier() == Some(node_id)))
		}
	}

	fn node(id: &str) -> Node {
		Node {
			id: Some(id.to_string()),
			..Node::default()
		}
	}

	#[derive(Default)]
	struct FakeKeys {
		fail_for: HashSet<String>,
		generated: Mutex<Vec<String>>,
	}

	#[async_trait]
	impl KeyMaterialGenerator for FakeKeys {
		async fn generate(&self, peer_id: &str) -> wgsync_keys::Result<KeyMaterial> {
			if self.fail_for.contains(peer_id) {
				return Err(KeyError::InvalidPeerId(peer_id.to_string()));
			}
			self.generated.lock().unwrap().push(peer_id.to_string());
			Ok(KeyMaterial::generate())
		}
	}

	#[derive(Default)]
	struct FakeReload {
		fail: std::sync::atomic::AtomicBool,
		calls: AtomicUsize,
	}

	#[async_trait]
	impl ReloadTrigger for FakeReload {
		async fn apply(&self) -> Result<(), ReloadError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			if self.fail.load(Ordering::SeqCst) {
				return Err(ReloadError::Failed {
					exit_code: Some(1),
					output: "wg: Unable to modify interface".to_string(),
				});
			}
			Ok(())
		}
	}

	struct Harness {
		temp: TempDir,
		state: Arc<StateStore>,
		config: Arc<ConfigMutator>,
		keys: Arc<FakeKeys>,
		reload: Arc<FakeReload>,
	}

	fn ip(last: u8) -> Ipv4Addr {
		Ipv4Addr::new(10, 13, 13, last)
	}

	fn pool(end: u8) -> AddressPool {
		AddressPool::new("10.13.13.0/24".parse().unwrap(), ip(1), ip(2), ip(end)).unwrap()
	}

	impl Harness {
		fn new() -> Self {
			Self::with_keys(FakeKeys::default())
		}

		fn with_keys(keys: FakeKeys) -> Self {
			let temp = TempDir::new().unwrap();
			let state = Arc::new(StateStore::new(temp.path().join("state.json")));
			let config = Arc::new(ConfigMutator::new(temp.path().join("wg0.conf")));
			Self {
				temp,
				state,
				config,
				keys: Arc::new(keys),
				reload: Arc::new(FakeReload::default()),
			}
		}

		fn reconciler(&self, directory: Arc<dyn Directory>, pool: AddressPool) -> Reconciler {
			Reconciler::new(
				directory,
				Arc::clone(&self.state),
				pool,
				self.keys.clone(),
				Arc::clone(&self.config),
				self.reload.clone(),
			)
		}

		fn config_contents(&self) -> String {
			std::fs::read_to_string(self.config.path()).unwrap_or_default()
		}
	}

	#[tokio::test]
	async fn provisions_new_nodes_in_order() {
		let h = Harness::new();
		let reconciler = h.reconciler(FakeDirectory::with_ids(&["A", "B", "C"]), pool(5));

		let report = reconciler.run_cycle().await;

		assert!(report.is_clean());
		assert_eq!(
			report.provisioned,
			vec![
				ProvisionedPeer { node_id: "A".into(), address: ip(2) },
				ProvisionedPeer { node_id: "B".into(), address: ip(3) },
				ProvisionedPeer { node_id: "C".into(), address: ip(4) },
			]
		);

		let state = h.state.load().await;
		assert_eq!(state.get_address("A"), Some(ip(2)));
		assert_eq!(state.get_address("B"), Some(ip(3)));
		assert_eq!(state.get_address("C"), Some(ip(4)));
		assert_eq!(state.last_allocated, Some(ip(4)));
		assert_eq!(h.config_contents().matches("[Peer]").count(), 3);
		assert_eq!(h.reload.calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn failed_node_does_not_stop_the_others() {
		let keys = FakeKeys {
			fail_for: HashSet::from(["B".to_string()]),
			..FakeKeys::default()
		};
		let h = Harness::with_keys(keys);
		let reconciler = h.reconciler(FakeDirectory::with_ids(&["A", "B", "C"]), pool(5));

		let report = reconciler.run_cycle().await;

		assert_eq!(report.provisioned.len(), 2);
		assert_eq!(report.failed.len(), 1);
		assert_eq!(report.failed[0].node_id, "B");
		assert_eq!(report.failed[0].stage, "key_generation");

		let state = h.state.load().await;
		assert_eq!(state.get_address("A"), Some(ip(2)));
		assert_eq!(state.get_address("C"), Some(ip(3)));
		assert!(!state.is_processed("B"));
	}

	#[tokio::test]
	async fn second_cycle_with_same_directory_is_a_no_op() {
		let h = Harness::new();
		let reconciler = h.reconciler(FakeDirectory::with_ids(&["A", "B"]), pool(10));

		reconciler.run_cycle().await;
		let before = h.state.load().await;
		let config_before = h.config_contents();

		let report = reconciler.run_cycle().await;

		assert!(report.provisioned.is_empty());
		assert_eq!(report.already_processed, 2);
		assert_eq!(h.state.load().await, before);
		assert_eq!(h.config_contents(), config_before);
		assert_eq!(h.reload.calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn directory_failure_ends_cycle_without_changes() {
		let h = Harness::new();
		let reconciler = h.reconciler(FakeDirectory::failing(502), pool(10));

		let report = reconciler.run_cycle().await;

		assert!(report.directory_error.is_some());
		assert_eq!(report.nodes_seen, 0);
		assert!(h.state.load().await.is_empty());
		assert!(h.keys.generated.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn duplicate_nodes_in_one_response_are_provisioned_once() {
		let h = Harness::new();
		let reconciler = h.reconciler(FakeDirectory::with_ids(&["A", "A", "B"]), pool(10));

		let report = reconciler.run_cycle().await;

		assert_eq!(report.provisioned.len(), 2);
		assert_eq!(report.already_processed, 1);
		assert_eq!(h.keys.generated.lock().unwrap().as_slice(), ["A", "B"]);
	}

	#[tokio::test]
	async fn nodes_without_identifier_are_skipped() {
		let h = Harness::new();
		let directory = Arc::new(FakeDirectory {
			nodes: Mutex::new(Ok(vec![Node::default(), node("A")])),
			calls: AtomicUsize::new(0),
		});
		let reconciler = h.reconciler(directory, pool(10));

		let report = reconciler.run_cycle().await;

		assert_eq!(report.skipped, 1);
		assert_eq!(report.provisioned.len(), 1);
	}

	#[tokio::test]
	async fn exhausted_pool_fails_only_the_overflow_node() {
		let h = Harness::new();
		let reconciler = h.reconciler(FakeDirectory::with_ids(&["A", "B", "C"]), pool(3));

		let report = reconciler.run_cycle().await;

		assert_eq!(report.provisioned.len(), 2);
		assert_eq!(report.failed.len(), 1);
		assert_eq!(report.failed[0].node_id, "C");
		assert_eq!(report.failed[0].stage, "allocation");
		assert!(!h.state.load().await.is_processed("C"));
	}

	#[tokio::test]
	async fn reload_failure_leaves_node_uncommitted_and_retries_next_cycle() {
		let h = Harness::new();
		let reconciler = h.reconciler(FakeDirectory::with_ids(&["A"]), pool(10));

		h.reload.fail.store(true, Ordering::SeqCst);
		let report = reconciler.run_cycle().await;
		assert_eq!(report.failed[0].stage, "reload");
		assert!(!h.state.load().await.is_processed("A"));
		// No rollback: the block stays in the config.
		assert_eq!(h.config_contents().matches("[Peer]").count(), 1);

		h.reload.fail.store(false, Ordering::SeqCst);
		let report = reconciler.run_cycle().await;
		assert_eq!(report.provisioned.len(), 1);
		assert_eq!(h.state.load().await.get_address("A"), Some(ip(2)));
	}

	#[tokio::test]
	async fn persist_failure_is_reported_and_not_committed() {
		let h = Harness::new();
		let blocked = h.temp.path().join("blocked");
		std::fs::create_dir_all(blocked.join("occupied")).unwrap();
		let state = Arc::new(StateStore::new(&blocked));
		let reconciler = Reconciler::new(
			FakeDirectory::with_ids(&["A"]),
			Arc::clone(&state),
			pool(10),
			h.keys.clone(),
			Arc::clone(&h.config),
			h.reload.clone(),
		);

		let report = reconciler.run_cycle().await;

		assert!(report.provisioned.is_empty());
		assert_eq!(report.failed[0].stage, "state_persist");
		assert_eq!(report.processed_total, 0);
	}

	#[tokio::test]
	async fn allocation_continues_from_persisted_cursor() {
		let h = Harness::new();
		h.state.mark_processed("old", ip(7)).await.unwrap();
		let reconciler = h.reconciler(FakeDirectory::with_ids(&["old", "new"]), pool(20));

		let report = reconciler.run_cycle().await;

		assert_eq!(
			report.provisioned,
			vec![ProvisionedPeer { node_id: "new".into(), address: ip(8) }]
		);
		assert_eq!(report.processed_total, 2);
		assert_eq!(report.last_allocated, Some(ip(8)));
	}

	#[tokio::test]
	async fn multiline_node_name_fails_key_generation_without_touching_config() {
		let h = Harness::new();
		let directory = Arc::new(FakeDirectory {
			nodes: Mutex::new(Ok(vec![Node {
				name: Some("evil\n[Peer]\nPublicKey = ATTACKER\nAllowedIPs = 0.0.0.0".to_string()),
				..Node::default()
			}])),
			calls: AtomicUsize::new(0),
		});
		let reconciler = Reconciler::new(
			directory,
			Arc::clone(&h.state),
			pool(10),
			Arc::new(PeerKeyStore::new(h.temp.path().join("peers"))),
			Arc::clone(&h.config),
			h.reload.clone(),
		);

		let report = reconciler.run_cycle().await;

		assert!(report.provisioned.is_empty());
		assert_eq!(report.failed.len(), 1);
		assert_eq!(report.failed[0].stage, "key_generation");
		assert!(h.state.load().await.is_empty());
		assert!(!h.config_contents().contains("[Peer]"));
		assert!(!h.temp.path().join("peers").exists());
		assert_eq!(h.reload.calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn fresh_config_volume_gets_its_interface_directory() {
		let h = Harness::new();
		let config_root = h.temp.path().join("config");
		let config = Arc::new(ConfigMutator::for_interface(&config_root, "wg0"));
		let reconciler = Reconciler::new(
			FakeDirectory::with_ids(&["A"]),
			Arc::clone(&h.state),
			pool(10),
			Arc::new(PeerKeyStore::new(config_root.join("peers"))),
			Arc::clone(&config),
			h.reload.clone(),
		);

		let report = reconciler.run_cycle().await;

		assert!(report.is_clean());
		assert_eq!(report.provisioned.len(), 1);
		let contents = std::fs::read_to_string(config_root.join("wg_confs/wg0.conf")).unwrap();
		assert!(contents.contains("AllowedIPs = 10.13.13.2/32"));
		assert_eq!(h.state.load().await.get_address("A"), Some(ip(2)));
	}
}
