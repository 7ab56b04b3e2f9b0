// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, instrument};
use wgsync_keys::{WgPresharedKey, WgPublicKey};

use crate::error::ConfigWriteError;

/// `[Peer]` section for one provisioned node.
pub struct PeerBlock<'a> {
	pub peer_id: &'a str,
	pub public_key: &'a WgPublicKey,
	pub preshared_key: &'a WgPresharedKey,
	pub address: Ipv4Addr,
}

impl PeerBlock<'_> {
	/// Contains the preshared key; never log the result.
	pub fn render(&self) -> String {
		// The id is a comment; it must stay on one line.
		let comment: String = self.peer_id.chars().filter(|c| !c.is_control()).collect();
		format!(
			"\n[Peer]\n# {}\nPublicKey = {}\nPresharedKey = {}\nAllowedIPs = {}/32\n\n",
			comment,
			self.public_key,
			self.preshared_key.to_base64().expose(),
			self.address,
		)
	}
}

/// Appends peers to the live interface config, one writer at a time.
///
/// Append-only: the same peer appended twice yields two blocks.
pub struct ConfigMutator {
	path: PathBuf,
	lock: Mutex<()>,
}

impl ConfigMutator {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			lock: Mutex::new(()),
		}
	}

	/// `<config_path>/wg_confs/<interface>.conf`
	pub fn for_interface(config_path: &Path, interface: &str) -> Self {
		Self::new(config_path.join("wg_confs").join(format!("{interface}.conf")))
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	#[instrument(skip(self, peer), fields(peer_id = %peer.peer_id, address = %peer.address))]
	pub async fn append_peer(&self, peer: &PeerBlock<'_>) -> Result<(), ConfigWriteError> {
		let _guard = self.lock.lock().await;
		let io_err = |source| ConfigWriteError::Io {
			path: self.path.clone(),
			source,
		};

		if let Some(parent) = self.path.parent() {
			tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
		}

		let mut file = OpenOptions::new()
			.create(true)
			.append(true)
			.open(&self.path)
			.await
			.map_err(io_err)?;
		file
			.write_all(peer.render().as_bytes())
			.await
			.map_err(io_err)?;
		file.sync_all().await.map_err(io_err)?;

		info!(path = %self.path.display(), "appended peer to config");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;
	use tempfile::TempDir;
	use wgsync_keys::KeyMaterial;

	#[test]
	fn block_layout() {
		let material = KeyMaterial::generate();
		let block = PeerBlock {
			peer_id: "7",
			public_key: &material.public_key,
			preshared_key: &material.preshared_key,
			address: Ipv4Addr::new(10, 13, 13, 2),
		};

		let expected = format!(
			"\n[Peer]\n# 7\nPublicKey = {}\nPresharedKey = {}\nAllowedIPs = 10.13.13.2/32\n\n",
			material.public_key.to_base64(),
			material.preshared_key.to_base64().expose(),
		);
		assert_eq!(block.render(), expected);
	}

	#[tokio::test]
	async fn appends_after_existing_interface_section() {
		let temp = TempDir::new().unwrap();
		let wg_confs = temp.path().join("wg_confs");
		std::fs::create_dir_all(&wg_confs).unwrap();
		let conf = wg_confs.join("wg0.conf");
		std::fs::write(&conf, "[Interface]\nAddress = 10.13.13.1\n").unwrap();

		let mutator = ConfigMutator::for_interface(temp.path(), "wg0");
		assert_eq!(mutator.path(), conf);

		let material = KeyMaterial::generate();
		mutator
			.append_peer(&PeerBlock {
				peer_id: "a",
				public_key: &material.public_key,
				preshared_key: &material.preshared_key,
				address: Ipv4Addr::new(10, 13, 13, 2),
			})
			.await
			.unwrap();

		let contents = std::fs::read_to_string(&conf).unwrap();
		assert!(contents.starts_with("[Interface]\nAddress = 10.13.13.1\n\n[Peer]\n"));
		assert!(contents.contains("AllowedIPs = 10.13.13.2/32"));
	}

	#[tokio::test]
	async fn appending_twice_duplicates_the_block() {
		let temp = TempDir::new().unwrap();
		let mutator = ConfigMutator::new(temp.path().join("wg0.conf"));
		let material = KeyMaterial::generate();
		let block = PeerBlock {
			peer_id: "dup",
			public_key: &material.public_key,
			preshared_key: &material.preshared_key,
			address: Ipv4Addr::new(10, 13, 13, 9),
		};

		mutator.append_peer(&block).await.unwrap();
		mutator.append_peer(&block).await.unwrap();

		let contents = std::fs::read_to_string(mutator.path()).unwrap();
		assert_eq!(contents.matches("[Peer]").count(), 2);
	}

	#[tokio::test]
	async fn concurrent_appends_do_not_interleave() {
		let temp = TempDir::new().unwrap();
		let mutator = Arc::new(ConfigMutator::new(temp.path().join("wg0.conf")));

		let mut handles = Vec::new();
		for i in 0..16u8 {
			let mutator = Arc::clone(&mutator);
			handles.push(tokio::spawn(async move {
				let material = KeyMaterial::generate();
				let peer_id = format!("peer-{i}");
				mutator
					.append_peer(&PeerBlock {
						peer_id: &peer_id,
						public_key: &material.public_key,
						preshared_key: &material.preshared_key,
						address: Ipv4Addr::new(10, 13, 13, 2 + i),
					})
					.await
					.unwrap();
			}));
		}
		for handle in handles {
			handle.await.unwrap();
		}

		let contents = std::fs::read_to_string(mutator.path()).unwrap();
		let blocks: Vec<&str> = contents
			.split("\n[Peer]\n")
			.filter(|b| !b.is_empty())
			.collect();
		assert_eq!(blocks.len(), 16);
		for block in blocks {
			let lines: Vec<&str> = block.lines().filter(|l| !l.is_empty()).collect();
			assert_eq!(lines.len(), 4, "torn block: {block:?}");
			assert!(lines[0].starts_with("# peer-"));
			assert!(lines[1].starts_with("PublicKey = "));
			assert!(lines[2].starts_with("PresharedKey = "));
			assert!(lines[3].starts_with("AllowedIPs = "));
		}
	}

	#[test]
	fn comment_line_cannot_carry_extra_lines() {
		let material = KeyMaterial::generate();
		let block = PeerBlock {
			peer_id: "evil\n[Peer]\r\nAllowedIPs = 0.0.0.0/0",
			public_key: &material.public_key,
			preshared_key: &material.preshared_key,
			address: Ipv4Addr::new(10, 13, 13, 2),
		};

		let rendered = block.render();
		assert_eq!(rendered.matches("[Peer]").count(), 2);
		assert_eq!(rendered.matches("AllowedIPs").count(), 2);
		assert!(rendered.contains("\n# evil[Peer]AllowedIPs = 0.0.0.0/0\nPublicKey = "));
		assert_eq!(rendered.lines().filter(|l| l.starts_with("AllowedIPs")).count(), 1);
	}

	#[tokio::test]
	async fn creates_missing_config_directory() {
		let temp = TempDir::new().unwrap();
		let mutator = ConfigMutator::for_interface(&temp.path().join("fresh"), "wg0");
		let material = KeyMaterial::generate();

		mutator
			.append_peer(&PeerBlock {
				peer_id: "x",
				public_key: &material.public_key,
				preshared_key: &material.preshared_key,
				address: Ipv4Addr::new(10, 13, 13, 2),
			})
			.await
			.unwrap();

		assert_eq!(mutator.path(), temp.path().join("fresh/wg_confs/wg0.conf"));
		let contents = std::fs::read_to_string(mutator.path()).unwrap();
		assert!(contents.starts_with("\n[Peer]\n# x\n"));
		assert!(contents.contains("AllowedIPs = 10.13.13.2/32"));
	}

	#[tokio::test]
	async fn parent_that_is_a_file_is_a_write_error() {
		let temp = TempDir::new().unwrap();
		let occupied = temp.path().join("occupied");
		std::fs::write(&occupied, "not a directory").unwrap();
		let mutator = ConfigMutator::for_interface(&occupied, "wg0");
		let material = KeyMaterial::generate();

		let err = mutator
			.append_peer(&PeerBlock {
				peer_id: "x",
				public_key: &material.public_key,
				preshared_key: &material.preshared_key,
				address: Ipv4Addr::new(10, 13, 13, 2),
			})
			.await
			.unwrap_err();
		assert!(matches!(err, ConfigWriteError::Io { .. }));
	}
}
