// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};
use wgsync_common_secret::SecretString;

use crate::error::{KeyError, Result};
use crate::keys::KeyMaterial;

pub const PRIVATE_KEY_FILE: &str = "privatekey";
pub const PUBLIC_KEY_FILE: &str = "publickey";
pub const PRESHARED_KEY_FILE: &str = "presharedkey";

/// Produces and persists key material for a peer.
///
/// The reconciler depends on this seam rather than on [`PeerKeyStore`]
/// directly so that key generation failures can be injected in tests.
#[async_trait]
pub trait KeyMaterialGenerator: Send + Sync {
	async fn generate(&self, peer_id: &str) -> Result<KeyMaterial>;
}

/// Key files as they sit on disk, already trimmed.
#[derive(Debug, Clone)]
pub struct StoredKeys {
	pub private_key: SecretString,
	pub public_key: String,
	pub preshared_key: SecretString,
}

/// Peer ids become directory names and a comment line in the interface
/// config, so anything that could escape `peers_dir` or break a line is
/// refused.
pub fn validate_peer_id(peer_id: &str) -> Result<()> {
	let invalid = peer_id.is_empty()
		|| peer_id == "."
		|| peer_id == ".."
		|| peer_id.contains(['/', '\\'])
		|| peer_id.chars().any(char::is_control);
	if invalid {
		return Err(KeyError::InvalidPeerId(peer_id.to_string()));
	}
	Ok(())
}

/// Per-peer key storage rooted at `<config_path>/peers`.
#[derive(Debug, Clone)]
pub struct PeerKeyStore {
	peers_dir: PathBuf,
}

impl PeerKeyStore {
	pub fn new(peers_dir: impl Into<PathBuf>) -> Self {
		Self {
			peers_dir: peers_dir.into(),
		}
	}

	pub fn peers_dir(&self) -> &Path {
		&self.peers_dir
	}

	pub fn peer_dir(&self, peer_id: &str) -> Result<PathBuf> {
		validate_peer_id(peer_id)?;
		Ok(self.peers_dir.join(peer_id))
	}

	/// Writes all three key files for `peer_id`, replacing any left behind by
	/// an earlier aborted attempt.
	#[instrument(skip(self, material), fields(%peer_id))]
	pub async fn save(&self, peer_id: &str, material: &KeyMaterial) -> Result<()> {
		let dir = self.peer_dir(peer_id)?;
		fs::create_dir_all(&dir)
			.await
			.map_err(|e| KeyError::write(&dir, e))?;

		write_key_file(
			&dir.join(PRIVATE_KEY_FILE),
			material.private_key.to_base64().expose(),
			true,
		)
		.await?;
		write_key_file(
			&dir.join(PUBLIC_KEY_FILE),
			&material.public_key.to_base64(),
			false,
		)
		.await?;
		write_key_file(
			&dir.join(PRESHARED_KEY_FILE),
			material.preshared_key.to_base64().expose(),
			true,
		)
		.await?;

		Ok(())
	}

	#[instrument(skip(self), fields(%peer_id))]
	pub async fn load(&self, peer_id: &str) -> Result<StoredKeys> {
		let dir = self.peer_dir(peer_id)?;

		let private_key = read_key_file(&dir.join(PRIVATE_KEY_FILE)).await?;
		let public_key = read_key_file(&dir.join(PUBLIC_KEY_FILE)).await?;
		let preshared_key = read_key_file(&dir.join(PRESHARED_KEY_FILE)).await?;

		Ok(StoredKeys {
			private_key: SecretString::new(private_key),
			public_key,
			preshared_key: SecretString::new(preshared_key),
		})
	}
}

#[async_trait]
impl KeyMaterialGenerator for PeerKeyStore {
	#[instrument(skip(self), fields(%peer_id))]
	async fn generate(&self, peer_id: &str) -> Result<KeyMaterial> {
		validate_peer_id(peer_id)?;

		let material = KeyMaterial::generate();
		self.save(peer_id, &material).await?;

		info!(public_key = %material.public_key, "generated keys for peer");
		Ok(material)
	}
}

async fn write_key_file(path: &Path, content: &str, owner_only: bool) -> Result<()> {
	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		use tokio::fs::OpenOptions;
		use tokio::io::AsyncWriteExt;

		let mode = if owner_only { 0o600 } else { 0o644 };
		let mut file = OpenOptions::new()
			.write(true)
			.create(true)
			.truncate(true)
			.mode(mode)
			.open(path)
			.await
			.map_err(|e| KeyError::write(path, e))?;
		// mode() only applies on creation; a leftover file keeps its old bits.
		fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
			.await
			.map_err(|e| KeyError::write(path, e))?;
		file
			.write_all(content.as_bytes())
			.await
			.map_err(|e| KeyError::write(path, e))?;
		file.sync_all().await.map_err(|e| KeyError::write(path, e))?;
	}

	#[cfg(not(unix))]
	{
		let _ = owner_only;
		fs::write(path, content)
			.await
			.map_err(|e| KeyError::write(path, e))?;
	}

	Ok(())
}

async fn read_key_file(path: &Path) -> Result<String> {
	let content = fs::read_to_string(path)
		.await
		.map_err(|e| KeyError::read(path, e))?;
	let trimmed = content.trim();
	if trimmed.is_empty() {
		return Err(KeyError::Missing {
			path: path.to_path_buf(),
		});
	}
	Ok(trimmed.to_string())
}
