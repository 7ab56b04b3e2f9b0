// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::io::Write;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument};

use crate::error::{Result, StateError};
use crate::model::PersistentState;

/// Owner of the state file. Every read and write goes through one lock so a
/// load never sees a half-applied update and two saves never interleave.
pub struct StateStore {
	path: PathBuf,
	lock: Mutex<()>,
}

impl StateStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			lock: Mutex::new(()),
		}
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Returns the persisted state, or an empty one if the file is absent or
	/// cannot be parsed. A corrupt file is logged and otherwise ignored.
	pub async fn load(&self) -> PersistentState {
		let _guard = self.lock.lock().await;
		self.load_unlocked().await
	}

	pub async fn save(&self, state: &PersistentState) -> Result<()> {
		let _guard = self.lock.lock().await;
		self.save_unlocked(state).await
	}

	/// Load, record, save as a single step under the store lock.
	#[instrument(skip(self), fields(path = %self.path.display()))]
	pub async fn mark_processed(&self, node_id: &str, address: Ipv4Addr) -> Result<()> {
		let _guard = self.lock.lock().await;
		let mut state = self.load_unlocked().await;
		state.record(node_id, address);
		self.save_unlocked(&state).await?;
		info!(%node_id, %address, "marked node as processed");
		Ok(())
	}

	pub async fn is_processed(&self, node_id: &str) -> bool {
		self.load().await.is_processed(node_id)
	}

	pub async fn get_address(&self, node_id: &str) -> Option<Ipv4Addr> {
		self.load().await.get_address(node_id)
	}

	async fn load_unlocked(&self) -> PersistentState {
		let contents = match tokio::fs::read_to_string(&self.path).await {
			Ok(contents) => contents,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				debug!(path = %self.path.display(), "state file not found, starting empty");
				return PersistentState::default();
			}
			Err(e) => {
				error!(path = %self.path.display(), error = %e, "failed to read state file, starting empty");
				return PersistentState::default();
			}
		};

		match serde_json::from_str(&contents) {
			Ok(state) => state,
			Err(e) => {
				error!(path = %self.path.display(), error = %e, "state file is corrupt, starting empty");
				PersistentState::default()
			}
		}
	}

	async fn save_unlocked(&self, state: &PersistentState) -> Result<()> {
		let json = serde_json::to_vec_pretty(state)?;
		let path = self.path.clone();
		tokio::task::spawn_blocking(move || write_atomic(&path, &json)).await??;

		debug!(
			path = %self.path.display(),
			count = state.len(),
			"saved state"
		);
		Ok(())
	}
}

/// Writes to a temp file in the target directory, then renames over `path`.
/// The temp file is removed when dropped on any failure path.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
	let dir = match path.parent() {
		Some(parent) if !parent.as_os_str().is_empty() => parent,
		_ => Path::new("."),
	};
	let io_err = |source| StateError::Io {
		path: path.to_path_buf(),
		source,
	};

	std::fs::create_dir_all(dir).map_err(io_err)?;

	let mut tmp = tempfile::Builder::new()
		.prefix(".wgsync-state")
		.suffix(".tmp")
		.tempfile_in(dir)
		.map_err(io_err)?;
	tmp.write_all(contents).map_err(io_err)?;
	tmp.as_file().sync_all().map_err(io_err)?;
	tmp.persist(path).map_err(|e| io_err(e.error))?;

	Ok(())
}
