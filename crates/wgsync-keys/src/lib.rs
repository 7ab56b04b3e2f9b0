// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! WireGuard key material for provisioned peers.
//!
//! [`KeyMaterial::generate`] produces an X25519 keypair plus an independent
//! preshared key. [`PeerKeyStore`] persists the three values under
//! `<peers_dir>/<peer_id>/` and reads them back when a client configuration
//! is rendered.

pub mod error;
pub mod keys;
pub mod store;

pub use error::{KeyError, Result};
pub use keys::{KeyMaterial, WgPresharedKey, WgPrivateKey, WgPublicKey};
pub use store::{
	validate_peer_id, KeyMaterialGenerator, PeerKeyStore, StoredKeys, PRESHARED_KEY_FILE,
	PRIVATE_KEY_FILE, PUBLIC_KEY_FILE,
};
