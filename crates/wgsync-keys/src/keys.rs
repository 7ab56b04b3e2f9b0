// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use wgsync_common_secret::{Secret, REDACTED};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::error::{KeyError, Result};

const KEY_LEN: usize = 32;

fn decode_key(s: &str) -> Result<[u8; KEY_LEN]> {
	let bytes = STANDARD.decode(s.trim())?;
	if bytes.len() != KEY_LEN {
		return Err(KeyError::InvalidLength(bytes.len()));
	}
	let mut arr = [0u8; KEY_LEN];
	arr.copy_from_slice(&bytes);
	Ok(arr)
}

/// X25519 private key. Encoded as standard padded base64, the format
/// `wg genkey` emits.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct WgPrivateKey {
	bytes: [u8; KEY_LEN],
}

impl WgPrivateKey {
	pub fn generate() -> Self {
		let secret = StaticSecret::random_from_rng(OsRng);
		Self {
			bytes: secret.to_bytes(),
		}
	}

	pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
		Self { bytes }
	}

	pub fn from_base64(s: &str) -> Result<Self> {
		Ok(Self {
			bytes: decode_key(s)?,
		})
	}

	pub fn to_base64(&self) -> Secret<String> {
		Secret::new(STANDARD.encode(self.bytes))
	}

	pub fn public_key(&self) -> WgPublicKey {
		let secret = StaticSecret::from(self.bytes);
		WgPublicKey {
			bytes: *PublicKey::from(&secret).as_bytes(),
		}
	}
}

impl fmt::Debug for WgPrivateKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WgPrivateKey")
			.field("bytes", &REDACTED)
			.finish()
	}
}

impl fmt::Display for WgPrivateKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct WgPublicKey {
	bytes: [u8; KEY_LEN],
}

impl WgPublicKey {
	pub fn from_base64(s: &str) -> Result<Self> {
		Ok(Self {
			bytes: decode_key(s)?,
		})
	}

	pub fn to_base64(&self) -> String {
		STANDARD.encode(self.bytes)
	}

	pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
		&self.bytes
	}
}

impl fmt::Debug for WgPublicKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let b64 = self.to_base64();
		f.debug_struct("WgPublicKey")
			.field("prefix", &format!("{}...", &b64[..8]))
			.finish()
	}
}

impl fmt::Display for WgPublicKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_base64())
	}
}

impl Serialize for WgPublicKey {
	fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.to_base64())
	}
}

impl<'de> Deserialize<'de> for WgPublicKey {
	fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		Self::from_base64(&s).map_err(serde::de::Error::custom)
	}
}

/// Symmetric preshared key, 32 bytes from the OS CSPRNG, independent of the
/// keypair (equivalent to `wg genpsk`).
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct WgPresharedKey {
	bytes: [u8; KEY_LEN],
}

impl WgPresharedKey {
	pub fn generate() -> Self {
		let mut bytes = [0u8; KEY_LEN];
		OsRng.fill_bytes(&mut bytes);
		Self { bytes }
	}

	pub fn from_base64(s: &str) -> Result<Self> {
		Ok(Self {
			bytes: decode_key(s)?,
		})
	}

	pub fn to_base64(&self) -> Secret<String> {
		Secret::new(STANDARD.encode(self.bytes))
	}
}

impl fmt::Debug for WgPresharedKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WgPresharedKey")
			.field("bytes", &REDACTED)
			.finish()
	}
}

/// Credentials minted once per provisioned peer.
#[derive(Clone, Debug)]
pub struct KeyMaterial {
	pub private_key: WgPrivateKey,
	pub public_key: WgPublicKey,
	pub preshared_key: WgPresharedKey,
}

impl KeyMaterial {
	pub fn generate() -> Self {
		let private_key = WgPrivateKey::generate();
		let public_key = private_key.public_key();
		Self {
			private_key,
			public_key,
			preshared_key: WgPresharedKey::generate(),
		}
	}
}
