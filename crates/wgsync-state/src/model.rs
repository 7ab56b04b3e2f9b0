// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

/// On-disk layout:
///
/// ```json
/// {"processed_nodes": {"1": "10.13.13.2"}, "last_ip": "10.13.13.2"}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentState {
	#[serde(default)]
	pub processed_nodes: BTreeMap<String, Ipv4Addr>,
	/// Allocation cursor; the next scan starts just after it.
	#[serde(default, rename = "last_ip")]
	pub last_allocated: Option<Ipv4Addr>,
}

impl PersistentState {
	pub fn is_processed(&self, node_id: &str) -> bool {
		self.processed_nodes.contains_key(node_id)
	}

	pub fn get_address(&self, node_id: &str) -> Option<Ipv4Addr> {
		self.processed_nodes.get(node_id).copied()
	}

	pub fn is_address_used(&self, address: Ipv4Addr) -> bool {
		self.processed_nodes.values().any(|a| *a == address)
	}

	/// Records an assignment and advances the cursor to it.
	pub fn record(&mut self, node_id: impl Into<String>, address: Ipv4Addr) {
		self.processed_nodes.insert(node_id.into(), address);
		self.last_allocated = Some(address);
	}

	pub fn len(&self) -> usize {
		self.processed_nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.processed_nodes.is_empty()
	}
}
