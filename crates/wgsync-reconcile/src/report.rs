// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::Ipv4Addr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionedPeer {
	pub node_id: String,
	pub address: Ipv4Addr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeFailure {
	pub node_id: String,
	pub stage: &'static str,
	pub error: String,
}

/// Outcome of one reconciliation cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
	pub started_at: DateTime<Utc>,
	pub finished_at: DateTime<Utc>,
	pub nodes_seen: usize,
	pub already_processed: usize,
	/// Nodes with no usable identifier.
	pub skipped: usize,
	pub provisioned: Vec<ProvisionedPeer>,
	pub failed: Vec<NodeFailure>,
	pub directory_error: Option<String>,
	pub processed_total: usize,
	pub last_allocated: Option<Ipv4Addr>,
}

impl CycleReport {
	pub(crate) fn begin() -> Self {
		let now = Utc::now();
		Self {
			started_at: now,
			finished_at: now,
			nodes_seen: 0,
			already_processed: 0,
			skipped: 0,
			provisioned: Vec::new(),
			failed: Vec::new(),
			directory_error: None,
			processed_total: 0,
			last_allocated: None,
		}
	}

	pub(crate) fn finish(mut self) -> Self {
		self.finished_at = Utc::now();
		self
	}

	pub fn is_clean(&self) -> bool {
		self.directory_error.is_none() && self.failed.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn serializes_addresses_as_strings() {
		let mut report = CycleReport::begin();
		report.provisioned.push(ProvisionedPeer {
			node_id: "1".to_string(),
			address: Ipv4Addr::new(10, 13, 13, 2),
		});
		report.failed.push(NodeFailure {
			node_id: "2".to_string(),
			stage: "reload",
			error: "reload failed".to_string(),
		});
		report.last_allocated = Some(Ipv4Addr::new(10, 13, 13, 2));

		let json = serde_json::to_value(report.finish()).unwrap();
		assert_eq!(json["provisioned"][0]["address"], "10.13.13.2");
		assert_eq!(json["failed"][0]["stage"], "reload");
		assert_eq!(json["last_allocated"], "10.13.13.2");
		assert!(json["directory_error"].is_null());
	}

	#[test]
	fn clean_only_without_failures() {
		let mut report = CycleReport::begin();
		assert!(report.is_clean());
		report.directory_error = Some("down".to_string());
		assert!(!report.is_clean());
	}
}
