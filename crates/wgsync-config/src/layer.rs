// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use serde::Deserialize;

use crate::sections::{
	DirectoryConfigLayer, HttpConfigLayer, LoggingConfigLayer, SyncConfigLayer,
	WireguardConfigLayer,
};

/// Sync service configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceConfigLayer {
	#[serde(default)]
	pub http: Option<HttpConfigLayer>,
	#[serde(default)]
	pub directory: Option<DirectoryConfigLayer>,
	#[serde(default)]
	pub wireguard: Option<WireguardConfigLayer>,
	#[serde(default)]
	pub sync: Option<SyncConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl ServiceConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: ServiceConfigLayer) {
		merge_option(&mut self.http, other.http, HttpConfigLayer::merge);
		merge_option(
			&mut self.directory,
			other.directory,
			DirectoryConfigLayer::merge,
		);
		merge_option(
			&mut self.wireguard,
			other.wireguard,
			WireguardConfigLayer::merge,
		);
		merge_option(&mut self.sync, other.sync, SyncConfigLayer::merge);
		merge_option(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_merge_empty_layers() {
		let mut base = ServiceConfigLayer::default();
		base.merge(ServiceConfigLayer::default());
		assert!(base.http.is_none());
		assert!(base.wireguard.is_none());
	}

	#[test]
	fn test_merge_fills_missing_sections() {
		let mut base = ServiceConfigLayer::default();
		base.merge(ServiceConfigLayer {
			http: Some(HttpConfigLayer {
				host: None,
				port: Some(9000),
			}),
			..Default::default()
		});
		assert_eq!(base.http.unwrap().port, Some(9000));
	}

	#[test]
	fn test_merge_overlays_fields_within_section() {
		let mut base = ServiceConfigLayer {
			sync: Some(SyncConfigLayer {
				poll_interval_secs: Some(30),
				state_file: Some("/var/lib/wgsync/state.json".into()),
			}),
			..Default::default()
		};
		base.merge(ServiceConfigLayer {
			sync: Some(SyncConfigLayer {
				poll_interval_secs: Some(5),
				state_file: None,
			}),
			..Default::default()
		});

		let sync = base.sync.unwrap();
		assert_eq!(sync.poll_interval_secs, Some(5));
		assert_eq!(
			sync.state_file.as_deref(),
			Some(std::path::Path::new("/var/lib/wgsync/state.json"))
		);
	}
}
