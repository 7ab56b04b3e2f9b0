// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

/// A node as reported by the directory.
///
/// Headscale has returned ids both as JSON numbers and as strings across
/// versions, so every identifier field is normalized to `Option<String>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Node {
	#[serde(default, deserialize_with = "lenient_id")]
	pub id: Option<String>,
	#[serde(default, deserialize_with = "lenient_id")]
	pub node_id: Option<String>,
	#[serde(default, deserialize_with = "lenient_id")]
	pub name: Option<String>,
}

impl Node {
	/// Stable identifier: `id`, then `node_id`, then `name`.
	pub fn identifier(&self) -> Option<&str> {
		self.id
			.as_deref()
			.or(self.node_id.as_deref())
			.or(self.name.as_deref())
	}
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
	D: Deserializer<'de>,
{
	let value = Option::<Value>::deserialize(deserializer)?;
	Ok(match value {
		Some(Value::String(s)) if !s.is_empty() => Some(s),
		Some(Value::Number(n)) => Some(n.to_string()),
		_ => None,
	})
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NodeListShape {
	Bare(Vec<Value>),
	Wrapped { nodes: Vec<Value> },
	Unrecognized(Value),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NodeShape {
	Wrapped { node: Value },
	Bare(Value),
}

/// Normalizes a list response into nodes.
///
/// Accepts a bare array or `{"nodes": [...]}`. Any other shape yields an
/// empty list with a warning; entries that are not objects are dropped.
pub fn parse_node_list(body: Value) -> Vec<Node> {
	let entries = match serde_json::from_value(body) {
		Ok(NodeListShape::Bare(entries)) | Ok(NodeListShape::Wrapped { nodes: entries }) => entries,
		Ok(NodeListShape::Unrecognized(other)) => {
			warn!(shape = %shape_name(&other), "unrecognized node list response shape");
			return Vec::new();
		}
		Err(e) => {
			warn!(error = %e, "unrecognized node list response shape");
			return Vec::new();
		}
	};

	entries
		.into_iter()
		.filter_map(|entry| match serde_json::from_value::<Node>(entry) {
			Ok(node) => Some(node),
			Err(e) => {
				warn!(error = %e, "skipping malformed node entry");
				None
			}
		})
		.collect()
}

/// Normalizes a single-node response, unwrapping `{"node": {...}}`.
pub fn parse_node(body: Value) -> Result<Node, serde_json::Error> {
	let inner = match serde_json::from_value(body)? {
		NodeShape::Wrapped { node } => node,
		NodeShape::Bare(node) => node,
	};
	serde_json::from_value(inner)
}

fn shape_name(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "bool",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}
