// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, instrument};
use url::Url;
use wgsync_common_secret::SecretString;

use crate::error::{DirectoryError, Result};
use crate::node::{parse_node, parse_node_list, Node};

/// Source of nodes to reconcile against.
#[async_trait]
pub trait Directory: Send + Sync {
	async fn list_nodes(&self) -> Result<Vec<Node>>;

	/// A node the directory does not know is `Ok(None)`, not an error.
	async fn get_node(&self, node_id: &str) -> Result<Option<Node>>;
}

/// Headscale REST API client.
pub struct HeadscaleClient {
	http: Client,
	base_url: Url,
	api_key: SecretString,
}

impl HeadscaleClient {
	pub fn new(base_url: Url, api_key: SecretString, timeout: Duration) -> Self {
		Self {
			http: wgsync_common_http::new_client_with_timeout(timeout),
			base_url,
			api_key,
		}
	}

	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	fn api_url(&self, segments: &[&str]) -> Result<Url> {
		let mut url = self.base_url.clone();
		url
			.path_segments_mut()
			.map_err(|_| DirectoryError::InvalidUrl(self.base_url.to_string()))?
			.pop_if_empty()
			.extend(["api", "v1", "node"])
			.extend(segments);
		Ok(url)
	}

	async fn get_json(&self, url: Url) -> Result<Option<Value>> {
		debug!(url = %url, "querying directory");
		let response = self
			.http
			.get(url)
			.bearer_auth(self.api_key.expose())
			.send()
			.await?;

		if response.status() == StatusCode::NOT_FOUND {
			return Ok(None);
		}

		let body = check_status(response).await?.text().await?;
		Ok(Some(serde_json::from_str(&body)?))
	}
}

async fn check_status(response: Response) -> Result<Response> {
	if response.status().is_success() {
		return Ok(response);
	}
	let status = response.status().as_u16();
	let message = response.text().await.unwrap_or_default();
	error!(status, message = %message, "directory request failed");
	Err(DirectoryError::Status { status, message })
}

#[async_trait]
impl Directory for HeadscaleClient {
	#[instrument(skip(self), fields(base_url = %self.base_url))]
	async fn list_nodes(&self) -> Result<Vec<Node>> {
		let url = self.api_url(&[])?;
		match self.get_json(url).await? {
			Some(body) => Ok(parse_node_list(body)),
			// The list endpoint never 404s on a healthy server.
			None => Err(DirectoryError::Status {
				status: StatusCode::NOT_FOUND.as_u16(),
				message: "node list endpoint not found".to_string(),
			}),
		}
	}

	#[instrument(skip(self), fields(base_url = %self.base_url))]
	async fn get_node(&self, node_id: &str) -> Result<Option<Node>> {
		let url = self.api_url(&[node_id])?;
		match self.get_json(url).await? {
			Some(body) => Ok(Some(parse_node(body)?)),
			None => Ok(None),
		}
	}
}
