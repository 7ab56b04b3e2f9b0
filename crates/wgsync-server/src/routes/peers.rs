// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provisioned peers and their client configurations.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use std::net::Ipv4Addr;
use tracing::instrument;

use crate::api::AppState;
use crate::error::ServerError;

#[derive(Debug, Serialize)]
pub struct PeerSummary {
	pub node_id: String,
	pub peer_ip: Ipv4Addr,
}

/// GET /peers
pub async fn list_peers(State(state): State<AppState>) -> Json<Vec<PeerSummary>> {
	let persisted = state.state.load().await;
	Json(
		persisted
			.processed_nodes
			.into_iter()
			.map(|(node_id, peer_ip)| PeerSummary { node_id, peer_ip })
			.collect(),
	)
}

/// GET /peer/{node_id}/config
#[instrument(skip(state), fields(%node_id))]
pub async fn get_peer_config(
	State(state): State<AppState>,
	Path(node_id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
	let address = state
		.state
		.get_address(&node_id)
		.await
		.ok_or_else(|| ServerError::NodeNotFound(node_id.clone()))?;

	let rendered = state.renderer.render(&node_id, address).await?;

	Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], rendered))
}
