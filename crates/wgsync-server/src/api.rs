// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use wgsync_reconcile::ReportHandle;
use wgsync_state::StateStore;
use wgsync_wireguard::PeerConfigRenderer;

use crate::routes;

/// Shared handler state. Everything here is read-only from the API's side;
/// only the reconciliation loop writes to the store and the report.
#[derive(Clone)]
pub struct AppState {
	pub state: Arc<StateStore>,
	pub renderer: Arc<PeerConfigRenderer>,
	pub last_report: ReportHandle,
}

pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(routes::health::health_check))
		.route("/status", get(routes::status::get_status))
		.route("/peers", get(routes::peers::list_peers))
		.route("/peer/{node_id}/config", get(routes::peers::get_peer_config))
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}
