// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Summary of the most recent reconciliation cycle.

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::Ipv4Addr;
use wgsync_reconcile::NodeFailure;

use crate::api::AppState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
	/// `None` until the first cycle finishes.
	pub last_cycle_at: Option<DateTime<Utc>>,
	pub nodes_seen: usize,
	pub provisioned: usize,
	pub skipped: usize,
	pub failed: usize,
	pub failures: Vec<NodeFailure>,
	pub directory_error: Option<String>,
	pub processed_total: usize,
	pub last_allocated_address: Option<Ipv4Addr>,
}

/// GET /status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
	if let Some(report) = state.last_report.read().await.as_ref() {
		return Json(StatusResponse {
			last_cycle_at: Some(report.finished_at),
			nodes_seen: report.nodes_seen,
			provisioned: report.provisioned.len(),
			skipped: report.skipped,
			failed: report.failed.len(),
			failures: report.failed.clone(),
			directory_error: report.directory_error.clone(),
			processed_total: report.processed_total,
			last_allocated_address: report.last_allocated,
		});
	}

	let persisted = state.state.load().await;
	Json(StatusResponse {
		last_cycle_at: None,
		nodes_seen: 0,
		provisioned: 0,
		skipped: 0,
		failed: 0,
		failures: Vec::new(),
		directory_error: None,
		processed_total: persisted.len(),
		last_allocated_address: persisted.last_allocated,
	})
}
