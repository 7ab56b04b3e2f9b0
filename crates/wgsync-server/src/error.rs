// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use wgsync_wireguard::RenderError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	#[error("node not found: {0}")]
	NodeNotFound(String),

	#[error("failed to render config: {0}")]
	Render(#[from] RenderError),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let (status, error, message) = match &self {
			ServerError::NodeNotFound(_) => (StatusCode::NOT_FOUND, "not_found", "node not found"),
			ServerError::Render(e) => {
				tracing::error!(error = %e, "peer config render failed");
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					"render_failed",
					"failed to render config",
				)
			}
		};

		(
			status,
			Json(ErrorResponse {
				error: error.to_string(),
				message: message.to_string(),
			}),
		)
			.into_response()
	}
}
