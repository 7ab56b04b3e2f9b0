// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Sync service wiring: component construction from configuration and the
//! read-only query API served next to the reconciliation loop.

pub mod api;
pub mod bootstrap;
pub mod error;
pub mod routes;

pub use api::{create_router, AppState};
pub use bootstrap::Components;
pub use error::ServerError;
