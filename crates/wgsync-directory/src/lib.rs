// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Directory of nodes that should have WireGuard peers.
//!
//! The sync loop only sees the [`Directory`] trait; [`HeadscaleClient`] is
//! the production implementation backed by the Headscale REST API.

mod client;
mod error;
mod node;

pub use client::{Directory, HeadscaleClient};
pub use error::{DirectoryError, Result};
pub use node::{parse_node, parse_node_list, Node};
