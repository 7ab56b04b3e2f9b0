// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared HTTP client with a consistent User-Agent and a bounded timeout.
//!
//! Every outbound call made by the sync loop goes through a client built
//! here, so a hung control plane can only stall a cycle for `timeout`.

use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Default per-request timeout for outbound calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client builder preloaded with the wgsync User-Agent.
fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

pub fn new_client_with_timeout(timeout: Duration) -> Client {
	builder()
		.timeout(timeout)
		.connect_timeout(timeout)
		.build()
		.expect("failed to build HTTP client")
}

/// Format: `wgsync/{version}/{os}-{arch}`
pub fn user_agent() -> String {
	format!(
		"wgsync/{}/{}-{}",
		env!("CARGO_PKG_VERSION"),
		std::env::consts::OS,
		std::env::consts::ARCH
	)
}
