// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections for the sync service.

pub mod directory;
pub mod http;
pub mod logging;
pub mod sync;
pub mod wireguard;

pub use directory::{DirectoryConfig, DirectoryConfigLayer};
pub use http::{HttpConfig, HttpConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use sync::{SyncConfig, SyncConfigLayer};
pub use wireguard::{WireguardConfig, WireguardConfigLayer};
