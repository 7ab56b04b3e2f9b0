// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! WireGuard side of the sync service: picks peer addresses, appends peer
//! blocks to the interface config, asks the running daemon to apply them,
//! and renders client configs from the stored key material.

mod config_file;
mod error;
mod exec;
mod pool;
mod reload;
mod render;

pub use config_file::{ConfigMutator, PeerBlock};
pub use error::{AllocError, ConfigWriteError, ReloadError, RenderError};
pub use exec::{CommandExec, ExecChannel, ExecOutput};
pub use pool::AddressPool;
pub use reload::{ReloadTrigger, SyncconfReload};
pub use render::{PeerConfigRenderer, RenderSettings};
