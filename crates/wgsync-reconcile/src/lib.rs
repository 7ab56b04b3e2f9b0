// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Periodic reconciliation of directory nodes into WireGuard peers.
//!
//! Each cycle fetches the node list, skips nodes already in the state store,
//! and runs the provisioning pipeline for the rest:
//!
//! ```text
//! generate keys -> allocate address -> append [Peer] -> reload -> commit
//! ```
//!
//! A failure at any stage only affects that node. The node is retried on the
//! next cycle because it was never committed.

mod error;
mod reconciler;
mod report;
mod runner;

pub use error::{ProvisionError, ReconcileError};
pub use reconciler::Reconciler;
pub use report::{CycleReport, NodeFailure, ProvisionedPeer};
pub use runner::{ReconcileRunner, ReportHandle};
