// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Durable record of which directory nodes already have a WireGuard peer
//! and which address each one was given.

mod error;
mod model;
mod store;

pub use error::{Result, StateError};
pub use model::PersistentState;
pub use store::StateStore;
