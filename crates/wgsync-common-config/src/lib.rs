// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared configuration primitives.
//!
//! - [`Secret<T>`] re-exported from [`wgsync_common_secret`]
//! - [`load_secret_env`] / [`load_first_secret_env`] for the `VAR` / `VAR_FILE`
//!   convention used by Docker and Kubernetes secret mounts

pub mod env;

pub use wgsync_common_secret::{Secret, SecretString, REDACTED};

pub use env::{load_first_secret_env, load_secret_env, SecretEnvError};
