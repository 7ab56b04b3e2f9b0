// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret loading from the environment.
//!
//! Precedence for a single variable `VAR`:
//! 1. `VAR_FILE` names a file; its content (minus one trailing newline) is the secret
//! 2. `VAR` holds the secret directly
//! 3. neither is set: `Ok(None)`

use std::path::PathBuf;
use std::{env, fs};

use thiserror::Error;
use wgsync_common_secret::SecretString;

#[derive(Debug, Error)]
pub enum SecretEnvError {
	#[error("failed to read secret file at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("secret file path in {var} is empty")]
	EmptyPath { var: String },
}

pub fn load_secret_env(var: &str) -> Result<Option<SecretString>, SecretEnvError> {
	let file_var = format!("{var}_FILE");

	if let Ok(path_str) = env::var(&file_var) {
		if path_str.is_empty() {
			return Err(SecretEnvError::EmptyPath { var: file_var });
		}

		let path = PathBuf::from(path_str);
		let content = fs::read_to_string(&path).map_err(|source| SecretEnvError::Io {
			path: path.clone(),
			source,
		})?;

		let secret = content.strip_suffix('\n').unwrap_or(&content).to_string();
		return Ok(Some(SecretString::new(secret)));
	}

	match env::var(var) {
		Ok(value) if !value.is_empty() => Ok(Some(SecretString::new(value))),
		_ => Ok(None),
	}
}

/// Tries each variable name in order and returns the first secret found.
///
/// Used for settings that accept both a namespaced name and a legacy alias,
/// e.g. `WGSYNC_DIRECTORY_API_KEY` then `HEADSCALE_API_KEY`.
pub fn load_first_secret_env(vars: &[&str]) -> Result<Option<SecretString>, SecretEnvError> {
	for var in vars {
		if let Some(secret) = load_secret_env(var)? {
			return Ok(Some(secret));
		}
	}
	Ok(None)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	#[test]
	fn returns_none_when_not_set() {
		let var = "WGSYNC_TEST_UNSET_SECRET";
		env::remove_var(var);
		env::remove_var(format!("{var}_FILE"));

		assert!(load_secret_env(var).unwrap().is_none());
	}

	#[test]
	fn reads_direct_value() {
		let var = "WGSYNC_TEST_DIRECT_SECRET";
		env::set_var(var, "direct-value");
		env::remove_var(format!("{var}_FILE"));

		let secret = load_secret_env(var).unwrap().unwrap();
		assert_eq!(secret.expose(), "direct-value");

		env::remove_var(var);
	}

	#[test]
	fn file_takes_precedence_and_strips_newline() {
		let var = "WGSYNC_TEST_FILE_SECRET";
		let mut file = NamedTempFile::new().unwrap();
		writeln!(file, "from-file").unwrap();

		env::set_var(var, "from-env");
		env::set_var(format!("{var}_FILE"), file.path());

		let secret = load_secret_env(var).unwrap().unwrap();
		assert_eq!(secret.expose(), "from-file");

		env::remove_var(var);
		env::remove_var(format!("{var}_FILE"));
	}

	#[test]
	fn missing_file_is_an_error() {
		let var = "WGSYNC_TEST_MISSING_FILE_SECRET";
		env::set_var(format!("{var}_FILE"), "/nonexistent/wgsync/secret");

		let err = load_secret_env(var).unwrap_err();
		assert!(matches!(err, SecretEnvError::Io { .. }));

		env::remove_var(format!("{var}_FILE"));
	}

	#[test]
	fn empty_file_path_is_an_error() {
		let var = "WGSYNC_TEST_EMPTY_PATH_SECRET";
		env::set_var(format!("{var}_FILE"), "");

		let err = load_secret_env(var).unwrap_err();
		assert!(matches!(err, SecretEnvError::EmptyPath { .. }));

		env::remove_var(format!("{var}_FILE"));
	}

	#[test]
	fn first_secret_falls_back_to_alias() {
		let primary = "WGSYNC_TEST_PRIMARY_SECRET";
		let alias = "WGSYNC_TEST_ALIAS_SECRET";
		env::remove_var(primary);
		env::remove_var(format!("{primary}_FILE"));
		env::set_var(alias, "legacy");

		let secret = load_first_secret_env(&[primary, alias]).unwrap().unwrap();
		assert_eq!(secret.expose(), "legacy");

		env::remove_var(alias);
	}
}
