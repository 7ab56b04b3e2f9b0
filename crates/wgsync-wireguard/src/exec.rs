// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use tokio::process::Command;
use tracing::trace;

/// Exit status and combined stdout/stderr of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
	/// `None` when the process was killed by a signal.
	pub exit_code: Option<i32>,
	pub output: String,
}

impl ExecOutput {
	pub fn success(&self) -> bool {
		self.exit_code == Some(0)
	}
}

/// Runs shell commands in the execution context of the tunnel process.
#[async_trait]
pub trait ExecChannel: Send + Sync {
	async fn exec(&self, command: &str) -> std::io::Result<ExecOutput>;
}

/// Runs `<program> <prefix args...> <command>` as a local subprocess.
pub struct CommandExec {
	program: String,
	prefix: Vec<String>,
}

impl CommandExec {
	pub fn new<I, S>(program: impl Into<String>, prefix: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			program: program.into(),
			prefix: prefix.into_iter().map(Into::into).collect(),
		}
	}

	/// `docker exec <container> bash -c <command>`
	pub fn docker(container: &str) -> Self {
		Self::new("docker", ["exec", container, "bash", "-c"])
	}
}

#[async_trait]
impl ExecChannel for CommandExec {
	async fn exec(&self, command: &str) -> std::io::Result<ExecOutput> {
		trace!(
			program = %self.program,
			args = %self.prefix.join(" "),
			%command,
			"running command"
		);

		let output = Command::new(&self.program)
			.args(&self.prefix)
			.arg(command)
			.kill_on_drop(true)
			.output()
			.await?;

		let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
		combined.push_str(&String::from_utf8_lossy(&output.stderr));

		Ok(ExecOutput {
			exit_code: output.status.code(),
			output: combined.trim().to_string(),
		})
	}
}
