//! External command execution.

use anyhow::{Context, Result};
use log::debug;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::RealRuntime;
use crate::error::IndexError;

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Non-blank stdout lines, trimmed.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines().map(str::trim).filter(|l| !l.is_empty())
    }
}

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) async fn run_impl(
        &self,
        argv: &[String],
        cwd: &Path,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput> {
        let (program, args) = argv.split_first().context("Cannot run an empty command")?;
        let display = argv.join(" ");
        debug!("Running `{}` in {}", display, cwd.display());

        let child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the wait future on timeout must not leave the child running.
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to execute `{}`", display))?;

        let output = match timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(output) => output,
                Err(_) => {
                    return Err(IndexError::CommandTimeout {
                        command: display,
                        timeout: limit,
                    }
                    .into());
                }
            },
            None => child.wait_with_output().await,
        }
        .with_context(|| format!("Failed to wait for `{}`", display))?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
