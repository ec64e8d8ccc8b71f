//! Runtime abstraction for system operations.
//!
//! This module provides a trait-based abstraction over system operations,
//! enabling dependency injection and testability.
//!
//! # Structure
//!
//! - `command` - External command execution (explicit working directory, timeout)
//! - `env` - Environment variables and well-known directories
//! - `fs` - File system reads and path resolution

mod command;
mod env;
mod fs;

use anyhow::Result;
use async_trait::async_trait;
use std::env as std_env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use command::CommandOutput;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Runtime: Send + Sync {
    // Environment
    fn env_var(&self, key: &str) -> Result<String, std_env::VarError>;

    // File System
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Make `path` absolute against the current directory without touching the file system.
    fn absolute(&self, path: &Path) -> Result<PathBuf>;

    // Directories
    fn config_dir(&self) -> Option<PathBuf>;

    // Commands
    /// Run `argv` with `cwd` as its working directory.
    ///
    /// The process working directory is never changed. When `timeout` elapses
    /// the child is killed and an [`IndexError::CommandTimeout`] is returned.
    ///
    /// [`IndexError::CommandTimeout`]: crate::error::IndexError::CommandTimeout
    async fn run(
        &self,
        argv: &[String],
        cwd: &Path,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RealRuntime;

#[async_trait]
impl Runtime for RealRuntime {
    fn env_var(&self, key: &str) -> Result<String, std_env::VarError> {
        self.env_var_impl(key)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.read_to_string_impl(path)
    }

    fn absolute(&self, path: &Path) -> Result<PathBuf> {
        self.absolute_impl(path)
    }

    fn config_dir(&self) -> Option<PathBuf> {
        self.config_dir_impl()
    }

    async fn run(
        &self,
        argv: &[String],
        cwd: &Path,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput> {
        self.run_impl(argv, cwd, timeout).await
    }
}
