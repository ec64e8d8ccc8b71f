//! File system reads and path resolution.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn read_to_string_impl(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path)
            .with_context(|| format!("Failed to read file {}", path.display()))
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn absolute_impl(&self, path: &Path) -> Result<PathBuf> {
        std::path::absolute(path)
            .with_context(|| format!("Failed to resolve absolute path for {}", path.display()))
    }
}
