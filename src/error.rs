//! Error types shared by the link-resolution engine.
//!
//! Construction-time failures (`Configuration`, `RepositoryResolution`,
//! `RepositoryNotFound`) are reported to the operator at startup. Request-time
//! failures (`RemoteSource`, `CommandTimeout`) are turned into a 5xx response
//! for the single request that hit them.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    /// Invalid construction arguments or index file contents.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The location of a local package is not inside a git working tree.
    #[error("Package '{package}': {} is not inside a git repository: {stderr}", location.display())]
    RepositoryResolution {
        package: String,
        location: PathBuf,
        stderr: String,
    },

    /// The hosting provider does not know the repository.
    #[error("Package '{package}': repository {owner}/{repo} was not found")]
    RepositoryNotFound {
        package: String,
        owner: String,
        repo: String,
    },

    /// A live tag/branch query failed.
    #[error("Failed to query source for '{package}': {source:#}")]
    RemoteSource {
        package: String,
        #[source]
        source: anyhow::Error,
    },

    /// An external command ran past its deadline and was killed.
    #[error("Command `{command}` timed out after {}ms", timeout.as_millis())]
    CommandTimeout { command: String, timeout: Duration },
}

impl IndexError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn remote(package: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::RemoteSource {
            package: package.into(),
            source: source.into(),
        }
    }

    /// Whether this error happened while answering a request rather than at startup.
    pub fn is_request_time(&self) -> bool {
        matches!(
            self,
            IndexError::RemoteSource { .. } | IndexError::CommandTimeout { .. }
        )
    }
}
