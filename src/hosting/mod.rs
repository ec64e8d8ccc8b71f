//! Git hosting provider abstraction.
//!
//! This module provides a unified interface for the code hosting platforms a
//! [`RemoteHostedPackage`](crate::package::RemoteHostedPackage) can read tags
//! and branches from (GitHub, Bitbucket).

mod bitbucket;
mod factory;
mod github;

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;

pub use bitbucket::BitbucketHost;
pub use factory::HostingFactory;
pub use github::GitHubHost;

/// Repository identifier (owner/repo format).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Hosting platform identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostKind {
    GitHub,
    Bitbucket,
}

impl HostKind {
    /// Public API endpoint used when no override is configured.
    pub fn default_api_url(&self) -> &'static str {
        match self {
            HostKind::GitHub => "https://api.github.com",
            HostKind::Bitbucket => "https://api.bitbucket.org/2.0",
        }
    }

    /// pip-installable SSH URL for a ref of a hosted repository.
    pub fn ssh_url_template(&self) -> &'static str {
        match self {
            HostKind::GitHub => "git+ssh://git@github.com/{owner}/{repo}.git@{ref}#egg={package}",
            HostKind::Bitbucket => {
                "git+ssh://git@bitbucket.org/{owner}/{repo}.git@{ref}#egg={package}"
            }
        }
    }
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostKind::GitHub => write!(f, "github"),
            HostKind::Bitbucket => write!(f, "bitbucket"),
        }
    }
}

/// Narrow view of a hosting API: does a repository exist, and what refs does it have.
///
/// Implementations return errors classified by [`crate::http::classify_error`],
/// so a missing repository can be told apart from a network failure with
/// [`crate::http::is_not_found`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HostingClient: Send + Sync {
    /// Get the hosting platform kind.
    fn kind(&self) -> HostKind;

    /// Look the repository up once; fails if it is missing or inaccessible.
    async fn get_repo(&self, repo: &RepoId) -> Result<()>;

    /// Tag names in the order the API lists them.
    async fn list_tags(&self, repo: &RepoId) -> Result<Vec<String>>;

    /// Branch names in the order the API lists them.
    async fn list_branches(&self, repo: &RepoId) -> Result<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let repo = RepoId::new("atlassian", "python-bitbucket");
        assert_eq!(repo.to_string(), "atlassian/python-bitbucket");

        assert_eq!(HostKind::GitHub.to_string(), "github");
        assert_eq!(HostKind::Bitbucket.to_string(), "bitbucket");
    }

    #[test]
    fn test_host_kind_templates() {
        assert!(
            HostKind::Bitbucket
                .ssh_url_template()
                .starts_with("git+ssh://git@bitbucket.org/")
        );
        assert!(
            HostKind::GitHub
                .ssh_url_template()
                .starts_with("git+ssh://git@github.com/")
        );
        assert_eq!(HostKind::GitHub.default_api_url(), "https://api.github.com");
    }
}
