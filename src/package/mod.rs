//! Packages: named producers of installable links.
//!
//! Three strategies implement [`Package`]:
//!
//! - [`StaticLinkPackage`] - links given verbatim at construction
//! - [`LocalGitPackage`] - tags and branches of an on-disk git repository
//! - [`RemoteHostedPackage`] - tags and branches read from a hosting API
//!
//! The two version-control strategies share the resolution rules in [`vcs`].

mod cache;
mod git;
mod remote;
mod static_links;
pub mod vcs;

use async_trait::async_trait;

use crate::error::IndexError;
use crate::link::Link;

pub use cache::CachedPackage;
pub use git::{GitRepoOptions, GitRepoSource, LOCAL_URL_TEMPLATE, LocalGitPackage};
pub use remote::{HostedRepoSource, RemoteHostedPackage, RemoteRepoOptions};
pub use static_links::StaticLinkPackage;
pub use vcs::{RefSource, UrlTemplate, VcsPackage};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Package: Send + Sync {
    /// Unique name within an index.
    fn name(&self) -> &str;

    /// Current links, in display order.
    ///
    /// Version-control packages query their source on every call.
    async fn links(&self) -> Result<Vec<Link>, IndexError>;
}
