//! Packages backed by a repository on a git hosting platform.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use log::debug;

use super::vcs::{PACKAGE_FIELD, REF_FIELD, RefSource, UrlTemplate, VcsPackage};
use crate::error::IndexError;
use crate::hosting::{HostingClient, RepoId};
use crate::http::is_not_found;

const OWNER_FIELD: &str = "owner";
const REPO_FIELD: &str = "repo";

/// A package listing the tags and branches of a hosted repository.
pub type RemoteHostedPackage = VcsPackage<HostedRepoSource>;

#[derive(Debug, Clone)]
pub struct RemoteRepoOptions {
    /// Remove a leading `v` from tag labels.
    pub strip_v: bool,
    /// Overrides the platform's SSH URL template.
    pub url_template: Option<String>,
}

impl Default for RemoteRepoOptions {
    fn default() -> Self {
        Self {
            strip_v: true,
            url_template: None,
        }
    }
}

/// Tags and branches read through a [`HostingClient`], one listing call each.
pub struct HostedRepoSource {
    client: Arc<dyn HostingClient>,
    repo: RepoId,
}

impl HostedRepoSource {
    pub fn repo(&self) -> &RepoId {
        &self.repo
    }
}

#[async_trait]
impl RefSource for HostedRepoSource {
    async fn tags(&self) -> Result<Vec<String>> {
        self.client.list_tags(&self.repo).await
    }

    async fn branches(&self) -> Result<Vec<String>> {
        self.client.list_branches(&self.repo).await
    }

    fn location_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            (OWNER_FIELD, self.repo.owner.clone()),
            (REPO_FIELD, self.repo.repo.clone()),
        ]
    }
}

impl VcsPackage<HostedRepoSource> {
    /// Check that `owner/repo` exists, then wrap it as a package.
    ///
    /// A 404 from the platform becomes [`IndexError::RepositoryNotFound`];
    /// any other failure is a [`IndexError::RemoteSource`].
    #[tracing::instrument(skip(client, options))]
    pub async fn connect(
        client: Arc<dyn HostingClient>,
        name: &str,
        owner: &str,
        repo: &str,
        options: RemoteRepoOptions,
    ) -> Result<Self, IndexError> {
        let template = UrlTemplate::parse(
            options
                .url_template
                .as_deref()
                .unwrap_or(client.kind().ssh_url_template()),
            &[OWNER_FIELD, REPO_FIELD, REF_FIELD, PACKAGE_FIELD],
        )?;

        let repo = RepoId::new(owner, repo);
        if let Err(err) = client.get_repo(&repo).await {
            return Err(if is_not_found(&err) {
                IndexError::RepositoryNotFound {
                    package: name.to_string(),
                    owner: repo.owner,
                    repo: repo.repo,
                }
            } else {
                IndexError::remote(name, err)
            });
        }
        debug!(
            "Package '{}' uses {} repository {}",
            name,
            client.kind(),
            repo
        );

        let source = HostedRepoSource { client, repo };
        Ok(VcsPackage::new(name, source, template, options.strip_v))
    }
}
