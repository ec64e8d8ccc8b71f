//! GitHub hosting client.

use anyhow::Result;
use async_trait::async_trait;
use log::debug;

use crate::http::HttpClient;

use super::{HostKind, HostingClient, RepoId};

const PER_PAGE: usize = 100;

/// GitHub API response types (internal).
mod api {
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    pub struct RepoInfo {
        #[allow(dead_code)]
        pub full_name: String,
    }

    /// Entry of `/tags` and `/branches`; both only need the name.
    #[derive(Deserialize, Debug)]
    pub struct NamedRef {
        pub name: String,
    }
}

/// GitHub client over the REST v3 API.
pub struct GitHubHost {
    http_client: HttpClient,
    api_url: String,
}

impl GitHubHost {
    pub fn new(http_client: HttpClient, api_url: &str) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Read every page of `kind`; the listing ends at the first short page.
    async fn fetch_ref_names(&self, repo: &RepoId, kind: &str) -> Result<Vec<String>> {
        let url = format!(
            "{}/repos/{}/{}/{}",
            self.api_url, repo.owner, repo.repo, kind
        );
        let per_page = PER_PAGE.to_string();
        let mut names = Vec::new();

        let mut page = 1usize;

        loop {
            debug!("Fetching {} page {} from {}...", kind, page, url);

            let page_param = page.to_string();
            let parsed: Vec<api::NamedRef> = self
                .http_client
                .get_json_with_query(
                    &url,
                    &[("per_page", per_page.as_str()), ("page", page_param.as_str())],
                )
                .await?;

            let len = parsed.len();
            names.extend(parsed.into_iter().map(|r| r.name));

            if len < PER_PAGE {
                return Ok(names);
            }
            page += 1;
        }
    }
}

#[async_trait]
impl HostingClient for GitHubHost {
    fn kind(&self) -> HostKind {
        HostKind::GitHub
    }

    #[tracing::instrument(skip(self))]
    async fn get_repo(&self, repo: &RepoId) -> Result<()> {
        let url = format!("{}/repos/{}/{}", self.api_url, repo.owner, repo.repo);
        debug!("Fetching repo info from {}...", url);
        let _: api::RepoInfo = self.http_client.get_json(&url).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn list_tags(&self, repo: &RepoId) -> Result<Vec<String>> {
        self.fetch_ref_names(repo, "tags").await
    }

    #[tracing::instrument(skip(self))]
    async fn list_branches(&self, repo: &RepoId) -> Result<Vec<String>> {
        self.fetch_ref_names(repo, "branches").await
    }
}
