//! Bitbucket Cloud hosting client.

use anyhow::Result;
use async_trait::async_trait;
use log::debug;

use crate::http::HttpClient;

use super::{HostKind, HostingClient, RepoId};

/// Bitbucket 2.0 API response types (internal).
mod api {
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    pub struct Repository {
        #[allow(dead_code)]
        pub full_name: String,
    }

    /// Paginated listing; `next` is an absolute URL to the following page.
    #[derive(Deserialize, Debug)]
    pub struct Page<T> {
        pub values: Vec<T>,
        pub next: Option<String>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Ref {
        pub name: String,
    }
}

/// Bitbucket Cloud client over the 2.0 REST API.
pub struct BitbucketHost {
    http_client: HttpClient,
    api_url: String,
}

impl BitbucketHost {
    pub fn new(http_client: HttpClient, api_url: &str) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Read every page of `kind`, following `next` until a page has none.
    async fn fetch_ref_names(&self, repo: &RepoId, kind: &str) -> Result<Vec<String>> {
        let first = format!(
            "{}/repositories/{}/{}/refs/{}",
            self.api_url, repo.owner, repo.repo, kind
        );
        let mut names = Vec::new();

        let mut page: api::Page<api::Ref> = {
            debug!("Fetching {} from {}...", kind, first);
            self.http_client
                .get_json_with_query(&first, &[("pagelen", "100")])
                .await?
        };

        loop {
            names.extend(page.values.drain(..).map(|r| r.name));
            let Some(next) = page.next.take() else {
                return Ok(names);
            };
            debug!("Fetching next {} page from {}...", kind, next);
            page = self.http_client.get_json(&next).await?;
        }
    }
}

#[async_trait]
impl HostingClient for BitbucketHost {
    fn kind(&self) -> HostKind {
        HostKind::Bitbucket
    }

    #[tracing::instrument(skip(self))]
    async fn get_repo(&self, repo: &RepoId) -> Result<()> {
        let url = format!(
            "{}/repositories/{}/{}",
            self.api_url, repo.owner, repo.repo
        );
        debug!("Fetching repository from {}...", url);
        let _: api::Repository = self.http_client.get_json(&url).await?;
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
