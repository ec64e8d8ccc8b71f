//! Builds authenticated hosting clients.
//!
//! Credentials are read from the environment once, when the first client for a
//! platform is created, and live only inside the reqwest client's default
//! headers afterwards.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use base64::Engine;
use log::debug;
use reqwest::{
    Client,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};

use super::{BitbucketHost, GitHubHost, HostKind, HostingClient};
use crate::http::{HttpClient, RetryPolicy};
use crate::runtime::Runtime;

pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const BITBUCKET_USERNAME: &str = "BITBUCKET_USERNAME";
pub const BITBUCKET_APP_PASSWORD: &str = "BITBUCKET_APP_PASSWORD";

/// Creates hosting clients on demand and shares one per (platform, API URL).
pub struct HostingFactory<'a, R: Runtime> {
    runtime: &'a R,
    request_timeout: Option<Duration>,
    retry: RetryPolicy,
    clients: HashMap<(HostKind, String), Arc<dyn HostingClient>>,
}

impl<'a, R: Runtime> HostingFactory<'a, R> {
    pub fn new(runtime: &'a R, request_timeout: Option<Duration>) -> Self {
        Self {
            runtime,
            request_timeout,
            retry: RetryPolicy::default(),
            clients: HashMap::new(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Get or create the client for `kind`, talking to `api_url` or the platform default.
    pub fn client(&mut self, kind: HostKind, api_url: Option<&str>) -> Result<Arc<dyn HostingClient>> {
        let api_url = api_url.unwrap_or(kind.default_api_url()).to_string();
        let key = (kind, api_url.clone());

        if let Some(existing) = self.clients.get(&key) {
            return Ok(existing.clone());
        }

        let http_client = HttpClient::new(self.reqwest_client(kind)?).with_retry_policy(self.retry);
        let client: Arc<dyn HostingClient> = match kind {
            HostKind::GitHub => Arc::new(GitHubHost::new(http_client, &api_url)),
            HostKind::Bitbucket => Arc::new(BitbucketHost::new(http_client, &api_url)),
        };
        self.clients.insert(key, client.clone());
        Ok(client)
    }

    fn reqwest_client(&self, kind: HostKind) -> Result<Client> {
        let mut headers = HeaderMap::new();
        if let Some(mut auth_value) = self.authorization(kind)? {
            auth_value.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth_value);
        }

        let mut builder = Client::builder()
            .user_agent(concat!("gitdex/", env!("GITDEX_VERSION")))
            .default_headers(headers);
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder.build()?)
    }

    fn authorization(&self, kind: HostKind) -> Result<Option<HeaderValue>> {
        match kind {
            HostKind::GitHub => {
                let Ok(token) = self.runtime.env_var(GITHUB_TOKEN) else {
                    return Ok(None);
                };
                debug!("Using {} for GitHub authentication", GITHUB_TOKEN);
                Ok(Some(HeaderValue::from_str(&format!("Bearer {}", token))?))
            }
            HostKind::Bitbucket => {
                let (Ok(user), Ok(password)) = (
                    self.runtime.env_var(BITBUCKET_USERNAME),
                    self.runtime.env_var(BITBUCKET_APP_PASSWORD),
                ) else {
                    return Ok(None);
                };
                debug!("Using Bitbucket app password for user {}", user);
                let encoded = base64::engine::general_purpose::STANDARD
                    .encode(format!("{}:{}", user, password));
                Ok(Some(HeaderValue::from_str(&format!("Basic {}", encoded))?))
            }
        }
    }
}
