use async_trait::async_trait;

use super::Package;
use crate::error::IndexError;
use crate::link::Link;

/// A package whose links are fixed at construction.
#[derive(Debug, Clone)]
pub struct StaticLinkPackage {
    name: String,
    links: Vec<Link>,
}

impl StaticLinkPackage {
    /// Every `(name, url)` pair is normalized; order and duplicates are kept.
    pub fn new<I, N, U>(name: impl Into<String>, links: I) -> Self
    where
        I: IntoIterator<Item = (N, U)>,
        N: Into<String>,
        U: Into<String>,
    {
        Self {
            name: name.into(),
            links: links.into_iter().map(Link::from).collect(),
        }
    }
}

#[async_trait]
impl Package for StaticLinkPackage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn links(&self) -> Result<Vec<Link>, IndexError> {
        Ok(self.links.clone())
    }
}
