use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::debug;

use super::Package;
use crate::error::IndexError;
use crate::link::Link;

/// Reuses a package's links for a bounded time.
///
/// Failed lookups are never cached. [`CachedPackage::fresh_links`] always
/// goes to the source.
pub struct CachedPackage {
    inner: Arc<dyn Package>,
    ttl: Duration,
    cached: Mutex<Option<(Instant, Vec<Link>)>>,
}

impl CachedPackage {
    pub fn new(inner: Arc<dyn Package>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cached: Mutex::new(None),
        }
    }

    /// Query the wrapped package and refresh the cache.
    pub async fn fresh_links(&self) -> Result<Vec<Link>, IndexError> {
        let links = self.inner.links().await?;
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((Instant::now(), links.clone()));
        Ok(links)
    }

    fn cached_links(&self) -> Option<Vec<Link>> {
        let guard = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some((at, links)) if at.elapsed() < self.ttl => Some(links.clone()),
            _ => None,
        }
    }
}

#[async_trait]
impl Package for CachedPackage {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn links(&self) -> Result<Vec<Link>, IndexError> {
        if let Some(links) = self.cached_links() {
            debug!("Serving cached links for {}", self.inner.name());
            return Ok(links);
        }
        self.fresh_links().await
    }
}
