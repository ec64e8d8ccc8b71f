//! The name to package registry served over HTTP.
//!
//! Keys are the lowercased package names. A lookup that misses retries once
//! with the requested name lowercased and `_` replaced by `-`, so pip's
//! `My_Package` still finds `my-package`.

use std::sync::Arc;

use indexmap::IndexMap;
use log::debug;

use crate::package::Package;

#[derive(Clone, Default)]
pub struct Index {
    packages: IndexMap<String, Arc<dyn Package>>,
}

impl Index {
    /// Build the index. A later package whose lowercased name collides with an
    /// earlier one replaces it in place.
    pub fn new(packages: impl IntoIterator<Item = Arc<dyn Package>>) -> Self {
        let mut map: IndexMap<String, Arc<dyn Package>> = IndexMap::new();
        for package in packages {
            let key = package.name().to_lowercase();
            if let Some(previous) = map.insert(key, package.clone()) {
                debug!(
                    "Package '{}' replaces earlier package '{}'",
                    package.name(),
                    previous.name()
                );
            }
        }
        Self { packages: map }
    }

    /// Resolve `requested` exactly, then with the case/underscore fallback.
    pub fn get(&self, requested: &str) -> Option<&Arc<dyn Package>> {
        self.packages
            .get(requested)
            .or_else(|| self.packages.get(&fallback_key(requested)))
    }

    /// Packages in insertion order.
    pub fn packages(&self) -> impl Iterator<Item = &Arc<dyn Package>> {
        self.packages.values()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.packages.keys()).finish()
    }
}

fn fallback_key(requested: &str) -> String {
    requested.to_lowercase().replace('_', "-")
}
