//! Installable links and install-fragment normalization.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Marker pip uses to learn the project name behind a VCS URL.
pub const EGG_FRAGMENT: &str = "#egg=";

// Matches VCS scheme prefixes such as `git+` or `svn+`.
static VCS_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+\+").expect("valid VCS scheme regex"));

/// One installable artifact location: a display name and a URL.
///
/// A `Link` can only be built through [`Link::new`], so every instance has
/// already gone through [`normalize_url`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    name: String,
    url: String,
}

impl Link {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let name = name.into();
        let url = normalize_url(&name, url.into());
        Self { name, url }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --> {}", self.name, self.url)
    }
}

impl<N: Into<String>, U: Into<String>> From<(N, U)> for Link {
    fn from((name, url): (N, U)) -> Self {
        Link::new(name, url)
    }
}

/// Appends `#egg={name}` to VCS URLs that lack an install fragment.
///
/// URLs that already carry `#egg=` are returned unchanged, even when the
/// fragment names a different project.
pub fn normalize_url(name: &str, url: String) -> String {
    if VCS_SCHEME.is_match(&url) && !url.contains(EGG_FRAGMENT) {
        format!("{url}{EGG_FRAGMENT}{name}")
    } else {
        url
    }
}
