//! The TOML index file: server settings and the packages to serve.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};
use serde::Deserialize;

use crate::error::IndexError;
use crate::hosting::{HostKind, HostingFactory};
use crate::index::Index;
use crate::package::{
    CachedPackage, GitRepoOptions, LocalGitPackage, Package, RemoteHostedPackage,
    RemoteRepoOptions, StaticLinkPackage,
};
use crate::runtime::Runtime;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 7890;
pub const DEFAULT_HEADER_READ_TIMEOUT: Duration = Duration::from_secs(10);
const CONFIG_FILE: &str = "index.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default, rename = "package")]
    pub packages: Vec<PackageConfig>,

    /// Directory relative `path` entries are resolved against.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub command_timeout_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub header_read_timeout_ms: Option<u64>,
    pub cache_ttl_secs: Option<u64>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            command_timeout_ms: None,
            request_timeout_ms: None,
            header_read_timeout_ms: None,
            cache_ttl_secs: None,
        }
    }
}

impl ServerConfig {
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_ms.map(Duration::from_millis)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// How long a client may take to send its request head.
    pub fn header_read_timeout(&self) -> Duration {
        self.header_read_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_HEADER_READ_TIMEOUT)
    }

    /// `None` when caching is off.
    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    Static,
    Git,
    GitHub,
    Bitbucket,
}

impl PackageKind {
    fn host(self) -> Option<HostKind> {
        match self {
            PackageKind::GitHub => Some(HostKind::GitHub),
            PackageKind::Bitbucket => Some(HostKind::Bitbucket),
            PackageKind::Static | PackageKind::Git => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            PackageKind::Static => "static",
            PackageKind::Git => "git",
            PackageKind::GitHub => "github",
            PackageKind::Bitbucket => "bitbucket",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkConfig {
    pub name: String,
    pub url: String,
}

/// One `[[package]]` table. Which optional fields are required depends on `kind`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageConfig {
    pub name: String,
    pub kind: PackageKind,
    #[serde(default)]
    pub links: Vec<LinkConfig>,
    pub path: Option<PathBuf>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub strip_v: Option<bool>,
    pub url_template: Option<String>,
    pub api_url: Option<String>,
}

impl PackageConfig {
    fn validate(&self) -> Result<(), IndexError> {
        if self.name.trim().is_empty() {
            return Err(IndexError::config("Package name must not be empty"));
        }
        let missing = |field: &str| {
            IndexError::config(format!(
                "Package '{}' of kind {} requires '{}'",
                self.name,
                self.kind.as_str(),
                field
            ))
        };
        match self.kind {
            PackageKind::Static => {}
            PackageKind::Git => {
                if self.path.is_none() {
                    return Err(missing("path"));
                }
            }
            PackageKind::GitHub | PackageKind::Bitbucket => {
                if self.owner.is_none() {
                    return Err(missing("owner"));
                }
                if self.repo.is_none() {
                    return Err(missing("repo"));
                }
            }
        }
        Ok(())
    }
}

impl Config {
    /// Parse and validate index file contents.
    pub fn parse(contents: &str) -> Result<Self, IndexError> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| IndexError::config(format!("Invalid index file: {}", e)))?;

        if config.packages.is_empty() {
            return Err(IndexError::config("The index file defines no packages"));
        }
        for package in &config.packages {
            package.validate()?;
        }
        Ok(config)
    }

    /// Read the index file at `path`, or at [`Config::default_path`].
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, path: Option<&Path>) -> Result<Self, IndexError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path(runtime)?,
        };
        debug!("Reading index file {}", path.display());

        let contents = runtime.read_to_string(&path).map_err(|e| {
            IndexError::config(format!("Failed to read {}: {:#}", path.display(), e))
        })?;
        let mut config = Self::parse(&contents)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// `{config_dir}/gitdex/index.toml`.
    pub fn default_path<R: Runtime>(runtime: &R) -> Result<PathBuf, IndexError> {
        runtime
            .config_dir()
            .map(|dir| dir.join(env!("CARGO_PKG_NAME")).join(CONFIG_FILE))
            .ok_or_else(|| {
                IndexError::config("Could not determine the configuration directory; use --config")
            })
    }

    fn package_path(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

/// Outcome of building every configured package.
pub struct LoadReport {
    /// Packages that were built, in file order.
    pub packages: Vec<Arc<dyn Package>>,
    pub failures: Vec<IndexError>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn into_index(self) -> Index {
        Index::new(self.packages)
    }
}

/// Build every configured package. A failing package does not stop the others.
#[tracing::instrument(skip_all)]
pub async fn load_packages<R: Runtime + 'static>(runtime: Arc<R>, config: &Config) -> LoadReport {
    let mut factory = HostingFactory::new(runtime.as_ref(), config.server.request_timeout());
    let mut report = LoadReport {
        packages: Vec::new(),
        failures: Vec::new(),
    };

    for entry in &config.packages {
        match build_package(&runtime, &mut factory, config, entry).await {
            Ok(package) => {
                info!("Registered {} package '{}'", entry.kind.as_str(), entry.name);
                report.packages.push(package);
            }
            Err(err) => {
                error!("{}", err);
                report.failures.push(err);
            }
        }
    }
    report
}

async fn build_package<R: Runtime + 'static>(
    runtime: &Arc<R>,
    factory: &mut HostingFactory<'_, R>,
    config: &Config,
    entry: &PackageConfig,
) -> Result<Arc<dyn Package>, IndexError> {
    entry.validate()?;

    let package: Arc<dyn Package> = match entry.kind {
        PackageKind::Static => {
            let links = entry.links.iter().map(|l| (l.name.clone(), l.url.clone()));
            return Ok(Arc::new(StaticLinkPackage::new(&entry.name, links)));
        }
        PackageKind::Git => {
            let path = entry
                .path
                .as_deref()
                .map(|p| config.package_path(p))
                .ok_or_else(|| IndexError::config("missing path"))?;
            let options = GitRepoOptions {
                strip_v: entry.strip_v.unwrap_or(false),
                timeout: config.server.command_timeout(),
                url_template: entry.url_template.clone(),
            };
            Arc::new(LocalGitPackage::open(runtime.clone(), &entry.name, &path, options).await?)
        }
        PackageKind::GitHub | PackageKind::Bitbucket => {
            let (Some(kind), Some(owner), Some(repo)) =
                (entry.kind.host(), entry.owner.as_deref(), entry.repo.as_deref())
            else {
                return Err(IndexError::config("missing owner or repo"));
            };
            let client = factory
                .client(kind, entry.api_url.as_deref())
                .map_err(|e| IndexError::config(format!("Package '{}': {:#}", entry.name, e)))?;
            let options = RemoteRepoOptions {
                strip_v: entry.strip_v.unwrap_or(true),
                url_template: entry.url_template.clone(),
            };
            Arc::new(RemoteHostedPackage::connect(client, &entry.name, owner, repo, options).await?)
        }
    };

    Ok(match config.server.cache_ttl() {
        Some(ttl) => Arc::new(CachedPackage::new(package, ttl)),
        None => package,
    })
}
