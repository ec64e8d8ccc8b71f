//! Subcommand implementations behind the `gitdex` binary.

use std::io::Write;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use log::{info, warn};

use crate::config::{Config, LoadReport, load_packages};
use crate::index::Index;
use crate::runtime::Runtime;
use crate::server;

#[derive(Debug, Clone, Default)]
pub struct ServeOptions {
    pub config: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Serve the packages that loaded even if others failed.
    pub allow_partial: bool,
}

async fn load_index<R: Runtime + 'static>(
    runtime: Arc<R>,
    config: &Config,
    allow_partial: bool,
) -> Result<Index> {
    let report: LoadReport = load_packages(runtime, config).await;
    if !report.is_complete() {
        let count = report.failures.len();
        if !allow_partial {
            let first = report
                .failures
                .into_iter()
                .next()
                .map(|e| e.to_string())
                .unwrap_or_default();
            bail!(
                "{} package(s) failed to load (first: {}); pass --allow-partial to serve the rest",
                count,
                first
            );
        }
        warn!("Continuing without {} package(s) that failed to load", count);
    }
    Ok(report.into_index())
}

fn listen_addr(config: &Config, options: &ServeOptions) -> Result<SocketAddr> {
    let host = options.host.as_deref().unwrap_or(&config.server.host);
    let port = options.port.unwrap_or(config.server.port);
    let ip: IpAddr = host
        .parse()
        .with_context(|| format!("Invalid listen address: {}", host))?;
    Ok(SocketAddr::new(ip, port))
}

/// Load the index file and serve it until Ctrl-C.
#[tracing::instrument(skip(runtime))]
pub async fn serve<R: Runtime + 'static>(runtime: Arc<R>, options: ServeOptions) -> Result<()> {
    let config = Config::load(runtime.as_ref(), options.config.as_deref())?;
    let addr = listen_addr(&config, &options)?;
    let index = load_index(runtime, &config, options.allow_partial).await?;

    server::run(addr, index, config.server.header_read_timeout(), async {
        if tokio::signal::ctrl_c().await.is_err() {
            // Without a signal handler, run until the process is killed.
            std::future::pending::<()>().await;
        }
    })
    .await
}

/// Print `name --> url` for every link of `name`.
#[tracing::instrument(skip(runtime, out))]
pub async fn links<R: Runtime + 'static>(
    runtime: Arc<R>,
    config: Option<&Path>,
    name: &str,
    out: &mut impl Write,
) -> Result<()> {
    let config = Config::load(runtime.as_ref(), config)?;
    let index = load_index(runtime, &config, true).await?;

    let Some(package) = index.get(name) else {
        bail!("Package '{}' is not in the index", name);
    };
    for link in package.links().await? {
        writeln!(out, "{}", link)?;
    }
    Ok(())
}

/// Print the registered package names in index order.
#[tracing::instrument(skip(runtime, out))]
pub async fn list<R: Runtime + 'static>(
    runtime: Arc<R>,
    config: Option<&Path>,
    out: &mut impl Write,
) -> Result<()> {
    let config = Config::load(runtime.as_ref(), config)?;
    let index = load_index(runtime, &config, true).await?;
    info!("{} package(s) registered", index.len());

    for package in index.packages() {
        writeln!(out, "{}", package.name())?;
    }
    Ok(())
}
