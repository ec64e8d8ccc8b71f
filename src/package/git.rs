//! Packages backed by a git repository on the local file system.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use log::debug;
use regex::Regex;

use super::vcs::{PACKAGE_FIELD, REF_FIELD, RefSource, UrlTemplate, VcsPackage, template_path};
use crate::error::IndexError;
use crate::runtime::{CommandOutput, Runtime};

/// Default URL for refs of a local repository.
pub const LOCAL_URL_TEMPLATE: &str = "git+file:///{path}@{ref}#egg={package}";

const PATH_FIELD: &str = "path";

// `git branch` marks the current branch with `*` and worktree branches with `+`.
static BRANCH_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[*+]").expect("valid branch marker regex"));

/// A package listing the tags and branches of a local git repository.
pub type LocalGitPackage<R> = VcsPackage<GitRepoSource<R>>;

#[derive(Debug, Clone, Default)]
pub struct GitRepoOptions {
    /// Remove a leading `v` from tag labels.
    pub strip_v: bool,
    /// Deadline for each git invocation.
    pub timeout: Option<Duration>,
    /// Overrides [`LOCAL_URL_TEMPLATE`].
    pub url_template: Option<String>,
}

/// Tags and branches read with the `git` CLI, always run inside the repository.
pub struct GitRepoSource<R: Runtime> {
    runtime: Arc<R>,
    location: PathBuf,
    root: PathBuf,
    timeout: Option<Duration>,
}

impl<R: Runtime> GitRepoSource<R> {
    /// Directory git commands run in.
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Top-level directory of the working tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn git(&self, args: &[&str]) -> Result<CommandOutput> {
        run_git(self.runtime.as_ref(), &self.location, args, self.timeout).await
    }

    async fn checked_git(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = self.git(args).await?;
        if !output.success() {
            bail!(
                "`git {}` failed in {} ({}): {}",
                args.join(" "),
                self.location.display(),
                exit_description(&output),
                output.stderr.trim()
            );
        }
        Ok(output)
    }
}

async fn run_git<R: Runtime + ?Sized>(
    runtime: &R,
    cwd: &Path,
    args: &[&str],
    timeout: Option<Duration>,
) -> Result<CommandOutput> {
    let argv: Vec<String> = std::iter::once("git")
        .chain(args.iter().copied())
        .map(str::to_string)
        .collect();
    runtime.run(&argv, cwd, timeout).await
}

fn exit_description(output: &CommandOutput) -> String {
    match output.exit_code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Parse `git branch` output, dropping markers and detached-HEAD entries.
pub fn parse_branches(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(|line| BRANCH_MARKER.replace(line, ""))
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty() && !line.starts_with('('))
        .collect()
}

#[async_trait]
impl<R: Runtime> RefSource for GitRepoSource<R> {
    async fn tags(&self) -> Result<Vec<String>> {
        let output = self.checked_git(&["tag"]).await?;
        Ok(output.lines().map(str::to_string).collect())
    }

    async fn branches(&self) -> Result<Vec<String>> {
        let output = self.checked_git(&["branch"]).await?;
        Ok(parse_branches(&output.stdout))
    }

    fn location_fields(&self) -> Vec<(&'static str, String)> {
        vec![(
            PATH_FIELD,
            template_path(&self.root.to_string_lossy()).to_string(),
        )]
    }
}

impl<R: Runtime> VcsPackage<GitRepoSource<R>> {
    /// Open the repository containing `location`.
    ///
    /// Fails with [`IndexError::RepositoryResolution`] when `location` is not
    /// inside a git working tree.
    #[tracing::instrument(skip(runtime, options))]
    pub async fn open(
        runtime: Arc<R>,
        name: &str,
        location: &Path,
        options: GitRepoOptions,
    ) -> Result<Self, IndexError> {
        let template = UrlTemplate::parse(
            options.url_template.as_deref().unwrap_or(LOCAL_URL_TEMPLATE),
            &[PATH_FIELD, REF_FIELD, PACKAGE_FIELD],
        )?;

        let location = runtime
            .absolute(location)
            .map_err(|e| IndexError::config(format!("Package '{}': {:#}", name, e)))?;

        let resolution_error = |stderr: String| IndexError::RepositoryResolution {
            package: name.to_string(),
            location: location.clone(),
            stderr,
        };

        let output = run_git(
            runtime.as_ref(),
            &location,
            &["rev-parse", "--show-toplevel"],
            options.timeout,
        )
        .await
        .map_err(|e| resolution_error(format!("{:#}", e)))?;

        if !output.success() {
            return Err(resolution_error(output.stderr.trim().to_string()));
        }

        let root = runtime
            .absolute(Path::new(output.stdout.trim()))
            .map_err(|e| resolution_error(format!("{:#}", e)))?;
        debug!("Package '{}' uses git repository {}", name, root.display());

        let source = GitRepoSource {
            runtime,
            location,
            root,
            timeout: options.timeout,
        };
        Ok(VcsPackage::new(name, source, template, options.strip_v))
    }
}
