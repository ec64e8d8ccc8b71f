//! Link resolution shared by version-control backed packages.
//!
//! A [`RefSource`] lists tags and branches; [`VcsPackage`] turns them into
//! links:
//!
//! - tags that look like versions (`^\d` or `^v\d`) become
//!   `{package}-{label}`, where `label` optionally drops a leading `v`
//! - every branch becomes `{package}-{branch}`
//! - tags come first, then branches, each in source order
//!
//! The URL of every link is rendered from a [`UrlTemplate`] that receives the
//! unmodified ref as `{ref}` and the install id as `{package}`, plus the
//! source's own location fields.

use std::sync::LazyLock;

use anyhow::Result;
use async_trait::async_trait;
use log::warn;
use regex::Regex;

use super::Package;
use crate::error::IndexError;
use crate::link::Link;

static VERSION_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v?\d").expect("valid version tag regex"));

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w*)\}").expect("valid placeholder regex"));

/// Template fields every version-control package provides.
pub const REF_FIELD: &str = "ref";
pub const PACKAGE_FIELD: &str = "package";

/// Where tags and branches come from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RefSource: Send + Sync {
    /// Raw tag names, in listing order.
    async fn tags(&self) -> Result<Vec<String>>;

    /// Raw branch names, in listing order.
    async fn branches(&self) -> Result<Vec<String>>;

    /// Location fields substituted into the URL template (e.g. `path`, or `owner`/`repo`).
    fn location_fields(&self) -> Vec<(&'static str, String)>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(String),
}

/// A URL pattern with `{field}` placeholders, validated up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl UrlTemplate {
    /// Parse `template`, rejecting placeholders outside of `fields`.
    pub fn parse(template: &str, fields: &[&str]) -> Result<Self, IndexError> {
        let mut segments = Vec::new();
        let mut last = 0;

        for captures in PLACEHOLDER.captures_iter(template) {
            let (Some(whole), Some(field)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            if !fields.contains(&field.as_str()) {
                return Err(IndexError::config(format!(
                    "Unknown placeholder {{{}}} in URL template '{}' (expected one of: {})",
                    field.as_str(),
                    template,
                    fields.join(", ")
                )));
            }
            if whole.start() > last {
                segments.push(Segment::Literal(template[last..whole.start()].to_string()));
            }
            segments.push(Segment::Field(field.as_str().to_string()));
            last = whole.end();
        }
        if last < template.len() {
            segments.push(Segment::Literal(template[last..].to_string()));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Substitute placeholders; a field missing from `values` renders empty.
    pub fn render(&self, values: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(self.source.len() + 32);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(field) => {
                    if let Some((_, value)) = values.iter().find(|(k, _)| k == field) {
                        out.push_str(value);
                    }
                }
            }
        }
        out
    }
}

/// Whether a tag names a version: starts with a digit, or `v` and a digit.
pub fn is_version_tag(tag: &str) -> bool {
    VERSION_TAG.is_match(tag)
}

/// Label used in the install id for a version tag.
pub fn tag_label(tag: &str, strip_v: bool) -> &str {
    if strip_v {
        tag.strip_prefix('v').unwrap_or(tag)
    } else {
        tag
    }
}

/// Drops the leading separator of an absolute path so it fits `file:///{path}`.
pub fn template_path(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// Links built from one tag/branch listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub links: Vec<Link>,
    /// Tags left out because they do not name a version; each is logged at `warn`.
    pub skipped_tags: Vec<String>,
}

/// Turn tag and branch listings into links. Non-version tags are skipped with a warning.
pub fn resolve_links(
    package: &str,
    template: &UrlTemplate,
    location: &[(&'static str, String)],
    strip_v: bool,
    tags: &[String],
    branches: &[String],
) -> Resolution {
    let build = |reference: &str, label: &str| {
        let install_id = format!("{}-{}", package, label);
        let mut values: Vec<(&str, &str)> = location.iter().map(|(k, v)| (*k, v.as_str())).collect();
        values.push((REF_FIELD, reference));
        values.push((PACKAGE_FIELD, &install_id));
        let url = template.render(&values);
        Link::new(install_id, url)
    };

    let mut links = Vec::with_capacity(tags.len() + branches.len());
    let mut skipped_tags = Vec::new();
    for tag in tags {
        if is_version_tag(tag) {
            links.push(build(tag, tag_label(tag, strip_v)));
        } else {
            warn!("{}: ignoring non semantic version tag: {}", package, tag);
            skipped_tags.push(tag.clone());
        }
    }
    for branch in branches {
        links.push(build(branch, branch));
    }
    Resolution {
        links,
        skipped_tags,
    }
}

/// A package whose links are derived from a version-control source on every read.
pub struct VcsPackage<S: RefSource> {
    name: String,
    source: S,
    template: UrlTemplate,
    strip_v: bool,
}

impl<S: RefSource> VcsPackage<S> {
    pub fn new(name: impl Into<String>, source: S, template: UrlTemplate, strip_v: bool) -> Self {
        Self {
            name: name.into(),
            source,
            template,
            strip_v,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Keep typed errors raised by the source (timeouts); wrap everything else.
    fn source_error(&self, err: anyhow::Error) -> IndexError {
        match err.downcast::<IndexError>() {
            Ok(err) => err,
            Err(err) => IndexError::remote(&self.name, err),
        }
    }
}

#[async_trait]
impl<S: RefSource> Package for VcsPackage<S> {
    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(skip(self), fields(package = %self.name))]
    async fn links(&self) -> Result<Vec<Link>, IndexError> {
        let tags = self.source.tags().await.map_err(|e| self.source_error(e))?;
        let branches = self
            .source
            .branches()
            .await
            .map_err(|e| self.source_error(e))?;

        Ok(resolve_links(
            &self.name,
            &self.template,
            &self.source.location_fields(),
            self.strip_v,
            &tags,
            &branches,
        )
        .links)
    }
}
