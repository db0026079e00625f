use serde::{Deserialize, Serialize};

use super::context::ContextId;
use super::descriptor::Descriptor;
use super::package::PackageId;
use crate::{DepotError, Result};

/// Fragment that asks a backend to unpack the fetched file.
pub const UNZIP_FRAGMENT: &str = "unzip";

/// A candidate location for a package.
///
/// Two sources are equal when their locators are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    /// Scheme of the backend that fetches this source
    pub scheme: String,

    /// Raw locator, `<scheme>://<path>`
    pub locator: String,

    /// Unpack the fetched archive into the install directory
    #[serde(default)]
    pub unzip: bool,

    /// Coordinates, for artifact-repository backends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<Descriptor>,

    /// Exclusions applying to everything below this source
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusions: Vec<Descriptor>,

    #[serde(skip)]
    pub package: Option<PackageId>,

    #[serde(skip)]
    pub context: Option<ContextId>,

    /// Depth of `context`, kept here so ordering needs no arena lookup
    #[serde(skip)]
    pub depth: usize,
}

impl Source {
    pub fn new(scheme: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            locator: locator.into(),
            unzip: false,
            descriptor: None,
            exclusions: Vec::new(),
            package: None,
            context: None,
            depth: 0,
        }
    }

    pub fn with_unzip(mut self, unzip: bool) -> Self {
        self.unzip = unzip;
        self
    }

    pub fn with_descriptor(mut self, descriptor: Descriptor) -> Self {
        self.descriptor = Some(descriptor);
        self
    }

    pub fn with_exclusions(mut self, exclusions: Vec<Descriptor>) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Scheme-specific part of the locator, without fragment.
    pub fn path(&self) -> &str {
        let (_, rest) = split_scheme(&self.locator).unwrap_or(("", &self.locator));
        split_fragment(rest).0
    }

    /// Locator fragment (`#...`), if any.
    pub fn fragment(&self) -> Option<&str> {
        let (_, rest) = split_scheme(&self.locator).unwrap_or(("", &self.locator));
        split_fragment(rest).1
    }

    /// Coordinates or an error for backends that need them.
    pub fn require_descriptor(&self) -> Result<&Descriptor> {
        self.descriptor
            .as_ref()
            .ok_or_else(|| DepotError::InvalidLocator(format!("{} has no coordinates", self.locator)))
    }
}

impl PartialEq for Source {
    fn eq(&self, other: &Self) -> bool {
        self.locator == other.locator
    }
}

impl Eq for Source {}

/// Split `scheme://rest` into its two halves.
pub fn split_scheme(locator: &str) -> Result<(&str, &str)> {
    match locator.split_once("://") {
        Some((scheme, rest)) if !scheme.is_empty() => Ok((scheme, rest)),
        _ => Err(DepotError::InvalidLocator(format!(
            "{} is not of the form <scheme>://<path>",
            locator
        ))),
    }
}

/// Split `path#fragment`.
pub fn split_fragment(rest: &str) -> (&str, Option<&str>) {
    match rest.split_once('#') {
        Some((path, fragment)) if !fragment.is_empty() => (path, Some(fragment)),
        Some((path, _)) => (path, None),
        None => (rest, None),
    }
}

/// Final path segment of a locator path, without a trailing `.git`.
pub fn last_segment(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    let segment = trimmed
        .rsplit(|c: char| c == '/' || c == '\\' || c == ':')
        .next()
        .filter(|s| !s.is_empty())?;
    Some(segment.strip_suffix(".git").unwrap_or(segment))
}
