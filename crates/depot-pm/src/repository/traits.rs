//! Backend contract shared by every repository manager.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::package::{Descriptor, ScopeSet, Source};
use crate::util::sanitize_name;
use crate::Result;

/// What a manager makes of a locator: the logical name and one candidate source.
#[derive(Debug, Clone)]
pub struct PackageSpec {
    pub name: String,
    pub source: Source,
}

impl PackageSpec {
    pub fn new(name: impl Into<String>, source: Source) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }
}

/// Everything a backend needs to fetch one source.
#[derive(Debug, Clone)]
pub struct InstallRequest<'a> {
    pub name: &'a str,
    pub source: &'a Source,
    pub install_dir: PathBuf,
    /// Scopes requested for the whole pass
    pub scopes: &'a ScopeSet,
}

/// An edge discovered while installing a package.
///
/// The request is stored verbatim in the tag file, so a package that is
/// satisfied from its tag replays the same edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyRequest {
    pub locator: String,

    /// Coordinates of the dependency, when the backend knows them. Carries
    /// scope and optional flag for edge filtering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<Descriptor>,

    /// Exclusions declared on this edge
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusions: Vec<Descriptor>,
}

impl DependencyRequest {
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            descriptor: None,
            exclusions: Vec::new(),
        }
    }

    /// Edge to a coordinate served by `scheme`; the edge's exclusions come
    /// from the descriptor.
    pub fn for_descriptor(scheme: &str, descriptor: Descriptor) -> Self {
        Self {
            locator: format!("{}://{}", scheme, descriptor),
            exclusions: descriptor.exclusions.clone(),
            descriptor: Some(descriptor),
        }
    }
}

/// A package installed as part of another one (e.g. a module of a source tree).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubPackage {
    pub name: String,
    pub locator: String,
    pub path: PathBuf,
    #[serde(default)]
    pub classpath: Vec<PathBuf>,
    /// Edges of the module itself, replayed when it is installed on its own
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyRequest>,
}

/// Result of a successful fetch.
#[derive(Debug, Clone, Default)]
pub struct InstallOutcome {
    pub dependencies: Vec<DependencyRequest>,
    pub classpath: Vec<PathBuf>,
    pub sub_packages: Vec<SubPackage>,
    /// Non-fatal problems to report to the user
    pub warnings: Vec<String>,
}

impl InstallOutcome {
    /// Outcome whose only classpath entry is `path`.
    pub fn with_classpath(path: PathBuf) -> Self {
        Self {
            classpath: vec![path],
            ..Self::default()
        }
    }
}

/// A fetching backend for one or more locator schemes.
///
/// Managers only translate locators and fetch; merging candidate sources
/// and choosing between them is the repository system's job.
pub trait Manager: Send + Sync {
    /// Locator schemes served by this manager
    fn schemes(&self) -> Vec<&'static str>;

    /// Parse a locator into a package name and source.
    fn create_package(&self, locator: &str) -> Result<PackageSpec>;

    /// Install directory for `name` fetched from `source`.
    fn install_path(&self, root: &Path, name: &str, source: &Source) -> PathBuf {
        let dir = root.join(sanitize_name(name));
        match source.descriptor.as_ref().and_then(|d| d.version.as_deref()) {
            Some(version) => dir.join(sanitize_name(version)),
            None => dir,
        }
    }

    /// Fetch the source into `request.install_dir`.
    fn do_install(&self, request: &InstallRequest<'_>) -> Result<InstallOutcome>;

    /// Modification time of the upstream source; `None` when unknown, in
    /// which case the installed copy is considered current.
    fn last_modified(&self, source: &Source) -> Option<DateTime<Utc>>;

    /// Refresh an installed source in place.
    fn update(&self, request: &InstallRequest<'_>) -> Result<InstallOutcome> {
        self.do_install(request)
    }
}
