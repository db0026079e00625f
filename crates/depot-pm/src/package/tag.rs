//! Tag files: persisted installation state of a package.
//!
//! A tag file is written after a successful install and read on the next
//! run to decide whether the package must be fetched again. It also records
//! the dependency requests and classpath of the install, so an unchanged
//! package can rejoin the graph without touching its backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::descriptor::ScopeSet;
use crate::repository::{DependencyRequest, SubPackage};
use crate::util::sanitize_name;
use crate::Result;

const TAG_EXTENSION: &str = "tag";

/// Snapshot of an installed package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagFile {
    pub name: String,

    /// Locator of the source the package was installed from
    pub locator: String,

    #[serde(rename = "installed-time")]
    pub installed_time: DateTime<Utc>,

    #[serde(rename = "install-path", default, skip_serializing_if = "Option::is_none")]
    pub install_path: Option<PathBuf>,

    #[serde(default)]
    pub classpath: Vec<PathBuf>,

    #[serde(default)]
    pub dependencies: Vec<DependencyRequest>,

    #[serde(rename = "sub-packages", default)]
    pub sub_packages: Vec<SubPackage>,

    /// Scopes the dependencies were resolved for
    #[serde(default)]
    pub scopes: ScopeSet,
}

/// Directory of tag files, one per package name
#[derive(Debug, Clone)]
pub struct TagStore {
    dir: PathBuf,
}

impl TagStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", sanitize_name(name), TAG_EXTENSION))
    }

    /// Load the tag of `name`; a missing file is `None`.
    ///
    /// An unreadable tag is treated as missing so the package is refetched.
    pub fn load(&self, name: &str) -> Option<TagFile> {
        let path = self.path_for(name);
        let contents = match fs::read(&path) {
            Ok(contents) => contents,
            Err(_) => return None,
        };

        match serde_json::from_slice::<TagFile>(&contents) {
            Ok(tag) if tag.name == name => Some(tag),
            Ok(_) => {
                log::warn!("Ignoring tag file {} written for another package", path.display());
                None
            }
            Err(e) => {
                log::warn!("Ignoring corrupt tag file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Write `tag` atomically.
    pub fn save(&self, tag: &TagFile) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut file = tempfile::NamedTempFile::new_in(&self.dir)?;
        file.write_all(&serde_json::to_vec_pretty(tag)?)?;
        file.persist(self.path_for(&tag.name))
            .map_err(|e| e.error)?;
        Ok(())
    }

    /// Delete the tag of `name`, forcing a re-check on the next run.
    pub fn remove(&self, name: &str) -> Result<()> {
        let path = self.path_for(name);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
