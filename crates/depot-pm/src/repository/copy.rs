//! Copy backend: `copy://<path>[#unzip]` and `copy://<host>:<path>[#unzip]`.
//!
//! Local files and directories are mirrored into the install directory.
//! Remote paths are fetched with `scp -r` into a scratch directory first.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::process::Command;

use super::traits::{InstallOutcome, InstallRequest, Manager, PackageSpec};
use crate::package::{last_segment, split_fragment, split_scheme, Source, UNZIP_FRAGMENT};
use crate::util::{latest_modification, mirror, ArchiveExtractor};
use crate::{DepotError, Result};

pub const COPY_SCHEME: &str = "copy";

/// Where a copy locator points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyLocation {
    Local(PathBuf),
    Remote { host: String, path: String },
}

impl CopyLocation {
    pub fn parse(path: &str) -> Self {
        if let Some((host, remote_path)) = path.split_once(':') {
            let looks_local = path.starts_with('/')
                || path.starts_with('.')
                || path.starts_with('~')
                // Windows drive letter
                || (host.len() == 1 && host.chars().all(|c| c.is_ascii_alphabetic()));
            if !looks_local && !host.is_empty() && !remote_path.is_empty() {
                return CopyLocation::Remote {
                    host: host.to_string(),
                    path: remote_path.to_string(),
                };
            }
        }
        CopyLocation::Local(PathBuf::from(shellexpand::tilde(path).as_ref()))
    }
}

#[derive(Debug, Default)]
pub struct CopyManager;

impl CopyManager {
    pub fn new() -> Self {
        Self
    }

    fn scp(host: &str, path: &str, dest: &Path) -> Result<()> {
        let remote = format!("{}:{}", host, path);
        let command = format!("scp -r {} {}", remote, dest.display());
        log::debug!("Running {}", command);

        let output = Command::new("scp")
            .arg("-r")
            .arg("-q")
            .arg(&remote)
            .arg(dest)
            .output()
            .map_err(|e| DepotError::CommandFailed {
                command: command.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(DepotError::CommandFailed {
                command,
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

impl Manager for CopyManager {
    fn schemes(&self) -> Vec<&'static str> {
        vec![COPY_SCHEME]
    }

    fn create_package(&self, locator: &str) -> Result<PackageSpec> {
        let (_, rest) = split_scheme(locator)?;
        let (path, fragment) = split_fragment(rest);
        let name = last_segment(path)
            .ok_or_else(|| DepotError::InvalidLocator(locator.to_string()))?;

        let source = Source::new(COPY_SCHEME, locator).with_unzip(fragment == Some(UNZIP_FRAGMENT));
        Ok(PackageSpec::new(name, source))
    }

    fn do_install(&self, request: &InstallRequest<'_>) -> Result<InstallOutcome> {
        let path = request.source.path();
        let file_name = last_segment(path)
            .ok_or_else(|| DepotError::InvalidLocator(request.source.locator.clone()))?;

        // Keeps the scratch directory alive until the copy is done
        let _scratch;
        let local = match CopyLocation::parse(path) {
            CopyLocation::Local(local) => local,
            CopyLocation::Remote { host, path } => {
                let dir = tempfile::tempdir()?;
                let fetched = dir.path().join(file_name);
                _scratch = dir;
                Self::scp(&host, &path, &fetched)?;
                fetched
            }
        };

        if !local.exists() {
            return Err(DepotError::DownloadFailed {
                package: request.name.to_string(),
                reason: format!("{} does not exist", local.display()),
            });
        }

        let install_dir = &request.install_dir;
        if request.source.unzip && local.is_file() {
            ArchiveExtractor::extract(&local, install_dir)?;
            return Ok(InstallOutcome::with_classpath(install_dir.clone()));
        }

        if local.is_dir() {
            mirror(&local, install_dir)?;
            Ok(InstallOutcome::with_classpath(install_dir.clone()))
        } else {
            let target = install_dir.join(file_name);
            mirror(&local, &target)?;
            Ok(InstallOutcome::with_classpath(target))
        }
    }

    fn last_modified(&self, source: &Source) -> Option<DateTime<Utc>> {
        match CopyLocation::parse(source.path()) {
            CopyLocation::Local(path) => latest_modification(&path),
            CopyLocation::Remote { .. } => None,
        }
    }
}
