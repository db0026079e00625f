//! Generic download backend: `url://<url>[#unzip]`, `http(s)://…`, `file://…`.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

use super::traits::{InstallOutcome, InstallRequest, Manager, PackageSpec};
use crate::http::HttpClient;
use crate::package::{split_fragment, split_scheme, Source, UNZIP_FRAGMENT};
use crate::util::{latest_modification, mirror, ArchiveExtractor};
use crate::{DepotError, Result};

pub const URL_SCHEME: &str = "url";

pub struct UrlManager {
    http: Arc<HttpClient>,
}

impl UrlManager {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    /// The URL a locator points at, without fragment.
    pub fn target_url(locator: &str) -> Result<Url> {
        let (scheme, rest) = split_scheme(locator)?;
        let without_fragment = match locator.split_once('#') {
            Some((head, _)) => head,
            None => locator,
        };
        let raw = if scheme == URL_SCHEME {
            split_fragment(rest).0
        } else {
            without_fragment
        };

        let url = Url::parse(raw)
            .map_err(|e| DepotError::InvalidLocator(format!("{}: {}", locator, e)))?;
        match url.scheme() {
            "http" | "https" | "file" => Ok(url),
            other => Err(DepotError::InvalidLocator(format!(
                "{}: unsupported URL scheme '{}'",
                locator, other
            ))),
        }
    }

    fn local_file(url: &Url) -> Result<PathBuf> {
        url.to_file_path()
            .map_err(|_| DepotError::InvalidLocator(url.to_string()))
    }

    fn fetch(&self, url: &Url, dest: &Path, package: &str) -> Result<()> {
        if url.scheme() == "file" {
            let path = Self::local_file(url)?;
            if !path.exists() {
                return Err(DepotError::DownloadFailed {
                    package: package.to_string(),
                    reason: format!("{} does not exist", path.display()),
                });
            }
            return mirror(&path, dest);
        }

        log::debug!("Downloading {}", url);
        self.http
            .download(url.as_str(), dest)
            .map_err(|e| DepotError::DownloadFailed {
                package: package.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

/// Last non-empty path segment of a URL.
fn file_name(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
}

impl Manager for UrlManager {
    fn schemes(&self) -> Vec<&'static str> {
        vec![URL_SCHEME, "http", "https", "file"]
    }

    fn create_package(&self, locator: &str) -> Result<PackageSpec> {
        let url = Self::target_url(locator)?;
        let name = file_name(&url).ok_or_else(|| DepotError::InvalidLocator(locator.to_string()))?;
        let (scheme, rest) = split_scheme(locator)?;
        let unzip = split_fragment(rest).1 == Some(UNZIP_FRAGMENT);

        Ok(PackageSpec::new(name, Source::new(scheme, locator).with_unzip(unzip)))
    }

    fn do_install(&self, request: &InstallRequest<'_>) -> Result<InstallOutcome> {
        let url = Self::target_url(&request.source.locator)?;
        let name = file_name(&url)
            .ok_or_else(|| DepotError::InvalidLocator(request.source.locator.clone()))?;
        let install_dir = &request.install_dir;

        if request.source.unzip {
            let scratch = tempfile::tempdir()?;
            let archive = scratch.path().join(&name);
            self.fetch(&url, &archive, request.name)?;
            ArchiveExtractor::extract(&archive, install_dir)?;
            return Ok(InstallOutcome::with_classpath(install_dir.clone()));
        }

        let target = install_dir.join(&name);
        self.fetch(&url, &target, request.name)?;
        Ok(InstallOutcome::with_classpath(target))
    }

    fn last_modified(&self, source: &Source) -> Option<DateTime<Utc>> {
        let url = Self::target_url(&source.locator).ok()?;
        if url.scheme() == "file" {
            latest_modification(&Self::local_file(&url).ok()?)
        } else {
            self.http.last_modified(url.as_str())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::ScopeSet;
    use tempfile::TempDir;

    fn manager() -> UrlManager {
        UrlManager::new(Arc::new(HttpClient::new().unwrap()))
    }

    #[test]
    fn test_target_url_forms() {
        assert_eq!(
            UrlManager::target_url("url://https://example.com/dl/tool.jar#unzip")
                .unwrap()
                .as_str(),
            "https://example.com/dl/tool.jar"
        );
        assert_eq!(
            UrlManager::target_url("https://example.com/dl/tool.jar").unwrap().as_str(),
            "https://example.com/dl/tool.jar"
        );
        assert!(UrlManager::target_url("url://ftp://example.com/x").is_err());
    }

    #[test]
    fn test_create_package() {
        let spec = manager()
            .create_package("url://https://example.com/dl/natives.zip#unzip")
            .unwrap();
        assert_eq!(spec.name, "natives.zip");
        assert_eq!(spec.source.scheme, "url");
        assert!(spec.source.unzip);
    }

    #[test]
    fn test_install_file_url() {
        let temp = TempDir::new().unwrap();
        let lib = temp.path().join("tool.jar");
        std::fs::write(&lib, "jar").unwrap();

        let manager = manager();
        let locator = Url::from_file_path(&lib).unwrap().to_string();
        let spec = manager.create_package(&locator).unwrap();
        let scopes = ScopeSet::default();
        let request = InstallRequest {
            name: &spec.name,
            source: &spec.source,
            install_dir: temp.path().join("out"),
            scopes: &scopes,
        };

        let outcome = manager.do_install(&request).unwrap();
        assert_eq!(outcome.classpath, vec![temp.path().join("out/tool.jar")]);
        assert!(manager.last_modified(&spec.source).is_some());
    }
}
