//! Access to Maven-layout repositories, remote (http/https) or local
//! (`file://` URLs and plain paths).

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use url::Url;

use super::resolver::{DescriptorFetcher, FetchedDescriptor};
use crate::config::Config;
use crate::http::HttpClient;
use crate::package::Descriptor;
use crate::util::{latest_modification, mirror, verify_checksum, ChecksumType};
use crate::{DepotError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum RepositoryRoot {
    Remote(String),
    Local(PathBuf),
}

impl RepositoryRoot {
    fn parse(repository: &str) -> Self {
        if repository.starts_with("file://") {
            if let Some(path) = Url::parse(repository).ok().and_then(|u| u.to_file_path().ok()) {
                return RepositoryRoot::Local(path);
            }
        }
        if repository.contains("://") {
            RepositoryRoot::Remote(repository.trim_end_matches('/').to_string())
        } else {
            RepositoryRoot::Local(PathBuf::from(repository))
        }
    }

    fn describe(&self, relative: &str) -> String {
        match self {
            RepositoryRoot::Remote(base) => format!("{}/{}", base, relative),
            RepositoryRoot::Local(root) => root.join(relative).display().to_string(),
        }
    }
}

/// An ordered list of repositories plus an on-disk descriptor cache.
pub struct MavenRepository {
    roots: Vec<RepositoryRoot>,
    http: Arc<HttpClient>,
    metadata_dir: PathBuf,
    verify_checksums: bool,
    descriptors: Mutex<HashMap<String, FetchedDescriptor>>,
}

impl MavenRepository {
    pub fn new(repositories: &[String], http: Arc<HttpClient>, metadata_dir: PathBuf) -> Self {
        Self {
            roots: repositories.iter().map(|r| RepositoryRoot::parse(r)).collect(),
            http,
            metadata_dir,
            verify_checksums: true,
            descriptors: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &Config, http: Arc<HttpClient>) -> Self {
        Self::new(&config.get_repositories(), http, config.get_metadata_dir())
            .with_checksums(config.verify_checksums)
    }

    pub fn with_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    /// Text of `relative` in `root`; `None` when the repository does not have it.
    fn read_text(&self, root: &RepositoryRoot, relative: &str) -> Result<Option<String>> {
        match root {
            RepositoryRoot::Local(dir) => {
                let path = dir.join(relative);
                if path.is_file() {
                    Ok(Some(fs::read_to_string(path)?))
                } else {
                    Ok(None)
                }
            }
            RepositoryRoot::Remote(_) => {
                let url = root.describe(relative);
                match self.http.get_text(&url) {
                    Ok(text) => Ok(Some(text)),
                    Err(e) if e.is_not_found() => Ok(None),
                    Err(e) => Err(DepotError::DownloadFailed {
                        package: relative.to_string(),
                        reason: e.to_string(),
                    }),
                }
            }
        }
    }

    /// Copy or download `relative` from the first repository that has it.
    ///
    /// Published checksum files are checked when present; a mismatch removes
    /// the file and fails.
    pub fn fetch_artifact(&self, package: &str, relative: &str, dest: &Path) -> Result<()> {
        let mut last_error = None;

        for root in &self.roots {
            let fetched = match root {
                RepositoryRoot::Local(dir) => {
                    let path = dir.join(relative);
                    if !path.is_file() {
                        continue;
                    }
                    mirror(&path, dest)
                }
                RepositoryRoot::Remote(_) => {
                    let url = root.describe(relative);
                    log::debug!("Downloading {}", url);
                    match self.http.download(&url, dest) {
                        Ok(_) => Ok(()),
                        Err(e) if e.is_not_found() => continue,
                        Err(e) => Err(DepotError::DownloadFailed {
                            package: package.to_string(),
                            reason: e.to_string(),
                        }),
                    }
                }
            };

            match fetched.and_then(|_| self.verify(root, relative, dest, package)) {
                Ok(()) => return Ok(()),
                Err(e @ DepotError::ChecksumMismatch { .. }) => return Err(e),
                Err(e) => {
                    log::debug!("{} from {}: {}", package, root.describe(relative), e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DepotError::PackageNotFound {
            name: package.to_string(),
        }))
    }

    fn verify(&self, root: &RepositoryRoot, relative: &str, file: &Path, package: &str) -> Result<()> {
        if !self.verify_checksums {
            return Ok(());
        }

        for checksum_type in ChecksumType::ALL {
            let side = format!("{}.{}", relative, checksum_type.extension());
            let Ok(Some(expected)) = self.read_text(root, &side) else {
                continue;
            };
            if verify_checksum(file, &expected, checksum_type)? {
                return Ok(());
            }
            let _ = fs::remove_file(file);
            return Err(DepotError::ChecksumMismatch {
                package: package.to_string(),
            });
        }

        log::debug!("No checksum published for {}", root.describe(relative));
        Ok(())
    }

    /// Upstream modification time of `relative` in the first repository
    /// that reports one.
    pub fn last_modified(&self, relative: &str) -> Option<DateTime<Utc>> {
        self.roots.iter().find_map(|root| match root {
            RepositoryRoot::Local(dir) => latest_modification(&dir.join(relative)),
            RepositoryRoot::Remote(_) => self.http.last_modified(&root.describe(relative)),
        })
    }

    fn cache_path(&self, relative: &str) -> PathBuf {
        self.metadata_dir.join(relative)
    }
}

impl DescriptorFetcher for MavenRepository {
    fn fetch_descriptor(&self, coordinate: &Descriptor) -> Result<FetchedDescriptor> {
        let relative = coordinate.pom_path()?;
        let snapshot = coordinate.is_snapshot();

        if let Ok(cache) = self.descriptors.lock() {
            if let Some(found) = cache.get(&relative) {
                return Ok(found.clone());
            }
        }

        let cached_file = self.cache_path(&relative);
        let mut found = None;
        if !snapshot && cached_file.is_file() {
            found = Some(FetchedDescriptor {
                text: fs::read_to_string(&cached_file)?,
                location: cached_file.display().to_string(),
            });
        }

        if found.is_none() {
            let mut last_error = None;
            for root in &self.roots {
                match self.read_text(root, &relative) {
                    Ok(Some(text)) => {
                        found = Some(FetchedDescriptor {
                            text,
                            location: root.describe(&relative),
                        });
                        break;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        log::debug!("{}: {}", root.describe(&relative), e);
                        last_error = Some(e);
                    }
                }
            }

            let fetched = match (found, last_error) {
                (Some(fetched), _) => fetched,
                (None, Some(e)) => return Err(e),
                (None, None) => {
                    return Err(DepotError::PackageNotFound {
                        name: coordinate.to_string(),
                    })
                }
            };

            if !snapshot {
                if let Some(parent) = cached_file.parent() {
                    if let Err(e) = fs::create_dir_all(parent)
                        .and_then(|_| fs::write(&cached_file, &fetched.text))
                    {
                        log::debug!("Could not cache {}: {}", relative, e);
                    }
                }
            }
            found = Some(fetched);
        }

        let fetched = found.ok_or_else(|| DepotError::PackageNotFound {
            name: coordinate.to_string(),
        })?;
        if let Ok(mut cache) = self.descriptors.lock() {
            cache.insert(relative, fetched.clone());
        }
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::compute_checksum;
    use tempfile::TempDir;

    fn publish(root: &Path, relative: &str, contents: &str) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    fn repository(temp: &TempDir, repos: &[&Path]) -> MavenRepository {
        let repos: Vec<String> = repos.iter().map(|p| p.display().to_string()).collect();
        MavenRepository::new(
            &repos,
            Arc::new(HttpClient::new().unwrap()),
            temp.path().join("metadata"),
        )
    }

    #[test]
    fn test_parse_roots() {
        assert_eq!(
            RepositoryRoot::parse("https://repo.example.com/maven2/"),
            RepositoryRoot::Remote("https://repo.example.com/maven2".to_string())
        );
        assert_eq!(
            RepositoryRoot::parse("/srv/m2"),
            RepositoryRoot::Local(PathBuf::from("/srv/m2"))
        );
        assert_eq!(
            RepositoryRoot::parse("file:///srv/m2"),
            RepositoryRoot::Local(PathBuf::from("/srv/m2"))
        );
    }

    #[test]
    fn test_descriptor_from_second_repository_is_cached() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("first");
        let second = temp.path().join("second");
        fs::create_dir_all(&first).unwrap();
        publish(&second, "org/x/x/1.0/x-1.0.pom", "<project/>");

        let repo = repository(&temp, &[&first, &second]);
        let coordinate = Descriptor::parse("org.x:x:1.0").unwrap();
        let fetched = repo.fetch_descriptor(&coordinate).unwrap();

        assert_eq!(fetched.text, "<project/>");
        assert!(fetched.location.contains("second"));
        assert!(temp.path().join("metadata/org/x/x/1.0/x-1.0.pom").is_file());

        let missing = Descriptor::parse("org.x:y:1.0").unwrap();
        assert!(matches!(
            repo.fetch_descriptor(&missing).unwrap_err(),
            DepotError::PackageNotFound { .. }
        ));
    }

    #[test]
    fn test_artifact_checksum() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("repo");
        let jar = publish(&root, "org/x/x/1.0/x-1.0.jar", "jar bytes");
        let sha1 = compute_checksum(&jar, ChecksumType::Sha1).unwrap();
        publish(&root, "org/x/x/1.0/x-1.0.jar.sha1", &format!("{}  x-1.0.jar\n", sha1));

        let repo = repository(&temp, &[&root]);
        let dest = temp.path().join("out/x-1.0.jar");
        repo.fetch_artifact("org.x:x", "org/x/x/1.0/x-1.0.jar", &dest).unwrap();
        assert!(dest.is_file());

        publish(&root, "org/x/x/1.0/x-1.0.jar.sha1", "0000000000000000000000000000000000000000");
        let dest = temp.path().join("bad/x-1.0.jar");
        let err = repo
            .fetch_artifact("org.x:x", "org/x/x/1.0/x-1.0.jar", &dest)
            .unwrap_err();
        assert!(matches!(err, DepotError::ChecksumMismatch { .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn test_missing_artifact() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("repo");
        fs::create_dir_all(&root).unwrap();

        let repo = repository(&temp, &[&root]);
        let err = repo
            .fetch_artifact("org.x:x", "org/x/x/1.0/x-1.0.jar", &temp.path().join("x.jar"))
            .unwrap_err();
        assert!(matches!(err, DepotError::PackageNotFound { .. }));
    }
}
