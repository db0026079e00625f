//! Maven-style repository backends.
//!
//! `maven://group:artifact:version[:classifier][@type][#unzip]` fetches the
//! artifact from the configured repositories and reads its descriptor for
//! dependencies. `maven-only-dependencies://…` reads the descriptor only.
//! `maven-git://group/artifact/version[#ref]` builds from a source checkout
//! (see [`MavenVcsManager`]).

mod pom;
mod repository;
mod resolver;
mod vcs;

pub use pom::{DocId, DocumentStore, ParentRef, PomDocument, RawDependency};
pub use repository::MavenRepository;
pub use resolver::{DescriptorFetcher, FetchedDescriptor, PomResolver};
pub use vcs::{MavenVcsManager, MAVEN_GIT_SCHEME};

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::traits::{DependencyRequest, InstallOutcome, InstallRequest, Manager, PackageSpec};
use crate::package::{split_fragment, split_scheme, Descriptor, Source, UNZIP_FRAGMENT};
use crate::util::{ArchiveExtractor, ArchiveType};
use crate::{DepotError, Result};

pub const MAVEN_SCHEME: &str = "maven";
pub const MAVEN_ONLY_DEPENDENCIES_SCHEME: &str = "maven-only-dependencies";

/// Packaging of descriptors that have no artifact of their own.
const POM_PACKAGING: &str = "pom";

pub struct MavenManager {
    repository: Arc<MavenRepository>,
}

impl MavenManager {
    pub fn new(repository: Arc<MavenRepository>) -> Self {
        Self { repository }
    }

    /// Dependencies declared by `descriptor`, as edges for the repository
    /// system, plus the descriptor's own packaging.
    fn describe(
        &self,
        descriptor: &Descriptor,
        request: &InstallRequest<'_>,
    ) -> Result<(InstallOutcome, Option<String>)> {
        let mut resolver = PomResolver::new(&*self.repository);
        let doc = match resolver.load(descriptor) {
            Ok(doc) => doc,
            Err(DepotError::PackageNotFound { .. }) => {
                let outcome = InstallOutcome {
                    warnings: vec![format!(
                        "No descriptor for {}; assuming no dependencies",
                        descriptor
                    )],
                    ..InstallOutcome::default()
                };
                return Ok((outcome, None));
            }
            Err(e) => return Err(e),
        };

        let packaging = resolver.coordinates(doc)?.packaging;
        let dependencies = resolver
            .dependencies(doc, request.scopes, false)?
            .into_iter()
            .map(|dep| DependencyRequest::for_descriptor(MAVEN_SCHEME, dep))
            .collect();

        let outcome = InstallOutcome {
            dependencies,
            warnings: resolver.take_warnings(),
            ..InstallOutcome::default()
        };
        Ok((outcome, packaging))
    }
}

impl Manager for MavenManager {
    fn schemes(&self) -> Vec<&'static str> {
        vec![MAVEN_SCHEME, MAVEN_ONLY_DEPENDENCIES_SCHEME]
    }

    fn create_package(&self, locator: &str) -> Result<PackageSpec> {
        let (scheme, rest) = split_scheme(locator)?;
        let (coordinate, fragment) = split_fragment(rest);
        let descriptor = Descriptor::parse(coordinate)?;

        let source = Source::new(scheme, locator)
            .with_unzip(fragment == Some(UNZIP_FRAGMENT))
            .with_descriptor(descriptor.clone());
        Ok(PackageSpec::new(descriptor.package_name(), source))
    }

    fn do_install(&self, request: &InstallRequest<'_>) -> Result<InstallOutcome> {
        let descriptor = request.source.require_descriptor()?;
        descriptor.require_version()?;

        let (mut outcome, packaging) = self.describe(descriptor, request)?;
        if request.source.scheme == MAVEN_ONLY_DEPENDENCIES_SCHEME {
            return Ok(outcome);
        }

        let mut artifact = descriptor.clone();
        if artifact.packaging.is_none() {
            artifact.packaging = packaging;
        }
        if artifact.packaging() == POM_PACKAGING {
            return Ok(outcome);
        }

        let file = request
            .install_dir
            .join(artifact.file_name(artifact.extension())?);
        self.repository
            .fetch_artifact(request.name, &artifact.artifact_path()?, &file)?;

        if request.source.unzip {
            ArchiveExtractor::extract_with_type(&file, &request.install_dir, ArchiveType::Zip)?;
            outcome.classpath.push(request.install_dir.clone());
        } else {
            outcome.classpath.push(file);
        }
        Ok(outcome)
    }

    /// Released versions never change; snapshots report the repository's time.
    fn last_modified(&self, source: &Source) -> Option<DateTime<Utc>> {
        let descriptor = source.descriptor.as_ref()?;
        if !descriptor.is_snapshot() {
            return None;
        }
        self.repository.last_modified(&descriptor.pom_path().ok()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpClient;
    use crate::package::ScopeSet;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn publish(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn manager(temp: &TempDir) -> MavenManager {
        let repo = MavenRepository::new(
            &[temp.path().join("repo").display().to_string()],
            Arc::new(HttpClient::new().unwrap()),
            temp.path().join("metadata"),
        );
        MavenManager::new(Arc::new(repo))
    }

    #[test]
    fn test_create_package() {
        let temp = TempDir::new().unwrap();
        let spec = manager(&temp)
            .create_package("maven://org.lwjgl:lwjgl:3.3.1:natives-linux#unzip")
            .unwrap();

        assert_eq!(spec.name, "org.lwjgl:lwjgl:natives-linux");
        assert!(spec.source.unzip);
        let descriptor = spec.source.descriptor.unwrap();
        assert_eq!(descriptor.classifier.as_deref(), Some("natives-linux"));

        assert!(manager(&temp).create_package("maven://nonsense").is_err());
    }

    #[test]
    fn test_install_jar_with_dependencies() {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("repo");
        publish(
            &repo,
            "org/app/app/1.0/app-1.0.pom",
            r#"<project><groupId>org.app</groupId><artifactId>app</artifactId><version>1.0</version>
                <dependencies>
                    <dependency><groupId>org.lib</groupId><artifactId>lib</artifactId><version>2.0</version></dependency>
                </dependencies></project>"#,
        );
        publish(&repo, "org/app/app/1.0/app-1.0.jar", "jar");

        let manager = manager(&temp);
        let spec = manager.create_package("maven://org.app:app:1.0").unwrap();
        let scopes = ScopeSet::default();
        let request = InstallRequest {
            name: &spec.name,
            source: &spec.source,
            install_dir: temp.path().join("out"),
            scopes: &scopes,
        };

        let outcome = manager.do_install(&request).unwrap();
        assert_eq!(outcome.classpath, vec![temp.path().join("out/app-1.0.jar")]);
        assert_eq!(outcome.dependencies.len(), 1);
        assert_eq!(outcome.dependencies[0].locator, "maven://org.lib:lib:2.0");
        assert!(manager.last_modified(&spec.source).is_none());
    }

    #[test]
    fn test_missing_descriptor_and_pom_packaging() {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("repo");
        publish(&repo, "org/bare/bare/1.0/bare-1.0.jar", "jar");
        publish(
            &repo,
            "org/bom/bom/1.0/bom-1.0.pom",
            r#"<project><groupId>org.bom</groupId><artifactId>bom</artifactId><version>1.0</version>
                <packaging>pom</packaging></project>"#,
        );

        let manager = manager(&temp);
        let scopes = ScopeSet::default();

        let bare = manager.create_package("maven://org.bare:bare:1.0").unwrap();
        let outcome = manager
            .do_install(&InstallRequest {
                name: &bare.name,
                source: &bare.source,
                install_dir: temp.path().join("bare"),
                scopes: &scopes,
            })
            .unwrap();
        assert!(outcome.dependencies.is_empty());
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.classpath.len(), 1);

        let bom = manager.create_package("maven://org.bom:bom:1.0").unwrap();
        let outcome = manager
            .do_install(&InstallRequest {
                name: &bom.name,
                source: &bom.source,
                install_dir: temp.path().join("bom"),
                scopes: &scopes,
            })
            .unwrap();
        assert!(outcome.classpath.is_empty());
    }

    #[test]
    fn test_missing_version() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp);
        let spec = manager.create_package("maven://org.x:x").unwrap();
        let scopes = ScopeSet::default();

        let err = manager
            .do_install(&InstallRequest {
                name: &spec.name,
                source: &spec.source,
                install_dir: temp.path().join("out"),
                scopes: &scopes,
            })
            .unwrap_err();
        assert!(matches!(err, DepotError::VersionNotFound(_)));
    }
}
