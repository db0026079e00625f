//! Source-checkout backend: `maven-git://group/artifact/version[#ref]`.
//!
//! The checkout itself is delegated to another manager (git); this backend
//! only turns coordinates into a remote and reads the checked-out descriptor
//! tree. Modules of the tree become sub-packages of the root package.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use super::repository::MavenRepository;
use super::resolver::PomResolver;
use super::{MAVEN_SCHEME, POM_PACKAGING};
use crate::package::{split_fragment, split_scheme, Descriptor, Source};
use crate::repository::{
    DependencyRequest, InstallOutcome, InstallRequest, Manager, PackageSpec, SubPackage,
    GIT_SCHEME,
};
use crate::{DepotError, Result};

pub const MAVEN_GIT_SCHEME: &str = "maven-git";

const DESCRIPTOR_FILE: &str = "pom.xml";
const CLASSES_DIR: &str = "target/classes";

pub struct MavenVcsManager {
    inner: Arc<dyn Manager>,
    repository: Arc<MavenRepository>,
    url_template: String,
    include_modules: bool,
}

impl MavenVcsManager {
    /// `url_template` may use `{groupId}`, `{artifactId}` and `{groupPath}`.
    pub fn new(
        inner: Arc<dyn Manager>,
        repository: Arc<MavenRepository>,
        url_template: impl Into<String>,
    ) -> Self {
        Self {
            inner,
            repository,
            url_template: url_template.into(),
            include_modules: true,
        }
    }

    pub fn with_modules(mut self, include_modules: bool) -> Self {
        self.include_modules = include_modules;
        self
    }

    pub fn remote_for(&self, descriptor: &Descriptor) -> String {
        self.url_template
            .replace("{groupId}", &descriptor.group_id)
            .replace("{artifactId}", &descriptor.artifact_id)
            .replace("{groupPath}", &descriptor.group_path())
    }

    /// Source handed to the delegate: the remote at the locator's ref, or
    /// at the version when no ref is given.
    fn inner_source(&self, source: &Source) -> Result<Source> {
        let descriptor = source.require_descriptor()?;
        let reference = match source.fragment() {
            Some(reference) => reference,
            None => descriptor.require_version()?,
        };
        let locator = format!("{}://{}#{}", GIT_SCHEME, self.remote_for(descriptor), reference);
        Ok(self.inner.create_package(&locator)?.source)
    }

    /// Read the checked-out tree at `request.install_dir`.
    fn describe(&self, request: &InstallRequest<'_>) -> Result<InstallOutcome> {
        let install_dir = &request.install_dir;
        let root_file = install_dir.join(DESCRIPTOR_FILE);
        if !root_file.is_file() {
            return Err(DepotError::DescriptorResolution(format!(
                "{} has no {}",
                request.source.locator, DESCRIPTOR_FILE
            )));
        }

        let mut resolver = PomResolver::new(&*self.repository);
        let root = resolver.load_file(&root_file)?;
        let modules = if self.include_modules {
            resolver.load_modules(root)?
        } else {
            Vec::new()
        };

        let mut outcome = InstallOutcome::default();
        let coordinates = resolver.coordinates(root)?;
        if coordinates.packaging() != POM_PACKAGING {
            outcome.classpath.push(install_dir.join(CLASSES_DIR));
        }

        // Edges between members of the tree point at the checkout
        let mut members = HashMap::new();
        members.insert(coordinates.management_key(), request.source.locator.clone());
        let mut located = Vec::new();
        for module in modules {
            let coordinates = resolver.coordinates(module)?;
            let Some(path) = resolver.document(module).base_dir.clone() else {
                continue;
            };
            let locator = module_locator(&coordinates, request.source);
            members.insert(coordinates.management_key(), locator.clone());
            located.push((module, coordinates, path, locator));
        }

        outcome.dependencies = resolver
            .dependencies(root, request.scopes, self.include_modules)?
            .into_iter()
            .map(|dep| DependencyRequest::for_descriptor(MAVEN_SCHEME, dep))
            .collect();
        outcome.warnings = resolver.take_warnings();

        for (module, coordinates, path, locator) in located {
            let dependencies = resolver
                .dependencies(module, request.scopes, false)?
                .into_iter()
                .map(|dep| match members.get(&dep.management_key()) {
                    Some(member) => DependencyRequest {
                        locator: member.clone(),
                        exclusions: dep.exclusions.clone(),
                        descriptor: Some(dep),
                    },
                    None => DependencyRequest::for_descriptor(MAVEN_SCHEME, dep),
                })
                .collect();
            outcome
                .sub_packages
                .push(sub_package(&coordinates, path, locator, dependencies));
        }
        // Already reported for the whole tree
        resolver.take_warnings();

        Ok(outcome)
    }
}

/// Locator of a module, checked out at the same ref as the tree.
fn module_locator(coordinates: &Descriptor, parent: &Source) -> String {
    let mut locator = format!(
        "{}://{}/{}/{}",
        MAVEN_GIT_SCHEME,
        coordinates.group_id,
        coordinates.artifact_id,
        coordinates.version.as_deref().unwrap_or_default()
    );
    if let Some(reference) = parent.fragment() {
        locator.push('#');
        locator.push_str(reference);
    }
    locator
}

fn sub_package(
    coordinates: &Descriptor,
    path: PathBuf,
    locator: String,
    dependencies: Vec<DependencyRequest>,
) -> SubPackage {
    let classpath = if coordinates.packaging() == POM_PACKAGING {
        Vec::new()
    } else {
        vec![path.join(CLASSES_DIR)]
    };

    SubPackage {
        name: coordinates.package_name(),
        locator,
        path,
        classpath,
        dependencies,
    }
}

impl Manager for MavenVcsManager {
    fn schemes(&self) -> Vec<&'static str> {
        vec![MAVEN_GIT_SCHEME]
    }

    fn create_package(&self, locator: &str) -> Result<PackageSpec> {
        let (_, rest) = split_scheme(locator)?;
        let (coordinate, _) = split_fragment(rest);
        let descriptor = Descriptor::parse(coordinate)?;

        let source = Source::new(MAVEN_GIT_SCHEME, locator).with_descriptor(descriptor.clone());
        Ok(PackageSpec::new(descriptor.package_name(), source))
    }

    fn do_install(&self, request: &InstallRequest<'_>) -> Result<InstallOutcome> {
        let source = self.inner_source(request.source)?;
        self.inner.do_install(&InstallRequest {
            source: &source,
            ..request.clone()
        })?;
        self.describe(request)
    }

    fn last_modified(&self, source: &Source) -> Option<DateTime<Utc>> {
        self.inner.last_modified(&self.inner_source(source).ok()?)
    }

    fn update(&self, request: &InstallRequest<'_>) -> Result<InstallOutcome> {
        let source = self.inner_source(request.source)?;
        self.inner.update(&InstallRequest {
            source: &source,
            ..request.clone()
        })?;
        self.describe(request)
    }
}
