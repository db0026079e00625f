//! The repository system: registers packages, drives install rounds until no
//! uninstalled dependency is left, and assembles the classpath.

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::Config;
use crate::http::HttpClient;
use crate::messages::{LogMessageHandler, MessageHandler};
use crate::package::{
    split_scheme, union_exclusions, ContextId, DependencyContext, Descriptor, PackageId, Source,
    TagFile, TagStore,
};
use crate::registry::Registry;
use crate::repository::{
    CopyManager, DependencyRequest, GitManager, InstallOutcome, InstallRequest, Manager,
    MavenManager, MavenRepository, MavenVcsManager, PackageSpec, SubPackage, UrlManager,
};
use crate::util::{is_non_empty_dir, move_aside};
use crate::{DepotError, Result};

/// Packages waiting for the next install round, in discovery order.
#[derive(Debug, Default)]
pub struct DependencyCollection {
    pending: IndexSet<PackageId>,
}

impl DependencyCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: PackageId) -> bool {
        self.pending.insert(id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn take(&mut self) -> Vec<PackageId> {
        self.pending.drain(..).collect()
    }
}

/// A package that could not be installed, with every reason collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallFailure {
    pub package: String,
    pub reason: String,
}

/// One installed package of a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub name: String,
    pub locator: String,
    /// `false` when the tag file was current and nothing was fetched
    pub fetched: bool,
}

/// Result of an install pass.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub classpath: Vec<PathBuf>,
    pub packages: Vec<InstalledPackage>,
    pub failures: Vec<InstallFailure>,
}

impl Resolution {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Classpath joined with the platform's path separator.
    pub fn classpath_string(&self) -> Result<String> {
        let joined = std::env::join_paths(&self.classpath)
            .map_err(|e| DepotError::InstallationFailed(format!("invalid classpath entry: {}", e)))?;
        Ok(joined.to_string_lossy().into_owned())
    }

    /// The classpath, or an error listing every failed package.
    pub fn into_result(self) -> Result<Vec<PathBuf>> {
        if self.failures.is_empty() {
            return Ok(self.classpath);
        }
        let details: Vec<String> = self
            .failures
            .iter()
            .map(|f| format!("{} ({})", f.package, f.reason))
            .collect();
        Err(DepotError::InstallationFailed(details.join(", ")))
    }
}

/// State of one pass that must not leak into the next one.
#[derive(Debug, Default)]
struct InstallPass {
    /// `(package, locator)` pairs whose fetch already failed
    failed: HashSet<(PackageId, String)>,
    /// Packages refreshed through `Manager::update`
    forced: HashSet<PackageId>,
    /// Packages fetched in this pass, even if later satisfied from a tag
    fetched: HashSet<PackageId>,
}

enum TagState {
    Current(TagFile),
    Stale(String),
}

pub struct RepositorySystem {
    config: Config,
    managers: HashMap<String, Arc<dyn Manager>>,
    registry: Mutex<Registry>,
    tags: TagStore,
    messages: Arc<dyn MessageHandler>,
}

impl RepositorySystem {
    /// System with the built-in backends for every supported scheme.
    pub fn new(config: Config) -> Result<Self> {
        let http = Arc::new(HttpClient::with_config(config.http_client_config())?);
        let repository = Arc::new(MavenRepository::from_config(&config, http.clone()));
        let mut git = GitManager::new();
        if let Some(key) = config.get_ssh_key() {
            git = git.with_ssh_key(key);
        }
        let git: Arc<dyn Manager> = Arc::new(git);
        let vcs = MavenVcsManager::new(
            git.clone(),
            repository.clone(),
            config.vcs_url_template.clone(),
        )
        .with_modules(config.include_modules);

        let mut system = Self::empty(config);
        system.register_manager(git);
        system.register_manager(Arc::new(CopyManager::new()));
        system.register_manager(Arc::new(UrlManager::new(http)));
        system.register_manager(Arc::new(MavenManager::new(repository)));
        system.register_manager(Arc::new(vcs));
        Ok(system)
    }

    /// System without any backend.
    pub fn empty(config: Config) -> Self {
        let tags = TagStore::new(config.get_state_dir());
        Self {
            config,
            managers: HashMap::new(),
            registry: Mutex::new(Registry::new()),
            tags,
            messages: Arc::new(LogMessageHandler),
        }
    }

    /// Serve every scheme of `manager` with it, replacing earlier managers.
    pub fn register_manager(&mut self, manager: Arc<dyn Manager>) {
        for scheme in manager.schemes() {
            self.managers.insert(scheme.to_string(), manager.clone());
        }
    }

    pub fn set_message_handler(&mut self, messages: Arc<dyn MessageHandler>) {
        self.messages = messages;
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn package_root(&self) -> PathBuf {
        self.config.get_package_root()
    }

    pub fn tags(&self) -> &TagStore {
        &self.tags
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn manager_for(&self, locator: &str) -> Result<(Arc<dyn Manager>, PackageSpec)> {
        let (scheme, _) = split_scheme(locator)?;
        let manager = self
            .managers
            .get(scheme)
            .cloned()
            .ok_or_else(|| DepotError::UnknownScheme {
                scheme: scheme.to_string(),
                locator: locator.to_string(),
            })?;
        let spec = manager.create_package(locator)?;
        Ok((manager, spec))
    }

    /// Register a root package. Nothing is fetched.
    pub fn add_package(&self, locator: &str) -> Result<PackageId> {
        let (_, spec) = self.manager_for(locator)?;
        let mut registry = self.registry();
        let context = registry.add_context(DependencyContext::root());
        let (id, _) = registry.register(spec, context);
        Ok(id)
    }

    /// Install `locator` and everything it depends on.
    pub fn install(&self, locator: &str) -> Resolution {
        self.install_all(&[locator])
    }

    pub fn install_all(&self, locators: &[&str]) -> Resolution {
        let mut failures = Vec::new();
        let mut collection = DependencyCollection::new();

        for locator in locators {
            match self.add_package(locator) {
                Ok(id) => {
                    collection.insert(id);
                }
                Err(e) => {
                    self.messages.error(&format!("Cannot add {}: {}", locator, e));
                    failures.push(InstallFailure {
                        package: locator.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let mut pass = InstallPass::default();
        self.install_deps(collection, &mut pass);
        self.resolution(&pass, failures)
    }

    /// Refresh an installed package in place and reinstall what changed
    /// below it.
    pub fn update(&self, locator: &str) -> Resolution {
        let mut pass = InstallPass::default();
        let mut collection = DependencyCollection::new();
        let mut failures = Vec::new();

        match self.add_package(locator) {
            Ok(id) => {
                let mut registry = self.registry();
                let package = registry.package_mut(id);
                if package.installed {
                    package.invalidate("update requested".to_string());
                }
                pass.forced.insert(id);
                collection.insert(id);
            }
            Err(e) => {
                self.messages.error(&format!("Cannot add {}: {}", locator, e));
                failures.push(InstallFailure {
                    package: locator.to_string(),
                    reason: e.to_string(),
                });
            }
        }

        self.install_deps(collection, &mut pass);
        self.resolution(&pass, failures)
    }

    /// Run install rounds until a round discovers nothing new.
    fn install_deps(&self, mut collection: DependencyCollection, pass: &mut InstallPass) {
        let mut round = 0;
        while !collection.is_empty() {
            round += 1;
            log::debug!("Install round {}: {} package(s)", round, collection.len());

            let mut next = DependencyCollection::new();
            for id in collection.take() {
                self.pre_install(id, &mut next, pass);
            }
            collection = next;
        }
    }

    /// Install one package from the first candidate source that works.
    ///
    /// Dependencies that still need installing are added to `next`.
    fn pre_install(&self, id: PackageId, next: &mut DependencyCollection, pass: &mut InstallPass) {
        let (name, candidates) = {
            let registry = self.registry();
            let package = registry.package(id);
            if package.installed {
                return;
            }
            let candidates: Vec<Source> = package
                .sources()
                .iter()
                .filter(|s| !pass.failed.contains(&(id, s.locator.clone())))
                .cloned()
                .collect();
            (package.name.clone(), candidates)
        };
        if candidates.is_empty() {
            return;
        }

        let forced = pass.forced.contains(&id);
        let mut errors = Vec::new();

        for source in candidates {
            let Some(manager) = self.managers.get(&source.scheme).cloned() else {
                errors.push(format!(
                    "{}: no backend for scheme '{}'",
                    source.locator, source.scheme
                ));
                pass.failed.insert((id, source.locator.clone()));
                continue;
            };
            let install_dir = manager.install_path(&self.package_root(), &name, &source);

            if !forced {
                match self.check_tag(&name, &source, manager.as_ref()) {
                    TagState::Current(tag) => {
                        log::debug!("{} is up to date ({})", name, source.locator);
                        let outcome = InstallOutcome {
                            dependencies: tag.dependencies,
                            classpath: tag.classpath,
                            sub_packages: tag.sub_packages,
                            warnings: Vec::new(),
                        };
                        let install_dir = tag.install_path.unwrap_or(install_dir);
                        self.complete_install(
                            id,
                            &source,
                            &install_dir,
                            outcome,
                            tag.installed_time,
                            false,
                            next,
                        );
                        return;
                    }
                    TagState::Stale(reason) => {
                        log::debug!("{} needs installing: {}", name, reason);
                        self.registry().package_mut(id).rebuild_reason = Some(reason);
                    }
                }
            }

            let request = InstallRequest {
                name: &name,
                source: &source,
                install_dir: install_dir.clone(),
                scopes: &self.config.scopes,
            };
            let result = if forced {
                self.messages.info(&format!("Updating {} ({})", name, source.locator));
                manager.update(&request)
            } else {
                self.messages.info(&format!("Installing {} ({})", name, source.locator));
                self.prepare_install_dir(&name, &install_dir)
                    .and_then(|_| manager.do_install(&request))
            };

            match result {
                Ok(outcome) => {
                    pass.forced.remove(&id);
                    let now = Utc::now();
                    self.complete_install(id, &source, &install_dir, outcome, now, true, next);
                    pass.fetched.insert(id);
                    pass.fetched
                        .extend(self.registry().package(id).sub_packages.iter().copied());
                    return;
                }
                Err(e) => {
                    self.messages
                        .warn(&format!("Failed to install {} from {}: {}", name, source.locator, e));
                    pass.failed.insert((id, source.locator.clone()));
                    errors.push(format!("{}: {}", source.locator, e));
                }
            }
        }

        // Every candidate failed
        let reason = errors.join("; ");
        self.messages.error(&format!("Could not install {}: {}", name, reason));
        self.registry().package_mut(id).install_error = Some(reason);
        if let Err(e) = self.tags.remove(&name) {
            log::warn!("Could not remove tag of {}: {}", name, e);
        }
    }

    /// Whether the tag file lets `source` skip fetching.
    fn check_tag(&self, name: &str, source: &Source, manager: &dyn Manager) -> TagState {
        let Some(tag) = self.tags.load(name) else {
            return TagState::Stale("not installed".to_string());
        };
        if tag.locator != source.locator {
            return TagState::Stale(format!("source changed from {}", tag.locator));
        }
        if tag.scopes != self.config.scopes {
            return TagState::Stale("requested scopes changed".to_string());
        }
        if let Some(path) = &tag.install_path {
            if !path.exists() {
                return TagState::Stale(format!("{} is missing", path.display()));
            }
        }
        if let Some(modified) = manager.last_modified(source) {
            if modified > tag.installed_time {
                return TagState::Stale("source modified".to_string());
            }
        }
        TagState::Current(tag)
    }

    /// Move a previous install out of the way; it is kept, never deleted.
    fn prepare_install_dir(&self, name: &str, install_dir: &Path) -> Result<()> {
        if is_non_empty_dir(install_dir) {
            let backup = move_aside(install_dir, &self.config.get_backup_dir(), name)?;
            self.messages.info(&format!(
                "Moved previous install of {} to {}",
                name,
                backup.display()
            ));
        }
        std::fs::create_dir_all(install_dir)?;
        Ok(())
    }

    /// Record a successful install and register what it brought along.
    #[allow(clippy::too_many_arguments)]
    fn complete_install(
        &self,
        id: PackageId,
        source: &Source,
        install_dir: &Path,
        outcome: InstallOutcome,
        installed_time: DateTime<Utc>,
        fetched: bool,
        next: &mut DependencyCollection,
    ) {
        for warning in &outcome.warnings {
            self.messages.warn(warning);
        }

        let mut registry = self.registry();
        let name = {
            let package = registry.package_mut(id);
            if let Some(index) = package.sources().iter().position(|s| s.locator == source.locator) {
                package.set_current(index);
            }
            package.installed = true;
            package.pre_installed = !fetched;
            package.installed_time = Some(installed_time);
            package.rebuild_reason = None;
            package.install_error = None;
            package.install_path = Some(install_dir.to_path_buf());
            package.classpath = outcome.classpath.clone();
            package.dependencies.clear();
            package.sub_packages.clear();
            package.name.clone()
        };

        if fetched {
            let tag = TagFile {
                name: name.clone(),
                locator: source.locator.clone(),
                installed_time,
                install_path: Some(install_dir.to_path_buf()),
                classpath: outcome.classpath.clone(),
                dependencies: outcome.dependencies.clone(),
                sub_packages: outcome.sub_packages.clone(),
                scopes: self.config.scopes.clone(),
            };
            if let Err(e) = self.tags.save(&tag) {
                self.messages.warn(&format!("Could not write tag of {}: {}", name, e));
            }
        }

        // The installed source may have moved to a nearer context since the
        // candidates were cloned
        let (parent_context, parent_exclusions) = match registry.package(id).current_source() {
            Some(current) => (current.context, current.exclusions.clone()),
            None => (source.context, source.exclusions.clone()),
        };
        let parent_context =
            parent_context.unwrap_or_else(|| registry.add_context(DependencyContext::root()));

        for sub in &outcome.sub_packages {
            self.register_sub_package(
                &mut registry,
                id,
                parent_context,
                sub,
                installed_time,
                fetched,
            );
        }

        for dependency in &outcome.dependencies {
            let registered = self.register_dependency(
                &mut registry,
                id,
                parent_context,
                &parent_exclusions,
                dependency,
            );
            let Some(dep_id) = registered else {
                continue;
            };
            let package = registry.package_mut(id);
            if !package.dependencies.contains(&dep_id) {
                package.dependencies.push(dep_id);
            }
            if !registry.package(dep_id).installed {
                next.insert(dep_id);
            }
        }
    }

    /// Register a module installed as part of `parent` under the parent's
    /// context.
    fn register_sub_package(
        &self,
        registry: &mut Registry,
        parent: PackageId,
        context: ContextId,
        sub: &SubPackage,
        installed_time: DateTime<Utc>,
        fetched: bool,
    ) {
        let spec = match self.manager_for(&sub.locator) {
            Ok((_, spec)) => PackageSpec::new(sub.name.clone(), spec.source),
            Err(e) => {
                self.messages
                    .warn(&format!("Ignoring module {} ({}): {}", sub.name, sub.locator, e));
                return;
            }
        };

        let (sub_id, _) = registry.register(spec, context);
        if sub_id == parent {
            return;
        }
        registry.package_mut(parent).sub_packages.push(sub_id);

        let package = registry.package_mut(sub_id);
        if package.installed {
            return;
        }
        if let Some(index) = package.sources().iter().position(|s| s.locator == sub.locator) {
            package.set_current(index);
        }
        package.installed = true;
        package.pre_installed = !fetched;
        package.installed_time = Some(installed_time);
        package.rebuild_reason = None;
        package.install_error = None;
        package.install_path = Some(sub.path.clone());
        package.classpath = sub.classpath.clone();
        package.parent_package = Some(parent);

        if fetched {
            let tag = TagFile {
                name: sub.name.clone(),
                locator: sub.locator.clone(),
                installed_time,
                install_path: Some(sub.path.clone()),
                classpath: sub.classpath.clone(),
                dependencies: sub.dependencies.clone(),
                sub_packages: Vec::new(),
                scopes: self.config.scopes.clone(),
            };
            if let Err(e) = self.tags.save(&tag) {
                self.messages.warn(&format!("Could not write tag of {}: {}", sub.name, e));
            }
        }
    }

    /// Register one dependency edge of `parent`, or drop it when the edge
    /// does not apply at this depth.
    fn register_dependency(
        &self,
        registry: &mut Registry,
        parent: PackageId,
        parent_context: ContextId,
        parent_exclusions: &[Descriptor],
        dependency: &DependencyRequest,
    ) -> Option<PackageId> {
        let context = registry.context(parent_context).clone();

        if let Some(descriptor) = &dependency.descriptor {
            if !context.is_root() && descriptor.optional {
                log::debug!("Skipping optional dependency {}", descriptor);
                return None;
            }
            let followed = if context.is_root() {
                self.config.scopes.clone()
            } else {
                self.config.scopes.transitive()
            };
            if !followed.contains(descriptor.scope()) {
                log::debug!("Skipping {} dependency {}", descriptor.scope(), descriptor);
                return None;
            }
            if descriptor.is_excluded_by(parent_exclusions) {
                let mut path = registry.trail(parent_context);
                path.push(registry.package(parent).name.clone());
                log::debug!("{} excluded below {}", descriptor, path.join(" > "));
                return None;
            }
        }

        let spec = match self.manager_for(&dependency.locator) {
            Ok((_, spec)) => spec,
            Err(e) => {
                self.messages.warn(&format!(
                    "Ignoring dependency {} of {}: {}",
                    dependency.locator,
                    registry.package(parent).name,
                    e
                ));
                return None;
            }
        };

        let exclusions = union_exclusions(parent_exclusions, &dependency.exclusions);
        let child = registry.add_context(context.child(parent_context, parent, exclusions));
        let (dep_id, _) = registry.register(spec, child);
        if dep_id == parent {
            return None;
        }
        Some(dep_id)
    }

    fn resolution(&self, pass: &InstallPass, mut failures: Vec<InstallFailure>) -> Resolution {
        let registry = self.registry();
        let mut packages = Vec::new();

        for package in registry.packages() {
            if package.installed {
                packages.push(InstalledPackage {
                    name: package.name.clone(),
                    locator: package
                        .current_source()
                        .map(|s| s.locator.clone())
                        .unwrap_or_default(),
                    fetched: !package.pre_installed || pass.fetched.contains(&package.id),
                });
            } else if let Some(error) = &package.install_error {
                failures.push(InstallFailure {
                    package: package.name.clone(),
                    reason: error.clone(),
                });
            }
        }

        Resolution {
            classpath: registry.classpath(),
            packages,
            failures,
        }
    }
}
