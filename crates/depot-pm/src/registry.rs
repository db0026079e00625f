//! Package table and context arena of one repository system.

use indexmap::IndexSet;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::package::{
    union_exclusions, ContextId, DependencyContext, MergeOutcome, Package, PackageId,
};
use crate::repository::PackageSpec;

/// All packages and dependency contexts known to a resolution.
///
/// Packages and contexts are never removed, so [`PackageId`] and
/// [`ContextId`] handles stay valid for the registry's lifetime.
#[derive(Debug, Default)]
pub struct Registry {
    packages: Vec<Package>,
    by_name: HashMap<String, PackageId>,
    contexts: Vec<DependencyContext>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_context(&mut self, context: DependencyContext) -> ContextId {
        self.contexts.push(context);
        ContextId(self.contexts.len() - 1)
    }

    pub fn context(&self, id: ContextId) -> &DependencyContext {
        &self.contexts[id.0]
    }

    pub fn find(&self, name: &str) -> Option<PackageId> {
        self.by_name.get(name).copied()
    }

    pub fn package(&self, id: PackageId) -> &Package {
        &self.packages[id.0]
    }

    pub fn package_mut(&mut self, id: PackageId) -> &mut Package {
        &mut self.packages[id.0]
    }

    /// Packages in the order they were first referenced.
    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.iter()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Record `spec` as reached through `context`.
    ///
    /// The package is created on first reference; later references merge
    /// their source into the existing candidate list.
    pub fn register(&mut self, spec: PackageSpec, context: ContextId) -> (PackageId, MergeOutcome) {
        let ctx = self.context(context);
        let mut source = spec.source;
        source.depth = ctx.depth;
        source.context = Some(context);
        source.exclusions = union_exclusions(&source.exclusions, &ctx.exclusions);

        let id = match self.find(&spec.name) {
            Some(id) => id,
            None => {
                let id = PackageId(self.packages.len());
                self.packages.push(Package::new(id, spec.name.clone()));
                self.by_name.insert(spec.name, id);
                id
            }
        };

        let outcome = self.packages[id.0].merge_source(source);
        (id, outcome)
    }

    /// Names of the packages that led to `context`, root first.
    pub fn trail(&self, context: ContextId) -> Vec<String> {
        let mut names = Vec::new();
        let mut next = Some(context);
        while let Some(id) = next {
            let ctx = self.context(id);
            if let Some(origin) = ctx.origin {
                names.push(self.package(origin).name.clone());
            }
            next = ctx.parent;
        }
        names.reverse();
        names
    }

    /// Classpath of every installed class-defining package, in registry
    /// order, without duplicates.
    pub fn classpath(&self) -> Vec<PathBuf> {
        let mut entries = IndexSet::new();
        let defining = self
            .packages
            .iter()
            .filter(|p| p.installed && p.is_class_defining());
        for package in defining {
            entries.extend(package.classpath.iter().cloned());
        }
        entries.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{Descriptor, Source};

    fn spec(name: &str, locator: &str) -> PackageSpec {
        PackageSpec::new(name, Source::new("maven", locator))
    }

    #[test]
    fn test_register_merges_by_name() {
        let mut registry = Registry::new();
        let root = registry.add_context(DependencyContext::root());

        let (a, outcome) = registry.register(spec("g:a", "maven://g:a:1"), root);
        assert_eq!(outcome, MergeOutcome::Added(0));
        let (again, outcome) = registry.register(spec("g:a", "maven://g:a:2"), root);
        assert_eq!(again, a);
        assert_eq!(outcome, MergeOutcome::Added(1));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.package(a).sources().len(), 2);
        assert_eq!(registry.find("g:a"), Some(a));
        assert_eq!(registry.find("g:b"), None);
    }

    #[test]
    fn test_context_exclusions_reach_source() {
        let mut registry = Registry::new();
        let root = registry.add_context(DependencyContext::root());
        let (parent, _) = registry.register(spec("g:p", "maven://g:p:1"), root);

        let exclusion = Descriptor::exclusion("org.noise", "*");
        let child = registry.add_context(
            registry
                .context(root)
                .child(root, parent, vec![exclusion.clone()]),
        );
        let (dep, _) = registry.register(spec("g:d", "maven://g:d:1"), child);

        let source = &registry.package(dep).sources()[0];
        assert_eq!(source.depth, 1);
        assert_eq!(source.context, Some(child));
        assert_eq!(source.exclusions, vec![exclusion]);
        assert_eq!(registry.trail(child), vec!["g:p".to_string()]);
    }

    #[test]
    fn test_classpath_skips_uninstalled_and_duplicates() {
        let mut registry = Registry::new();
        let root = registry.add_context(DependencyContext::root());
        let (a, _) = registry.register(spec("g:a", "maven://g:a:1"), root);
        let (b, _) = registry.register(spec("g:b", "maven://g:b:1"), root);
        let (c, _) = registry.register(spec("g:c", "maven://g:c:1"), root);

        for (id, entry) in [(a, "/p/a.jar"), (b, "/p/a.jar"), (c, "/p/c.jar")] {
            registry.package_mut(id).classpath = vec![PathBuf::from(entry)];
        }
        registry.package_mut(a).installed = true;
        registry.package_mut(b).installed = true;

        assert_eq!(registry.classpath(), vec![PathBuf::from("/p/a.jar")]);
    }
}
