//! Effective-model resolution for descriptor documents.
//!
//! A [`PomResolver`] loads documents into a [`DocumentStore`], links parents,
//! imported boms and modules, and answers three questions about a document:
//! the value of a `${property}`, its merged dependency-management table and
//! its dependency list for a set of scopes. Property values and management
//! tables are memoised per document.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::rc::Rc;
use std::str::FromStr;

use super::pom::{DocId, DocumentStore, ParentRef, PomDocument, RawDependency};
use crate::package::{Descriptor, Scope, ScopeSet, DEFAULT_PACKAGING};
use crate::{DepotError, Result};

const DEFAULT_RELATIVE_PATH: &str = "../pom.xml";
const DESCRIPTOR_FILE: &str = "pom.xml";

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\$\{([^}]+)\}").unwrap();
}

/// Descriptor text together with where it was found.
#[derive(Debug, Clone)]
pub struct FetchedDescriptor {
    pub text: String,
    pub location: String,
}

/// Source of descriptor documents that are not part of a local tree.
pub trait DescriptorFetcher {
    fn fetch_descriptor(&self, coordinate: &Descriptor) -> Result<FetchedDescriptor>;
}

type ManagementTable = IndexMap<String, Descriptor>;

pub struct PomResolver<'f> {
    store: DocumentStore,
    fetcher: &'f dyn DescriptorFetcher,
    by_key: HashMap<String, DocId>,
    properties: HashMap<(DocId, String), Option<String>>,
    management: HashMap<DocId, Rc<ManagementTable>>,
    management_in_progress: HashSet<DocId>,
    warnings: Vec<String>,
}

impl<'f> PomResolver<'f> {
    pub fn new(fetcher: &'f dyn DescriptorFetcher) -> Self {
        Self {
            store: DocumentStore::new(),
            fetcher,
            by_key: HashMap::new(),
            properties: HashMap::new(),
            management: HashMap::new(),
            management_in_progress: HashSet::new(),
            warnings: Vec::new(),
        }
    }

    pub fn document(&self, id: DocId) -> &PomDocument {
        self.store.get(id)
    }

    /// Non-fatal problems met so far (e.g. dependencies without a version).
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    /// Load the descriptor of `coordinate` and its parent chain.
    pub fn load(&mut self, coordinate: &Descriptor) -> Result<DocId> {
        self.load_remote(
            &coordinate.group_id,
            &coordinate.artifact_id,
            coordinate.require_version()?,
            &mut Vec::new(),
        )
    }

    /// Load a descriptor file from a source tree; relative parents are
    /// looked up on disk first.
    pub fn load_file(&mut self, path: &Path) -> Result<DocId> {
        self.load_file_with(path, &mut Vec::new())
    }

    /// Load the modules aggregated by `doc`, recursively.
    ///
    /// Returns every descendant module, parents before children.
    pub fn load_modules(&mut self, doc: DocId) -> Result<Vec<DocId>> {
        let Some(base_dir) = self.store.get(doc).base_dir.clone() else {
            return Ok(Vec::new());
        };

        let mut loaded = Vec::new();
        for module in self.store.get(doc).modules.clone() {
            let path = if module.ends_with(".xml") {
                base_dir.join(&module)
            } else {
                base_dir.join(&module).join(DESCRIPTOR_FILE)
            };
            if !path.is_file() {
                return Err(DepotError::DescriptorResolution(format!(
                    "module '{}' of {} has no descriptor at {}",
                    module,
                    self.store.get(doc).location,
                    path.display()
                )));
            }

            let child = self.load_file(&path)?;
            if child == doc || loaded.contains(&child) {
                continue;
            }
            self.store.get_mut(child).included_from.get_or_insert(doc);
            if !self.store.get(doc).children.contains(&child) {
                self.store.get_mut(doc).children.push(child);
            }
            loaded.push(child);
            loaded.extend(self.load_modules(child)?);
        }
        Ok(loaded)
    }

    fn load_remote(
        &mut self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
        stack: &mut Vec<String>,
    ) -> Result<DocId> {
        let key = format!("{}:{}:{}", group_id, artifact_id, version);
        if let Some(id) = self.by_key.get(&key) {
            return Ok(*id);
        }
        check_cycle(stack, &key)?;

        let coordinate = Descriptor::new(group_id, artifact_id, Some(version.to_string()));
        let fetched = self.fetcher.fetch_descriptor(&coordinate)?;
        let doc = PomDocument::parse(&fetched.text, fetched.location)?;
        self.insert(doc, key, stack)
    }

    fn load_file_with(&mut self, path: &Path, stack: &mut Vec<String>) -> Result<DocId> {
        let text = std::fs::read_to_string(path)?;
        let mut doc = PomDocument::parse(&text, path.display().to_string())?;
        doc.base_dir = path.parent().map(Path::to_path_buf);

        let key = doc
            .raw_key()
            .unwrap_or_else(|| path.display().to_string());
        if let Some(id) = self.by_key.get(&key) {
            return Ok(*id);
        }
        check_cycle(stack, &key)?;
        self.insert(doc, key, stack)
    }

    fn insert(&mut self, doc: PomDocument, key: String, stack: &mut Vec<String>) -> Result<DocId> {
        stack.push(key.clone());
        let parent = match doc.parent_ref.clone() {
            Some(parent_ref) => Some(self.load_parent(&doc, &parent_ref, stack)),
            None => None,
        };
        stack.pop();

        let parent = parent.transpose()?;
        let id = self.store.add(doc);
        self.store.get_mut(id).parent = parent;
        self.by_key.insert(key, id);
        Ok(id)
    }

    fn load_parent(
        &mut self,
        doc: &PomDocument,
        parent_ref: &ParentRef,
        stack: &mut Vec<String>,
    ) -> Result<DocId> {
        let version = parent_ref.version.as_deref().ok_or_else(|| {
            DepotError::DescriptorResolution(format!(
                "parent {}:{} of {} has no version",
                parent_ref.group_id, parent_ref.artifact_id, doc.location
            ))
        })?;
        let key = format!("{}:{}:{}", parent_ref.group_id, parent_ref.artifact_id, version);

        if let Some(base_dir) = &doc.base_dir {
            let relative = parent_ref
                .relative_path
                .as_deref()
                .unwrap_or(DEFAULT_RELATIVE_PATH);
            let mut candidate = base_dir.join(relative);
            if candidate.is_dir() {
                candidate = candidate.join(DESCRIPTOR_FILE);
            }
            if candidate.is_file() && local_key(&candidate).as_deref() == Some(key.as_str()) {
                return self.load_file_with(&candidate, stack);
            }
        }

        self.load_remote(&parent_ref.group_id, &parent_ref.artifact_id, version, stack)
    }

    /// Raw value of `name` as seen from `doc`, before nested expansion.
    ///
    /// Lookup order: own properties, implicit project fields, the parent
    /// chain, then the document that included this one.
    pub fn property(&mut self, doc: DocId, name: &str) -> Option<String> {
        let mut visited = HashSet::new();
        self.lookup(doc, name, &mut visited)
    }

    fn lookup(&mut self, doc: DocId, name: &str, visited: &mut HashSet<DocId>) -> Option<String> {
        let cache_key = (doc, name.to_string());
        if let Some(cached) = self.properties.get(&cache_key) {
            return cached.clone();
        }
        if !visited.insert(doc) {
            return None;
        }

        let mut found = self.local_property(doc, name);
        if found.is_none() {
            if let Some(parent) = self.store.get(doc).parent {
                found = self.lookup(parent, name, visited);
            }
        }
        if found.is_none() {
            if let Some(including) = self.store.get(doc).included_from {
                found = self.lookup(including, name, visited);
            }
        }

        self.properties.insert(cache_key, found.clone());
        found
    }

    fn local_property(&self, doc: DocId, name: &str) -> Option<String> {
        let d = self.store.get(doc);
        if let Some(value) = d.properties.get(name) {
            return Some(value.clone());
        }
        if let Some(var) = name.strip_prefix("env.") {
            return std::env::var(var).ok();
        }

        let parent = d.parent_ref.as_ref();
        match name {
            "project.version" | "version" | "pom.version" => d
                .version
                .clone()
                .or_else(|| parent.and_then(|p| p.version.clone())),
            "project.groupId" | "groupId" | "pom.groupId" => d
                .group_id
                .clone()
                .or_else(|| parent.map(|p| p.group_id.clone())),
            "project.artifactId" | "artifactId" | "pom.artifactId" => d.artifact_id.clone(),
            "project.packaging" | "packaging" => Some(
                d.packaging
                    .clone()
                    .unwrap_or_else(|| DEFAULT_PACKAGING.to_string()),
            ),
            "project.parent.version" | "parent.version" => parent.and_then(|p| p.version.clone()),
            "project.parent.groupId" | "parent.groupId" => parent.map(|p| p.group_id.clone()),
            "project.parent.artifactId" | "parent.artifactId" => {
                parent.map(|p| p.artifact_id.clone())
            }
            "project.basedir" | "basedir" => d
                .base_dir
                .as_ref()
                .map(|dir| dir.to_string_lossy().into_owned()),
            _ => None,
        }
    }

    /// Expand every `${name}` in `text` as seen from `doc`.
    pub fn expand(&mut self, doc: DocId, text: &str) -> Result<String> {
        let mut expanding = Vec::new();
        self.expand_with(doc, text, &mut expanding)
    }

    fn expand_with(&mut self, doc: DocId, text: &str, expanding: &mut Vec<String>) -> Result<String> {
        if !text.contains("${") {
            return Ok(text.to_string());
        }

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(text) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let name = name.as_str();
            out.push_str(&text[last..whole.start()]);

            if expanding.iter().any(|n| n == name) {
                return Err(DepotError::DescriptorResolution(format!(
                    "property ${{{}}} in {} refers to itself",
                    name,
                    self.store.get(doc).location
                )));
            }
            let raw = self
                .property(doc, name)
                .ok_or_else(|| DepotError::UnresolvedProperty {
                    name: name.to_string(),
                    document: self.store.get(doc).location.clone(),
                })?;

            expanding.push(name.to_string());
            let value = self.expand_with(doc, &raw, expanding)?;
            expanding.pop();

            out.push_str(&value);
            last = whole.end();
        }
        out.push_str(&text[last..]);
        Ok(out)
    }

    /// Effective coordinates of `doc`, with inherited group and version.
    pub fn coordinates(&mut self, doc: DocId) -> Result<Descriptor> {
        let d = self.store.get(doc);
        let location = d.location.clone();
        let parent = d.parent_ref.clone();
        let missing = |field: &str| {
            DepotError::DescriptorResolution(format!("{} declares no {}", location, field))
        };

        let group_id = d
            .group_id
            .clone()
            .or_else(|| parent.as_ref().map(|p| p.group_id.clone()))
            .ok_or_else(|| missing("groupId"))?;
        let artifact_id = d.artifact_id.clone().ok_or_else(|| missing("artifactId"))?;
        let version = d
            .version
            .clone()
            .or_else(|| parent.as_ref().and_then(|p| p.version.clone()))
            .ok_or_else(|| missing("version"))?;
        let packaging = d.packaging.clone();

        let mut descriptor = Descriptor::new(
            self.expand(doc, &group_id)?,
            self.expand(doc, &artifact_id)?,
            Some(self.expand(doc, &version)?),
        );
        if let Some(packaging) = packaging {
            descriptor.packaging = Some(self.expand(doc, &packaging)?);
        }
        Ok(descriptor)
    }

    /// Merged dependency-management table of `doc`.
    ///
    /// Entries declared by the document and its parent chain come first,
    /// nearest declaration per `groupId:artifactId` winning, all interpolated
    /// as seen from `doc`. Imported boms fill in what is still missing and
    /// are resolved in their own scope.
    pub fn dependency_management(&mut self, doc: DocId) -> Result<Rc<ManagementTable>> {
        if let Some(table) = self.management.get(&doc) {
            return Ok(Rc::clone(table));
        }
        if !self.management_in_progress.insert(doc) {
            return Err(DepotError::DescriptorResolution(format!(
                "dependency management of {} imports itself",
                self.store.get(doc).location
            )));
        }

        let built = self.build_management(doc);
        self.management_in_progress.remove(&doc);

        let table = Rc::new(built?);
        self.management.insert(doc, Rc::clone(&table));
        Ok(table)
    }

    fn build_management(&mut self, doc: DocId) -> Result<ManagementTable> {
        let mut table = ManagementTable::new();
        let mut imports = ManagementTable::new();

        let mut declaring = Some(doc);
        while let Some(current) = declaring {
            for raw in self.store.get(current).dependency_management.clone() {
                let entry = self.interpolate(doc, &raw)?;
                let key = entry.management_key();
                if entry.scope == Some(Scope::Import) && entry.packaging() == "pom" {
                    imports.entry(key).or_insert(entry);
                } else {
                    table.entry(key).or_insert(entry);
                }
            }
            declaring = self.store.get(current).parent;
        }

        for import in imports.into_values() {
            let imported = self.load(&import)?;
            self.store.get_mut(imported).included_from.get_or_insert(doc);
            if !self.store.get(doc).imports.contains(&imported) {
                self.store.get_mut(doc).imports.push(imported);
            }
            for (key, entry) in self.dependency_management(imported)?.iter() {
                table.entry(key.clone()).or_insert_with(|| entry.clone());
            }
        }

        Ok(table)
    }

    /// Dependencies of `doc` whose scope is in `scopes`, with management
    /// applied. With `include_modules`, the dependencies of every loaded
    /// module are merged in, minus edges between the modules themselves.
    pub fn dependencies(
        &mut self,
        doc: DocId,
        scopes: &ScopeSet,
        include_modules: bool,
    ) -> Result<Vec<Descriptor>> {
        let mut dependencies = self.own_dependencies(doc, scopes)?;
        if !include_modules {
            return Ok(dependencies);
        }

        let modules = self.descendants(doc);
        let mut module_keys = HashSet::new();
        for module in &modules {
            module_keys.insert(self.coordinates(*module)?.management_key());
        }
        module_keys.insert(self.coordinates(doc)?.management_key());

        for module in modules {
            dependencies.extend(self.own_dependencies(module, scopes)?);
        }

        let mut seen = HashSet::new();
        dependencies.retain(|dep| {
            !module_keys.contains(&dep.management_key()) && seen.insert(dep.to_string())
        });
        Ok(dependencies)
    }

    fn descendants(&self, doc: DocId) -> Vec<DocId> {
        let mut out = Vec::new();
        let mut pending: Vec<DocId> = self.store.get(doc).children.iter().rev().copied().collect();
        while let Some(next) = pending.pop() {
            if next == doc || out.contains(&next) {
                continue;
            }
            out.push(next);
            pending.extend(self.store.get(next).children.iter().rev().copied());
        }
        out
    }

    fn own_dependencies(&mut self, doc: DocId, scopes: &ScopeSet) -> Result<Vec<Descriptor>> {
        let management = self.dependency_management(doc)?;
        let mut dependencies = Vec::new();

        for raw in self.store.get(doc).dependencies.clone() {
            let mut dep = self.interpolate(doc, &raw)?;
            if let Some(managed) = management.get(&dep.management_key()) {
                back_fill(&mut dep, managed);
            }

            match dep.scope() {
                Scope::Import | Scope::System => {
                    log::debug!("Skipping {} dependency {}", dep.scope(), dep);
                    continue;
                }
                scope if !scopes.contains(scope) => continue,
                _ => {}
            }

            if dep.version.is_none() {
                self.warnings.push(format!(
                    "Dropping dependency {} of {}: no version",
                    dep,
                    self.store.get(doc).location
                ));
                continue;
            }
            dependencies.push(dep);
        }
        Ok(dependencies)
    }

    fn interpolate(&mut self, doc: DocId, raw: &RawDependency) -> Result<Descriptor> {
        let mut dep = Descriptor::new(
            self.expand(doc, &raw.group_id)?,
            self.expand(doc, &raw.artifact_id)?,
            None,
        );
        if let Some(version) = &raw.version {
            dep.version = Some(self.expand(doc, version)?);
        }
        if let Some(classifier) = &raw.classifier {
            dep.classifier = Some(self.expand(doc, classifier)?);
        }
        if let Some(packaging) = &raw.packaging {
            dep.packaging = Some(self.expand(doc, packaging)?);
        }
        if let Some(scope) = &raw.scope {
            let scope = self.expand(doc, scope)?;
            dep.scope = Some(Scope::from_str(&scope).map_err(|_| {
                DepotError::DescriptorResolution(format!(
                    "unknown scope '{}' for {} in {}",
                    scope,
                    dep,
                    self.store.get(doc).location
                ))
            })?);
        }
        if let Some(optional) = &raw.optional {
            dep.optional = self.expand(doc, optional)?.eq_ignore_ascii_case("true");
        }
        for (group_id, artifact_id) in &raw.exclusions {
            dep.exclusions.push(Descriptor::exclusion(
                self.expand(doc, group_id)?,
                self.expand(doc, artifact_id)?,
            ));
        }
        Ok(dep)
    }
}

/// Fill what the dependency leaves open from its management entry.
fn back_fill(dep: &mut Descriptor, managed: &Descriptor) {
    if dep.version.is_none() {
        dep.version = managed.version.clone();
    }
    if dep.classifier.is_none() {
        dep.classifier = managed.classifier.clone();
    }
    if dep.scope.is_none() {
        dep.scope = managed.scope;
    }
    if dep.packaging.is_none() {
        dep.packaging = managed.packaging.clone();
    }
    if dep.exclusions.is_empty() {
        dep.exclusions = managed.exclusions.clone();
    }
}

fn check_cycle(stack: &[String], key: &str) -> Result<()> {
    if stack.iter().any(|k| k == key) {
        return Err(DepotError::DescriptorResolution(format!(
            "parent cycle: {} -> {}",
            stack.join(" -> "),
            key
        )));
    }
    Ok(())
}

/// Raw key of the descriptor at `path`, if it parses.
fn local_key(path: &Path) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    PomDocument::parse(&text, path.display().to_string())
        .ok()?
        .raw_key()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory descriptors keyed by `group:artifact:version`.
    #[derive(Default)]
    struct MemoryFetcher {
        poms: HashMap<String, String>,
    }

    impl MemoryFetcher {
        fn with(mut self, key: &str, xml: &str) -> Self {
            self.poms.insert(key.to_string(), xml.to_string());
            self
        }
    }

    impl DescriptorFetcher for MemoryFetcher {
        fn fetch_descriptor(&self, coordinate: &Descriptor) -> Result<FetchedDescriptor> {
            let key = coordinate.to_string();
            self.poms
                .get(&key)
                .map(|text| FetchedDescriptor {
                    text: text.clone(),
                    location: format!("{}.pom", key),
                })
                .ok_or(DepotError::PackageNotFound { name: key })
        }
    }

    fn coordinate(s: &str) -> Descriptor {
        Descriptor::parse(s).unwrap()
    }

    const PARENT: &str = r#"<project>
        <groupId>org.acme</groupId>
        <artifactId>parent</artifactId>
        <version>3.0</version>
        <packaging>pom</packaging>
        <properties>
            <lib.version>1.2</lib.version>
        </properties>
        <dependencyManagement>
            <dependencies>
                <dependency>
                    <groupId>org.managed</groupId>
                    <artifactId>managed</artifactId>
                    <version>9.9</version>
                    <scope>runtime</scope>
                </dependency>
            </dependencies>
        </dependencyManagement>
        <dependencies>
            <dependency>
                <groupId>org.never</groupId>
                <artifactId>inherited</artifactId>
                <version>1.0</version>
            </dependency>
        </dependencies>
    </project>"#;

    const CHILD: &str = r#"<project>
        <parent>
            <groupId>org.acme</groupId>
            <artifactId>parent</artifactId>
            <version>3.0</version>
        </parent>
        <artifactId>child</artifactId>
        <dependencies>
            <dependency>
                <groupId>org.acme</groupId>
                <artifactId>sibling</artifactId>
                <version>${version}</version>
            </dependency>
            <dependency>
                <groupId>org.lib</groupId>
                <artifactId>lib</artifactId>
                <version>${lib.version}</version>
            </dependency>
            <dependency>
                <groupId>org.managed</groupId>
                <artifactId>managed</artifactId>
            </dependency>
            <dependency>
                <groupId>junit</groupId>
                <artifactId>junit</artifactId>
                <version>4.13</version>
                <scope>test</scope>
            </dependency>
        </dependencies>
    </project>"#;

    fn fetcher() -> MemoryFetcher {
        MemoryFetcher::default()
            .with("org.acme:parent:3.0", PARENT)
            .with("org.acme:child:3.0", CHILD)
    }

    #[test]
    fn test_version_inherited_from_parent() {
        let fetcher = fetcher();
        let mut resolver = PomResolver::new(&fetcher);
        let child = resolver.load(&coordinate("org.acme:child:3.0")).unwrap();

        assert_eq!(resolver.expand(child, "${version}").unwrap(), "3.0");
        assert_eq!(resolver.expand(child, "${project.groupId}").unwrap(), "org.acme");
        assert_eq!(resolver.expand(child, "v${lib.version}!").unwrap(), "v1.2!");

        let coords = resolver.coordinates(child).unwrap();
        assert_eq!(coords.to_string(), "org.acme:child:3.0");
    }

    #[test]
    fn test_unresolved_property_is_error() {
        let fetcher = fetcher();
        let mut resolver = PomResolver::new(&fetcher);
        let child = resolver.load(&coordinate("org.acme:child:3.0")).unwrap();

        let err = resolver.expand(child, "${does.not.exist}").unwrap_err();
        assert!(matches!(err, DepotError::UnresolvedProperty { ref name, .. } if name == "does.not.exist"));
    }

    #[test]
    fn test_dependencies_filtered_and_managed() {
        let fetcher = fetcher();
        let mut resolver = PomResolver::new(&fetcher);
        let child = resolver.load(&coordinate("org.acme:child:3.0")).unwrap();

        let deps = resolver
            .dependencies(child, &ScopeSet::default(), false)
            .unwrap();
        let names: Vec<String> = deps.iter().map(|d| d.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "org.acme:sibling:3.0".to_string(),
                "org.lib:lib:1.2".to_string(),
                "org.managed:managed:9.9".to_string(),
            ]
        );
        assert_eq!(deps[2].scope, Some(Scope::Runtime));

        let with_tests = resolver
            .dependencies(child, &ScopeSet::new([Scope::Compile, Scope::Test]), false)
            .unwrap();
        assert!(with_tests.iter().any(|d| d.artifact_id == "junit"));
        assert!(!with_tests.iter().any(|d| d.artifact_id == "managed"));
        assert!(!with_tests.iter().any(|d| d.artifact_id == "inherited"));
    }

    #[test]
    fn test_parent_cycle_is_error() {
        let a = r#"<project><parent><groupId>g</groupId><artifactId>b</artifactId><version>1</version></parent><artifactId>a</artifactId></project>"#;
        let b = r#"<project><parent><groupId>g</groupId><artifactId>a</artifactId><version>1</version></parent><artifactId>b</artifactId></project>"#;
        let fetcher = MemoryFetcher::default().with("g:a:1", a).with("g:b:1", b);
        let mut resolver = PomResolver::new(&fetcher);

        let err = resolver.load(&coordinate("g:a:1")).unwrap_err();
        assert!(matches!(err, DepotError::DescriptorResolution(ref m) if m.contains("cycle")));
    }

    #[test]
    fn test_self_referencing_property() {
        let pom = r#"<project><groupId>g</groupId><artifactId>a</artifactId><version>1</version>
            <properties><x>${y}</x><y>${x}</y></properties></project>"#;
        let fetcher = MemoryFetcher::default().with("g:a:1", pom);
        let mut resolver = PomResolver::new(&fetcher);
        let doc = resolver.load(&coordinate("g:a:1")).unwrap();

        assert!(matches!(
            resolver.expand(doc, "${x}").unwrap_err(),
            DepotError::DescriptorResolution(_)
        ));
    }

    #[test]
    fn test_imported_management_and_missing_version() {
        let bom = r#"<project><groupId>org.bom</groupId><artifactId>bom</artifactId><version>1</version>
            <packaging>pom</packaging>
            <dependencyManagement><dependencies>
                <dependency><groupId>org.x</groupId><artifactId>x</artifactId><version>${x.version}</version></dependency>
            </dependencies></dependencyManagement>
            <properties><x.version>5.0</x.version></properties></project>"#;
        let app = r#"<project><groupId>org.app</groupId><artifactId>app</artifactId><version>1</version>
            <dependencyManagement><dependencies>
                <dependency><groupId>org.bom</groupId><artifactId>bom</artifactId><version>1</version>
                    <type>pom</type><scope>import</scope></dependency>
            </dependencies></dependencyManagement>
            <dependencies>
                <dependency><groupId>org.x</groupId><artifactId>x</artifactId></dependency>
                <dependency><groupId>org.y</groupId><artifactId>y</artifactId></dependency>
            </dependencies></project>"#;
        let fetcher = MemoryFetcher::default()
            .with("org.bom:bom:1", bom)
            .with("org.app:app:1", app);
        let mut resolver = PomResolver::new(&fetcher);
        let doc = resolver.load(&coordinate("org.app:app:1")).unwrap();

        let deps = resolver.dependencies(doc, &ScopeSet::default(), false).unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].version.as_deref(), Some("5.0"));
        assert_eq!(resolver.document(doc).imports.len(), 1);

        let warnings = resolver.take_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("org.y:y"));
    }

    #[test]
    fn test_inherited_management_sees_child_properties() {
        let parent = r#"<project><groupId>org.p</groupId><artifactId>parent</artifactId><version>1</version>
            <packaging>pom</packaging>
            <properties><x.version>1.0</x.version></properties>
            <dependencyManagement><dependencies>
                <dependency><groupId>org.x</groupId><artifactId>x</artifactId><version>${x.version}</version></dependency>
            </dependencies></dependencyManagement></project>"#;
        let child = r#"<project>
            <parent><groupId>org.p</groupId><artifactId>parent</artifactId><version>1</version></parent>
            <artifactId>child</artifactId>
            <properties><x.version>2.0</x.version></properties>
            <dependencies><dependency><groupId>org.x</groupId><artifactId>x</artifactId></dependency></dependencies>
        </project>"#;
        let fetcher = MemoryFetcher::default()
            .with("org.p:parent:1", parent)
            .with("org.p:child:1", child);
        let mut resolver = PomResolver::new(&fetcher);

        let child = resolver.load(&coordinate("org.p:child:1")).unwrap();
        let deps = resolver.dependencies(child, &ScopeSet::default(), false).unwrap();
        assert_eq!(deps[0].version.as_deref(), Some("2.0"));

        // The parent's own table still uses its own value
        let parent = resolver.document(child).parent.unwrap();
        let table = resolver.dependency_management(parent).unwrap();
        assert_eq!(table["org.x:x"].version.as_deref(), Some("1.0"));
    }

    #[test]
    fn test_inherited_management_precedes_imports() {
        let bom = r#"<project><groupId>org.bom</groupId><artifactId>bom</artifactId><version>1</version>
            <packaging>pom</packaging>
            <dependencyManagement><dependencies>
                <dependency><groupId>org.x</groupId><artifactId>x</artifactId><version>5.0</version></dependency>
                <dependency><groupId>org.y</groupId><artifactId>y</artifactId><version>6.0</version></dependency>
            </dependencies></dependencyManagement></project>"#;
        let parent = r#"<project><groupId>org.p</groupId><artifactId>parent</artifactId><version>1</version>
            <packaging>pom</packaging>
            <dependencyManagement><dependencies>
                <dependency><groupId>org.x</groupId><artifactId>x</artifactId><version>1.0</version></dependency>
            </dependencies></dependencyManagement></project>"#;
        let child = r#"<project>
            <parent><groupId>org.p</groupId><artifactId>parent</artifactId><version>1</version></parent>
            <artifactId>child</artifactId>
            <dependencyManagement><dependencies>
                <dependency><groupId>org.bom</groupId><artifactId>bom</artifactId><version>1</version>
                    <type>pom</type><scope>import</scope></dependency>
            </dependencies></dependencyManagement>
        </project>"#;
        let fetcher = MemoryFetcher::default()
            .with("org.bom:bom:1", bom)
            .with("org.p:parent:1", parent)
            .with("org.p:child:1", child);
        let mut resolver = PomResolver::new(&fetcher);

        let child = resolver.load(&coordinate("org.p:child:1")).unwrap();
        let table = resolver.dependency_management(child).unwrap();
        assert_eq!(table["org.x:x"].version.as_deref(), Some("1.0"));
        assert_eq!(table["org.y:y"].version.as_deref(), Some("6.0"));
    }

    #[test]
    fn test_modules_aggregate_dependencies() {
        let temp = tempfile::TempDir::new().unwrap();
        let root = temp.path();
        std::fs::write(
            root.join("pom.xml"),
            r#"<project><groupId>org.tree</groupId><artifactId>aggregate</artifactId><version>2.0</version>
                <packaging>pom</packaging>
                <properties><shared.version>7</shared.version></properties>
                <modules><module>api</module></modules></project>"#,
        )
        .unwrap();
        std::fs::create_dir_all(root.join("api")).unwrap();
        std::fs::write(
            root.join("api/pom.xml"),
            r#"<project>
                <parent><groupId>org.tree</groupId><artifactId>aggregate</artifactId><version>2.0</version></parent>
                <artifactId>api</artifactId>
                <dependencies>
                    <dependency><groupId>org.shared</groupId><artifactId>shared</artifactId><version>${shared.version}</version></dependency>
                    <dependency><groupId>org.tree</groupId><artifactId>aggregate</artifactId><version>2.0</version></dependency>
                </dependencies></project>"#,
        )
        .unwrap();

        let fetcher = MemoryFetcher::default();
        let mut resolver = PomResolver::new(&fetcher);
        let doc = resolver.load_file(&root.join("pom.xml")).unwrap();
        let modules = resolver.load_modules(doc).unwrap();
        assert_eq!(modules.len(), 1);
        assert_eq!(resolver.document(modules[0]).parent, Some(doc));
        assert_eq!(resolver.document(modules[0]).included_from, Some(doc));

        let own = resolver.dependencies(doc, &ScopeSet::default(), false).unwrap();
        assert!(own.is_empty());

        let merged = resolver.dependencies(doc, &ScopeSet::default(), true).unwrap();
        let names: Vec<String> = merged.iter().map(|d| d.to_string()).collect();
        assert_eq!(names, vec!["org.shared:shared:7".to_string()]);
    }
}
