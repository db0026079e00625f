//! Descriptor (POM) documents as parsed from XML, before interpolation.

use indexmap::IndexMap;
use std::path::PathBuf;

use crate::{DepotError, Result};

/// Handle of a document in a [`DocumentStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocId(pub(crate) usize);

/// A `<dependency>` entry with its text exactly as written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub classifier: Option<String>,
    pub packaging: Option<String>,
    pub scope: Option<String>,
    pub optional: Option<String>,
    /// `(groupId, artifactId)` pairs
    pub exclusions: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParentRef {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub relative_path: Option<String>,
}

/// One parsed descriptor plus its links to related documents.
#[derive(Debug, Clone, Default)]
pub struct PomDocument {
    /// Where the document came from, for messages
    pub location: String,
    /// Directory of a descriptor read from a source tree
    pub base_dir: Option<PathBuf>,

    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub parent_ref: Option<ParentRef>,
    pub properties: IndexMap<String, String>,
    pub dependencies: Vec<RawDependency>,
    pub dependency_management: Vec<RawDependency>,
    pub modules: Vec<String>,

    pub parent: Option<DocId>,
    pub imports: Vec<DocId>,
    pub children: Vec<DocId>,
    /// Document that imported or aggregated this one
    pub included_from: Option<DocId>,
}

impl PomDocument {
    pub fn parse(xml: &str, location: impl Into<String>) -> Result<Self> {
        let location = location.into();
        let doc = roxmltree::Document::parse(xml).map_err(|e| DepotError::DescriptorParse {
            document: location.clone(),
            reason: e.to_string(),
        })?;

        let project = doc.root_element();
        if project.tag_name().name() != "project" {
            return Err(DepotError::DescriptorParse {
                document: location,
                reason: format!("unexpected root element <{}>", project.tag_name().name()),
            });
        }

        let mut pom = PomDocument {
            location,
            group_id: child_text(&project, "groupId"),
            artifact_id: child_text(&project, "artifactId"),
            version: child_text(&project, "version"),
            packaging: child_text(&project, "packaging"),
            ..Default::default()
        };

        if let Some(parent_node) = child_element(&project, "parent") {
            let group_id = child_text(&parent_node, "groupId");
            let artifact_id = child_text(&parent_node, "artifactId");
            if let (Some(group_id), Some(artifact_id)) = (group_id, artifact_id) {
                pom.parent_ref = Some(ParentRef {
                    group_id,
                    artifact_id,
                    version: child_text(&parent_node, "version"),
                    relative_path: child_text(&parent_node, "relativePath"),
                });
            }
        }

        if let Some(props_node) = child_element(&project, "properties") {
            for child in props_node.children().filter(|n| n.is_element()) {
                let value = child.text().map(str::trim).unwrap_or_default();
                pom.properties
                    .insert(child.tag_name().name().to_string(), value.to_string());
            }
        }

        if let Some(deps_node) = child_element(&project, "dependencies") {
            pom.dependencies = parse_dependencies(&deps_node);
        }

        if let Some(dep_mgmt) = child_element(&project, "dependencyManagement") {
            if let Some(deps_node) = child_element(&dep_mgmt, "dependencies") {
                pom.dependency_management = parse_dependencies(&deps_node);
            }
        }

        if let Some(modules_node) = child_element(&project, "modules") {
            pom.modules = modules_node
                .children()
                .filter(|n| n.is_element() && n.has_tag_name("module"))
                .filter_map(|n| n.text())
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
        }

        Ok(pom)
    }

    /// `groupId:artifactId:version` as written, falling back to the parent
    /// reference. Used to recognise documents already loaded.
    pub fn raw_key(&self) -> Option<String> {
        let parent = self.parent_ref.as_ref();
        let group_id = self
            .group_id
            .as_deref()
            .or_else(|| parent.map(|p| p.group_id.as_str()))?;
        let artifact_id = self.artifact_id.as_deref()?;
        let version = self
            .version
            .as_deref()
            .or_else(|| parent.and_then(|p| p.version.as_deref()))?;
        Some(format!("{}:{}:{}", group_id, artifact_id, version))
    }
}

fn parse_dependencies(deps_node: &roxmltree::Node<'_, '_>) -> Vec<RawDependency> {
    deps_node
        .children()
        .filter(|n| n.is_element() && n.has_tag_name("dependency"))
        .filter_map(|dep_node| {
            let exclusions = child_element(&dep_node, "exclusions")
                .map(|node| {
                    node.children()
                        .filter(|n| n.is_element() && n.has_tag_name("exclusion"))
                        .filter_map(|n| Some((child_text(&n, "groupId")?, child_text(&n, "artifactId")?)))
                        .collect()
                })
                .unwrap_or_default();

            Some(RawDependency {
                group_id: child_text(&dep_node, "groupId")?,
                artifact_id: child_text(&dep_node, "artifactId")?,
                version: child_text(&dep_node, "version"),
                classifier: child_text(&dep_node, "classifier"),
                packaging: child_text(&dep_node, "type"),
                scope: child_text(&dep_node, "scope"),
                optional: child_text(&dep_node, "optional"),
                exclusions,
            })
        })
        .collect()
}

fn child_element<'a, 'input>(
    node: &roxmltree::Node<'a, 'input>,
    name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn child_text(node: &roxmltree::Node<'_, '_>, name: &str) -> Option<String> {
    child_element(node, name)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Arena of documents. Links between documents are [`DocId`]s.
#[derive(Debug, Default)]
pub struct DocumentStore {
    docs: Vec<PomDocument>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, doc: PomDocument) -> DocId {
        self.docs.push(doc);
        DocId(self.docs.len() - 1)
    }

    pub fn get(&self, id: DocId) -> &PomDocument {
        &self.docs[id.0]
    }

    pub fn get_mut(&mut self, id: DocId) -> &mut PomDocument {
        &mut self.docs[id.0]
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}
