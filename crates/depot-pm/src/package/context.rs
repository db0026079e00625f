//! Dependency contexts: how a package was reached from a root.

use super::descriptor::Descriptor;
use super::package::PackageId;

/// Handle of a context node in the registry arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub(crate) usize);

impl ContextId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One node of the dependency tree.
///
/// Each node has exactly one parent; a package reached along several paths
/// owns several contexts.
#[derive(Debug, Clone)]
pub struct DependencyContext {
    /// Number of edges from the root coordinate.
    pub depth: usize,
    /// Package whose metadata introduced this edge (`None` for roots).
    pub origin: Option<PackageId>,
    pub parent: Option<ContextId>,
    /// Exclusions accumulated along the path, including the last edge.
    pub exclusions: Vec<Descriptor>,
}

impl DependencyContext {
    pub fn root() -> Self {
        Self {
            depth: 0,
            origin: None,
            parent: None,
            exclusions: Vec::new(),
        }
    }

    /// Child one edge below `self`.
    pub fn child(
        &self,
        self_id: ContextId,
        origin: PackageId,
        exclusions: Vec<Descriptor>,
    ) -> Self {
        Self {
            depth: self.depth + 1,
            origin: Some(origin),
            parent: Some(self_id),
            exclusions,
        }
    }

    pub fn is_root(&self) -> bool {
        self.depth == 0
    }
}
