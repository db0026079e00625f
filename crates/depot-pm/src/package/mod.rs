// Package model for the resolver
//
// This module provides the graph node types: coordinates, dependency
// contexts, packages with their candidate sources, and the persisted
// installation state.

mod context;
mod descriptor;
mod package;
mod source;
mod tag;

pub use context::{ContextId, DependencyContext};
pub use descriptor::{
    intersect_exclusions, union_exclusions, Descriptor, Scope, ScopeSet, DEFAULT_PACKAGING,
    WILDCARD,
};
pub use package::{MergeOutcome, Package, PackageId};
pub use source::{last_segment, split_fragment, split_scheme, Source, UNZIP_FRAGMENT};
pub use tag::{TagFile, TagStore};
