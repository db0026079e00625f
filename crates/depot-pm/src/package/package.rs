use chrono::{DateTime, Utc};
use std::path::PathBuf;

use super::descriptor::intersect_exclusions;
use super::source::Source;

/// Handle of a package in the registry arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId(pub(crate) usize);

impl PackageId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// What a merge did to the package's source list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// A new candidate source was inserted at this position
    Added(usize),
    /// The locator was already known; exclusions/context were merged
    Merged,
}

/// A logical package: one node of the dependency graph.
///
/// Identity is the name. Different versions or locations of the same
/// package are candidate [`Source`]s kept in priority order.
#[derive(Debug, Clone)]
pub struct Package {
    pub id: PackageId,
    pub name: String,

    /// Candidate sources, nearest first
    sources: Vec<Source>,

    /// Index of the source the package was installed from
    current: Option<usize>,

    pub dependencies: Vec<PackageId>,
    pub sub_packages: Vec<PackageId>,

    /// Aggregate this package was installed as part of
    pub parent_package: Option<PackageId>,

    pub installed: bool,

    /// Satisfied from its tag file without fetching
    pub pre_installed: bool,

    pub installed_time: Option<DateTime<Utc>>,

    /// `Some` when a (re-)fetch is required, with the reason
    pub rebuild_reason: Option<String>,

    pub install_error: Option<String>,

    pub install_path: Option<PathBuf>,

    /// Classpath entries produced by the install
    pub classpath: Vec<PathBuf>,
}

impl Package {
    pub fn new(id: PackageId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            sources: Vec::new(),
            current: None,
            dependencies: Vec::new(),
            sub_packages: Vec::new(),
            parent_package: None,
            installed: false,
            pre_installed: false,
            installed_time: None,
            rebuild_reason: None,
            install_error: None,
            install_path: None,
            classpath: Vec::new(),
        }
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// The installed source, or the highest-priority candidate.
    pub fn current_source(&self) -> Option<&Source> {
        match self.current {
            Some(index) => self.sources.get(index),
            None => self.sources.first(),
        }
    }

    pub fn set_current(&mut self, index: usize) {
        if index < self.sources.len() {
            self.current = Some(index);
        }
    }

    /// Whether the package contributes classpath entries.
    pub fn is_class_defining(&self) -> bool {
        !self.classpath.is_empty()
    }

    /// Merge a newly discovered source into the candidate list.
    ///
    /// An already known locator keeps only the exclusions present on both
    /// paths and the nearer context. A new locator is inserted after every
    /// candidate of equal or lower depth. The list stays sorted ascending by
    /// depth with unique locators.
    pub fn merge_source(&mut self, mut source: Source) -> MergeOutcome {
        source.package = Some(self.id);

        if let Some(index) = self.sources.iter().position(|s| *s == source) {
            let existing = &mut self.sources[index];
            let narrowed = intersect_exclusions(&existing.exclusions, &source.exclusions);
            let exclusions_changed = narrowed.len() != existing.exclusions.len();
            existing.exclusions = narrowed;

            let mut position = index;
            let nearer = source.depth < existing.depth;
            if nearer {
                existing.depth = source.depth;
                existing.context = source.context;
                let moved = self.sources.remove(index);
                position = self.insertion_point(moved.depth);
                self.sources.insert(position, moved);
                self.shift_current(index, position);
            }

            if self.installed {
                if let Some(current) = self.current {
                    if position < current {
                        self.invalidate(format!("nearer source {}", source.locator));
                    } else if current == position && exclusions_changed {
                        self.invalidate("exclusions narrowed".to_string());
                    } else if current == position && nearer {
                        // Dependencies must be re-registered under the nearer context
                        self.invalidate("reached through a nearer path".to_string());
                    }
                }
            }
            return MergeOutcome::Merged;
        }

        let position = self.insertion_point(source.depth);
        let locator = source.locator.clone();
        self.sources.insert(position, source);
        if let Some(current) = self.current {
            if position <= current {
                self.current = Some(current + 1);
            }
        }

        if self.installed && self.current.is_some_and(|c| position < c) {
            self.invalidate(format!("nearer source {}", locator));
        }

        MergeOutcome::Added(position)
    }

    /// Mark the package for another install round.
    pub fn invalidate(&mut self, reason: String) {
        log::debug!("{}: scheduled for reinstall ({})", self.name, reason);
        self.installed = false;
        self.pre_installed = false;
        self.current = None;
        self.rebuild_reason = Some(reason);
    }

    fn insertion_point(&self, depth: usize) -> usize {
        self.sources
            .iter()
            .position(|s| s.depth > depth)
            .unwrap_or(self.sources.len())
    }

    fn shift_current(&mut self, removed: usize, inserted: usize) {
        if let Some(current) = self.current {
            self.current = Some(if current == removed {
                inserted
            } else {
                let mut c = current;
                if removed < c {
                    c -= 1;
                }
                if inserted <= c {
                    c += 1;
                }
                c
            });
        }
    }
}
