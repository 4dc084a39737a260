//! Filtered dependency graph collection.
//!
//! The repository reports the declared tree below an artifact. The collector
//! prunes it (scope, transitive optionals, exclusions), resolves the direct
//! children that survive and names them from the [`ModuleNameRegistry`].

use crate::error::{ModulizerError, Result};
use crate::registry::ModuleNameRegistry;
use crate::resolver::CoordinateResolver;
use indexmap::IndexMap;
use modulizer_api::{
    DependencyDescriptor, DependencyNode, DependencyScope, DependencyTree, Exclusion,
    ResolvedArtifact,
};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Which declared edges survive collection
#[derive(Debug, Clone)]
pub struct DependencyFilter {
    excluded_scopes: Vec<DependencyScope>,
}

impl Default for DependencyFilter {
    fn default() -> Self {
        Self {
            excluded_scopes: vec![DependencyScope::Test],
        }
    }
}

impl DependencyFilter {
    /// Filter dropping edges of the given scopes instead of just `test`
    pub fn excluding(scopes: impl IntoIterator<Item = DependencyScope>) -> Self {
        Self {
            excluded_scopes: scopes.into_iter().collect(),
        }
    }

    /// `depth` is 1 for direct dependencies of the root.
    fn admits(&self, node: &DependencyNode, depth: usize, exclusions: &[Exclusion]) -> bool {
        let edge = &node.edge;
        if self.excluded_scopes.contains(&edge.scope) {
            return false;
        }
        // Optional dependencies of dependencies are never part of the graph;
        // direct optional ones stay and carry the flag.
        if edge.optional && depth > 1 {
            return false;
        }
        !exclusions.iter().any(|e| e.matches(&edge.target))
    }

    /// Returns the tree with every rejected edge (and everything below it) removed.
    pub fn apply(&self, tree: &DependencyTree) -> DependencyTree {
        DependencyTree::new(tree.root.clone(), self.prune(&tree.children, 1, &[]))
    }

    fn prune(
        &self,
        nodes: &[DependencyNode],
        depth: usize,
        exclusions: &[Exclusion],
    ) -> Vec<DependencyNode> {
        nodes
            .iter()
            .filter(|node| self.admits(node, depth, exclusions))
            .map(|node| {
                let mut inherited = exclusions.to_vec();
                inherited.extend(node.edge.exclusions.iter().cloned());
                DependencyNode::with_children(
                    node.edge.clone(),
                    self.prune(&node.children, depth + 1, &inherited),
                )
            })
            .collect()
    }
}

/// Dependency descriptors keyed by file, in first-seen order.
///
/// Inserting the same file twice merges the entries: the result is optional
/// only if both were optional, and an assigned module name is kept.
#[derive(Debug, Clone, Default)]
pub struct DependencySet {
    entries: IndexMap<PathBuf, DependencyDescriptor>,
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, descriptor: DependencyDescriptor) {
        match self.entries.get_mut(&descriptor.path) {
            Some(existing) => {
                existing.optional &= descriptor.optional;
                if existing.assigned_module_name.is_none() {
                    existing.assigned_module_name = descriptor.assigned_module_name;
                }
            }
            None => {
                self.entries.insert(descriptor.path.clone(), descriptor);
            }
        }
    }

    pub fn get(&self, path: &Path) -> Option<&DependencyDescriptor> {
        self.entries.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DependencyDescriptor> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<DependencyDescriptor> {
        self.entries.into_values().collect()
    }
}

pub struct DependencyGraphCollector<'a> {
    resolver: &'a CoordinateResolver,
    filter: DependencyFilter,
}

impl<'a> DependencyGraphCollector<'a> {
    pub fn new(resolver: &'a CoordinateResolver) -> Self {
        Self {
            resolver,
            filter: DependencyFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: DependencyFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Collects the direct dependencies of `root`. Either every direct
    /// dependency resolves or the whole collection fails.
    pub fn collect(
        &self,
        root: &ResolvedArtifact,
        registry: &ModuleNameRegistry,
    ) -> Result<DependencySet> {
        let wrap = |source: ModulizerError| ModulizerError::DependencyCollection {
            root: root.coordinate.to_string(),
            source: Box::new(source),
        };

        let raw = self
            .resolver
            .dependency_tree(&root.coordinate)
            .map_err(|e| wrap(e.into()))?;
        let filtered = self.filter.apply(&raw);
        debug!(
            "Dependency tree of {}: {} declared edges, {} after filtering",
            root.coordinate,
            raw.edge_count(),
            filtered.edge_count()
        );

        let mut dependencies = DependencySet::new();
        for child in &filtered.children {
            let resolved = self.resolver.resolve(&child.edge.target).map_err(wrap)?;
            let assigned = registry.lookup(&resolved).map(String::from);
            debug!(
                "  {} ({}, optional: {}) -> {}",
                child.edge.target,
                child.edge.scope,
                child.edge.optional,
                assigned.as_deref().unwrap_or("<automatic>")
            );
            dependencies.insert(DependencyDescriptor::new(
                resolved.path,
                child.edge.optional,
                assigned,
            ));
        }

        Ok(dependencies)
    }
}
