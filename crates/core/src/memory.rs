//! In-memory repository client.
//!
//! Holds a fixed set of artifacts and declared edges. Used to drive the
//! resolution pipeline without a repository on disk.

use modulizer_api::{
    ArtifactCoordinate, DependencyEdge, DependencyNode, DependencyTree, RepositoryClient,
    RepositoryError,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub struct InMemoryRepository {
    artifacts: HashMap<ArtifactCoordinate, PathBuf>,
    dependencies: HashMap<ArtifactCoordinate, Vec<DependencyEdge>>,
    access_failures: HashMap<ArtifactCoordinate, String>,
    resolve_calls: AtomicUsize,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_artifact(mut self, coordinate: ArtifactCoordinate, path: impl Into<PathBuf>) -> Self {
        self.artifacts.insert(coordinate, path.into());
        self
    }

    pub fn with_dependency(mut self, from: &ArtifactCoordinate, edge: DependencyEdge) -> Self {
        self.dependencies.entry(from.clone()).or_default().push(edge);
        self
    }

    /// Make every resolution of `coordinate` fail as if the transport broke
    pub fn with_access_failure(
        mut self,
        coordinate: ArtifactCoordinate,
        message: impl Into<String>,
    ) -> Self {
        self.access_failures.insert(coordinate, message.into());
        self
    }

    /// Number of `resolve` calls that reached this repository
    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    fn expand(
        &self,
        coordinate: &ArtifactCoordinate,
        ancestors: &mut Vec<ArtifactCoordinate>,
    ) -> Vec<DependencyNode> {
        let Some(edges) = self.dependencies.get(coordinate) else {
            return Vec::new();
        };

        ancestors.push(coordinate.clone());
        let nodes = edges
            .iter()
            .map(|edge| {
                let children = if ancestors.contains(&edge.target) {
                    Vec::new()
                } else {
                    self.expand(&edge.target, ancestors)
                };
                DependencyNode::with_children(edge.clone(), children)
            })
            .collect();
        ancestors.pop();
        nodes
    }
}

impl RepositoryClient for InMemoryRepository {
    fn resolve(&self, coordinate: &ArtifactCoordinate) -> Result<PathBuf, RepositoryError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self.access_failures.get(coordinate) {
            return Err(RepositoryError::Access {
                coordinate: coordinate.clone(),
                message: message.clone(),
            });
        }

        self.artifacts
            .get(coordinate)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(coordinate.clone()))
    }

    fn collect_dependency_tree(
        &self,
        root: &ArtifactCoordinate,
    ) -> Result<DependencyTree, RepositoryError> {
        let mut ancestors = Vec::new();
        Ok(DependencyTree::new(
            root.clone(),
            self.expand(root, &mut ancestors),
        ))
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modulizer_api::DependencyScope;

    #[test]
    fn test_tree_expansion_cuts_cycles() {
        let a = ArtifactCoordinate::new("g", "a", "1");
        let b = ArtifactCoordinate::new("g", "b", "1");
        let repo = InMemoryRepository::new()
            .with_dependency(&a, DependencyEdge::new(b.clone(), DependencyScope::Compile))
            .with_dependency(&b, DependencyEdge::new(a.clone(), DependencyScope::Compile));

        let tree = repo.collect_dependency_tree(&a).unwrap();
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].edge.target, b);
        assert_eq!(tree.children[0].children.len(), 1);
        assert!(tree.children[0].children[0].children.is_empty());
    }

    #[test]
    fn test_resolve_reports_not_found_and_access_errors() {
        let a = ArtifactCoordinate::new("g", "a", "1");
        let b = ArtifactCoordinate::new("g", "b", "1");
        let repo = InMemoryRepository::new().with_access_failure(b.clone(), "connection reset");

        assert!(matches!(repo.resolve(&a), Err(RepositoryError::NotFound(_))));
        assert!(matches!(
            repo.resolve(&b),
            Err(RepositoryError::Access { .. })
        ));
        assert_eq!(repo.resolve_calls(), 2);
    }
}
