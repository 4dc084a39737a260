//! Coordinate resolution with a per-run cache.

use crate::error::Result;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use modulizer_api::{ArtifactCoordinate, DependencyTree, RepositoryClient, ResolvedArtifact};
use std::sync::Arc;
use tracing::debug;

/// Resolves coordinates through a [`RepositoryClient`], remembering every
/// successful resolution for the rest of the run.
///
/// The cache entry stays locked while the repository is consulted, so
/// concurrent requests for the same coordinate wait for the first one
/// instead of fetching again. Failures are not cached.
pub struct CoordinateResolver {
    client: Arc<dyn RepositoryClient>,
    cache: DashMap<ArtifactCoordinate, ResolvedArtifact>,
}

impl CoordinateResolver {
    pub fn new(client: Arc<dyn RepositoryClient>) -> Self {
        Self {
            client,
            cache: DashMap::new(),
        }
    }

    pub fn resolve(&self, coordinate: &ArtifactCoordinate) -> Result<ResolvedArtifact> {
        if let Some(hit) = self.cache.get(coordinate) {
            return Ok(hit.value().clone());
        }

        match self.cache.entry(coordinate.clone()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let path = self.client.resolve(coordinate)?;
                debug!(
                    "Resolved {} to {} via {}",
                    coordinate,
                    path.display(),
                    self.client.name()
                );
                let resolved = ResolvedArtifact::new(coordinate.clone(), path);
                entry.insert(resolved.clone());
                Ok(resolved)
            }
        }
    }

    /// Declared dependency tree of `root`, unfiltered
    pub fn dependency_tree(
        &self,
        root: &ArtifactCoordinate,
    ) -> std::result::Result<DependencyTree, modulizer_api::RepositoryError> {
        self.client.collect_dependency_tree(root)
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModulizerError;
    use crate::memory::InMemoryRepository;

    #[test]
    fn test_resolution_is_cached_within_a_run() {
        let a = ArtifactCoordinate::new("com.example", "a", "1.0");
        let repo = Arc::new(InMemoryRepository::new().with_artifact(a.clone(), "/repo/a-1.0.jar"));
        let resolver = CoordinateResolver::new(repo.clone());

        let first = resolver.resolve(&a).unwrap();
        let second = resolver.resolve(&a).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.path, std::path::PathBuf::from("/repo/a-1.0.jar"));
        assert_eq!(repo.resolve_calls(), 1);
        assert_eq!(resolver.cached_count(), 1);
    }

    #[test]
    fn test_failures_are_mapped_and_not_cached() {
        let missing = ArtifactCoordinate::new("com.example", "missing", "1.0");
        let broken = ArtifactCoordinate::new("com.example", "broken", "1.0");
        let repo = Arc::new(
            InMemoryRepository::new().with_access_failure(broken.clone(), "connection refused"),
        );
        let resolver = CoordinateResolver::new(repo.clone());

        assert!(matches!(
            resolver.resolve(&missing),
            Err(ModulizerError::ArtifactNotFound(c)) if c == missing
        ));
        assert!(matches!(
            resolver.resolve(&broken),
            Err(ModulizerError::RepositoryAccess { .. })
        ));
        assert!(resolver.resolve(&missing).is_err());
        assert_eq!(repo.resolve_calls(), 3);
        assert_eq!(resolver.cached_count(), 0);
    }

    #[test]
    fn test_concurrent_requests_fetch_once() {
        let a = ArtifactCoordinate::new("com.example", "a", "1.0");
        let repo = Arc::new(InMemoryRepository::new().with_artifact(a.clone(), "/repo/a.jar"));
        let resolver = Arc::new(CoordinateResolver::new(repo.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let resolver = resolver.clone();
                let a = a.clone();
                std::thread::spawn(move || resolver.resolve(&a).unwrap())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().path, std::path::PathBuf::from("/repo/a.jar"));
        }
        assert_eq!(repo.resolve_calls(), 1);
    }
}
