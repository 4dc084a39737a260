//! Contract of the artifact repository collaborator.
//!
//! The core never speaks a repository protocol itself; it resolves coordinates
//! to files and asks for declared dependency trees through this trait.

use crate::models::{ArtifactCoordinate, DependencyTree};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("artifact {0} not found in any configured repository")]
    NotFound(ArtifactCoordinate),
    #[error("failed to access repository for {coordinate}: {message}")]
    Access {
        coordinate: ArtifactCoordinate,
        message: String,
    },
    #[error("invalid metadata for {coordinate}: {message}")]
    Metadata {
        coordinate: ArtifactCoordinate,
        message: String,
    },
}

/// Artifact repository - knows where artifacts live and what they declare
pub trait RepositoryClient: Send + Sync {
    /// Locate (and if needed fetch) the file for a coordinate
    fn resolve(&self, coordinate: &ArtifactCoordinate) -> Result<PathBuf, RepositoryError>;

    /// Report the declared, unfiltered dependency tree below `root`
    fn collect_dependency_tree(
        &self,
        root: &ArtifactCoordinate,
    ) -> Result<DependencyTree, RepositoryError>;

    /// Repository name (for logging/debugging)
    fn name(&self) -> &str;
}
