//! Maven repository client over a local repository and `file://` mirrors.
//!
//! Layout: `<root>/<group path>/<name>/<version>/<name>-<version>[-<classifier>].<ext>`

use crate::pom::Pom;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use modulizer_api::{
    ArtifactCoordinate, DependencyEdge, DependencyNode, DependencyScope, DependencyTree,
    RepositoryClient, RepositoryError,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Parent chains longer than this are treated as broken
const MAX_PARENT_DEPTH: usize = 16;

pub struct MavenRepository {
    local: PathBuf,
    remotes: Vec<PathBuf>,
    poms: DashMap<ArtifactCoordinate, Option<Arc<Pom>>>,
}

impl MavenRepository {
    pub fn new(local: PathBuf, remotes: Vec<PathBuf>) -> Self {
        Self {
            local,
            remotes,
            poms: DashMap::new(),
        }
    }

    pub fn local(&self) -> &Path {
        &self.local
    }

    /// Path of `coordinate`'s file with extension `ext` below `root`
    pub fn artifact_path(root: &Path, coordinate: &ArtifactCoordinate, ext: &str) -> PathBuf {
        let mut path = root.to_path_buf();
        for segment in coordinate.group.split('.') {
            path.push(segment);
        }
        let file_name = match &coordinate.classifier {
            Some(classifier) => format!(
                "{}-{}-{}.{}",
                coordinate.name, coordinate.version, classifier, ext
            ),
            None => format!("{}-{}.{}", coordinate.name, coordinate.version, ext),
        };
        path.join(&coordinate.name)
            .join(&coordinate.version)
            .join(file_name)
    }

    /// Finds the file locally, or copies it from the first mirror that has it.
    fn fetch(&self, coordinate: &ArtifactCoordinate, ext: &str) -> Result<PathBuf, RepositoryError> {
        let local = Self::artifact_path(&self.local, coordinate, ext);
        if local.is_file() {
            return Ok(local);
        }

        for remote in &self.remotes {
            let candidate = Self::artifact_path(remote, coordinate, ext);
            if !candidate.is_file() {
                continue;
            }

            let access = |e: std::io::Error| RepositoryError::Access {
                coordinate: coordinate.clone(),
                message: format!("couldn't copy {} to the local repository: {}", candidate.display(), e),
            };
            let parent = local.parent().unwrap_or(&self.local);
            std::fs::create_dir_all(parent).map_err(access)?;

            // Readers must never see a partially copied file, so the copy
            // lands next to its destination and is renamed into place.
            let mut staged = tempfile::NamedTempFile::new_in(parent).map_err(access)?;
            let mut source = std::fs::File::open(&candidate).map_err(access)?;
            std::io::copy(&mut source, staged.as_file_mut()).map_err(access)?;
            staged.persist(&local).map_err(|e| access(e.error))?;
            debug!("Fetched {} from {}", local.display(), remote.display());
            return Ok(local);
        }

        Err(RepositoryError::NotFound(coordinate.clone()))
    }

    /// The POM of `coordinate` with its parents folded in; `None` when the
    /// repository has no POM for it.
    ///
    /// The cache entry stays locked while the POM is loaded, so threads
    /// asking for the same coordinate wait for the first load.
    fn effective_pom(
        &self,
        coordinate: &ArtifactCoordinate,
    ) -> Result<Option<Arc<Pom>>, RepositoryError> {
        let key = ArtifactCoordinate::new(&coordinate.group, &coordinate.name, &coordinate.version);
        if let Some(cached) = self.poms.get(&key) {
            return Ok(cached.value().clone());
        }

        match self.poms.entry(key) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let pom = self.load_pom(entry.key(), 0)?.map(Arc::new);
                entry.insert(pom.clone());
                Ok(pom)
            }
        }
    }

    fn load_pom(
        &self,
        coordinate: &ArtifactCoordinate,
        depth: usize,
    ) -> Result<Option<Pom>, RepositoryError> {
        let path = match self.fetch(coordinate, "pom") {
            Ok(path) => path,
            Err(RepositoryError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        let content = std::fs::read_to_string(&path).map_err(|e| RepositoryError::Access {
            coordinate: coordinate.clone(),
            message: format!("couldn't read {}: {}", path.display(), e),
        })?;
        let mut pom = Pom::parse(&content).map_err(|e| metadata(coordinate, e))?;

        if let Some(parent) = pom.parent.clone() {
            if depth >= MAX_PARENT_DEPTH {
                return Err(metadata(coordinate, "parent chain too deep"));
            }
            let parent_coordinate =
                ArtifactCoordinate::new(parent.group, parent.name, parent.version);
            match self.load_pom(&parent_coordinate, depth + 1)? {
                Some(parent_pom) => pom.inherit(&parent_pom),
                None => warn!(
                    "Parent POM {} of {} not found, inherited settings are ignored",
                    parent_coordinate, coordinate
                ),
            }
        }
        Ok(Some(pom))
    }

    fn declared_edges(
        &self,
        coordinate: &ArtifactCoordinate,
    ) -> Result<Vec<DependencyEdge>, RepositoryError> {
        let Some(pom) = self.effective_pom(coordinate)? else {
            warn!("No POM for {}, treating it as having no dependencies", coordinate);
            return Ok(Vec::new());
        };

        let dependencies = pom
            .resolved_dependencies()
            .map_err(|e| metadata(coordinate, e))?;
        Ok(dependencies
            .into_iter()
            .filter(|d| d.scope != DependencyScope::Import)
            .map(|d| {
                let mut target = ArtifactCoordinate::new(d.group, d.name, d.version);
                target.classifier = d.classifier;
                let mut edge = DependencyEdge::new(target, d.scope).optional(d.optional);
                edge.exclusions = d.exclusions;
                edge
            })
            .collect())
    }

    fn expand(
        &self,
        coordinate: &ArtifactCoordinate,
        ancestors: &mut Vec<ArtifactCoordinate>,
    ) -> Result<Vec<DependencyNode>, RepositoryError> {
        let transitive = !ancestors.is_empty();
        let edges = self.declared_edges(coordinate)?;

        ancestors.push(coordinate.clone());
        let mut nodes = Vec::with_capacity(edges.len());
        for edge in edges {
            // Below the first level, only what the dependency needs at runtime travels along
            if transitive
                && (edge.optional
                    || matches!(edge.scope, DependencyScope::Test | DependencyScope::Provided))
            {
                continue;
            }
            let children = if ancestors.contains(&edge.target) {
                debug!("Cutting dependency cycle at {}", edge.target);
                Vec::new()
            } else {
                self.expand(&edge.target, ancestors)?
            };
            nodes.push(DependencyNode::with_children(edge, children));
        }
        ancestors.pop();
        Ok(nodes)
    }
}

fn metadata(coordinate: &ArtifactCoordinate, message: impl ToString) -> RepositoryError {
    RepositoryError::Metadata {
        coordinate: coordinate.clone(),
        message: message.to_string(),
    }
}

impl RepositoryClient for MavenRepository {
    fn resolve(&self, coordinate: &ArtifactCoordinate) -> Result<PathBuf, RepositoryError> {
        self.fetch(coordinate, "jar")
    }

    fn collect_dependency_tree(
        &self,
        root: &ArtifactCoordinate,
    ) -> Result<DependencyTree, RepositoryError> {
        let mut ancestors = Vec::new();
        let children = self.expand(root, &mut ancestors)?;
        Ok(DependencyTree::new(root.clone(), children))
    }

    fn name(&self) -> &str {
        "maven"
    }
}
