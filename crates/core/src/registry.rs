//! Batch-wide module name assignments.
//!
//! Built once, before any dependency graph is collected, so that every module
//! of the batch can be referenced by its assigned name from any other module,
//! regardless of declaration order.

use crate::config::{ModuleDefinition, ModuleSource};
use crate::error::{ModulizerError, Result};
use crate::resolver::CoordinateResolver;
use modulizer_api::{ArtifactCoordinate, ResolvedArtifact};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Default, Clone)]
pub struct ModuleNameRegistry {
    by_coordinate: HashMap<ArtifactCoordinate, String>,
    by_path: HashMap<PathBuf, String>,
}

impl ModuleNameRegistry {
    /// Resolves every declared module and records its assigned name.
    pub fn build(modules: &[ModuleDefinition], resolver: &CoordinateResolver) -> Result<Self> {
        let mut registry = Self::default();
        let mut owners: HashMap<&str, String> = HashMap::new();

        for module in modules {
            // A repeated coordinate is a duplicate module, whatever its name
            if let ModuleSource::Artifact(coordinate) = &module.source {
                if let Some(first) = registry.by_coordinate.get(coordinate) {
                    return Err(ModulizerError::DuplicateModule {
                        coordinate: coordinate.to_string(),
                        first: first.clone(),
                        second: module.name.clone(),
                    });
                }
                registry
                    .by_coordinate
                    .insert(coordinate.clone(), module.name.clone());
            }

            if let Some(first) = owners.get(module.name.as_str()) {
                return Err(ModulizerError::DuplicateModuleName {
                    name: module.name.clone(),
                    first: first.clone(),
                    second: module.source.to_string(),
                });
            }
            owners.insert(module.name.as_str(), module.source.to_string());
        }

        for module in modules {
            let path = match &module.source {
                ModuleSource::Artifact(coordinate) => resolver.resolve(coordinate)?.path,
                ModuleSource::File(path) => path.clone(),
            };
            let normalized = normalize_path(&path);
            if let Some(first) = registry.by_path.get(&normalized) {
                return Err(ModulizerError::DuplicateModule {
                    coordinate: path.display().to_string(),
                    first: first.clone(),
                    second: module.name.clone(),
                });
            }
            debug!("Module '{}' is {}", module.name, path.display());
            registry.by_path.insert(normalized, module.name.clone());
        }

        info!("Registered {} module name(s)", registry.len());
        Ok(registry)
    }

    /// Registry with fixed entries, bypassing resolution
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = (ArtifactCoordinate, PathBuf, &'a str)>,
    ) -> Self {
        let mut registry = Self::default();
        for (coordinate, path, name) in entries {
            registry.by_coordinate.insert(coordinate, name.to_string());
            registry.by_path.insert(normalize_path(&path), name.to_string());
        }
        registry
    }

    /// Assigned name of a resolved artifact; `None` for artifacts outside the batch.
    pub fn lookup(&self, artifact: &ResolvedArtifact) -> Option<&str> {
        self.lookup_coordinate(&artifact.coordinate)
            .or_else(|| self.lookup_path(&artifact.path))
    }

    pub fn lookup_coordinate(&self, coordinate: &ArtifactCoordinate) -> Option<&str> {
        self.by_coordinate.get(coordinate).map(String::as_str)
    }

    pub fn lookup_path(&self, path: &Path) -> Option<&str> {
        self.by_path.get(&normalize_path(path)).map(String::as_str)
    }

    /// Number of registered modules
    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}

/// Standardizes a path so that symlinked and relative spellings of the same
/// file share one key.
fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRepository;
    use std::sync::Arc;

    fn module(source: ModuleSource, name: &str) -> ModuleDefinition {
        ModuleDefinition {
            source,
            name: name.to_string(),
            exports: None,
            requires: None,
            uses: Vec::new(),
            add_service_uses: false,
            additional_dependencies: Vec::new(),
        }
    }

    fn coord(name: &str) -> ArtifactCoordinate {
        ArtifactCoordinate::new("com.example", name, "1.0")
    }

    fn resolver(names: &[&str]) -> (Arc<InMemoryRepository>, CoordinateResolver) {
        let repo = Arc::new(names.iter().fold(InMemoryRepository::new(), |repo, name| {
            repo.with_artifact(coord(name), format!("/repo/{}.jar", name))
        }));
        (repo.clone(), CoordinateResolver::new(repo))
    }

    #[test]
    fn test_names_every_declared_module_and_nothing_else() {
        let (_, resolver) = resolver(&["a", "b", "outsider"]);
        let modules = vec![
            module(ModuleSource::Artifact(coord("a")), "mod.a"),
            module(ModuleSource::Artifact(coord("b")), "mod.b"),
            module(ModuleSource::File(PathBuf::from("/libs/c.jar")), "mod.c"),
        ];

        let registry = ModuleNameRegistry::build(&modules, &resolver).unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.lookup_coordinate(&coord("a")), Some("mod.a"));
        assert_eq!(
            registry.lookup(&resolver.resolve(&coord("b")).unwrap()),
            Some("mod.b")
        );
        assert_eq!(registry.lookup_path(Path::new("/libs/c.jar")), Some("mod.c"));

        let outsider = resolver.resolve(&coord("outsider")).unwrap();
        assert_eq!(registry.lookup(&outsider), None);
    }

    #[test]
    fn test_classifier_distinguishes_coordinates() {
        let registry = ModuleNameRegistry::from_entries([(
            coord("a"),
            PathBuf::from("/repo/a.jar"),
            "mod.a",
        )]);
        assert_eq!(
            registry.lookup_coordinate(&coord("a").with_classifier("tests")),
            None
        );
    }

    #[test]
    fn test_duplicate_coordinate_fails_before_resolution() {
        let (repo, resolver) = resolver(&["a"]);
        let modules = vec![
            module(ModuleSource::Artifact(coord("a")), "mod.a"),
            module(ModuleSource::Artifact(coord("a")), "mod.other"),
        ];

        let err = ModuleNameRegistry::build(&modules, &resolver).unwrap_err();

        assert!(matches!(err, ModulizerError::DuplicateModule { .. }));
        assert!(err.is_batch_fatal());
        assert_eq!(repo.resolve_calls(), 0);
    }

    #[test]
    fn test_repeated_declaration_is_a_duplicate_module() {
        let (repo, resolver) = resolver(&["a"]);
        let modules = vec![
            module(ModuleSource::Artifact(coord("a")), "mod.a"),
            module(ModuleSource::Artifact(coord("a")), "mod.a"),
        ];

        let err = ModuleNameRegistry::build(&modules, &resolver).unwrap_err();

        assert!(matches!(
            err,
            ModulizerError::DuplicateModule { ref coordinate, .. } if coordinate == "com.example:a:1.0"
        ));
        assert_eq!(repo.resolve_calls(), 0);
    }

    #[test]
    fn test_duplicate_module_name_is_rejected() {
        let (_, resolver) = resolver(&["a", "b"]);
        let modules = vec![
            module(ModuleSource::Artifact(coord("a")), "mod.same"),
            module(ModuleSource::Artifact(coord("b")), "mod.same"),
        ];

        assert!(matches!(
            ModuleNameRegistry::build(&modules, &resolver),
            Err(ModulizerError::DuplicateModuleName { .. })
        ));
    }

    #[test]
    fn test_unresolvable_module_fails_the_build() {
        let (_, resolver) = resolver(&[]);
        let modules = vec![module(ModuleSource::Artifact(coord("a")), "mod.a")];

        assert!(matches!(
            ModuleNameRegistry::build(&modules, &resolver),
            Err(ModulizerError::ArtifactNotFound(_))
        ));
    }
}
