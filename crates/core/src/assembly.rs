//! Descriptor assembly for a single module.

use crate::collect::{DependencyGraphCollector, DependencySet};
use crate::config::{ModuleDefinition, ModuleSource};
use crate::error::{ModulizerError, Result};
use crate::naming::automatic_module_name;
use crate::packages::discover_packages;
use crate::pattern::{match_exports, match_requires, parse_export_rules, parse_require_rules};
use crate::registry::ModuleNameRegistry;
use crate::resolver::CoordinateResolver;
use modulizer_api::{DependencyDescriptor, ModuleDescriptorRequest};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// An assembled request together with the inputs it was computed from
#[derive(Debug, Clone)]
pub struct AssembledModule {
    pub request: ModuleDescriptorRequest,
    /// The module's own artifact
    pub artifact: PathBuf,
    pub dependencies: Vec<DependencyDescriptor>,
}

pub struct DescriptorAssembler<'a> {
    resolver: &'a CoordinateResolver,
    registry: &'a ModuleNameRegistry,
}

impl<'a> DescriptorAssembler<'a> {
    pub fn new(resolver: &'a CoordinateResolver, registry: &'a ModuleNameRegistry) -> Self {
        Self { resolver, registry }
    }

    pub fn assemble(&self, module: &ModuleDefinition) -> Result<AssembledModule> {
        // Malformed rules fail the module before anything is resolved
        let export_rules = parse_export_rules(module.exports.as_deref())?;
        let require_rules = parse_require_rules(module.requires.as_deref())?;

        let (artifact, mut dependencies) = match &module.source {
            ModuleSource::Artifact(coordinate) => {
                let resolved = self.resolver.resolve(coordinate)?;
                let dependencies =
                    DependencyGraphCollector::new(self.resolver).collect(&resolved, self.registry)?;
                (resolved.path, dependencies)
            }
            ModuleSource::File(path) => {
                if !path.exists() {
                    return Err(ModulizerError::io(
                        path,
                        std::io::Error::new(std::io::ErrorKind::NotFound, "module file not found"),
                    ));
                }
                debug!(
                    "{} is a plain file, only additional dependencies apply",
                    path.display()
                );
                (path.clone(), DependencySet::new())
            }
        };

        for coordinate in &module.additional_dependencies {
            let resolved = self.resolver.resolve(coordinate)?;
            let assigned = self.registry.lookup(&resolved).map(String::from);
            dependencies.insert(DependencyDescriptor::new(resolved.path, false, assigned));
        }

        let packages = discover_packages(&artifact)?;
        let exports = match_exports(&packages, &export_rules);

        let candidates = self.required_candidates(module, &dependencies)?;
        let requires = match_requires(&candidates, &require_rules);

        let request = ModuleDescriptorRequest {
            module_name: module.name.clone(),
            exports,
            requires,
            uses: module.uses.iter().cloned().collect::<BTreeSet<_>>(),
            add_service_uses: module.add_service_uses,
        };

        info!(
            "Assembled '{}': {} dependencies, {} of {} packages exported, {} requires, {} uses",
            request.module_name,
            dependencies.len(),
            request.exports.len(),
            packages.len(),
            request.requires.len(),
            request.uses.len()
        );

        Ok(AssembledModule {
            request,
            artifact,
            dependencies: dependencies.into_vec(),
        })
    }

    /// Module names of the dependencies with their optionality. Dependencies
    /// that end up with the same name are merged; optional only if all are.
    fn required_candidates(
        &self,
        module: &ModuleDefinition,
        dependencies: &DependencySet,
    ) -> Result<BTreeMap<String, bool>> {
        let mut candidates: BTreeMap<String, bool> = BTreeMap::new();
        for dependency in dependencies.iter() {
            let name = match &dependency.assigned_module_name {
                Some(name) => name.clone(),
                None => automatic_module_name(&dependency.path)?,
            };
            if name == module.name {
                warn!(
                    "'{}' depends on {}, which has its own name; not required",
                    module.name,
                    dependency.path.display()
                );
                continue;
            }
            candidates
                .entry(name)
                .and_modify(|optional| *optional &= dependency.optional)
                .or_insert(dependency.optional);
        }
        Ok(candidates)
    }
}
