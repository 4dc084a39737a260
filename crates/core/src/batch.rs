//! Batch orchestration: registry barrier, per-module assembly, writing.

use crate::assembly::DescriptorAssembler;
use crate::config::{
    BatchConfiguration, BatchPlan, DEFAULT_OUTPUT_DIRECTORY, FailurePolicy, ModuleDefinition,
};
use crate::error::{ModulizerError, Result};
use crate::registry::ModuleNameRegistry;
use crate::resolver::CoordinateResolver;
use modulizer_api::{DescriptorWriter, ModuleDescriptorRequest, RepositoryClient};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, error, info};

/// A module whose descriptor was written
#[derive(Debug, Clone)]
pub struct ModuleOutcome {
    pub module: String,
    pub descriptor: PathBuf,
    pub request: ModuleDescriptorRequest,
}

#[derive(Debug)]
pub struct ModuleFailure {
    pub module: String,
    pub error: ModulizerError,
}

/// Outcome of a batch, in configuration order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub written: Vec<ModuleOutcome>,
    pub failures: Vec<ModuleFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct BatchRunner {
    resolver: CoordinateResolver,
    writer: Arc<dyn DescriptorWriter>,
    output_directory: PathBuf,
    failure_policy: FailurePolicy,
    parallel: bool,
}

impl BatchRunner {
    pub fn new(client: Arc<dyn RepositoryClient>, writer: Arc<dyn DescriptorWriter>) -> Self {
        Self {
            resolver: CoordinateResolver::new(client),
            writer,
            output_directory: PathBuf::from(DEFAULT_OUTPUT_DIRECTORY),
            failure_policy: FailurePolicy::default(),
            parallel: false,
        }
    }

    pub fn from_configuration(
        config: &BatchConfiguration,
        client: Arc<dyn RepositoryClient>,
        writer: Arc<dyn DescriptorWriter>,
    ) -> Self {
        Self::new(client, writer)
            .with_output_directory(config.output_directory())
            .with_failure_policy(config.failure_policy)
            .with_parallel(config.parallel)
    }

    pub fn with_output_directory(mut self, output_directory: impl Into<PathBuf>) -> Self {
        self.output_directory = output_directory.into();
        self
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Runs the batch. Errors that affect the whole batch are returned as
    /// `Err` before any descriptor is written; under
    /// [`FailurePolicy::FailFast`] so is the first module failure, and no
    /// module is started after it. Parallel runs let modules already in
    /// flight finish.
    pub fn run(&self, plan: &BatchPlan) -> Result<BatchReport> {
        let start = Instant::now();
        info!(
            "Generating {} descriptor(s) with the {} writer into {} ({}, {})",
            plan.targets.len(),
            self.writer.name(),
            self.output_directory.display(),
            self.failure_policy,
            if self.parallel { "parallel" } else { "sequential" }
        );

        std::fs::create_dir_all(&self.output_directory)
            .map_err(|e| ModulizerError::io(&self.output_directory, e))?;

        // Every name must be known before any module looks at its dependencies.
        let registry = ModuleNameRegistry::build(&plan.registry_modules(), &self.resolver)?;

        let results: Vec<(String, Result<ModuleOutcome>)> =
            if self.parallel && plan.targets.len() > 1 {
                let aborted = AtomicBool::new(false);
                plan.targets
                    .par_iter()
                    .filter_map(|module| {
                        if aborted.load(Ordering::Acquire) {
                            debug!("Skipping '{}', the batch was aborted", module.name);
                            return None;
                        }
                        let result = self.process(module, &registry);
                        if result.is_err() && self.failure_policy == FailurePolicy::FailFast {
                            aborted.store(true, Ordering::Release);
                        }
                        Some((module.name.clone(), result))
                    })
                    .collect()
            } else {
                let mut results = Vec::with_capacity(plan.targets.len());
                for module in &plan.targets {
                    let result = self.process(module, &registry);
                    let failed = result.is_err();
                    results.push((module.name.clone(), result));
                    if failed && self.failure_policy == FailurePolicy::FailFast {
                        break;
                    }
                }
                results
            };

        let mut report = BatchReport::default();
        for (module, result) in results {
            match result {
                Ok(outcome) => report.written.push(outcome),
                Err(error) => {
                    error!("Module '{}' failed: {}", module, error);
                    if self.failure_policy == FailurePolicy::FailFast {
                        return Err(error);
                    }
                    report.failures.push(ModuleFailure { module, error });
                }
            }
        }

        info!(
            "Batch finished in {:?}: {} written, {} failed, {} artifact(s) resolved",
            start.elapsed(),
            report.written.len(),
            report.failures.len(),
            self.resolver.cached_count()
        );
        Ok(report)
    }

    fn process(
        &self,
        module: &ModuleDefinition,
        registry: &ModuleNameRegistry,
    ) -> Result<ModuleOutcome> {
        let assembled = DescriptorAssembler::new(&self.resolver, registry).assemble(module)?;
        let descriptor = self
            .writer
            .write(
                &assembled.request,
                &assembled.artifact,
                &self.output_directory,
            )
            .map_err(|e| match e.downcast::<ModulizerError>() {
                Ok(err) => *err,
                Err(other) => ModulizerError::DescriptorWrite {
                    module: module.name.clone(),
                    message: other.to_string(),
                },
            })?;

        info!("Wrote '{}' to {}", module.name, descriptor.display());
        Ok(ModuleOutcome {
            module: module.name.clone(),
            descriptor,
            request: assembled.request,
        })
    }
}
