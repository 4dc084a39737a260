use crate::GenerateArgs;
use modulizer_core::batch::{BatchReport, BatchRunner};
use modulizer_core::config::{BatchConfiguration, ModuleOverrides};
use modulizer_core::writer::SourceDescriptorWriter;
use modulizer_maven::MavenRepository;
use std::sync::Arc;
use tracing::{error, info};

pub fn run(args: GenerateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let report = generate(args)?;

    for outcome in &report.written {
        println!("{} -> {}", outcome.module, outcome.descriptor.display());
    }
    if report.is_success() {
        return Ok(());
    }

    for failure in &report.failures {
        error!("{}: {}", failure.module, failure.error);
    }
    Err(format!(
        "{} of {} module(s) failed",
        report.failures.len(),
        report.failures.len() + report.written.len()
    )
    .into())
}

/// Runs the batch described by `args`
pub fn generate(args: GenerateArgs) -> Result<BatchReport, Box<dyn std::error::Error>> {
    info!("Loading batch configuration from {}", args.config.display());
    let mut config = BatchConfiguration::from_path(&args.config)?;
    if let Some(output) = args.output {
        config.output_directory = Some(output);
    }
    if let Some(policy) = args.policy {
        config.failure_policy = policy;
    }
    config.parallel |= args.parallel;

    let overrides = args.artifact.map(|artifact| ModuleOverrides {
        artifact,
        module_name: args.module_name,
        exports: args.exports,
        additional_dependencies: args.additional_dependencies,
        add_service_uses: args.add_service_uses,
    });
    let plan = config.validate(overrides.as_ref())?;

    let repository = MavenRepository::new(
        config.repository.local_root(),
        config.repository.remote_roots()?,
    );
    info!("Using local repository {}", repository.local().display());

    let runner = BatchRunner::from_configuration(
        &config,
        Arc::new(repository),
        Arc::new(SourceDescriptorWriter::new()),
    );
    Ok(runner.run(&plan)?)
}
