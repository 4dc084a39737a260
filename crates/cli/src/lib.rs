pub mod generate;
pub mod inspect;

use clap::{Parser, Subcommand};
use modulizer_core::config::FailurePolicy;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "modulizer",
    version,
    about = "Generates Java module descriptors for existing artifacts",
    long_about = "Modulizer assigns module names to a batch of JARs, computes their requires from \
                  the declared Maven dependency graph and their exports from the packages they \
                  contain, and writes a module-info.java for each of them."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate descriptors for the modules of a batch configuration
    Generate(GenerateArgs),
    /// Show the packages and the automatic module name of an artifact
    Inspect {
        /// JAR file or class directory
        #[arg(value_name = "ARTIFACT")]
        path: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
pub struct GenerateArgs {
    /// Batch configuration (JSON)
    #[arg(short, long, value_name = "FILE")]
    pub config: PathBuf,

    /// Directory the descriptors are written to
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// What to do when a module fails: collect (default) or fail-fast
    #[arg(long, value_name = "POLICY")]
    pub policy: Option<FailurePolicy>,

    /// Process modules in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Process only this artifact (group:name:version[:classifier]) instead of the configured modules
    #[arg(long, value_name = "COORDINATE")]
    pub artifact: Option<String>,

    /// Module name for --artifact
    #[arg(long, requires = "artifact")]
    pub module_name: Option<String>,

    /// Export rules for --artifact
    #[arg(long, requires = "artifact")]
    pub exports: Option<String>,

    /// Comma-separated extra dependencies for --artifact
    #[arg(long, requires = "artifact")]
    pub additional_dependencies: Option<String>,

    /// Record service uses for --artifact
    #[arg(long, requires = "artifact")]
    pub add_service_uses: bool,
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let component = match &cli.command {
        Commands::Generate(_) => "generate",
        Commands::Inspect { .. } => "inspect",
    };
    let _guard = modulizer_core::logging::init_logging(component, true);

    match cli.command {
        Commands::Generate(args) => generate::run(args),
        Commands::Inspect { path } => inspect::run(path),
    }
}
