use modulizer_api::{ArtifactCoordinate, RepositoryError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModulizerError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(ArtifactCoordinate),
    #[error("Repository access failed for {coordinate}: {message}")]
    RepositoryAccess {
        coordinate: ArtifactCoordinate,
        message: String,
    },
    #[error("Couldn't collect dependencies of {root}: {source}")]
    DependencyCollection {
        root: String,
        #[source]
        source: Box<ModulizerError>,
    },
    #[error("Artifact {coordinate} is declared as module '{first}' and as module '{second}'")]
    DuplicateModule {
        coordinate: String,
        first: String,
        second: String,
    },
    #[error("Module name '{name}' is assigned to both {first} and {second}")]
    DuplicateModuleName {
        name: String,
        first: String,
        second: String,
    },
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("Couldn't write descriptor for module '{module}': {message}")]
    DescriptorWrite { module: String, message: String },
    #[error("Couldn't read archive {path}: {message}")]
    Archive { path: PathBuf, message: String },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ModulizerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ModulizerError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        ModulizerError::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Errors that mean no module of the batch can be processed correctly.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self,
            ModulizerError::Configuration(_)
                | ModulizerError::DuplicateModule { .. }
                | ModulizerError::DuplicateModuleName { .. }
                | ModulizerError::Json(_)
        )
    }
}

impl From<RepositoryError> for ModulizerError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(coordinate) => ModulizerError::ArtifactNotFound(coordinate),
            RepositoryError::Access {
                coordinate,
                message,
            } => ModulizerError::RepositoryAccess {
                coordinate,
                message,
            },
            RepositoryError::Metadata {
                coordinate,
                message,
            } => ModulizerError::RepositoryAccess {
                coordinate,
                message: format!("invalid metadata: {}", message),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, ModulizerError>;
