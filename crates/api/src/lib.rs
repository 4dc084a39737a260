pub mod error;
pub mod models;
pub mod repository;
pub mod writer;

// Re-export commonly used types
pub use error::{BoxError, CoordinateParseError};
pub use models::*;
pub use repository::{RepositoryClient, RepositoryError};
pub use writer::DescriptorWriter;
