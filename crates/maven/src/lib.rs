pub mod pom;
pub mod repository;

pub use pom::{Pom, PomError};
pub use repository::MavenRepository;
