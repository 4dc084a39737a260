pub mod error;
pub mod logging;

pub mod assembly;
pub mod batch;
pub mod collect;
pub mod config;
#[doc(hidden)]
pub mod memory;
pub mod naming;
pub mod packages;
pub mod pattern;
pub mod registry;
pub mod resolver;
pub mod writer;

pub use error::{ModulizerError, Result};
