use crate::error::BoxError;
use crate::models::ModuleDescriptorRequest;
use std::path::{Path, PathBuf};

/// Descriptor writer - turns an assembled request into a module descriptor
/// for `artifact`, placing its output under `output_dir`.
///
/// Returns the location of what was written.
pub trait DescriptorWriter: Send + Sync {
    fn write(
        &self,
        request: &ModuleDescriptorRequest,
        artifact: &Path,
        output_dir: &Path,
    ) -> Result<PathBuf, BoxError>;

    /// Writer name (for logging/debugging)
    fn name(&self) -> &str;
}
