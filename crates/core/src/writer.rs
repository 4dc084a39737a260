//! Textual `module-info.java` writer.

use crate::error::ModulizerError;
use crate::naming::{is_valid_module_name, is_valid_package_name};
use modulizer_api::{BoxError, DescriptorWriter, ModuleDescriptorRequest};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DESCRIPTOR_FILE_NAME: &str = "module-info.java";

/// Writes `<output>/<module name>/module-info.java`.
#[derive(Debug, Default, Clone)]
pub struct SourceDescriptorWriter;

impl SourceDescriptorWriter {
    pub fn new() -> Self {
        Self
    }

    /// Source text of the descriptor. Directives are emitted in sorted order,
    /// so equal requests render identically.
    pub fn render(request: &ModuleDescriptorRequest) -> Result<String, ModulizerError> {
        validate(request)?;

        let mut out = String::new();
        let _ = writeln!(out, "module {} {{", request.module_name);

        for require in &request.requires {
            let mut line = String::from("    requires ");
            if require.transitive {
                line.push_str("transitive ");
            }
            if require.is_static {
                line.push_str("static ");
            }
            let _ = writeln!(out, "{}{};", line, require.module);
        }
        if !request.requires.is_empty() && !request.exports.is_empty() {
            out.push('\n');
        }

        for export in &request.exports {
            if export.is_qualified() {
                let targets: Vec<&str> = export.targets.iter().map(String::as_str).collect();
                let _ = writeln!(
                    out,
                    "    exports {} to {};",
                    export.package,
                    targets.join(", ")
                );
            } else {
                let _ = writeln!(out, "    exports {};", export.package);
            }
        }
        if !request.uses.is_empty() && (!request.requires.is_empty() || !request.exports.is_empty())
        {
            out.push('\n');
        }

        for service in &request.uses {
            let _ = writeln!(out, "    uses {};", service);
        }

        out.push_str("}\n");
        Ok(out)
    }
}

fn validate(request: &ModuleDescriptorRequest) -> Result<(), ModulizerError> {
    let invalid = |message: String| ModulizerError::DescriptorWrite {
        module: request.module_name.clone(),
        message,
    };

    if !is_valid_module_name(&request.module_name) {
        return Err(invalid(format!(
            "'{}' is not a valid module name",
            request.module_name
        )));
    }
    for require in &request.requires {
        if !is_valid_module_name(&require.module) {
            return Err(invalid(format!(
                "required module '{}' is not a valid module name",
                require.module
            )));
        }
    }
    for export in &request.exports {
        if !is_valid_package_name(&export.package) {
            return Err(invalid(format!(
                "'{}' is not a valid package name",
                export.package
            )));
        }
        if let Some(target) = export.targets.iter().find(|t| !is_valid_module_name(t)) {
            return Err(invalid(format!(
                "export target '{}' is not a valid module name",
                target
            )));
        }
    }
    if let Some(service) = request.uses.iter().find(|s| !is_valid_package_name(s)) {
        return Err(invalid(format!(
            "'{}' is not a valid service type name",
            service
        )));
    }
    Ok(())
}

impl DescriptorWriter for SourceDescriptorWriter {
    fn write(
        &self,
        request: &ModuleDescriptorRequest,
        artifact: &Path,
        output_dir: &Path,
    ) -> Result<PathBuf, BoxError> {
        if request.add_service_uses {
            warn!(
                "'{}': service uses are not discovered from bytecode by the source writer, only configured uses are written",
                request.module_name
            );
        }

        let source = Self::render(request)?;
        let module_dir = output_dir.join(&request.module_name);
        std::fs::create_dir_all(&module_dir).map_err(|e| ModulizerError::io(&module_dir, e))?;

        let target = module_dir.join(DESCRIPTOR_FILE_NAME);
        std::fs::write(&target, source).map_err(|e| ModulizerError::io(&target, e))?;
        debug!(
            "Wrote descriptor of {} to {}",
            artifact.display(),
            target.display()
        );
        Ok(target)
    }

    fn name(&self) -> &str {
        "source"
    }
}
