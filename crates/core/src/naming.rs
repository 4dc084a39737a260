//! Module names: validation and automatic names for artifacts outside the batch.

use crate::error::{ModulizerError, Result};
use crate::packages::open_archive;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Read;
use std::path::Path;

static VERSION_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"-(\d+(\.|$))").unwrap());
static NON_ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").unwrap());

const MANIFEST: &str = "META-INF/MANIFEST.MF";
const AUTOMATIC_MODULE_NAME: &str = "Automatic-Module-Name";

const RESERVED: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally", "float",
    "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long",
    "native", "new", "package", "private", "protected", "public", "return", "short", "static",
    "strictfp", "super", "switch", "synchronized", "this", "throw", "throws", "transient", "try",
    "void", "volatile", "while", "true", "false", "null", "_",
];

/// Name the module system gives `artifact` when it sits on the module path
/// without a descriptor.
pub fn automatic_module_name(artifact: &Path) -> Result<String> {
    if artifact.is_file() {
        if let Some(name) = manifest_module_name(artifact)? {
            return Ok(name);
        }
    }

    let file_name = artifact
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    derive_module_name(&file_name).ok_or_else(|| ModulizerError::DescriptorWrite {
        module: file_name.clone(),
        message: format!(
            "cannot derive an automatic module name for {}",
            artifact.display()
        ),
    })
}

/// Derives a module name from a JAR file name, e.g. `commons-lang3-3.14.0.jar`
/// becomes `commons.lang3`.
pub fn derive_module_name(file_name: &str) -> Option<String> {
    let stem = file_name.strip_suffix(".jar").unwrap_or(file_name);
    let stem = match VERSION_SUFFIX.find(stem) {
        Some(m) => &stem[..m.start()],
        None => stem,
    };

    let name = NON_ALPHANUMERIC.replace_all(stem, ".");
    let name = name.trim_matches('.');
    (!name.is_empty()).then(|| name.to_string())
}

fn manifest_module_name(jar: &Path) -> Result<Option<String>> {
    let Some(mut archive) = open_archive(jar)? else {
        return Ok(None);
    };
    let Ok(mut manifest) = archive.by_name(MANIFEST) else {
        return Ok(None);
    };

    let mut content = String::new();
    manifest
        .read_to_string(&mut content)
        .map_err(|e| ModulizerError::io(jar, e))?;
    Ok(manifest_attribute(&content, AUTOMATIC_MODULE_NAME))
}

/// Reads a main-section attribute, joining continuation lines.
fn manifest_attribute(manifest: &str, key: &str) -> Option<String> {
    let mut lines = manifest.lines().peekable();
    while let Some(line) = lines.next() {
        if line.trim().is_empty() {
            // End of the main section
            return None;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if !name.trim().eq_ignore_ascii_case(key) {
            continue;
        }

        let mut value = value.trim_start().to_string();
        while let Some(next) = lines.peek() {
            match next.strip_prefix(' ') {
                Some(continued) => {
                    value.push_str(continued);
                    lines.next();
                }
                None => break,
            }
        }
        let value = value.trim().to_string();
        return (!value.is_empty()).then_some(value);
    }
    None
}

/// Whether `name` is a legal module name: dot-separated Java identifiers,
/// none of them reserved.
pub fn is_valid_module_name(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(is_java_identifier)
}

/// Package names follow the same rules as module names.
pub fn is_valid_package_name(name: &str) -> bool {
    is_valid_module_name(name)
}

fn is_java_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        && !RESERVED.contains(&part)
}
