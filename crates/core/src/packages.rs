//! Package discovery inside an artifact.

use crate::error::{ModulizerError, Result};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

/// Packages holding at least one top-level class, for a JAR or a class directory.
pub fn discover_packages(artifact: &Path) -> Result<BTreeSet<String>> {
    let packages = if artifact.is_dir() {
        packages_in_directory(artifact)
    } else {
        packages_in_archive(artifact)?
    };
    debug!(
        "Found {} package(s) in {}",
        packages.len(),
        artifact.display()
    );
    Ok(packages)
}

/// Opens `path` as a zip archive, or `None` when it is not one.
pub(crate) fn open_archive(path: &Path) -> Result<Option<ZipArchive<File>>> {
    let mut file = File::open(path).map_err(|e| ModulizerError::io(path, e))?;
    let mut magic = [0u8; 2];
    if file.read_exact(&mut magic).is_err() || magic != *b"PK" {
        return Ok(None);
    }
    file.seek(SeekFrom::Start(0))
        .map_err(|e| ModulizerError::io(path, e))?;

    ZipArchive::new(file)
        .map(Some)
        .map_err(|e| ModulizerError::Archive {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

fn packages_in_archive(path: &Path) -> Result<BTreeSet<String>> {
    let Some(mut archive) = open_archive(path)? else {
        warn!("{} is not a JAR, no packages discovered", path.display());
        return Ok(BTreeSet::new());
    };

    let mut packages = BTreeSet::new();
    for i in 0..archive.len() {
        let entry = archive.by_index(i).map_err(|e| ModulizerError::Archive {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if let Some(package) = package_of(entry.name()) {
            packages.insert(package);
        }
    }
    Ok(packages)
}

fn packages_in_directory(root: &Path) -> BTreeSet<String> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let relative = e.path().strip_prefix(root).ok()?;
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            package_of(&name)
        })
        .collect()
}

/// Package of a `/`-separated class entry name
fn package_of(entry: &str) -> Option<String> {
    if !entry.ends_with(".class") || entry.contains('$') || entry.starts_with("META-INF/") {
        return None;
    }
    let slash = entry.rfind('/')?;
    Some(entry[..slash].replace('/', "."))
}
