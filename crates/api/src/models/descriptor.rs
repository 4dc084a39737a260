use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExportDirective {
    pub package: String,
    /// Empty for an unqualified export
    pub targets: BTreeSet<String>,
}

impl ExportDirective {
    pub fn unqualified(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            targets: BTreeSet::new(),
        }
    }

    pub fn qualified(
        package: impl Into<String>,
        targets: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            package: package.into(),
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_qualified(&self) -> bool {
        !self.targets.is_empty()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequireDirective {
    pub module: String,
    pub transitive: bool,
    #[serde(rename = "static")]
    pub is_static: bool,
}

impl RequireDirective {
    pub fn new(module: impl Into<String>, transitive: bool, is_static: bool) -> Self {
        Self {
            module: module.into(),
            transitive,
            is_static,
        }
    }
}

/// Complete description of one module's descriptor, handed to a
/// [`DescriptorWriter`](crate::DescriptorWriter). Built once per module and run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptorRequest {
    pub module_name: String,
    pub exports: BTreeSet<ExportDirective>,
    pub requires: BTreeSet<RequireDirective>,
    pub uses: BTreeSet<String>,
    pub add_service_uses: bool,
}

impl ModuleDescriptorRequest {
    pub fn exported_packages(&self) -> impl Iterator<Item = &str> {
        self.exports.iter().map(|e| e.package.as_str())
    }
}
