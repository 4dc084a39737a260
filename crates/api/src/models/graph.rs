use super::coordinate::ArtifactCoordinate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DependencyScope {
    Compile,
    Provided,
    Runtime,
    Test,
    System,
    Import,
    Custom(String),
}

impl From<&str> for DependencyScope {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "" | "compile" => DependencyScope::Compile,
            "provided" => DependencyScope::Provided,
            "runtime" => DependencyScope::Runtime,
            "test" => DependencyScope::Test,
            "system" => DependencyScope::System,
            "import" => DependencyScope::Import,
            _ => DependencyScope::Custom(s.trim().to_string()),
        }
    }
}

impl fmt::Display for DependencyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DependencyScope::Compile => "compile",
            DependencyScope::Provided => "provided",
            DependencyScope::Runtime => "runtime",
            DependencyScope::Test => "test",
            DependencyScope::System => "system",
            DependencyScope::Import => "import",
            DependencyScope::Custom(s) => s,
        };
        f.write_str(name)
    }
}

/// An exclusion declared on a dependency edge. `*` matches any group or name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Exclusion {
    pub group: String,
    pub name: String,
}

impl Exclusion {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }

    pub fn matches(&self, coordinate: &ArtifactCoordinate) -> bool {
        (self.group == "*" || self.group == coordinate.group)
            && (self.name == "*" || self.name == coordinate.name)
    }
}

/// One declared edge of the raw dependency tree, as the repository reports it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    pub target: ArtifactCoordinate,
    pub optional: bool,
    pub scope: DependencyScope,
    #[serde(default)]
    pub exclusions: Vec<Exclusion>,
}

impl DependencyEdge {
    pub fn new(target: ArtifactCoordinate, scope: DependencyScope) -> Self {
        Self {
            target,
            optional: false,
            scope,
            exclusions: Vec::new(),
        }
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn with_exclusion(mut self, exclusion: Exclusion) -> Self {
        self.exclusions.push(exclusion);
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    pub edge: DependencyEdge,
    #[serde(default)]
    pub children: Vec<DependencyNode>,
}

impl DependencyNode {
    pub fn leaf(edge: DependencyEdge) -> Self {
        Self {
            edge,
            children: Vec::new(),
        }
    }

    pub fn with_children(edge: DependencyEdge, children: Vec<DependencyNode>) -> Self {
        Self { edge, children }
    }
}

/// Unfiltered declared dependency tree below a root artifact.
/// The root itself is not an edge.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DependencyTree {
    pub root: ArtifactCoordinate,
    pub children: Vec<DependencyNode>,
}

impl DependencyTree {
    pub fn new(root: ArtifactCoordinate, children: Vec<DependencyNode>) -> Self {
        Self { root, children }
    }

    /// Total number of edges in the tree
    pub fn edge_count(&self) -> usize {
        fn count(nodes: &[DependencyNode]) -> usize {
            nodes.iter().map(|n| 1 + count(&n.children)).sum()
        }
        count(&self.children)
    }
}

/// Filtered, resolved dependency as consumed by descriptor assembly.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DependencyDescriptor {
    pub path: PathBuf,
    pub optional: bool,
    /// Name assigned by the batch; `None` means the automatic module name applies.
    pub assigned_module_name: Option<String>,
}

impl DependencyDescriptor {
    pub fn new(path: PathBuf, optional: bool, assigned_module_name: Option<String>) -> Self {
        Self {
            path,
            optional,
            assigned_module_name,
        }
    }
}
