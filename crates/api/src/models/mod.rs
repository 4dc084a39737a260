pub mod coordinate;
pub mod descriptor;
pub mod graph;

pub use coordinate::{ArtifactCoordinate, ResolvedArtifact};
pub use descriptor::{ExportDirective, ModuleDescriptorRequest, RequireDirective};
pub use graph::{
    DependencyDescriptor, DependencyEdge, DependencyNode, DependencyScope, DependencyTree,
    Exclusion,
};
