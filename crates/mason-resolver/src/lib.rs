//! Mason dependency resolution
//!
//! Resolves a project's declared dependencies into a transitive
//! dependency graph with nearest-wins version mediation:
//! - Artifact identity (GAV) and declared dependency model
//! - Project descriptors and the `mason.toml` loader
//! - Breadth-first transitive graph construction with exclusion and
//!   scope propagation rules
//! - Version mediation (management > nearest depth > declaration order)
//! - Cycle detection with full-path reporting

pub mod artifact;
pub mod error;
pub mod graph;
pub mod mediation;
pub mod project;

pub use artifact::{ArtifactKey, DependencySpec, Gav, ManagedDependency, ManagementRules, Scope};
pub use error::{ResolveError, ResolveResult};
pub use graph::{
    ArtifactMetadataSource, ArtifactResolver, DependencyGraph, DependencyNode, GraphBuilder,
    InMemoryArtifactStore, InMemoryMetadataSource, ResolutionState, ResolvedArtifact,
};
pub use mediation::{ConflictRecord, MediationOutcome, VersionCandidate, VersionMediator};
pub use project::{effective_management, Project, ProjectSource, TomlProjectSource};
