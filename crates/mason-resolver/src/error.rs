/// Resolution error types
use thiserror::Error;

pub type ResolveResult<T> = Result<T, ResolveError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResolveError {
    #[error("Dependency cycle detected: {path}")]
    DependencyCycle { path: String },

    #[error("Cannot mediate '{artifact}' to a single version: {reason}")]
    UnresolvableVersion { artifact: String, reason: String },

    #[error("Artifact not found: {gav}")]
    NotFound { gav: String },

    #[error("Transport failure fetching {gav}: {detail}")]
    Transport { gav: String, detail: String },

    #[error("No metadata available for {gav}")]
    MissingMetadata { gav: String },

    #[error("Failed to read descriptor at {path}: {reason}")]
    DescriptorRead { path: String, reason: String },

    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),
}

impl ResolveError {
    /// Create a cycle error from the chain of artifact keys that closed it
    pub fn cycle(path: &[String]) -> Self {
        Self::DependencyCycle {
            path: path.join(" -> "),
        }
    }

    /// Create an unresolvable-version error
    pub fn unresolvable(artifact: impl Into<String>, reason: impl ToString) -> Self {
        Self::UnresolvableVersion {
            artifact: artifact.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a descriptor read error
    pub fn descriptor_read(path: impl ToString, reason: impl ToString) -> Self {
        Self::DescriptorRead {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}
