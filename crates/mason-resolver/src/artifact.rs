//! Artifact identity and declared dependency model

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Full artifact identity: groupId, artifactId, version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Gav {
    pub group: String,
    pub artifact: String,
    pub version: String,
}

impl Gav {
    /// Create a new GAV triple
    pub fn new(
        group: impl Into<String>,
        artifact: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
            version: version.into(),
        }
    }

    /// The version-less key identifying the logical artifact
    pub fn key(&self) -> ArtifactKey {
        ArtifactKey {
            group: self.group.clone(),
            artifact: self.artifact.clone(),
        }
    }
}

impl fmt::Display for Gav {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)
    }
}

/// groupId + artifactId, the identity mediation operates on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactKey {
    pub group: String,
    pub artifact: String,
}

impl ArtifactKey {
    /// Create a new key
    pub fn new(group: impl Into<String>, artifact: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.artifact)
    }
}

/// Dependency scope controlling classpath membership and propagation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Compile,
    Runtime,
    Provided,
    Test,
}

impl Scope {
    /// Whether a dependency declared with this scope propagates to the
    /// dependents of its owner. Test and provided dependencies are
    /// visible only to the declaring artifact itself.
    pub fn propagates(&self) -> bool {
        matches!(self, Scope::Compile | Scope::Runtime)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Scope::Compile => "compile",
            Scope::Runtime => "runtime",
            Scope::Provided => "provided",
            Scope::Test => "test",
        };
        f.write_str(s)
    }
}

/// A declared (direct) dependency of a project or artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencySpec {
    pub gav: Gav,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub exclusions: Vec<ArtifactKey>,
}

impl DependencySpec {
    /// Create a dependency with defaults (compile scope, required)
    pub fn new(gav: Gav) -> Self {
        Self {
            gav,
            scope: Scope::default(),
            optional: false,
            exclusions: Vec::new(),
        }
    }

    /// Set the scope
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Mark the dependency optional
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Add an exclusion
    pub fn with_exclusion(mut self, key: ArtifactKey) -> Self {
        self.exclusions.push(key);
        self
    }
}

/// A version/scope pin from a dependency management section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedDependency {
    pub key: ArtifactKey,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub scope: Option<Scope>,
}

/// Management rules: per logical artifact, an optional version pin and
/// an optional scope override applied before graph insertion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManagementRules {
    rules: HashMap<ArtifactKey, ManagedDependency>,
}

impl ManagementRules {
    /// Create an empty rule set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the rule for an artifact key
    pub fn insert(&mut self, rule: ManagedDependency) {
        self.rules.insert(rule.key.clone(), rule);
    }

    /// Pin a version for an artifact key
    pub fn pin_version(&mut self, key: ArtifactKey, version: impl Into<String>) {
        let entry = self.rules.entry(key.clone()).or_insert(ManagedDependency {
            key,
            version: None,
            scope: None,
        });
        entry.version = Some(version.into());
    }

    /// Look up the rule for an artifact key
    pub fn get(&self, key: &ArtifactKey) -> Option<&ManagedDependency> {
        self.rules.get(key)
    }

    /// Merge another rule set underneath this one: existing rules win,
    /// missing keys are filled from `other`. Used for parent chains.
    pub fn merge_under(&mut self, other: &ManagementRules) {
        for (key, rule) in &other.rules {
            self.rules.entry(key.clone()).or_insert_with(|| rule.clone());
        }
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if there are no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
