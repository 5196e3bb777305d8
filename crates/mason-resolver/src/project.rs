//! Project descriptor model and the `mason.toml` loader
//!
//! A `Project` is a flat, immutable description of one module in the
//! reactor. Derived queries (effective management rules) are free
//! functions over the reactor's project set rather than methods on a
//! model hierarchy.

use crate::artifact::{
    ArtifactKey, DependencySpec, Gav, ManagedDependency, ManagementRules, Scope,
};
use crate::error::{ResolveError, ResolveResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A goal bound to a lifecycle phase in a project descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalBinding {
    pub phase: String,
    pub goal: String,
}

impl GoalBinding {
    /// Create a new binding
    pub fn new(phase: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            goal: goal.into(),
        }
    }
}

/// One module in the reactor, immutable once loaded
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    /// Project identity
    pub gav: Gav,
    /// Parent project, if any
    pub parent: Option<Gav>,
    /// Declared direct dependencies
    pub dependencies: Vec<DependencySpec>,
    /// Dependency management section
    pub management: ManagementRules,
    /// Child module directory names (aggregator projects)
    pub modules: Vec<String>,
    /// Explicit ordering hints: projects that must build before this one
    pub build_after: Vec<ArtifactKey>,
    /// Build plugins used by this project
    pub plugins: Vec<Gav>,
    /// Goal-to-phase bindings
    pub bindings: Vec<GoalBinding>,
}

impl Project {
    /// Create a project with no dependencies or relations
    pub fn new(gav: Gav) -> Self {
        Self {
            gav,
            parent: None,
            dependencies: Vec::new(),
            management: ManagementRules::new(),
            modules: Vec::new(),
            build_after: Vec::new(),
            plugins: Vec::new(),
            bindings: Vec::new(),
        }
    }

    /// Set the parent project
    pub fn with_parent(mut self, parent: Gav) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Add a direct dependency
    pub fn with_dependency(mut self, dep: DependencySpec) -> Self {
        self.dependencies.push(dep);
        self
    }

    /// Add an explicit build-after hint
    pub fn with_build_after(mut self, key: ArtifactKey) -> Self {
        self.build_after.push(key);
        self
    }

    /// Add a plugin
    pub fn with_plugin(mut self, gav: Gav) -> Self {
        self.plugins.push(gav);
        self
    }

    /// Add a goal binding
    pub fn with_binding(mut self, binding: GoalBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Set management rules
    pub fn with_management(mut self, management: ManagementRules) -> Self {
        self.management = management;
        self
    }

    /// The version-less project key
    pub fn key(&self) -> ArtifactKey {
        self.gav.key()
    }

    /// Canonical project id used in logs and summaries
    pub fn id(&self) -> String {
        self.gav.to_string()
    }
}

/// Effective management rules for a project: its own section merged over
/// the parent chain (child rules win), resolved against the reactor set.
pub fn effective_management(project: &Project, reactor: &[Project]) -> ManagementRules {
    let mut rules = project.management.clone();
    let mut parent = project.parent.clone();
    // Guard against malformed parent loops; the sorter reports them.
    let mut hops = 0;
    while let Some(parent_gav) = parent {
        if hops >= reactor.len() {
            break;
        }
        hops += 1;
        match reactor.iter().find(|p| p.gav.key() == parent_gav.key()) {
            Some(p) => {
                rules.merge_under(&p.management);
                parent = p.parent.clone();
            }
            None => break,
        }
    }
    rules
}

/// Yields the projects participating in a reactor build. The engine
/// consumes this interface; implementations own all file parsing.
pub trait ProjectSource {
    fn projects(&self) -> ResolveResult<Vec<Project>>;
}

/// Descriptor provider reading `mason.toml` files from a module tree
pub struct TomlProjectSource {
    root: PathBuf,
}

impl TomlProjectSource {
    /// Create a source rooted at a directory containing `mason.toml`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn load_dir(&self, dir: &Path, out: &mut Vec<Project>) -> ResolveResult<()> {
        let path = dir.join("mason.toml");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ResolveError::descriptor_read(path.display(), e))?;
        let descriptor: ProjectDescriptor = toml::from_str(&content)
            .map_err(|e| ResolveError::InvalidDescriptor(e.to_string()))?;
        let project = descriptor.into_project()?;
        debug!(project = %project.id(), "Loaded descriptor");

        let modules = project.modules.clone();
        out.push(project);
        for module in &modules {
            self.load_dir(&dir.join(module), out)?;
        }
        Ok(())
    }
}

impl ProjectSource for TomlProjectSource {
    fn projects(&self) -> ResolveResult<Vec<Project>> {
        let mut projects = Vec::new();
        self.load_dir(&self.root, &mut projects)?;
        Ok(projects)
    }
}

/// Raw `mason.toml` descriptor
#[derive(Debug, Deserialize)]
struct ProjectDescriptor {
    project: DescriptorHeader,
    #[serde(default)]
    dependencies: Vec<DependencyEntry>,
    #[serde(default)]
    management: Vec<ManagedDependency>,
    #[serde(default)]
    plugins: Vec<Gav>,
    #[serde(default)]
    bindings: Vec<GoalBinding>,
}

#[derive(Debug, Deserialize)]
struct DescriptorHeader {
    group: String,
    artifact: String,
    version: String,
    #[serde(default)]
    parent: Option<Gav>,
    #[serde(default)]
    modules: Vec<String>,
    #[serde(default, rename = "build-after")]
    build_after: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DependencyEntry {
    group: String,
    artifact: String,
    version: String,
    #[serde(default)]
    scope: Scope,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    exclusions: Vec<ArtifactKey>,
}

impl ProjectDescriptor {
    fn into_project(self) -> ResolveResult<Project> {
        let header = self.project;
        let mut build_after = Vec::new();
        for entry in &header.build_after {
            build_after.push(parse_key(entry)?);
        }

        let mut management = ManagementRules::new();
        for rule in self.management {
            management.insert(rule);
        }

        Ok(Project {
            gav: Gav::new(header.group, header.artifact, header.version),
            parent: header.parent,
            dependencies: self
                .dependencies
                .into_iter()
                .map(|d| DependencySpec {
                    gav: Gav::new(d.group, d.artifact, d.version),
                    scope: d.scope,
                    optional: d.optional,
                    exclusions: d.exclusions,
                })
                .collect(),
            management,
            modules: header.modules,
            build_after,
            plugins: self.plugins,
            bindings: self.bindings,
        })
    }
}

/// Parse "group:artifact" into an `ArtifactKey`
fn parse_key(s: &str) -> ResolveResult<ArtifactKey> {
    match s.split_once(':') {
        Some((group, artifact)) if !group.is_empty() && !artifact.is_empty() => {
            Ok(ArtifactKey::new(group, artifact))
        }
        _ => Err(ResolveError::InvalidDescriptor(format!(
            "Invalid artifact key '{}': expected group:artifact",
            s
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write_descriptor(dir: &Path, content: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join("mason.toml"), content).unwrap();
    }

    #[test]
    fn test_parse_key() {
        let key = parse_key("com.acme:core").unwrap();
        assert_eq!(key, ArtifactKey::new("com.acme", "core"));
        assert!(parse_key("no-colon").is_err());
        assert!(parse_key(":artifact").is_err());
    }

    #[test]
    fn test_load_single_descriptor() {
        let tmp = TempDir::new().unwrap();
        write_descriptor(
            tmp.path(),
            r#"
            [project]
            group = "com.acme"
            artifact = "core"
            version = "1.0"
            build-after = ["com.acme:tools"]

            [[dependencies]]
            group = "org.lib"
            artifact = "util"
            version = "2.1"
            scope = "test"

            [[management]]
            key = { group = "org.lib", artifact = "util" }
            version = "2.2"

            [[bindings]]
            phase = "compile"
            goal = "jade:compile"
            "#,
        );

        let source = TomlProjectSource::new(tmp.path());
        let projects = source.projects().unwrap();
        assert_eq!(projects.len(), 1);

        let project = &projects[0];
        assert_eq!(project.gav, Gav::new("com.acme", "core", "1.0"));
        assert_eq!(project.dependencies.len(), 1);
        assert_eq!(project.dependencies[0].scope, Scope::Test);
        assert_eq!(project.build_after, vec![ArtifactKey::new("com.acme", "tools")]);
        assert_eq!(
            project
                .management
                .get(&ArtifactKey::new("org.lib", "util"))
                .unwrap()
                .version
                .as_deref(),
            Some("2.2")
        );
        assert_eq!(project.bindings[0], GoalBinding::new("compile", "jade:compile"));
    }

    #[test]
    fn test_load_module_tree() {
        let tmp = TempDir::new().unwrap();
        write_descriptor(
            tmp.path(),
            r#"
            [project]
            group = "com.acme"
            artifact = "aggregator"
            version = "1.0"
            modules = ["core", "app"]
            "#,
        );
        write_descriptor(
            &tmp.path().join("core"),
            r#"
            [project]
            group = "com.acme"
            artifact = "core"
            version = "1.0"
            parent = { group = "com.acme", artifact = "aggregator", version = "1.0" }
            "#,
        );
        write_descriptor(
            &tmp.path().join("app"),
            r#"
            [project]
            group = "com.acme"
            artifact = "app"
            version = "1.0"
            "#,
        );

        let projects = TomlProjectSource::new(tmp.path()).projects().unwrap();
        assert_eq!(projects.len(), 3);
        assert_eq!(projects[1].parent.as_ref().unwrap().artifact, "aggregator");
    }

    #[test]
    fn test_missing_descriptor_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let result = TomlProjectSource::new(tmp.path()).projects();
        assert!(matches!(result, Err(ResolveError::DescriptorRead { .. })));
    }

    #[test]
    fn test_effective_management_merges_parent_chain() {
        let mut parent_rules = ManagementRules::new();
        parent_rules.pin_version(ArtifactKey::new("g", "a"), "1.0");
        parent_rules.pin_version(ArtifactKey::new("g", "b"), "1.0");
        let parent = Project::new(Gav::new("com.acme", "parent", "1.0"))
            .with_management(parent_rules);

        let mut child_rules = ManagementRules::new();
        child_rules.pin_version(ArtifactKey::new("g", "a"), "2.0");
        let child = Project::new(Gav::new("com.acme", "child", "1.0"))
            .with_parent(parent.gav.clone())
            .with_management(child_rules);

        let reactor = vec![parent, child.clone()];
        let effective = effective_management(&child, &reactor);

        // Child override wins, parent fills the gap
        assert_eq!(
            effective.get(&ArtifactKey::new("g", "a")).unwrap().version.as_deref(),
            Some("2.0")
        );
        assert_eq!(
            effective.get(&ArtifactKey::new("g", "b")).unwrap().version.as_deref(),
            Some("1.0")
        );
    }

    #[test]
    fn test_effective_management_tolerates_parent_loop() {
        let a = Project::new(Gav::new("g", "a", "1.0")).with_parent(Gav::new("g", "b", "1.0"));
        let b = Project::new(Gav::new("g", "b", "1.0")).with_parent(Gav::new("g", "a", "1.0"));
        let reactor = vec![a.clone(), b];
        // Must terminate; the sorter reports the cycle itself.
        let _ = effective_management(&a, &reactor);
    }
}
