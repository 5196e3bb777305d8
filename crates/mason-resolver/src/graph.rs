//! Transitive dependency graph construction
//!
//! Breadth-first traversal from a project's direct dependencies.
//! Management rules are applied before insertion, exclusions prune
//! matching subtrees, and non-propagating scopes (test, provided) and
//! optional dependencies are dropped past depth one. Conflicting
//! version requests are mediated nearest-wins; losers stay in the
//! graph for diagnostics but never reach the effective classpath.

use crate::artifact::{ArtifactKey, DependencySpec, Gav, ManagementRules, Scope};
use crate::error::{ResolveError, ResolveResult};
use crate::mediation::{ConflictRecord, VersionCandidate, VersionMediator};
use crate::project::Project;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Resolution state of a node after graph construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    Unresolved,
    Resolved,
    ConflictLoser,
    CycleExcluded,
}

/// A resolved artifact node in the dependency graph
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyNode {
    pub gav: Gav,
    pub scope: Scope,
    /// Version pinned by a management rule
    pub managed: bool,
    /// Distance from the requesting project (direct dependency = 1)
    pub depth: usize,
    pub state: ResolutionState,
    pub children: Vec<DependencyNode>,
}

/// An artifact on the effective classpath, with its local location
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedArtifact {
    pub gav: Gav,
    pub scope: Scope,
    pub path: Option<PathBuf>,
}

/// Yields the declared dependencies of an external artifact
pub trait ArtifactMetadataSource {
    fn dependencies_of(&self, gav: &Gav) -> ResolveResult<Vec<DependencySpec>>;
}

/// Fetches an artifact into the local store
pub trait ArtifactResolver {
    fn fetch(&self, gav: &Gav) -> ResolveResult<PathBuf>;
}

/// In-memory metadata source; artifacts without registered metadata are
/// treated as leaves
#[derive(Debug, Default)]
pub struct InMemoryMetadataSource {
    deps: HashMap<Gav, Vec<DependencySpec>>,
}

impl InMemoryMetadataSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the declared dependencies of an artifact
    pub fn insert(&mut self, gav: Gav, deps: Vec<DependencySpec>) {
        self.deps.insert(gav, deps);
    }
}

impl ArtifactMetadataSource for InMemoryMetadataSource {
    fn dependencies_of(&self, gav: &Gav) -> ResolveResult<Vec<DependencySpec>> {
        Ok(self.deps.get(gav).cloned().unwrap_or_default())
    }
}

/// In-memory artifact store for tests and local-only builds
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    paths: HashMap<Gav, PathBuf>,
}

impl InMemoryArtifactStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a local path for an artifact
    pub fn insert(&mut self, gav: Gav, path: PathBuf) {
        self.paths.insert(gav, path);
    }
}

impl ArtifactResolver for InMemoryArtifactStore {
    fn fetch(&self, gav: &Gav) -> ResolveResult<PathBuf> {
        self.paths
            .get(gav)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound {
                gav: gav.to_string(),
            })
    }
}

/// The dependency graph of one project after mediation
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// The requesting project
    pub root: Gav,
    /// One subtree per direct dependency, in declaration order
    pub roots: Vec<DependencyNode>,
    /// Conflict records emitted during mediation
    pub conflicts: Vec<ConflictRecord>,
    /// Winning nodes in discovery order (breadth-first)
    classpath: Vec<(Gav, Scope)>,
}

impl DependencyGraph {
    /// Winning artifacts in discovery order. At most one version per
    /// artifact key appears here.
    pub fn classpath(&self) -> Vec<ResolvedArtifact> {
        self.classpath
            .iter()
            .map(|(gav, scope)| ResolvedArtifact {
                gav: gav.clone(),
                scope: *scope,
                path: None,
            })
            .collect()
    }

    /// Materialize the classpath, fetching each artifact into the local
    /// store. Fetch failures surface as resolution failures; retry is
    /// the resolver's responsibility.
    pub fn materialize(
        &self,
        resolver: &dyn ArtifactResolver,
    ) -> ResolveResult<Vec<ResolvedArtifact>> {
        let mut out = Vec::with_capacity(self.classpath.len());
        for (gav, scope) in &self.classpath {
            let path = resolver.fetch(gav)?;
            out.push(ResolvedArtifact {
                gav: gav.clone(),
                scope: *scope,
                path: Some(path),
            });
        }
        Ok(out)
    }

    /// Find the winning node for an artifact key
    pub fn find(&self, key: &ArtifactKey) -> Option<&DependencyNode> {
        fn walk<'a>(nodes: &'a [DependencyNode], key: &ArtifactKey) -> Option<&'a DependencyNode> {
            for node in nodes {
                if node.state == ResolutionState::Resolved && node.gav.key() == *key {
                    return Some(node);
                }
                if let Some(found) = walk(&node.children, key) {
                    return Some(found);
                }
            }
            None
        }
        walk(&self.roots, key)
    }

    /// Total node count, losers included
    pub fn node_count(&self) -> usize {
        fn count(nodes: &[DependencyNode]) -> usize {
            nodes.len() + nodes.iter().map(|n| count(&n.children)).sum::<usize>()
        }
        count(&self.roots)
    }
}

/// Arena entry used during construction; the owned tree is assembled
/// once traversal is complete.
struct ArenaNode {
    gav: Gav,
    scope: Scope,
    managed: bool,
    depth: usize,
    state: ResolutionState,
    parent: Option<usize>,
    children: Vec<usize>,
}

struct QueueItem {
    spec: DependencySpec,
    depth: usize,
    declaration_index: usize,
    parent: Option<usize>,
    /// Ancestor artifact keys, root project first
    path: Vec<ArtifactKey>,
    /// Exclusions inherited from the ancestor chain
    exclusions: HashSet<ArtifactKey>,
}

/// Builds the mediated dependency graph for one project
pub struct GraphBuilder<'a> {
    metadata: &'a dyn ArtifactMetadataSource,
}

impl<'a> GraphBuilder<'a> {
    /// Create a builder over a metadata source
    pub fn new(metadata: &'a dyn ArtifactMetadataSource) -> Self {
        Self { metadata }
    }

    /// Resolve the project's transitive dependency graph.
    ///
    /// A dependency cycle aborts its own subtree; sibling subtrees are
    /// still traversed so diagnostics are complete, but the overall
    /// result is a failure for the project.
    pub fn resolve(
        &self,
        project: &Project,
        management: &ManagementRules,
    ) -> ResolveResult<DependencyGraph> {
        let mut arena: Vec<ArenaNode> = Vec::new();
        let mut root_indices: Vec<usize> = Vec::new();
        // Winning candidate and arena index per artifact key
        let mut winners: HashMap<ArtifactKey, (VersionCandidate, usize)> = HashMap::new();
        let mut conflicts: Vec<ConflictRecord> = Vec::new();
        let mut cycles: Vec<ResolveError> = Vec::new();

        let root_path = vec![project.key()];
        let mut queue: VecDeque<QueueItem> = VecDeque::new();

        for (index, spec) in project.dependencies.iter().enumerate() {
            queue.push_back(QueueItem {
                spec: spec.clone(),
                depth: 1,
                declaration_index: index,
                parent: None,
                path: root_path.clone(),
                exclusions: HashSet::new(),
            });
        }

        while let Some(item) = queue.pop_front() {
            let key = item.spec.gav.key();

            if item.exclusions.contains(&key) {
                continue;
            }

            // Cycle check comes before mediation: an ancestor reappearing
            // is a cycle, not a version conflict.
            if item.path.contains(&key) {
                let mut cycle_path: Vec<String> =
                    item.path.iter().map(|k| k.to_string()).collect();
                cycle_path.push(key.to_string());
                warn!(artifact = %key, "Dependency cycle detected");
                cycles.push(ResolveError::cycle(&cycle_path));

                Self::push_node(
                    &mut arena,
                    &mut root_indices,
                    &item,
                    item.spec.gav.clone(),
                    item.spec.scope,
                    false,
                    ResolutionState::CycleExcluded,
                );
                continue;
            }

            // Apply management before insertion
            let rule = management.get(&key);
            let requested = item.spec.gav.version.clone();
            let (version, managed) = match rule.and_then(|r| r.version.clone()) {
                Some(pinned) => (pinned, true),
                None => (requested.clone(), false),
            };
            let scope = rule.and_then(|r| r.scope).unwrap_or(item.spec.scope);
            let gav = Gav::new(key.group.clone(), key.artifact.clone(), version.clone());

            if managed && requested != version {
                Self::record_conflict(&mut conflicts, &key, &version, &requested);
            }

            let candidate = VersionCandidate {
                version: version.clone(),
                depth: item.depth,
                declaration_index: item.declaration_index,
                managed,
            };

            match winners.get(&key) {
                Some((winner, _)) => {
                    // Later occurrence: breadth-first order guarantees the
                    // standing winner is nearest (or equal depth, earlier in
                    // requesting-project order), so it stays on the classpath.
                    // The conflict is recorded against the standing winner's
                    // version; mediate's own tie-break is unreliable here
                    // because declaration indices are per-parent.
                    let outcome = VersionMediator::mediate(
                        &key,
                        vec![winner.clone(), candidate.clone()],
                    )?;
                    if outcome.conflict.is_some() {
                        Self::record_conflict(
                            &mut conflicts,
                            &key,
                            &winner.version,
                            &candidate.version,
                        );
                        Self::push_node(
                            &mut arena,
                            &mut root_indices,
                            &item,
                            gav,
                            scope,
                            managed,
                            ResolutionState::ConflictLoser,
                        );
                    }
                    // Same-version duplicates collapse silently.
                    continue;
                }
                None => {
                    let idx = Self::push_node(
                        &mut arena,
                        &mut root_indices,
                        &item,
                        gav.clone(),
                        scope,
                        managed,
                        ResolutionState::Resolved,
                    );
                    winners.insert(key.clone(), (candidate, idx));

                    // Recurse into the winner's own declared dependencies
                    let mut child_path = item.path.clone();
                    child_path.push(key.clone());
                    let mut child_exclusions = item.exclusions.clone();
                    child_exclusions.extend(item.spec.exclusions.iter().cloned());

                    let children = self.metadata.dependencies_of(&gav)?;
                    for (child_index, child) in children.into_iter().enumerate() {
                        if child.optional || !child.scope.propagates() {
                            continue;
                        }
                        queue.push_back(QueueItem {
                            spec: child,
                            depth: item.depth + 1,
                            declaration_index: child_index,
                            parent: Some(idx),
                            path: child_path.clone(),
                            exclusions: child_exclusions.clone(),
                        });
                    }
                }
            }
        }

        let classpath: Vec<(Gav, Scope)> = arena
            .iter()
            .filter(|n| n.state == ResolutionState::Resolved)
            .map(|n| (n.gav.clone(), n.scope))
            .collect();

        debug!(
            project = %project.id(),
            artifacts = classpath.len(),
            conflicts = conflicts.len(),
            "Resolved dependency graph"
        );

        if let Some(cycle) = cycles.into_iter().next() {
            return Err(cycle);
        }

        let roots = root_indices
            .iter()
            .map(|&idx| Self::build_tree(&arena, idx))
            .collect();

        Ok(DependencyGraph {
            root: project.gav.clone(),
            roots,
            conflicts,
            classpath,
        })
    }

    fn push_node(
        arena: &mut Vec<ArenaNode>,
        root_indices: &mut Vec<usize>,
        item: &QueueItem,
        gav: Gav,
        scope: Scope,
        managed: bool,
        state: ResolutionState,
    ) -> usize {
        let idx = arena.len();
        arena.push(ArenaNode {
            gav,
            scope,
            managed,
            depth: item.depth,
            state,
            parent: item.parent,
            children: Vec::new(),
        });
        match item.parent {
            Some(parent) => arena[parent].children.push(idx),
            None => root_indices.push(idx),
        }
        idx
    }

    fn record_conflict(
        conflicts: &mut Vec<ConflictRecord>,
        key: &ArtifactKey,
        winning: &str,
        omitted: &str,
    ) {
        if winning == omitted {
            return;
        }
        if let Some(existing) = conflicts.iter_mut().find(|c| c.key == *key) {
            if !existing.omitted_versions.iter().any(|v| v == omitted) {
                existing.omitted_versions.push(omitted.to_string());
            }
            return;
        }
        conflicts.push(ConflictRecord {
            key: key.clone(),
            winning_version: winning.to_string(),
            omitted_versions: vec![omitted.to_string()],
        });
    }

    fn build_tree(arena: &[ArenaNode], idx: usize) -> DependencyNode {
        let node = &arena[idx];
        DependencyNode {
            gav: node.gav.clone(),
            scope: node.scope,
            managed: node.managed,
            depth: node.depth,
            state: node.state,
            children: node
                .children
                .iter()
                .map(|&child| Self::build_tree(arena, child))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn gav(artifact: &str, version: &str) -> Gav {
        Gav::new("g", artifact, version)
    }

    fn dep(artifact: &str, version: &str) -> DependencySpec {
        DependencySpec::new(gav(artifact, version))
    }

    fn project_with(deps: Vec<DependencySpec>) -> Project {
        let mut project = Project::new(Gav::new("com.acme", "root", "1.0"));
        project.dependencies = deps;
        project
    }

    fn versions(graph: &DependencyGraph) -> Vec<(String, String)> {
        graph
            .classpath()
            .iter()
            .map(|a| (a.gav.artifact.clone(), a.gav.version.clone()))
            .collect()
    }

    #[test]
    fn test_empty_project_resolves_empty_graph() {
        let metadata = InMemoryMetadataSource::new();
        let project = project_with(vec![]);
        let graph = GraphBuilder::new(&metadata)
            .resolve(&project, &ManagementRules::new())
            .unwrap();
        assert!(graph.classpath().is_empty());
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn test_transitive_resolution() {
        let mut metadata = InMemoryMetadataSource::new();
        metadata.insert(gav("app", "1.0"), vec![dep("lib", "1.0")]);
        metadata.insert(gav("lib", "1.0"), vec![dep("base", "1.0")]);

        let project = project_with(vec![dep("app", "1.0")]);
        let graph = GraphBuilder::new(&metadata)
            .resolve(&project, &ManagementRules::new())
            .unwrap();

        assert_eq!(
            versions(&graph),
            vec![
                ("app".to_string(), "1.0".to_string()),
                ("lib".to_string(), "1.0".to_string()),
                ("base".to_string(), "1.0".to_string()),
            ]
        );
        let app = graph.find(&ArtifactKey::new("g", "app")).unwrap();
        assert_eq!(app.depth, 1);
        assert_eq!(app.children.len(), 1);
        assert_eq!(app.children[0].depth, 2);
    }

    #[test]
    fn test_nearest_wins_over_deeper_version() {
        // root declares lib:1.0 directly and app:1.0 which pulls lib:2.0
        let mut metadata = InMemoryMetadataSource::new();
        metadata.insert(gav("app", "1.0"), vec![dep("lib", "2.0")]);

        let project = project_with(vec![dep("lib", "1.0"), dep("app", "1.0")]);
        let graph = GraphBuilder::new(&metadata)
            .resolve(&project, &ManagementRules::new())
            .unwrap();

        let lib = graph.find(&ArtifactKey::new("g", "lib")).unwrap();
        assert_eq!(lib.gav.version, "1.0");
        assert_eq!(lib.depth, 1);

        assert_eq!(graph.conflicts.len(), 1);
        assert_eq!(graph.conflicts[0].winning_version, "1.0");
        assert_eq!(graph.conflicts[0].omitted_versions, vec!["2.0"]);

        // Loser retained for diagnostics, off the classpath
        let app = &graph.roots[1];
        assert_eq!(app.children[0].state, ResolutionState::ConflictLoser);
        assert_eq!(versions(&graph).len(), 2);
    }

    #[test]
    fn test_equal_depth_first_declared_wins() {
        let mut metadata = InMemoryMetadataSource::new();
        metadata.insert(gav("a", "1.0"), vec![dep("lib", "1.0")]);
        metadata.insert(gav("b", "1.0"), vec![dep("lib", "2.0")]);

        let project = project_with(vec![dep("a", "1.0"), dep("b", "1.0")]);
        let graph = GraphBuilder::new(&metadata)
            .resolve(&project, &ManagementRules::new())
            .unwrap();

        let lib = graph.find(&ArtifactKey::new("g", "lib")).unwrap();
        assert_eq!(lib.gav.version, "1.0");
    }

    #[test]
    fn test_management_pin_dominates_any_depth() {
        let mut metadata = InMemoryMetadataSource::new();
        metadata.insert(gav("app", "1.0"), vec![dep("lib", "3.0")]);

        let mut management = ManagementRules::new();
        management.pin_version(ArtifactKey::new("g", "lib"), "2.0");

        let project = project_with(vec![dep("lib", "1.0"), dep("app", "1.0")]);
        let graph = GraphBuilder::new(&metadata)
            .resolve(&project, &management)
            .unwrap();

        let lib = graph.find(&ArtifactKey::new("g", "lib")).unwrap();
        assert_eq!(lib.gav.version, "2.0");
        assert!(lib.managed);

        let conflict = graph
            .conflicts
            .iter()
            .find(|c| c.key == ArtifactKey::new("g", "lib"))
            .unwrap();
        assert_eq!(conflict.winning_version, "2.0");
        assert!(conflict.omitted_versions.contains(&"1.0".to_string()));
        assert!(conflict.omitted_versions.contains(&"3.0".to_string()));
    }

    #[test]
    fn test_management_scope_override_applies_to_node() {
        use crate::artifact::ManagedDependency;

        let mut management = ManagementRules::new();
        management.insert(ManagedDependency {
            key: ArtifactKey::new("g", "lib"),
            version: None,
            scope: Some(Scope::Runtime),
        });

        let metadata = InMemoryMetadataSource::new();
        let project = project_with(vec![dep("lib", "1.0")]);
        let graph = GraphBuilder::new(&metadata)
            .resolve(&project, &management)
            .unwrap();

        let lib = graph.find(&ArtifactKey::new("g", "lib")).unwrap();
        assert_eq!(lib.scope, Scope::Runtime);
        // A scope-only rule does not mark the version as managed
        assert!(!lib.managed);
        assert_eq!(lib.gav.version, "1.0");

        let classpath = graph.classpath();
        assert_eq!(classpath[0].scope, Scope::Runtime);
    }

    #[test]
    fn test_equal_depth_conflict_across_parents_is_recorded() {
        // lib:1.0 arrives as a's second child, lib:2.0 as b's first;
        // the per-parent child indices must not hide the conflict.
        let mut metadata = InMemoryMetadataSource::new();
        metadata.insert(gav("a", "1.0"), vec![dep("x", "1.0"), dep("lib", "1.0")]);
        metadata.insert(gav("b", "1.0"), vec![dep("lib", "2.0")]);

        let project = project_with(vec![dep("a", "1.0"), dep("b", "1.0")]);
        let graph = GraphBuilder::new(&metadata)
            .resolve(&project, &ManagementRules::new())
            .unwrap();

        let lib = graph.find(&ArtifactKey::new("g", "lib")).unwrap();
        assert_eq!(lib.gav.version, "1.0");

        assert_eq!(graph.conflicts.len(), 1);
        assert_eq!(graph.conflicts[0].winning_version, "1.0");
        assert_eq!(graph.conflicts[0].omitted_versions, vec!["2.0"]);

        // Loser retained under b for diagnostics
        let b = &graph.roots[1];
        assert_eq!(b.children[0].state, ResolutionState::ConflictLoser);
        assert_eq!(b.children[0].gav.version, "2.0");
    }

    #[test]
    fn test_exclusion_prunes_subtree() {
        let mut metadata = InMemoryMetadataSource::new();
        metadata.insert(gav("app", "1.0"), vec![dep("lib", "1.0")]);
        metadata.insert(gav("lib", "1.0"), vec![dep("base", "1.0")]);

        let project = project_with(vec![
            dep("app", "1.0").with_exclusion(ArtifactKey::new("g", "lib"))
        ]);
        let graph = GraphBuilder::new(&metadata)
            .resolve(&project, &ManagementRules::new())
            .unwrap();

        assert_eq!(versions(&graph), vec![("app".to_string(), "1.0".to_string())]);
        assert!(graph.find(&ArtifactKey::new("g", "lib")).is_none());
        assert!(graph.find(&ArtifactKey::new("g", "base")).is_none());
    }

    #[test]
    fn test_test_scope_does_not_propagate() {
        let mut metadata = InMemoryMetadataSource::new();
        metadata.insert(
            gav("app", "1.0"),
            vec![
                dep("harness", "1.0").with_scope(Scope::Test),
                dep("container", "1.0").with_scope(Scope::Provided),
                dep("lib", "1.0"),
            ],
        );

        let project = project_with(vec![
            dep("app", "1.0"),
            dep("junit", "4.0").with_scope(Scope::Test),
        ]);
        let graph = GraphBuilder::new(&metadata)
            .resolve(&project, &ManagementRules::new())
            .unwrap();

        // Direct test-scope dependency is kept; transitive test and
        // provided dependencies are not.
        let names: Vec<String> = graph
            .classpath()
            .iter()
            .map(|a| a.gav.artifact.clone())
            .collect();
        assert_eq!(names, vec!["app", "junit", "lib"]);
    }

    #[test]
    fn test_optional_does_not_propagate() {
        let mut metadata = InMemoryMetadataSource::new();
        metadata.insert(gav("app", "1.0"), vec![dep("extra", "1.0").optional()]);

        let project = project_with(vec![dep("app", "1.0")]);
        let graph = GraphBuilder::new(&metadata)
            .resolve(&project, &ManagementRules::new())
            .unwrap();

        assert!(graph.find(&ArtifactKey::new("g", "extra")).is_none());
    }

    #[test]
    fn test_cycle_fails_with_full_path() {
        let mut metadata = InMemoryMetadataSource::new();
        metadata.insert(gav("a", "1.0"), vec![dep("b", "1.0")]);
        metadata.insert(gav("b", "1.0"), vec![dep("a", "1.0")]);

        let project = project_with(vec![dep("a", "1.0")]);
        let result = GraphBuilder::new(&metadata).resolve(&project, &ManagementRules::new());

        match result {
            Err(ResolveError::DependencyCycle { path }) => {
                assert_eq!(path, "com.acme:root -> g:a -> g:b -> g:a");
            }
            other => panic!("Expected DependencyCycle, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_same_version_collapses_without_conflict() {
        let mut metadata = InMemoryMetadataSource::new();
        metadata.insert(gav("a", "1.0"), vec![dep("base", "1.0")]);
        metadata.insert(gav("b", "1.0"), vec![dep("base", "1.0")]);

        let project = project_with(vec![dep("a", "1.0"), dep("b", "1.0")]);
        let graph = GraphBuilder::new(&metadata)
            .resolve(&project, &ManagementRules::new())
            .unwrap();

        assert!(graph.conflicts.is_empty());
        let base_count = versions(&graph)
            .iter()
            .filter(|(a, _)| a == "base")
            .count();
        assert_eq!(base_count, 1);
    }

    #[test]
    fn test_materialize_classpath() {
        let metadata = InMemoryMetadataSource::new();
        let project = project_with(vec![dep("lib", "1.0")]);
        let graph = GraphBuilder::new(&metadata)
            .resolve(&project, &ManagementRules::new())
            .unwrap();

        let mut store = InMemoryArtifactStore::new();
        store.insert(gav("lib", "1.0"), PathBuf::from("/repo/g/lib/1.0/lib.jar"));

        let classpath = graph.materialize(&store).unwrap();
        assert_eq!(classpath.len(), 1);
        assert_eq!(
            classpath[0].path.as_deref(),
            Some(std::path::Path::new("/repo/g/lib/1.0/lib.jar"))
        );

        let empty = InMemoryArtifactStore::new();
        assert!(matches!(
            graph.materialize(&empty),
            Err(ResolveError::NotFound { .. })
        ));
    }
}
