//! Reactor build order computation
//!
//! Builds a directed graph over the reactor's projects from
//! inter-module dependencies, parent relations, explicit build-after
//! hints and plugin prerequisites, then produces a deterministic
//! topological ordering via depth-first search. A back-edge fails the
//! sort with the offending cycle path reconstructed from the active
//! recursion stack.

use crate::error::{ReactorError, ReactorResult};
use mason_resolver::{ArtifactKey, Project};
use std::collections::HashMap;
use tracing::debug;

/// Why one project must build before another
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeReason {
    Dependency,
    Parent,
    ExplicitOrder,
    PluginPrerequisite,
}

/// Projects in build order, with the upstream relation retained for the
/// executor
#[derive(Debug, Clone)]
pub struct SortedProjects {
    order: Vec<Project>,
    upstream: HashMap<ArtifactKey, Vec<ArtifactKey>>,
}

impl SortedProjects {
    /// Projects in the order they must build
    pub fn order(&self) -> &[Project] {
        &self.order
    }

    /// Direct upstream projects of `key` (projects that must reach a
    /// terminal state before `key` may start)
    pub fn upstream_of(&self, key: &ArtifactKey) -> &[ArtifactKey] {
        self.upstream.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of projects
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the reactor is empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Topological sorter over the reactor's project set
pub struct ProjectSorter;

impl ProjectSorter {
    /// Sort projects into build order.
    ///
    /// The ordering is deterministic for identical input order: ties
    /// are broken by the original input position.
    pub fn sort(projects: Vec<Project>) -> ReactorResult<SortedProjects> {
        let mut index: HashMap<ArtifactKey, usize> = HashMap::new();
        for (i, project) in projects.iter().enumerate() {
            if index.insert(project.key(), i).is_some() {
                return Err(ReactorError::DuplicateProject {
                    id: project.id(),
                });
            }
        }

        let upstream_edges = Self::build_edges(&projects, &index);

        // DFS in input order, upstreams first, postorder append. This
        // yields a topological order with stable input-order tie-breaks.
        let mut state = vec![VisitState::Unvisited; projects.len()];
        let mut stack = Vec::new();
        let mut order_indices = Vec::with_capacity(projects.len());
        for i in 0..projects.len() {
            Self::visit(
                i,
                &projects,
                &upstream_edges,
                &mut state,
                &mut stack,
                &mut order_indices,
            )?;
        }

        let upstream = projects
            .iter()
            .enumerate()
            .map(|(i, project)| {
                let keys = upstream_edges[i]
                    .iter()
                    .map(|&(u, _)| projects[u].key())
                    .collect();
                (project.key(), keys)
            })
            .collect();

        let order: Vec<Project> = order_indices.iter().map(|&i| projects[i].clone()).collect();

        Ok(SortedProjects { order, upstream })
    }

    /// Collect upstream edges per project, in input-index order, deduped
    fn build_edges(
        projects: &[Project],
        index: &HashMap<ArtifactKey, usize>,
    ) -> Vec<Vec<(usize, EdgeReason)>> {
        let mut edges: Vec<Vec<(usize, EdgeReason)>> = vec![Vec::new(); projects.len()];

        for (q, project) in projects.iter().enumerate() {
            let mut add = |edges: &mut Vec<(usize, EdgeReason)>, p: usize, reason: EdgeReason| {
                // A project referencing itself (e.g. a plugin dependency on
                // the current project) is not an ordering constraint.
                if p != q && !edges.iter().any(|&(u, _)| u == p) {
                    debug!(
                        upstream = %projects[p].id(),
                        downstream = %project.id(),
                        ?reason,
                        "Reactor edge"
                    );
                    edges.push((p, reason));
                }
            };

            for dep in &project.dependencies {
                if let Some(&p) = index.get(&dep.gav.key()) {
                    add(&mut edges[q], p, EdgeReason::Dependency);
                }
            }
            if let Some(parent) = &project.parent {
                if let Some(&p) = index.get(&parent.key()) {
                    add(&mut edges[q], p, EdgeReason::Parent);
                }
            }
            for key in &project.build_after {
                if let Some(&p) = index.get(key) {
                    add(&mut edges[q], p, EdgeReason::ExplicitOrder);
                }
            }
            for plugin in &project.plugins {
                if let Some(&p) = index.get(&plugin.key()) {
                    add(&mut edges[q], p, EdgeReason::PluginPrerequisite);
                }
            }

            edges[q].sort_by_key(|&(u, _)| u);
        }

        edges
    }

    fn visit(
        node: usize,
        projects: &[Project],
        upstream_edges: &[Vec<(usize, EdgeReason)>],
        state: &mut [VisitState],
        stack: &mut Vec<usize>,
        order: &mut Vec<usize>,
    ) -> ReactorResult<()> {
        match state[node] {
            VisitState::Done => return Ok(()),
            VisitState::InStack => {
                // Back-edge: the cycle is the tail of the recursion stack
                // from the first occurrence of `node`.
                let start = stack
                    .iter()
                    .position(|&n| n == node)
                    .unwrap_or(0);
                let mut path: Vec<String> =
                    stack[start..].iter().map(|&n| projects[n].id()).collect();
                path.push(projects[node].id());
                return Err(ReactorError::project_cycle(&path));
            }
            VisitState::Unvisited => {}
        }

        state[node] = VisitState::InStack;
        stack.push(node);

        for &(up, _) in &upstream_edges[node] {
            Self::visit(up, projects, upstream_edges, state, stack, order)?;
        }

        stack.pop();
        state[node] = VisitState::Done;
        order.push(node);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum VisitState {
    Unvisited,
    InStack,
    Done,
}
