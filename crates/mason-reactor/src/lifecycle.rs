//! Lifecycle phases and task expansion
//!
//! A build request names phases or goals. A phase runs every goal the
//! project binds to that phase and to all earlier phases, in phase
//! order then binding declaration order. A goal id (containing ':')
//! runs just itself.

use crate::error::{ReactorError, ReactorResult};
use mason_resolver::{Project, ResolveError, ResolvedArtifact};

/// The standard lifecycle, in execution order
pub const STANDARD_PHASES: [&str; 11] = [
    "validate",
    "initialize",
    "generate-sources",
    "process-sources",
    "compile",
    "test-compile",
    "test",
    "package",
    "verify",
    "install",
    "deploy",
];

/// Position of a phase in the standard lifecycle
pub fn phase_index(phase: &str) -> Option<usize> {
    STANDARD_PHASES.iter().position(|p| *p == phase)
}

/// One unit of build work for a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Goal identifier handed to the goal runner
    pub goal: String,
    /// The phase that bound this goal, if any
    pub phase: Option<String>,
}

impl Task {
    /// A goal bound by a phase
    pub fn bound(goal: impl Into<String>, phase: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            phase: Some(phase.into()),
        }
    }

    /// A directly requested goal
    pub fn direct(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            phase: None,
        }
    }
}

/// Expand the requested phases/goals into the project's ordered task list
pub fn expand_tasks(project: &Project, requested: &[String]) -> ReactorResult<Vec<Task>> {
    let mut tasks = Vec::new();

    for request in requested {
        match phase_index(request) {
            Some(limit) => {
                for phase in &STANDARD_PHASES[..=limit] {
                    for binding in &project.bindings {
                        if binding.phase == *phase {
                            tasks.push(Task::bound(binding.goal.clone(), *phase));
                        }
                    }
                }
            }
            None if request.contains(':') => {
                tasks.push(Task::direct(request.clone()));
            }
            None => {
                return Err(ReactorError::UnknownTask {
                    task: request.clone(),
                });
            }
        }
    }

    Ok(tasks)
}

/// A project paired with its computed tasks and resolved classpath;
/// consumed by the executor, immutable
#[derive(Debug, Clone)]
pub struct ProjectSegment {
    pub project: Project,
    pub tasks: Vec<Task>,
    pub classpath: Vec<ResolvedArtifact>,
    /// Set when dependency resolution failed; the executor fails the
    /// project before it ever starts running
    pub resolution_error: Option<ResolveError>,
}

impl ProjectSegment {
    /// Segment for a project that resolved successfully
    pub fn new(project: Project, tasks: Vec<Task>, classpath: Vec<ResolvedArtifact>) -> Self {
        Self {
            project,
            tasks,
            classpath,
            resolution_error: None,
        }
    }

    /// Segment for a project whose resolution failed
    pub fn failed(project: Project, error: ResolveError) -> Self {
        Self {
            project,
            tasks: Vec::new(),
            classpath: Vec::new(),
            resolution_error: Some(error),
        }
    }
}
