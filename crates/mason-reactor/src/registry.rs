//! Goal registry and the goal-runner seam
//!
//! Goal implementations are external collaborators: the executor hands
//! a runner the project, the goal id and the resolved classpath, and
//! receives success or a failure detail. Runners are registered
//! explicitly at startup; every goal identifier resolves to exactly
//! one runner.

use crate::error::{ReactorError, ReactorResult};
use mason_resolver::{Project, ResolvedArtifact};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Why a goal (or a project) failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureDetail {
    /// The failing goal, if the failure came from goal execution
    pub goal: Option<String>,
    pub message: String,
}

impl FailureDetail {
    /// Failure reported by a goal runner
    pub fn goal(goal: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            goal: Some(goal.into()),
            message: message.into(),
        }
    }

    /// Failure that happened before any goal ran (e.g. resolution)
    pub fn build(message: impl Into<String>) -> Self {
        Self {
            goal: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for FailureDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.goal {
            Some(goal) => write!(f, "goal {} failed: {}", goal, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Executes one goal against a project. Implementations may have
/// arbitrary side effects on disk; the executor never interprets goal
/// semantics.
pub trait GoalRunner: Send + Sync {
    fn run(
        &self,
        project: &Project,
        goal: &str,
        classpath: &[ResolvedArtifact],
    ) -> Result<(), FailureDetail>;
}

impl<F> GoalRunner for F
where
    F: Fn(&Project, &str, &[ResolvedArtifact]) -> Result<(), FailureDetail> + Send + Sync,
{
    fn run(
        &self,
        project: &Project,
        goal: &str,
        classpath: &[ResolvedArtifact],
    ) -> Result<(), FailureDetail> {
        self(project, goal, classpath)
    }
}

/// Maps goal identifiers to runners
#[derive(Default, Clone)]
pub struct GoalRegistry {
    runners: HashMap<String, Arc<dyn GoalRunner>>,
}

impl GoalRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a runner for a goal id. Registering the same id twice
    /// is an error.
    pub fn register(
        &mut self,
        goal: impl Into<String>,
        runner: Arc<dyn GoalRunner>,
    ) -> ReactorResult<()> {
        let goal = goal.into();
        if self.runners.contains_key(&goal) {
            return Err(ReactorError::DuplicateGoal { goal });
        }
        self.runners.insert(goal, runner);
        Ok(())
    }

    /// Look up the runner for a goal id
    pub fn runner_for(&self, goal: &str) -> ReactorResult<&Arc<dyn GoalRunner>> {
        self.runners
            .get(goal)
            .ok_or_else(|| ReactorError::unknown_goal(goal))
    }

    /// Whether a runner is registered for `goal`
    pub fn contains(&self, goal: &str) -> bool {
        self.runners.contains_key(goal)
    }

    /// Number of registered goals
    pub fn len(&self) -> usize {
        self.runners.len()
    }

    /// Check if no goals are registered
    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }
}

impl fmt::Debug for GoalRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut goals: Vec<&str> = self.runners.keys().map(String::as_str).collect();
        goals.sort_unstable();
        f.debug_struct("GoalRegistry").field("goals", &goals).finish()
    }
}
