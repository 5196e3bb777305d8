/// Reactor error types
use mason_resolver::ResolveError;
use thiserror::Error;

pub type ReactorResult<T> = Result<T, ReactorError>;

#[derive(Debug, Error)]
pub enum ReactorError {
    #[error("Project cycle detected: {path}")]
    ProjectCycle { path: String },

    #[error("Duplicate project in reactor: {id}")]
    DuplicateProject { id: String },

    #[error("No runner registered for goal '{goal}'")]
    UnknownGoal { goal: String },

    #[error("Goal '{goal}' is already registered")]
    DuplicateGoal { goal: String },

    #[error("Unknown lifecycle phase or goal: {task}")]
    UnknownTask { task: String },

    #[error("Failed to build worker pool: {0}")]
    Pool(String),

    #[error(transparent)]
    Resolution(#[from] ResolveError),
}

impl ReactorError {
    /// Create a project cycle error from the offending path
    pub fn project_cycle(path: &[String]) -> Self {
        Self::ProjectCycle {
            path: path.join(" -> "),
        }
    }

    /// Create an unknown-goal error
    pub fn unknown_goal(goal: impl Into<String>) -> Self {
        Self::UnknownGoal { goal: goal.into() }
    }
}
