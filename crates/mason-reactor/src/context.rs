//! Reactor-wide build state
//!
//! `ReactorContext` is the only mutable state shared between workers.
//! Each project's result is written by the single worker that owns its
//! execution; transitions are guarded per entry, and a terminal state
//! (success, failed, skipped) is written exactly once and never
//! regresses.

use crate::registry::FailureDetail;
use dashmap::DashMap;
use mason_resolver::ArtifactKey;
use std::fmt;
use std::time::Duration;
use tracing::warn;

/// Per-project build state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    NotStarted,
    InProgress,
    Success,
    Skipped,
    Failed,
}

impl BuildState {
    /// Whether this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, BuildState::Success | BuildState::Skipped | BuildState::Failed)
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuildState::NotStarted => "NOT STARTED",
            BuildState::InProgress => "IN PROGRESS",
            BuildState::Success => "SUCCESS",
            BuildState::Skipped => "SKIPPED",
            BuildState::Failed => "FAILURE",
        };
        f.write_str(s)
    }
}

/// Why a project was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipCause {
    /// An upstream project failed or was skipped
    Upstream { id: String },
    /// Fail-fast halted dispatch after an unrelated failure
    Halted,
}

impl fmt::Display for SkipCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipCause::Upstream { id } => write!(f, "upstream {} did not succeed", id),
            SkipCause::Halted => f.write_str("build halted after earlier failure"),
        }
    }
}

/// The recorded outcome of one project's build
#[derive(Debug, Clone, PartialEq)]
pub struct ReactorBuildResult {
    pub state: BuildState,
    pub failure: Option<FailureDetail>,
    pub skip_cause: Option<SkipCause>,
    pub duration: Duration,
}

impl ReactorBuildResult {
    fn not_started() -> Self {
        Self {
            state: BuildState::NotStarted,
            failure: None,
            skip_cause: None,
            duration: Duration::ZERO,
        }
    }
}

/// Thread-safe mapping from project identity to build result, created
/// at build start and finalized at build end
#[derive(Debug)]
pub struct ReactorContext {
    results: DashMap<ArtifactKey, ReactorBuildResult>,
    /// Reactor build order, for stable snapshots
    order: Vec<(ArtifactKey, String)>,
}

impl ReactorContext {
    /// Create a context with every project NotStarted. `projects` is
    /// (key, display id) in build order.
    pub fn new(projects: Vec<(ArtifactKey, String)>) -> Self {
        let results = DashMap::with_capacity(projects.len());
        for (key, _) in &projects {
            results.insert(key.clone(), ReactorBuildResult::not_started());
        }
        Self {
            results,
            order: projects,
        }
    }

    /// Current state of a project; NotStarted for unknown keys
    pub fn state(&self, key: &ArtifactKey) -> BuildState {
        self.results
            .get(key)
            .map(|r| r.state)
            .unwrap_or(BuildState::NotStarted)
    }

    /// NotStarted -> InProgress. Returns false if the project was not
    /// in NotStarted.
    pub fn mark_running(&self, key: &ArtifactKey) -> bool {
        self.transition(key, |result| {
            if result.state == BuildState::NotStarted {
                result.state = BuildState::InProgress;
                true
            } else {
                false
            }
        })
    }

    /// InProgress -> Success
    pub fn mark_success(&self, key: &ArtifactKey, duration: Duration) -> bool {
        self.transition(key, |result| {
            if result.state == BuildState::InProgress {
                result.state = BuildState::Success;
                result.duration = duration;
                true
            } else {
                false
            }
        })
    }

    /// NotStarted or InProgress -> Failed. Resolution failures fail a
    /// project before it ever starts running.
    pub fn mark_failed(
        &self,
        key: &ArtifactKey,
        failure: FailureDetail,
        duration: Duration,
    ) -> bool {
        self.transition(key, |result| {
            if result.state.is_terminal() {
                false
            } else {
                result.state = BuildState::Failed;
                result.failure = Some(failure);
                result.duration = duration;
                true
            }
        })
    }

    /// NotStarted -> Skipped
    pub fn mark_skipped(&self, key: &ArtifactKey, cause: SkipCause) -> bool {
        self.transition(key, |result| {
            if result.state == BuildState::NotStarted {
                result.state = BuildState::Skipped;
                result.skip_cause = Some(cause);
                true
            } else {
                false
            }
        })
    }

    /// Consistent copy of every project's result, in build order
    pub fn snapshot(&self) -> Vec<(String, ReactorBuildResult)> {
        self.order
            .iter()
            .map(|(key, id)| {
                let result = self
                    .results
                    .get(key)
                    .map(|r| r.clone())
                    .unwrap_or_else(ReactorBuildResult::not_started);
                (id.clone(), result)
            })
            .collect()
    }

    /// Number of projects in the reactor
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the reactor is empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn transition<F>(&self, key: &ArtifactKey, apply: F) -> bool
    where
        F: FnOnce(&mut ReactorBuildResult) -> bool,
    {
        match self.results.get_mut(key) {
            Some(mut entry) => {
                let applied = apply(entry.value_mut());
                if !applied {
                    warn!(project = %key, state = %entry.state, "Rejected state transition");
                }
                applied
            }
            None => false,
        }
    }
}
