//! End-of-build reporting
//!
//! `BuildSummary` is a frozen view of the reactor context taken once
//! every project is terminal. Rendering follows the familiar reactor
//! summary layout: one dotted line per project in build order, then the
//! overall verdict and total time.

use crate::context::{BuildState, ReactorBuildResult, ReactorContext};
use std::fmt;
use std::time::Duration;

/// Frozen per-project results plus the wall-clock total
#[derive(Debug, Clone)]
pub struct BuildSummary {
    entries: Vec<(String, ReactorBuildResult)>,
    elapsed: Duration,
}

impl BuildSummary {
    /// Snapshot the context after execution
    pub fn from_context(context: &ReactorContext, elapsed: Duration) -> Self {
        Self {
            entries: context.snapshot(),
            elapsed,
        }
    }

    /// Per-project results in build order
    pub fn entries(&self) -> &[(String, ReactorBuildResult)] {
        &self.entries
    }

    /// Total wall-clock build time
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Whether every project succeeded or was deliberately skipped
    /// without a failure anywhere
    pub fn succeeded(&self) -> bool {
        !self
            .entries
            .iter()
            .any(|(_, r)| r.state == BuildState::Failed)
    }

    /// Project ids that failed, in build order
    pub fn failed_projects(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, r)| r.state == BuildState::Failed)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Process exit code: zero only when no project failed
    pub fn exit_code(&self) -> i32 {
        if self.succeeded() {
            0
        } else {
            1
        }
    }
}

impl fmt::Display for BuildSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Reactor Summary:")?;
        let width = self
            .entries
            .iter()
            .map(|(id, _)| id.len())
            .max()
            .unwrap_or(0);
        for (id, result) in &self.entries {
            let dots = ".".repeat(width - id.len() + 4);
            match result.state {
                BuildState::Success | BuildState::Failed => writeln!(
                    f,
                    "{} {} {} [{:>7.3} s]",
                    id,
                    dots,
                    result.state,
                    result.duration.as_secs_f64()
                )?,
                _ => writeln!(f, "{} {} {}", id, dots, result.state)?,
            }
        }

        let failures: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, r)| r.state == BuildState::Failed)
            .collect();
        if !failures.is_empty() {
            writeln!(f, "Failures:")?;
            for (id, result) in &failures {
                match &result.failure {
                    Some(detail) => writeln!(f, "  {}: {}", id, detail)?,
                    None => writeln!(f, "  {}", id)?,
                }
            }
        }

        writeln!(
            f,
            "{}",
            if self.succeeded() {
                "BUILD SUCCESS"
            } else {
                "BUILD FAILURE"
            }
        )?;
        write!(f, "Total time: {:.3} s", self.elapsed.as_secs_f64())
    }
}
