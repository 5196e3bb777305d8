//! Mason reactor: multi-project build scheduling and execution
//!
//! Given the set of projects in a multi-module build, computes a
//! deterministic topological build order, expands each project's
//! lifecycle tasks, and executes goals across a bounded worker pool
//! while honoring inter-project ordering and the active failure
//! policy (fail-fast, fail-at-end, fail-never).

pub mod context;
pub mod error;
pub mod executor;
pub mod lifecycle;
pub mod registry;
pub mod report;
pub mod session;
pub mod sorter;

pub use context::{BuildState, ReactorBuildResult, ReactorContext, SkipCause};
pub use error::{ReactorError, ReactorResult};
pub use executor::{BuildPlanExecutor, ExecutorConfig, FailurePolicy, ReactorPlan};
pub use lifecycle::{expand_tasks, ProjectSegment, Task, STANDARD_PHASES};
pub use registry::{FailureDetail, GoalRegistry, GoalRunner};
pub use report::BuildSummary;
pub use session::{ReactorSession, SessionConfig};
pub use sorter::{EdgeReason, ProjectSorter, SortedProjects};
