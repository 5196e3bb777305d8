//! Concurrent build plan execution
//!
//! Schedules project segments across a bounded worker pool. A project
//! becomes ready only when every upstream project has reached a
//! terminal state compatible with the active failure policy; readiness
//! is tracked with per-project atomic counters decremented as upstreams
//! finish, so workers never poll. Goals within one project run strictly
//! sequentially on a single worker; independent projects run
//! concurrently up to the pool size. Under fail-fast, in-flight
//! projects run to completion and only new dispatch is halted.

use crate::context::{BuildState, ReactorContext, SkipCause};
use crate::error::{ReactorError, ReactorResult};
use crate::lifecycle::ProjectSegment;
use crate::registry::{FailureDetail, GoalRegistry};
use crate::sorter::SortedProjects;
use mason_resolver::ArtifactKey;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How a single project's failure affects the rest of the reactor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop dispatching new projects after the first failure
    #[default]
    FailFast,
    /// Keep building everything not downstream of a failure; report all
    /// failures at the end
    FailAtEnd,
    /// Failures never block downstream projects
    FailNever,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailurePolicy::FailFast => "fail-fast",
            FailurePolicy::FailAtEnd => "fail-at-end",
            FailurePolicy::FailNever => "fail-never",
        };
        f.write_str(s)
    }
}

/// Executor configuration
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Worker pool size
    pub threads: usize,
    /// Active failure policy
    pub policy: FailurePolicy,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            policy: FailurePolicy::default(),
        }
    }
}

impl ExecutorConfig {
    /// Set the worker pool size
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Set the failure policy
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Segments in build order plus the upstream/downstream relation,
/// read-only during execution
#[derive(Debug)]
pub struct ReactorPlan {
    segments: Vec<ProjectSegment>,
    upstream: Vec<Vec<usize>>,
    downstream: Vec<Vec<usize>>,
}

impl ReactorPlan {
    /// Build a plan from segments in build order and the sorted
    /// upstream relation
    pub fn new(segments: Vec<ProjectSegment>, sorted: &SortedProjects) -> Self {
        let index: HashMap<ArtifactKey, usize> = segments
            .iter()
            .enumerate()
            .map(|(i, s)| (s.project.key(), i))
            .collect();

        let mut upstream = vec![Vec::new(); segments.len()];
        let mut downstream = vec![Vec::new(); segments.len()];
        for (i, segment) in segments.iter().enumerate() {
            for up_key in sorted.upstream_of(&segment.project.key()) {
                if let Some(&u) = index.get(up_key) {
                    upstream[i].push(u);
                    downstream[u].push(i);
                }
            }
        }

        Self {
            segments,
            upstream,
            downstream,
        }
    }

    /// Segments in build order
    pub fn segments(&self) -> &[ProjectSegment] {
        &self.segments
    }

    /// (key, display id) pairs in build order, for context creation
    pub fn project_ids(&self) -> Vec<(ArtifactKey, String)> {
        self.segments
            .iter()
            .map(|s| (s.project.key(), s.project.id()))
            .collect()
    }

    /// Number of projects in the plan
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Check if the plan is empty
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Shared read-only execution state; `ReactorContext` is the only
/// mutable resource behind it
struct ExecState<'e> {
    plan: &'e ReactorPlan,
    registry: &'e GoalRegistry,
    context: &'e ReactorContext,
    pending: Vec<AtomicUsize>,
    halted: AtomicBool,
    policy: FailurePolicy,
}

/// Schedules ready projects onto a bounded rayon pool
pub struct BuildPlanExecutor {
    config: ExecutorConfig,
}

impl BuildPlanExecutor {
    /// Create an executor
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Execute the plan. Per-project outcomes land in `context`; the
    /// returned error covers executor setup only.
    pub fn execute(
        &self,
        plan: &ReactorPlan,
        registry: &GoalRegistry,
        context: &ReactorContext,
    ) -> ReactorResult<()> {
        if plan.is_empty() {
            return Ok(());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()
            .map_err(|e| ReactorError::Pool(e.to_string()))?;

        let state = ExecState {
            plan,
            registry,
            context,
            pending: plan
                .upstream
                .iter()
                .map(|u| AtomicUsize::new(u.len()))
                .collect(),
            halted: AtomicBool::new(false),
            policy: self.config.policy,
        };

        info!(
            projects = plan.len(),
            threads = self.config.threads,
            policy = %self.config.policy,
            "Starting reactor build"
        );

        pool.scope(|scope| {
            for (i, count) in state.pending.iter().enumerate() {
                if count.load(Ordering::Acquire) == 0 {
                    spawn_project(scope, &state, i);
                }
            }
        });

        Ok(())
    }
}

fn spawn_project<'s>(scope: &rayon::Scope<'s>, state: &'s ExecState<'s>, idx: usize) {
    scope.spawn(move |scope| run_project(scope, state, idx));
}

/// Execute one project end to end, then release its dependents.
/// Every path marks a terminal state before releasing.
fn run_project<'s>(scope: &rayon::Scope<'s>, state: &'s ExecState<'s>, idx: usize) {
    let segment = &state.plan.segments[idx];
    let key = segment.project.key();
    let id = segment.project.id();

    // Resolution errors abort the project before it ever runs
    if let Some(error) = &segment.resolution_error {
        warn!(project = %id, error = %error, "Dependency resolution failed");
        state
            .context
            .mark_failed(&key, FailureDetail::build(error.to_string()), Duration::ZERO);
        note_failure(state);
        return release_downstream(scope, state, idx);
    }

    // Upstream gate: all upstreams are terminal here (the readiness
    // counter reached zero); under fail-never any terminal state is
    // acceptable, otherwise every upstream must have succeeded.
    if state.policy != FailurePolicy::FailNever {
        for &u in &state.plan.upstream[idx] {
            let upstream = &state.plan.segments[u].project;
            if state.context.state(&upstream.key()) != BuildState::Success {
                debug!(project = %id, upstream = %upstream.id(), "Skipping project");
                state.context.mark_skipped(
                    &key,
                    SkipCause::Upstream {
                        id: upstream.id(),
                    },
                );
                return release_downstream(scope, state, idx);
            }
        }
    }

    // Fail-fast halts dispatch of projects not yet started
    if state.policy == FailurePolicy::FailFast && state.halted.load(Ordering::Acquire) {
        state.context.mark_skipped(&key, SkipCause::Halted);
        return release_downstream(scope, state, idx);
    }

    state.context.mark_running(&key);
    info!(project = %id, tasks = segment.tasks.len(), "Building project");
    let start = Instant::now();

    let mut failure = None;
    for task in &segment.tasks {
        let outcome = match state.registry.runner_for(&task.goal) {
            Ok(runner) => runner.run(&segment.project, &task.goal, &segment.classpath),
            Err(error) => Err(FailureDetail::build(error.to_string())),
        };
        if let Err(detail) = outcome {
            // Later goals may depend on this one's side effects; stop here
            failure = Some(detail);
            break;
        }
    }

    let elapsed = start.elapsed();
    match failure {
        None => {
            state.context.mark_success(&key, elapsed);
            info!(project = %id, elapsed_ms = elapsed.as_millis() as u64, "Project built");
        }
        Some(detail) => {
            warn!(project = %id, failure = %detail, "Project failed");
            state.context.mark_failed(&key, detail, elapsed);
            note_failure(state);
        }
    }

    release_downstream(scope, state, idx)
}

fn note_failure(state: &ExecState<'_>) {
    if state.policy == FailurePolicy::FailFast {
        state.halted.store(true, Ordering::Release);
    }
}

/// Decrement each dependent's readiness counter; the worker that takes
/// a counter to zero dispatches that project, so each project is
/// spawned exactly once.
fn release_downstream<'s>(scope: &rayon::Scope<'s>, state: &'s ExecState<'s>, idx: usize) {
    for &d in &state.plan.downstream[idx] {
        if state.pending[d].fetch_sub(1, Ordering::AcqRel) == 1 {
            spawn_project(scope, state, d);
        }
    }
}
