//! Reactor session: the top-level build entry point
//!
//! A session wires the pieces together for one build invocation: sort
//! the projects, resolve each project's dependency graph (reactor
//! projects shadow the external metadata source so in-reactor
//! dependencies resolve against the descriptors being built), expand
//! the requested tasks, then hand the plan to the executor and snapshot
//! the summary.

use crate::context::ReactorContext;
use crate::error::ReactorResult;
use crate::executor::{BuildPlanExecutor, ExecutorConfig, ReactorPlan};
use crate::lifecycle::{expand_tasks, ProjectSegment};
use crate::registry::{GoalRegistry, GoalRunner};
use crate::report::BuildSummary;
use crate::sorter::ProjectSorter;
use mason_resolver::{
    effective_management, ArtifactMetadataSource, ArtifactResolver, DependencySpec, Gav,
    GraphBuilder, Project, ProjectSource, ResolveResult,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// What to build and how
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Requested lifecycle phases and/or direct goals
    pub tasks: Vec<String>,
    /// Executor settings
    pub executor: ExecutorConfig,
}

impl SessionConfig {
    /// Create an empty config
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one requested phase or goal
    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.tasks.push(task.into());
        self
    }

    /// Replace the requested task list
    pub fn with_tasks(mut self, tasks: Vec<String>) -> Self {
        self.tasks = tasks;
        self
    }

    /// Set executor settings
    pub fn with_executor(mut self, executor: ExecutorConfig) -> Self {
        self.executor = executor;
        self
    }
}

/// Serves reactor projects' declared dependencies ahead of the external
/// metadata source, so transitive resolution through an in-reactor
/// project never leaves the reactor.
struct ReactorMetadataSource<'a> {
    reactor: HashMap<Gav, Vec<DependencySpec>>,
    fallback: &'a dyn ArtifactMetadataSource,
}

impl<'a> ReactorMetadataSource<'a> {
    fn new(projects: &[Project], fallback: &'a dyn ArtifactMetadataSource) -> Self {
        Self {
            reactor: projects
                .iter()
                .map(|p| (p.gav.clone(), p.dependencies.clone()))
                .collect(),
            fallback,
        }
    }
}

impl ArtifactMetadataSource for ReactorMetadataSource<'_> {
    fn dependencies_of(&self, gav: &Gav) -> ResolveResult<Vec<DependencySpec>> {
        match self.reactor.get(gav) {
            Some(deps) => Ok(deps.clone()),
            None => self.fallback.dependencies_of(gav),
        }
    }
}

/// One build invocation over a project set
pub struct ReactorSession<'a> {
    metadata: &'a dyn ArtifactMetadataSource,
    resolver: Option<&'a dyn ArtifactResolver>,
    registry: GoalRegistry,
    config: SessionConfig,
}

impl<'a> ReactorSession<'a> {
    /// Create a session over an external metadata source
    pub fn new(metadata: &'a dyn ArtifactMetadataSource, config: SessionConfig) -> Self {
        Self {
            metadata,
            resolver: None,
            registry: GoalRegistry::new(),
            config,
        }
    }

    /// Set the artifact resolver. Without one, classpath entries carry
    /// no local paths.
    pub fn with_resolver(mut self, resolver: &'a dyn ArtifactResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Replace the goal registry
    pub fn with_registry(mut self, registry: GoalRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Register a single goal runner
    pub fn register_goal(
        &mut self,
        goal: impl Into<String>,
        runner: Arc<dyn GoalRunner>,
    ) -> ReactorResult<()> {
        self.registry.register(goal, runner)
    }

    /// Load projects from a source and build them
    pub fn run_from(&self, source: &dyn ProjectSource) -> ReactorResult<BuildSummary> {
        self.run(source.projects()?)
    }

    /// Build the given projects.
    ///
    /// Sort failures (cycles, duplicates) and unknown task names abort
    /// the whole invocation before anything runs. Per-project resolution
    /// failures do not: the project is failed in place and the failure
    /// policy decides what happens downstream.
    pub fn run(&self, projects: Vec<Project>) -> ReactorResult<BuildSummary> {
        let start = Instant::now();
        let sorted = ProjectSorter::sort(projects)?;
        info!(projects = sorted.len(), tasks = ?self.config.tasks, "Reactor build order computed");

        let metadata = ReactorMetadataSource::new(sorted.order(), self.metadata);
        let builder = GraphBuilder::new(&metadata);

        let mut segments = Vec::with_capacity(sorted.len());
        for project in sorted.order() {
            let tasks = expand_tasks(project, &self.config.tasks)?;
            let management = effective_management(project, sorted.order());
            let segment = match builder.resolve(project, &management) {
                Ok(graph) => {
                    let classpath = match self.resolver {
                        Some(resolver) => match graph.materialize(resolver) {
                            Ok(classpath) => classpath,
                            Err(error) => {
                                segments.push(ProjectSegment::failed(project.clone(), error));
                                continue;
                            }
                        },
                        None => graph.classpath(),
                    };
                    ProjectSegment::new(project.clone(), tasks, classpath)
                }
                Err(error) => ProjectSegment::failed(project.clone(), error),
            };
            segments.push(segment);
        }

        let plan = ReactorPlan::new(segments, &sorted);
        let context = ReactorContext::new(plan.project_ids());
        BuildPlanExecutor::new(self.config.executor.clone()).execute(
            &plan,
            &self.registry,
            &context,
        )?;

        let summary = BuildSummary::from_context(&context, start.elapsed());
        info!(
            failed = summary.failed_projects().len(),
            elapsed_ms = summary.elapsed().as_millis() as u64,
            "Reactor build finished"
        );
        Ok(summary)
    }
}
