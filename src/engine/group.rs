// src/engine/group.rs

//! The set of build targets scheduled for one `build` or `serve` run.

use tokio::sync::mpsc;
use tracing::debug;

use crate::config::{BuildOptions, TargetSpec, merge_options};
use crate::errors::Result;
use crate::exec::{ScheduleRequest, TaskControl, TaskScheduler};
use crate::logging::PrefixLogger;
use crate::types::{RunMode, TaskKind, TaskResult, TaskStatus};

/// A scheduled target without its streams.
pub struct GroupMember {
    pub kind: TaskKind,
    pub target: String,
    pub prefix: String,
    control: Box<dyn TaskControl>,
}

/// Status and result streams of one scheduled target.
#[derive(Debug)]
pub struct TaskStreams {
    pub status: mpsc::Receiver<TaskStatus>,
    pub results: mpsc::Receiver<TaskResult>,
}

/// Renderer targets (in configuration order) followed by the main target.
///
/// Member `i` and stream `i` belong to the same target.
#[derive(Default)]
pub struct TaskGroup {
    members: Vec<GroupMember>,
    streams: Vec<TaskStreams>,
}

impl std::fmt::Debug for TaskGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskGroup")
            .field("targets", &self.targets())
            .finish_non_exhaustive()
    }
}

/// Log prefix of every target: `Renderer` when there is one renderer,
/// `Renderer 1`, `Renderer 2`, ... otherwise, and `Main`.
fn plan(options: &BuildOptions) -> Vec<(TaskKind, &TargetSpec, String)> {
    let renderers = options.renderer_targets.len();
    let mut planned: Vec<_> = options
        .renderer_targets
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            let prefix = if renderers == 1 {
                "Renderer".to_string()
            } else {
                format!("Renderer {}", i + 1)
            };
            (TaskKind::Renderer, spec, prefix)
        })
        .collect();
    planned.push((TaskKind::Main, &options.main_target, "Main".to_string()));
    planned
}

fn scheduled_message(kind: TaskKind, target: &str, prefix: &str) -> String {
    format!("Scheduled {kind} target \"{target}\" as \"{prefix}\"")
}

impl TaskGroup {
    /// Validate and schedule every target of `options` in `mode`.
    ///
    /// All option sets are validated before the first target starts. If
    /// scheduling a target fails anyway, the targets already started are
    /// stopped before the error is returned.
    pub async fn schedule(
        scheduler: &dyn TaskScheduler,
        options: &BuildOptions,
        mode: RunMode,
    ) -> Result<Self> {
        let logger = PrefixLogger::new(match mode {
            RunMode::Once => "Build",
            RunMode::Watch => "Serve",
        });
        let planned = plan(options);

        for (_, spec, _) in &planned {
            let base = scheduler.target_options(&spec.target)?;
            let merged = merge_options(&base, &spec.options);
            scheduler.validate_options(&spec.target, &merged, mode)?;
        }

        let mut group = TaskGroup::default();
        for (kind, spec, prefix) in planned {
            let request = ScheduleRequest {
                kind,
                target: spec.target.clone(),
                overrides: spec.options.clone(),
                mode,
                prefix: prefix.clone(),
            };

            let handle = match scheduler.schedule(request) {
                Ok(handle) => handle,
                Err(err) => {
                    debug!(task = %spec.target, error = %err, "scheduling failed; stopping group");
                    group.stop_all().await;
                    return Err(err);
                }
            };

            logger.info(&scheduled_message(kind, &spec.target, &prefix));

            group.streams.push(TaskStreams {
                status: handle.status,
                results: handle.results,
            });
            group.members.push(GroupMember {
                kind: handle.kind,
                target: handle.target,
                prefix: handle.prefix,
                control: handle.control,
            });
        }

        Ok(group)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[GroupMember] {
        &self.members
    }

    pub fn kinds(&self) -> Vec<TaskKind> {
        self.members.iter().map(|m| m.kind).collect()
    }

    pub fn targets(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.target.as_str()).collect()
    }

    /// Hand the streams to whoever consumes them. Empty on a second call.
    pub fn take_streams(&mut self) -> Vec<TaskStreams> {
        std::mem::take(&mut self.streams)
    }

    /// Stop every target, waiting for each to release its processes.
    pub async fn stop_all(&mut self) {
        for member in &mut self.members {
            debug!(task = %member.target, "stopping target");
            member.control.stop().await;
        }
    }
}
