// src/exec/scheduler.rs

//! Scheduling of build targets.
//!
//! The orchestrator depends only on the [`TaskScheduler`] trait. Production
//! code uses [`CommandScheduler`]; tests provide a fake that hands out
//! handles whose streams they drive directly.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::config::{ConfigFile, TargetOptions, merge_options};
use crate::errors::{HotserveError, Result};
use crate::exec::handle::{SpawnedTaskControl, TaskHandle, task_channels};
use crate::exec::long_lived::{OutputMatchers, run_long_lived};
use crate::exec::task_runner::{CommandTask, run_once, run_rerun_on_change};
use crate::logging::PrefixLogger;
use crate::path_utils::normalize;
use crate::types::{RunMode, TaskKind};
use crate::watch::WatchProfile;

const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Everything needed to start one build target.
#[derive(Debug, Clone)]
pub struct ScheduleRequest {
    pub kind: TaskKind,
    pub target: String,
    /// Merged over the target's configured options.
    pub overrides: TargetOptions,
    pub mode: RunMode,
    /// Log prefix for the target's output, e.g. `Main` or `Renderer 2`.
    pub prefix: String,
}

/// Starts build targets and hands back their handles.
pub trait TaskScheduler: Send + Sync {
    /// Options currently configured for `target`.
    fn target_options(&self, target: &str) -> Result<TargetOptions>;

    /// Check that a merged option set can run in `mode`.
    fn validate_options(&self, target: &str, options: &TargetOptions, mode: RunMode)
    -> Result<()>;

    /// Merge the request's overrides over the configured options, validate
    /// them and start the target.
    fn schedule(&self, request: ScheduleRequest) -> Result<TaskHandle>;
}

/// Runs the shell commands declared in `[target.<name>]` sections.
#[derive(Debug, Clone)]
pub struct CommandScheduler {
    targets: BTreeMap<String, TargetOptions>,
    workspace_root: PathBuf,
}

impl CommandScheduler {
    pub fn new(targets: BTreeMap<String, TargetOptions>, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            targets,
            workspace_root: workspace_root.into(),
        }
    }

    pub fn from_config(cfg: &ConfigFile, workspace_root: impl Into<PathBuf>) -> Self {
        Self::new(cfg.target.clone(), workspace_root)
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    fn resolve_cwd(&self, options: &TargetOptions) -> PathBuf {
        match &options.cwd {
            Some(cwd) => normalize(&self.workspace_root.join(cwd)),
            None => self.workspace_root.clone(),
        }
    }
}

fn invalid(target: &str, reason: impl Into<String>) -> HotserveError {
    HotserveError::InvalidTargetOptions {
        target: target.to_string(),
        reason: reason.into(),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

impl TaskScheduler for CommandScheduler {
    fn target_options(&self, target: &str) -> Result<TargetOptions> {
        self.targets
            .get(target)
            .cloned()
            .ok_or_else(|| HotserveError::TargetNotFound(target.to_string()))
    }

    fn validate_options(
        &self,
        target: &str,
        options: &TargetOptions,
        mode: RunMode,
    ) -> Result<()> {
        OutputMatchers::from_options(options).map_err(|e| invalid(target, format!("{e:#}")))?;
        WatchProfile::new(target, &options.watch, &options.exclude)
            .map_err(|e| invalid(target, format!("{e:#}")))?;

        let cmd = non_empty(&options.cmd);
        let watch_cmd = non_empty(&options.watch_cmd);

        match mode {
            RunMode::Once if cmd.is_none() => Err(invalid(target, "`cmd` must be set to build")),
            RunMode::Once => Ok(()),
            RunMode::Watch if watch_cmd.is_some() => {
                if non_empty(&options.success_on_output).is_none() {
                    Err(invalid(
                        target,
                        "`watch_cmd` needs `success_on_output` to detect finished builds",
                    ))
                } else {
                    Ok(())
                }
            }
            RunMode::Watch if options.watch.is_empty() => Err(invalid(
                target,
                "watch mode needs either `watch_cmd` or `watch` patterns",
            )),
            RunMode::Watch if cmd.is_none() => Err(invalid(
                target,
                "`watch` patterns need a `cmd` to re-run",
            )),
            RunMode::Watch => Ok(()),
        }
    }

    fn schedule(&self, request: ScheduleRequest) -> Result<TaskHandle> {
        let base = self.target_options(&request.target)?;
        let options = merge_options(&base, &request.overrides);
        self.validate_options(&request.target, &options, request.mode)?;

        let matchers = OutputMatchers::from_options(&options)?;
        let task = CommandTask {
            target: request.target.clone(),
            kind: request.kind,
            cmd: non_empty(&options.cmd).map(str::to_string),
            watch_cmd: non_empty(&options.watch_cmd).map(str::to_string),
            cwd: self.resolve_cwd(&options),
            env: options.env.clone(),
            matchers,
            debounce: Duration::from_millis(options.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS)),
            logger: PrefixLogger::new(request.prefix.clone()),
        };

        let (tx, status, results) = task_channels();

        let control = match (request.mode, task.watch_cmd.is_some()) {
            (RunMode::Once, _) => {
                debug!(task = %task.target, "scheduling one-shot build");
                SpawnedTaskControl::spawn(&request.target, move |cancel| {
                    run_once(task, tx, cancel)
                })
            }
            (RunMode::Watch, true) => {
                debug!(task = %task.target, "scheduling long-lived watch build");
                SpawnedTaskControl::spawn(&request.target, move |cancel| {
                    run_long_lived(task, tx, cancel)
                })
            }
            (RunMode::Watch, false) => {
                debug!(task = %task.target, "scheduling rerun-on-change build");
                let profile = WatchProfile::new(&request.target, &options.watch, &options.exclude)?;
                let watch_root = self.workspace_root.clone();
                SpawnedTaskControl::spawn(&request.target, move |cancel| {
                    run_rerun_on_change(task, profile, watch_root, tx, cancel)
                })
            }
        };

        info!(
            task = %request.target,
            kind = %request.kind,
            prefix = %request.prefix,
            "target scheduled"
        );

        Ok(TaskHandle {
            kind: request.kind,
            target: request.target,
            prefix: request.prefix,
            status,
            results,
            control: Box::new(control),
        })
    }
}
