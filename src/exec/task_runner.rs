// src/exec/task_runner.rs

//! Runners for `cmd`-based targets: once, or again on every watched change.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::exec::command::{drain_output, spawn_with_output};
use crate::exec::handle::TaskSenders;
use crate::exec::long_lived::OutputMatchers;
use crate::logging::PrefixLogger;
use crate::types::{TaskKind, TaskResult, TaskStatus};
use crate::watch::{WatchProfile, WatcherHandle};

/// Fully resolved description of one build target process.
#[derive(Debug, Clone)]
pub struct CommandTask {
    pub target: String,
    pub kind: TaskKind,
    pub cmd: Option<String>,
    pub watch_cmd: Option<String>,
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
    pub matchers: OutputMatchers,
    pub debounce: Duration,
    pub logger: PrefixLogger,
}

/// Run `line` to completion, logging its output through the task logger.
///
/// Spawn and wait errors become a `Failure`. Dropping the future kills the
/// process.
pub async fn run_command(task: &CommandTask, line: &str) -> TaskResult {
    match run_command_inner(task, line).await {
        Ok(result) => result,
        Err(err) => {
            let reason = format!("{err:#}");
            task.logger.error(&reason);
            TaskResult::Failure(reason)
        }
    }
}

async fn run_command_inner(task: &CommandTask, line: &str) -> Result<TaskResult> {
    info!(task = %task.target, kind = %task.kind, cmd = %line, "starting target process");

    let (mut child, mut lines) = spawn_with_output(line, &task.cwd, &task.env)?;

    let mut lines_open = true;
    let status = loop {
        tokio::select! {
            next = lines.recv(), if lines_open => match next {
                Some(output) => task.logger.info(&output),
                None => lines_open = false,
            },
            status = child.wait() => {
                break status.with_context(|| format!("waiting for `{line}`"))?;
            }
        }
    };

    for output in drain_output(&mut lines).await {
        task.logger.info(&output);
    }

    info!(
        task = %task.target,
        exit_code = status.code().unwrap_or(-1),
        success = status.success(),
        "target process exited"
    );

    if status.success() {
        Ok(TaskResult::Success)
    } else {
        Ok(TaskResult::Failure(format!("`{line}` exited with {status}")))
    }
}

/// `RunMode::Once`: run `cmd`, report Running, Idle and one result, then end
/// both streams.
///
/// If the cancel channel fires, the process is killed and no result is sent.
pub async fn run_once(task: CommandTask, tx: TaskSenders, mut cancel_rx: oneshot::Receiver<()>) {
    let Some(line) = task.cmd.clone() else {
        tx.finished(TaskResult::Failure("no `cmd` configured".to_string()))
            .await;
        return;
    };

    tx.status(TaskStatus::Running).await;

    tokio::select! {
        result = run_command(&task, &line) => tx.finished(result).await,
        _ = &mut cancel_rx => {
            info!(task = %task.target, "stop requested; killing target process");
        }
    }
}

/// `RunMode::Watch` without `watch_cmd`: run `cmd`, then again whenever a
/// file below `watch_root` matching `profile` changes.
///
/// A change during a run kills the in-flight process and starts over, so
/// only the result of the newest run is reported.
pub async fn run_rerun_on_change(
    task: CommandTask,
    profile: WatchProfile,
    watch_root: PathBuf,
    tx: TaskSenders,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    let Some(line) = task.cmd.clone() else {
        tx.finished(TaskResult::Failure("no `cmd` configured".to_string()))
            .await;
        return;
    };

    let (_watcher, mut changes): (WatcherHandle, mpsc::Receiver<PathBuf>) =
        match crate::watch::spawn_watcher(watch_root, profile) {
            Ok(pair) => pair,
            Err(err) => {
                let reason = format!("starting file watcher: {err:#}");
                task.logger.error(&reason);
                tx.finished(TaskResult::Failure(reason)).await;
                return;
            }
        };

    loop {
        tx.status(TaskStatus::Running).await;

        let result = loop {
            let run = run_command(&task, &line);
            tokio::pin!(run);

            let restart = tokio::select! {
                result = &mut run => break result,
                change = changes.recv() => change.is_some(),
                _ = &mut cancel_rx => return,
            };

            if !restart {
                debug!(task = %task.target, "watcher closed during run");
                break run.await;
            }

            task.logger.info("Change detected, restarting build");
            if !debounce(&mut changes, task.debounce, &mut cancel_rx).await {
                return;
            }
        };

        tx.finished(result).await;

        tokio::select! {
            change = changes.recv() => {
                if change.is_none() {
                    debug!(task = %task.target, "watcher closed; no further runs");
                    return;
                }
            }
            _ = &mut cancel_rx => return,
        }

        task.logger.info("Change detected, rebuilding");
        if !debounce(&mut changes, task.debounce, &mut cancel_rx).await {
            return;
        }
    }
}

/// Wait until no change arrived for `quiet`. Returns `false` on stop.
async fn debounce(
    changes: &mut mpsc::Receiver<PathBuf>,
    quiet: Duration,
    cancel_rx: &mut oneshot::Receiver<()>,
) -> bool {
    loop {
        tokio::select! {
            change = changes.recv() => {
                if change.is_none() {
                    return true;
                }
            }
            _ = sleep(quiet) => return true,
            _ = &mut *cancel_rx => return false,
        }
    }
}
