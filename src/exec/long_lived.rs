// src/exec/long_lived.rs

//! Long-lived `watch_cmd` targets.
//!
//! A watch-mode build tool keeps running and prints a line whenever it
//! starts or finishes a rebuild. The target's `*_on_output` regexes turn
//! those lines into status and result signals.

use std::borrow::Cow;

use anyhow::{Context, Result};
use regex::Regex;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::config::TargetOptions;
use crate::exec::command::{drain_output, spawn_with_output};
use crate::exec::handle::TaskSenders;
use crate::exec::task_runner::CommandTask;
use crate::types::{TaskResult, TaskStatus};

/// What a single output line means for the build state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSignal {
    Running,
    Succeeded,
    Failed,
}

/// Compiled `running_on_output` / `success_on_output` / `failure_on_output`.
#[derive(Debug, Clone, Default)]
pub struct OutputMatchers {
    running: Option<Regex>,
    success: Option<Regex>,
    failure: Option<Regex>,
}

impl OutputMatchers {
    pub fn from_options(options: &TargetOptions) -> Result<Self> {
        Ok(Self {
            running: compile("running_on_output", options.running_on_output.as_deref())?,
            success: compile("success_on_output", options.success_on_output.as_deref())?,
            failure: compile("failure_on_output", options.failure_on_output.as_deref())?,
        })
    }

    /// Classify one output line. Failure wins over success, success over
    /// running. Terminal colour codes are ignored.
    pub fn classify(&self, line: &str) -> Option<LineSignal> {
        let plain = strip_ansi(line);
        let hit = |re: &Option<Regex>| re.as_ref().is_some_and(|re| re.is_match(&plain));

        if hit(&self.failure) {
            Some(LineSignal::Failed)
        } else if hit(&self.success) {
            Some(LineSignal::Succeeded)
        } else if hit(&self.running) {
            Some(LineSignal::Running)
        } else {
            None
        }
    }
}

fn compile(field: &str, pattern: Option<&str>) -> Result<Option<Regex>> {
    pattern
        .map(|p| Regex::new(p).with_context(|| format!("invalid `{field}` regex: {p}")))
        .transpose()
}

/// Remove CSI escape sequences (`ESC [ ... final`).
fn strip_ansi(line: &str) -> Cow<'_, str> {
    if !line.contains('\x1b') {
        return Cow::Borrowed(line);
    }

    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for c in chars.by_ref() {
                if ('@'..='~').contains(&c) {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Run `watch_cmd` until it exits or the task is stopped.
///
/// Running is reported when the process starts. Each line is logged and
/// classified; an exit produces Idle, a `Failure` for a non-zero status, and
/// then closes both streams.
pub async fn run_long_lived(
    task: CommandTask,
    tx: TaskSenders,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    let Some(line) = task.watch_cmd.clone() else {
        tx.finished(TaskResult::Failure("no `watch_cmd` configured".to_string()))
            .await;
        return;
    };

    info!(task = %task.target, kind = %task.kind, cmd = %line, "starting long-lived target process");

    let (mut child, mut lines) = match spawn_with_output(&line, &task.cwd, &task.env) {
        Ok(pair) => pair,
        Err(err) => {
            let reason = format!("{err:#}");
            task.logger.error(&reason);
            tx.finished(TaskResult::Failure(reason)).await;
            return;
        }
    };

    tx.status(TaskStatus::Running).await;

    // Whether Running was reported since the last result.
    let mut building = true;
    let mut lines_open = true;
    let status = loop {
        tokio::select! {
            next = lines.recv(), if lines_open => match next {
                Some(output) => handle_line(&task, &tx, &output, &mut building).await,
                None => lines_open = false,
            },
            status = child.wait() => break status,
            _ = &mut cancel_rx => {
                info!(task = %task.target, "stop requested; killing long-lived process");
                if let Err(err) = child.kill().await {
                    warn!(task = %task.target, error = %err, "failed to kill long-lived process");
                }
                return;
            }
        }
    };

    for output in drain_output(&mut lines).await {
        handle_line(&task, &tx, &output, &mut building).await;
    }

    tx.status(TaskStatus::Idle).await;
    match status {
        Ok(status) if status.success() => {
            task.logger.warn(&format!("`{line}` exited"));
        }
        Ok(status) => {
            let reason = format!("`{line}` exited with {status}");
            task.logger.error(&reason);
            tx.result(TaskResult::Failure(reason)).await;
        }
        Err(err) => {
            let reason = format!("waiting for `{line}`: {err}");
            task.logger.error(&reason);
            tx.result(TaskResult::Failure(reason)).await;
        }
    }
}

/// Log `line` and report what it says about the build.
///
/// A result always follows a Running: tools without a running pattern (or
/// that print nothing before a fast rebuild) still mark a rebuild.
async fn handle_line(task: &CommandTask, tx: &TaskSenders, line: &str, building: &mut bool) {
    task.logger.info(line);

    let result = match task.matchers.classify(line) {
        None => return,
        Some(LineSignal::Running) => {
            tx.status(TaskStatus::Running).await;
            *building = true;
            return;
        }
        Some(LineSignal::Failed) => TaskResult::Failure(line.to_string()),
        Some(LineSignal::Succeeded) => TaskResult::Success,
    };

    if !*building {
        tx.status(TaskStatus::Running).await;
    }
    tx.finished(result).await;
    *building = false;
}
