// src/cycle/combine.rs

//! Combining per-task signals into aggregator events.

use crate::types::{TaskKind, TaskResult, TaskStatus};

use super::RunningState;

/// Whole-group verdict: success only if every result is a success.
///
/// An empty slice is treated as a failure; a group always has at least the
/// main task, so "no results" means something went wrong upstream.
pub fn combine_verdict(results: &[TaskResult]) -> bool {
    !results.is_empty() && results.iter().all(TaskResult::is_success)
}

/// Tracks the latest status of every task and reports the OR-combined
/// running state per [`TaskKind`], only when it changes.
///
/// Nothing is reported until every task has reported at least once.
#[derive(Debug, Clone)]
pub struct RunningCombiner {
    kinds: Vec<TaskKind>,
    latest: Vec<Option<TaskStatus>>,
    last_emitted: Option<RunningState>,
}

impl RunningCombiner {
    pub fn new(kinds: Vec<TaskKind>) -> Self {
        let latest = vec![None; kinds.len()];
        Self {
            kinds,
            latest,
            last_emitted: None,
        }
    }

    /// Record `status` for task `index`.
    ///
    /// Returns the new combined state if it differs from the last one
    /// returned. Out-of-range indices are ignored.
    pub fn update(&mut self, index: usize, status: TaskStatus) -> Option<RunningState> {
        let slot = self.latest.get_mut(index)?;
        *slot = Some(status);

        let mut combined = RunningState::default();
        for (kind, status) in self.kinds.iter().zip(self.latest.iter()) {
            let status = (*status)?;
            if status.is_running() {
                match kind {
                    TaskKind::Main => combined.main = true,
                    TaskKind::Renderer => combined.renderer = true,
                }
            }
        }

        if self.last_emitted == Some(combined) {
            return None;
        }
        self.last_emitted = Some(combined);
        Some(combined)
    }
}

/// Keeps the latest result of every task.
///
/// Once every task has produced at least one result, each new result yields
/// a snapshot of the latest results of all tasks (in task order).
#[derive(Debug, Clone)]
pub struct ResultCombiner {
    latest: Vec<Option<TaskResult>>,
}

impl ResultCombiner {
    pub fn new(task_count: usize) -> Self {
        Self {
            latest: vec![None; task_count],
        }
    }

    pub fn update(&mut self, index: usize, result: TaskResult) -> Option<Vec<TaskResult>> {
        let slot = self.latest.get_mut(index)?;
        *slot = Some(result);
        self.latest.iter().cloned().collect()
    }
}
