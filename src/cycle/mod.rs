// src/cycle/mod.rs

//! Rebuild-cycle detection and reload decisions.
//!
//! This module is the pure heart of `hotserve serve`:
//!
//! - [`combine`] turns per-task status/result signals into aggregated
//!   [`CycleEvent`]s (deduplicated running state, "latest of all" results).
//! - [`aggregator`] holds [`CycleState`] and the [`transition`] function
//!   that decides when a rebuild cycle has closed and which reload it needs.
//!
//! Nothing in here touches channels, processes or the filesystem. The one
//! external fact the aggregator needs (does the entry point exist?) is
//! injected as a closure so the transition stays deterministic in tests.

pub mod aggregator;
pub mod combine;

pub use aggregator::{transition, CycleAggregator, CycleState};
pub use combine::{combine_verdict, ResultCombiner, RunningCombiner};

use crate::types::TaskResult;

/// OR-combined running state over all tasks of each kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunningState {
    pub main: bool,
    pub renderer: bool,
}

impl RunningState {
    pub fn any(&self) -> bool {
        self.main || self.renderer
    }
}

/// Input of the cycle state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleEvent {
    /// The combined running state changed.
    Running(RunningState),
    /// Every task has a result; these are the latest ones, one per task.
    Results(Vec<TaskResult>),
}

/// What to do with the runtime process after a successful cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadKind {
    /// Main-process code changed: respawn the runtime process.
    Hot,
    /// Only renderer code changed: ask the running process to refresh.
    Soft,
}

impl std::fmt::Display for ReloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReloadKind::Hot => f.write_str("hot"),
            ReloadKind::Soft => f.write_str("soft"),
        }
    }
}

/// Why a cycle failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleFailure {
    /// At least one task reported a failure.
    TaskFailed,
    /// All tasks succeeded but the entry point was not produced.
    MissingEntryPoint,
}

/// Result of one closed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOutcome {
    pub success: bool,
    /// Only set when `success` is true.
    pub reload: Option<ReloadKind>,
    /// Only set when `success` is false.
    pub failure: Option<CycleFailure>,
}
