// src/cycle/aggregator.rs

//! Cycle state machine.
//!
//! A cycle starts when any task starts running and closes once every task
//! is idle again and a combined verdict over the latest results is known.
//! Each closed cycle yields exactly one [`CycleOutcome`].

use tracing::debug;

use super::{CycleEvent, CycleFailure, CycleOutcome, ReloadKind};

/// Aggregation state, mutated only by [`transition`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleState {
    /// Any task currently reports "running".
    pub any_running: bool,
    /// A main task was running at some point since the last outcome.
    pub main_touched: bool,
    /// A renderer task was running at some point since the last outcome.
    pub renderer_touched: bool,
    /// Latest combined verdict that has not been emitted yet.
    pub pending_verdict: Option<bool>,
    /// The event just processed closed a cycle.
    pub cycle_closed: bool,
}

/// Apply one event to `state`.
///
/// Returns the outcome when this event closed a cycle. `entry_point_exists`
/// is only called when the cycle closes with an otherwise successful
/// verdict.
pub fn transition(
    state: &mut CycleState,
    event: &CycleEvent,
    entry_point_exists: impl FnOnce() -> bool,
) -> Option<CycleOutcome> {
    state.cycle_closed = false;

    match event {
        CycleEvent::Running(running) => {
            state.main_touched |= running.main;
            state.renderer_touched |= running.renderer;
            state.any_running = running.any();
        }
        CycleEvent::Results(results) => {
            state.pending_verdict = Some(results.iter().all(|r| r.is_success()));
        }
    }

    if state.any_running {
        return None;
    }

    // Taking the verdict clears it: a later running-state change without
    // fresh results must not close another cycle on this verdict.
    let verdict = state.pending_verdict.take()?;

    let (success, failure) = if !verdict {
        (false, Some(CycleFailure::TaskFailed))
    } else if !entry_point_exists() {
        (false, Some(CycleFailure::MissingEntryPoint))
    } else {
        (true, None)
    };

    let reload = if success {
        Some(if state.main_touched {
            ReloadKind::Hot
        } else {
            ReloadKind::Soft
        })
    } else {
        None
    };

    debug!(
        main_touched = state.main_touched,
        renderer_touched = state.renderer_touched,
        success,
        ?reload,
        "cycle closed"
    );

    state.main_touched = false;
    state.renderer_touched = false;
    state.cycle_closed = true;

    Some(CycleOutcome {
        success,
        reload,
        failure,
    })
}

/// Owner of one group's [`CycleState`].
#[derive(Debug, Default)]
pub struct CycleAggregator {
    state: CycleState,
}

impl CycleAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view of the current state (for tests and diagnostics).
    pub fn state(&self) -> &CycleState {
        &self.state
    }

    /// Feed a single event through [`transition`].
    pub fn step(
        &mut self,
        event: &CycleEvent,
        entry_point_exists: impl FnOnce() -> bool,
    ) -> Option<CycleOutcome> {
        transition(&mut self.state, event, entry_point_exists)
    }
}
