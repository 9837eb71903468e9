// src/engine/core.rs

//! Pure serve state machine.
//!
//! `ServeCore` owns the combiners and the cycle aggregator. It consumes
//! [`ServeEvent`]s and returns the commands the IO shell has to execute; it
//! never touches channels, processes or the filesystem itself.

use tracing::{debug, trace};

use crate::cycle::{CycleAggregator, CycleEvent, CycleOutcome, ReloadKind, ResultCombiner, RunningCombiner};
use crate::types::TaskKind;

use super::ServeEvent;

/// Side effect requested by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServeCommand {
    /// Act on the runtime process.
    Reload(ReloadKind),
    /// A cycle closed; log it and relay it to observers.
    Report(CycleOutcome),
    /// A target stopped producing results although it should keep
    /// watching.
    UnexpectedCompletion { target: String, kind: TaskKind },
}

/// Result of feeding a single event into the core.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ServeStep {
    pub commands: Vec<ServeCommand>,
    /// `false` once the loop should exit.
    pub keep_running: bool,
}

#[derive(Debug)]
pub struct ServeCore {
    targets: Vec<(TaskKind, String)>,
    running: RunningCombiner,
    results: ResultCombiner,
    aggregator: CycleAggregator,
    last_verdict: Option<bool>,
}

impl ServeCore {
    /// Core for the targets of one group, in group order.
    pub fn new(targets: Vec<(TaskKind, String)>) -> Self {
        let kinds = targets.iter().map(|(kind, _)| *kind).collect();
        let count = targets.len();
        Self {
            targets,
            running: RunningCombiner::new(kinds),
            results: ResultCombiner::new(count),
            aggregator: CycleAggregator::new(),
            last_verdict: None,
        }
    }

    /// Verdict of the most recently closed cycle.
    pub fn last_verdict(&self) -> Option<bool> {
        self.last_verdict
    }

    pub fn aggregator(&self) -> &CycleAggregator {
        &self.aggregator
    }

    /// Handle one event. `entry_point_exists` is consulted only if a cycle
    /// closes successfully.
    pub fn step(
        &mut self,
        event: ServeEvent,
        entry_point_exists: impl FnOnce() -> bool,
    ) -> ServeStep {
        trace!(?event, "serve core step");

        let cycle_event = match event {
            ServeEvent::Status { index, status } => {
                self.running.update(index, status).map(CycleEvent::Running)
            }
            ServeEvent::Result { index, result } => {
                self.results.update(index, result).map(CycleEvent::Results)
            }
            ServeEvent::ResultsEnded { index } => {
                let commands = self
                    .targets
                    .get(index)
                    .map(|(kind, target)| ServeCommand::UnexpectedCompletion {
                        target: target.clone(),
                        kind: *kind,
                    })
                    .into_iter()
                    .collect();
                return ServeStep {
                    commands,
                    keep_running: true,
                };
            }
            ServeEvent::ShutdownRequested => {
                debug!("shutdown requested");
                return ServeStep {
                    commands: Vec::new(),
                    keep_running: false,
                };
            }
        };

        let mut step = ServeStep {
            commands: Vec::new(),
            keep_running: true,
        };

        let Some(cycle_event) = cycle_event else {
            return step;
        };

        if let Some(outcome) = self.aggregator.step(&cycle_event, entry_point_exists) {
            self.last_verdict = Some(outcome.success);
            if let Some(reload) = outcome.reload {
                step.commands.push(ServeCommand::Reload(reload));
            }
            step.commands.push(ServeCommand::Report(outcome));
        }

        step
    }
}
