// src/engine/serve.rs

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cycle::{CycleFailure, CycleOutcome, ReloadKind};
use crate::fs::FileSystem;
use crate::logging::PrefixLogger;
use crate::runtime::RuntimeControl;

use super::core::{ServeCommand, ServeCore};
use super::group::{TaskGroup, TaskStreams};
use super::ServeEvent;

const EVENT_CAPACITY: usize = 128;

/// Watch-mode event loop.
///
/// Every target's status and result streams are forwarded into one queue;
/// a single loop feeds them through [`ServeCore`] and executes the
/// resulting reload actions on a [`RuntimeControl`].
///
/// This is the IO shell around `ServeCore`, which contains all the cycle
/// semantics.
pub struct ServeRuntime<R: RuntimeControl> {
    core: ServeCore,
    group: TaskGroup,
    runtime: R,
    fs: Arc<dyn FileSystem>,
    entry_point: PathBuf,
    event_tx: mpsc::Sender<ServeEvent>,
    event_rx: mpsc::Receiver<ServeEvent>,
    outcome_tx: Option<mpsc::UnboundedSender<CycleOutcome>>,
    logger: PrefixLogger,
}

impl<R: RuntimeControl> fmt::Debug for ServeRuntime<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServeRuntime")
            .field("core", &self.core)
            .field("entry_point", &self.entry_point)
            .finish_non_exhaustive()
    }
}

impl<R: RuntimeControl> ServeRuntime<R> {
    /// `entry_point` is the build output checked before every reload.
    pub fn new(
        group: TaskGroup,
        runtime: R,
        fs: Arc<dyn FileSystem>,
        entry_point: impl Into<PathBuf>,
    ) -> Self {
        let targets = group
            .members()
            .iter()
            .map(|m| (m.kind, m.target.clone()))
            .collect();
        let (event_tx, event_rx) = mpsc::channel(EVENT_CAPACITY);

        Self {
            core: ServeCore::new(targets),
            group,
            runtime,
            fs,
            entry_point: entry_point.into(),
            event_tx,
            event_rx,
            outcome_tx: None,
            logger: PrefixLogger::new("Serve"),
        }
    }

    /// Relay every cycle outcome to `tx`.
    pub fn with_outcomes(mut self, tx: mpsc::UnboundedSender<CycleOutcome>) -> Self {
        self.outcome_tx = Some(tx);
        self
    }

    /// Sender for injecting events, e.g. `ShutdownRequested` on Ctrl-C.
    ///
    /// The loop also ends once every target's streams are gone, unless a
    /// clone of this sender is still alive.
    pub fn event_sender(&self) -> mpsc::Sender<ServeEvent> {
        self.event_tx.clone()
    }

    /// Run until shutdown is requested or every input is gone.
    ///
    /// Returns the verdict of the last closed cycle (`false` if none
    /// closed). The targets are stopped and the runtime process is killed
    /// on the way out.
    pub async fn run(mut self) -> bool {
        info!(targets = self.group.len(), "serve loop started");

        let streams = self.group.take_streams();
        spawn_forwarders(streams, &self.event_tx);

        // Swap in a dead sender: from here on only the forwarders and
        // external clones keep the queue open.
        self.event_tx = mpsc::channel(1).0;

        loop {
            let Some(event) = self.event_rx.recv().await else {
                info!("all serve inputs closed; exiting");
                break;
            };

            debug!(?event, "serve loop received event");

            let fs = &self.fs;
            let entry_point = &self.entry_point;
            let step = self.core.step(event, || fs.is_file(entry_point));

            for command in step.commands {
                self.execute_command(command);
            }

            if !step.keep_running {
                info!("shutdown requested; stopping serve loop");
                break;
            }
        }

        self.group.stop_all().await;
        self.runtime.kill();

        let verdict = self.core.last_verdict().unwrap_or(false);
        info!(verdict, "serve loop exiting");
        verdict
    }

    fn execute_command(&mut self, command: ServeCommand) {
        match command {
            ServeCommand::Reload(kind) => self.reload(kind),
            ServeCommand::Report(outcome) => self.report(outcome),
            ServeCommand::UnexpectedCompletion { target, kind } => {
                self.logger.warn(&format!(
                    "target \"{target}\" ({kind}) completed, but expected to run in watch mode"
                ));
            }
        }
    }

    fn reload(&mut self, kind: ReloadKind) {
        let result = match kind {
            ReloadKind::Hot => self.runtime.open(),
            ReloadKind::Soft => self.runtime.signal(),
        };
        if let Err(err) = result {
            self.logger.error(&format!("{kind} reload failed: {err}"));
        }
    }

    fn report(&self, outcome: CycleOutcome) {
        match (outcome.success, outcome.reload, outcome.failure) {
            (true, Some(ReloadKind::Hot), _) => {
                self.logger.info("Build succeeded, restarting application")
            }
            (true, _, _) => self.logger.info("Build succeeded, reloading renderer"),
            (false, _, Some(CycleFailure::MissingEntryPoint)) => self.logger.error(&format!(
                "Configuration error: entry point {} was not produced by the build",
                self.entry_point.display()
            )),
            (false, _, _) => self.logger.error("Build failed, waiting for changes"),
        }

        if let Some(tx) = &self.outcome_tx {
            // Observers may have gone away.
            let _ = tx.send(outcome);
        }
    }
}

/// One forwarder per target, so a target's events reach the queue in the
/// order it sent them.
///
/// A target sends a status before the result it leads to, so draining the
/// status stream first never lets a result overtake its `Running`.
fn spawn_forwarders(streams: Vec<TaskStreams>, event_tx: &mpsc::Sender<ServeEvent>) {
    for (index, TaskStreams { mut status, mut results }) in streams.into_iter().enumerate() {
        let tx = event_tx.clone();
        tokio::spawn(async move {
            let mut status_open = true;
            let mut results_open = true;

            while status_open || results_open {
                let event = tokio::select! {
                    biased;

                    next = status.recv(), if status_open => match next {
                        Some(status) => ServeEvent::Status { index, status },
                        None => {
                            status_open = false;
                            continue;
                        }
                    },
                    next = results.recv(), if results_open => match next {
                        Some(result) => ServeEvent::Result { index, result },
                        None => {
                            results_open = false;
                            ServeEvent::ResultsEnded { index }
                        }
                    },
                };

                if tx.send(event).await.is_err() {
                    return;
                }
            }
        });
    }
}
