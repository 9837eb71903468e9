// src/exec/handle.rs

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::types::{TaskKind, TaskResult, TaskStatus};

const CHANNEL_CAPACITY: usize = 32;

/// How a scheduled task is stopped.
///
/// Production tasks kill their processes; tests can provide a fake that
/// just records the call.
pub trait TaskControl: Send {
    /// Stop the task and wait until it has released its resources.
    ///
    /// Calling `stop` more than once is a no-op.
    fn stop(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// A scheduled build target, as seen by the orchestrator.
pub struct TaskHandle {
    pub kind: TaskKind,
    pub target: String,
    pub prefix: String,
    /// Idle / running transitions.
    pub status: mpsc::Receiver<TaskStatus>,
    /// One item per completed build. Ends when the task will not report
    /// again.
    pub results: mpsc::Receiver<TaskResult>,
    pub control: Box<dyn TaskControl>,
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("kind", &self.kind)
            .field("target", &self.target)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl TaskHandle {
    pub async fn stop(&mut self) {
        self.control.stop().await;
    }
}

/// Sending half of a task's status and result streams.
///
/// Send errors are ignored: a closed receiver means nobody listens any more.
#[derive(Debug, Clone)]
pub struct TaskSenders {
    status: mpsc::Sender<TaskStatus>,
    results: mpsc::Sender<TaskResult>,
}

impl TaskSenders {
    pub async fn status(&self, status: TaskStatus) {
        let _ = self.status.send(status).await;
    }

    pub async fn result(&self, result: TaskResult) {
        let _ = self.results.send(result).await;
    }

    /// Report the end of a build: idle first, then the result.
    pub async fn finished(&self, result: TaskResult) {
        self.status(TaskStatus::Idle).await;
        self.result(result).await;
    }
}

/// Create the status/result channel pair for one task.
pub fn task_channels() -> (
    TaskSenders,
    mpsc::Receiver<TaskStatus>,
    mpsc::Receiver<TaskResult>,
) {
    let (status_tx, status_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (results_tx, results_rx) = mpsc::channel(CHANNEL_CAPACITY);
    (
        TaskSenders {
            status: status_tx,
            results: results_tx,
        },
        status_rx,
        results_rx,
    )
}

/// [`TaskControl`] for a runner spawned on the Tokio runtime.
///
/// The runner receives a cancel channel. `stop` fires it and awaits the
/// runner; dropping the control without `stop` closes the channel, which
/// runners treat the same way.
pub struct SpawnedTaskControl {
    target: String,
    cancel_tx: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl SpawnedTaskControl {
    pub fn spawn<F, Fut>(target: impl Into<String>, runner: F) -> Self
    where
        F: FnOnce(oneshot::Receiver<()>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let join = tokio::spawn(runner(cancel_rx));
        Self {
            target: target.into(),
            cancel_tx: Some(cancel_tx),
            join: Some(join),
        }
    }
}

impl TaskControl for SpawnedTaskControl {
    fn stop(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            if let Some(cancel_tx) = self.cancel_tx.take() {
                // The runner may already have finished.
                let _ = cancel_tx.send(());
            }
            if let Some(join) = self.join.take() {
                if let Err(err) = join.await {
                    debug!(task = %self.target, error = %err, "task runner ended abnormally");
                }
            }
        })
    }
}
