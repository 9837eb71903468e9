use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use hotserve::config::TargetOptions;
use hotserve::errors::{HotserveError, Result};
use hotserve::exec::{ScheduleRequest, TaskControl, TaskHandle, TaskScheduler, TaskSenders, task_channels};
use hotserve::types::{RunMode, TaskResult, TaskStatus};

/// A fake scheduler that:
/// - accepts every target it was given options for
/// - records every schedule request
/// - hands out handles whose streams the test drives through
///   [`FakeScheduler::task`]
/// - records which targets were stopped.
#[derive(Debug, Clone, Default)]
pub struct FakeScheduler {
    targets: BTreeMap<String, TargetOptions>,
    fail_schedule: BTreeSet<String>,
    fail_validation: BTreeSet<String>,
    state: Arc<Mutex<FakeState>>,
}

#[derive(Debug, Default)]
struct FakeState {
    requests: Vec<ScheduleRequest>,
    senders: BTreeMap<String, TaskSenders>,
    stopped: Vec<String>,
}

impl FakeScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, name: &str) -> Self {
        self.targets.insert(name.to_string(), TargetOptions::default());
        self
    }

    pub fn with_target_options(mut self, name: &str, options: TargetOptions) -> Self {
        self.targets.insert(name.to_string(), options);
        self
    }

    /// Make `schedule` fail for `name`.
    pub fn fail_schedule(mut self, name: &str) -> Self {
        self.fail_schedule.insert(name.to_string());
        self
    }

    /// Make `validate_options` fail for `name`.
    pub fn fail_validation(mut self, name: &str) -> Self {
        self.fail_validation.insert(name.to_string());
        self
    }

    pub fn requests(&self) -> Vec<ScheduleRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn stopped(&self) -> Vec<String> {
        self.state.lock().unwrap().stopped.clone()
    }

    /// Driver for the scheduled target `name`.
    pub fn task(&self, name: &str) -> FakeTask {
        let senders = self
            .state
            .lock()
            .unwrap()
            .senders
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("target {name} was not scheduled"));
        FakeTask { senders }
    }

    /// Drop the scheduler's copies of every sender, so streams end once the
    /// test drops its drivers.
    pub fn release_all(&self) {
        self.state.lock().unwrap().senders.clear();
    }
}

impl TaskScheduler for FakeScheduler {
    fn target_options(&self, target: &str) -> Result<TargetOptions> {
        self.targets
            .get(target)
            .cloned()
            .ok_or_else(|| HotserveError::TargetNotFound(target.to_string()))
    }

    fn validate_options(&self, target: &str, _options: &TargetOptions, _mode: RunMode) -> Result<()> {
        if self.fail_validation.contains(target) {
            return Err(HotserveError::InvalidTargetOptions {
                target: target.to_string(),
                reason: "rejected by fake".to_string(),
            });
        }
        Ok(())
    }

    fn schedule(&self, request: ScheduleRequest) -> Result<TaskHandle> {
        if self.fail_schedule.contains(&request.target) {
            return Err(HotserveError::InvalidTargetOptions {
                target: request.target.clone(),
                reason: "schedule rejected by fake".to_string(),
            });
        }
        self.target_options(&request.target)?;

        let (senders, status, results) = task_channels();
        {
            let mut state = self.state.lock().unwrap();
            state.requests.push(request.clone());
            state.senders.insert(request.target.clone(), senders);
        }

        Ok(TaskHandle {
            kind: request.kind,
            target: request.target.clone(),
            prefix: request.prefix,
            status,
            results,
            control: Box::new(FakeControl {
                target: request.target,
                state: Arc::clone(&self.state),
                stopped: false,
            }),
        })
    }
}

struct FakeControl {
    target: String,
    state: Arc<Mutex<FakeState>>,
    stopped: bool,
}

impl TaskControl for FakeControl {
    fn stop(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            if self.stopped {
                return;
            }
            self.stopped = true;
            let mut state = self.state.lock().unwrap();
            state.stopped.push(self.target.clone());
            state.senders.remove(&self.target);
        })
    }
}

/// Test-side driver for one fake task.
#[derive(Debug, Clone)]
pub struct FakeTask {
    senders: TaskSenders,
}

impl FakeTask {
    pub async fn running(&self) {
        self.senders.status(TaskStatus::Running).await;
    }

    pub async fn idle(&self) {
        self.senders.status(TaskStatus::Idle).await;
    }

    pub async fn succeed(&self) {
        self.senders.result(TaskResult::Success).await;
    }

    pub async fn fail(&self, reason: &str) {
        self.senders.result(TaskResult::Failure(reason.to_string())).await;
    }

    /// Idle followed by a success, as a watch-mode tool reports a rebuild.
    pub async fn rebuilt(&self) {
        self.senders.finished(TaskResult::Success).await;
    }
}
