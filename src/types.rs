use std::fmt;

/// Which side of the application a build target produces code for.
///
/// Exactly one `Main` target exists per group; `Renderer` targets may occur
/// any number of times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Main,
    Renderer,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Main => f.write_str("main"),
            TaskKind::Renderer => f.write_str("renderer"),
        }
    }
}

/// Current activity of a build task as reported on its status stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Idle,
    Running,
}

impl TaskStatus {
    pub fn is_running(self) -> bool {
        matches!(self, TaskStatus::Running)
    }
}

/// One completion result of a build task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult {
    Success,
    /// The task failed; the string carries whatever detail the task gave
    /// (matched output line, exit code, ...).
    Failure(String),
}

impl TaskResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskResult::Success)
    }
}

/// How a task is run by the scheduler.
///
/// - `Once`: run to completion and report exactly one result.
/// - `Watch`: keep running and report a result after every rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Once,
    Watch,
}
