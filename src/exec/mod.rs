// src/exec/mod.rs

//! Build target execution layer.
//!
//! The orchestrator only sees [`TaskHandle`]s: a status stream, a result
//! stream and an async `stop()`. How a target produces them is up to the
//! [`TaskScheduler`].
//!
//! - [`scheduler`] defines the `TaskScheduler` trait and the production
//!   `CommandScheduler`, which runs the shell commands from `[target.*]`.
//! - [`handle`] contains `TaskHandle`, the channel helpers and the
//!   `TaskControl` stop abstraction.
//! - [`command`] builds and spawns shell commands with merged output.
//! - [`task_runner`] runs a target once, or again on every file change.
//! - [`long_lived`] runs a `watch_cmd` and classifies its output lines.

pub mod command;
pub mod handle;
pub mod long_lived;
pub mod scheduler;
pub mod task_runner;

pub use handle::{SpawnedTaskControl, TaskControl, TaskHandle, TaskSenders, task_channels};
pub use long_lived::{LineSignal, OutputMatchers};
pub use scheduler::{CommandScheduler, ScheduleRequest, TaskScheduler};
