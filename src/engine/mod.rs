// src/engine/mod.rs

//! Orchestration engine for hotserve.
//!
//! This module ties together:
//! - the scheduled build targets ([`group`])
//! - the serve event loop that reacts to:
//!   - status transitions of every target
//!   - build results of every target
//!   - result streams ending unexpectedly
//!   - shutdown signals
//! - the one-shot build ([`build`])
//!
//! The pure serve state machine lives in [`core`]; the async/IO shell is
//! implemented in [`serve`].

use crate::types::{TaskResult, TaskStatus};

/// Events flowing into the serve loop from the task forwarders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServeEvent {
    /// Task `index` reported a status transition.
    Status { index: usize, status: TaskStatus },
    /// Task `index` finished a build.
    Result { index: usize, result: TaskResult },
    /// Task `index` will not report results any more.
    ResultsEnded { index: usize },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod build;
pub mod core;
pub mod group;
pub mod serve;

pub use build::run_build;
pub use core::{ServeCommand, ServeCore, ServeStep};
pub use group::{TaskGroup, TaskStreams};
pub use serve::ServeRuntime;
