// src/runtime/mod.rs

//! Supervision of the external runtime process.
//!
//! - [`supervisor`] owns at most one runtime process and implements
//!   open / kill / signal.
//! - [`lines`] splits raw output chunks into complete lines.
//! - [`locate`] finds the runtime executable.
//!
//! The serve loop talks to a [`RuntimeControl`] instead of the concrete
//! supervisor, so tests can record reload actions without spawning anything.

pub mod lines;
pub mod locate;
pub mod supervisor;

pub use lines::{LineBuffer, LineSink, OutputStream};
pub use locate::locate_executable;
pub use supervisor::ProcessSupervisor;

use crate::errors::Result;

/// Reload actions the serve loop can take on the runtime process.
pub trait RuntimeControl: Send {
    /// (Re)spawn the runtime process ("hot" reload).
    fn open(&mut self) -> Result<()>;

    /// Ask the running process to refresh ("soft" reload). Spawns the
    /// process if none is running.
    fn signal(&mut self) -> Result<()>;

    /// Terminate the process, if any.
    fn kill(&mut self);
}
