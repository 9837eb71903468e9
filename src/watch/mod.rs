// src/watch/mod.rs

//! File watching for targets that rerun on change.
//!
//! - [`patterns`] compiles a target's `watch` / `exclude` globs.
//! - [`watcher`] runs a `notify` watcher and forwards matching paths.

pub mod patterns;
pub mod watcher;

pub use patterns::WatchProfile;
pub use watcher::{WatcherHandle, spawn_watcher};
