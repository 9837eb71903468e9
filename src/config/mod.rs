// src/config/mod.rs

//! Configuration loading and validation for hotserve.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Merge target/build options and overrides (`merge.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate and resolve build options (`validate.rs`).

pub mod loader;
pub mod merge;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use merge::{merge_options, merge_target_ref};
pub use model::{
    BuildOptions, ConfigFile, PartialBuildOptions, RawConfigFile, RuntimeSection, ServeSection,
    TargetOptions, TargetRef, TargetSpec,
};
