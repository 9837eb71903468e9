// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [build]
/// output_path = "dist"
/// main = "main.js"
/// main_target = "main"
/// renderer_targets = ["renderer"]
///
/// [runtime]
/// command = "electron"
///
/// [target.main]
/// cmd = "tsc -p tsconfig.main.json"
/// watch_cmd = "tsc -p tsconfig.main.json --watch"
/// success_on_output = "Found 0 errors"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Build options from `[build]`.
    #[serde(default)]
    pub build: PartialBuildOptions,

    /// Serve-only settings from `[serve]`.
    #[serde(default)]
    pub serve: ServeSection,

    /// Runtime process settings from `[runtime]`.
    #[serde(default)]
    pub runtime: RuntimeSection,

    /// All build targets from `[target.<name>]`.
    #[serde(default)]
    pub target: BTreeMap<String, TargetOptions>,
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>`, which checks that the
/// build options resolve (for both `build` and `serve`) and that every target
/// reference points at a `[target.<name>]` section.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub build: PartialBuildOptions,
    pub serve: ServeSection,
    pub runtime: RuntimeSection,
    pub target: BTreeMap<String, TargetOptions>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            build: raw.build,
            serve: raw.serve,
            runtime: raw.runtime,
            target: raw.target,
        }
    }
}

/// Options of a single build target.
///
/// Every field is optional so the same type can describe both a target's
/// configured options and a partial override of them (see
/// [`merge_options`](crate::config::merge_options)).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetOptions {
    /// Command run for one-shot builds (and on every change in
    /// rerun-on-change mode).
    pub cmd: Option<String>,

    /// Long-lived command that rebuilds by itself on file changes.
    pub watch_cmd: Option<String>,

    /// Working directory, relative to the workspace root.
    pub cwd: Option<String>,

    /// Extra environment variables for the command.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Regex: an output line matching it means "rebuild started".
    pub running_on_output: Option<String>,

    /// Regex: an output line matching it means "rebuild succeeded".
    pub success_on_output: Option<String>,

    /// Regex: an output line matching it means "rebuild failed". Checked
    /// before `success_on_output`.
    pub failure_on_output: Option<String>,

    /// Globs (relative to the workspace root) that re-run `cmd` on change
    /// when no `watch_cmd` is set.
    #[serde(default)]
    pub watch: Vec<String>,

    /// Globs excluded from `watch`.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Quiet period before a burst of file changes triggers a re-run.
    pub debounce_ms: Option<u64>,
}

/// Reference to a build target: either `"name"` or
/// `{ target = "name", options = { ... } }`.
///
/// Both parts are optional so a reference can also act as an override of
/// another reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "TargetRefSpec")]
pub struct TargetRef {
    pub target: Option<String>,
    pub options: TargetOptions,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TargetRefSpec {
    Name(String),
    Full {
        #[serde(default)]
        target: Option<String>,
        #[serde(default)]
        options: TargetOptions,
    },
}

impl From<TargetRefSpec> for TargetRef {
    fn from(spec: TargetRefSpec) -> Self {
        match spec {
            TargetRefSpec::Name(target) => TargetRef {
                target: Some(target),
                options: TargetOptions::default(),
            },
            TargetRefSpec::Full { target, options } => TargetRef { target, options },
        }
    }
}

impl TargetRef {
    pub fn named(target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            options: TargetOptions::default(),
        }
    }
}

/// `[build]` as written in the file, and the shape of
/// `[serve].build_overrides`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialBuildOptions {
    /// Output directory, relative to the workspace root.
    pub output_path: Option<String>,

    /// Remove the output directory before building.
    pub clean_output_path: Option<bool>,

    /// Entry point, relative to `output_path`.
    pub main: Option<String>,

    /// Package descriptor copied into the output directory
    /// (default `package.json`).
    pub package_json_path: Option<String>,

    pub main_target: Option<TargetRef>,

    pub renderer_targets: Option<Vec<TargetRef>>,

    /// Merged into `main_target` during normalization.
    pub main_target_overrides: Option<TargetRef>,

    /// Merged into `renderer_targets` (by index) during normalization.
    pub renderer_targets_overrides: Option<Vec<TargetRef>>,
}

/// Fully resolved build options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub output_path: String,
    pub clean_output_path: bool,
    pub main: String,
    pub package_json_path: String,
    pub main_target: TargetSpec,
    pub renderer_targets: Vec<TargetSpec>,
}

/// A target reference with a known target name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub target: String,
    pub options: TargetOptions,
}

/// `[serve]` section.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServeSection {
    /// Partial `[build]` merged over `[build]` when serving.
    #[serde(default)]
    pub build_overrides: PartialBuildOptions,

    /// Template for the replacement entry point. Every `{{main}}` is
    /// replaced with the path of the original entry point, relative to the
    /// written file. Defaults to `output::DEFAULT_ENTRY_WRAPPER`.
    #[serde(default)]
    pub entry_wrapper: Option<String>,

    /// File name (inside `output_path`) the wrapper is written to.
    #[serde(default = "default_wrapper_main")]
    pub wrapper_main: String,
}

fn default_wrapper_main() -> String {
    "main_replaced.js".to_string()
}

impl Default for ServeSection {
    fn default() -> Self {
        Self {
            build_overrides: PartialBuildOptions::default(),
            entry_wrapper: None,
            wrapper_main: default_wrapper_main(),
        }
    }
}

/// `[runtime]` section: the process that executes the build output.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RuntimeSection {
    /// Executable name (looked up on `PATH`) or path.
    #[serde(default = "default_runtime_command")]
    pub command: String,

    /// Arguments placed before the output directory.
    #[serde(default)]
    pub args: Vec<String>,

    /// Signal used for soft reloads (Unix only).
    #[serde(default = "default_reload_signal")]
    pub reload_signal: String,
}

fn default_runtime_command() -> String {
    "electron".to_string()
}

fn default_reload_signal() -> String {
    "SIGUSR1".to_string()
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            command: default_runtime_command(),
            args: Vec::new(),
            reload_signal: default_reload_signal(),
        }
    }
}
