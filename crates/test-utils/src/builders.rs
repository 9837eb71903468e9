#![allow(dead_code)]

use std::collections::BTreeMap;

use hotserve::config::{
    ConfigFile, PartialBuildOptions, RawConfigFile, RuntimeSection, ServeSection, TargetOptions,
    TargetRef,
};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts with `output_path = "dist"` and `main = "main.js"`; the main target
/// must be set with [`ConfigFileBuilder::main_target`].
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                build: PartialBuildOptions {
                    output_path: Some("dist".to_string()),
                    main: Some("main.js".to_string()),
                    ..PartialBuildOptions::default()
                },
                serve: ServeSection::default(),
                runtime: RuntimeSection::default(),
                target: BTreeMap::new(),
            },
        }
    }

    pub fn with_target(mut self, name: &str, options: TargetOptions) -> Self {
        self.config.target.insert(name.to_string(), options);
        self
    }

    pub fn main_target(mut self, name: &str) -> Self {
        self.config.build.main_target = Some(TargetRef::named(name));
        self
    }

    pub fn renderer_target(mut self, name: &str) -> Self {
        self.config
            .build
            .renderer_targets
            .get_or_insert_with(Vec::new)
            .push(TargetRef::named(name));
        self
    }

    pub fn output_path(mut self, path: &str) -> Self {
        self.config.build.output_path = Some(path.to_string());
        self
    }

    pub fn main(mut self, main: &str) -> Self {
        self.config.build.main = Some(main.to_string());
        self
    }

    pub fn serve_overrides(mut self, overrides: PartialBuildOptions) -> Self {
        self.config.serve.build_overrides = overrides;
        self
    }

    pub fn runtime_command(mut self, command: &str) -> Self {
        self.config.runtime.command = command.to_string();
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TargetOptions`.
#[derive(Default)]
pub struct TargetOptionsBuilder {
    options: TargetOptions,
}

impl TargetOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cmd(mut self, cmd: &str) -> Self {
        self.options.cmd = Some(cmd.to_string());
        self
    }

    pub fn watch_cmd(mut self, cmd: &str) -> Self {
        self.options.watch_cmd = Some(cmd.to_string());
        self
    }

    pub fn cwd(mut self, cwd: &str) -> Self {
        self.options.cwd = Some(cwd.to_string());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.options.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn running_on(mut self, pattern: &str) -> Self {
        self.options.running_on_output = Some(pattern.to_string());
        self
    }

    pub fn success_on(mut self, pattern: &str) -> Self {
        self.options.success_on_output = Some(pattern.to_string());
        self
    }

    pub fn failure_on(mut self, pattern: &str) -> Self {
        self.options.failure_on_output = Some(pattern.to_string());
        self
    }

    pub fn watch(mut self, pattern: &str) -> Self {
        self.options.watch.push(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.options.exclude.push(pattern.to_string());
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.options.debounce_ms = Some(ms);
        self
    }

    pub fn build(self) -> TargetOptions {
        self.options
    }
}
