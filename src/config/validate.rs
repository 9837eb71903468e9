// src/config/validate.rs

use crate::config::model::{
    BuildOptions, ConfigFile, PartialBuildOptions, RawConfigFile, RuntimeSection, TargetRef,
    TargetSpec,
};
use crate::errors::{HotserveError, Result};

const DEFAULT_PACKAGE_JSON: &str = "package.json";

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::HotserveError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

impl TryFrom<&PartialBuildOptions> for BuildOptions {
    type Error = crate::errors::HotserveError;

    /// Normalize and resolve partial build options, failing on anything a
    /// build cannot run without.
    fn try_from(partial: &PartialBuildOptions) -> std::result::Result<Self, Self::Error> {
        let normalized = partial.normalize();

        let output_path = required_str(&normalized.output_path, "output_path")?;
        let main = required_str(&normalized.main, "main")?;

        let main_target = match &normalized.main_target {
            Some(target_ref) => resolve_ref(target_ref, "main_target")?,
            None => {
                return Err(HotserveError::ConfigError(
                    "[build].main_target is required".to_string(),
                ));
            }
        };

        let renderer_targets = normalized
            .renderer_targets
            .as_deref()
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(i, target_ref)| resolve_ref(target_ref, &format!("renderer_targets[{i}]")))
            .collect::<Result<Vec<_>>>()?;

        Ok(BuildOptions {
            output_path,
            clean_output_path: normalized.clean_output_path.unwrap_or(false),
            main,
            package_json_path: normalized
                .package_json_path
                .clone()
                .unwrap_or_else(|| DEFAULT_PACKAGE_JSON.to_string()),
            main_target,
            renderer_targets,
        })
    }
}

impl ConfigFile {
    /// Resolved options for `hotserve build`.
    pub fn build_options(&self) -> Result<BuildOptions> {
        BuildOptions::try_from(&self.build)
    }

    /// Resolved options for `hotserve serve`: `[build]` with
    /// `[serve].build_overrides` merged on top.
    pub fn serve_build_options(&self) -> Result<BuildOptions> {
        let merged = self
            .build
            .normalize()
            .merge(&self.serve.build_overrides.normalize());
        BuildOptions::try_from(&merged)
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_targets(cfg)?;
    validate_runtime(&cfg.runtime)?;

    let build = BuildOptions::try_from(&cfg.build)?;
    validate_target_refs(cfg, &build)?;

    let serve_partial = cfg.build.normalize().merge(&cfg.serve.build_overrides.normalize());
    let serve = BuildOptions::try_from(&serve_partial)?;
    validate_target_refs(cfg, &serve)?;

    if cfg.serve.wrapper_main.trim().is_empty() {
        return Err(HotserveError::ConfigError(
            "[serve].wrapper_main must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn ensure_has_targets(cfg: &RawConfigFile) -> Result<()> {
    if cfg.target.is_empty() {
        return Err(HotserveError::ConfigError(
            "config must contain at least one [target.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_runtime(runtime: &RuntimeSection) -> Result<()> {
    if runtime.command.trim().is_empty() {
        return Err(HotserveError::ConfigError(
            "[runtime].command must not be empty".to_string(),
        ));
    }

    #[cfg(unix)]
    {
        use nix::sys::signal::Signal;

        if runtime.reload_signal.parse::<Signal>().is_err() {
            return Err(HotserveError::ConfigError(format!(
                "[runtime].reload_signal '{}' is not a known signal name (e.g. \"SIGUSR1\")",
                runtime.reload_signal
            )));
        }
    }

    Ok(())
}

fn validate_target_refs(cfg: &RawConfigFile, build: &BuildOptions) -> Result<()> {
    let all = std::iter::once(&build.main_target).chain(build.renderer_targets.iter());
    for spec in all {
        if !cfg.target.contains_key(&spec.target) {
            return Err(HotserveError::ConfigError(format!(
                "build refers to unknown target '{}' (no [target.{}] section)",
                spec.target, spec.target
            )));
        }
    }
    Ok(())
}

fn required_str(value: &Option<String>, field: &str) -> Result<String> {
    match value {
        Some(s) if !s.trim().is_empty() => Ok(s.clone()),
        _ => Err(HotserveError::ConfigError(format!(
            "[build].{field} is required"
        ))),
    }
}

fn resolve_ref(target_ref: &TargetRef, field: &str) -> Result<TargetSpec> {
    match &target_ref.target {
        Some(target) if !target.trim().is_empty() => Ok(TargetSpec {
            target: target.clone(),
            options: target_ref.options.clone(),
        }),
        _ => Err(HotserveError::ConfigError(format!(
            "[build].{field} has no target name"
        ))),
    }
}
