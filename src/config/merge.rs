// src/config/merge.rs

//! Merging of target options and build options.
//!
//! Overrides only replace what they actually set: a missing value or an
//! empty list/map in the override keeps the base value.

use crate::config::model::{PartialBuildOptions, TargetOptions, TargetRef};

/// Merge `over` into `base`.
pub fn merge_options(base: &TargetOptions, over: &TargetOptions) -> TargetOptions {
    TargetOptions {
        cmd: pick(&base.cmd, &over.cmd),
        watch_cmd: pick(&base.watch_cmd, &over.watch_cmd),
        cwd: pick(&base.cwd, &over.cwd),
        env: if over.env.is_empty() {
            base.env.clone()
        } else {
            over.env.clone()
        },
        running_on_output: pick(&base.running_on_output, &over.running_on_output),
        success_on_output: pick(&base.success_on_output, &over.success_on_output),
        failure_on_output: pick(&base.failure_on_output, &over.failure_on_output),
        watch: pick_list(&base.watch, &over.watch),
        exclude: pick_list(&base.exclude, &over.exclude),
        debounce_ms: over.debounce_ms.or(base.debounce_ms),
    }
}

fn pick(base: &Option<String>, over: &Option<String>) -> Option<String> {
    over.clone().or_else(|| base.clone())
}

fn pick_list(base: &[String], over: &[String]) -> Vec<String> {
    if over.is_empty() {
        base.to_vec()
    } else {
        over.to_vec()
    }
}

/// Merge two target references: the override's target name wins when set,
/// options are merged with [`merge_options`].
pub fn merge_target_ref(base: &TargetRef, over: &TargetRef) -> TargetRef {
    TargetRef {
        target: over.target.clone().or_else(|| base.target.clone()),
        options: merge_options(&base.options, &over.options),
    }
}

impl PartialBuildOptions {
    /// Merge `other` over `self`.
    ///
    /// - `main_target` is merged with [`merge_target_ref`].
    /// - `renderer_targets` are merged by index; extra entries are appended.
    /// - Every other field set in `other` replaces the one in `self`.
    pub fn merge(&self, other: &PartialBuildOptions) -> PartialBuildOptions {
        let main_target = match (&self.main_target, &other.main_target) {
            (Some(base), Some(over)) => Some(merge_target_ref(base, over)),
            (None, Some(over)) => Some(over.clone()),
            (base, None) => base.clone(),
        };

        let renderer_targets = match (&self.renderer_targets, &other.renderer_targets) {
            (base, Some(over)) => {
                let mut merged = base.clone().unwrap_or_default();
                for (i, over_ref) in over.iter().enumerate() {
                    match merged.get_mut(i) {
                        Some(existing) => *existing = merge_target_ref(existing, over_ref),
                        None => merged.push(over_ref.clone()),
                    }
                }
                Some(merged)
            }
            (base, None) => base.clone(),
        };

        PartialBuildOptions {
            output_path: other.output_path.clone().or_else(|| self.output_path.clone()),
            clean_output_path: other.clean_output_path.or(self.clean_output_path),
            main: other.main.clone().or_else(|| self.main.clone()),
            package_json_path: other
                .package_json_path
                .clone()
                .or_else(|| self.package_json_path.clone()),
            main_target,
            renderer_targets,
            main_target_overrides: other
                .main_target_overrides
                .clone()
                .or_else(|| self.main_target_overrides.clone()),
            renderer_targets_overrides: other
                .renderer_targets_overrides
                .clone()
                .or_else(|| self.renderer_targets_overrides.clone()),
        }
    }

    /// Fold `main_target_overrides` / `renderer_targets_overrides` into
    /// `main_target` / `renderer_targets` and drop them.
    pub fn normalize(&self) -> PartialBuildOptions {
        let overrides = PartialBuildOptions {
            main_target: self.main_target_overrides.clone(),
            renderer_targets: self.renderer_targets_overrides.clone(),
            ..PartialBuildOptions::default()
        };
        let mut normalized = self.merge(&overrides);
        normalized.main_target_overrides = None;
        normalized.renderer_targets_overrides = None;
        normalized
    }
}
