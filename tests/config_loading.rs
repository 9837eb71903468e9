// tests/config_loading.rs

use std::io::Write;

use tempfile::NamedTempFile;

use hotserve::config::{
    PartialBuildOptions, RawConfigFile, TargetOptions, TargetRef, load_and_validate,
    merge_options,
};
use hotserve::errors::HotserveError;
use hotserve_test_utils::builders::{ConfigFileBuilder, TargetOptionsBuilder};

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

const FULL: &str = r#"
[build]
output_path = "dist"
main = "main.js"
main_target = "main"
renderer_targets = ["ui", { target = "overlay", options = { cwd = "overlay" } }]
renderer_targets_overrides = [{ options = { cmd = "vite build --mode ui" } }]

[serve]
build_overrides = { output_path = "dist-dev", main_target_overrides = { options = { env = { NODE_ENV = "development" } } } }
entry_wrapper = "tools/wrapper.js"

[runtime]
command = "electron"
args = ["--inspect"]

[target.main]
cmd = "tsc -p tsconfig.main.json"
watch_cmd = "tsc -p tsconfig.main.json --watch --preserveWatchOutput"
success_on_output = "Found 0 errors"
failure_on_output = "Found [1-9][0-9]* errors?"

[target.ui]
cmd = "vite build"
watch = ["src/ui/**"]

[target.overlay]
cmd = "vite build"
watch = ["src/overlay/**"]
"#;

#[test]
fn loads_and_resolves_build_options() {
    let file = write_config(FULL);
    let cfg = load_and_validate(file.path()).unwrap();

    let build = cfg.build_options().unwrap();
    assert_eq!(build.output_path, "dist");
    assert_eq!(build.main, "main.js");
    assert_eq!(build.package_json_path, "package.json");
    assert!(!build.clean_output_path);
    assert_eq!(build.main_target.target, "main");

    let targets: Vec<_> = build.renderer_targets.iter().map(|t| t.target.as_str()).collect();
    assert_eq!(targets, vec!["ui", "overlay"]);
    // Overrides were folded into the first renderer reference.
    assert_eq!(
        build.renderer_targets[0].options.cmd.as_deref(),
        Some("vite build --mode ui")
    );
    assert_eq!(build.renderer_targets[1].options.cwd.as_deref(), Some("overlay"));

    assert_eq!(cfg.runtime.args, vec!["--inspect".to_string()]);
    assert_eq!(cfg.runtime.reload_signal, "SIGUSR1");
    assert_eq!(cfg.serve.wrapper_main, "main_replaced.js");
}

#[test]
fn serve_overrides_merge_over_build() {
    let file = write_config(FULL);
    let cfg = load_and_validate(file.path()).unwrap();

    let serve = cfg.serve_build_options().unwrap();
    assert_eq!(serve.output_path, "dist-dev");
    assert_eq!(serve.main, "main.js");
    assert_eq!(serve.main_target.target, "main");
    assert_eq!(
        serve.main_target.options.env.get("NODE_ENV").map(String::as_str),
        Some("development")
    );
    assert_eq!(serve.renderer_targets.len(), 2);
}

#[test]
fn missing_required_fields_are_rejected() {
    let file = write_config(
        r#"
[build]
main = "main.js"
main_target = "main"

[target.main]
cmd = "make"
"#,
    );
    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, HotserveError::ConfigError(ref m) if m.contains("output_path")));
}

#[test]
fn unknown_target_reference_is_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_target("main", TargetOptionsBuilder::new().cmd("make").build())
        .main_target("main")
        .renderer_target("ui")
        .raw();

    let err = hotserve::config::ConfigFile::try_from(raw).unwrap_err();
    assert!(matches!(err, HotserveError::ConfigError(ref m) if m.contains("'ui'")));
}

#[test]
fn unknown_target_in_serve_overrides_is_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_target("main", TargetOptionsBuilder::new().cmd("make").build())
        .main_target("main")
        .serve_overrides(PartialBuildOptions {
            main_target: Some(TargetRef::named("dev-main")),
            ..PartialBuildOptions::default()
        })
        .raw();

    assert!(hotserve::config::ConfigFile::try_from(raw).is_err());
}

#[test]
fn reference_without_name_is_rejected() {
    let mut raw: RawConfigFile = ConfigFileBuilder::new()
        .with_target("main", TargetOptions::default())
        .raw();
    raw.build.main_target = Some(TargetRef::default());

    let err = hotserve::config::ConfigFile::try_from(raw).unwrap_err();
    assert!(err.to_string().contains("has no target name"));
}

#[test]
fn empty_runtime_command_is_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_target("main", TargetOptions::default())
        .main_target("main")
        .runtime_command("  ")
        .raw();

    assert!(hotserve::config::ConfigFile::try_from(raw).is_err());
}

#[cfg(unix)]
#[test]
fn invalid_reload_signal_is_rejected() {
    let mut raw = ConfigFileBuilder::new()
        .with_target("main", TargetOptions::default())
        .main_target("main")
        .raw();
    raw.runtime.reload_signal = "SIGNOPE".to_string();

    let err = hotserve::config::ConfigFile::try_from(raw).unwrap_err();
    assert!(err.to_string().contains("reload_signal"));
}

#[test]
fn unknown_fields_are_rejected() {
    let file = write_config(
        r#"
[build]
output_path = "dist"
main = "main.js"
main_target = "main"

[target.main]
cmd = "make"
shell = "bash"
"#,
    );
    assert!(matches!(
        load_and_validate(file.path()),
        Err(HotserveError::TomlError(_))
    ));
}

#[test]
fn option_merge_keeps_base_for_unset_values() {
    let base = TargetOptionsBuilder::new()
        .cmd("tsc")
        .watch("src/**")
        .env("A", "1")
        .build();
    let over = TargetOptionsBuilder::new().cwd("app").build();

    let merged = merge_options(&base, &over);
    assert_eq!(merged.cmd.as_deref(), Some("tsc"));
    assert_eq!(merged.cwd.as_deref(), Some("app"));
    assert_eq!(merged.watch, vec!["src/**".to_string()]);
    assert_eq!(merged.env.get("A").map(String::as_str), Some("1"));

    let over = TargetOptionsBuilder::new().cmd("tsc -b").watch("lib/**").build();
    let merged = merge_options(&base, &over);
    assert_eq!(merged.cmd.as_deref(), Some("tsc -b"));
    assert_eq!(merged.watch, vec!["lib/**".to_string()]);
}

#[test]
fn renderer_lists_merge_by_index_and_append_extras() {
    let base = PartialBuildOptions {
        renderer_targets: Some(vec![TargetRef::named("ui")]),
        ..PartialBuildOptions::default()
    };
    let over = PartialBuildOptions {
        renderer_targets: Some(vec![
            TargetRef {
                target: None,
                options: TargetOptionsBuilder::new().cmd("vite").build(),
            },
            TargetRef::named("overlay"),
        ]),
        ..PartialBuildOptions::default()
    };

    let merged = base.merge(&over);
    let renderers = merged.renderer_targets.unwrap();
    assert_eq!(renderers.len(), 2);
    assert_eq!(renderers[0].target.as_deref(), Some("ui"));
    assert_eq!(renderers[0].options.cmd.as_deref(), Some("vite"));
    assert_eq!(renderers[1].target.as_deref(), Some("overlay"));
}
