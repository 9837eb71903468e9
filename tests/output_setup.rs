// tests/output_setup.rs

use std::path::Path;

use serde_json::Value;
use tempfile::TempDir;

use hotserve::config::{BuildOptions, TargetOptions, TargetSpec};
use hotserve::errors::HotserveError;
use hotserve::fs::mock::MockFileSystem;
use hotserve::fs::{FileSystem, RealFileSystem};
use hotserve::output::{DEFAULT_ENTRY_WRAPPER, ReplaceMain, setup_output_path};

fn options(output_path: &str, main: &str, clean: bool) -> BuildOptions {
    BuildOptions {
        output_path: output_path.to_string(),
        clean_output_path: clean,
        main: main.to_string(),
        package_json_path: "package.json".to_string(),
        main_target: TargetSpec {
            target: "main".to_string(),
            options: TargetOptions::default(),
        },
        renderer_targets: Vec::new(),
    }
}

fn descriptor(fs: &MockFileSystem, path: &str) -> Value {
    serde_json::from_str(&fs.contents(path).expect("descriptor written")).unwrap()
}

#[test]
fn copies_descriptor_with_main_relative_to_output() {
    let fs = MockFileSystem::new();
    fs.add_file("/app/package.json", r#"{"name":"demo","main":"src/index.js"}"#);

    let paths = setup_output_path(
        &fs,
        Path::new("/app"),
        &options("dist", "main/index.js", false),
        None,
    )
    .unwrap();

    assert_eq!(paths.output_path, Path::new("/app/dist"));
    assert_eq!(paths.original_main_path, Path::new("/app/dist/main/index.js"));
    assert_eq!(paths.main_path, paths.original_main_path);
    assert_eq!(paths.package_json_path, Path::new("/app/dist/package.json"));

    let json = descriptor(&fs, "/app/dist/package.json");
    assert_eq!(json["name"], "demo");
    assert_eq!(json["main"], "main/index.js");
}

#[test]
fn missing_descriptor_is_a_config_error() {
    let fs = MockFileSystem::new();

    let err = setup_output_path(&fs, Path::new("/app"), &options("dist", "main.js", false), None)
        .unwrap_err();

    assert!(matches!(err, HotserveError::ConfigError(ref m) if m.contains("package.json")));
}

#[test]
fn replacement_entry_point_wraps_the_original() {
    let fs = MockFileSystem::new();
    fs.add_file("/app/package.json", r#"{"name":"demo"}"#);
    let replace = ReplaceMain::from_template(
        "main_replaced.js",
        "require('hot-hook');\nrequire('./{{main}}');\n".to_string(),
    );

    let paths = setup_output_path(
        &fs,
        Path::new("/app"),
        &options("dist", "main/index.js", false),
        Some(&replace),
    )
    .unwrap();

    assert_eq!(paths.main_path, Path::new("/app/dist/main_replaced.js"));
    assert_eq!(
        fs.contents("/app/dist/main_replaced.js").unwrap(),
        "require('hot-hook');\nrequire('./main/index.js');\n"
    );
    assert_eq!(descriptor(&fs, "/app/dist/package.json")["main"], "main_replaced.js");
}

#[test]
fn default_wrapper_handles_the_reload_signal_and_loads_the_original() {
    let fs = MockFileSystem::new();
    fs.add_file("/app/package.json", r#"{"name":"demo"}"#);
    let replace = ReplaceMain::from_template("main_replaced.js", DEFAULT_ENTRY_WRAPPER.to_string());

    setup_output_path(
        &fs,
        Path::new("/app"),
        &options("dist", "main/index.js", false),
        Some(&replace),
    )
    .unwrap();

    let wrapper = fs.contents("/app/dist/main_replaced.js").unwrap();
    assert!(wrapper.contains("process.env.HOTSERVE_RELOAD_SIGNAL"));
    assert!(wrapper.contains("process.on(signal"));
    assert!(wrapper.contains("require('./main/index.js');"));
    assert!(!wrapper.contains("{{main}}"));
}

#[test]
fn clean_output_path_removes_stale_files() {
    let fs = MockFileSystem::new();
    fs.add_file("/app/package.json", "{}");
    fs.add_file("/app/dist/stale.js", "old");

    setup_output_path(&fs, Path::new("/app"), &options("dist", "main.js", true), None).unwrap();

    assert!(!fs.exists(Path::new("/app/dist/stale.js")));
    assert!(fs.exists(Path::new("/app/dist")));
}

#[test]
fn non_object_descriptor_is_rejected() {
    let fs = MockFileSystem::new();
    fs.add_file("/app/package.json", "[1, 2]");

    let err = setup_output_path(&fs, Path::new("/app"), &options("dist", "main.js", false), None)
        .unwrap_err();
    assert!(err.to_string().contains("JSON object"));
}

#[test]
fn works_against_the_real_filesystem() {
    let dir = TempDir::new().unwrap();
    let fs = RealFileSystem;
    std::fs::write(dir.path().join("package.json"), r#"{"version":"1.0.0"}"#).unwrap();
    std::fs::create_dir_all(dir.path().join("out/old")).unwrap();
    std::fs::write(dir.path().join("out/old/file.js"), "x").unwrap();

    let paths = setup_output_path(
        &fs,
        dir.path(),
        &options("out", "./app/../main.js", true),
        None,
    )
    .unwrap();

    assert!(!dir.path().join("out/old").exists());
    assert_eq!(paths.original_main_path, dir.path().join("out/main.js"));

    let written = fs.read_to_string(&paths.package_json_path).unwrap();
    let json: Value = serde_json::from_str(&written).unwrap();
    assert_eq!(json["main"], "main.js");
    assert_eq!(json["version"], "1.0.0");
}
