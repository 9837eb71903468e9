// tests/build_one_shot.rs

use std::path::Path;

use hotserve::config::{BuildOptions, TargetOptions, TargetSpec};
use hotserve::engine::{TaskGroup, run_build};
use hotserve::fs::mock::MockFileSystem;
use hotserve::types::RunMode;
use hotserve_test_utils::fake_scheduler::FakeScheduler;
use hotserve_test_utils::{init_tracing, with_timeout};

const ENTRY: &str = "/app/dist/main.js";

fn options() -> BuildOptions {
    let spec = |target: &str| TargetSpec {
        target: target.to_string(),
        options: TargetOptions::default(),
    };
    BuildOptions {
        output_path: "dist".to_string(),
        clean_output_path: false,
        main: "main.js".to_string(),
        package_json_path: "package.json".to_string(),
        main_target: spec("main"),
        renderer_targets: vec![spec("renderer")],
    }
}

async fn group(scheduler: &FakeScheduler) -> TaskGroup {
    TaskGroup::schedule(scheduler, &options(), RunMode::Once)
        .await
        .unwrap()
}

fn scheduler() -> FakeScheduler {
    FakeScheduler::new().with_target("main").with_target("renderer")
}

#[tokio::test]
async fn all_targets_succeed() {
    init_tracing();
    let scheduler = scheduler();
    let group = group(&scheduler).await;
    let fs = MockFileSystem::new();
    fs.add_file(ENTRY, "");

    scheduler.task("renderer").rebuilt().await;
    scheduler.task("main").rebuilt().await;

    let ok = with_timeout(run_build(group, &fs, Path::new(ENTRY))).await;
    assert!(ok);

    let mut stopped = scheduler.stopped();
    stopped.sort();
    assert_eq!(stopped, vec!["main".to_string(), "renderer".to_string()]);
}

#[tokio::test]
async fn one_failure_fails_the_build() {
    init_tracing();
    let scheduler = scheduler();
    let group = group(&scheduler).await;
    let fs = MockFileSystem::new();
    fs.add_file(ENTRY, "");

    scheduler.task("renderer").fail("exit status 2").await;
    scheduler.task("main").rebuilt().await;

    assert!(!with_timeout(run_build(group, &fs, Path::new(ENTRY))).await);
    assert_eq!(scheduler.stopped().len(), 2);
}

#[tokio::test]
async fn missing_entry_point_fails_the_build() {
    init_tracing();
    let scheduler = scheduler();
    let group = group(&scheduler).await;
    let fs = MockFileSystem::new();

    scheduler.task("renderer").rebuilt().await;
    scheduler.task("main").rebuilt().await;

    assert!(!with_timeout(run_build(group, &fs, Path::new(ENTRY))).await);
}

#[tokio::test]
async fn only_the_first_result_counts() {
    init_tracing();
    let scheduler = scheduler();
    let group = group(&scheduler).await;
    let fs = MockFileSystem::new();
    fs.add_file(ENTRY, "");

    let main = scheduler.task("main");
    scheduler.task("renderer").rebuilt().await;
    main.fail("first").await;
    main.succeed().await;

    assert!(!with_timeout(run_build(group, &fs, Path::new(ENTRY))).await);
}

#[tokio::test]
async fn target_ending_without_result_fails_the_build() {
    init_tracing();
    let scheduler = scheduler();
    let group = group(&scheduler).await;
    let fs = MockFileSystem::new();
    fs.add_file(ENTRY, "");

    scheduler.task("renderer").rebuilt().await;
    // Drop every sender of "main" without reporting.
    scheduler.release_all();

    assert!(!with_timeout(run_build(group, &fs, Path::new(ENTRY))).await);
}
