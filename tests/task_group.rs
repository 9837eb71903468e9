// tests/task_group.rs

use hotserve::config::{BuildOptions, TargetOptions, TargetSpec};
use hotserve::engine::TaskGroup;
use hotserve::errors::HotserveError;
use hotserve::types::{RunMode, TaskKind};
use hotserve_test_utils::builders::TargetOptionsBuilder;
use hotserve_test_utils::fake_scheduler::FakeScheduler;
use hotserve_test_utils::init_tracing;

fn spec(target: &str, options: TargetOptions) -> TargetSpec {
    TargetSpec {
        target: target.to_string(),
        options,
    }
}

fn options(renderers: &[&str]) -> BuildOptions {
    BuildOptions {
        output_path: "dist".to_string(),
        clean_output_path: false,
        main: "main.js".to_string(),
        package_json_path: "package.json".to_string(),
        main_target: spec("main", TargetOptions::default()),
        renderer_targets: renderers
            .iter()
            .map(|r| spec(r, TargetOptions::default()))
            .collect(),
    }
}

fn scheduler() -> FakeScheduler {
    FakeScheduler::new()
        .with_target("main")
        .with_target("ui")
        .with_target("overlay")
}

#[tokio::test]
async fn renderers_are_scheduled_before_main_with_numbered_prefixes() {
    init_tracing();
    let scheduler = scheduler();

    let group = TaskGroup::schedule(&scheduler, &options(&["ui", "overlay"]), RunMode::Watch)
        .await
        .unwrap();

    assert_eq!(group.targets(), vec!["ui", "overlay", "main"]);
    assert_eq!(
        group.kinds(),
        vec![TaskKind::Renderer, TaskKind::Renderer, TaskKind::Main]
    );

    let requests = scheduler.requests();
    let prefixes: Vec<_> = requests.iter().map(|r| r.prefix.as_str()).collect();
    assert_eq!(prefixes, vec!["Renderer 1", "Renderer 2", "Main"]);
    assert!(requests.iter().all(|r| r.mode == RunMode::Watch));
}

#[tokio::test]
async fn single_renderer_gets_a_plain_prefix() {
    init_tracing();
    let scheduler = scheduler();

    let group = TaskGroup::schedule(&scheduler, &options(&["ui"]), RunMode::Once)
        .await
        .unwrap();

    assert_eq!(group.len(), 2);
    let prefixes: Vec<_> = group.members().iter().map(|m| m.prefix.clone()).collect();
    assert_eq!(prefixes, vec!["Renderer".to_string(), "Main".to_string()]);
}

#[tokio::test]
async fn reference_overrides_are_passed_to_the_scheduler() {
    init_tracing();
    let scheduler = scheduler();
    let mut opts = options(&[]);
    opts.main_target.options = TargetOptionsBuilder::new().cmd("make main").build();

    TaskGroup::schedule(&scheduler, &opts, RunMode::Once)
        .await
        .unwrap();

    let requests = scheduler.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].overrides.cmd.as_deref(), Some("make main"));
    assert_eq!(requests[0].kind, TaskKind::Main);
}

#[tokio::test]
async fn scheduling_failure_stops_already_started_targets() {
    init_tracing();
    let scheduler = scheduler().fail_schedule("main");

    let err = TaskGroup::schedule(&scheduler, &options(&["ui", "overlay"]), RunMode::Watch)
        .await
        .unwrap_err();

    assert!(matches!(err, HotserveError::InvalidTargetOptions { ref target, .. } if target == "main"));
    assert_eq!(
        scheduler.stopped(),
        vec!["ui".to_string(), "overlay".to_string()]
    );
}

#[tokio::test]
async fn validation_happens_before_anything_starts() {
    init_tracing();
    let scheduler = scheduler().fail_validation("main");

    let err = TaskGroup::schedule(&scheduler, &options(&["ui"]), RunMode::Watch)
        .await
        .unwrap_err();

    assert!(matches!(err, HotserveError::InvalidTargetOptions { .. }));
    assert!(scheduler.requests().is_empty());
    assert!(scheduler.stopped().is_empty());
}

#[tokio::test]
async fn unknown_target_is_reported() {
    init_tracing();
    let scheduler = FakeScheduler::new().with_target("main");

    let err = TaskGroup::schedule(&scheduler, &options(&["missing"]), RunMode::Once)
        .await
        .unwrap_err();

    assert!(matches!(err, HotserveError::TargetNotFound(ref t) if t == "missing"));
}
