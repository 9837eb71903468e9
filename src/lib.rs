// src/lib.rs

pub mod cli;
pub mod config;
pub mod cycle;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod output;
pub mod path_utils;
pub mod runtime;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::{BuildOptions, ConfigFile, TargetSpec, load_and_validate};
use crate::engine::{ServeEvent, ServeRuntime, TaskGroup, run_build};
use crate::exec::CommandScheduler;
use crate::fs::{FileSystem, RealFileSystem};
use crate::logging::PrefixLogger;
use crate::output::{DEFAULT_ENTRY_WRAPPER, ReplaceMain, setup_output_path};
use crate::runtime::ProcessSupervisor;
use crate::types::RunMode;

/// High-level entry point used by `main.rs`.
///
/// Returns the final verdict (`true` = success). Setup failures (config,
/// output directory, scheduling) are returned as errors; everything after
/// that is reported through the verdict.
pub async fn run(args: CliArgs) -> Result<bool> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    let workspace_root = config_root_dir(&config_path);
    debug!(root = %workspace_root.display(), "resolved workspace root");

    match args.command {
        Command::Build(opts) => {
            let options = cfg.build_options()?;
            if opts.dry_run {
                print_dry_run("build", &cfg, &options);
                return Ok(true);
            }
            build(&cfg, &options, &workspace_root).await
        }
        Command::Serve(opts) => {
            let options = cfg.serve_build_options()?;
            if opts.dry_run {
                print_dry_run("serve", &cfg, &options);
                return Ok(true);
            }
            serve(&cfg, &options, &workspace_root).await
        }
    }
}

async fn build(cfg: &ConfigFile, options: &BuildOptions, root: &Path) -> Result<bool> {
    let fs = RealFileSystem;
    let paths = setup_output_path(&fs, root, options, None)?;

    let scheduler = CommandScheduler::from_config(cfg, root);
    let group = TaskGroup::schedule(&scheduler, options, RunMode::Once).await?;

    Ok(run_build(group, &fs, &paths.original_main_path).await)
}

async fn serve(cfg: &ConfigFile, options: &BuildOptions, root: &Path) -> Result<bool> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    let template = match &cfg.serve.entry_wrapper {
        Some(wrapper) => fs
            .read_to_string(&root.join(wrapper))
            .with_context(|| format!("reading [serve].entry_wrapper {wrapper}"))?,
        None => DEFAULT_ENTRY_WRAPPER.to_string(),
    };
    let replace_main = ReplaceMain::from_template(cfg.serve.wrapper_main.clone(), template);

    let paths = setup_output_path(fs.as_ref(), root, options, Some(&replace_main))?;

    let scheduler = CommandScheduler::from_config(cfg, root);
    let group = TaskGroup::schedule(&scheduler, options, RunMode::Watch).await?;

    let supervisor = ProcessSupervisor::new(
        &cfg.runtime,
        &paths.output_path,
        Arc::new(PrefixLogger::new("Runtime")),
    )
    .with_reload_handler(true);
    let runtime = ServeRuntime::new(group, supervisor, fs, &paths.original_main_path);

    // Ctrl-C → graceful shutdown.
    {
        let tx = runtime.event_sender();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(ServeEvent::ShutdownRequested).await;
        });
    }

    info!(output = %paths.output_path.display(), "serving");
    Ok(runtime.run().await)
}

/// Directory of the config file, or the current directory for a bare
/// file name.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Print the resolved options of every target without running anything.
fn print_dry_run(mode: &str, cfg: &ConfigFile, options: &BuildOptions) {
    println!("hotserve {mode} dry-run");
    println!("  output_path = {}", options.output_path);
    println!("  clean_output_path = {}", options.clean_output_path);
    println!("  main = {}", options.main);
    println!("  package_json_path = {}", options.package_json_path);
    if mode == "serve" {
        println!(
            "  runtime = {} {:?}, reload_signal = {}",
            cfg.runtime.command, cfg.runtime.args, cfg.runtime.reload_signal
        );
        if let Some(wrapper) = &cfg.serve.entry_wrapper {
            println!("  entry_wrapper = {wrapper} -> {}", cfg.serve.wrapper_main);
        }
    }
    println!();

    println!("targets ({}):", options.renderer_targets.len() + 1);
    for spec in &options.renderer_targets {
        print_target("renderer", cfg, spec);
    }
    print_target("main", cfg, &options.main_target);

    debug!("dry-run complete (no execution)");
}

fn print_target(kind: &str, cfg: &ConfigFile, spec: &TargetSpec) {
    let base = cfg.target.get(&spec.target).cloned().unwrap_or_default();
    let merged = config::merge_options(&base, &spec.options);

    println!("  - {} ({kind})", spec.target);
    if let Some(cmd) = &merged.cmd {
        println!("      cmd: {cmd}");
    }
    if let Some(watch_cmd) = &merged.watch_cmd {
        println!("      watch_cmd: {watch_cmd}");
    }
    if let Some(cwd) = &merged.cwd {
        println!("      cwd: {cwd}");
    }
    if !merged.env.is_empty() {
        println!("      env: {:?}", merged.env);
    }
    for (name, value) in [
        ("running_on_output", &merged.running_on_output),
        ("success_on_output", &merged.success_on_output),
        ("failure_on_output", &merged.failure_on_output),
    ] {
        if let Some(value) = value {
            println!("      {name}: {value}");
        }
    }
    if !merged.watch.is_empty() {
        println!("      watch: {:?}", merged.watch);
    }
    if !merged.exclude.is_empty() {
        println!("      exclude: {:?}", merged.exclude);
    }
}
