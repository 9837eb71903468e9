// src/engine/build.rs

use std::path::Path;

use tracing::{debug, info};

use crate::cycle::combine_verdict;
use crate::fs::FileSystem;
use crate::logging::PrefixLogger;
use crate::types::TaskResult;

use super::group::TaskGroup;

/// One-shot build: wait for the first result of every target and combine
/// them into a single verdict.
///
/// A target whose result stream ends without a result counts as failed. A
/// successful build must also have produced `entry_point`. All targets are
/// stopped before returning.
pub async fn run_build(mut group: TaskGroup, fs: &dyn FileSystem, entry_point: &Path) -> bool {
    let logger = PrefixLogger::new("Build");
    let streams = group.take_streams();

    let mut results = Vec::with_capacity(streams.len());
    for (member, mut stream) in group.members().iter().zip(streams) {
        let result = stream.results.recv().await.unwrap_or_else(|| {
            TaskResult::Failure("target ended without reporting a result".to_string())
        });
        debug!(task = %member.target, ?result, "first result received");
        results.push(result);
    }

    let mut success = combine_verdict(&results);

    if !success {
        let failed: Vec<&str> = group
            .members()
            .iter()
            .zip(&results)
            .filter(|(_, result)| !result.is_success())
            .map(|(member, _)| member.target.as_str())
            .collect();
        logger.error(&format!(
            "The following targets failed to build: {}",
            failed.join(", ")
        ));
    } else if !fs.is_file(entry_point) {
        logger.error(&format!(
            "Configuration error: entry point {} was not produced by the build",
            entry_point.display()
        ));
        success = false;
    }

    group.stop_all().await;

    if success {
        logger.info("Build succeeded");
    }
    info!(success, "one-shot build finished");
    success
}
