// src/watch/watcher.rs

use std::path::PathBuf;

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::path_utils::relative_str;
use crate::watch::patterns::WatchProfile;

/// Handle for the filesystem watcher.
///
/// Dropping this handle stops file watching and closes the change channel.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch `root` recursively and forward every changed path that matches
/// `profile` (relative to `root`) on the returned channel.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    profile: WatchProfile,
) -> Result<(WatcherHandle, mpsc::Receiver<PathBuf>)> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);

    // notify calls back on its own thread.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                // Only fails once the forwarding task is gone.
                let _ = event_tx.send(event);
            }
            Err(err) => {
                eprintln!("hotserve: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;
    info!(task = %profile.target(), root = %root.display(), "file watcher started");

    let (change_tx, change_rx) = mpsc::channel::<PathBuf>(64);

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if matches!(event.kind, EventKind::Access(_)) {
                continue;
            }

            for path in event.paths {
                let Some(rel) = relative_str(&root, &path) else {
                    debug!(path = %path.display(), "ignoring path outside watch root");
                    continue;
                };

                if !profile.matches(&rel) {
                    continue;
                }

                debug!(task = %profile.target(), path = %rel, "watched file changed");
                if change_tx.send(path).await.is_err() {
                    return;
                }
            }
        }
        debug!(task = %profile.target(), "file watcher event stream ended");
    });

    Ok((WatcherHandle { _inner: watcher }, change_rx))
}
