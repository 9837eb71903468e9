// src/exec/command.rs

//! Shell command construction and output capture for build targets.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::time::timeout;

/// How long to keep reading output after the process exited.
const OUTPUT_DRAIN: Duration = Duration::from_millis(250);

/// Build a shell command appropriate for the platform.
pub fn shell_command(line: &str, cwd: &Path, env: &BTreeMap<String, String>) -> Command {
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(line);
        c
    };

    cmd.current_dir(cwd)
        .envs(env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// Spawn `line` through the shell and merge its stdout and stderr lines into
/// one channel.
///
/// The channel closes once both streams reached EOF. Dropping the returned
/// `Child` kills the process.
pub fn spawn_with_output(
    line: &str,
    cwd: &Path,
    env: &BTreeMap<String, String>,
) -> Result<(Child, mpsc::Receiver<String>)> {
    let mut child = shell_command(line, cwd, env)
        .spawn()
        .with_context(|| format!("spawning `{line}` in {}", cwd.display()))?;

    let (tx, rx) = mpsc::channel(256);
    if let Some(stdout) = child.stdout.take() {
        forward_lines(stdout, tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        forward_lines(stderr, tx);
    }

    Ok((child, rx))
}

fn forward_lines<R>(reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });
}

/// Collect the lines still buffered after the process exited.
///
/// Stops at EOF, or after a short grace period when something else (a
/// grandchild) keeps the pipes open.
pub async fn drain_output(lines: &mut mpsc::Receiver<String>) -> Vec<String> {
    let mut rest = Vec::new();
    while let Ok(Some(line)) = timeout(OUTPUT_DRAIN, lines.recv()).await {
        rest.push(line);
    }
    rest
}
