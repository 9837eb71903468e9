// tests/supervisor_process.rs
#![cfg(unix)]

use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::kill;
use nix::unistd::Pid;
use tokio::sync::mpsc;

use hotserve::config::RuntimeSection;
use hotserve::errors::HotserveError;
use hotserve::runtime::{LineSink, OutputStream, ProcessSupervisor};
use hotserve_test_utils::{init_tracing, with_timeout};

/// Forwards every line to a channel.
struct ChannelSink(mpsc::UnboundedSender<(OutputStream, String)>);

impl LineSink for ChannelSink {
    fn line(&self, stream: OutputStream, line: &str) {
        let _ = self.0.send((stream, line.to_string()));
    }
}

/// Supervisor whose script is assumed to trap the reload signal.
fn supervisor(script: &str) -> (ProcessSupervisor, mpsc::UnboundedReceiver<(OutputStream, String)>) {
    let (sup, rx) = bare_supervisor(script);
    (sup.with_reload_handler(true), rx)
}

fn bare_supervisor(script: &str) -> (ProcessSupervisor, mpsc::UnboundedReceiver<(OutputStream, String)>) {
    init_tracing();
    let (tx, rx) = mpsc::unbounded_channel();
    let options = RuntimeSection {
        command: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        reload_signal: "SIGUSR1".to_string(),
    };
    // The app path ends up as `$0` of the script.
    let sup = ProcessSupervisor::new(&options, "/tmp/hotserve-app", Arc::new(ChannelSink(tx)));
    (sup, rx)
}

fn alive(pid: u32) -> bool {
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

/// Scheduler state from `/proc/<pid>/stat`; `None` once the pid is gone.
#[cfg(target_os = "linux")]
fn proc_state(pid: u32) -> Option<char> {
    let stat = std::fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
    let (_, rest) = stat.rsplit_once(')')?;
    rest.trim_start().chars().next()
}

async fn wait_dead(pid: u32) {
    with_timeout(async {
        while alive(pid) {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
}

async fn wait_for_line(rx: &mut mpsc::UnboundedReceiver<(OutputStream, String)>, wanted: &str) {
    with_timeout(async {
        loop {
            let (_, line) = rx.recv().await.expect("sink closed");
            if line == wanted {
                return;
            }
        }
    })
    .await;
}

#[tokio::test]
async fn open_twice_leaves_one_live_process() {
    let (mut sup, _rx) = supervisor("exec sleep 30");

    sup.open().unwrap();
    let first = sup.pid().unwrap();
    sup.open().unwrap();
    let second = sup.pid().unwrap();

    assert_ne!(first, second);
    wait_dead(first).await;
    assert!(alive(second));

    sup.kill();
    wait_dead(second).await;
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn open_kills_the_previous_process_before_returning() {
    let (mut sup, _rx) = supervisor("exec sleep 30");

    sup.open().unwrap();
    let first = sup.pid().unwrap();
    sup.open().unwrap();
    let second = sup.pid().unwrap();

    // Dead or at least a zombie waiting to be reaped, never still running.
    let state = proc_state(first);
    assert!(
        matches!(state, None | Some('Z') | Some('X')),
        "old process {first} still in state {state:?}"
    );
    assert!(matches!(proc_state(second), Some(s) if s != 'Z' && s != 'X'));

    sup.kill();
    assert!(matches!(proc_state(second), None | Some('Z') | Some('X')));
}

#[tokio::test]
async fn kill_then_signal_spawns_a_new_process() {
    let (mut sup, _rx) = supervisor("exec sleep 30");

    sup.open().unwrap();
    let first = sup.pid().unwrap();
    sup.kill();
    assert!(!sup.is_running());
    // Killing again is a no-op.
    sup.kill();

    sup.signal().unwrap();
    let second = sup.pid().unwrap();
    assert_ne!(first, second);
    assert!(alive(second));

    wait_dead(first).await;
    drop(sup);
    wait_dead(second).await;
}

#[tokio::test]
async fn signal_reaches_the_running_process() {
    let (mut sup, mut rx) = supervisor(
        "trap 'echo reloaded' USR1; echo ready; while true; do sleep 0.05; done",
    );

    sup.open().unwrap();
    wait_for_line(&mut rx, "ready").await;
    let pid = sup.pid().unwrap();

    sup.signal().unwrap();
    wait_for_line(&mut rx, "reloaded").await;

    // Still the same process.
    assert_eq!(sup.pid(), Some(pid));
    sup.kill();
    wait_dead(pid).await;
}

#[tokio::test]
async fn signal_without_reload_handler_restarts_the_process() {
    let (mut sup, _rx) = bare_supervisor("while true; do sleep 0.05; done");

    sup.open().unwrap();
    let first = sup.pid().unwrap();

    sup.signal().unwrap();
    let second = sup.pid().unwrap();
    assert_ne!(first, second);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(sup.is_running());
    assert_eq!(sup.pid(), Some(second));
    assert!(alive(second));

    sup.kill();
    wait_dead(second).await;
}

#[tokio::test]
async fn output_lines_and_final_partial_line_are_forwarded() {
    let (mut sup, mut rx) = supervisor(
        "printf 'first\\nsecond\\n'; printf 'oops\\n' >&2; printf 'partial'",
    );

    sup.open().unwrap();

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    with_timeout(async {
        while let Some((stream, line)) = rx.recv().await {
            match stream {
                OutputStream::Stdout => stdout.push(line),
                OutputStream::Stderr => stderr.push(line),
            }
            if stdout.len() == 3 && stderr.len() == 1 {
                break;
            }
        }
    })
    .await;

    assert_eq!(stdout, vec!["first", "second", "partial"]);
    assert_eq!(stderr, vec!["oops"]);
}

#[tokio::test]
async fn exited_process_is_no_longer_tracked() {
    let (mut sup, mut rx) = supervisor("echo bye");

    sup.open().unwrap();
    wait_for_line(&mut rx, "bye").await;

    with_timeout(async {
        while sup.is_running() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
}

#[tokio::test]
async fn child_sees_app_path_and_reload_signal() {
    let (mut sup, mut rx) = supervisor("echo \"$0 $HOTSERVE_RELOAD_SIGNAL\"");

    sup.open().unwrap();
    wait_for_line(&mut rx, "/tmp/hotserve-app SIGUSR1").await;
}

#[tokio::test]
async fn missing_executable_is_reported_and_supervisor_stays_usable() {
    init_tracing();
    let (tx, _rx) = mpsc::unbounded_channel();
    let options = RuntimeSection {
        command: "hotserve-no-such-runtime-binary".to_string(),
        ..RuntimeSection::default()
    };
    let mut sup = ProcessSupervisor::new(&options, "/tmp/app", Arc::new(ChannelSink(tx)));

    let err = sup.open().unwrap_err();
    assert!(matches!(err, HotserveError::RuntimeNotFound(_)));
    assert!(err.to_string().contains("Is it installed?"));
    assert!(!sup.is_running());

    // signal() falls back to open() and fails the same way.
    assert!(matches!(sup.signal(), Err(HotserveError::RuntimeNotFound(_))));
}
