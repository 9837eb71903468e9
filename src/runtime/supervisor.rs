// src/runtime/supervisor.rs

//! Owner of the external runtime process.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::RuntimeSection;
use crate::errors::Result;

use super::lines::{LineBuffer, LineSink, OutputStream};
use super::locate::locate_executable;
use super::RuntimeControl;

/// Environment variable telling the runtime process which signal means
/// "refresh".
pub const RELOAD_SIGNAL_ENV: &str = "HOTSERVE_RELOAD_SIGNAL";

/// The process currently owned by the supervisor.
///
/// `generation` identifies one spawn; the exit monitor of an older spawn
/// must never clear a newer one.
#[derive(Debug)]
struct Tracked {
    generation: u64,
    pid: Option<u32>,
    kill_tx: oneshot::Sender<()>,
}

type TrackedSlot = Arc<Mutex<Option<Tracked>>>;

/// Spawns, kills and signals a single runtime process.
///
/// At most one process is tracked at a time. stdout/stderr are split into
/// lines and forwarded to the configured [`LineSink`]. Dropping the
/// supervisor kills the tracked process.
///
/// The reload signal is only sent when the process is known to handle it
/// (see [`ProcessSupervisor::with_reload_handler`]); otherwise a soft
/// reload restarts the process, since the default action of `SIGUSR1` is
/// to terminate it.
pub struct ProcessSupervisor {
    command: String,
    args: Vec<String>,
    reload_signal: String,
    app_path: PathBuf,
    /// Resolved once, on the first successful `open`.
    executable: Option<PathBuf>,
    sink: Arc<dyn LineSink>,
    reload_handler: bool,
    tracked: TrackedSlot,
    next_generation: u64,
}

impl std::fmt::Debug for ProcessSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSupervisor")
            .field("command", &self.command)
            .field("app_path", &self.app_path)
            .field("pid", &self.pid())
            .finish_non_exhaustive()
    }
}

impl ProcessSupervisor {
    /// Create a supervisor that runs `<command> <args..> <app_path>`.
    pub fn new(
        options: &RuntimeSection,
        app_path: impl Into<PathBuf>,
        sink: Arc<dyn LineSink>,
    ) -> Self {
        Self {
            command: options.command.clone(),
            args: options.args.clone(),
            reload_signal: options.reload_signal.clone(),
            app_path: app_path.into(),
            executable: None,
            sink,
            reload_handler: false,
            tracked: Arc::new(Mutex::new(None)),
            next_generation: 0,
        }
    }

    /// Declare whether the launched application installs a handler for the
    /// reload signal, e.g. through the injected entry wrapper.
    pub fn with_reload_handler(mut self, installed: bool) -> Self {
        self.reload_handler = installed;
        self
    }

    /// PID of the tracked process, if any.
    pub fn pid(&self) -> Option<u32> {
        lock(&self.tracked).as_ref().and_then(|t| t.pid)
    }

    /// Whether a process is currently tracked.
    pub fn is_running(&self) -> bool {
        lock(&self.tracked).is_some()
    }

    /// Spawn a fresh runtime process, killing the tracked one first.
    pub fn open(&mut self) -> Result<()> {
        self.kill();

        let executable = match &self.executable {
            Some(path) => path.clone(),
            None => {
                let path = locate_executable(&self.command)?;
                self.executable = Some(path.clone());
                path
            }
        };

        let mut cmd = Command::new(&executable);
        cmd.args(&self.args)
            .arg(&self.app_path)
            .env(RELOAD_SIGNAL_ENV, &self.reload_signal)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .with_context(|| format!("spawning runtime process {:?}", executable))?;

        self.next_generation += 1;
        let generation = self.next_generation;
        let pid = child.id();
        let (kill_tx, kill_rx) = oneshot::channel();

        *lock(&self.tracked) = Some(Tracked {
            generation,
            pid,
            kill_tx,
        });

        info!(
            ?pid,
            generation,
            executable = %executable.display(),
            "runtime process started"
        );

        tokio::spawn(monitor(
            child,
            kill_rx,
            Arc::clone(&self.tracked),
            generation,
            Arc::clone(&self.sink),
        ));

        Ok(())
    }

    /// Terminate the tracked process, if any.
    ///
    /// The tracked reference is cleared immediately. On Unix the process is
    /// killed before this returns; the monitor task only reaps it and
    /// flushes its output.
    pub fn kill(&mut self) {
        let Some(tracked) = lock(&self.tracked).take() else {
            return;
        };

        debug!(
            pid = ?tracked.pid,
            generation = tracked.generation,
            "killing runtime process"
        );

        #[cfg(unix)]
        if let Some(pid) = tracked.pid {
            terminate(pid);
        }

        if tracked.kill_tx.send(()).is_err() {
            debug!(
                generation = tracked.generation,
                "runtime process already exited while killing"
            );
        }
    }

    /// Ask the tracked process to refresh; spawn one if none is tracked.
    pub fn signal(&mut self) -> Result<()> {
        match self.pid() {
            Some(pid) if self.reload_handler => self.send_reload(pid),
            Some(pid) => {
                debug!(pid, "runtime process has no reload handler; restarting it");
                self.open()
            }
            None => {
                debug!("no runtime process to signal; spawning one instead");
                self.open()
            }
        }
    }

    #[cfg(unix)]
    fn send_reload(&mut self, pid: u32) -> Result<()> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let signal: Signal = self.reload_signal.parse().map_err(|e| {
            crate::errors::HotserveError::ConfigError(format!(
                "invalid reload_signal '{}': {e}",
                self.reload_signal
            ))
        })?;

        debug!(pid, %signal, "sending reload signal to runtime process");
        kill(Pid::from_raw(pid as i32), signal)
            .with_context(|| format!("sending {signal} to runtime process {pid}"))?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn send_reload(&mut self, pid: u32) -> Result<()> {
        warn!(pid, "reload signals are not supported on this platform; respawning");
        self.open()
    }
}

impl RuntimeControl for ProcessSupervisor {
    fn open(&mut self) -> Result<()> {
        ProcessSupervisor::open(self)
    }

    fn signal(&mut self) -> Result<()> {
        ProcessSupervisor::signal(self)
    }

    fn kill(&mut self) {
        ProcessSupervisor::kill(self)
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Send `SIGKILL` and wait (bounded) until the process has exited.
#[cfg(unix)]
fn terminate(pid: u32) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let pid = Pid::from_raw(pid as i32);
    match kill(pid, Signal::SIGKILL) {
        Ok(()) => wait_for_exit(pid),
        Err(e) => debug!(%pid, error = %e, "runtime process already gone"),
    }
}

/// Block until `pid` is a zombie (or already reaped) without reaping it, so
/// the monitor task still observes the exit status.
#[cfg(target_os = "linux")]
fn wait_for_exit(pid: nix::unistd::Pid) {
    use std::time::{Duration, Instant};

    use nix::sys::wait::{Id, WaitPidFlag, WaitStatus, waitid};

    const KILL_TIMEOUT: Duration = Duration::from_secs(2);

    let flags = WaitPidFlag::WEXITED | WaitPidFlag::WNOWAIT | WaitPidFlag::WNOHANG;
    let deadline = Instant::now() + KILL_TIMEOUT;
    loop {
        match waitid(Id::Pid(pid), flags) {
            Ok(WaitStatus::StillAlive) if Instant::now() < deadline => {
                std::thread::sleep(Duration::from_millis(2));
            }
            Ok(WaitStatus::StillAlive) => {
                warn!(%pid, "runtime process did not exit after SIGKILL");
                return;
            }
            _ => return,
        }
    }
}

/// Elsewhere the exit is only observed by the monitor task.
#[cfg(all(unix, not(target_os = "linux")))]
fn wait_for_exit(_pid: nix::unistd::Pid) {}

fn lock(slot: &TrackedSlot) -> MutexGuard<'_, Option<Tracked>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Wait for the process to exit (or for a kill request), then clear the
/// tracked slot if it still belongs to this generation and flush output.
async fn monitor(
    mut child: Child,
    mut kill_rx: oneshot::Receiver<()>,
    tracked: TrackedSlot,
    generation: u64,
    sink: Arc<dyn LineSink>,
) {
    let stdout = child
        .stdout
        .take()
        .map(|out| tokio::spawn(pump(out, OutputStream::Stdout, Arc::clone(&sink))));
    let stderr = child
        .stderr
        .take()
        .map(|err| tokio::spawn(pump(err, OutputStream::Stderr, Arc::clone(&sink))));

    let status = tokio::select! {
        status = child.wait() => status,
        _ = &mut kill_rx => {
            if let Err(e) = child.start_kill() {
                warn!(generation, error = %e, "failed to kill runtime process");
            }
            child.wait().await
        }
    };

    {
        let mut guard = lock(&tracked);
        if guard.as_ref().is_some_and(|t| t.generation == generation) {
            *guard = None;
        }
    }

    match status {
        Ok(status) => info!(generation, %status, "runtime process exited"),
        Err(e) => warn!(generation, error = %e, "failed to wait for runtime process"),
    }

    for pump in [stdout, stderr].into_iter().flatten() {
        if let Err(e) = pump.await {
            debug!(generation, error = %e, "output pump task failed");
        }
    }
}

/// Forward `reader` to `sink` line by line; flush the partial tail at EOF.
async fn pump<R>(mut reader: R, stream: OutputStream, sink: Arc<dyn LineSink>)
where
    R: AsyncRead + Unpin,
{
    let mut buffer = LineBuffer::new();
    let mut chunk = [0u8; 4096];

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                for line in buffer.push(&chunk[..n]) {
                    sink.line(stream, &line);
                }
            }
            Err(e) => {
                debug!(?stream, error = %e, "error reading runtime output");
                break;
            }
        }
    }

    if let Some(rest) = buffer.finish() {
        sink.line(stream, &rest);
    }
}
