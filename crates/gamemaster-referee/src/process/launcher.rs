//! Player process launch and lifecycle.
//!
//! Each launched player gets:
//! - a stdin writer task behind its [`InputChannel`]
//! - one [`spawn_stream_reader`] task per output stream
//! - an exit watcher that owns the `Child`, reports its exit on the exit
//!   channel and kills it on request

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use gamemaster_core::StreamKind;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::reader::spawn_stream_reader;
use super::registry::{InputChannel, ProcessEntry, Role};
use crate::queue::QueueSender;

/// Reported by an exit watcher once its process is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitNotice {
    pub id: usize,
    pub status: Option<ExitStatus>,
    /// The referee killed it, as opposed to the player exiting by itself.
    pub killed: bool,
}

/// Handle on a running player process, held in its registry entry.
#[derive(Debug)]
pub struct ChildControl {
    pid: Option<u32>,
    /// Set by the watcher before it publishes its [`ExitNotice`].
    exited: Arc<AtomicBool>,
    kill_tx: Option<oneshot::Sender<()>>,
    watcher: JoinHandle<Option<ExitStatus>>,
}

impl ChildControl {
    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Whether the process is still running. Never blocks.
    pub fn is_alive(&self) -> bool {
        !self.exited.load(Ordering::Acquire)
    }

    /// Kill the process immediately and wait up to `timeout` for it to be
    /// reaped. Returns its exit status when known.
    pub async fn kill(mut self, timeout: Duration) -> Option<ExitStatus> {
        if let Some(tx) = self.kill_tx.take() {
            let _ = tx.send(());
        }
        match tokio::time::timeout(timeout, self.watcher).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                warn!(pid = ?self.pid, error = %e, "Exit watcher failed");
                None
            }
            Err(_) => {
                warn!(pid = ?self.pid, "Timed out waiting for killed process");
                None
            }
        }
    }
}

/// Errors from launching a player process.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("Empty command line")]
    EmptyCommand,

    #[error("Failed to start '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to capture {stream} of '{command}'")]
    PipeUnavailable {
        command: String,
        stream: &'static str,
    },
}

/// Split a command line into an argument vector on literal spaces.
///
/// There is no quoting or escaping: an argument can never contain a space.
/// Runs of spaces do not produce empty arguments.
pub fn split_command_line(command_line: &str) -> Vec<String> {
    command_line
        .split(' ')
        .filter(|arg| !arg.is_empty())
        .map(String::from)
        .collect()
}

/// Launch the player at launch index `id`.
///
/// Its output lines go to `queue`, tagged with `id` and the role's broadcast
/// flag; its exit is reported on `exits`.
pub fn launch(
    id: usize,
    command_line: &str,
    role: Role,
    queue: &QueueSender,
    exits: &mpsc::UnboundedSender<ExitNotice>,
) -> Result<ProcessEntry, LaunchError> {
    let args = split_command_line(command_line);
    let (program, rest) = args.split_first().ok_or(LaunchError::EmptyCommand)?;

    let mut child = Command::new(program)
        .args(rest)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| LaunchError::SpawnFailed {
            command: command_line.to_string(),
            source,
        })?;

    let pipe_error = |stream| LaunchError::PipeUnavailable {
        command: command_line.to_string(),
        stream,
    };
    let stdin = child.stdin.take().ok_or_else(|| pipe_error("stdin"))?;
    let stdout = child.stdout.take().ok_or_else(|| pipe_error("stdout"))?;
    let stderr = child.stderr.take().ok_or_else(|| pipe_error("stderr"))?;

    let pid = child.id();
    info!(id, %role, ?pid, cmd = command_line, "Launched player");

    let (input, input_rx) = InputChannel::pair();
    spawn_stdin_writer(id, stdin, input_rx);

    let broadcast = role.broadcasts();
    spawn_stream_reader(stdout, id, StreamKind::Stdout, broadcast, queue.clone());
    spawn_stream_reader(stderr, id, StreamKind::Stderr, broadcast, queue.clone());

    let (kill_tx, kill_rx) = oneshot::channel();
    let exited = Arc::new(AtomicBool::new(false));
    let watcher = spawn_exit_watcher(id, child, kill_rx, Arc::clone(&exited), exits.clone());

    let control = ChildControl {
        pid,
        exited,
        kill_tx: Some(kill_tx),
        watcher,
    };
    Ok(ProcessEntry::new(id, role, command_line, input).with_control(control))
}

fn spawn_stdin_writer(id: usize, stdin: ChildStdin, mut lines: mpsc::UnboundedReceiver<String>) {
    tokio::spawn(async move {
        let mut stdin = stdin;
        while let Some(line) = lines.recv().await {
            if let Err(e) = stdin.write_all(line.as_bytes()).await {
                debug!(id, error = %e, "Failed to write to stdin");
                break;
            }
            if let Err(e) = stdin.write_all(b"\n").await {
                debug!(id, error = %e, "Failed to write newline");
                break;
            }
            if let Err(e) = stdin.flush().await {
                debug!(id, error = %e, "Failed to flush stdin");
                break;
            }
        }
        debug!(id, "Stdin writer finished");
    });
}

fn spawn_exit_watcher(
    id: usize,
    mut child: Child,
    kill_rx: oneshot::Receiver<()>,
    exited: Arc<AtomicBool>,
    exits: mpsc::UnboundedSender<ExitNotice>,
) -> JoinHandle<Option<ExitStatus>> {
    tokio::spawn(async move {
        // A dropped kill handle counts as a kill request.
        let (status, killed) = tokio::select! {
            status = child.wait() => (status, false),
            _ = kill_rx => {
                if let Err(e) = child.kill().await {
                    warn!(id, error = %e, "Failed to kill process");
                }
                (child.wait().await, true)
            }
        };
        let status = match status {
            Ok(status) => Some(status),
            Err(e) => {
                warn!(id, error = %e, "Failed to wait for process");
                None
            }
        };
        debug!(id, ?status, killed, "Process gone");
        exited.store(true, Ordering::Release);
        let _ = exits.send(ExitNotice { id, status, killed });
        status
    })
}
