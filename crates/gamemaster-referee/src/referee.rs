//! Match supervisor.
//!
//! Launches the master and the players, runs the routing loop until a `#quit`
//! or the first player exit, then drains the queue and kills whoever is left.

use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::diagnostics::DiagnosticSink;
use crate::process::{ExitNotice, LaunchError, ProcessRegistry, Role, launch};
use crate::queue::{QueueReceiver, message_queue};
use crate::router::{Flow, Router, RouterStats};

const DEFAULT_KILL_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors that stop a match from starting.
#[derive(Debug, thiserror::Error)]
pub enum RefereeError {
    #[error("No programs to launch")]
    NoPrograms,

    #[error("Master process failed to start: {0}")]
    MasterLaunch(#[source] LaunchError),

    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Why the routing loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    /// A player sent `#quit`.
    Quit { by: usize },
    /// A player exited while the match was running.
    PlayerExited {
        id: usize,
        status: Option<ExitStatus>,
    },
    /// Every output stream closed without any process exiting.
    StreamsClosed,
}

/// Summary of a finished match.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub reason: EndReason,
    /// `(id, name)` of every player that named itself.
    pub names: Vec<(usize, String)>,
    /// Ids of processes that were still running and had to be killed.
    pub killed: Vec<usize>,
    pub stats: RouterStats,
}

/// Runs one match between a master and its players.
pub struct Referee {
    programs: Vec<String>,
    sink: Arc<dyn DiagnosticSink>,
    kill_timeout: Duration,
}

impl Referee {
    /// `programs[0]` is the master; the rest are regular players.
    pub fn new(programs: Vec<String>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            programs,
            sink,
            kill_timeout: DEFAULT_KILL_TIMEOUT,
        }
    }

    /// Upper bound on waiting for one killed process to be reaped.
    #[must_use]
    pub fn with_kill_timeout(mut self, timeout: Duration) -> Self {
        self.kill_timeout = timeout;
        self
    }

    /// Launch everyone and play the match to the end.
    pub async fn run(self) -> Result<MatchOutcome, RefereeError> {
        let Some((master, players)) = self.programs.split_first() else {
            return Err(RefereeError::NoPrograms);
        };
        info!(cmd = %master, "Will start game run by master");
        for (i, cmd) in players.iter().enumerate() {
            info!(id = i + 1, cmd = %cmd, "Player");
        }

        let (queue_tx, mut queue) = message_queue();
        let (exit_tx, exit_rx) = mpsc::unbounded_channel();
        let mut registry = ProcessRegistry::new();

        for (id, command_line) in self.programs.iter().enumerate() {
            let role = Role::for_index(id);
            match launch(id, command_line, role, &queue_tx, &exit_tx) {
                Ok(entry) => registry.insert(entry),
                Err(err) => {
                    self.sink
                        .emit(&format!("Could not start player {id} ({role}): {err}"));
                    if role == Role::Master {
                        self.shutdown(&mut registry).await;
                        return Err(RefereeError::MasterLaunch(err));
                    }
                }
            }
        }
        // Readers and watchers hold their own clones.
        drop(queue_tx);
        drop(exit_tx);

        let mut router = Router::new(Arc::clone(&self.sink));
        let reason = supervise(&mut registry, &mut router, &mut queue, exit_rx).await;

        drain(&mut registry, &mut router, &mut queue);

        let killed = self.shutdown(&mut registry).await;
        let outcome = MatchOutcome {
            reason,
            names: registry.names(),
            killed,
            stats: router.stats(),
        };
        info!(reason = ?outcome.reason, killed = ?outcome.killed, "Match finished");
        Ok(outcome)
    }

    /// Run the match on a fresh runtime, blocking the calling thread until it
    /// ends. For front ends that are not async themselves.
    pub fn run_blocking(self) -> Result<MatchOutcome, RefereeError> {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(RefereeError::Runtime)?
            .block_on(self.run())
    }

    /// Kill every process still running. Returns the ids that were killed.
    async fn shutdown(&self, registry: &mut ProcessRegistry) -> Vec<usize> {
        let mut killed = Vec::new();
        for entry in registry.iter_mut() {
            let Some(control) = entry.control.take() else {
                continue;
            };
            if !control.is_alive() {
                continue;
            }
            info!(id = entry.id, pid = ?control.pid(), cmd = %entry.command_line, "Killing player");
            let status = control.kill(self.kill_timeout).await;
            if status.is_none() {
                warn!(id = entry.id, "Exit status of killed player unknown");
            }
            killed.push(entry.id);
        }
        killed
    }
}

/// Route messages until a `#quit` or the first process exit.
async fn supervise(
    registry: &mut ProcessRegistry,
    router: &mut Router,
    queue: &mut QueueReceiver,
    mut exits: mpsc::UnboundedReceiver<ExitNotice>,
) -> EndReason {
    let mut queue_open = true;
    loop {
        tokio::select! {
            biased;
            Some(notice) = exits.recv() => {
                let cmd = registry.get(notice.id).map_or("", |e| e.command_line.as_str());
                info!(
                    player = %registry.label(notice.id),
                    status = ?notice.status,
                    cmd,
                    "Player has quit"
                );
                return EndReason::PlayerExited {
                    id: notice.id,
                    status: notice.status,
                };
            }
            message = queue.recv(), if queue_open => match message {
                Some(message) => {
                    let by = message.id;
                    if router.dispatch(registry, message) == Flow::Quit {
                        return EndReason::Quit { by };
                    }
                }
                // Every stream is closed; keep waiting for an exit.
                None => queue_open = false,
            },
            else => return EndReason::StreamsClosed,
        }
    }
}

/// Deliver whatever was already queued when the loop stopped. Flow is
/// ignored: the match is over either way.
fn drain(registry: &mut ProcessRegistry, router: &mut Router, queue: &mut QueueReceiver) {
    for message in queue.drain() {
        router.dispatch(registry, message);
    }
}
