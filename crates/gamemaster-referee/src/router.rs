//! Message router and in-band command interpreter.
//!
//! Dispatch rules, in order:
//! 1. stderr lines are dropped
//! 2. `#` lines are executed as commands and never forwarded
//! 3. broadcast lines go verbatim to every player
//! 4. anything else goes to the master(s) as `"<id> <text>"`

use std::sync::Arc;

use gamemaster_core::protocol::parse_command;
use gamemaster_core::{Command, CommandError, Message, StreamKind};
use tracing::{debug, info};

use crate::diagnostics::DiagnosticSink;
use crate::process::ProcessRegistry;

/// What the run loop should do after a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// A `#quit` was executed.
    Quit,
}

/// Running totals of what the router did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterStats {
    pub broadcasts: u64,
    pub forwarded: u64,
    pub commands: u64,
    pub malformed: u64,
    pub dropped_stderr: u64,
}

pub struct Router {
    sink: Arc<dyn DiagnosticSink>,
    stats: RouterStats,
}

impl Router {
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            sink,
            stats: RouterStats::default(),
        }
    }

    pub const fn stats(&self) -> RouterStats {
        self.stats
    }

    /// Handle one message from the queue.
    pub fn dispatch(&mut self, registry: &mut ProcessRegistry, message: Message) -> Flow {
        debug!(
            id = message.id,
            stream = %message.stream,
            broadcast = message.broadcast,
            "{}",
            message.text
        );

        if message.stream == StreamKind::Stderr {
            self.stats.dropped_stderr += 1;
            return Flow::Continue;
        }

        if let Some(parsed) = parse_command(&message.text) {
            self.stats.commands += 1;
            return match parsed {
                Ok(command) => self.execute(registry, message.id, command),
                Err(err) => {
                    self.report(registry, message.id, &err);
                    Flow::Continue
                }
            };
        }

        if message.broadcast {
            self.stats.broadcasts += 1;
            post_all(registry, &message.text);
        } else {
            self.stats.forwarded += 1;
            post_masters(registry, &message.tagged());
        }
        Flow::Continue
    }

    fn execute(&mut self, registry: &mut ProcessRegistry, sender: usize, command: Command) -> Flow {
        match command {
            Command::GetName { id } => {
                let answer = if registry.contains(id) {
                    registry
                        .name(id)
                        .map(str::to_string)
                        .ok_or(CommandError::Unnamed(id))
                } else {
                    Err(CommandError::UnknownId(id))
                };
                match answer {
                    Ok(name) => {
                        info!(from = %registry.label(sender), query = id, answer = %name, "#getname");
                        reply(registry, sender, &format!("#getname {id} {name}"));
                    }
                    Err(err) => self.report(registry, sender, &err),
                }
            }
            Command::Name { name } => {
                if registry.set_name(sender, name) {
                    info!(id = sender, name = ?registry.name(sender), "Player named");
                } else {
                    debug!(id = sender, "#name from unregistered sender");
                }
            }
            Command::Players => {
                let count = registry.named_count();
                info!(from = %registry.label(sender), answer = count, "#players");
                reply(registry, sender, &format!("#players {count}"));
            }
            Command::Quit => {
                info!(from = %registry.label(sender), "#quit received, ending match");
                post_all(registry, "#quit");
                return Flow::Quit;
            }
            Command::Unrecognized { keyword } => {
                debug!(from = %registry.label(sender), keyword, "Ignoring unrecognized command");
            }
        }
        Flow::Continue
    }

    fn report(&mut self, registry: &ProcessRegistry, sender: usize, err: &CommandError) {
        self.stats.malformed += 1;
        self.sink.emit(&format!("{}: {err}", registry.label(sender)));
    }
}

/// Send straight to the sender, bypassing broadcast rules.
fn reply(registry: &ProcessRegistry, sender: usize, text: &str) {
    if !registry.send_to(sender, text) {
        debug!(id = sender, "Reply not delivered, stdin closed or sender unknown");
    }
}

fn post_all(registry: &ProcessRegistry, text: &str) {
    for entry in registry.iter() {
        if !entry.input.send(text) {
            debug!(id = entry.id, "Broadcast not delivered, stdin closed");
        }
    }
}

fn post_masters(registry: &ProcessRegistry, text: &str) {
    for entry in registry.masters() {
        if !entry.input.send(text) {
            debug!(id = entry.id, "Forward not delivered, stdin closed");
        }
    }
}
