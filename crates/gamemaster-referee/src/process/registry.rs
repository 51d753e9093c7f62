//! Registry of launched player processes.
//!
//! Owned by the referee's run loop; only that single task reads or mutates it,
//! so entries carry no locks. Stream readers never touch the registry.

use std::collections::BTreeMap;
use std::fmt;

use tokio::sync::mpsc;
use tracing::debug;

use super::launcher::ChildControl;

/// Part a process plays in the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Broadcaster: its plain messages reach everyone, and it receives
    /// every regular player's messages.
    Master,
    /// Its plain messages go to the master(s) only, tagged with its id.
    Regular,
}

impl Role {
    /// Role for the process at launch index `id`.
    pub const fn for_index(id: usize) -> Self {
        if id == 0 { Self::Master } else { Self::Regular }
    }

    pub const fn broadcasts(self) -> bool {
        matches!(self, Self::Master)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Master => "master",
            Self::Regular => "regular",
        })
    }
}

/// Write side of a player's standard input.
///
/// Lines are queued to a writer task, so sending never blocks the router.
#[derive(Debug, Clone)]
pub struct InputChannel {
    tx: mpsc::UnboundedSender<String>,
}

impl InputChannel {
    /// Create a channel and the receiver its writer task consumes.
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue one line (without terminator). Returns `false` if the writer is
    /// gone, i.e. the player's stdin is closed.
    pub fn send(&self, line: impl Into<String>) -> bool {
        self.tx.send(line.into()).is_ok()
    }
}

/// Everything the referee knows about one launched process.
#[derive(Debug)]
pub struct ProcessEntry {
    pub id: usize,
    pub role: Role,
    /// Command line the process was launched from.
    pub command_line: String,
    pub display_name: Option<String>,
    pub input: InputChannel,
    /// Handle on the OS process. `None` for entries not backed by a child.
    pub control: Option<ChildControl>,
}

impl ProcessEntry {
    pub fn new(id: usize, role: Role, command_line: impl Into<String>, input: InputChannel) -> Self {
        Self {
            id,
            role,
            command_line: command_line.into(),
            display_name: None,
            input,
            control: None,
        }
    }

    #[must_use]
    pub fn with_control(mut self, control: ChildControl) -> Self {
        self.control = Some(control);
        self
    }

    /// Whether the backing process has not been observed to exit.
    pub fn is_alive(&self) -> bool {
        self.control.as_ref().is_some_and(ChildControl::is_alive)
    }
}

/// All processes of one match, keyed by launch index.
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    entries: BTreeMap<usize, ProcessEntry>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, replacing any previous entry with the same id.
    pub fn insert(&mut self, entry: ProcessEntry) {
        debug!(id = entry.id, role = %entry.role, "Registered process");
        self.entries.insert(entry.id, entry);
    }

    pub fn get(&self, id: usize) -> Option<&ProcessEntry> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: usize) -> bool {
        self.entries.contains_key(&id)
    }

    /// Entries in launch order.
    pub fn iter(&self) -> impl Iterator<Item = &ProcessEntry> {
        self.entries.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ProcessEntry> {
        self.entries.values_mut()
    }

    /// Entries currently playing the master role.
    pub fn masters(&self) -> impl Iterator<Item = &ProcessEntry> {
        self.iter().filter(|e| e.role == Role::Master)
    }

    /// Display name of `id`, if it has set one.
    pub fn name(&self, id: usize) -> Option<&str> {
        self.entries.get(&id)?.display_name.as_deref()
    }

    /// Set the display name of `id`. Returns `false` if `id` is unknown.
    pub fn set_name(&mut self, id: usize, name: impl Into<String>) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.display_name = Some(name.into());
                true
            }
            None => false,
        }
    }

    /// Number of processes that have set a display name.
    pub fn named_count(&self) -> usize {
        self.iter().filter(|e| e.display_name.is_some()).count()
    }

    /// `(id, name)` for every named process, in launch order.
    pub fn names(&self) -> Vec<(usize, String)> {
        self.iter()
            .filter_map(|e| Some((e.id, e.display_name.clone()?)))
            .collect()
    }

    /// How `id` is referred to in logs and diagnostics.
    pub fn label(&self, id: usize) -> String {
        match self.name(id) {
            Some(name) => format!("'{name}' (id {id})"),
            None => format!("player {id}"),
        }
    }

    /// Queue `line` for the stdin of `id`. Returns `false` if `id` is unknown
    /// or its stdin is closed.
    pub fn send_to(&self, id: usize, line: &str) -> bool {
        self.entries
            .get(&id)
            .is_some_and(|entry| entry.input.send(line))
    }
}
