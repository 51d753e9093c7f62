//! Tagged lines read from player processes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which output stream of a player process a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line produced by a player, tagged with its origin.
///
/// Created by a stream reader and consumed exactly once by the router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Launch index of the sending process.
    pub id: usize,
    /// Stream the line was read from.
    pub stream: StreamKind,
    /// Whether a plain message goes to every player instead of the masters.
    pub broadcast: bool,
    /// The line, without its terminator.
    pub text: String,
}

impl Message {
    pub fn new(id: usize, stream: StreamKind, broadcast: bool, text: impl Into<String>) -> Self {
        Self {
            id,
            stream,
            broadcast,
            text: text.into(),
        }
    }

    /// The same line as a master would see it when forwarded: `"<id> <text>"`.
    pub fn tagged(&self) -> String {
        format!("{} {}", self.id, self.text)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}", self.id, self.stream)?;
        if self.broadcast {
            f.write_str(":broadcast")?;
        }
        write!(f, "] {}", self.text)
    }
}
