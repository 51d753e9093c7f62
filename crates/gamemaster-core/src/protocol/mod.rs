//! Line protocol spoken between the referee and player processes.
//!
//! Players write newline-terminated text. Lines on stdout are either plain
//! game messages or in-band commands starting with `#`; lines on stderr are
//! diagnostic only and never routed.

mod command;
mod message;

pub use command::{COMMAND_PREFIX, Command, CommandError, parse_command};
pub use message::{Message, StreamKind};
