//! `GameMaster` Referee Library
//!
//! Core functionality for the referee:
//! - Player process launch and supervision
//! - Per-stream line readers feeding one message queue
//! - Routing of plain messages between master and players
//! - In-band `#` command interpretation

pub mod diagnostics;
pub mod process;
pub mod queue;
pub mod referee;
pub mod router;

pub use diagnostics::{DiagnosticSink, RecordingSink, TracingSink};
pub use referee::{MatchOutcome, Referee, RefereeError};
