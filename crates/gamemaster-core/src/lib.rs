//! `GameMaster` Core Library
//!
//! Shared functionality for `GameMaster` components:
//! - Line protocol types exchanged with player processes
//! - In-band `#` command parsing
//! - Configuration resolution and hierarchy
//! - Common error types

pub mod config;
pub mod error;
pub mod protocol;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
pub use protocol::{Command, CommandError, Message, StreamKind};
