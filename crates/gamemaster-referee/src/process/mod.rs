//! Player process management.

pub mod launcher;
pub mod reader;
pub mod registry;

pub use launcher::{ChildControl, ExitNotice, LaunchError, launch, split_command_line};
pub use reader::spawn_stream_reader;
pub use registry::{InputChannel, ProcessEntry, ProcessRegistry, Role};
