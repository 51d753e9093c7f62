//! In-band `#` commands understood by the referee.
//!
//! Commands are tokenized rather than sliced at fixed offsets: after trimming,
//! the keyword runs up to the first whitespace character and the argument is
//! everything after that one character.

use std::fmt;

use thiserror::Error;

/// Every in-band command starts with this character.
pub const COMMAND_PREFIX: char = '#';

const GETNAME: &str = "#getname";
const NAME: &str = "#name";
const PLAYERS: &str = "#players";
const QUIT: &str = "#quit";

/// A parsed in-band command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `#getname <id>`: ask for another player's display name.
    GetName { id: usize },
    /// `#name <text>`: set the sender's display name.
    Name { name: String },
    /// `#players`: ask how many players have named themselves.
    Players,
    /// `#quit`: end the match for everyone.
    Quit,
    /// Any other `#` line. Swallowed without a reply.
    Unrecognized { keyword: String },
}

impl Command {
    pub fn keyword(&self) -> &str {
        match self {
            Self::GetName { .. } => GETNAME,
            Self::Name { .. } => NAME,
            Self::Players => PLAYERS,
            Self::Quit => QUIT,
            Self::Unrecognized { keyword } => keyword,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GetName { id } => write!(f, "{GETNAME} {id}"),
            Self::Name { name } => write!(f, "{NAME} {name}"),
            Self::Players | Self::Quit | Self::Unrecognized { .. } => f.write_str(self.keyword()),
        }
    }
}

/// Why a command line could not be honoured.
///
/// The `Display` text is the body of the diagnostic attributed to the sender.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Malformed #getname query: no ID given. Proper syntax is '#getname ID'")]
    MissingId,

    #[error(
        "Malformed #getname query: ID '{0}' was not parsable as a number. Proper syntax is '#getname ID'"
    )]
    InvalidId(String),

    #[error("Malformed #getname query: ID {0} is not valid. Proper syntax is '#getname ID'")]
    UnknownId(usize),

    #[error("#getname query for ID {0}, which has not set a name")]
    Unnamed(usize),

    #[error("Malformed #name command: no name specified. Proper syntax is '#name NAME'")]
    MissingName,
}

/// Parse one line as an in-band command.
///
/// Returns `None` when the trimmed line does not start with `#`, i.e. it is a
/// plain game message.
pub fn parse_command(line: &str) -> Option<Result<Command, CommandError>> {
    let line = line.trim();
    if !line.starts_with(COMMAND_PREFIX) {
        return None;
    }

    let (keyword, argument) = match line.find(char::is_whitespace) {
        Some(at) => {
            let sep_len = line[at..].chars().next().map_or(1, char::len_utf8);
            (&line[..at], Some(&line[at + sep_len..]))
        }
        None => (line, None),
    };

    Some(match (keyword, argument) {
        (GETNAME, None) => Err(CommandError::MissingId),
        (GETNAME, Some(arg)) => parse_id(arg.trim()),
        (NAME, None) => Err(CommandError::MissingName),
        (NAME, Some(name)) => Ok(Command::Name {
            name: name.to_string(),
        }),
        (PLAYERS, None) => Ok(Command::Players),
        (QUIT, None) => Ok(Command::Quit),
        _ => Ok(Command::Unrecognized {
            keyword: keyword.to_string(),
        }),
    })
}

fn parse_id(arg: &str) -> Result<Command, CommandError> {
    if arg.is_empty() {
        return Err(CommandError::MissingId);
    }
    arg.parse::<usize>()
        .map(|id| Command::GetName { id })
        .map_err(|_| CommandError::InvalidId(arg.to_string()))
}
