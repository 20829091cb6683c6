//! Command Error Taxonomy
//!
//! Every failure a command can produce is a [`CommandError`] variant. The
//! rendered text is `<TAG> <message>`, with the tag (`ERR` or `WRONGTYPE`)
//! being part of the client-facing contract. A given condition always renders
//! the same text, whichever command raised it.
//!
//! Errors are ordinary values returned by the dispatcher. They never close a
//! connection.

use crate::commands::Reply;
use thiserror::Error;

/// Result type returned by command handlers.
pub type CommandResult<T = Reply> = Result<T, CommandError>;

/// Coarse classification of command errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed invocation: wrong arity or an unparsable request argument
    Syntax,
    /// Key holds a value of an incompatible type
    WrongType,
    /// A stored value the command needed as a number is not one
    NotANumber,
    /// Arithmetic overflow, non-finite result, or index out of range
    Range,
    /// Command requires an existing key
    NoSuchKey,
    /// No handler registered under that name
    UnknownCommand,
}

/// Errors raised while executing a command.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(String),

    #[error("ERR syntax error")]
    Syntax,

    /// Request argument is not a float
    #[error("ERR value is not a valid float")]
    InvalidFloat,

    /// Request argument is not an integer
    #[error("ERR value is not an integer or out of range")]
    InvalidInteger,

    #[error("ERR invalid expire time in '{0}' command")]
    InvalidExpireTime(String),

    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    /// Stored hash field is neither an integer nor a float
    #[error("ERR value is not an integer or a float")]
    NotANumber,

    /// Stored string is not an integer
    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,

    /// Stored string is not a float
    #[error("ERR value is not a valid float")]
    NotAFloat,

    /// Stored hash field is not an integer
    #[error("ERR hash value is not an integer")]
    HashNotAnInteger,

    #[error("ERR increment would produce NaN or Infinity")]
    NanOrInfinity,

    #[error("ERR increment or decrement would overflow")]
    Overflow,

    #[error("ERR value is out of range, must be positive")]
    NotPositive,

    #[error("ERR index out of range")]
    IndexOutOfRange,

    #[error("ERR no such key")]
    NoSuchKey,

    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),
}

impl CommandError {
    /// The leading tag of the rendered error.
    pub fn tag(&self) -> &'static str {
        match self {
            CommandError::WrongType => "WRONGTYPE",
            _ => "ERR",
        }
    }

    /// Maps the error onto the coarse taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommandError::WrongArity(_)
            | CommandError::Syntax
            | CommandError::InvalidFloat
            | CommandError::InvalidInteger
            | CommandError::InvalidExpireTime(_) => ErrorKind::Syntax,
            CommandError::WrongType => ErrorKind::WrongType,
            CommandError::NotANumber
            | CommandError::NotAnInteger
            | CommandError::NotAFloat
            | CommandError::HashNotAnInteger => ErrorKind::NotANumber,
            CommandError::NanOrInfinity
            | CommandError::Overflow
            | CommandError::NotPositive
            | CommandError::IndexOutOfRange => ErrorKind::Range,
            CommandError::NoSuchKey => ErrorKind::NoSuchKey,
            CommandError::UnknownCommand(_) => ErrorKind::UnknownCommand,
        }
    }

    /// Shorthand for the arity error of `command`.
    pub fn arity(command: &str) -> Self {
        CommandError::WrongArity(command.to_ascii_lowercase())
    }
}
