//! Transport-agnostic command results.
//!
//! Handlers return a [`Reply`]; each transport decides how to put it on the
//! wire (see `protocol::encode` for the RESP rendering).

use bytes::Bytes;

/// The tagged result of a successful command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Short status text such as `OK` or `PONG`
    Status(String),

    /// Signed integer
    Integer(i64),

    /// Binary-safe payload
    Bulk(Bytes),

    /// A floating-point result in its canonical decimal form
    Float(String),

    /// Absence of a value
    Nil,

    /// Ordered sequence of results
    Array(Vec<Reply>),
}

impl Reply {
    /// The `OK` status.
    pub fn ok() -> Self {
        Reply::Status("OK".to_string())
    }

    pub fn status(s: impl Into<String>) -> Self {
        Reply::Status(s.into())
    }

    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Reply::Bulk(data.into())
    }

    pub fn integer(n: impl TryInto<i64>) -> Self {
        Reply::Integer(n.try_into().unwrap_or(i64::MAX))
    }

    /// `Bulk` when present, `Nil` otherwise.
    pub fn from_option(data: Option<Bytes>) -> Self {
        data.map_or(Reply::Nil, Reply::Bulk)
    }

    /// An array of bulk strings.
    pub fn bulk_array<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Bytes>,
    {
        Reply::Array(items.into_iter().map(Reply::Bulk).collect())
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Reply::Nil)
    }

    /// Returns the payload of a `Bulk`, `Status` or `Float` reply.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Reply::Bulk(b) => Some(b),
            Reply::Status(s) | Reply::Float(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Reply::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Reply]> {
        match self {
            Reply::Array(items) => Some(items),
            _ => None,
        }
    }
}
