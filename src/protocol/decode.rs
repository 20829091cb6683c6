//! Zero-Copy RESP Request Decoder
//!
//! Turns bytes read from a socket into request frames: the command name
//! followed by its arguments, each a [`Bytes`] slice of the original buffer.
//!
//! ## How the Decoder Works
//!
//! [`decode`] looks at the front of the read buffer and returns either:
//! - `Ok(Some(frame))` - a complete request was removed from the buffer
//! - `Ok(None)` - the request is incomplete, read more and call again
//! - `Err(ProtocolError)` - the client violated the protocol
//!
//! Decoding happens in two passes. The first pass only scans offsets, so an
//! incomplete request costs nothing and leaves the buffer untouched. Once the
//! whole request is known to be present, it is split off the buffer with
//! `split_to(..).freeze()` and each argument becomes a `slice` of that frozen
//! block: no argument bytes are ever copied.
//!
//! Two request forms are accepted:
//!
//! ```text
//! Multibulk:  *3\r\n$4\r\nHGET\r\n$1\r\nk\r\n$1\r\nf\r\n
//! Inline:     HGET k f\r\n
//! ```

use bytes::{Buf, Bytes, BytesMut};
use std::ops::Range;
use thiserror::Error;

/// Maximum size of one bulk argument (512 MB)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum number of arguments in one multibulk request
pub const MAX_ARGS: usize = 1024 * 1024;

/// Maximum length of an inline request line
pub const MAX_INLINE_SIZE: usize = 64 * 1024;

/// Maximum digits in a `*` or `$` length line
const MAX_LENGTH_LINE: usize = 32;

/// Errors that end a connection because the byte stream can't be resynchronized.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("invalid multibulk length")]
    InvalidMultibulkLength,

    #[error("invalid bulk length")]
    InvalidBulkLength,

    #[error("expected '$', got '{0}'")]
    ExpectedBulk(char),

    #[error("bulk argument not terminated by CRLF")]
    MissingCrlf,

    #[error("too big inline request")]
    InlineTooLarge,
}

/// Result type for decoding operations.
pub type DecodeResult<T> = Result<T, ProtocolError>;

/// Removes one complete request frame from the front of `buf`.
///
/// Empty requests (a blank inline line, `*0`) are consumed and skipped.
///
/// # Example
///
/// ```
/// use tallykv::protocol::decode;
/// use bytes::BytesMut;
///
/// let mut buf = BytesMut::from(&b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\nPING"[..]);
///
/// let frame = decode(&mut buf).unwrap().unwrap();
/// assert_eq!(frame, vec!["GET", "name"]);
///
/// // The trailing inline command has no newline yet
/// assert!(decode(&mut buf).unwrap().is_none());
/// assert_eq!(&buf[..], b"PING");
/// ```
pub fn decode(buf: &mut BytesMut) -> DecodeResult<Option<Vec<Bytes>>> {
    loop {
        if buf.is_empty() {
            return Ok(None);
        }

        let frame = if buf[0] == b'*' {
            decode_multibulk(buf)?
        } else {
            decode_inline(buf)?
        };

        match frame {
            Some(frame) if frame.is_empty() => continue,
            other => return Ok(other),
        }
    }
}

/// Finds the next `\r\n` at or after `from`, returning the index of `\r`.
#[inline]
fn find_crlf(buf: &[u8], from: usize) -> Option<usize> {
    buf.get(from..)?
        .windows(2)
        .position(|w| w == b"\r\n")
        .map(|pos| from + pos)
}

/// Reads a decimal length line starting at `from`.
///
/// Returns the value and the index just past its CRLF, `Ok(None)` if the line
/// is not complete yet.
fn read_length(buf: &[u8], from: usize, err: ProtocolError) -> DecodeResult<Option<(i64, usize)>> {
    let Some(end) = find_crlf(buf, from) else {
        if buf.len().saturating_sub(from) > MAX_LENGTH_LINE {
            return Err(err);
        }
        return Ok(None);
    };

    let value = std::str::from_utf8(&buf[from..end])
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(err)?;

    Ok(Some((value, end + 2)))
}

fn decode_multibulk(buf: &mut BytesMut) -> DecodeResult<Option<Vec<Bytes>>> {
    let Some((count, mut pos)) = read_length(buf, 1, ProtocolError::InvalidMultibulkLength)? else {
        return Ok(None);
    };

    if count > MAX_ARGS as i64 {
        return Err(ProtocolError::InvalidMultibulkLength);
    }
    if count <= 0 {
        buf.advance(pos);
        return Ok(Some(Vec::new()));
    }

    // First pass: locate every argument without consuming anything
    let count = count as usize;
    let mut ranges: Vec<Range<usize>> = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let Some(&marker) = buf.get(pos) else {
            return Ok(None);
        };
        if marker != b'$' {
            return Err(ProtocolError::ExpectedBulk(marker as char));
        }

        let Some((len, start)) = read_length(buf, pos + 1, ProtocolError::InvalidBulkLength)? else {
            return Ok(None);
        };
        if len < 0 || len as u64 > MAX_BULK_SIZE as u64 {
            return Err(ProtocolError::InvalidBulkLength);
        }

        let end = start + len as usize;
        if buf.len() < end + 2 {
            return Ok(None);
        }
        if &buf[end..end + 2] != b"\r\n" {
            return Err(ProtocolError::MissingCrlf);
        }

        ranges.push(start..end);
        pos = end + 2;
    }

    // Second pass: split the request off and slice it up
    let block = buf.split_to(pos).freeze();
    Ok(Some(ranges.into_iter().map(|r| block.slice(r)).collect()))
}

fn decode_inline(buf: &mut BytesMut) -> DecodeResult<Option<Vec<Bytes>>> {
    let Some(newline) = buf.iter().position(|&b| b == b'\n') else {
        if buf.len() > MAX_INLINE_SIZE {
            return Err(ProtocolError::InlineTooLarge);
        }
        return Ok(None);
    };
    if newline > MAX_INLINE_SIZE {
        return Err(ProtocolError::InlineTooLarge);
    }

    let line = buf.split_to(newline + 1).freeze();
    let content = line.len() - 1 - usize::from(line.ends_with(b"\r\n"));

    let mut frame = Vec::new();
    let mut start = None;
    for (i, &b) in line[..content].iter().enumerate() {
        match (b.is_ascii_whitespace(), start) {
            (false, None) => start = Some(i),
            (true, Some(s)) => {
                frame.push(line.slice(s..i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        frame.push(line.slice(s..content));
    }

    Ok(Some(frame))
}
