//! RESP Reply Encoder
//!
//! Renders command results onto the wire:
//!
//! | Result              | Wire form                |
//! |---------------------|--------------------------|
//! | `Reply::Status`     | `+OK\r\n`                |
//! | `Reply::Integer`    | `:1\r\n`                 |
//! | `Reply::Bulk`       | `$5\r\nhello\r\n`        |
//! | `Reply::Float`      | `$4\r\n20.6\r\n`         |
//! | `Reply::Nil`        | `$-1\r\n`                |
//! | `Reply::Array`      | `*2\r\n...`              |
//! | `CommandError`      | `-ERR message\r\n`       |

use crate::commands::{CommandError, CommandResult, Reply};
use bytes::{BufMut, BytesMut};

const CRLF: &[u8] = b"\r\n";

fn put_line(out: &mut BytesMut, prefix: u8, body: &[u8]) {
    out.put_u8(prefix);
    out.extend_from_slice(body);
    out.extend_from_slice(CRLF);
}

fn put_bulk(out: &mut BytesMut, data: &[u8]) {
    put_line(out, b'$', data.len().to_string().as_bytes());
    out.extend_from_slice(data);
    out.extend_from_slice(CRLF);
}

/// Appends the RESP encoding of `reply` to `out`.
pub fn encode_reply(reply: &Reply, out: &mut BytesMut) {
    match reply {
        Reply::Status(s) => put_line(out, b'+', s.as_bytes()),
        Reply::Integer(n) => put_line(out, b':', n.to_string().as_bytes()),
        Reply::Bulk(data) => put_bulk(out, data),
        Reply::Float(s) => put_bulk(out, s.as_bytes()),
        Reply::Nil => out.extend_from_slice(b"$-1\r\n"),
        Reply::Array(items) => {
            put_line(out, b'*', items.len().to_string().as_bytes());
            for item in items {
                encode_reply(item, out);
            }
        }
    }
}

/// Appends an error line. Line breaks in the message (for instance from an
/// echoed command name) are replaced so the reply stays a single line.
pub fn encode_error(err: &CommandError, out: &mut BytesMut) {
    encode_error_text(&err.to_string(), out);
}

/// Appends `-<text>\r\n`.
pub fn encode_error_text(text: &str, out: &mut BytesMut) {
    let line: Vec<u8> = text
        .bytes()
        .map(|b| if b == b'\r' || b == b'\n' { b' ' } else { b })
        .collect();
    put_line(out, b'-', &line);
}

/// Appends either the reply or the error.
pub fn encode_result(result: &CommandResult, out: &mut BytesMut) {
    match result {
        Ok(reply) => encode_reply(reply, out),
        Err(err) => encode_error(err, out),
    }
}

/// Encodes a request as a multibulk frame, the way clients send commands.
pub fn encode_request<T: AsRef<[u8]>>(parts: &[T]) -> BytesMut {
    let mut out = BytesMut::new();
    put_line(&mut out, b'*', parts.len().to_string().as_bytes());
    for part in parts {
        put_bulk(&mut out, part.as_ref());
    }
    out
}
