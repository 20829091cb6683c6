//! RESP Protocol Implementation
//!
//! The wire format spoken by the TCP transport. This layer only frames bytes:
//! requests are decoded into `Vec<Bytes>` frames for the dispatcher, and
//! command results are encoded back into RESP.
//!
//! ## Modules
//!
//! - `decode`: zero-copy, incremental request decoder
//! - `encode`: reply and error encoder
//!
//! ## Example
//!
//! ```
//! use tallykv::commands::Reply;
//! use tallykv::protocol::{decode, encode_reply, encode_request};
//! use bytes::BytesMut;
//!
//! let mut incoming = encode_request(&["GET", "name"]);
//! let frame = decode(&mut incoming).unwrap().unwrap();
//! assert_eq!(frame, vec!["GET", "name"]);
//!
//! let mut out = BytesMut::new();
//! encode_reply(&Reply::bulk("Ada"), &mut out);
//! assert_eq!(&out[..], b"$3\r\nAda\r\n");
//! ```

pub mod decode;
pub mod encode;

pub use decode::{decode, DecodeResult, ProtocolError, MAX_ARGS, MAX_BULK_SIZE, MAX_INLINE_SIZE};
pub use encode::{encode_error, encode_error_text, encode_reply, encode_request, encode_result};
