// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Length-prefixed frame codec: every message on the wire is a 4-byte
//! big-endian length `L` followed by `L` payload bytes (SPEC_FULL.md §4.1).
//!
//! Both directions are modelled as explicit, resumable state machines
//! rather than a bare `{length, buffer, cursor}` record with a raw cursor
//! index, so a short read or write can be resumed without re-deriving
//! where it left off (SPEC_FULL.md §9). Neither machine touches a socket;
//! `client::connection` drives them against a real `AsyncRead`/`AsyncWrite`.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::{Result, ZkError};

pub const HEADER_LEN: usize = 4;

/// The wire format gives no explicit bound on frame length, so this imposes
/// 64 MiB: generous for znode-tree payloads while still rejecting a corrupt
/// or hostile length header outright.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Resumable receive-side state machine.
#[derive(Debug)]
pub enum RecvFrame {
    AwaitingHeader { buf: [u8; HEADER_LEN], filled: usize },
    AwaitingBody { buf: BytesMut, filled: usize },
    Complete(Bytes),
}

impl RecvFrame {
    pub fn new() -> Self {
        RecvFrame::AwaitingHeader { buf: [0u8; HEADER_LEN], filled: 0 }
    }

    /// Feed as many bytes from `chunk` as the current state can consume,
    /// advancing through `AwaitingHeader` -> `AwaitingBody` -> `Complete`.
    /// Returns the number of bytes consumed from `chunk`; callers should
    /// keep calling `feed` with the remainder of `chunk` (or a new chunk)
    /// until `is_complete()` is true.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<usize> {
        let mut consumed = 0;
        loop {
            match self {
                RecvFrame::AwaitingHeader { buf, filled } => {
                    let need = HEADER_LEN - *filled;
                    let take = need.min(chunk.len() - consumed);
                    buf[*filled..*filled + take]
                        .copy_from_slice(&chunk[consumed..consumed + take]);
                    *filled += take;
                    consumed += take;
                    if *filled < HEADER_LEN {
                        return Ok(consumed);
                    }
                    let len = u32::from_be_bytes(*buf) as usize;
                    if len > MAX_FRAME_LEN {
                        return Err(ZkError::MarshallingError(format!(
                            "frame length {len} exceeds MAX_FRAME_LEN \
                             ({MAX_FRAME_LEN})"
                        )));
                    }
                    *self = RecvFrame::AwaitingBody {
                        buf: BytesMut::zeroed(len),
                        filled: 0,
                    };
                },
                RecvFrame::AwaitingBody { buf, filled } => {
                    let need = buf.len() - *filled;
                    let take = need.min(chunk.len() - consumed);
                    buf[*filled..*filled + take]
                        .copy_from_slice(&chunk[consumed..consumed + take]);
                    *filled += take;
                    consumed += take;
                    if *filled < buf.len() {
                        return Ok(consumed);
                    }
                    let body = std::mem::take(buf).freeze();
                    *self = RecvFrame::Complete(body);
                    return Ok(consumed);
                },
                RecvFrame::Complete(_) => return Ok(consumed),
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, RecvFrame::Complete(_))
    }

    /// Consumes the machine, returning the decoded payload. Panics (a
    /// programmer error, not a runtime condition) if called before
    /// completion.
    pub fn into_payload(self) -> Bytes {
        match self {
            RecvFrame::Complete(b) => b,
            _ => panic!("into_payload called before frame was complete"),
        }
    }
}

impl Default for RecvFrame {
    fn default() -> Self {
        Self::new()
    }
}

/// Read exactly one frame from `reader`, resuming the `RecvFrame` state
/// machine across however many underlying reads it takes. A zero-byte read
/// indicates the peer closed the connection and is reported as
/// `ZkError::ConnectionLoss`, per SPEC_FULL.md §4.1.
pub async fn recv_frame<R>(reader: &mut R) -> Result<Bytes>
where R: tokio::io::AsyncRead + Unpin {
    let mut machine = RecvFrame::new();
    let mut scratch = [0u8; 8192];
    loop {
        if machine.is_complete() {
            return Ok(machine.into_payload());
        }
        let n = reader
            .read(&mut scratch)
            .await
            .map_err(|_| ZkError::ConnectionLoss)?;
        if n == 0 {
            return Err(ZkError::ConnectionLoss);
        }
        let mut off = 0;
        while off < n {
            off += machine.feed(&scratch[off..n])?;
        }
    }
}

/// Encode a payload as a length-prefixed frame ready to write whole.
/// Partial-write resumption on the send side is handled by
/// `tokio::io::AsyncWriteExt::write_all`, which already advances past a
/// short write internally; a manual cursor here would just be a slower
/// `write_all`.
pub fn encode_frame(payload: &[u8]) -> Result<Bytes> {
    if payload.len() > MAX_FRAME_LEN {
        return Err(ZkError::MarshallingError(format!(
            "payload length {} exceeds MAX_FRAME_LEN ({MAX_FRAME_LEN})",
            payload.len()
        )));
    }
    let mut out = BytesMut::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    Ok(out.freeze())
}

/// Write one length-prefixed frame to `writer`.
pub async fn send_frame<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where W: tokio::io::AsyncWrite + Unpin {
    let framed = encode_frame(payload)?;
    writer
        .write_all(&framed)
        .await
        .map_err(|_| ZkError::ConnectionLoss)
}
