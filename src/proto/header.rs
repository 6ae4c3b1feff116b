// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! `RequestHeader` / `ReplyHeader` envelopes (SPEC_FULL.md §6).
//!
//! Request and response *bodies* are treated as opaque `Bytes` per the
//! crate's out-of-scope declaration (SPEC_FULL.md §1); only the fixed
//! envelope in front of them is this crate's concern.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, ZkError};

/// `{ xid: i32, type: i32 }`, prepended to every outbound request frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    pub xid: i32,
    pub op_code: i32,
}

impl RequestHeader {
    pub const WIRE_LEN: usize = 8;

    pub fn encode(&self, body: &[u8]) -> Bytes {
        let mut out = BytesMut::with_capacity(Self::WIRE_LEN + body.len());
        out.put_i32(self.xid);
        out.put_i32(self.op_code);
        out.extend_from_slice(body);
        out.freeze()
    }
}

/// `{ xid: i32, zxid: i64, err: i32 }`, prefixed to every inbound reply
/// frame (SPEC_FULL.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyHeader {
    pub xid: i32,
    pub zxid: i64,
    pub err: i32,
}

impl ReplyHeader {
    pub const WIRE_LEN: usize = 16;

    /// Decodes the header and returns it along with the remaining body
    /// bytes (empty when `err != 0`, per SPEC_FULL.md §6).
    pub fn decode(frame: &Bytes) -> Result<(Self, Bytes)> {
        if frame.len() < Self::WIRE_LEN {
            return Err(ZkError::MarshallingError(format!(
                "reply frame too short: {} < {}",
                frame.len(),
                Self::WIRE_LEN
            )));
        }
        let xid = i32::from_be_bytes(frame[0..4].try_into().expect("4 bytes"));
        let zxid =
            i64::from_be_bytes(frame[4..12].try_into().expect("8 bytes"));
        let err = i32::from_be_bytes(frame[12..16].try_into().expect("4 bytes"));
        let body = frame.slice(Self::WIRE_LEN..);
        Ok((Self { xid, zxid, err }, body))
    }
}
