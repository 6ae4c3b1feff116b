// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Auth sub-protocol (SPEC_FULL.md §4.7): a SETAUTH frame jumps the send
//! queue immediately on reaching CONNECTED, and its reply is identified by
//! `xid = XID_AUTH` without consuming a pending-completion slot.

use bytes::Bytes;

use crate::proto::{
    OpCode, XID_AUTH,
    header::RequestHeader,
    payload::{encode_bytes, encode_string},
};

/// Credentials supplied via `add_auth`, held until the next (re)connect so
/// they can be replayed.
#[derive(Debug, Clone)]
pub struct AuthInfo {
    pub scheme: String,
    pub credential: Bytes,
}

impl AuthInfo {
    pub fn new(scheme: impl Into<String>, credential: impl Into<Bytes>) -> Self {
        Self { scheme: scheme.into(), credential: credential.into() }
    }

    /// Builds the `{RequestHeader{xid=XID_AUTH, SETAUTH}; scheme; cred}`
    /// frame payload (the outer length prefix is added by `proto::frame`).
    pub fn encode_request(&self) -> Bytes {
        let mut body = bytes::BytesMut::new();
        // A reserved "world" slot the wire format always carries ahead of
        // the scheme (mirrors the coordination service's own SETAUTH
        // layout); this client never uses non-zero values for it.
        body.extend_from_slice(&0i32.to_be_bytes());
        body.extend_from_slice(&encode_string(&self.scheme));
        body.extend_from_slice(&encode_bytes(&self.credential));
        let hdr = RequestHeader { xid: XID_AUTH, op_code: OpCode::SetAuth as i32 };
        hdr.encode(&body)
    }
}
