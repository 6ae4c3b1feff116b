// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Fixed-layout connect request and prime response (SPEC_FULL.md §4.3).

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, ZkError};

pub const PASSWORD_LEN: usize = 16;
pub const PROTOCOL_VERSION: i32 = 0;

/// `protocolVersion:i32 | lastZxidSeen:i64 | timeOut:i32 | sessionId:i64 |
/// passwd_len:i32 | passwd:16B`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectRequest {
    pub last_zxid_seen: i64,
    pub timeout_ms: i32,
    pub session_id: i64,
    pub password: [u8; PASSWORD_LEN],
}

impl ConnectRequest {
    pub fn encode(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(4 + 8 + 4 + 8 + 4 + PASSWORD_LEN);
        out.put_i32(PROTOCOL_VERSION);
        out.put_i64(self.last_zxid_seen);
        out.put_i32(self.timeout_ms);
        out.put_i64(self.session_id);
        out.put_i32(PASSWORD_LEN as i32);
        out.extend_from_slice(&self.password);
        out.freeze()
    }
}

/// `len:i32 | protocolVersion:i32 | timeOut:i32 | sessionId:i64 |
/// passwd_len:i32 | passwd:16B`
///
/// The leading `len` is the outer frame length prefix handled by
/// `proto::frame`; by the time this type decodes, the frame has already
/// been stripped of it, so only the fields after `len` are parsed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectResponse {
    pub protocol_version: i32,
    pub timeout_ms: i32,
    pub session_id: i64,
    pub password: [u8; PASSWORD_LEN],
}

impl ConnectResponse {
    pub const WIRE_LEN: usize = 4 + 4 + 8 + 4 + PASSWORD_LEN;

    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::WIRE_LEN {
            return Err(ZkError::MarshallingError(format!(
                "connect response too short: {} < {}",
                buf.len(),
                Self::WIRE_LEN
            )));
        }
        let protocol_version =
            i32::from_be_bytes(buf[0..4].try_into().expect("4 bytes"));
        let timeout_ms =
            i32::from_be_bytes(buf[4..8].try_into().expect("4 bytes"));
        let session_id =
            i64::from_be_bytes(buf[8..16].try_into().expect("8 bytes"));
        let passwd_len =
            i32::from_be_bytes(buf[16..20].try_into().expect("4 bytes"));
        if passwd_len as usize != PASSWORD_LEN {
            return Err(ZkError::MarshallingError(format!(
                "unexpected password length {passwd_len}"
            )));
        }
        let mut password = [0u8; PASSWORD_LEN];
        password.copy_from_slice(&buf[20..20 + PASSWORD_LEN]);
        Ok(Self { protocol_version, timeout_ms, session_id, password })
    }

    pub fn encode(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(Self::WIRE_LEN);
        out.put_i32(self.protocol_version);
        out.put_i32(self.timeout_ms);
        out.put_i64(self.session_id);
        out.put_i32(PASSWORD_LEN as i32);
        out.extend_from_slice(&self.password);
        out.freeze()
    }
}
