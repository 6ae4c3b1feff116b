// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Generic envelope shapes named directly in the data model
//! (SPEC_FULL.md §3/§6: `Stat`, string lists, ACL lists, bare strings, and
//! data-plus-stat). These are the fixed record shapes the core itself must
//! be able to build and tear down in order to produce a typed completion
//! result; they are distinct from the *per-operation* request encoding
//! (e.g. exactly which fields a `create` request carries), which remains
//! the opaque, out-of-scope collaborator named in SPEC_FULL.md §1.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{
    acl::{Acl, Permission},
    error::{Result, ZkError},
    types::Stat,
};

pub fn encode_string(s: &str) -> Bytes {
    let bytes = s.as_bytes();
    let mut out = BytesMut::with_capacity(4 + bytes.len());
    out.put_i32(bytes.len() as i32);
    out.extend_from_slice(bytes);
    out.freeze()
}

pub fn decode_string(buf: &mut Bytes) -> Result<String> {
    if buf.len() < 4 {
        return Err(ZkError::MarshallingError("string length truncated".into()));
    }
    let len = buf.get_i32();
    if len < 0 || buf.len() < len as usize {
        return Err(ZkError::MarshallingError("string body truncated".into()));
    }
    let raw = buf.split_to(len as usize);
    String::from_utf8(raw.to_vec()).map_err(|e| ZkError::MarshallingError(e.to_string()))
}

pub fn encode_bytes(data: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(4 + data.len());
    out.put_i32(data.len() as i32);
    out.extend_from_slice(data);
    out.freeze()
}

pub fn decode_bytes(buf: &mut Bytes) -> Result<Bytes> {
    if buf.len() < 4 {
        return Err(ZkError::MarshallingError("byte buffer length truncated".into()));
    }
    let len = buf.get_i32();
    if len < 0 || buf.len() < len as usize {
        return Err(ZkError::MarshallingError("byte buffer body truncated".into()));
    }
    Ok(buf.split_to(len as usize))
}

impl Stat {
    pub const WIRE_LEN: usize = 24;

    pub fn encode(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(Self::WIRE_LEN);
        out.put_i64(self.czxid);
        out.put_i64(self.mzxid);
        out.put_i32(self.version);
        out.put_i32(self.num_children);
        out.freeze()
    }

    pub fn decode(buf: &mut Bytes) -> Result<Self> {
        if buf.len() < Self::WIRE_LEN {
            return Err(ZkError::MarshallingError("stat body truncated".into()));
        }
        Ok(Self {
            czxid: buf.get_i64(),
            mzxid: buf.get_i64(),
            version: buf.get_i32(),
            num_children: buf.get_i32(),
        })
    }
}

pub fn encode_string_list(items: &[String]) -> Bytes {
    let mut out = BytesMut::new();
    out.put_i32(items.len() as i32);
    for item in items {
        out.extend_from_slice(&encode_string(item));
    }
    out.freeze()
}

pub fn decode_string_list(buf: &mut Bytes) -> Result<Vec<String>> {
    if buf.len() < 4 {
        return Err(ZkError::MarshallingError("string list count truncated".into()));
    }
    let count = buf.get_i32();
    if count < 0 {
        return Err(ZkError::MarshallingError("negative string list count".into()));
    }
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        out.push(decode_string(buf)?);
    }
    Ok(out)
}

pub fn encode_acl_list(acls: &[Acl]) -> Bytes {
    let mut out = BytesMut::new();
    out.put_i32(acls.len() as i32);
    for acl in acls {
        out.put_i32(acl.perms.bits());
        out.extend_from_slice(&encode_string(&acl.scheme));
        out.extend_from_slice(&encode_string(&acl.id));
    }
    out.freeze()
}

pub fn decode_acl_list(buf: &mut Bytes) -> Result<Vec<Acl>> {
    if buf.len() < 4 {
        return Err(ZkError::MarshallingError("acl list count truncated".into()));
    }
    let count = buf.get_i32();
    if count < 0 {
        return Err(ZkError::MarshallingError("negative acl list count".into()));
    }
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        if buf.len() < 4 {
            return Err(ZkError::MarshallingError("acl perms truncated".into()));
        }
        let perms = Permission::from_bits_truncate(buf.get_i32());
        let scheme = decode_string(buf)?;
        let id = decode_string(buf)?;
        out.push(Acl { perms, scheme, id });
    }
    Ok(out)
}

/// `{ data: bytes, stat: Stat }` — the shape of a `get` response.
pub fn encode_data_and_stat(data: &[u8], stat: &Stat) -> Bytes {
    let mut out = BytesMut::new();
    out.extend_from_slice(&encode_bytes(data));
    out.extend_from_slice(&stat.encode());
    out.freeze()
}

pub fn decode_data_and_stat(buf: &mut Bytes) -> Result<(Bytes, Stat)> {
    let data = decode_bytes(buf)?;
    let stat = Stat::decode(buf)?;
    Ok((data, stat))
}

/// `{ acl: AclList, stat: Stat }` — the shape of a `get_acl` response.
pub fn encode_acl_and_stat(acls: &[Acl], stat: &Stat) -> Bytes {
    let mut out = BytesMut::new();
    out.extend_from_slice(&encode_acl_list(acls));
    out.extend_from_slice(&stat.encode());
    out.freeze()
}

pub fn decode_acl_and_stat(buf: &mut Bytes) -> Result<(Vec<Acl>, Stat)> {
    let acls = decode_acl_list(buf)?;
    let stat = Stat::decode(buf)?;
    Ok((acls, stat))
}
