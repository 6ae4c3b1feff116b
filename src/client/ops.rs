// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Client-facing operations (SPEC_FULL.md §6). Each method builds an
//! opaque request body (the per-op wire layout is this crate's own
//! collaborator, not the out-of-scope "record serialization layer" named
//! in SPEC_FULL.md §1) and drives it through `Session::call`.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    acl::Acl,
    client::{
        completion::CompletionResult,
        session::Session,
        watch::WatchClass,
    },
    error::{Result, ZkError},
    proto::{
        OpCode,
        payload::{encode_acl_list, encode_bytes, encode_string},
    },
    types::{CreateMode, Stat},
};

fn put_watch_flag(body: &mut BytesMut, watch: bool) {
    body.put_u8(if watch { 1 } else { 0 });
}

impl Session {
    /// `get`: fetches a node's data and `Stat`. Arms a data watch when
    /// `watch` is true.
    pub async fn get(&self, path: &str, watch: bool) -> Result<(Bytes, Stat)> {
        let mut body = BytesMut::new();
        body.extend_from_slice(&encode_string(path));
        put_watch_flag(&mut body, watch);

        let result = self
            .call(OpCode::GetData, body.freeze(), crate::client::completion::CompletionKind::Data)
            .await;

        if watch {
            if let Some(registry) = self.watch_registry() {
                registry.record(path, WatchClass::Data);
            }
        }

        match result? {
            CompletionResult::Data { data, stat } => Ok((data, stat)),
            _ => unreachable_completion_kind(),
        }
    }

    /// `set`: overwrites a node's data, subject to optimistic-concurrency
    /// `version` check.
    pub async fn set(&self, path: &str, data: &[u8], version: i32) -> Result<Stat> {
        let mut body = BytesMut::new();
        body.extend_from_slice(&encode_string(path));
        body.extend_from_slice(&encode_bytes(data));
        body.put_i32(version);

        match self
            .call(OpCode::SetData, body.freeze(), crate::client::completion::CompletionKind::Stat)
            .await?
        {
            CompletionResult::Stat(stat) => Ok(stat),
            _ => unreachable_completion_kind(),
        }
    }

    /// `create`: creates a node, returning the assigned path (differs from
    /// the requested path when `flags` includes `SEQUENCE`).
    pub async fn create(
        &self,
        path: &str,
        data: &[u8],
        acl: &[Acl],
        flags: CreateMode,
    ) -> Result<String> {
        if path.is_empty() || !path.starts_with('/') {
            return Err(ZkError::BadArguments(format!(
                "create path must be absolute: {path}"
            )));
        }
        let mut body = BytesMut::new();
        body.extend_from_slice(&encode_string(path));
        body.extend_from_slice(&encode_bytes(data));
        body.extend_from_slice(&encode_acl_list(acl));
        body.put_i32(flags.bits());

        match self
            .call(OpCode::Create, body.freeze(), crate::client::completion::CompletionKind::String)
            .await?
        {
            CompletionResult::String(assigned_path) => Ok(assigned_path),
            _ => unreachable_completion_kind(),
        }
    }

    /// `delete`: removes a node, subject to the same `version` check as
    /// `set`.
    pub async fn delete(&self, path: &str, version: i32) -> Result<()> {
        let mut body = BytesMut::new();
        body.extend_from_slice(&encode_string(path));
        body.put_i32(version);

        match self
            .call(OpCode::Delete, body.freeze(), crate::client::completion::CompletionKind::Void)
            .await?
        {
            CompletionResult::Void => Ok(()),
            _ => unreachable_completion_kind(),
        }
    }

    /// `exists`: probes whether `path` exists, returning its `Stat` or
    /// `ZkError::NoNode`. Arms an existence watch when `watch` is true —
    /// including when the node does not (yet) exist, matching the
    /// coordination service's own semantics for this op.
    pub async fn exists(&self, path: &str, watch: bool) -> Result<Stat> {
        let mut body = BytesMut::new();
        body.extend_from_slice(&encode_string(path));
        put_watch_flag(&mut body, watch);

        let result = self
            .call(OpCode::Exists, body.freeze(), crate::client::completion::CompletionKind::Stat)
            .await;

        if watch {
            if let Some(registry) = self.watch_registry() {
                registry.record(path, WatchClass::Exists);
            }
        }

        match result? {
            CompletionResult::Stat(stat) => Ok(stat),
            _ => unreachable_completion_kind(),
        }
    }

    /// `get_children`: lists a node's immediate children. Arms a child
    /// watch when `watch` is true.
    pub async fn get_children(&self, path: &str, watch: bool) -> Result<Vec<String>> {
        let mut body = BytesMut::new();
        body.extend_from_slice(&encode_string(path));
        put_watch_flag(&mut body, watch);

        let result = self
            .call(
                OpCode::GetChildren,
                body.freeze(),
                crate::client::completion::CompletionKind::StringList,
            )
            .await;

        if watch {
            if let Some(registry) = self.watch_registry() {
                registry.record(path, WatchClass::Children);
            }
        }

        match result? {
            CompletionResult::StringList(children) => Ok(children),
            _ => unreachable_completion_kind(),
        }
    }

    /// `get_acl`: fetches a node's ACL list and `Stat`.
    pub async fn get_acl(&self, path: &str) -> Result<(Vec<Acl>, Stat)> {
        let body = encode_string(path);
        match self
            .call(OpCode::GetAcl, body, crate::client::completion::CompletionKind::AclList)
            .await?
        {
            CompletionResult::AclList { acl, stat } => Ok((acl, stat)),
            _ => unreachable_completion_kind(),
        }
    }

    /// `set_acl`: replaces a node's ACL list, subject to the same
    /// `version` check as `set`/`delete`.
    pub async fn set_acl(&self, path: &str, acl: &[Acl], version: i32) -> Result<()> {
        let mut body = BytesMut::new();
        body.extend_from_slice(&encode_string(path));
        body.extend_from_slice(&encode_acl_list(acl));
        body.put_i32(version);

        match self
            .call(OpCode::SetAcl, body.freeze(), crate::client::completion::CompletionKind::Void)
            .await?
        {
            CompletionResult::Void => Ok(()),
            _ => unreachable_completion_kind(),
        }
    }

    /// `sync`: flushes any pending writes on `path` through to this
    /// client's view before a subsequent read, returning the path echoed
    /// back by the server.
    pub async fn sync(&self, path: &str) -> Result<String> {
        let body = encode_string(path);
        match self
            .call(OpCode::Sync, body, crate::client::completion::CompletionKind::String)
            .await?
        {
            CompletionResult::String(echoed_path) => Ok(echoed_path),
            _ => unreachable_completion_kind(),
        }
    }
}

/// The router decodes a reply body using the `CompletionKind` the call
/// itself registered, so a mismatch here would mean the router and the op
/// that registered the completion disagree about which op this xid
/// belongs to — a programmer error in this crate, not a runtime condition.
fn unreachable_completion_kind<T>() -> Result<T> {
    Err(ZkError::MarshallingError(
        "completion result kind did not match the operation that registered it".into(),
    ))
}

