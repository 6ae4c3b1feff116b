// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The completion sum type (SPEC_FULL.md §3, §9): a decoded response body
//! plus a `Waiter` describing how it reaches its caller, fired exactly
//! once by the router.

use bytes::Bytes;
use tokio::sync::oneshot;

use crate::{acl::Acl, error::Result, types::Stat};

/// A decoded, typed response body, one variant per completion kind named in
/// SPEC_FULL.md §3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionResult {
    Void,
    Stat(Stat),
    Data { data: Bytes, stat: Stat },
    StringList(Vec<String>),
    AclList { acl: Vec<Acl>, stat: Stat },
    String(String),
}

/// Discriminates which decode path a pending completion expects, decided at
/// enqueue time from the operation being issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    Void,
    Stat,
    Data,
    StringList,
    AclList,
    String,
}

/// How a fired completion reaches its caller. The asynchronous form
/// (`Callback`) is primary per SPEC_FULL.md §6; `Sync` exists because the
/// router itself needs a uniform way to park a caller who is `.await`-ing a
/// single in-flight call. Both are driven by the router firing exactly
/// once (P1).
pub enum Waiter {
    Sync(oneshot::Sender<Result<CompletionResult>>),
    Callback(Box<dyn FnOnce(Result<CompletionResult>) + Send + 'static>),
}

impl std::fmt::Debug for Waiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Waiter::Sync(_) => f.write_str("Waiter::Sync(..)"),
            Waiter::Callback(_) => f.write_str("Waiter::Callback(..)"),
        }
    }
}

/// An outstanding request awaiting its reply, held on the pending-completion
/// FIFO between being sent and its response (or a connection-loss drain)
/// arriving.
#[derive(Debug)]
pub struct PendingCompletion {
    pub xid: i32,
    pub kind: CompletionKind,
    pub waiter: Waiter,
}

impl PendingCompletion {
    pub fn new(xid: i32, kind: CompletionKind, waiter: Waiter) -> Self {
        Self { xid, kind, waiter }
    }

    /// Fires the completion exactly once (P1), consuming it. A dropped
    /// `oneshot` receiver (the caller gave up) is not an error here — there
    /// is nobody left to observe it.
    pub fn fire(self, result: Result<CompletionResult>) {
        match self.waiter {
            Waiter::Sync(tx) => {
                let _ = tx.send(result);
            },
            Waiter::Callback(cb) => cb(result),
        }
    }
}
