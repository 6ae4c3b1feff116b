// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Request/response multiplexer (SPEC_FULL.md §2, §4.5): xid allocation,
//! the pending-completion FIFO, and the head-pop-and-assert-equality
//! correlation rule (I2). Deliberately NOT a `DashMap<xid, _>` lookup:
//! this protocol's ordering guarantee means replies always arrive in the
//! same order requests were sent, so a FIFO with an assertion on dequeue
//! is both simpler and a stronger correctness check than a keyed map.

use std::sync::atomic::{AtomicI32, Ordering};

use bytes::Bytes;
use tracing::error;

use crate::{
    client::completion::{CompletionKind, CompletionResult, PendingCompletion, Waiter},
    error::{Result, ZkError},
    proto::{
        XID_AUTH, XID_PING, XID_WATCH,
        header::ReplyHeader,
        payload::{
            decode_acl_and_stat, decode_bytes, decode_data_and_stat, decode_string,
            decode_string_list,
        },
        watcher_event::WatcherEvent,
    },
    queue::Fifo,
    types::Stat,
};

/// Monotonic, process-wide xid counter. Special negative values are
/// reserved and never produced here (SPEC_FULL.md §6).
#[derive(Debug)]
pub struct XidGenerator {
    next: AtomicI32,
}

impl XidGenerator {
    pub fn new() -> Self {
        Self { next: AtomicI32::new(1) }
    }

    /// Allocates the next xid, skipping 0 and any reserved negative value
    /// (wrap-around after `i32::MAX` is treated as returning to 1, since a
    /// session with `i32::MAX` in-flight xids has bigger problems).
    pub fn next(&self) -> i32 {
        loop {
            let candidate = self.next.fetch_add(1, Ordering::Relaxed);
            if candidate > 0 {
                return candidate;
            }
            self.next.store(1, Ordering::Relaxed);
        }
    }
}

impl Default for XidGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of draining one inbound frame through the router.
pub enum Dispatch {
    /// A watch notification; already handled (NotifyWatch carries the
    /// decoded event so the caller can forward it to the watcher).
    Watch(WatcherEvent),
    /// An auth-subprotocol reply; `err` is the server's raw result code.
    Auth { err: i32 },
    /// A normal request/response pair was correlated and fired.
    Completed,
}

/// The pending-completion FIFO plus the correlation logic that pops its
/// head (I2).
#[derive(Debug, Default)]
pub struct Router {
    pending: Fifo<PendingCompletion>,
}

impl Router {
    pub fn new() -> Self {
        Self { pending: Fifo::new() }
    }

    /// Registers a completion for a just-enqueued request (I1 requires this
    /// to happen before or atomically with the frame hitting the send
    /// queue; callers must hold the same lock across both).
    pub fn register(&mut self, pending: PendingCompletion) {
        self.pending.enqueue(pending);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drains every pending completion with `result`, in FIFO order, after
    /// a connection loss or session-terminal transition (§4.5
    /// `cleanup_bufs`). Ping completions are registered in this same queue
    /// (`SessionCore::send_ping`) and drain like any other entry; their
    /// waiter is a no-op callback, so there is nothing special to do with
    /// them here.
    pub fn drain_with_error(&mut self, err: ZkError) {
        for pending in self.pending.drain() {
            pending.fire(Err(err.clone()));
        }
    }

    /// Routes one decoded, still-enveloped reply frame. Performs the I2
    /// FIFO correlation for ordinary replies, and special-cases watch
    /// (xid=-1) and auth (xid=-4) frames without touching the pending
    /// queue (I3, I4). Returns the reply's `zxid` alongside the dispatch
    /// outcome; every reply header carries one, and I5 requires the caller
    /// to fold it into the session's last-seen zxid regardless of which
    /// kind of reply this was.
    pub fn route(&mut self, frame: Bytes) -> Result<(i64, Dispatch)> {
        let (hdr, body) = ReplyHeader::decode(&frame)?;

        if hdr.xid == XID_WATCH {
            let event = WatcherEvent::decode(body)?;
            return Ok((hdr.zxid, Dispatch::Watch(event)));
        }

        if hdr.xid == XID_AUTH {
            return Ok((hdr.zxid, Dispatch::Auth { err: hdr.err }));
        }

        let head = self.pending.dequeue().ok_or_else(|| {
            ZkError::RuntimeInconsistency(format!(
                "reply xid={} arrived with no pending request",
                hdr.xid
            ))
        })?;

        if head.xid != hdr.xid {
            let mismatch = ZkError::RuntimeInconsistency(format!(
                "expected reply xid={}, server sent xid={}",
                head.xid, hdr.xid
            ));
            error!("{mismatch}");
            // Push the mismatched entry back so the subsequent
            // connection-loss drain still observes a failure for it,
            // per SPEC_FULL.md §7.
            self.pending.enqueue_front(head);
            return Err(mismatch);
        }

        if hdr.xid == XID_PING {
            // Ping completions are Void and silently discarded; fire with
            // success so a `Waiter::Sync` ping-waiter (if any) unblocks.
            head.fire(Ok(CompletionResult::Void));
            return Ok((hdr.zxid, Dispatch::Completed));
        }

        let result = if hdr.err != 0 {
            Err(ZkError::from_server_code(hdr.err))
        } else {
            decode_body(head.kind, body)
        };
        head.fire(result);
        Ok((hdr.zxid, Dispatch::Completed))
    }
}

fn decode_body(kind: CompletionKind, mut body: Bytes) -> Result<CompletionResult> {
    Ok(match kind {
        CompletionKind::Void => CompletionResult::Void,
        CompletionKind::Stat => CompletionResult::Stat(Stat::decode(&mut body)?),
        CompletionKind::Data => {
            let (data, stat) = decode_data_and_stat(&mut body)?;
            CompletionResult::Data { data, stat }
        },
        CompletionKind::StringList => {
            CompletionResult::StringList(decode_string_list(&mut body)?)
        },
        CompletionKind::AclList => {
            let (acl, stat) = decode_acl_and_stat(&mut body)?;
            CompletionResult::AclList { acl, stat }
        },
        CompletionKind::String => {
            CompletionResult::String(decode_string(&mut body)?)
        },
    })
}

#[cfg(test)]
mod tests {
    use bytes::BufMut;

    use super::*;
    use crate::proto::header::RequestHeader;

    fn reply_frame(xid: i32, err: i32, body: &[u8]) -> Bytes {
        let mut out = bytes::BytesMut::new();
        out.put_i32(xid);
        out.put_i64(42);
        out.put_i32(err);
        out.extend_from_slice(body);
        out.freeze()
    }

    #[test]
    fn xid_generator_never_yields_reserved_values() {
        let gen = XidGenerator::new();
        for _ in 0..10 {
            let xid = gen.next();
            assert!(xid > 0);
        }
    }

    #[tokio::test]
    async fn fifo_correlation_matches_head_in_order() {
        let mut router = Router::new();
        let (tx1, rx1) = tokio::sync::oneshot::channel();
        let (tx2, rx2) = tokio::sync::oneshot::channel();
        router.register(PendingCompletion::new(
            1,
            CompletionKind::Void,
            Waiter::Sync(tx1),
        ));
        router.register(PendingCompletion::new(
            2,
            CompletionKind::Void,
            Waiter::Sync(tx2),
        ));

        let _ = RequestHeader { xid: 1, op_code: 1 };
        let (zxid1, dispatch1) = router.route(reply_frame(1, 0, &[])).expect("route");
        assert_eq!(zxid1, 42);
        assert!(matches!(dispatch1, Dispatch::Completed));
        let (zxid2, dispatch2) = router.route(reply_frame(2, 0, &[])).expect("route");
        assert_eq!(zxid2, 42);
        assert!(matches!(dispatch2, Dispatch::Completed));
        assert_eq!(rx1.await.expect("fired"), Ok(CompletionResult::Void));
        assert_eq!(rx2.await.expect("fired"), Ok(CompletionResult::Void));
    }

    #[test]
    fn xid_mismatch_is_fatal_and_preserves_entry_for_drain() {
        let mut router = Router::new();
        let (tx, _rx) = tokio::sync::oneshot::channel();
        router.register(PendingCompletion::new(
            5,
            CompletionKind::Void,
            Waiter::Sync(tx),
        ));
        let err = router.route(reply_frame(6, 0, &[])).unwrap_err();
        assert!(matches!(err, ZkError::RuntimeInconsistency(_)));
        assert_eq!(router.pending_len(), 1, "mismatched entry pushed back for drain");
    }

    #[test]
    fn watch_frame_does_not_touch_pending_queue() {
        let mut router = Router::new();
        let (tx, _rx) = tokio::sync::oneshot::channel();
        router.register(PendingCompletion::new(
            1,
            CompletionKind::Void,
            Waiter::Sync(tx),
        ));
        let event = WatcherEvent::session_event(
            crate::proto::watcher_event::KeeperState::Connected,
        );
        let frame = reply_frame(XID_WATCH, 0, &event.encode());
        let (zxid, dispatch) = router.route(frame).expect("route");
        assert_eq!(zxid, 42);
        match dispatch {
            Dispatch::Watch(decoded) => assert_eq!(decoded, event),
            _ => panic!("expected watch dispatch"),
        }
        assert_eq!(router.pending_len(), 1);
    }

    #[test]
    fn auth_frame_does_not_touch_pending_queue() {
        let mut router = Router::new();
        let (zxid, dispatch) = router.route(reply_frame(XID_AUTH, 0, &[])).expect("route");
        assert_eq!(zxid, 42);
        match dispatch {
            Dispatch::Auth { err } => assert_eq!(err, 0),
            _ => panic!("expected auth dispatch"),
        }
        assert_eq!(router.pending_len(), 0);
    }

    #[tokio::test]
    async fn drain_with_error_fires_every_pending_completion_once() {
        let mut router = Router::new();
        let (tx1, rx1) = tokio::sync::oneshot::channel();
        let (tx2, rx2) = tokio::sync::oneshot::channel();
        router.register(PendingCompletion::new(
            1,
            CompletionKind::Void,
            Waiter::Sync(tx1),
        ));
        router.register(PendingCompletion::new(
            2,
            CompletionKind::Void,
            Waiter::Sync(tx2),
        ));
        router.drain_with_error(ZkError::ConnectionLoss);
        assert_eq!(rx1.await.expect("fired"), Err(ZkError::ConnectionLoss));
        assert_eq!(rx2.await.expect("fired"), Err(ZkError::ConnectionLoss));
        assert_eq!(router.pending_len(), 0);
    }
}
