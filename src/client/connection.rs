// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The I/O reactor's socket half (SPEC_FULL.md §2, §4.5): a single TCP
//! connection split into an owned reader task and an owned writer task
//! (`into_split`, a background read loop spawned from `connect`, and a
//! `CancellationToken` for shutdown). The send side is realized as an
//! explicit `Fifo<Bytes>` rather than a per-request `write_all` under a
//! plain mutex, because the auth sub-protocol (§4.7) needs to jump an
//! already-queued application frame, which a bare mutex-serialized write
//! path cannot express.

use std::{
    sync::{Arc, Mutex as StdMutex},
    time::Duration,
};

use bytes::Bytes;
use tokio::{
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::{Mutex, Notify, mpsc},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    client::common::io_with_timeout,
    error::{Result, ZkError},
    proto::frame::{recv_frame, send_frame},
    queue::Fifo,
};

/// Owns the TCP socket halves and the outbound frame queue. Decoded inbound
/// frames are forwarded to the channel returned by `spawn`; the receiver
/// closing (both `Sender`s dropped) signals connection loss to whoever
/// drives the session.
#[derive(Debug)]
pub struct Connection {
    writer: Mutex<OwnedWriteHalf>,
    to_send: StdMutex<Fifo<Bytes>>,
    notify: Notify,
    cancel: CancellationToken,
    io_timeout: Duration,
}

impl Connection {
    /// Connects to `addr`, splits the stream, and spawns the reader and
    /// writer tasks. Returns the shared handle plus the channel on which
    /// decoded inbound frames arrive.
    pub async fn connect(
        addr: std::net::SocketAddr,
        io_timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<(Arc<Self>, mpsc::Receiver<Bytes>)> {
        let stream =
            TcpStream::connect(addr).await.map_err(|_| ZkError::ConnectionLoss)?;
        stream.set_nodelay(true).map_err(|_| ZkError::ConnectionLoss)?;
        let (r, w) = stream.into_split();
        Ok(Self::from_split(r, w, io_timeout, cancel))
    }

    /// Builds a `Connection` from already-split halves (used by tests
    /// against an in-process loopback pair).
    pub fn from_split(
        r: OwnedReadHalf,
        w: OwnedWriteHalf,
        io_timeout: Duration,
        cancel: CancellationToken,
    ) -> (Arc<Self>, mpsc::Receiver<Bytes>) {
        let conn = Arc::new(Self {
            writer: Mutex::new(w),
            to_send: StdMutex::new(Fifo::new()),
            notify: Notify::new(),
            cancel,
            io_timeout,
        });

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(Arc::clone(&conn).reader_loop(r, tx));
        tokio::spawn(Arc::clone(&conn).writer_loop());

        (conn, rx)
    }

    /// Enqueues a frame at the tail of the send queue (ordinary application
    /// requests).
    pub fn enqueue(&self, frame: Bytes) {
        self.to_send.lock().expect("to_send mutex poisoned").enqueue(frame);
        self.notify.notify_one();
    }

    /// Enqueues a frame at the head of the send queue, jumping ahead of
    /// anything already queued — used only by the auth sub-protocol
    /// (SPEC_FULL.md §4.7).
    pub fn enqueue_front(&self, frame: Bytes) {
        self.to_send
            .lock()
            .expect("to_send mutex poisoned")
            .enqueue_front(frame);
        self.notify.notify_one();
    }

    pub fn cancel_now(&self) {
        self.cancel.cancel();
    }

    async fn writer_loop(self: Arc<Self>) {
        loop {
            if self.cancel.is_cancelled() {
                return;
            }
            let frame =
                self.to_send.lock().expect("to_send mutex poisoned").dequeue();
            let Some(frame) = frame else {
                tokio::select! {
                    _ = self.cancel.cancelled() => return,
                    _ = self.notify.notified() => continue,
                };
            };
            let mut w = self.writer.lock().await;
            let sent = io_with_timeout(
                "send frame",
                send_frame(&mut *w, &frame),
                self.io_timeout,
                &self.cancel,
            )
            .await;
            drop(w);
            if let Err(e) = sent {
                warn!("writer loop exiting: {e}");
                self.cancel.cancel();
                return;
            }
        }
    }

    async fn reader_loop(self: Arc<Self>, mut r: OwnedReadHalf, tx: mpsc::Sender<Bytes>) {
        loop {
            if self.cancel.is_cancelled() {
                return;
            }
            let received = io_with_timeout(
                "recv frame",
                recv_frame(&mut r),
                self.io_timeout,
                &self.cancel,
            )
            .await;
            match received {
                Ok(frame) => {
                    if tx.send(frame).await.is_err() {
                        debug!("reader loop: session dropped, exiting");
                        return;
                    }
                },
                Err(e) => {
                    debug!("reader loop exiting: {e}");
                    self.cancel.cancel();
                    return;
                },
            }
        }
    }
}
