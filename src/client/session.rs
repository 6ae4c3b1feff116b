// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The session state machine and reconnect loop (SPEC_FULL.md §4.4, §4.5,
//! §5A). `SessionCore` holds every piece of mutable session state behind
//! small, narrowly-scoped locks (`Arc` shared ownership, a
//! `CancellationToken` for shutdown) for a single long-lived session and
//! its one active connection.

use std::{
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
    time::Duration,
};

use bytes::Bytes;
use tokio::{
    sync::{Mutex, mpsc, watch},
    time::Instant,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    client::{
        auth::AuthInfo,
        completion::{CompletionKind, PendingCompletion, Waiter},
        connection::Connection,
        router::{Dispatch, Router},
        watch::{WatchClass, WatchRegistry, Watcher, session_event},
    },
    endpoint::{BackOff, EndpointSet},
    error::{Result, ZkError},
    proto::{
        OpCode, XID_PING,
        handshake::{ConnectRequest, ConnectResponse, PASSWORD_LEN},
        header::RequestHeader,
        watcher_event::KeeperState,
    },
};

/// The (session-id, password, negotiated timeout) triple that survives
/// reconnects (SPEC_FULL.md glossary: *session*).
#[derive(Debug, Clone, Copy)]
pub(crate) struct SessionIdentity {
    pub session_id: i64,
    pub password: [u8; PASSWORD_LEN],
    pub timeout_ms: i32,
}

impl SessionIdentity {
    fn fresh(requested_timeout: Duration) -> Self {
        Self {
            session_id: 0,
            password: [0u8; PASSWORD_LEN],
            timeout_ms: requested_timeout.as_millis().min(i32::MAX as u128) as i32,
        }
    }
}

enum ConnectOutcome {
    Ready(Arc<Connection>, mpsc::Receiver<Bytes>),
    Expired,
}

enum DriveOutcome {
    Transient,
    AuthFailed,
    Closing,
}

enum FrameOutcome {
    Continue,
    AuthFailed,
}

/// Every piece of session state, shared between the public `Session`
/// handle and the background reconnect task.
pub(crate) struct SessionCore {
    pub(crate) endpoints: Mutex<EndpointSet>,
    backoff: Mutex<BackOff>,
    state_tx: watch::Sender<KeeperState>,
    pub(crate) identity: Mutex<SessionIdentity>,
    last_zxid: AtomicI64,
    last_recv: Mutex<Instant>,
    pub(crate) router: Mutex<Router>,
    pub(crate) conn: Mutex<Option<Arc<Connection>>>,
    pub(crate) send_lock: Mutex<()>,
    pub(crate) xid_gen: super::router::XidGenerator,
    pub(crate) watcher: Arc<dyn Watcher>,
    pub(crate) watch_registry: Option<Arc<WatchRegistry>>,
    auth: Mutex<Option<AuthInfo>>,
    cancel: CancellationToken,
    io_timeout: Duration,
}

impl SessionCore {
    fn set_state(&self, state: KeeperState) {
        let _ = self.state_tx.send(state);
    }

    async fn connect_and_handshake(self: &Arc<Self>) -> Result<ConnectOutcome> {
        let addr = { self.endpoints.lock().await.current() };
        // A child token: the session cancelling itself must tear this
        // connection down too, but this connection's reader/writer loops
        // cancelling themselves on a transient I/O error (to unwind their
        // own pair) must NOT escalate into cancelling the session — that
        // would turn an ordinary reconnect into a permanent shutdown.
        let (conn, mut rx) = Connection::connect(
            addr,
            self.io_timeout,
            self.cancel.child_token(),
        )
        .await?;

        let identity = *self.identity.lock().await;
        let request = ConnectRequest {
            last_zxid_seen: self.last_zxid.load(Ordering::Relaxed),
            timeout_ms: identity.timeout_ms,
            session_id: identity.session_id,
            password: identity.password,
        };
        conn.enqueue(request.encode());

        let first = rx.recv().await.ok_or(ZkError::ConnectionLoss)?;
        let response = ConnectResponse::decode(&first)?;

        if identity.session_id != 0 && response.session_id != identity.session_id {
            warn!(
                "server assigned session id {:#x}, expected {:#x}: session expired",
                response.session_id, identity.session_id
            );
            return Ok(ConnectOutcome::Expired);
        }

        *self.identity.lock().await = SessionIdentity {
            session_id: response.session_id,
            password: response.password,
            timeout_ms: response.timeout_ms,
        };

        if let Some(auth) = self.auth.lock().await.clone() {
            conn.enqueue_front(auth.encode_request());
        }

        Ok(ConnectOutcome::Ready(conn, rx))
    }

    async fn advance_and_backoff(self: &Arc<Self>) {
        let wrapped = self.endpoints.lock().await.advance();
        if wrapped {
            let delay = self.backoff.lock().await.next_delay();
            tokio::select! {
                _ = self.cancel.cancelled() => {},
                _ = tokio::time::sleep(delay) => {},
            }
        }
    }

    async fn send_ping(self: &Arc<Self>, conn: &Arc<Connection>) {
        let pending = PendingCompletion::new(
            XID_PING,
            CompletionKind::Void,
            Waiter::Callback(Box::new(|_| {})),
        );
        self.router.lock().await.register(pending);
        let hdr = RequestHeader { xid: XID_PING, op_code: OpCode::Ping as i32 };
        conn.enqueue(hdr.encode(&[]));
    }

    async fn handle_inbound_frame(self: &Arc<Self>, frame: Bytes) -> Result<FrameOutcome> {
        let (zxid, dispatch) = self.router.lock().await.route(frame)?;
        // I5: every reply header carries the server's current zxid, and it
        // must be folded in regardless of which kind of reply this was so
        // the next handshake's `last_zxid_seen` reflects what this client
        // has actually observed.
        self.last_zxid.store(zxid, Ordering::Relaxed);
        match dispatch {
            Dispatch::Watch(event) => {
                self.watcher.handle(&event);
                Ok(FrameOutcome::Continue)
            },
            Dispatch::Auth { err } => {
                Ok(if err != 0 { FrameOutcome::AuthFailed } else { FrameOutcome::Continue })
            },
            Dispatch::Completed => Ok(FrameOutcome::Continue),
        }
    }

    fn rearm_watches(self: &Arc<Self>) {
        let Some(registry) = self.watch_registry.clone() else {
            return;
        };
        let core = Arc::clone(self);
        tokio::spawn(async move {
            for (path, class) in registry.drain_for_rearm() {
                let session = Session { core: core.clone() };
                let outcome = match class {
                    WatchClass::Data => session.get(&path, true).await.map(|_| ()),
                    WatchClass::Exists => session.exists(&path, true).await.map(|_| ()),
                    WatchClass::Children => {
                        session.get_children(&path, true).await.map(|_| ())
                    },
                };
                if let Err(e) = outcome {
                    debug!("watch re-arm for {path} failed: {e}");
                }
            }
        });
    }

    async fn drive_connected(
        self: &Arc<Self>,
        conn: Arc<Connection>,
        mut rx: mpsc::Receiver<Bytes>,
    ) -> DriveOutcome {
        *self.conn.lock().await = Some(Arc::clone(&conn));
        *self.last_recv.lock().await = Instant::now();

        let outcome = loop {
            let recv_timeout_ms =
                self.identity.lock().await.timeout_ms.max(1) as u64;
            let recv_timeout = Duration::from_millis(recv_timeout_ms);
            let pending_empty = self.router.lock().await.pending_len() == 0;
            let idle = self.last_recv.lock().await.elapsed();
            let threshold = if pending_empty {
                recv_timeout / 3
            } else {
                recv_timeout * 2 / 3
            };
            let wake = threshold.saturating_sub(idle);

            tokio::select! {
                _ = self.cancel.cancelled() => break DriveOutcome::Closing,
                frame = rx.recv() => {
                    match frame {
                        Some(f) => {
                            *self.last_recv.lock().await = Instant::now();
                            match self.handle_inbound_frame(f).await {
                                Ok(FrameOutcome::Continue) => {},
                                Ok(FrameOutcome::AuthFailed) => break DriveOutcome::AuthFailed,
                                Err(e) => {
                                    warn!("protocol inconsistency, tearing down: {e}");
                                    break DriveOutcome::Transient;
                                },
                            }
                        },
                        None => break DriveOutcome::Transient,
                    }
                },
                _ = tokio::time::sleep(wake) => {
                    if pending_empty {
                        self.send_ping(&conn).await;
                    } else {
                        warn!("no response from server within {recv_timeout:?}, dropping connection");
                        break DriveOutcome::Transient;
                    }
                },
            }
        };

        *self.conn.lock().await = None;
        outcome
    }

    async fn run_forever(self: Arc<Self>) {
        loop {
            if self.cancel.is_cancelled() {
                self.set_state(KeeperState::Closed);
                return;
            }
            self.set_state(KeeperState::Connecting);

            match self.connect_and_handshake().await {
                Ok(ConnectOutcome::Ready(conn, rx)) => {
                    self.backoff.lock().await.reset();
                    self.set_state(KeeperState::Connected);
                    session_event(self.watcher.as_ref(), KeeperState::Connected);
                    self.rearm_watches();

                    match self.drive_connected(conn, rx).await {
                        DriveOutcome::Transient => {
                            // I-order: the Connecting event must reach the watcher before any
                            // completion is failed with ConnectionLoss (SPEC_FULL.md §4.4, §5).
                            self.set_state(KeeperState::Connecting);
                            session_event(self.watcher.as_ref(), KeeperState::Connecting);
                            self.router.lock().await.drain_with_error(ZkError::ConnectionLoss);
                            self.advance_and_backoff().await;
                        },
                        DriveOutcome::AuthFailed => {
                            self.router.lock().await.drain_with_error(ZkError::AuthFailed);
                            self.set_state(KeeperState::AuthFailed);
                            session_event(self.watcher.as_ref(), KeeperState::AuthFailed);
                            return;
                        },
                        DriveOutcome::Closing => {
                            self.router.lock().await.drain_with_error(ZkError::Closing);
                            self.set_state(KeeperState::Closed);
                            return;
                        },
                    }
                },
                Ok(ConnectOutcome::Expired) => {
                    self.router.lock().await.drain_with_error(ZkError::SessionExpired);
                    self.set_state(KeeperState::Expired);
                    session_event(self.watcher.as_ref(), KeeperState::Expired);
                    return;
                },
                Err(e) => {
                    debug!("connect attempt failed: {e}");
                    self.advance_and_backoff().await;
                },
            }
        }
    }
}

/// Public handle to a session. Cheaply cloned (`Arc` inside); closing any
/// clone closes the session for all of them.
#[derive(Clone)]
pub struct Session {
    pub(crate) core: Arc<SessionCore>,
}

impl Session {
    /// Connects to one of `connect_string`'s endpoints and blocks until the
    /// session reaches CONNECTED or a terminal state. Once CONNECTED, a
    /// background task maintains the session (pings, reconnects) for as
    /// long as the returned handle (or a clone) is alive.
    pub async fn connect(
        connect_string: &str,
        deterministic_conn_order: bool,
        session_timeout: Duration,
        io_timeout: Duration,
        watcher: Arc<dyn Watcher>,
        watch_registry: Option<Arc<WatchRegistry>>,
    ) -> Result<Self> {
        let endpoints = EndpointSet::parse(connect_string, deterministic_conn_order)?;
        let (state_tx, mut state_rx) = watch::channel(KeeperState::Closed);

        let core = Arc::new(SessionCore {
            endpoints: Mutex::new(endpoints),
            backoff: Mutex::new(BackOff::new(
                Duration::from_millis(100),
                session_timeout,
            )),
            state_tx,
            identity: Mutex::new(SessionIdentity::fresh(session_timeout)),
            last_zxid: AtomicI64::new(0),
            last_recv: Mutex::new(Instant::now()),
            router: Mutex::new(Router::new()),
            conn: Mutex::new(None),
            send_lock: Mutex::new(()),
            xid_gen: super::router::XidGenerator::new(),
            watcher,
            watch_registry,
            auth: Mutex::new(None),
            cancel: CancellationToken::new(),
            io_timeout,
        });

        tokio::spawn(Arc::clone(&core).run_forever());

        loop {
            match *state_rx.borrow() {
                KeeperState::Connected => {
                    info!("session established");
                    return Ok(Session { core });
                },
                KeeperState::Expired => return Err(ZkError::SessionExpired),
                KeeperState::AuthFailed => return Err(ZkError::AuthFailed),
                _ => {},
            }
            state_rx.changed().await.map_err(|_| ZkError::ConnectionLoss)?;
        }
    }

    pub fn state(&self) -> KeeperState {
        *self.core.state_tx.subscribe().borrow()
    }

    /// Supplies credentials for the auth sub-protocol (SPEC_FULL.md §4.7).
    /// Applied to the current connection immediately if CONNECTED, and
    /// replayed on every subsequent reconnect.
    pub async fn add_auth(&self, scheme: impl Into<String>, credential: Bytes) -> Result<()> {
        let auth = AuthInfo::new(scheme, credential);
        *self.core.auth.lock().await = Some(auth.clone());
        if let Some(conn) = self.core.conn.lock().await.as_ref() {
            conn.enqueue_front(auth.encode_request());
        }
        Ok(())
    }

    /// Cancels the background task and drains every pending completion with
    /// `ZkError::Closing`. Idempotent.
    pub fn close(&self) {
        self.core.cancel.cancel();
    }

    pub(crate) fn watch_registry(&self) -> Option<Arc<WatchRegistry>> {
        self.core.watch_registry.clone()
    }

    /// Allocates an xid, registers a completion, and enqueues the frame as
    /// one atomic sequence under `send_lock` — I1's "enqueued before or
    /// atomically with the frame" requirement, and the reason the pending
    /// queue is guaranteed to reflect send order (I2) even with multiple
    /// concurrent callers.
    pub(crate) async fn call(
        &self,
        op_code: OpCode,
        body: Bytes,
        kind: CompletionKind,
    ) -> Result<super::completion::CompletionResult> {
        if matches!(self.state(), KeeperState::Expired | KeeperState::AuthFailed) {
            return Err(ZkError::InvalidState);
        }

        let (tx, rx) = tokio::sync::oneshot::channel();
        {
            let _guard = self.core.send_lock.lock().await;

            // Require a live connection before registering anything, so a
            // disconnected session never leaks a pending completion nobody
            // will ever fire. This implementation does not queue requests
            // made while disconnected for later replay (see DESIGN.md).
            let conn = self.core.conn.lock().await.clone().ok_or(ZkError::ConnectionLoss)?;

            let xid = self.core.xid_gen.next();
            let frame = RequestHeader { xid, op_code: op_code as i32 }.encode(&body);
            self.core
                .router
                .lock()
                .await
                .register(PendingCompletion::new(xid, kind, Waiter::Sync(tx)));
            conn.enqueue(frame);
        }

        rx.await.map_err(|_| ZkError::ConnectionLoss)?
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("state", &self.state()).finish()
    }
}
