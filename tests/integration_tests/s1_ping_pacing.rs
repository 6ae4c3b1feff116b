// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! S1 (SPEC_FULL.md §8): with no outstanding requests, the reactor must
//! send a ping once the connection has been idle for roughly a third of
//! the negotiated session timeout, and the session must stay CONNECTED as
//! long as those pings are answered.

use std::{sync::Arc, time::Duration};

use zk_client_rs::{
    client::{session::Session, watch::NullWatcher},
    proto::XID_PING,
};

use crate::integration_tests::common::{accept_and_handshake, recv_request, send_reply};

#[tokio::test]
async fn session_pings_on_idle_and_stays_connected() {
    let (listener, addr) = crate::integration_tests::common::bind_loopback().await;
    let session_timeout = Duration::from_millis(240);

    let server = tokio::spawn(async move {
        let (mut stream, _req) = accept_and_handshake(&listener, 1, 240).await;
        let mut pings_seen = 0;
        while pings_seen < 2 {
            let req = recv_request(&mut stream).await;
            assert_eq!(req.xid, XID_PING, "expected a ping while idle");
            send_reply(&mut stream, req.xid, 1, 0, &[]).await;
            pings_seen += 1;
        }
    });

    let session = Session::connect(
        &addr.to_string(),
        true,
        session_timeout,
        Duration::from_secs(5),
        Arc::new(NullWatcher),
        None,
    )
    .await
    .expect("connect");

    tokio::time::timeout(Duration::from_secs(2), server)
        .await
        .expect("server task timed out")
        .expect("server task panicked");

    assert_eq!(
        session.state(),
        zk_client_rs::proto::watcher_event::KeeperState::Connected
    );
    session.close();
}
