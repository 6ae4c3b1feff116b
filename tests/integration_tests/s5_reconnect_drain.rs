// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! S5 (SPEC_FULL.md §8): a request left in flight when the connection
//! drops must be failed with `ConnectionLoss` (the router drain on
//! teardown), and the session must still reconnect transparently
//! afterward.

use std::{sync::Arc, time::Duration};

use zk_client_rs::{
    client::{session::Session, watch::NullWatcher},
    error::ZkError,
    proto::watcher_event::KeeperState,
};

use crate::integration_tests::common::{accept_and_handshake, recv_request};

#[tokio::test]
async fn in_flight_call_fails_on_disconnect_then_session_reconnects() {
    let (listener, addr) = crate::integration_tests::common::bind_loopback().await;

    let server = tokio::spawn(async move {
        let (mut stream, first_req) = accept_and_handshake(&listener, 42, 5_000).await;
        assert_eq!(first_req.session_id, 0);
        let _req = recv_request(&mut stream).await;
        drop(stream); // never answer; simulate mid-flight connection loss

        let (_stream2, second_req) = accept_and_handshake(&listener, 42, 5_000).await;
        assert_eq!(second_req.session_id, 42, "continuity across reconnect");
    });

    let session = Session::connect(
        &addr.to_string(),
        true,
        Duration::from_secs(5),
        Duration::from_secs(1),
        Arc::new(NullWatcher),
        None,
    )
    .await
    .expect("connect");

    let err = session.get("/in-flight", false).await.unwrap_err();
    assert!(matches!(err, ZkError::ConnectionLoss));

    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while session.state() != KeeperState::Connected && tokio::time::Instant::now() < deadline
    {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(session.state(), KeeperState::Connected);

    server.await.expect("server task panicked");
    session.close();
}
