// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! S2 (SPEC_FULL.md §8): requests are correlated strictly FIFO (I2). If the
//! server answers out of order, the mismatch is fatal for the connection
//! and every completion still in flight fails with `ConnectionLoss`
//! (P1/P2).

use std::{sync::Arc, time::Duration};

use zk_client_rs::{
    client::{session::Session, watch::NullWatcher},
    error::ZkError,
};

use crate::integration_tests::common::{accept_and_handshake, recv_request, send_reply};

#[tokio::test]
async fn out_of_order_reply_fails_both_in_flight_calls() {
    let (listener, addr) = crate::integration_tests::common::bind_loopback().await;

    let server = tokio::spawn(async move {
        let (mut stream, _req) = accept_and_handshake(&listener, 1, 10_000).await;
        let first = recv_request(&mut stream).await;
        let second = recv_request(&mut stream).await;
        assert!(first.xid < second.xid, "requests enqueue in FIFO xid order");

        // Deliberately answer out of order: this must desynchronize the
        // router and tear the connection down.
        send_reply(&mut stream, second.xid, 2, 0, &[]).await;
        // Keep the socket open briefly so the teardown is observed as a
        // protocol error rather than a plain connection loss.
        tokio::time::sleep(Duration::from_millis(50)).await;
    });

    let session = Session::connect(
        &addr.to_string(),
        true,
        Duration::from_secs(10),
        Duration::from_secs(5),
        Arc::new(NullWatcher),
        None,
    )
    .await
    .expect("connect");

    let s1 = session.clone();
    let s2 = session.clone();
    let (r1, r2) = tokio::join!(
        async move { s1.get("/a", false).await },
        async move { s2.get("/b", false).await }
    );

    assert!(matches!(r1.unwrap_err(), ZkError::ConnectionLoss));
    assert!(matches!(r2.unwrap_err(), ZkError::ConnectionLoss));

    server.await.expect("server task panicked");
    session.close();
}
