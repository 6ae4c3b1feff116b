// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! S3 (SPEC_FULL.md §8): when a reconnect's handshake presents a non-zero
//! session id the server no longer recognizes (it assigns a different
//! one), the handle must transition to EXPIRED and every subsequent call
//! must fail (P3, P5).

use std::{sync::Arc, time::Duration};

use zk_client_rs::{
    client::{session::Session, watch::NullWatcher},
    error::ZkError,
    proto::watcher_event::KeeperState,
};

use crate::integration_tests::common::accept_and_handshake;

#[tokio::test]
async fn mismatched_session_id_on_reconnect_expires_the_session() {
    let (listener, addr) = crate::integration_tests::common::bind_loopback().await;

    let server = tokio::spawn(async move {
        // First handshake: assign session 0x777 and accept continuity.
        let (stream, first_req) = accept_and_handshake(&listener, 0x777, 5_000).await;
        assert_eq!(first_req.session_id, 0, "fresh session presents id 0");
        drop(stream); // simulate connection loss

        // Second handshake: client re-presents 0x777, server assigns a
        // different id, signalling the old session is gone.
        let (_stream, second_req) = accept_and_handshake(&listener, 0x888, 5_000).await;
        assert_eq!(second_req.session_id, 0x777);
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

    // Poll until the background task observes the mismatch and expires.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while session.state() != KeeperState::Expired && tokio::time::Instant::now() < deadline
    {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(session.state(), KeeperState::Expired);

    let err = session.get("/anything", false).await.unwrap_err();
    assert!(matches!(err, ZkError::InvalidState));

    server.await.expect("server task panicked");
}
