// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! S4 (SPEC_FULL.md §8, §4.7): `add_auth` sends a SETAUTH frame immediately
//! and out of band from the main request stream (`xid = XID_AUTH`), and a
//! successful auth ack does not disturb ordinary request/response
//! processing afterward.

use std::{sync::Arc, time::Duration};

use zk_client_rs::{
    client::{session::Session, watch::NullWatcher},
    proto::{OpCode, XID_AUTH},
};

use crate::integration_tests::common::{accept_and_handshake, recv_request, send_reply};

#[tokio::test]
async fn add_auth_is_sent_as_a_setauth_frame_and_acked() {
    let (listener, addr) = crate::integration_tests::common::bind_loopback().await;

    let server = tokio::spawn(async move {
        let (mut stream, _req) = accept_and_handshake(&listener, 1, 10_000).await;

        let auth_frame = recv_request(&mut stream).await;
        assert_eq!(auth_frame.xid, XID_AUTH);
        assert_eq!(auth_frame.op_code, OpCode::SetAuth as i32);
        send_reply(&mut stream, XID_AUTH, 1, 0, &[]).await;

        // Connection must still work normally for ordinary ops afterward.
        let get_frame = recv_request(&mut stream).await;
        assert_eq!(get_frame.op_code, OpCode::GetData as i32);
        let body = zk_client_rs::proto::payload::encode_data_and_stat(
            b"ok",
            &zk_client_rs::types::Stat::default(),
        );
        send_reply(&mut stream, get_frame.xid, 2, 0, &body).await;
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

    session
        .add_auth("digest", bytes::Bytes::from_static(b"user:pass"))
        .await
        .expect("add_auth");

    let (data, _stat) = session.get("/x", false).await.expect("get after auth");
    assert_eq!(&data[..], b"ok");

    server.await.expect("server task panicked");
    session.close();
}
