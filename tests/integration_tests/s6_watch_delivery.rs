// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! S6 (SPEC_FULL.md §8, §4.6): an unsolicited frame with `xid = XID_WATCH`
//! is routed to the watcher without touching the pending-completion queue,
//! and in particular does not interfere with an ordinary call already
//! completed on the same connection.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use zk_client_rs::{
    client::{session::Session, watch::Watcher},
    proto::{
        OpCode,
        watcher_event::{EventType, KeeperState, WatcherEvent},
    },
};

use crate::integration_tests::common::{
    accept_and_handshake, recv_request, send_reply, send_watch_event,
};

struct CollectingWatcher {
    events: Arc<Mutex<Vec<WatcherEvent>>>,
}

impl Watcher for CollectingWatcher {
    fn handle(&self, event: &WatcherEvent) {
        self.events.lock().expect("events mutex poisoned").push(event.clone());
    }
}

#[tokio::test]
async fn watch_notification_reaches_the_watcher() {
    let (listener, addr) = crate::integration_tests::common::bind_loopback().await;

    let server = tokio::spawn(async move {
        let (mut stream, _req) = accept_and_handshake(&listener, 1, 10_000).await;

        let get_frame = recv_request(&mut stream).await;
        assert_eq!(get_frame.op_code, OpCode::GetData as i32);
        let body = zk_client_rs::proto::payload::encode_data_and_stat(
            b"v1",
            &zk_client_rs::types::Stat::default(),
        );
        send_reply(&mut stream, get_frame.xid, 1, 0, &body).await;

        let event =
            WatcherEvent { event_type: EventType::Changed, state: KeeperState::Connected, path: Some("/watched".into()) };
        send_watch_event(&mut stream, 2, &event.encode()).await;

        tokio::time::sleep(Duration::from_millis(100)).await;
    });

    let events = Arc::new(Mutex::new(Vec::new()));
    let watcher = Arc::new(CollectingWatcher { events: Arc::clone(&events) });

    let session = Session::connect(
        &addr.to_string(),
        true,
        Duration::from_secs(10),
        Duration::from_secs(5),
        watcher,
        None,
    )
    .await
    .expect("connect");

    let (data, _stat) = session.get("/watched", true).await.expect("get");
    assert_eq!(&data[..], b"v1");

    tokio::time::sleep(Duration::from_millis(200)).await;

    let seen = events.lock().expect("events mutex poisoned").clone();
    assert!(
        seen.iter().any(|e| e.event_type == EventType::Changed
            && e.path.as_deref() == Some("/watched")),
        "watch event delivered to watcher: {seen:?}"
    );

    server.await.expect("server task panicked");
    session.close();
}
