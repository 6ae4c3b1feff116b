// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Shared scaffolding for the in-process mock server scenarios
//! (SPEC_FULL.md §8, S1-S6): a loopback `TcpListener` speaking just enough
//! of the wire protocol (handshake + reply-header envelope) to drive the
//! session machine through real TCP, without a real coordination-service
//! node.

use bytes::{Buf, Bytes, BytesMut};
use tokio::net::{TcpListener, TcpStream};
use zk_client_rs::proto::{
    frame::{recv_frame, send_frame},
    handshake::{ConnectResponse, PASSWORD_LEN},
};

pub async fn bind_loopback() -> (TcpListener, std::net::SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    (listener, addr)
}

/// What the client's `ConnectRequest` carried, decoded the way a real
/// server would (the crate itself never needs to decode its own
/// handshake request, only encode it).
pub struct ParsedConnectRequest {
    pub last_zxid_seen: i64,
    pub timeout_ms: i32,
    pub session_id: i64,
}

pub fn parse_connect_request(frame: &Bytes) -> ParsedConnectRequest {
    let mut buf = frame.clone();
    let _protocol_version = buf.get_i32();
    let last_zxid_seen = buf.get_i64();
    let timeout_ms = buf.get_i32();
    let session_id = buf.get_i64();
    let _passwd_len = buf.get_i32();
    ParsedConnectRequest { last_zxid_seen, timeout_ms, session_id }
}

/// Accepts one connection on `listener`, reads and decodes its
/// `ConnectRequest`, and answers with a `ConnectResponse` assigning
/// `session_id`/`timeout_ms`. Returns the live stream and the decoded
/// request so the caller can assert on continuity (SPEC_FULL.md P3).
pub async fn accept_and_handshake(
    listener: &TcpListener,
    session_id: i64,
    timeout_ms: i32,
) -> (TcpStream, ParsedConnectRequest) {
    let (mut stream, _) = listener.accept().await.expect("accept");
    let frame = recv_frame(&mut stream).await.expect("recv connect request");
    let parsed = parse_connect_request(&frame);
    let response = ConnectResponse {
        protocol_version: 0,
        timeout_ms,
        session_id,
        password: [0u8; PASSWORD_LEN],
    };
    send_frame(&mut stream, &response.encode()).await.expect("send connect response");
    (stream, parsed)
}

/// One decoded `{RequestHeader; body}` as a real server would see it.
pub struct ParsedRequest {
    pub xid: i32,
    pub op_code: i32,
    pub body: Bytes,
}

pub async fn recv_request(stream: &mut TcpStream) -> ParsedRequest {
    let frame = recv_frame(stream).await.expect("recv request frame");
    let mut buf = frame;
    let xid = buf.get_i32();
    let op_code = buf.get_i32();
    ParsedRequest { xid, op_code, body: buf }
}

/// Builds and sends a `{ReplyHeader; body}` frame.
pub async fn send_reply(
    stream: &mut TcpStream,
    xid: i32,
    zxid: i64,
    err: i32,
    body: &[u8],
) {
    let mut out = BytesMut::with_capacity(16 + body.len());
    out.extend_from_slice(&xid.to_be_bytes());
    out.extend_from_slice(&zxid.to_be_bytes());
    out.extend_from_slice(&err.to_be_bytes());
    out.extend_from_slice(body);
    send_frame(stream, &out).await.expect("send reply");
}

/// Sends an unsolicited watch notification (`xid = XID_WATCH`).
pub async fn send_watch_event(stream: &mut TcpStream, zxid: i64, event_body: &[u8]) {
    send_reply(stream, zk_client_rs::proto::XID_WATCH, zxid, 0, event_body).await;
}

/// A `Void` reply body is empty; `Stat`/`Data`/etc. bodies are built
/// inline in each scenario test from `zk_client_rs::proto::payload`.
pub fn void_body() -> Vec<u8> {
    Vec::new()
}
