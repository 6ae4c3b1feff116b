// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! A pure-Rust client for a hierarchical coordination service: session
//! establishment and reconnect, request/response multiplexing over a single
//! TCP connection, watch/event delivery, and the auth sub-protocol.
//!
//! See `SPEC_FULL.md` for the full module breakdown; `client::session` is
//! the entry point (`Session::connect`), with operations in `client::ops`.

pub mod acl;
pub mod cfg;
pub mod client;
pub mod endpoint;
pub mod error;
pub mod proto;
pub mod queue;
pub mod types;
