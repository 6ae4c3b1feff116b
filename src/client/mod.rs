// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The session/connection stack (SPEC_FULL.md §2): a thin I/O reactor
//! (`connection`) underneath a request router (`router`), an auth
//! sub-protocol (`auth`), watch dispatch (`watch`), the session state
//! machine (`session`), and the client-facing operations (`ops`).

pub mod auth;
mod common;
pub mod completion;
pub mod connection;
mod ops;
pub mod router;
pub mod session;
pub mod watch;
