// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Result shapes shared by the client-facing operations (SPEC_FULL.md §3,
//! §6). Per the crate's out-of-scope declaration (SPEC_FULL.md §1), the
//! *contents* of `Stat` beyond its znode-tree identity fields are treated
//! as an opaque record the server produces and the client never
//! interprets; only the envelope fields this client itself depends on
//! (czxid/mzxid/version, used for optimistic concurrency on `set`/`delete`)
//! are named here.

use bitflags::bitflags;

/// Per-node metadata returned by `exists`, `get`, and `set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stat {
    /// zxid of the node's creation.
    pub czxid: i64,
    /// zxid of the node's last modification.
    pub mzxid: i64,
    /// Data version; must match the caller's `version` argument on
    /// `set`/`delete` or the server returns `ZBADVERSION`.
    pub version: i32,
    /// Number of children currently attached.
    pub num_children: i32,
}

bitflags! {
    /// Create-time flags (SPEC_FULL.md §6: `EPHEMERAL=1, SEQUENCE=2`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CreateMode: i32 {
        /// The node's lifetime is bound to the creating session.
        const EPHEMERAL = 0x1;
        /// The server appends a monotonic suffix to the requested path.
        const SEQUENCE = 0x2;
    }
}
