// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! ACL types and the predefined ACL constants (SPEC_FULL.md §6).

use bitflags::bitflags;

bitflags! {
    /// Permission bits for a single ACL entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Permission: i32 {
        const READ   = 0b0_0001;
        const WRITE  = 0b0_0010;
        const CREATE = 0b0_0100;
        const DELETE = 0b0_1000;
        const ADMIN  = 0b1_0000;
        const ALL = Self::READ.bits()
            | Self::WRITE.bits()
            | Self::CREATE.bits()
            | Self::DELETE.bits()
            | Self::ADMIN.bits();
    }
}

/// A single `{permission-mask, identity-scheme, identity}` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acl {
    pub perms: Permission,
    pub scheme: String,
    pub id: String,
}

impl Acl {
    pub fn new(perms: Permission, scheme: impl Into<String>, id: impl Into<String>) -> Self {
        Self { perms, scheme: scheme.into(), id: id.into() }
    }

    /// `{ALL, world:anyone}` — wide open, suitable only for throwaway or
    /// test trees.
    pub fn open_unsafe() -> Vec<Acl> {
        vec![Acl::new(Permission::ALL, "world", "anyone")]
    }

    /// `{READ, world:anyone}`.
    pub fn read_unsafe() -> Vec<Acl> {
        vec![Acl::new(Permission::READ, "world", "anyone")]
    }

    /// `{ALL, auth:""}` — grants full control to whoever created the node,
    /// via their authenticated identity.
    pub fn creator_all() -> Vec<Acl> {
        vec![Acl::new(Permission::ALL, "auth", "")]
    }
}
