// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! `WatcherEvent { type: i32, state: i32, path: string }`, the body of any
//! inbound frame whose `ReplyHeader.xid == XID_WATCH` (SPEC_FULL.md §6).

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, ZkError};

/// Event types a watcher callback can observe (SPEC_FULL.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Created,
    Deleted,
    Changed,
    Child,
    Session,
    NotWatching,
}

impl EventType {
    pub fn code(self) -> i32 {
        match self {
            EventType::Created => 1,
            EventType::Deleted => 2,
            EventType::Changed => 3,
            EventType::Child => 4,
            EventType::Session => -1,
            EventType::NotWatching => -2,
        }
    }

    pub fn from_code(code: i32) -> Result<Self> {
        Ok(match code {
            1 => EventType::Created,
            2 => EventType::Deleted,
            3 => EventType::Changed,
            4 => EventType::Child,
            -1 => EventType::Session,
            -2 => EventType::NotWatching,
            other => {
                return Err(ZkError::MarshallingError(format!(
                    "unknown watch event type {other}"
                )));
            },
        })
    }
}

/// Session state, shared between `WatcherEvent.state` (when `type ==
/// Session`) and the session state machine itself (SPEC_FULL.md §4.4).
///
/// `Associating` is part of the wire vocabulary but never actually entered:
/// `SessionCore` collapses the CONNECTING -> ASSOCIATING -> CONNECTED
/// handshake sequence inside `connect_and_handshake` while `self.state`
/// stays `Connecting` throughout, since no watcher event is tied to
/// ASSOCIATING and nothing outside the handshake observes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeeperState {
    Closed,
    Connecting,
    Associating,
    Connected,
    Expired,
    AuthFailed,
}

impl KeeperState {
    pub fn code(self) -> i32 {
        match self {
            KeeperState::Closed => 0,
            KeeperState::Connecting => 1,
            KeeperState::Associating => 2,
            KeeperState::Connected => 3,
            KeeperState::Expired => -112,
            KeeperState::AuthFailed => -113,
        }
    }

    pub fn from_code(code: i32) -> Result<Self> {
        Ok(match code {
            0 => KeeperState::Closed,
            1 => KeeperState::Connecting,
            2 => KeeperState::Associating,
            3 => KeeperState::Connected,
            -112 => KeeperState::Expired,
            -113 => KeeperState::AuthFailed,
            other => {
                return Err(ZkError::MarshallingError(format!(
                    "unknown session state {other}"
                )));
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherEvent {
    pub event_type: EventType,
    pub state: KeeperState,
    pub path: Option<String>,
}

impl WatcherEvent {
    pub fn session_event(state: KeeperState) -> Self {
        Self { event_type: EventType::Session, state, path: None }
    }

    pub fn encode(&self) -> Bytes {
        let path_bytes = self.path.as_deref().unwrap_or("").as_bytes();
        let mut out = BytesMut::with_capacity(12 + path_bytes.len());
        out.put_i32(self.event_type.code());
        out.put_i32(self.state.code());
        out.put_i32(path_bytes.len() as i32);
        out.extend_from_slice(path_bytes);
        out.freeze()
    }

    pub fn decode(mut body: Bytes) -> Result<Self> {
        if body.len() < 12 {
            return Err(ZkError::MarshallingError(
                "watcher event body too short".into(),
            ));
        }
        let event_type = EventType::from_code(body.get_i32())?;
        let state = KeeperState::from_code(body.get_i32())?;
        let path_len = body.get_i32();
        let path = if path_len <= 0 {
            None
        } else {
            let path_len = path_len as usize;
            if body.len() < path_len {
                return Err(ZkError::MarshallingError(
                    "watcher event path truncated".into(),
                ));
            }
            let raw = body.split_to(path_len);
            Some(
                String::from_utf8(raw.to_vec())
                    .map_err(|e| ZkError::MarshallingError(e.to_string()))?,
            )
        };
        Ok(Self { event_type, state, path })
    }
}
