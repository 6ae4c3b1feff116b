// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Stable, numbered error taxonomy for the coordination-service client.
//!
//! A small `thiserror`-derived enum carrying a stable integer discriminant
//! alongside a human `Display` message for each error.

use thiserror::Error;

/// Every error this crate can return, with the stable numeric code each
/// corresponds to on the wire.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ZkError {
    /// System-level I/O failure not otherwise classified.
    #[error("system error")]
    SystemError,

    /// The TCP connection was lost; the session itself may still recover.
    #[error("connection loss")]
    ConnectionLoss,

    /// No bytes were received from the server within the negotiated
    /// timeout window.
    #[error("operation timeout")]
    OperationTimeout,

    /// A frame could not be encoded or decoded.
    #[error("marshalling error: {0}")]
    MarshallingError(String),

    /// The server assigned a different session id than the one presented;
    /// the session is permanently gone.
    #[error("session expired")]
    SessionExpired,

    /// The handle is in a terminal state (EXPIRED or AUTH_FAILED) and
    /// refuses further I/O.
    #[error("invalid state")]
    InvalidState,

    /// The auth sub-protocol reported a non-zero result.
    #[error("authentication failed")]
    AuthFailed,

    /// The handle has been closed by the caller; in-flight calls are
    /// failed with this instead of `ConnectionLoss`.
    #[error("closing")]
    Closing,

    /// The response stream desynchronized from the request stream (xid
    /// mismatch). Fatal for the connection.
    #[error("runtime inconsistency: {0}")]
    RuntimeInconsistency(String),

    /// The server reported data inconsistent with what the client expects.
    #[error("data inconsistency")]
    DataInconsistency,

    /// Caller supplied invalid arguments; no state change occurs.
    #[error("bad arguments: {0}")]
    BadArguments(String),

    /// An ACL supplied by the caller is structurally invalid.
    #[error("invalid ACL")]
    InvalidAcl,

    /// A caller-supplied callback violates the API contract.
    #[error("invalid callback")]
    InvalidCallback,

    /// Server-side: no such node.
    #[error("no node")]
    NoNode,

    /// Server-side: not authenticated / not authorized.
    #[error("not authenticated")]
    NoAuth,

    /// Server-side: version supplied by the caller does not match.
    #[error("bad version")]
    BadVersion,

    /// Server-side: ephemeral nodes may not have children.
    #[error("no children for ephemerals")]
    NoChildrenForEphemerals,

    /// Server-side: node already exists.
    #[error("node exists")]
    NodeExists,

    /// Server-side: node has children and the op requires it to be empty.
    #[error("not empty")]
    NotEmpty,

    /// Server-side: generic API error not otherwise classified.
    #[error("api error")]
    ApiError,

    /// Server-side: requested operation is not implemented by this server.
    #[error("unimplemented")]
    Unimplemented,
}

impl ZkError {
    /// The stable integer error code as carried in a reply header's `err`
    /// field.
    pub fn code(&self) -> i32 {
        match self {
            ZkError::SystemError => -2,
            ZkError::ConnectionLoss => -4,
            ZkError::OperationTimeout => -7,
            ZkError::MarshallingError(_) => -5,
            ZkError::SessionExpired => -112,
            ZkError::InvalidState => -9,
            ZkError::AuthFailed => -113,
            ZkError::Closing => -116,
            ZkError::RuntimeInconsistency(_) => -3,
            ZkError::DataInconsistency => -6,
            ZkError::BadArguments(_) => -8,
            ZkError::InvalidAcl => -114,
            ZkError::InvalidCallback => -115,
            ZkError::NoNode => -101,
            ZkError::NoAuth => -102,
            ZkError::BadVersion => -103,
            ZkError::NoChildrenForEphemerals => -108,
            ZkError::NodeExists => -110,
            ZkError::NotEmpty => -111,
            ZkError::ApiError => -100,
            ZkError::Unimplemented => -99,
        }
    }

    /// Reconstructs an error from the server's `ReplyHeader.err` field.
    /// `0` never reaches this — callers check for success first.
    pub fn from_server_code(code: i32) -> Self {
        match code {
            -101 => ZkError::NoNode,
            -102 => ZkError::NoAuth,
            -103 => ZkError::BadVersion,
            -108 => ZkError::NoChildrenForEphemerals,
            -110 => ZkError::NodeExists,
            -111 => ZkError::NotEmpty,
            -99 => ZkError::Unimplemented,
            _ => ZkError::ApiError,
        }
    }
}

pub type Result<T> = std::result::Result<T, ZkError>;
