// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Endpoint set: parses the comma-separated `host:port` list, resolves each
//! host, optionally shuffles for load spreading, and hands out a
//! round-robin connect cursor (SPEC_FULL.md §4.2).

use std::{
    net::{SocketAddr, ToSocketAddrs},
    time::Duration,
};

use rand::{Rng, rng};

use crate::error::{Result, ZkError};

/// Bounded exponential back-off applied when the connect cursor wraps
/// around to the start of the endpoint list, so a fully unreachable
/// endpoint set doesn't spin the reconnect loop at full speed.
#[derive(Debug, Clone, Copy)]
pub struct BackOff {
    base: Duration,
    cap: Duration,
    attempt: u32,
}

impl BackOff {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap, attempt: 0 }
    }

    /// The delay to wait before the next connect attempt after a wrap.
    /// Doubles per wrap, capped at `cap`.
    pub fn next_delay(&mut self) -> Duration {
        let factor = 1u32.checked_shl(self.attempt).unwrap_or(u32::MAX);
        let candidate = self.base.saturating_mul(factor);
        self.attempt = self.attempt.saturating_add(1);
        candidate.min(self.cap)
    }

    /// Reset back-off after a successful CONNECTED transition.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// A parsed, resolved, (optionally shuffled) list of server addresses with
/// a round-robin connect cursor.
#[derive(Debug, Clone)]
pub struct EndpointSet {
    addrs: Vec<SocketAddr>,
    cursor: usize,
}

impl EndpointSet {
    /// Parses `"host1:port1,host2:port2,..."`, resolves every host, and
    /// (unless `deterministic` is set) shuffles the resulting address list.
    pub fn parse(connect_string: &str, deterministic: bool) -> Result<Self> {
        let mut addrs = Vec::new();
        for token in connect_string.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let idx = token.rfind(':').ok_or_else(|| {
                ZkError::BadArguments(format!(
                    "endpoint '{token}' is missing a ':port' suffix"
                ))
            })?;
            let (host, port_str) = token.split_at(idx);
            let port_str = &port_str[1..];
            let port: u16 = port_str.parse().map_err(|_| {
                ZkError::BadArguments(format!(
                    "endpoint '{token}' has a non-numeric port"
                ))
            })?;
            if host.is_empty() {
                return Err(ZkError::BadArguments(format!(
                    "endpoint '{token}' is missing a host"
                )));
            }
            let resolved = (host, port).to_socket_addrs().map_err(|e| {
                ZkError::BadArguments(format!(
                    "failed to resolve host '{host}': {e}"
                ))
            })?;
            addrs.extend(resolved);
        }
        if addrs.is_empty() {
            return Err(ZkError::BadArguments(
                "endpoint list resolved to zero addresses".into(),
            ));
        }
        if !deterministic {
            shuffle(&mut addrs);
        }
        Ok(Self { addrs, cursor: 0 })
    }

    /// Build directly from already-resolved addresses (used by tests that
    /// want deterministic wiring without DNS).
    pub fn from_addrs(addrs: Vec<SocketAddr>) -> Self {
        Self { addrs, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    /// The endpoint the cursor currently points to.
    pub fn current(&self) -> SocketAddr {
        self.addrs[self.cursor]
    }

    /// Advances the cursor, wrapping at `len()`. Returns `true` if this
    /// advance wrapped back to the first endpoint.
    pub fn advance(&mut self) -> bool {
        self.cursor += 1;
        if self.cursor >= self.addrs.len() {
            self.cursor = 0;
            true
        } else {
            false
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

/// Uniform Fisher-Yates shuffle, randomizing the order endpoints are tried
/// in when `DeterministicConnOrder` is off. One RNG instance is reused
/// across the whole pass rather than reseeded per swap.
fn shuffle(addrs: &mut [SocketAddr]) {
    let mut r = rng();
    for i in (1..addrs.len()).rev() {
        let j = r.random_range(0..=i);
        addrs.swap(i, j);
    }
}
