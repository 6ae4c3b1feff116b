// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Watch dispatch (SPEC_FULL.md §4.6) and the optional, additive
//! `WatchRegistry` (§4.6A) that re-arms watches across a reconnect. The
//! core itself performs no watch bookkeeping — the registry is a strictly
//! opt-in layer above it.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use crate::proto::watcher_event::{KeeperState, WatcherEvent};

/// Invoked for every server-pushed event and every session state
/// transition. A single watcher per session, exactly as SPEC_FULL.md §4.6
/// describes ("a single user-supplied watcher function receives every
/// event").
pub trait Watcher: Send + Sync {
    fn handle(&self, event: &WatcherEvent);
}

impl<F> Watcher for F
where F: Fn(&WatcherEvent) + Send + Sync
{
    fn handle(&self, event: &WatcherEvent) {
        self(event)
    }
}

/// A watcher that drops every event; the default when the caller never
/// supplies one.
pub struct NullWatcher;

impl Watcher for NullWatcher {
    fn handle(&self, _event: &WatcherEvent) {}
}

pub fn session_event(watcher: &dyn Watcher, state: KeeperState) {
    watcher.handle(&WatcherEvent::session_event(state));
}

/// Which watch class a path was registered under, matching the three
/// watch-capable operations (SPEC_FULL.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WatchClass {
    Data,
    Exists,
    Children,
}

/// Tracks paths the caller armed a watch on, so they can be transparently
/// reissued after a reconnect (SPEC_FULL.md §4.6A). Strictly additive: a
/// `Session` built without one behaves exactly as the bookkeeping-free
/// core describes.
#[derive(Debug, Default)]
pub struct WatchRegistry {
    armed: Mutex<HashSet<(String, WatchClass)>>,
}

impl WatchRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record(&self, path: &str, class: WatchClass) {
        self.armed
            .lock()
            .expect("watch registry mutex poisoned")
            .insert((path.to_string(), class));
    }

    /// Clears any record for `path`/`class` (the watch fired, or was
    /// consumed by a one-shot `exists`/`get` that found nothing to watch).
    pub fn clear(&self, path: &str, class: WatchClass) {
        self.armed
            .lock()
            .expect("watch registry mutex poisoned")
            .remove(&(path.to_string(), class));
    }

    /// Snapshots every currently-armed `(path, class)` pair and clears the
    /// registry; the caller is expected to reissue a watch-only request for
    /// each before the registry accepts new entries (SPEC_FULL.md §4.6A).
    pub fn drain_for_rearm(&self) -> Vec<(String, WatchClass)> {
        let mut guard = self.armed.lock().expect("watch registry mutex poisoned");
        guard.drain().collect()
    }
}
