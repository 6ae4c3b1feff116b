// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Logging init (SPEC_FULL.md §1 ambient stack): `tracing` +
//! `tracing-subscriber`, an `EnvFilter` built from the config's `LogLevel`
//! (or `RUST_LOG` if set) feeding a plain text `fmt` layer. No span-field
//! capture, no JSON formatter, no file rotation: this crate logs to
//! stdout/stderr only.

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt};

/// Installs the global `tracing` subscriber. `level` is an `EnvFilter`
/// directive string (e.g. "info", "zk_client_rs=debug"); `RUST_LOG`
/// overrides it when set.
pub fn init_logger(level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("failed to build EnvFilter from RUST_LOG or config level")?;

    fmt().with_env_filter(env_filter).with_target(true).try_init().map_err(|e| {
        anyhow::anyhow!("failed to install global tracing subscriber: {e}")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_plain_level_directive() {
        let filter = EnvFilter::try_new("debug");
        assert!(filter.is_ok());
    }

    #[test]
    fn accepts_a_target_scoped_directive() {
        let filter = EnvFilter::try_new("zk_client_rs=debug,warn");
        assert!(filter.is_ok());
    }
}
