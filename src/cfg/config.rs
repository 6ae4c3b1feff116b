// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// Parameters governing how a session is established and maintained.
    pub session: SessionConfig,
    /// Optional credentials for the auth sub-protocol (SPEC_FULL.md §4.7).
    #[serde(default)]
    pub auth: Option<AuthConfig>,
    /// Implementation/runtime parameters that live outside the wire
    /// protocol.
    pub runtime: RuntimeConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
/// Session-establishment settings (endpoint set, requested timeout,
/// connection ordering).
pub struct SessionConfig {
    #[serde(rename = "ConnectString")]
    /// Comma-separated "host:port" list (SPEC_FULL.md §4.1).
    pub connect_string: String,

    #[serde(rename = "SessionTimeout", with = "serde_millis")]
    /// Requested session timeout, passed in the handshake and subject to
    /// server-side clamping.
    pub session_timeout: Duration,

    #[serde(default, rename = "DeterministicConnOrder")]
    /// When true, endpoints are tried in the order listed rather than
    /// shuffled (SPEC_FULL.md §4.1); tests and deployments pinning a
    /// canary host first want this.
    pub deterministic_conn_order: bool,

    #[serde(rename = "IoTimeout", with = "serde_millis")]
    /// Per-I/O-operation timeout enforced by the reactor (SPEC_FULL.md
    /// §5, `io_with_timeout`).
    pub io_timeout: Duration,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
/// Credentials supplied to the SETAUTH sub-protocol.
pub struct AuthConfig {
    #[serde(rename = "Scheme")]
    /// Auth scheme name (e.g. "digest").
    pub scheme: String,
    #[serde(rename = "Credential")]
    /// Scheme-specific credential string.
    pub credential: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
/// Runtime-only settings that do not map to wire-protocol fields.
pub struct RuntimeConfig {
    #[serde(rename = "LogLevel", default = "default_log_level")]
    /// `tracing_subscriber::EnvFilter` directive string, overridable by
    /// `RUST_LOG` at process start (`cfg::logger::init_logger`).
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let mut cfg: Config =
            serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants and normalizes derived fields.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(
            !self.session.connect_string.trim().is_empty(),
            "ConnectString must not be empty"
        );
        ensure!(
            self.session.session_timeout >= Duration::from_millis(1),
            "SessionTimeout must be positive"
        );
        ensure!(
            self.session.io_timeout >= Duration::from_millis(1),
            "IoTimeout must be positive"
        );
        if let Some(auth) = &self.auth {
            ensure!(!auth.scheme.trim().is_empty(), "auth Scheme must not be empty");
        }

        Ok(())
    }
}

/// Serde helpers for representing `Duration` as a number of milliseconds.
mod serde_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis().min(u64::MAX as u128) as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}
