// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use zk_client_rs::cfg::{cli::resolve_config_path, config::Config};

fn fixture_path() -> String {
    std::env::var("TEST_CONFIG_FIXTURE")
        .unwrap_or_else(|_| "tests/fixtures/config.yaml".into())
}

#[test]
fn loads_and_validates_the_fixture_config() {
    let path = resolve_config_path(&fixture_path()).expect("resolve fixture path");
    let cfg = Config::load_from_file(&path).expect("load config");

    assert_eq!(cfg.session.connect_string, "127.0.0.1:2181,127.0.0.1:2182");
    assert_eq!(cfg.session.session_timeout, Duration::from_millis(10_000));
    assert!(cfg.session.deterministic_conn_order);
    assert_eq!(cfg.session.io_timeout, Duration::from_millis(5_000));

    let auth = cfg.auth.expect("auth present in fixture");
    assert_eq!(auth.scheme, "digest");
    assert_eq!(auth.credential, "user:pass");

    assert_eq!(cfg.runtime.log_level, "debug");
}

#[test]
fn resolve_config_path_rejects_a_missing_file() {
    assert!(resolve_config_path("tests/fixtures/does-not-exist.yaml").is_err());
}
