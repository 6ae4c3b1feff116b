// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use tracing::info;
use zk_client_rs::{
    acl::Acl,
    cfg::{cli::resolve_config_path, config::Config, logger::init_logger},
    client::{
        session::Session,
        watch::{Watcher, WatchRegistry},
    },
    proto::watcher_event::WatcherEvent,
    types::CreateMode,
};

struct LoggingWatcher;

impl Watcher for LoggingWatcher {
    fn handle(&self, event: &WatcherEvent) {
        info!(?event, "watch/session event");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = resolve_config_path("config.yaml")
        .and_then(Config::load_from_file)
        .context("failed to resolve or load config")?;

    init_logger(&cfg.runtime.log_level)?;

    let watch_registry = WatchRegistry::new();
    let session = Session::connect(
        &cfg.session.connect_string,
        cfg.session.deterministic_conn_order,
        cfg.session.session_timeout,
        cfg.session.io_timeout,
        Arc::new(LoggingWatcher),
        Some(watch_registry),
    )
    .await
    .context("failed to establish session")?;
    info!(state = ?session.state(), "session established");

    if let Some(auth) = &cfg.auth {
        session
            .add_auth(auth.scheme.clone(), auth.credential.clone().into_bytes().into())
            .await?;
    }

    let path = "/zk-client-rs-demo";
    let created = session
        .create(path, b"hello", &Acl::open_unsafe(), CreateMode::EPHEMERAL)
        .await
        .context("create failed")?;
    info!(created, "node created");

    let (data, stat) = session.get(&created, true).await.context("get failed")?;
    info!(bytes = data.len(), version = stat.version, "node data fetched");

    let children = session.get_children("/", false).await.context("get_children failed")?;
    info!(count = children.len(), "root children listed");

    tokio::time::sleep(Duration::from_secs(2)).await;

    session.delete(&created, stat.version).await.context("delete failed")?;
    info!("node deleted");

    session.close();
    Ok(())
}
