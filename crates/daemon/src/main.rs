// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hpd: hydroplant master controller daemon.
//!
//! Boots logging, loads configuration, wires the controller together, and
//! runs until SIGINT. The broker transport is injected by the deployment
//! behind [`hp_adapters::BusAdapter`]; it owns the sending half of the
//! inbound channel and publishes the controller's last will on
//! `hydroplant/disconnected/master_controller`.

mod config;

use anyhow::Context;
use config::Config;
use hp_adapters::NoopBusAdapter;
use hp_core::SystemClock;
use hp_engine::Controller;
use hp_storage::DocumentStore;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    let log_dir = config.store.path.join("logs");
    std::fs::create_dir_all(&log_dir).context("creating log directory")?;
    let (file_writer, _guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, "hpd.log"));
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(file_writer.and(std::io::stderr))
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        broker = %format!("{}:{}", config.bus.host, config.bus.port),
        store = %config.store.path.display(),
        "hpd starting"
    );

    let store = DocumentStore::open(&config.store.path).context("opening state store")?;

    // no transport linked into this build: boot on the noop bus so the
    // controller and autonomy loop run and can be observed locally
    let bus = NoopBusAdapter::new();
    let (inbound_tx, inbound_rx) = mpsc::channel(64);

    let controller = Controller::new(bus, store, SystemClock, config.controller_config());
    let cancel = CancellationToken::new();
    let run = tokio::spawn(controller.run(inbound_rx, cancel.clone()));

    tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
    tracing::info!("shutdown signal received");
    cancel.cancel();
    drop(inbound_tx);
    run.await.context("joining controller task")?;

    Ok(())
}
