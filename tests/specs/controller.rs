// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Full controller wiring: bus worker plus autonomy loop.

use crate::prelude::*;
use hp_engine::{Controller, ControllerConfig};
use tokio_util::sync::CancellationToken;

#[tokio::test(start_paused = true)]
async fn controller_runs_subscribes_and_answers_probes() {
    let (bus, inbound) = FakeBusAdapter::channel();
    let store = MemoryStateStore::new();
    let controller =
        Controller::new(bus.clone(), store, FakeClock::new(), ControllerConfig::default());

    let cancel = CancellationToken::new();
    let run = tokio::spawn(controller.run(inbound, cancel.clone()));

    bus.inject("hydroplant/is_ready", "").await;
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;

    // startup beacon plus the probe answer
    assert_eq!(bus.published_to("hydroplant/ready").len(), 2);
    assert!(bus.subscriptions().contains(&"hydroplant/device".to_string()));

    cancel.cancel();
    run.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn controller_stops_when_the_inbound_channel_closes() {
    let (bus, _unused) = FakeBusAdapter::channel();
    let store = MemoryStateStore::new();
    let controller =
        Controller::new(bus, store, FakeClock::new(), ControllerConfig::default());

    // the transport owns the sending half; here it goes away immediately
    let (tx, rx) = tokio::sync::mpsc::channel::<BusMessage>(8);
    let cancel = CancellationToken::new();
    let run = tokio::spawn(controller.run(rx, cancel.clone()));

    drop(tx);
    run.await.unwrap();
    assert!(cancel.is_cancelled());
}
