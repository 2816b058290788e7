// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for scenario specs.

pub use hp_adapters::{BusMessage, FakeBusAdapter};
pub use hp_core::{FakeClock, Step, Topology};
pub use hp_engine::{Autonomy, AutonomyConfig, Outbound, RestorePolicy, Router};
pub use hp_storage::{MemoryStateStore, StateStore};
pub use serde_json::json;

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

pub const LED_ID: &str = "floor_1/stage_1/climate_node/LED";
pub const LED_COMMAND: &str = "hydroplant/command/floor_1/stage_1/climate_node/LED";
pub const LED_RECEIPT: &str = "hydroplant/command/floor_1/stage_1/climate_node/LED/receipt";
pub const LED_GUI: &str = "hydroplant/gui_command/floor_1/stage_1/climate_node/LED";

pub const MOVER_COMMAND: &str = "hydroplant/command/floor_1/plant_mover_node/plant_mover";
pub const MOVER_RECEIPT: &str =
    "hydroplant/command/floor_1/plant_mover_node/plant_mover/receipt";

/// A fully wired controller split open for inspection: the router and the
/// scheduler share one topology and one autonomy switch, exactly as
/// `Controller::new` wires them.
pub struct Rig {
    pub bus: FakeBusAdapter,
    pub clock: FakeClock,
    pub store: MemoryStateStore,
    pub topology: Arc<Mutex<Topology>>,
    pub autonomy: Autonomy<FakeBusAdapter, FakeClock>,
    pub router: Router<FakeBusAdapter, MemoryStateStore>,
    _inbound: mpsc::Receiver<BusMessage>,
}

impl Rig {
    pub fn new() -> Self {
        let (bus, inbound) = FakeBusAdapter::channel();
        let clock = FakeClock::new();
        clock.set_hour(10);
        let store = MemoryStateStore::new();
        let topology = Arc::new(Mutex::new(Topology::standard()));

        let autonomy = Autonomy::new(
            Outbound::new(bus.clone()),
            topology.clone(),
            clock.clone(),
            AutonomyConfig::default(),
        );
        let router = Router::new(
            bus.clone(),
            Outbound::new(bus.clone()),
            topology.clone(),
            store.clone(),
            autonomy.switch(),
            RestorePolicy::default(),
        );

        Rig { bus, clock, store, topology, autonomy, router, _inbound: inbound }
    }

    /// Deliver one inbound bus message to the router.
    pub async fn deliver(&self, topic: &str, body: &str) {
        self.router.on_message(BusMessage::new(topic, body.as_bytes())).await;
    }

    /// Announce the climate node with one LED on floor 1, stage 1.
    pub async fn announce_led(&self) {
        self.deliver(
            "hydroplant/device",
            r#"{"device_id": "climate_node", "floor_1": {"stage_1": {"actuators": ["LED"]}}}"#,
        )
        .await;
    }

    /// Announce the plant mover logic controller on floor 1.
    pub async fn announce_mover(&self) {
        self.deliver(
            "hydroplant/device",
            r#"{"device_id": "plant_mover_node", "floor_1": {"logic_controllers": ["plant_mover"]}}"#,
        )
        .await;
    }

    /// Bodies published to one topic, parsed.
    pub fn sent_to(&self, topic: &str) -> Vec<serde_json::Value> {
        self.bus
            .published_to(topic)
            .iter()
            .map(|body| serde_json::from_str(body).unwrap_or(serde_json::Value::Null))
            .collect()
    }
}
