// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Announce, disconnect, and GUI interplay.

use crate::prelude::*;

#[tokio::test]
async fn disconnect_cleans_up_everything_the_node_announced() {
    let rig = Rig::new();
    rig.announce_led().await;
    assert!(rig.bus.subscriptions().contains(&LED_GUI.to_string()));
    rig.bus.clear_publishes();

    rig.deliver(
        "hydroplant/disconnected/devices",
        r#"{"device_id": "climate_node", "floor": "floor_1"}"#,
    )
    .await;

    // the topology forgot the node
    assert!(rig.topology.lock().find_by_unique_id(LED_ID).is_none());

    // both per-entity topics were unsubscribed
    let subs = rig.bus.subscriptions();
    assert!(!subs.contains(&LED_GUI.to_string()));
    assert!(!subs.contains(&LED_RECEIPT.to_string()));

    // and the GUI got a fresh view of the world
    let sync = rig.sent_to("hydroplant/gui/sync");
    assert_eq!(sync.len(), 1);
    let topics = rig.sent_to("hydroplant/gui/topics");
    assert_eq!(topics.len(), 1);
    assert!(!topics[0]["topics"].as_array().unwrap().iter().any(|t| t == LED_GUI));
}

#[tokio::test]
async fn gui_command_round_trips_through_a_receipt() {
    let rig = Rig::new();
    rig.announce_led().await;
    rig.bus.clear_publishes();

    rig.deliver(LED_GUI, r#"{"value": 1}"#).await;
    let sent = rig.sent_to(LED_COMMAND);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["value"], json!(1));

    rig.deliver(LED_RECEIPT, r#"{"value": 1}"#).await;

    // persisted for the next session and synced to the GUI
    assert_eq!(rig.store.load_all().unwrap()[LED_ID], json!(1));
    let sync = rig.sent_to("hydroplant/gui/sync");
    assert_eq!(sync.last().unwrap()[LED_GUI], json!(1));
}

#[tokio::test]
async fn every_live_entity_is_subscribed_and_only_those() {
    let rig = Rig::new();
    rig.announce_led().await;
    rig.announce_mover().await;

    let subs = rig.bus.subscriptions();
    assert!(subs.contains(&LED_GUI.to_string()));
    assert!(subs.contains(&LED_RECEIPT.to_string()));
    assert!(subs.contains(&"hydroplant/gui_command/floor_1/plant_mover_node/plant_mover".to_string()));
    assert!(subs.contains(&MOVER_RECEIPT.to_string()));

    rig.deliver("hydroplant/disconnected/devices", r#"{"device_id": "plant_mover_node"}"#).await;

    let subs = rig.bus.subscriptions();
    assert!(subs.contains(&LED_GUI.to_string()));
    assert!(!subs.contains(&MOVER_RECEIPT.to_string()));
}
