// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Day/night lighting driven end to end.

use crate::prelude::*;

#[tokio::test(start_paused = true)]
async fn light_turns_on_at_ten_in_the_morning() {
    let mut rig = Rig::new();
    rig.announce_led().await;
    rig.bus.clear_publishes();
    rig.clock.set_hour(10);

    rig.autonomy.tick().await; // interval check queues one job
    rig.autonomy.tick().await; // its single step is published

    let sent = rig.sent_to(LED_COMMAND);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["value"], json!(1));
    assert_eq!(sent[0]["device_id"], json!("climate_node"));
    assert_eq!(sent[0]["id"], json!("LED"));
    assert_eq!(sent[0]["floor"], json!("floor_1"));
    assert_eq!(sent[0]["stage"], json!("stage_1"));

    // the receipt confirms the command and completes the job
    rig.deliver(LED_RECEIPT, r#"{"value": 1}"#).await;
    rig.autonomy.tick().await; // step confirms
    rig.autonomy.tick().await; // job done
    rig.autonomy.tick().await; // job removed
    assert!(rig.autonomy.queue().is_empty());
}

#[tokio::test(start_paused = true)]
async fn confirmed_light_is_not_commanded_again() {
    let mut rig = Rig::new();
    rig.announce_led().await;
    rig.clock.set_hour(10);

    rig.autonomy.tick().await;
    rig.autonomy.tick().await;
    rig.deliver(LED_RECEIPT, r#"{"value": 1}"#).await;
    rig.autonomy.tick().await;
    rig.autonomy.tick().await;
    rig.autonomy.tick().await;
    rig.bus.clear_publishes();

    // next interval pass at the same hour finds the value already set
    rig.clock.advance(AutonomyConfig::default().interval_check);
    rig.autonomy.tick().await;
    rig.autonomy.tick().await;

    assert!(rig.autonomy.queue().is_empty());
    assert!(rig.sent_to(LED_COMMAND).is_empty());
}

#[tokio::test(start_paused = true)]
async fn toggling_autonomy_stops_and_resumes_commands() {
    let mut rig = Rig::new();
    rig.announce_led().await;
    rig.bus.clear_publishes();

    rig.deliver("hydroplant/gui_command/autonomy", r#"{"value": 0}"#).await;
    rig.autonomy.tick().await;
    rig.autonomy.tick().await;
    assert!(rig.autonomy.queue().is_empty());
    assert!(rig.sent_to(LED_COMMAND).is_empty());

    rig.deliver("hydroplant/gui_command/autonomy", r#"{"value": 1}"#).await;
    rig.autonomy.tick().await;
    rig.autonomy.tick().await;
    assert_eq!(rig.sent_to(LED_COMMAND).len(), 1);
}
