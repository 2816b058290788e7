// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plant migration program and deadline handling.

use crate::prelude::*;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn mover_program_walks_the_migration_in_order() {
    let mut rig = Rig::new();
    rig.announce_mover().await;
    rig.bus.clear_publishes();

    rig.autonomy.tick().await; // queue the four-step program

    let job = rig.autonomy.queue().head().unwrap();
    let program: Vec<(i64, i64)> = job
        .steps()
        .iter()
        .map(|s| (s.data["from"].as_i64().unwrap(), s.data["to"].as_i64().unwrap()))
        .collect();
    assert_eq!(program, vec![(8, 12), (7, 11), (6, 10), (5, 9)]);
    for step in job.steps() {
        assert_eq!(step.data["command"], json!("goto"));
        assert_eq!(step.deadline, Duration::from_secs(240));
    }

    // each step advances only when the receipt reports the target stage
    for (published, to) in [(1, 12), (2, 11), (3, 10), (4, 9)] {
        rig.autonomy.tick().await; // publish
        assert_eq!(rig.sent_to(MOVER_COMMAND).len(), published);

        // a receipt for the wrong stage confirms nothing
        rig.deliver(MOVER_RECEIPT, r#"{"stage": 99}"#).await;
        rig.autonomy.tick().await;
        assert_eq!(rig.sent_to(MOVER_COMMAND).len(), published);

        rig.deliver(MOVER_RECEIPT, &format!(r#"{{"stage": {to}}}"#)).await;
        rig.autonomy.tick().await; // confirm + advance
    }

    rig.autonomy.tick().await; // all steps done
    rig.autonomy.tick().await; // job removed
    assert!(rig.autonomy.queue().is_empty());
    assert_eq!(rig.sent_to(MOVER_COMMAND).len(), 4);
}

#[tokio::test(start_paused = true)]
async fn unanswered_step_kills_its_job_at_the_deadline() {
    let mut rig = Rig::new();
    rig.announce_mover().await;

    let step = Step::new(
        MOVER_COMMAND,
        match json!({"command": "goto", "from": 5, "to": 9}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        },
        &rig.clock,
    )
    .with_deadline(Duration::from_secs(5));
    rig.autonomy.add_job(vec![step]);

    rig.autonomy.tick().await; // promote
    rig.autonomy.tick().await; // publish

    // six seconds pass with no receipt
    rig.clock.advance(Duration::from_secs(6));
    rig.autonomy.tick().await;
    assert_eq!(
        rig.autonomy.queue().head().unwrap().state,
        hp_core::JobState::Killed
    );

    rig.autonomy.tick().await; // removed on the subsequent tick
    assert!(rig.autonomy.queue().iter().all(|j| j.state != hp_core::JobState::Killed));
}
