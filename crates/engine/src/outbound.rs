// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound publisher shared by the router and the scheduler.
//!
//! Every payload is stripped of transport-only keys and serialized to JSON
//! text before it reaches the bus. Publish failures are logged and dropped;
//! retry is the transport's business.

use hp_adapters::BusAdapter;
use hp_core::payload::{strip_transport_keys, Payload};
use hp_core::topic::GUI_LOG_TOPIC;
use serde::Serialize;

/// device_id the controller signs its own GUI log lines with.
pub const MASTER_DEVICE_ID: &str = "master_controller";
/// Synthetic floor the controller reports from.
pub const MASTER_FLOOR: &str = "floor_100";

#[derive(Clone)]
pub struct Outbound<B> {
    bus: B,
}

impl<B: BusAdapter> Outbound<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Publish an entity payload, stripping transport-only keys first.
    pub async fn publish(&self, topic: &str, mut payload: Payload) {
        strip_transport_keys(&mut payload);
        let body = serde_json::to_string(&payload).unwrap_or_else(|_| "{}".to_string());
        self.send(topic, &body).await;
    }

    /// Publish any serializable snapshot (GUI topic lists, sync maps).
    pub async fn publish_json<T: Serialize + ?Sized>(&self, topic: &str, data: &T) {
        let body = serde_json::to_string(data).unwrap_or_else(|_| "{}".to_string());
        self.send(topic, &body).await;
    }

    /// Publish a pre-serialized body (the ready beacon is an empty string).
    pub async fn publish_raw(&self, topic: &str, body: &str) {
        self.send(topic, body).await;
    }

    /// Operator-visible log line on the GUI log topic.
    pub async fn gui_log(&self, level: u8, message: &str) {
        let line = serde_json::json!({
            "level": level,
            "message": message,
            "device_id": MASTER_DEVICE_ID,
            "floor": MASTER_FLOOR,
        });
        self.publish_json(GUI_LOG_TOPIC, &line).await;
    }

    async fn send(&self, topic: &str, body: &str) {
        tracing::debug!(%topic, %body, "->");
        if let Err(e) = self.bus.publish(topic, body).await {
            tracing::error!(%topic, error = %e, "publish failed");
        }
    }
}

#[cfg(test)]
#[path = "outbound_tests.rs"]
mod tests;
