// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound message router.
//!
//! Owns the bus subscription set and the topology mutations that follow
//! from announcements, receipts, and disconnects. Every handler is fallible
//! in isolation: one bad message is logged and dropped, the bus worker
//! never stops.

use crate::outbound::Outbound;
use crate::scheduler::AutonomySwitch;
use hp_adapters::{BusAdapter, BusMessage};
use hp_core::payload::{is_truthy, parse_lossy, value_of, Payload};
use hp_core::topic::{
    self, classify, TopicKind, AUTONOMY_TOPIC, DEVICES_DISCONNECT_TOPIC, DEVICE_TOPIC, GUI_TOPICS,
    IS_READY_TOPIC, LOG_TOPIC, READY_TOPIC, SYNC_TOPIC,
};
use hp_core::topology::AddedEntity;
use hp_core::{Announcement, Topology, TopologyError};
use hp_storage::StateStore;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

/// What to republish for an entity that reappears with persisted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestorePolicy {
    /// Leave reconnected devices alone.
    Off,
    /// Drive reconnected devices to a known-safe zero.
    #[default]
    Zero,
    /// Republish the last persisted value.
    Last,
}

/// Errors from inbound message handling
#[derive(Debug, Error)]
pub enum RouterError {
    #[error(transparent)]
    Topic(#[from] topic::TopicError),
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error("no entity for topic: {0}")]
    UnknownEntity(String),
    #[error("payload missing field: {0}")]
    MissingField(&'static str),
}

pub struct Router<B, S> {
    bus: B,
    outbound: Outbound<B>,
    topology: Arc<Mutex<Topology>>,
    store: S,
    switch: AutonomySwitch,
    restore: RestorePolicy,
}

impl<B: BusAdapter, S: StateStore> Router<B, S> {
    pub fn new(
        bus: B,
        outbound: Outbound<B>,
        topology: Arc<Mutex<Topology>>,
        store: S,
        switch: AutonomySwitch,
        restore: RestorePolicy,
    ) -> Self {
        Self { bus, outbound, topology, store, switch, restore }
    }

    /// Subscribe the fixed control topics and announce ourselves.
    pub async fn connect(&self) {
        for t in
            [DEVICE_TOPIC, AUTONOMY_TOPIC, IS_READY_TOPIC, DEVICES_DISCONNECT_TOPIC, LOG_TOPIC]
        {
            if let Err(e) = self.bus.subscribe(t).await {
                tracing::error!(topic = t, error = %e, "subscribe failed");
            }
        }

        // nodes listen for this so they can present themselves
        // if they are already running
        self.outbound.publish_raw(READY_TOPIC, "").await;
    }

    /// Dispatch one inbound message. Never fails outward.
    pub async fn on_message(&self, msg: BusMessage) {
        let payload = parse_lossy(&msg.body);
        tracing::debug!(topic = %msg.topic, "<-");

        let result = match classify(&msg.topic) {
            TopicKind::IsReady => self.handle_is_ready().await,
            TopicKind::DisconnectDevice => self.handle_disconnect(payload).await,
            TopicKind::DeviceAnnounce => self.handle_device(payload).await,
            TopicKind::AutonomyToggle => self.handle_autonomy_toggle(payload).await,
            TopicKind::GuiCommand => self.handle_gui_command(&msg.topic, payload).await,
            TopicKind::Receipt => self.handle_receipt(&msg.topic, payload).await,
            TopicKind::Log => self.handle_log(payload),
            // measurements are archived by the persistence pipeline; no
            // autonomy decision consumes them here
            TopicKind::Measurement => Ok(()),
            TopicKind::DisconnectMaster | TopicKind::Other => Ok(()),
        };

        if let Err(e) = result {
            match e {
                RouterError::UnknownEntity(_) => {
                    tracing::warn!(topic = %msg.topic, error = %e, "message dropped");
                }
                _ => tracing::error!(topic = %msg.topic, error = %e, "message dropped"),
            }
        }
    }

    /// A device probed for us; answer with the ready beacon.
    async fn handle_is_ready(&self) -> Result<(), RouterError> {
        self.outbound.publish_raw(READY_TOPIC, "").await;
        Ok(())
    }

    async fn handle_disconnect(&self, payload: Payload) -> Result<(), RouterError> {
        let node_id = payload
            .get("device_id")
            .and_then(Value::as_str)
            .ok_or(RouterError::MissingField("device_id"))?;
        let floor = payload.get("floor").and_then(Value::as_str);

        tracing::warn!(node = node_id, floor, "device disconnected");
        self.outbound.gui_log(1, &format!("{node_id} disconnected")).await;

        let topics = self.topology.lock().remove_by_node(node_id, floor);
        for t in &topics {
            if let Err(e) = self.bus.unsubscribe(t).await {
                tracing::error!(topic = t, error = %e, "unsubscribe failed");
            } else {
                tracing::info!(topic = t, "unsubscribed");
            }
        }

        self.publish_gui_state().await;
        Ok(())
    }

    /// A device presented itself; grow the topology and subscribe.
    async fn handle_device(&self, payload: Payload) -> Result<(), RouterError> {
        let ann = Announcement::parse(&payload)?;

        if ann.is_gui() {
            tracing::info!("GUI connected");
        } else {
            tracing::info!(node = %ann.node_id, floor = %ann.floor, "device announced");
            let added = self.topology.lock().apply_announcement(&ann)?;

            for entity in &added {
                for t in &entity.topics {
                    if let Err(e) = self.bus.subscribe(t).await {
                        tracing::error!(topic = t, error = %e, "subscribe failed");
                    } else {
                        tracing::info!(topic = t, "subscribed");
                    }
                }
            }

            self.restore_last_states(&added).await;
        }

        // the GUI relearns the world whenever anything connects
        self.publish_gui_state().await;
        Ok(())
    }

    /// Republish persisted state for entities that just reappeared.
    async fn restore_last_states(&self, added: &[AddedEntity]) {
        if self.restore == RestorePolicy::Off || added.is_empty() {
            return;
        }

        let states = match self.store.load_all() {
            Ok(states) => states,
            Err(e) => {
                tracing::warn!(error = %e, "state load failed, skipping restore");
                return;
            }
        };

        for entity in added {
            let unique_id = &entity.unique_id;
            let Some(previous) = states.get(unique_id.as_str()) else { continue };

            let value = match self.restore {
                RestorePolicy::Zero => json!(0),
                RestorePolicy::Last => previous.clone(),
                RestorePolicy::Off => return,
            };

            let command = {
                let topology = self.topology.lock();
                topology.find_by_unique_id(unique_id).map(|e| {
                    let mut kwargs = Payload::new();
                    kwargs.insert("value".to_string(), value);
                    e.build_command(kwargs)
                })
            };

            if let Some((t, data)) = command {
                tracing::info!(entity = %unique_id, policy = ?self.restore, "restoring state");
                self.outbound.publish(&t, data).await;
            }
        }
    }

    async fn handle_autonomy_toggle(&self, payload: Payload) -> Result<(), RouterError> {
        let enable = value_of(&payload).map(is_truthy).unwrap_or(false);
        self.switch.set(enable);

        if enable {
            tracing::info!("GUI turned autonomy on");
            self.outbound.gui_log(1, "Autonomy turned on").await;
        } else {
            tracing::warn!("GUI turned autonomy off");
            self.outbound.gui_log(1, "Autonomy turned off").await;
        }
        Ok(())
    }

    /// Forward a GUI command to the entity's command topic.
    async fn handle_gui_command(&self, t: &str, payload: Payload) -> Result<(), RouterError> {
        let command = {
            let topology = self.topology.lock();
            topology
                .find_by_topic(t)?
                .map(|e| e.build_command(payload))
                .ok_or_else(|| RouterError::UnknownEntity(t.to_string()))?
        };

        self.outbound.publish(&command.0, command.1).await;
        Ok(())
    }

    /// Apply a device receipt, persist the new state, and sync the GUI.
    async fn handle_receipt(&self, t: &str, payload: Payload) -> Result<(), RouterError> {
        let snapshots = {
            let mut topology = self.topology.lock();
            let entity = topology
                .find_by_topic_mut(t)?
                .ok_or_else(|| RouterError::UnknownEntity(t.to_string()))?;
            entity.set_data(payload);
            // e.g. the plant information node reporting max_stages
            let has_value = entity.value.is_some();
            has_value.then(|| (topology.state_snapshot(), topology.gui_sync_snapshot()))
        };

        let Some((state, sync)) = snapshots else { return Ok(()) };

        if let Err(e) = self.store.replace_all(&state) {
            tracing::warn!(error = %e, "state persistence failed, continuing in memory");
        }
        self.outbound.publish_json(SYNC_TOPIC, &sync).await;
        Ok(())
    }

    /// Bus-wide log sink: forward to the persistence archive.
    fn handle_log(&self, payload: Payload) -> Result<(), RouterError> {
        if let Err(e) = self.store.append_log(&Value::Object(payload)) {
            tracing::warn!(error = %e, "log archive failed");
        }
        Ok(())
    }

    /// Republish the GUI topic list and the sync snapshot.
    async fn publish_gui_state(&self) {
        let (topics, sync) = {
            let topology = self.topology.lock();
            (topology.gui_topics(), topology.gui_sync_snapshot())
        };

        self.outbound.publish_json(GUI_TOPICS, &json!({ "topics": topics })).await;
        self.outbound.publish_json(SYNC_TOPIC, &sync).await;
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
