// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Topic codec: parse and synthesize `/`-separated bus topics.
//!
//! All controller traffic lives under the `hydroplant/` prefix. Entity
//! topics embed a unique id of the form `floor_X/[stage_Y/]node_id/part_id`;
//! the functions here extract those segments without allocating where
//! possible.

use smol_str::SmolStr;
use thiserror::Error;

pub const PREFIX: &str = "hydroplant/";

// Inbound control topics
pub const DEVICE_TOPIC: &str = "hydroplant/device";
pub const AUTONOMY_TOPIC: &str = "hydroplant/gui_command/autonomy";
pub const IS_READY_TOPIC: &str = "hydroplant/is_ready";
pub const DEVICES_DISCONNECT_TOPIC: &str = "hydroplant/disconnected/devices";
pub const LOG_TOPIC: &str = "hydroplant/log";

// Outbound topics
pub const READY_TOPIC: &str = "hydroplant/ready";
pub const MASTER_DISCONNECT_TOPIC: &str = "hydroplant/disconnected/master_controller";
pub const GUI_TOPICS: &str = "hydroplant/gui/topics";
pub const SYNC_TOPIC: &str = "hydroplant/gui/sync";
pub const GUI_LOG_TOPIC: &str = "hydroplant/gui/log";

// Per-entity topic prefixes
pub const COMMAND_PREFIX: &str = "hydroplant/command/";
pub const GUI_COMMAND_PREFIX: &str = "hydroplant/gui_command/";
pub const MEASUREMENT_PREFIX: &str = "hydroplant/measurement/";

pub const RECEIPT_SUFFIX: &str = "/receipt";

/// Errors from topic parsing
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopicError {
    #[error("topic has no floor segment: {0}")]
    MissingFloor(String),
    #[error("topic truncated after floor segment: {0}")]
    Truncated(String),
}

/// Coarse classification of an inbound topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicKind {
    DeviceAnnounce,
    GuiCommand,
    AutonomyToggle,
    Receipt,
    Measurement,
    DisconnectDevice,
    DisconnectMaster,
    IsReady,
    Log,
    Other,
}

crate::simple_display! {
    TopicKind {
        DeviceAnnounce => "device_announce",
        GuiCommand => "gui_command",
        AutonomyToggle => "autonomy_toggle",
        Receipt => "receipt",
        Measurement => "measurement",
        DisconnectDevice => "disconnect_device",
        DisconnectMaster => "disconnect_master",
        IsReady => "is_ready",
        Log => "log",
        Other => "other",
    }
}

/// Classify a topic against the fixed control surface.
///
/// Exact matches are checked before prefix/suffix matches so
/// `gui_command/autonomy` is never mistaken for an entity command.
pub fn classify(topic: &str) -> TopicKind {
    match topic {
        DEVICE_TOPIC => TopicKind::DeviceAnnounce,
        AUTONOMY_TOPIC => TopicKind::AutonomyToggle,
        IS_READY_TOPIC => TopicKind::IsReady,
        DEVICES_DISCONNECT_TOPIC => TopicKind::DisconnectDevice,
        MASTER_DISCONNECT_TOPIC => TopicKind::DisconnectMaster,
        LOG_TOPIC => TopicKind::Log,
        t if is_receipt(t) => TopicKind::Receipt,
        t if t.starts_with(GUI_COMMAND_PREFIX) => TopicKind::GuiCommand,
        t if t.starts_with(MEASUREMENT_PREFIX) => TopicKind::Measurement,
        _ => TopicKind::Other,
    }
}

/// First segment beginning with `floor`, if any.
pub fn floor_of(topic: &str) -> Option<&str> {
    topic.split('/').find(|s| s.starts_with("floor"))
}

/// First segment beginning with `stage`, if any.
pub fn stage_of(topic: &str) -> Option<&str> {
    topic.split('/').find(|s| s.starts_with("stage"))
}

/// Second-to-last segment, usually the node id.
pub fn node_of(topic: &str) -> &str {
    let mut it = topic.rsplit('/');
    let last = it.next().unwrap_or(topic);
    it.next().unwrap_or(last)
}

/// Last segment, usually the part id.
pub fn part_of(topic: &str) -> &str {
    topic.rsplit('/').next().unwrap_or(topic)
}

/// True iff the topic ends with the receipt suffix.
pub fn is_receipt(topic: &str) -> bool {
    topic.ends_with(RECEIPT_SUFFIX)
}

/// Strip a trailing `/receipt`, if present.
pub fn strip_receipt(topic: &str) -> &str {
    topic.strip_suffix(RECEIPT_SUFFIX).unwrap_or(topic)
}

/// Extract the `floor/[stage/]node/part` unique id embedded in a topic.
///
/// Works on bare unique ids as well as prefixed topics such as
/// `hydroplant/command/floor_1/stage_1/climate_node/LED`.
pub fn unique_id_of(topic: &str) -> Result<SmolStr, TopicError> {
    let parts: Vec<&str> = topic.split('/').collect();

    let floor_index = parts
        .iter()
        .position(|s| s.starts_with("floor"))
        .ok_or_else(|| TopicError::MissingFloor(topic.to_string()))?;

    // logic controllers have no stage segment
    let offset = if stage_of(topic).is_some() { 2 } else { 1 };

    let end = floor_index + offset + 2;
    if parts.len() < end {
        return Err(TopicError::Truncated(topic.to_string()));
    }

    Ok(SmolStr::new(parts[floor_index..end].join("/")))
}

#[cfg(test)]
#[path = "topic_tests.rs"]
mod tests;
