// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One logical device endpoint.
//!
//! An entity is either an actuator (bound to a stage) or a logic controller
//! (bound directly to a floor). Behavior differences are keyed off the
//! `EntityKind` tag; there is no type hierarchy.

use crate::payload::{value_of, Payload};
use crate::topic::{self, TopicError};
use serde_json::Value;
use smol_str::SmolStr;
use thiserror::Error;

/// Closed set of part kinds, derived from the part id of a unique id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    PlantMover,
    PlantInformation,
    WaterController,
    Led,
    Stepper,
    WaterPump,
    WaterPumpNut,
    Valve,
    ValveFlush,
    Npk,
    NutritionController,
    PhRegulator,
    EcRegulator,
    WaterCirc,
}

crate::simple_display! {
    EntityKind {
        PlantMover => "plant_mover",
        PlantInformation => "plant_information",
        WaterController => "water_controller",
        Led => "LED",
        Stepper => "stepper",
        WaterPump => "water_pump",
        WaterPumpNut => "water_pump_nut",
        Valve => "valve",
        ValveFlush => "valve_flush",
        Npk => "NPK",
        NutritionController => "nutrition_controller",
        PhRegulator => "ph_regulator",
        EcRegulator => "ec_regulator",
        WaterCirc => "water_circ",
    }
}

impl EntityKind {
    /// Derive the kind from a part id, case-insensitively.
    pub fn from_part(part: &str) -> Result<Self, EntityError> {
        match part.to_ascii_uppercase().as_str() {
            "PLANT_MOVER" => Ok(Self::PlantMover),
            "PLANT_INFORMATION" => Ok(Self::PlantInformation),
            "WATER_CONTROLLER" => Ok(Self::WaterController),
            "LED" => Ok(Self::Led),
            "STEPPER" => Ok(Self::Stepper),
            "WATER_PUMP" => Ok(Self::WaterPump),
            "WATER_PUMP_NUT" => Ok(Self::WaterPumpNut),
            "VALVE" => Ok(Self::Valve),
            "VALVE_FLUSH" => Ok(Self::ValveFlush),
            "NPK" => Ok(Self::Npk),
            "NUTRITION_CONTROLLER" => Ok(Self::NutritionController),
            "PH_REGULATOR" => Ok(Self::PhRegulator),
            "EC_REGULATOR" => Ok(Self::EcRegulator),
            "WATER_CIRC" => Ok(Self::WaterCirc),
            _ => Err(EntityError::UnknownKind(part.to_string())),
        }
    }
}

/// Where the entity hangs in the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRole {
    /// Bound to a stage.
    Actuator,
    /// Bound directly to a floor; has no stage segment.
    LogicController,
}

/// Errors from entity construction
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntityError {
    #[error("unknown part kind: {0}")]
    UnknownKind(String),
    #[error(transparent)]
    Topic(#[from] TopicError),
}

/// One actuator or logic-controller endpoint.
#[derive(Debug, Clone)]
pub struct Entity {
    /// `floor_X/[stage_Y/]node_id/part_id`
    pub unique_id: SmolStr,
    pub kind: EntityKind,
    pub role: EntityRole,

    /// `hydroplant/command/<unique_id>`
    pub command: String,
    /// `hydroplant/command/<unique_id>/receipt`
    pub receipt: String,
    /// `hydroplant/gui_command/<unique_id>`
    pub gui_command: String,

    pub floor: SmolStr,
    /// Empty for logic controllers.
    pub stage: SmolStr,
    pub node: SmolStr,
    pub part: SmolStr,

    /// Last full payload observed on the receipt topic.
    pub data: Payload,
    /// The payload's `value` field, if it carried one.
    pub value: Option<Value>,
}

impl Entity {
    pub fn new(unique_id: &str) -> Result<Self, EntityError> {
        let floor = topic::floor_of(unique_id)
            .ok_or_else(|| TopicError::MissingFloor(unique_id.to_string()))?;
        let stage = topic::stage_of(unique_id).unwrap_or("");
        let node = topic::node_of(unique_id);
        let part = topic::part_of(unique_id);

        let kind = EntityKind::from_part(part)?;
        let role = if stage.is_empty() {
            EntityRole::LogicController
        } else {
            EntityRole::Actuator
        };

        let command = format!("{}{unique_id}", topic::COMMAND_PREFIX);
        let receipt = format!("{command}{}", topic::RECEIPT_SUFFIX);
        let gui_command = format!("{}{unique_id}", topic::GUI_COMMAND_PREFIX);

        Ok(Self {
            unique_id: SmolStr::new(unique_id),
            kind,
            role,
            command,
            receipt,
            gui_command,
            floor: SmolStr::new(floor),
            stage: SmolStr::new(stage),
            node: SmolStr::new(node),
            part: SmolStr::new(part),
            data: Payload::new(),
            value: None,
        })
    }

    /// Build the command topic and payload for this entity.
    ///
    /// The addressing fields overwrite any same-named keys in `kwargs`;
    /// `stage` is the empty string for logic controllers.
    pub fn build_command(&self, kwargs: Payload) -> (String, Payload) {
        let mut payload = kwargs;
        payload.insert("device_id".into(), Value::String(self.node.to_string()));
        payload.insert("id".into(), Value::String(self.part.to_string()));
        payload.insert("floor".into(), Value::String(self.floor.to_string()));
        payload.insert("stage".into(), Value::String(self.stage.to_string()));
        (self.command.clone(), payload)
    }

    /// Store an observed payload and refresh the convenience value.
    pub fn set_data(&mut self, data: Payload) {
        self.value = value_of(&data).cloned();
        self.data = data;
    }

    /// Topics the controller subscribes to on behalf of this entity.
    pub fn subscribe_topics(&self) -> [String; 2] {
        [self.gui_command.clone(), self.receipt.clone()]
    }

    pub fn matches_kind(&self, kind: EntityKind) -> bool {
        self.kind == kind
    }
}

#[cfg(test)]
#[path = "entity_tests.rs"]
mod tests;
