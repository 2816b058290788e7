// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authoritative model of the installation.
//!
//! Floors and stages are fixed at construction; entities come and go with
//! device announcements and disconnect notices. All lookups key off the
//! entity unique id.

use crate::entity::{Entity, EntityError};
use crate::payload::Payload;
use crate::topic::{self, TopicError};
use indexmap::IndexMap;
use serde_json::Value;
use smol_str::SmolStr;
use thiserror::Error;

/// Errors from topology mutation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("unknown floor: {0}")]
    UnknownFloor(String),
    #[error("unknown stage: {0}")]
    UnknownStage(String),
    #[error("announcement has no device_id")]
    MissingDeviceId,
    #[error("announcement for {0} names no floor")]
    AnnouncementWithoutFloor(String),
    #[error(transparent)]
    Entity(#[from] EntityError),
}

/// A stage within a floor; owns the actuators bound to it.
#[derive(Debug, Default, Clone)]
pub struct Stage {
    pub name: SmolStr,
    actuators: Vec<Entity>,
}

impl Stage {
    pub fn new(name: &str) -> Self {
        Self { name: SmolStr::new(name), actuators: Vec::new() }
    }

    pub fn actuators(&self) -> &[Entity] {
        &self.actuators
    }
}

/// A floor; owns its stages and the logic controllers bound to it.
#[derive(Debug, Default, Clone)]
pub struct Floor {
    pub name: SmolStr,
    stages: Vec<Stage>,
    logic_controllers: Vec<Entity>,
}

impl Floor {
    pub fn new(name: &str, stage_names: &[&str]) -> Self {
        Self {
            name: SmolStr::new(name),
            stages: stage_names.iter().map(|s| Stage::new(s)).collect(),
            logic_controllers: Vec::new(),
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn logic_controllers(&self) -> &[Entity] {
        &self.logic_controllers
    }

    fn stage_by_name_mut(&mut self, name: &str) -> Option<&mut Stage> {
        self.stages.iter_mut().find(|s| s.name == name)
    }
}

/// One entity added by an announcement, with the topics to subscribe to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedEntity {
    pub unique_id: SmolStr,
    pub topics: [String; 2],
}

/// A parsed device announcement.
///
/// Shape on the wire:
/// `{ "device_id": <node>, "floor_X": { "logic_controllers": [..]?,
///   "stage_Y": { "actuators": [..]?, "sensors": [..]? }?, .. } }`
///
/// An announcement always targets exactly one floor. The `gui` device
/// announces no topology at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub node_id: SmolStr,
    pub floor: SmolStr,
    pub logic_controllers: Vec<SmolStr>,
    /// Stage name → actuator part ids. Sensors are ignored.
    pub stages: Vec<(SmolStr, Vec<SmolStr>)>,
}

impl Announcement {
    pub fn parse(payload: &Payload) -> Result<Self, TopologyError> {
        let node_id = payload
            .get("device_id")
            .and_then(Value::as_str)
            .ok_or(TopologyError::MissingDeviceId)?;

        if node_id == "gui" {
            return Ok(Self {
                node_id: SmolStr::new(node_id),
                floor: SmolStr::default(),
                logic_controllers: Vec::new(),
                stages: Vec::new(),
            });
        }

        let (floor, body) = payload
            .iter()
            .find(|(key, _)| key.starts_with("floor"))
            .ok_or_else(|| TopologyError::AnnouncementWithoutFloor(node_id.to_string()))?;

        let empty = Payload::new();
        let body = body.as_object().unwrap_or(&empty);

        let logic_controllers = str_list(body.get("logic_controllers"));

        let mut stages = Vec::new();
        for (key, value) in body {
            if !key.starts_with("stage") {
                continue;
            }
            let stage_body = value.as_object().unwrap_or(&empty);
            stages.push((SmolStr::new(key), str_list(stage_body.get("actuators"))));
        }

        Ok(Self {
            node_id: SmolStr::new(node_id),
            floor: SmolStr::new(floor),
            logic_controllers,
            stages,
        })
    }

    pub fn is_gui(&self) -> bool {
        self.node_id == "gui"
    }
}

fn str_list(value: Option<&Value>) -> Vec<SmolStr> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(SmolStr::new).collect())
        .unwrap_or_default()
}

/// Tree of Floors → Stages → Entities.
#[derive(Debug, Default, Clone)]
pub struct Topology {
    floors: Vec<Floor>,
}

impl Topology {
    pub fn new(floors: Vec<Floor>) -> Self {
        Self { floors }
    }

    /// The fixed installation: three floors of three stages each.
    pub fn standard() -> Self {
        let stages = ["stage_1", "stage_2", "stage_3"];
        Self::new(vec![
            Floor::new("floor_1", &stages),
            Floor::new("floor_2", &stages),
            Floor::new("floor_3", &stages),
        ])
    }

    pub fn floors(&self) -> &[Floor] {
        &self.floors
    }

    fn floor_by_name_mut(&mut self, name: &str) -> Option<&mut Floor> {
        self.floors.iter_mut().find(|f| f.name == name)
    }

    /// Attach a logic controller to the floor named in its unique id.
    ///
    /// Returns `None` if an entity with that unique id already exists.
    pub fn add_logic_controller(
        &mut self,
        unique_id: &str,
    ) -> Result<Option<AddedEntity>, TopologyError> {
        if self.find_by_unique_id(unique_id).is_some() {
            return Ok(None);
        }
        let entity = Entity::new(unique_id)?;
        let floor = self
            .floor_by_name_mut(entity.floor.as_str())
            .ok_or_else(|| TopologyError::UnknownFloor(entity.floor.to_string()))?;
        let added =
            AddedEntity { unique_id: entity.unique_id.clone(), topics: entity.subscribe_topics() };
        floor.logic_controllers.push(entity);
        Ok(Some(added))
    }

    /// Attach an actuator to the stage named in its unique id.
    ///
    /// Returns `None` if an entity with that unique id already exists.
    pub fn add_actuator(&mut self, unique_id: &str) -> Result<Option<AddedEntity>, TopologyError> {
        if self.find_by_unique_id(unique_id).is_some() {
            return Ok(None);
        }
        let entity = Entity::new(unique_id)?;
        let floor = self
            .floor_by_name_mut(entity.floor.as_str())
            .ok_or_else(|| TopologyError::UnknownFloor(entity.floor.to_string()))?;
        let stage = floor
            .stage_by_name_mut(entity.stage.as_str())
            .ok_or_else(|| TopologyError::UnknownStage(entity.stage.to_string()))?;
        let added =
            AddedEntity { unique_id: entity.unique_id.clone(), topics: entity.subscribe_topics() };
        stage.actuators.push(entity);
        Ok(Some(added))
    }

    /// Create every entity a parsed announcement lists.
    ///
    /// Re-announced entities are skipped, so applying the same announcement
    /// twice leaves the topology unchanged.
    pub fn apply_announcement(
        &mut self,
        ann: &Announcement,
    ) -> Result<Vec<AddedEntity>, TopologyError> {
        let mut added = Vec::new();

        for part in &ann.logic_controllers {
            let unique_id = format!("{}/{}/{}", ann.floor, ann.node_id, part);
            if let Some(entity) = self.add_logic_controller(&unique_id)? {
                added.push(entity);
            }
        }

        for (stage, actuators) in &ann.stages {
            for part in actuators {
                let unique_id = format!("{}/{}/{}/{}", ann.floor, stage, ann.node_id, part);
                if let Some(entity) = self.add_actuator(&unique_id)? {
                    added.push(entity);
                }
            }
        }

        Ok(added)
    }

    /// Remove every entity announced by `node_id`, optionally restricted to
    /// one floor. Returns the bus topics that should be unsubscribed.
    pub fn remove_by_node(&mut self, node_id: &str, floor_name: Option<&str>) -> Vec<String> {
        let mut topics = Vec::new();

        for floor in &mut self.floors {
            if floor_name.is_some_and(|name| floor.name != name) {
                continue;
            }

            // collect before removing so one sweep catches every match
            for lc in floor.logic_controllers.iter().filter(|e| e.node == node_id) {
                topics.extend(lc.subscribe_topics());
            }
            floor.logic_controllers.retain(|e| e.node != node_id);

            for stage in &mut floor.stages {
                for actuator in stage.actuators.iter().filter(|e| e.node == node_id) {
                    topics.extend(actuator.subscribe_topics());
                }
                stage.actuators.retain(|e| e.node != node_id);
            }
        }

        topics
    }

    pub fn find_by_unique_id(&self, unique_id: &str) -> Option<&Entity> {
        self.entities().find(|e| e.unique_id == unique_id)
    }

    pub fn find_by_unique_id_mut(&mut self, unique_id: &str) -> Option<&mut Entity> {
        self.floors
            .iter_mut()
            .flat_map(|floor| {
                floor.logic_controllers.iter_mut().chain(
                    floor.stages.iter_mut().flat_map(|stage| stage.actuators.iter_mut()),
                )
            })
            .find(|e| e.unique_id == unique_id)
    }

    /// Resolve an entity from any of its topics; `/receipt` is stripped first.
    pub fn find_by_topic(&self, t: &str) -> Result<Option<&Entity>, TopicError> {
        let unique_id = topic::unique_id_of(topic::strip_receipt(t))?;
        Ok(self.find_by_unique_id(&unique_id))
    }

    pub fn find_by_topic_mut(&mut self, t: &str) -> Result<Option<&mut Entity>, TopicError> {
        let unique_id = topic::unique_id_of(topic::strip_receipt(t))?;
        Ok(self.find_by_unique_id_mut(&unique_id))
    }

    /// All actuators, floor by floor, stage by stage.
    pub fn actuators(&self) -> impl Iterator<Item = &Entity> {
        self.floors
            .iter()
            .flat_map(|floor| floor.stages.iter().flat_map(|stage| stage.actuators.iter()))
    }

    /// All logic controllers, floor by floor.
    pub fn logic_controllers(&self) -> impl Iterator<Item = &Entity> {
        self.floors.iter().flat_map(|floor| floor.logic_controllers.iter())
    }

    /// Every live entity. Logic controllers come before a floor's actuators.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.floors.iter().flat_map(|floor| {
            floor
                .logic_controllers
                .iter()
                .chain(floor.stages.iter().flat_map(|stage| stage.actuators.iter()))
        })
    }

    /// Every entity's gui_command topic, in topology order.
    pub fn gui_topics(&self) -> Vec<String> {
        self.entities().map(|e| e.gui_command.clone()).collect()
    }

    /// `gui_command → value` for the GUI sync snapshot, logic controllers
    /// included.
    pub fn gui_sync_snapshot(&self) -> IndexMap<String, Value> {
        let mut data = IndexMap::new();
        for actuator in self.actuators() {
            data.insert(actuator.gui_command.clone(), value_or_null(actuator));
        }
        for lc in self.logic_controllers() {
            data.insert(lc.gui_command.clone(), value_or_null(lc));
        }
        data
    }

    /// `unique_id → value` for persistence; actuators only.
    pub fn state_snapshot(&self) -> IndexMap<String, Value> {
        self.actuators().map(|e| (e.unique_id.to_string(), value_or_null(e))).collect()
    }
}

fn value_or_null(entity: &Entity) -> Value {
    entity.value.clone().unwrap_or(Value::Null)
}

#[cfg(test)]
#[path = "topology_tests.rs"]
mod tests;
