// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plant placement helpers.
//!
//! The plant-information node reports stage occupancy as
//! `{ "<stage>": { "<place>": ready?, ..., "max_places": n }, ... }` where a
//! true flag marks a plant holder that should change stage. The movement
//! check consults this before dispatching the mover.

use hp_core::payload::is_truthy;
use serde_json::{Map, Value};

/// Key carrying the stage capacity rather than a place flag.
const MAX_PLACES: &str = "max_places";

/// True if any place in any stage is flagged ready to move.
pub fn has_ready_to_move(places: &Map<String, Value>) -> bool {
    places.values().filter_map(Value::as_object).any(|stage| {
        stage.iter().any(|(place, ready)| place != MAX_PLACES && is_truthy(ready))
    })
}

#[cfg(test)]
#[path = "placement_tests.rs"]
mod tests;
