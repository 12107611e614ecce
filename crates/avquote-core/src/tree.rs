//! # Quote Tree
//!
//! A fully materialized quote: the header plus every room, system and line
//! item, as owned values.
//!
//! ## Shape
//! ```text
//! QuoteTree
//! ├── quote: Quote
//! └── rooms: Vec<RoomNode>
//!       ├── room: Room
//!       ├── systems: Vec<SystemNode>
//!       │     ├── system: System
//!       │     └── equipment: Vec<Equipment>
//!       ├── equipment: Vec<Equipment>      (loose, no system)
//!       ├── labor: Vec<Labor>
//!       └── services: Vec<Service>
//! ```
//!
//! Children are stored under their parent, and the editing methods force the
//! parent-id fields to match the node they are stored under. A line can
//! therefore never point at a room of another quote.
//!
//! Every editing method is a pure in-memory transformation. Persisting the
//! result (and recording a version) is the storage layer's job.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{Equipment, Labor, Quote, QuoteStatus, QuoteUpdate, Room, Service, System};
use crate::validation::{validate_line_quantity, validate_room_quantity};

// =============================================================================
// Nodes
// =============================================================================

/// A system and the equipment installed in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SystemNode {
    pub system: System,
    pub equipment: Vec<Equipment>,
}

impl SystemNode {
    pub fn new(system: System) -> Self {
        SystemNode {
            system,
            equipment: Vec::new(),
        }
    }
}

/// A room and everything it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RoomNode {
    pub room: Room,
    pub systems: Vec<SystemNode>,
    /// Equipment attached directly to the room.
    pub equipment: Vec<Equipment>,
    pub labor: Vec<Labor>,
    pub services: Vec<Service>,
}

impl RoomNode {
    pub fn new(room: Room) -> Self {
        RoomNode {
            room,
            systems: Vec::new(),
            equipment: Vec::new(),
            labor: Vec::new(),
            services: Vec::new(),
        }
    }

    /// Every equipment line in the room, system lines first.
    pub fn all_equipment(&self) -> impl Iterator<Item = &Equipment> {
        self.systems
            .iter()
            .flat_map(|s| s.equipment.iter())
            .chain(self.equipment.iter())
    }

    /// Whether the room has no systems and no line items.
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
            && self.equipment.is_empty()
            && self.labor.is_empty()
            && self.services.is_empty()
    }

    fn system_mut(&mut self, system_id: &str) -> Option<&mut SystemNode> {
        self.systems.iter_mut().find(|s| s.system.id == system_id)
    }

    /// Re-stamps every child's parent ids from this node.
    fn adopt_children(&mut self) {
        let room_id = self.room.id.clone();
        for node in &mut self.systems {
            node.system.room_id = room_id.clone();
            for line in &mut node.equipment {
                line.room_id = room_id.clone();
                line.system_id = Some(node.system.id.clone());
            }
        }
        for line in &mut self.equipment {
            line.room_id = room_id.clone();
            line.system_id = None;
        }
        for line in &mut self.labor {
            line.room_id = room_id.clone();
        }
        for line in &mut self.services {
            line.room_id = room_id.clone();
        }
    }
}

// =============================================================================
// Quote Tree
// =============================================================================

/// A quote with its full room/system/line tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuoteTree {
    pub quote: Quote,
    pub rooms: Vec<RoomNode>,
}

impl QuoteTree {
    /// A quote with no rooms.
    pub fn new(quote: Quote) -> Self {
        QuoteTree {
            quote,
            rooms: Vec::new(),
        }
    }

    /// Builds a tree from loaded rooms, re-stamping parent ids.
    pub fn from_parts(quote: Quote, rooms: Vec<RoomNode>) -> Self {
        let mut tree = QuoteTree { quote, rooms };
        tree.adopt_children();
        tree
    }

    /// The quote id.
    pub fn id(&self) -> &str {
        &self.quote.id
    }

    pub fn room(&self, room_id: &str) -> Option<&RoomNode> {
        self.rooms.iter().find(|r| r.room.id == room_id)
    }

    fn room_mut(&mut self, room_id: &str) -> CoreResult<&mut RoomNode> {
        self.rooms
            .iter_mut()
            .find(|r| r.room.id == room_id)
            .ok_or_else(|| CoreError::not_found("Room", room_id))
    }

    /// Every equipment line in the quote.
    pub fn all_equipment(&self) -> impl Iterator<Item = &Equipment> {
        self.rooms.iter().flat_map(|r| r.all_equipment())
    }

    pub(crate) fn adopt_children(&mut self) {
        let quote_id = self.quote.id.clone();
        for node in &mut self.rooms {
            node.room.quote_id = quote_id.clone();
            node.adopt_children();
        }
    }

    // -------------------------------------------------------------------------
    // Quote header
    // -------------------------------------------------------------------------

    /// Applies a partial header update.
    pub fn update_quote(&mut self, update: QuoteUpdate) {
        update.apply(&mut self.quote);
    }

    /// Sets the flat status field. Any status may follow any other.
    pub fn set_status(&mut self, status: QuoteStatus) {
        self.quote.status = status;
    }

    // -------------------------------------------------------------------------
    // Rooms
    // -------------------------------------------------------------------------

    /// Appends a room to the quote.
    pub fn add_room(&mut self, mut room: Room) -> CoreResult<&RoomNode> {
        validate_room_quantity(room.quantity)?;
        room.quote_id = self.quote.id.clone();
        self.rooms.push(RoomNode::new(room));
        Ok(&self.rooms[self.rooms.len() - 1])
    }

    /// Replaces a room's name and quantity, matched by id.
    pub fn update_room(&mut self, room: Room) -> CoreResult<()> {
        validate_room_quantity(room.quantity)?;
        let node = self.room_mut(&room.id)?;
        node.room.name = room.name;
        node.room.quantity = room.quantity;
        Ok(())
    }

    /// Removes a room with everything it owns.
    pub fn remove_room(&mut self, room_id: &str) -> CoreResult<RoomNode> {
        let idx = self
            .rooms
            .iter()
            .position(|r| r.room.id == room_id)
            .ok_or_else(|| CoreError::not_found("Room", room_id))?;
        Ok(self.rooms.remove(idx))
    }

    // -------------------------------------------------------------------------
    // Systems
    // -------------------------------------------------------------------------

    /// Adds a system to the room named by `system.room_id`.
    pub fn add_system(&mut self, system: System) -> CoreResult<()> {
        let node = self.room_mut(&system.room_id)?;
        node.systems.push(SystemNode::new(system));
        Ok(())
    }

    /// Replaces a system's name and description, matched by id.
    pub fn update_system(&mut self, system: System) -> CoreResult<()> {
        let node = self
            .rooms
            .iter_mut()
            .find_map(|r| r.system_mut(&system.id))
            .ok_or_else(|| CoreError::not_found("System", system.id.as_str()))?;
        node.system.name = system.name;
        node.system.description = system.description;
        Ok(())
    }

    /// Removes a system and its equipment.
    pub fn remove_system(&mut self, system_id: &str) -> CoreResult<SystemNode> {
        for room in &mut self.rooms {
            if let Some(idx) = room.systems.iter().position(|s| s.system.id == system_id) {
                return Ok(room.systems.remove(idx));
            }
        }
        Err(CoreError::not_found("System", system_id))
    }

    // -------------------------------------------------------------------------
    // Equipment
    // -------------------------------------------------------------------------

    /// Adds an equipment line.
    ///
    /// With a `system_id` the line goes into that system (its room id is
    /// taken from the system); without one it is attached to `room_id`.
    pub fn add_equipment(&mut self, mut line: Equipment) -> CoreResult<()> {
        validate_line_quantity(line.quantity)?;
        match line.system_id.clone() {
            Some(system_id) => {
                let room = self
                    .rooms
                    .iter_mut()
                    .find(|r| r.systems.iter().any(|s| s.system.id == system_id))
                    .ok_or_else(|| CoreError::not_found("System", system_id.as_str()))?;
                line.room_id = room.room.id.clone();
                if let Some(system) = room.system_mut(&system_id) {
                    system.equipment.push(line);
                }
            }
            None => {
                let room = self.room_mut(&line.room_id)?;
                room.equipment.push(line);
            }
        }
        Ok(())
    }

    /// Replaces an equipment line's values in place, matched by id. The
    /// line stays where it is.
    pub fn update_equipment(&mut self, line: Equipment) -> CoreResult<()> {
        validate_line_quantity(line.quantity)?;
        let existing = self
            .equipment_mut(&line.id)
            .ok_or_else(|| CoreError::not_found("Equipment", line.id.as_str()))?;
        let room_id = std::mem::take(&mut existing.room_id);
        let system_id = existing.system_id.take();
        *existing = Equipment {
            room_id,
            system_id,
            ..line
        };
        Ok(())
    }

    /// Removes an equipment line from wherever it lives.
    pub fn remove_equipment(&mut self, equipment_id: &str) -> CoreResult<Equipment> {
        for room in &mut self.rooms {
            if let Some(idx) = room.equipment.iter().position(|e| e.id == equipment_id) {
                return Ok(room.equipment.remove(idx));
            }
            for system in &mut room.systems {
                if let Some(idx) = system.equipment.iter().position(|e| e.id == equipment_id) {
                    return Ok(system.equipment.remove(idx));
                }
            }
        }
        Err(CoreError::not_found("Equipment", equipment_id))
    }

    fn equipment_mut(&mut self, equipment_id: &str) -> Option<&mut Equipment> {
        self.rooms.iter_mut().find_map(|room| {
            let RoomNode {
                systems, equipment, ..
            } = room;
            systems
                .iter_mut()
                .flat_map(|s| s.equipment.iter_mut())
                .chain(equipment.iter_mut())
                .find(|e| e.id == equipment_id)
        })
    }

    // -------------------------------------------------------------------------
    // Labor
    // -------------------------------------------------------------------------

    pub fn add_labor(&mut self, line: Labor) -> CoreResult<()> {
        self.room_mut(&line.room_id)?.labor.push(line);
        Ok(())
    }

    pub fn update_labor(&mut self, line: Labor) -> CoreResult<()> {
        let existing = self
            .rooms
            .iter_mut()
            .flat_map(|r| r.labor.iter_mut())
            .find(|l| l.id == line.id)
            .ok_or_else(|| CoreError::not_found("Labor", line.id.as_str()))?;
        let room_id = std::mem::take(&mut existing.room_id);
        *existing = Labor { room_id, ..line };
        Ok(())
    }

    pub fn remove_labor(&mut self, labor_id: &str) -> CoreResult<Labor> {
        for room in &mut self.rooms {
            if let Some(idx) = room.labor.iter().position(|l| l.id == labor_id) {
                return Ok(room.labor.remove(idx));
            }
        }
        Err(CoreError::not_found("Labor", labor_id))
    }

    // -------------------------------------------------------------------------
    // Services
    // -------------------------------------------------------------------------

    pub fn add_service(&mut self, line: Service) -> CoreResult<()> {
        self.room_mut(&line.room_id)?.services.push(line);
        Ok(())
    }

    pub fn update_service(&mut self, line: Service) -> CoreResult<()> {
        let existing = self
            .rooms
            .iter_mut()
            .flat_map(|r| r.services.iter_mut())
            .find(|s| s.id == line.id)
            .ok_or_else(|| CoreError::not_found("Service", line.id.as_str()))?;
        let room_id = std::mem::take(&mut existing.room_id);
        *existing = Service { room_id, ..line };
        Ok(())
    }

    pub fn remove_service(&mut self, service_id: &str) -> CoreResult<Service> {
        for room in &mut self.rooms {
            if let Some(idx) = room.services.iter().position(|s| s.id == service_id) {
                return Ok(room.services.remove(idx));
            }
        }
        Err(CoreError::not_found("Service", service_id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
