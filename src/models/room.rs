//! Room model.
//!
//! Rooms are bucketed by building category for distribution targets and are
//! either lab or lecture rooms. Lab sessions only use lab rooms and lecture
//! sessions only use lecture rooms.

use serde::{Deserialize, Serialize};

/// Room id used when no structurally valid room exists.
///
/// Never tracked and never counted as a conflict.
pub const PLACEHOLDER_ROOM: &str = "TBA";

/// A bookable room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    /// Unique room identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Building category used by department distribution tables.
    pub category: String,
    /// Seat count.
    pub capacity: u32,
    /// Whether this is a lab room.
    pub is_lab: bool,
}

impl Room {
    /// Creates a lecture room in the given building category.
    pub fn new(id: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            category: category.into(),
            capacity: 40,
            is_lab: false,
        }
    }

    /// Sets the room name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the seat count.
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    /// Marks the room as a lab.
    pub fn with_lab(mut self, is_lab: bool) -> Self {
        self.is_lab = is_lab;
        self
    }

    /// Whether a session with the given lab requirement may use this room.
    #[inline]
    pub fn suits(&self, requires_lab: bool) -> bool {
        self.is_lab == requires_lab
    }
}

/// Raw room row, as received from upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoomRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub capacity: Option<u32>,
    pub is_lab: Option<bool>,
    pub active: bool,
}

impl Default for RoomRecord {
    fn default() -> Self {
        Self {
            id: None,
            name: None,
            category: None,
            capacity: None,
            is_lab: None,
            active: true,
        }
    }
}
