//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It owns the room registry, the lobby of connected sockets, and the
//! exercise store. Rooms live only in memory: each holds the shared buffer,
//! its solution, the role assignment, and the broadcast group of member
//! channels.
//!
//! INVARIANTS
//! ==========
//! - A room's group keys are exactly its mentor plus its students.
//! - The mentor is never in `students`.
//! - A room with neither mentor nor students is never left in the registry.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::frame::Frame;
use crate::services::canonical::{canonicalize, matches_solution};
use crate::services::exercise::ExerciseStore;

/// Session id issued to each websocket at upgrade time.
pub type ConnectionId = Uuid;

/// Outbound frame channel for one connection.
pub type ClientSender = mpsc::Sender<Frame>;

pub const DEFAULT_WS_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// ROLE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// First joiner. Observes, never edits.
    Mentor,
    Student,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mentor => "mentor",
            Self::Student => "student",
        }
    }
}

// =============================================================================
// ROOM
// =============================================================================

/// Live state for one exercise instance.
pub struct Room {
    /// Current shared code.
    pub buffer: String,
    /// Canonical form of the exercise solution. Fixed for the room's lifetime.
    solution: String,
    pub mentor: Option<ConnectionId>,
    pub students: HashSet<ConnectionId>,
    /// Broadcast group: member id -> outbound channel.
    pub group: HashMap<ConnectionId, ClientSender>,
}

impl Room {
    /// Empty-membership room whose buffer starts at `template`.
    #[must_use]
    pub fn new(template: impl Into<String>, solution: &str) -> Self {
        Self {
            buffer: template.into(),
            solution: canonicalize(solution),
            mentor: None,
            students: HashSet::new(),
            group: HashMap::new(),
        }
    }

    #[must_use]
    pub fn solution(&self) -> &str {
        &self.solution
    }

    /// Derived from the buffer on every call, so it can never go stale.
    #[must_use]
    pub fn solved(&self) -> bool {
        matches_solution(&self.buffer, &self.solution)
    }

    #[must_use]
    pub fn is_mentor(&self, connection_id: ConnectionId) -> bool {
        self.mentor == Some(connection_id)
    }

    #[must_use]
    pub fn is_member(&self, connection_id: ConnectionId) -> bool {
        self.is_mentor(connection_id) || self.students.contains(&connection_id)
    }

    #[must_use]
    pub fn role_of(&self, connection_id: ConnectionId) -> Option<Role> {
        if self.is_mentor(connection_id) {
            Some(Role::Mentor)
        } else if self.students.contains(&connection_id) {
            Some(Role::Student)
        } else {
            None
        }
    }

    /// No mentor and no students: the room must be dropped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mentor.is_none() && self.students.is_empty()
    }
}

// =============================================================================
// ROOM REGISTRY
// =============================================================================

/// Room id (exercise id) -> live room. Always accessed through the lock in
/// `AppState::rooms`.
///
/// `deletions` counts exercise deletions per id. A join that fetched its
/// exercise before a deletion sees the count move and must not build a room.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
    deletions: HashMap<String, u64>,
}

impl RoomRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-creating lookup.
    #[must_use]
    pub fn get(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn get_mut(&mut self, room_id: &str) -> Option<&mut Room> {
        self.rooms.get_mut(room_id)
    }

    #[must_use]
    pub fn contains(&self, room_id: &str) -> bool {
        self.get(room_id).is_some()
    }

    /// Insert `room` unless one already exists under `room_id`.
    /// Returns whether the room was inserted.
    pub fn insert_if_absent(&mut self, room_id: &str, room: Room) -> bool {
        if self.rooms.contains_key(room_id) {
            return false;
        }
        self.rooms.insert(room_id.to_owned(), room);
        true
    }

    /// Idempotent removal.
    pub fn delete(&mut self, room_id: &str) -> Option<Room> {
        self.rooms.remove(room_id)
    }

    /// Number of times the exercise behind `room_id` has been deleted.
    #[must_use]
    pub fn deletion_generation(&self, room_id: &str) -> u64 {
        self.deletions.get(room_id).copied().unwrap_or(0)
    }

    /// Record an exercise deletion, whether or not a room is live.
    pub fn mark_deleted(&mut self, room_id: &str) {
        *self.deletions.entry(room_id.to_owned()).or_insert(0) += 1;
    }

    /// Ids of every room where the connection holds a role.
    #[must_use]
    pub fn rooms_with_member(&self, connection_id: ConnectionId) -> Vec<String> {
        self.rooms
            .iter()
            .filter(|(_, room)| room.is_member(connection_id))
            .map(|(id, _)| id.clone())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Copy.
#[derive(Clone)]
pub struct AppState {
    /// One lock for every room: room events are handled one at a time.
    pub rooms: Arc<RwLock<RoomRegistry>>,
    /// Every connected websocket, regardless of room membership.
    pub ws_clients: Arc<RwLock<HashMap<ConnectionId, ClientSender>>>,
    pub exercises: Arc<dyn ExerciseStore>,
    /// Capacity of each connection's outbound frame queue.
    pub channel_capacity: usize,
}

impl AppState {
    #[must_use]
    pub fn new(exercises: Arc<dyn ExerciseStore>, channel_capacity: usize) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(RoomRegistry::new())),
            ws_clients: Arc::new(RwLock::new(HashMap::new())),
            exercises,
            channel_capacity,
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
#[path = "state_helpers_test.rs"]
pub mod test_helpers;

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
