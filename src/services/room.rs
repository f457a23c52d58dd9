//! Room service: lazy creation, role assignment, edits, and teardown.
//!
//! DESIGN
//! ======
//! Every handler holds the registry write lock for its whole critical
//! section and pushes outbound frames into member channels before releasing
//! it. Room events are therefore applied one at a time, `buffer` and the
//! derived solved flag are never observed out of step, and frames for a
//! room leave in the order they were emitted.
//!
//! Handlers send directly instead of returning an outcome to the websocket
//! layer: the send order inside the lock is what carries the ordering
//! guarantee.
//!
//! ERROR HANDLING
//! ==============
//! Stale room ids, unknown exercises, and callers without the right role
//! come back as `RoomError`. The websocket layer logs and drops them; the
//! offending client never hears about it.

use tokio::sync::RwLockWriteGuard;
use tracing::{debug, info};

use crate::frame::{self, Data, Frame};
use crate::services::canonical::matches_solution;
use crate::services::exercise::ExerciseError;
use crate::state::{AppState, ClientSender, ConnectionId, Role, Room, RoomRegistry};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("exercise not found: {0}")]
    ExerciseNotFound(String),
    #[error("room not found: {0}")]
    RoomNotFound(String),
    #[error("connection {connection_id} rejected in room {room_id}: {reason}")]
    Unauthorized { room_id: String, connection_id: ConnectionId, reason: &'static str },
    #[error("exercise store failed: {0}")]
    Store(ExerciseError),
}

impl From<ExerciseError> for RoomError {
    fn from(err: ExerciseError) -> Self {
        match err {
            ExerciseError::NotFound(id) => Self::ExerciseNotFound(id),
            other => Self::Store(other),
        }
    }
}

impl crate::frame::ErrorCode for RoomError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ExerciseNotFound(_) => "E_EXERCISE_NOT_FOUND",
            Self::RoomNotFound(_) => "E_ROOM_NOT_FOUND",
            Self::Unauthorized { .. } => "E_UNAUTHORIZED",
            Self::Store(_) => "E_STORE",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Store(e) => crate::frame::ErrorCode::retryable(e),
            _ => false,
        }
    }
}

/// Why a connection is being pushed back to the lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    MentorLeft,
    Deletion,
}

impl RedirectReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MentorLeft => "mentor-left",
            Self::Deletion => "deletion",
        }
    }
}

/// What a leave or disconnect did to one room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// Mentor left: students were evicted and the room deleted.
    MentorLeft { evicted: usize },
    /// A student left. `closed` when that emptied a mentor-less room.
    StudentLeft { remaining: usize, closed: bool },
    /// The connection had no role in the room.
    NotMember,
}

// =============================================================================
// REGISTRY ACCESS
// =============================================================================

/// Lock the registry with `room_id` guaranteed present, creating the room
/// from its exercise on first use.
///
/// The store fetch runs outside the lock. If another join created the room
/// meanwhile, that room wins and the fetched exercise is discarded. If the
/// exercise was deleted meanwhile, the fetched copy is stale and no room is
/// built.
///
/// # Errors
///
/// `ExerciseNotFound` when the store has no such exercise, or it was deleted
/// during the fetch; no room is created.
pub async fn get_or_create<'a>(
    state: &'a AppState,
    room_id: &str,
) -> Result<RwLockWriteGuard<'a, RoomRegistry>, RoomError> {
    let generation = {
        let rooms = state.rooms.write().await;
        if rooms.contains(room_id) {
            return Ok(rooms);
        }
        rooms.deletion_generation(room_id)
    };

    let exercise = state.exercises.fetch(room_id).await?;

    let mut rooms = state.rooms.write().await;
    if rooms.deletion_generation(room_id) != generation {
        debug!(%room_id, "exercise deleted during fetch, room not created");
        return Err(RoomError::ExerciseNotFound(room_id.to_owned()));
    }
    let room = Room::new(exercise.template, &exercise.solution);
    if rooms.insert_if_absent(room_id, room) {
        info!(%room_id, live_rooms = rooms.len(), "room created");
    }
    Ok(rooms)
}

// =============================================================================
// JOIN
// =============================================================================

/// Join a room. First joiner of an empty room becomes mentor, everyone
/// after is a student. Returns `None` when the connection was already in
/// the room.
///
/// # Errors
///
/// `ExerciseNotFound` when the room does not exist and cannot be created.
pub async fn join(
    state: &AppState,
    room_id: &str,
    connection_id: ConnectionId,
    tx: ClientSender,
) -> Result<Option<Role>, RoomError> {
    let mut rooms = get_or_create(state, room_id).await?;
    let Some(room) = rooms.get_mut(room_id) else {
        return Err(RoomError::RoomNotFound(room_id.to_owned()));
    };

    if room.is_member(connection_id) {
        debug!(%room_id, %connection_id, "duplicate join ignored");
        return Ok(None);
    }

    let role = if room.mentor.is_none() {
        room.mentor = Some(connection_id);
        Role::Mentor
    } else {
        room.students.insert(connection_id);
        Role::Student
    };
    deliver(connection_id, &tx, role_frame(room_id, role));

    room.group.insert(connection_id, tx.clone());
    broadcast(room, &student_count_frame(room_id, room.students.len()));

    // Late joiners get the live buffer, not the template.
    deliver(connection_id, &tx, code_update_frame(room_id, &room.buffer, room.solved()));

    info!(%room_id, %connection_id, role = role.as_str(), students = room.students.len(), "joined room");
    Ok(Some(role))
}

// =============================================================================
// CODE UPDATE
// =============================================================================

/// Replace the buffer with a student's code and echo it to the room.
/// Returns the new solved flag.
///
/// # Errors
///
/// `RoomNotFound` for unknown rooms; `Unauthorized` for connections without
/// a role and for the mentor, who is read-only.
pub async fn update_code(
    state: &AppState,
    room_id: &str,
    connection_id: ConnectionId,
    code: String,
) -> Result<bool, RoomError> {
    let mut rooms = state.rooms.write().await;
    let Some(room) = rooms.get_mut(room_id) else {
        return Err(RoomError::RoomNotFound(room_id.to_owned()));
    };

    match room.role_of(connection_id) {
        None => return Err(unauthorized(room_id, connection_id, "no role in room")),
        Some(Role::Mentor) => return Err(unauthorized(room_id, connection_id, "mentor is read-only")),
        Some(Role::Student) => {}
    }

    let was_solved = room.solved();
    let solved = matches_solution(&code, room.solution());
    if solved != was_solved {
        broadcast(room, &code_status_frame(room_id, solved));
        info!(%room_id, %connection_id, solved, "solved state changed");
    }

    room.buffer = code;
    broadcast(room, &code_update_frame(room_id, &room.buffer, solved));
    Ok(solved)
}

fn unauthorized(room_id: &str, connection_id: ConnectionId, reason: &'static str) -> RoomError {
    RoomError::Unauthorized { room_id: room_id.to_owned(), connection_id, reason }
}

// =============================================================================
// LEAVE / DISCONNECT
// =============================================================================

/// Explicitly leave one room.
///
/// # Errors
///
/// `RoomNotFound` when no live room has this id.
pub async fn leave(state: &AppState, room_id: &str, connection_id: ConnectionId) -> Result<Departure, RoomError> {
    let mut rooms = state.rooms.write().await;
    if !rooms.contains(room_id) {
        return Err(RoomError::RoomNotFound(room_id.to_owned()));
    }
    Ok(depart(&mut rooms, room_id, connection_id))
}

/// Remove a dropped connection from every room it belongs to. The socket
/// does not say which rooms those are, so all rooms are scanned.
pub async fn disconnect(state: &AppState, connection_id: ConnectionId) -> Vec<(String, Departure)> {
    let mut rooms = state.rooms.write().await;
    if rooms.is_empty() {
        return Vec::new();
    }
    rooms
        .rooms_with_member(connection_id)
        .into_iter()
        .map(|room_id| {
            let departure = depart(&mut rooms, &room_id, connection_id);
            (room_id, departure)
        })
        .collect()
}

/// Shared transition table for leave and disconnect.
fn depart(rooms: &mut RoomRegistry, room_id: &str, connection_id: ConnectionId) -> Departure {
    let Some(room) = rooms.get_mut(room_id) else {
        return Departure::NotMember;
    };

    match room.role_of(connection_id) {
        None => Departure::NotMember,
        Some(Role::Mentor) => {
            room.group.remove(&connection_id);
            room.mentor = None;
            let evicted = evict_members(room, room_id, RedirectReason::MentorLeft);
            rooms.delete(room_id);
            info!(%room_id, %connection_id, evicted, "mentor left, room closed");
            Departure::MentorLeft { evicted }
        }
        Some(Role::Student) => {
            room.students.remove(&connection_id);
            room.group.remove(&connection_id);
            let remaining = room.students.len();
            broadcast(room, &student_count_frame(room_id, remaining));

            let closed = room.is_empty();
            if closed {
                rooms.delete(room_id);
                info!(%room_id, "last student left, room closed");
            }
            debug!(%room_id, %connection_id, remaining, "student left room");
            Departure::StudentLeft { remaining, closed }
        }
    }
}

// =============================================================================
// EXERCISE DELETION
// =============================================================================

/// Evict everyone from the room built on a deleted exercise and drop it.
/// Returns the number of evicted connections, or `None` when no room was live.
/// The deletion is recorded either way so in-flight joins cannot rebuild it.
pub async fn close_for_deletion(state: &AppState, room_id: &str) -> Option<usize> {
    let mut rooms = state.rooms.write().await;
    rooms.mark_deleted(room_id);
    let room = rooms.get_mut(room_id)?;

    let evicted = evict_members(room, room_id, RedirectReason::Deletion);
    // Room-scoped echo for anything still attached to the group.
    broadcast(room, &code_deletion_frame(Some(room_id), room_id));
    rooms.delete(room_id);

    info!(%room_id, evicted, "room closed after exercise deletion");
    Some(evicted)
}

/// Send `redirect-lobby` to every student, then the mentor, and revoke
/// their group membership.
fn evict_members(room: &mut Room, room_id: &str, reason: RedirectReason) -> usize {
    let frame = redirect_frame(room_id, reason);
    let mut evicted: Vec<ConnectionId> = room.students.drain().collect();
    evicted.extend(room.mentor.take());

    for connection_id in &evicted {
        if let Some(tx) = room.group.remove(connection_id) {
            deliver(*connection_id, &tx, frame.clone());
        }
    }
    evicted.len()
}

// =============================================================================
// FAN-OUT
// =============================================================================

/// Push a frame into one connection's queue. Full or closed queues lose the
/// frame for that connection only.
pub fn deliver(connection_id: ConnectionId, tx: &ClientSender, frame: Frame) {
    if let Err(e) = tx.try_send(frame) {
        debug!(%connection_id, error = %e, "dropped outbound frame");
    }
}

/// Send a frame to every member of the room's group.
pub fn broadcast(room: &Room, frame: &Frame) {
    for (connection_id, tx) in &room.group {
        deliver(*connection_id, tx, frame.clone());
    }
}

// =============================================================================
// EVENTS
// =============================================================================

fn room_event(syscall: &str, room_id: &str) -> Frame {
    Frame::request(syscall, Data::new()).with_room_id(room_id)
}

#[must_use]
pub fn role_frame(room_id: &str, role: Role) -> Frame {
    room_event(frame::ROLE, room_id).with_data("role", role.as_str())
}

#[must_use]
pub fn student_count_frame(room_id: &str, count: usize) -> Frame {
    room_event(frame::STUDENT_COUNT, room_id).with_data("count", count)
}

#[must_use]
pub fn code_update_frame(room_id: &str, code: &str, solved: bool) -> Frame {
    room_event(frame::CODE_UPDATE, room_id)
        .with_data("code", code)
        .with_data("solved", solved)
}

#[must_use]
pub fn code_status_frame(room_id: &str, solved: bool) -> Frame {
    room_event(frame::NEW_CODE_STATUS, room_id).with_data("solved", solved)
}

#[must_use]
pub fn redirect_frame(room_id: &str, reason: RedirectReason) -> Frame {
    room_event(frame::REDIRECT_LOBBY, room_id).with_data("reason", reason.as_str())
}

/// `code-deletion` notice. Room-scoped when `room_id` is set, lobby-wide otherwise.
#[must_use]
pub fn code_deletion_frame(room_id: Option<&str>, exercise_id: &str) -> Frame {
    let frame = Frame::request(frame::CODE_DELETION, Data::new()).with_data("id", exercise_id);
    match room_id {
        Some(room_id) => frame.with_room_id(room_id),
        None => frame,
    }
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
