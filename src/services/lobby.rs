//! Lobby: every connected socket, independent of room membership.
//!
//! Exercise create/delete notices fan out here. Deleting an exercise also
//! closes its live room first, so evicted members see `redirect-lobby`
//! before the lobby-wide `code-deletion`.

use tracing::{debug, info};

use crate::frame::{self, Data, Frame};
use crate::services::exercise::{Exercise, ExerciseSummary};
use crate::services::room;
use crate::state::{AppState, ClientSender, ConnectionId};

/// Add a freshly upgraded socket to the lobby.
pub async fn register(state: &AppState, connection_id: ConnectionId, tx: ClientSender) {
    let mut clients = state.ws_clients.write().await;
    clients.insert(connection_id, tx);
    debug!(%connection_id, connected = clients.len(), "lobby: registered");
}

pub async fn unregister(state: &AppState, connection_id: ConnectionId) {
    let mut clients = state.ws_clients.write().await;
    clients.remove(&connection_id);
    debug!(%connection_id, connected = clients.len(), "lobby: unregistered");
}

/// Send a frame to every connected socket.
pub async fn broadcast(state: &AppState, frame: &Frame) {
    let clients = state.ws_clients.read().await;
    for (connection_id, tx) in clients.iter() {
        room::deliver(*connection_id, tx, frame.clone());
    }
}

/// Announce a new exercise to everyone.
pub async fn announce_created(state: &AppState, exercise: &Exercise) {
    let summary = ExerciseSummary::from(exercise);
    let data: Data = match serde_json::to_value(&summary) {
        Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
        Ok(_) => Data::new(),
        Err(e) => {
            tracing::warn!(exercise_id = %exercise.id, error = %e, "lobby: failed to serialize exercise summary");
            return;
        }
    };
    broadcast(state, &Frame::request(frame::NEW_CODE_BLOCK, data)).await;
    info!(exercise_id = %exercise.id, "lobby: announced new exercise");
}

/// Close the exercise's live room, if any, then announce the deletion to
/// everyone.
pub async fn announce_deleted(state: &AppState, exercise_id: &str) {
    if let Some(evicted) = room::close_for_deletion(state, exercise_id).await {
        debug!(%exercise_id, evicted, "lobby: live room closed");
    }
    broadcast(state, &room::code_deletion_frame(None, exercise_id)).await;
    info!(%exercise_id, "lobby: announced exercise deletion");
}

#[cfg(test)]
#[path = "lobby_test.rs"]
mod tests;
