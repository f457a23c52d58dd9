//! WebSocket handler: room event relay.
//!
//! DESIGN
//! ======
//! On upgrade, issues a connection id, registers the socket in the lobby,
//! and enters a `select!` loop:
//! - Incoming client frames → parse + dispatch by syscall
//! - Frames queued by room and lobby services → forward to client
//!
//! Room services push their own frames into member channels while holding
//! the registry lock, so dispatch only returns transport-level errors for
//! the sender. Room-level failures are logged and never answered.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `session:connected` with `connection_id`
//! 2. Client sends `join-room` / `code-update` / `leave-room`
//! 3. Close → leave the lobby → `room::disconnect` across all rooms

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::frame::{self, Data, Frame, Status};
use crate::services::room::{self, Departure, RoomError};
use crate::services::lobby;
use crate::state::{AppState, ClientSender, ConnectionId};

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();

    // Per-connection channel for frames queued by room and lobby services.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(state.channel_capacity);

    let welcome = Frame::request(frame::SESSION_CONNECTED, Data::new())
        .with_data("connection_id", connection_id.to_string());
    if send_frame(&mut socket, &welcome).await.is_err() {
        return;
    }

    lobby::register(&state, connection_id, client_tx.clone()).await;
    info!(%connection_id, "ws: client connected");

    'conn: loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        let replies = process_inbound_text(&state, connection_id, &client_tx, text.as_str()).await;
                        for reply in replies {
                            if send_frame(&mut socket, &reply).await.is_err() {
                                break 'conn;
                            }
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    lobby::unregister(&state, connection_id).await;
    let departures = room::disconnect(&state, connection_id).await;
    for (room_id, departure) in departures {
        log_departure(connection_id, &room_id, departure);
    }
    info!(%connection_id, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Parse and process one inbound text frame and return frames for the sender.
///
/// Only transport problems produce replies: unparsable JSON, unknown
/// syscalls, and frames missing the fields their syscall needs.
pub(crate) async fn process_inbound_text(
    state: &AppState,
    connection_id: ConnectionId,
    client_tx: &ClientSender,
    text: &str,
) -> Vec<Frame> {
    let req: Frame = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            warn!(%connection_id, error = %e, "ws: invalid inbound frame");
            return vec![gateway_error(None, format!("invalid json: {e}"))];
        }
    };

    debug!(%connection_id, id = %req.id, syscall = %req.syscall, "ws: recv frame");

    let result = match req.syscall.as_str() {
        frame::JOIN_ROOM => handle_join(state, connection_id, client_tx, &req).await,
        frame::CODE_UPDATE => handle_code_update(state, connection_id, &req).await,
        frame::LEAVE_ROOM => handle_leave(state, connection_id, &req).await,
        other => Err(gateway_error(Some(&req), format!("unknown syscall: {other}"))),
    };

    match result {
        Ok(()) => vec![],
        Err(reply) => vec![reply],
    }
}

async fn handle_join(
    state: &AppState,
    connection_id: ConnectionId,
    client_tx: &ClientSender,
    req: &Frame,
) -> Result<(), Frame> {
    let room_id = required_room(req)?;
    if let Err(e) = room::join(state, room_id, connection_id, client_tx.clone()).await {
        log_dropped(connection_id, &req.syscall, &e);
    }
    Ok(())
}

async fn handle_code_update(state: &AppState, connection_id: ConnectionId, req: &Frame) -> Result<(), Frame> {
    let room_id = required_room(req)?;
    let Some(code) = req.data_str(frame::FRAME_CODE) else {
        return Err(gateway_error(Some(req), "code required"));
    };
    if let Err(e) = room::update_code(state, room_id, connection_id, code.to_owned()).await {
        log_dropped(connection_id, &req.syscall, &e);
    }
    Ok(())
}

async fn handle_leave(state: &AppState, connection_id: ConnectionId, req: &Frame) -> Result<(), Frame> {
    let room_id = required_room(req)?;
    match room::leave(state, room_id, connection_id).await {
        Ok(departure) => log_departure(connection_id, room_id, departure),
        Err(e) => log_dropped(connection_id, &req.syscall, &e),
    }
    Ok(())
}

fn log_departure(connection_id: ConnectionId, room_id: &str, departure: Departure) {
    match departure {
        Departure::MentorLeft { evicted } => info!(%connection_id, %room_id, evicted, "ws: mentor left room"),
        Departure::StudentLeft { remaining, closed } => {
            debug!(%connection_id, %room_id, remaining, closed, "ws: student left room");
        }
        Departure::NotMember => debug!(%connection_id, %room_id, "ws: leave from non-member ignored"),
    }
}

fn required_room(req: &Frame) -> Result<&str, Frame> {
    req.target_room()
        .ok_or_else(|| gateway_error(Some(req), "room_id required"))
}

/// Room errors never reach the client. This is their only trace.
fn log_dropped(connection_id: ConnectionId, syscall: &str, err: &RoomError) {
    use crate::frame::ErrorCode;

    let code = err.error_code();
    match err {
        RoomError::Unauthorized { .. } => warn!(%connection_id, syscall, code, error = %err, "ws: dropped room event"),
        RoomError::Store(_) => {
            error!(%connection_id, syscall, code, retryable = err.retryable(), error = %err, "ws: dropped room event");
        }
        RoomError::ExerciseNotFound(_) | RoomError::RoomNotFound(_) => {
            debug!(%connection_id, syscall, code, error = %err, "ws: dropped room event");
        }
    }
}

/// Transport-level error frame. Correlates to the request when one parsed.
fn gateway_error(req: Option<&Frame>, message: impl Into<String>) -> Frame {
    let Some(req) = req else {
        let mut reply = Frame::request(frame::GATEWAY_ERROR, Data::new()).with_data(frame::FRAME_MESSAGE, message.into());
        reply.status = Status::Error;
        return reply;
    };
    let mut reply = req.error(message);
    reply.syscall = frame::GATEWAY_ERROR.to_owned();
    reply.room_id = req.target_room().map(str::to_owned);
    reply
}

// =============================================================================
// SEND
// =============================================================================

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };
    if frame.status == Status::Error {
        let message = frame.data_str(frame::FRAME_MESSAGE).unwrap_or("-");
        warn!(id = %frame.id, syscall = %frame.syscall, message, "ws: send frame status=Error");
    } else {
        debug!(id = %frame.id, syscall = %frame.syscall, "ws: send frame");
    }
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
