//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the exercise REST API and the room websocket under a
//! single Axum router. There is no frontend here; clients are served
//! elsewhere and talk to this process over CORS.

pub mod exercises;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Mount points of the exercise API. `/code-blocks` is the legacy path
/// existing clients still call.
pub const EXERCISE_PREFIXES: [&str; 2] = ["/api/exercises", "/code-blocks"];

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new();
    for prefix in EXERCISE_PREFIXES {
        router = router
            .route(prefix, get(exercises::list_exercises).post(exercises::create_exercise))
            .route(
                &format!("{prefix}/{{id}}"),
                get(exercises::get_exercise)
                    .patch(exercises::update_exercise)
                    .delete(exercises::delete_exercise),
            );
    }

    router
        .route("/api/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
