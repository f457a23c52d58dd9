//! Exercise CRUD routes.
//!
//! Writes go through `services::exercise` so creates and deletes reach the
//! lobby. Mutating responses wrap the payload as `{message, data}`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;
use tracing::error;

use crate::services::exercise::{self, Exercise, ExerciseDraft, ExerciseError, ExercisePatch};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    fn new(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self { message: message.into(), data })
    }
}

/// `GET /api/exercises` — list all exercises, oldest first.
pub async fn list_exercises(State(state): State<AppState>) -> Result<Json<Vec<Exercise>>, StatusCode> {
    let exercises = state
        .exercises
        .list()
        .await
        .map_err(exercise_error_to_status)?;
    Ok(Json(exercises))
}

/// `GET /api/exercises/:id` — fetch one exercise.
pub async fn get_exercise(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Exercise>, StatusCode> {
    let exercise = state
        .exercises
        .fetch(&id)
        .await
        .map_err(exercise_error_to_status)?;
    Ok(Json(exercise))
}

/// `POST /api/exercises` — create an exercise and announce it.
pub async fn create_exercise(
    State(state): State<AppState>,
    Json(body): Json<ExerciseDraft>,
) -> Result<(StatusCode, Json<ApiResponse<Exercise>>), StatusCode> {
    let created = exercise::create_exercise(&state, body)
        .await
        .map_err(exercise_error_to_status)?;
    Ok((StatusCode::CREATED, ApiResponse::new("Exercise created successfully", created)))
}

/// `PATCH /api/exercises/:id` — partial update. Empty fields are ignored.
pub async fn update_exercise(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ExercisePatch>,
) -> Result<Json<ApiResponse<Exercise>>, StatusCode> {
    let updated = exercise::update_exercise(&state, &id, body)
        .await
        .map_err(exercise_error_to_status)?;
    Ok(ApiResponse::new("Exercise updated successfully", updated))
}

/// `DELETE /api/exercises/:id` — delete, closing any live room.
pub async fn delete_exercise(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<String>>, StatusCode> {
    exercise::delete_exercise(&state, &id)
        .await
        .map_err(exercise_error_to_status)?;
    Ok(ApiResponse::new("Exercise deleted successfully", id))
}

pub(crate) fn exercise_error_to_status(err: ExerciseError) -> StatusCode {
    match err {
        ExerciseError::NotFound(_) => StatusCode::NOT_FOUND,
        ExerciseError::Invalid(_) => StatusCode::BAD_REQUEST,
        ExerciseError::Database(e) => {
            error!(error = %e, "exercise store failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
#[path = "exercises_test.rs"]
mod tests;
