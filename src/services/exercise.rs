//! Exercise service: storage of exercise definitions and lobby triggers.
//!
//! DESIGN
//! ======
//! An exercise is a title, a starting template, and a solution. Rooms only
//! ever read `{template, solution}` through `ExerciseStore::fetch`; the REST
//! surface drives the rest of the trait. `PgExerciseStore` is the production
//! backend, `MemoryExerciseStore` backs tests and database-less local runs.
//!
//! Write paths go through the free functions at the bottom so that every
//! create and delete reaches the lobby, whichever backend is configured.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::services::lobby;
use crate::state::AppState;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ExerciseError {
    #[error("exercise not found: {0}")]
    NotFound(String),
    #[error("invalid exercise: {0}")]
    Invalid(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl crate::frame::ErrorCode for ExerciseError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_EXERCISE_NOT_FOUND",
            Self::Invalid(_) => "E_EXERCISE_INVALID",
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// One stored exercise. Mirrors the `exercises` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub title: String,
    pub template: String,
    pub solution: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Lobby-facing view of an exercise. Leaves the solution out.
#[derive(Debug, Clone, Serialize)]
pub struct ExerciseSummary {
    pub id: String,
    pub title: String,
    pub template: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&Exercise> for ExerciseSummary {
    fn from(ex: &Exercise) -> Self {
        Self {
            id: ex.id.clone(),
            title: ex.title.clone(),
            template: ex.template.clone(),
            created_at: ex.created_at,
            updated_at: ex.updated_at,
        }
    }
}

/// Body for creating an exercise. Every field is required and non-empty;
/// missing fields deserialize as empty so `validate` reports them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExerciseDraft {
    pub title: String,
    pub template: String,
    pub solution: String,
}

impl ExerciseDraft {
    /// # Errors
    ///
    /// Returns `Invalid` naming the first empty field.
    pub fn validate(&self) -> Result<(), ExerciseError> {
        for (field, value) in [("title", &self.title), ("template", &self.template), ("solution", &self.solution)] {
            if value.trim().is_empty() {
                return Err(ExerciseError::Invalid(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }
}

/// Partial update. Absent or empty fields leave the stored value unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExercisePatch {
    pub title: Option<String>,
    pub template: Option<String>,
    pub solution: Option<String>,
}

impl ExercisePatch {
    /// Drop empty strings so they never overwrite stored values.
    #[must_use]
    pub fn without_empty_fields(self) -> Self {
        let keep = |v: Option<String>| v.filter(|s| !s.is_empty());
        Self { title: keep(self.title), template: keep(self.template), solution: keep(self.solution) }
    }
}

/// Read/write access to exercise definitions.
#[async_trait::async_trait]
pub trait ExerciseStore: Send + Sync {
    /// All exercises, oldest first.
    async fn list(&self) -> Result<Vec<Exercise>, ExerciseError>;

    /// # Errors
    ///
    /// Returns `NotFound` when the id is unknown.
    async fn fetch(&self, id: &str) -> Result<Exercise, ExerciseError>;

    async fn create(&self, draft: ExerciseDraft) -> Result<Exercise, ExerciseError>;

    async fn update(&self, id: &str, patch: ExercisePatch) -> Result<Exercise, ExerciseError>;

    async fn delete(&self, id: &str) -> Result<(), ExerciseError>;
}

/// Starter exercises seeded into fresh stores: `(title, template, solution)`.
pub const STARTER_EXERCISES: [(&str, &str, &str); 4] = [
    (
        "Async Case",
        "async function fetchData() {\n  // Your code here\n}",
        "async function fetchData() {\n  return await fetch(\"/data\");\n}",
    ),
    (
        "Promise Example",
        "function fetchData() {\n  // Your code here\n}",
        "function fetchData() {\n  return new Promise((resolve) => resolve(\"data\"));\n}",
    ),
    (
        "Simple Loop",
        "for (let i = 0; i < 5; i++) {\n  // Your code here\n}",
        "for (let i = 0; i < 5; i++) {\n  console.log(i);\n}",
    ),
    (
        "Array Map Example",
        "const numbers = [1, 2, 3, 4, 5];\nconst doubledNumbers = numbers.map(num => {\n  // Your code here\n});",
        "const numbers = [1, 2, 3, 4, 5];\nconst doubledNumbers = numbers.map(num => num * 2);",
    ),
];

// =============================================================================
// POSTGRES STORE
// =============================================================================

type ExerciseRow = (Uuid, String, String, String, OffsetDateTime, OffsetDateTime);

fn from_row((id, title, template, solution, created_at, updated_at): ExerciseRow) -> Exercise {
    Exercise { id: id.to_string(), title, template, solution, created_at, updated_at }
}

/// Exercise ids are UUIDs in Postgres; anything else cannot exist.
fn parse_id(id: &str) -> Result<Uuid, ExerciseError> {
    Uuid::parse_str(id).map_err(|_| ExerciseError::NotFound(id.to_owned()))
}

pub struct PgExerciseStore {
    pool: PgPool,
}

impl PgExerciseStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ExerciseStore for PgExerciseStore {
    async fn list(&self) -> Result<Vec<Exercise>, ExerciseError> {
        let rows = sqlx::query_as::<_, ExerciseRow>(
            "SELECT id, title, template, solution, created_at, updated_at
             FROM exercises
             ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(from_row).collect())
    }

    async fn fetch(&self, id: &str) -> Result<Exercise, ExerciseError> {
        let uuid = parse_id(id)?;
        let row = sqlx::query_as::<_, ExerciseRow>(
            "SELECT id, title, template, solution, created_at, updated_at
             FROM exercises
             WHERE id = $1",
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        row.map(from_row)
            .ok_or_else(|| ExerciseError::NotFound(id.to_owned()))
    }

    async fn create(&self, draft: ExerciseDraft) -> Result<Exercise, ExerciseError> {
        let row = sqlx::query_as::<_, ExerciseRow>(
            "INSERT INTO exercises (id, title, template, solution)
             VALUES ($1, $2, $3, $4)
             RETURNING id, title, template, solution, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(&draft.title)
        .bind(&draft.template)
        .bind(&draft.solution)
        .fetch_one(&self.pool)
        .await?;
        Ok(from_row(row))
    }

    async fn update(&self, id: &str, patch: ExercisePatch) -> Result<Exercise, ExerciseError> {
        let uuid = parse_id(id)?;
        let row = sqlx::query_as::<_, ExerciseRow>(
            "UPDATE exercises
             SET title = COALESCE($2, title),
                 template = COALESCE($3, template),
                 solution = COALESCE($4, solution),
                 updated_at = now()
             WHERE id = $1
             RETURNING id, title, template, solution, created_at, updated_at",
        )
        .bind(uuid)
        .bind(patch.title)
        .bind(patch.template)
        .bind(patch.solution)
        .fetch_optional(&self.pool)
        .await?;
        row.map(from_row)
            .ok_or_else(|| ExerciseError::NotFound(id.to_owned()))
    }

    async fn delete(&self, id: &str) -> Result<(), ExerciseError> {
        let uuid = parse_id(id)?;
        let result = sqlx::query("DELETE FROM exercises WHERE id = $1")
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ExerciseError::NotFound(id.to_owned()));
        }
        Ok(())
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// Insertion-ordered in-memory store. Ids are arbitrary strings.
#[derive(Default)]
pub struct MemoryExerciseStore {
    exercises: RwLock<Vec<Exercise>>,
}

impl MemoryExerciseStore {
    #[must_use]
    pub fn new(exercises: Vec<Exercise>) -> Self {
        Self { exercises: RwLock::new(exercises) }
    }

    /// Store pre-filled with `STARTER_EXERCISES`.
    #[must_use]
    pub fn with_starters() -> Self {
        let exercises = STARTER_EXERCISES
            .iter()
            .map(|(title, template, solution)| new_exercise(Uuid::new_v4().to_string(), title, template, solution))
            .collect();
        Self::new(exercises)
    }
}

/// Build an exercise stamped with the current time.
#[must_use]
pub fn new_exercise(id: impl Into<String>, title: &str, template: &str, solution: &str) -> Exercise {
    let now = OffsetDateTime::now_utc();
    Exercise {
        id: id.into(),
        title: title.to_owned(),
        template: template.to_owned(),
        solution: solution.to_owned(),
        created_at: now,
        updated_at: now,
    }
}

#[async_trait::async_trait]
impl ExerciseStore for MemoryExerciseStore {
    async fn list(&self) -> Result<Vec<Exercise>, ExerciseError> {
        Ok(self.exercises.read().await.clone())
    }

    async fn fetch(&self, id: &str) -> Result<Exercise, ExerciseError> {
        let exercises = self.exercises.read().await;
        exercises
            .iter()
            .find(|ex| ex.id == id)
            .cloned()
            .ok_or_else(|| ExerciseError::NotFound(id.to_owned()))
    }

    async fn create(&self, draft: ExerciseDraft) -> Result<Exercise, ExerciseError> {
        let exercise = new_exercise(Uuid::new_v4().to_string(), &draft.title, &draft.template, &draft.solution);
        self.exercises.write().await.push(exercise.clone());
        Ok(exercise)
    }

    async fn update(&self, id: &str, patch: ExercisePatch) -> Result<Exercise, ExerciseError> {
        let mut exercises = self.exercises.write().await;
        let Some(ex) = exercises.iter_mut().find(|ex| ex.id == id) else {
            return Err(ExerciseError::NotFound(id.to_owned()));
        };
        if let Some(title) = patch.title {
            ex.title = title;
        }
        if let Some(template) = patch.template {
            ex.template = template;
        }
        if let Some(solution) = patch.solution {
            ex.solution = solution;
        }
        ex.updated_at = OffsetDateTime::now_utc();
        Ok(ex.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), ExerciseError> {
        let mut exercises = self.exercises.write().await;
        let before = exercises.len();
        exercises.retain(|ex| ex.id != id);
        if exercises.len() == before {
            return Err(ExerciseError::NotFound(id.to_owned()));
        }
        Ok(())
    }
}

// =============================================================================
// WRITE PATHS
// =============================================================================

/// Validate and store a new exercise, then announce it to the lobby.
///
/// # Errors
///
/// Returns `Invalid` for empty fields, or the store's error.
pub async fn create_exercise(state: &AppState, draft: ExerciseDraft) -> Result<Exercise, ExerciseError> {
    draft.validate()?;
    let exercise = state.exercises.create(draft).await?;
    info!(exercise_id = %exercise.id, title = %exercise.title, "exercise created");
    lobby::announce_created(state, &exercise).await;
    Ok(exercise)
}

/// Apply a partial update. Live rooms keep the solution they were built with.
///
/// # Errors
///
/// Returns `NotFound` for unknown ids, or the store's error.
pub async fn update_exercise(state: &AppState, id: &str, patch: ExercisePatch) -> Result<Exercise, ExerciseError> {
    let exercise = state
        .exercises
        .update(id, patch.without_empty_fields())
        .await?;
    info!(exercise_id = %exercise.id, "exercise updated");
    Ok(exercise)
}

/// Delete an exercise, tear down its live room, and announce the deletion.
///
/// # Errors
///
/// Returns `NotFound` for unknown ids, or the store's error.
pub async fn delete_exercise(state: &AppState, id: &str) -> Result<(), ExerciseError> {
    state.exercises.delete(id).await?;
    info!(exercise_id = %id, "exercise deleted");
    lobby::announce_deleted(state, id).await;
    Ok(())
}

#[cfg(test)]
#[path = "exercise_test.rs"]
mod tests;
