use super::*;
use crate::frame::{CODE_DELETION, NEW_CODE_BLOCK};
use crate::services::lobby;
use crate::state::test_helpers::{connection, drain, syscalls, test_app_state, test_app_state_with_ex1};

#[test]
fn exercise_error_to_status_maps_variants() {
    assert_eq!(exercise_error_to_status(ExerciseError::NotFound("x".into())), StatusCode::NOT_FOUND);
    assert_eq!(exercise_error_to_status(ExerciseError::Invalid("x".into())), StatusCode::BAD_REQUEST);
    assert_eq!(
        exercise_error_to_status(ExerciseError::Database(sqlx::Error::PoolClosed)),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn draft_with_missing_fields_deserializes_empty() {
    let draft: ExerciseDraft = serde_json::from_str(r#"{"title":"only"}"#).expect("draft");
    assert_eq!(draft.title, "only");
    assert!(draft.template.is_empty());
    assert!(draft.validate().is_err());
}

#[tokio::test]
async fn list_and_get_exercises() {
    let state = test_app_state_with_ex1();

    let Json(all) = list_exercises(State(state.clone())).await.expect("list");
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, "ex1");

    let Json(one) = get_exercise(State(state.clone()), Path("ex2".into())).await.expect("get");
    assert_eq!(one.title, "Second");

    let missing = get_exercise(State(state), Path("nope".into())).await;
    assert_eq!(missing.err(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn create_returns_created_and_announces() {
    let state = test_app_state();
    let (a, tx_a, mut rx_a) = connection();
    lobby::register(&state, a, tx_a).await;

    let body = ExerciseDraft { title: "T".into(), template: "a".into(), solution: "b".into() };
    let (status, Json(response)) = create_exercise(State(state.clone()), Json(body))
        .await
        .expect("create");
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(response.message, "Exercise created successfully");
    assert_eq!(response.data.title, "T");

    assert_eq!(syscalls(&drain(&mut rx_a)), vec![NEW_CODE_BLOCK]);
}

#[tokio::test]
async fn create_rejects_empty_fields() {
    let state = test_app_state();
    let body = ExerciseDraft { title: "T".into(), template: String::new(), solution: "b".into() };
    let result = create_exercise(State(state), Json(body)).await;
    assert_eq!(result.err(), Some(StatusCode::BAD_REQUEST));
}

#[tokio::test]
async fn update_ignores_empty_fields_and_404s_unknown() {
    let state = test_app_state_with_ex1();
    let patch = ExercisePatch { title: Some("Renamed".into()), template: Some(String::new()), solution: None };
    let Json(response) = update_exercise(State(state.clone()), Path("ex1".into()), Json(patch))
        .await
        .expect("update");
    assert_eq!(response.data.title, "Renamed");
    assert_eq!(response.data.template, crate::state::test_helpers::EX1_TEMPLATE);

    let missing = update_exercise(State(state), Path("nope".into()), Json(ExercisePatch::default())).await;
    assert_eq!(missing.err(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn delete_returns_id_and_announces() {
    let state = test_app_state_with_ex1();
    let (a, tx_a, mut rx_a) = connection();
    lobby::register(&state, a, tx_a).await;

    let Json(response) = delete_exercise(State(state.clone()), Path("ex2".into()))
        .await
        .expect("delete");
    assert_eq!(response.data, "ex2");
    assert_eq!(response.message, "Exercise deleted successfully");
    assert_eq!(syscalls(&drain(&mut rx_a)), vec![CODE_DELETION]);

    let again = delete_exercise(State(state), Path("ex2".into())).await;
    assert_eq!(again.err(), Some(StatusCode::NOT_FOUND));
}
