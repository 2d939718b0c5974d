use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::api::errors::ApiError;
use crate::api::validation::{validate_identifier, validate_submission};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::schemas::attempt::{
    OrderedQuestionsResponse, StartAttemptResponse, SubmitAttemptRequest, SubmitAttemptResponse,
    SummaryResponse,
};
use crate::services::attempts::{self, AttemptError};

fn validate_path(quiz_id: &str, learner_id: &str) -> Result<(), ApiError> {
    validate_identifier("quiz_id", quiz_id)?;
    validate_identifier("learner_id", learner_id)
}

/// Starting twice is not an error: the learner gets their existing attempt back.
pub(super) async fn start_attempt(
    Path((quiz_id, learner_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<StartAttemptResponse>), ApiError> {
    validate_path(&quiz_id, &learner_id)?;

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to begin transaction"))?;

    match attempts::start_attempt(&mut tx, &quiz_id, &learner_id, primitive_now_utc()).await {
        Ok(attempt) => {
            tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit attempt"))?;
            Ok((
                StatusCode::CREATED,
                Json(StartAttemptResponse {
                    attempt_id: attempt.id,
                    message: "Quiz started".to_string(),
                }),
            ))
        }
        Err(AttemptError::AlreadyStarted { attempt_id }) => Ok((
            StatusCode::OK,
            Json(StartAttemptResponse { attempt_id, message: "Quiz already started".to_string() }),
        )),
        Err(err) => Err(err.into()),
    }
}

pub(super) async fn ordered_questions(
    Path((quiz_id, learner_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<OrderedQuestionsResponse>, ApiError> {
    validate_path(&quiz_id, &learner_id)?;

    let mut conn =
        state.db().acquire().await.map_err(|e| ApiError::internal(e, "Failed to acquire connection"))?;
    let paper = attempts::ordered_questions(&mut conn, &quiz_id, &learner_id).await?;

    Ok(Json(paper.into()))
}

pub(super) async fn submit_attempt(
    Path((quiz_id, learner_id)): Path<(String, String)>,
    State(state): State<AppState>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<Json<SubmitAttemptResponse>, ApiError> {
    validate_path(&quiz_id, &learner_id)?;
    validate_submission(&payload.answers, state.settings().quiz())?;

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to begin transaction"))?;

    let submitted = attempts::submit_attempt(
        &mut tx,
        &quiz_id,
        &learner_id,
        &payload.answers,
        primitive_now_utc(),
    )
    .await?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit submission"))?;

    Ok(Json(SubmitAttemptResponse {
        attempt_id: submitted.attempt.id,
        message: "Quiz submitted".to_string(),
        score: submitted.attempt.score,
        raw_score: submitted.outcome.raw_score,
        max_raw_score: submitted.outcome.max_raw_score,
    }))
}

pub(super) async fn attempt_summary(
    Path((quiz_id, learner_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<SummaryResponse>, ApiError> {
    validate_path(&quiz_id, &learner_id)?;

    let mut conn =
        state.db().acquire().await.map_err(|e| ApiError::internal(e, "Failed to acquire connection"))?;
    let summary = attempts::attempt_summary(&mut conn, &quiz_id, &learner_id).await?;

    Ok(Json(summary.into()))
}
