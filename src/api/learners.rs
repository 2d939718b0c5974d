use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::validation::validate_identifier;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::schemas::attempt::LearnerQuizListResponse;
use crate::services::learner_quizzes;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/:learner_id/quizzes", get(list_quizzes))
}

/// Completing expired quizzes writes, so the listing runs in a transaction.
async fn list_quizzes(
    Path(learner_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<LearnerQuizListResponse>, ApiError> {
    validate_identifier("learner_id", &learner_id)?;

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to begin transaction"))?;

    let listing = learner_quizzes::list_for_learner(&mut tx, &learner_id, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list learner quizzes"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit listing"))?;

    Ok(Json(listing.into()))
}
