use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::validation::validate_identifier;
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, to_primitive_utc};
use crate::db::models::Quiz;
use crate::repositories;
use crate::repositories::quizzes::{AssignQuestion, CreateQuiz};
use crate::schemas::quiz::{
    AssignLearnersRequest, AssignQuestionsRequest, AssignmentResponse, ListQuizzesQuery,
    QuizCreate, QuizResponse, QuizStatisticsResponse,
};
use crate::services::attempts;
use crate::services::grading::DEFAULT_MARK;

pub(super) async fn create_quiz(
    State(state): State<AppState>,
    Json(payload): Json<QuizCreate>,
) -> Result<(StatusCode, Json<QuizResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if let Some(end_time) = payload.end_time {
        if end_time <= payload.start_time {
            return Err(ApiError::BadRequest("end_time must be after start_time".to_string()));
        }
    }

    let quiz = repositories::quizzes::create(
        state.db(),
        CreateQuiz {
            id: &Uuid::new_v4().to_string(),
            title: payload.title.trim(),
            duration_minutes: payload.duration_minutes,
            total_marks: payload.total_marks,
            start_time: to_primitive_utc(payload.start_time),
            end_time: payload.end_time.map(to_primitive_utc),
            is_active: payload.is_active,
            random_order: payload.random_order,
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create quiz"))?;

    tracing::info!(quiz_id = %quiz.id, random_order = quiz.random_order, "Quiz created");

    Ok((StatusCode::CREATED, Json(quiz.into())))
}

pub(super) async fn list_quizzes(
    State(state): State<AppState>,
    Query(params): Query<ListQuizzesQuery>,
) -> Result<Json<Vec<QuizResponse>>, ApiError> {
    let quizzes = repositories::quizzes::list(state.db(), params.skip, params.limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list quizzes"))?;

    Ok(Json(quizzes.into_iter().map(QuizResponse::from).collect()))
}

async fn lock_quiz(conn: &mut sqlx::PgConnection, quiz_id: &str) -> Result<Quiz, ApiError> {
    repositories::quizzes::find_for_update(conn, quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch quiz"))?
        .ok_or_else(|| ApiError::NotFound("Quiz not found".to_string()))
}

pub(super) async fn assign_questions(
    Path(quiz_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<AssignQuestionsRequest>,
) -> Result<Json<AssignmentResponse>, ApiError> {
    validate_identifier("quiz_id", &quiz_id)?;
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let mut seen = HashSet::new();
    let requested: Vec<AssignQuestion<'_>> = payload
        .questions
        .iter()
        .filter(|entry| seen.insert(entry.question_id.as_str()))
        .map(|entry| AssignQuestion {
            question_id: &entry.question_id,
            mark: entry.mark.unwrap_or(DEFAULT_MARK),
        })
        .collect();
    let requested_ids: Vec<String> =
        requested.iter().map(|entry| entry.question_id.to_string()).collect();

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to begin transaction"))?;
    lock_quiz(&mut tx, &quiz_id).await?;

    let existing: HashSet<String> =
        repositories::questions::list_existing_ids(&mut *tx, &requested_ids)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to look up questions"))?
            .into_iter()
            .collect();
    if let Some(missing) = requested_ids.iter().find(|id| !existing.contains(*id)) {
        return Err(ApiError::NotFound(format!("Question {missing} not found")));
    }

    let added = repositories::quizzes::assign_questions(&mut *tx, &quiz_id, &requested)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to assign questions"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit assignment"))?;

    tracing::info!(quiz_id = %quiz_id, requested = requested.len(), added, "Questions assigned");

    Ok(Json(AssignmentResponse { quiz_id, requested: requested.len(), added }))
}

pub(super) async fn assign_learners(
    Path(quiz_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<AssignLearnersRequest>,
) -> Result<Json<AssignmentResponse>, ApiError> {
    validate_identifier("quiz_id", &quiz_id)?;
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    for learner_id in &payload.learner_ids {
        validate_identifier("learner_id", learner_id)?;
    }

    let mut seen = HashSet::new();
    let learner_ids: Vec<String> =
        payload.learner_ids.into_iter().filter(|id| seen.insert(id.clone())).collect();

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to begin transaction"))?;
    lock_quiz(&mut tx, &quiz_id).await?;

    let added = repositories::assignments::assign_learners(
        &mut *tx,
        &quiz_id,
        &learner_ids,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to assign learners"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit assignment"))?;

    tracing::info!(quiz_id = %quiz_id, requested = learner_ids.len(), added, "Learners assigned");

    Ok(Json(AssignmentResponse { quiz_id, requested: learner_ids.len(), added }))
}

/// The only way a completed quiz becomes active again.
pub(super) async fn toggle_status(
    Path(quiz_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<QuizResponse>, ApiError> {
    validate_identifier("quiz_id", &quiz_id)?;

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to begin transaction"))?;
    let quiz = lock_quiz(&mut tx, &quiz_id).await?;

    let next = quiz.status.toggled();
    let quiz = repositories::quizzes::update_status(&mut *tx, &quiz_id, next, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update quiz status"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit quiz status"))?;

    tracing::info!(quiz_id = %quiz.id, status = ?quiz.status, "Quiz status toggled");

    Ok(Json(quiz.into()))
}

pub(super) async fn toggle_active(
    Path(quiz_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<QuizResponse>, ApiError> {
    validate_identifier("quiz_id", &quiz_id)?;

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to begin transaction"))?;
    let quiz = lock_quiz(&mut tx, &quiz_id).await?;

    let quiz =
        repositories::quizzes::update_active(&mut *tx, &quiz_id, !quiz.is_active, primitive_now_utc())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to update quiz"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit quiz"))?;

    tracing::info!(quiz_id = %quiz.id, is_active = quiz.is_active, "Quiz visibility toggled");

    Ok(Json(quiz.into()))
}

pub(super) async fn quiz_statistics(
    Path(quiz_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<QuizStatisticsResponse>, ApiError> {
    validate_identifier("quiz_id", &quiz_id)?;

    let mut conn =
        state.db().acquire().await.map_err(|e| ApiError::internal(e, "Failed to acquire connection"))?;
    let (quiz, statistics) = attempts::quiz_statistics(&mut conn, &quiz_id).await?;

    Ok(Json(QuizStatisticsResponse::new(quiz, statistics)))
}
