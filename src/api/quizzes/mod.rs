mod attempts;
mod instructor;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(instructor::list_quizzes).post(instructor::create_quiz))
        .route("/:quiz_id/questions", post(instructor::assign_questions))
        .route("/:quiz_id/learners", post(instructor::assign_learners))
        .route("/:quiz_id/toggle-status", post(instructor::toggle_status))
        .route("/:quiz_id/toggle-active", post(instructor::toggle_active))
        .route("/:quiz_id/statistics", get(instructor::quiz_statistics))
        .route("/:quiz_id/attempts/:learner_id", post(attempts::start_attempt))
        .route("/:quiz_id/attempts/:learner_id/questions", get(attempts::ordered_questions))
        .route("/:quiz_id/attempts/:learner_id/submit", post(attempts::submit_attempt))
        .route("/:quiz_id/attempts/:learner_id/summary", get(attempts::attempt_summary))
}

#[cfg(test)]
mod tests;
