use serde::Serialize;
use sqlx::PgConnection;
use time::PrimitiveDateTime;

use crate::db::models::Quiz;
use crate::db::types::QuizStatus;
use crate::repositories;

/// The status a quiz should move to at `now`, if any. Only ACTIVE quizzes with
/// an end time strictly in the past complete; nothing ever reopens here.
pub(crate) fn swept_status(
    status: QuizStatus,
    end_time: Option<PrimitiveDateTime>,
    now: PrimitiveDateTime,
) -> Option<QuizStatus> {
    match (status, end_time) {
        (QuizStatus::Active, Some(end)) if end < now => Some(QuizStatus::Completed),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum QuizBucket {
    Active,
    Upcoming,
    Completed,
}

/// Where a quiz lands in a learner's listing. Anything the learner has
/// attempted counts as completed for them, whatever the quiz status.
pub(crate) fn classify(
    status: QuizStatus,
    start_time: PrimitiveDateTime,
    attempted: bool,
    now: PrimitiveDateTime,
) -> QuizBucket {
    if attempted {
        return QuizBucket::Completed;
    }
    if start_time > now {
        return QuizBucket::Upcoming;
    }
    match status {
        QuizStatus::Completed => QuizBucket::Completed,
        QuizStatus::Active => QuizBucket::Active,
    }
}

/// Completes every quiz in `quizzes` whose end time has passed, persisting each
/// flip before returning. Returns how many quizzes changed.
pub(crate) async fn sweep_expired(
    conn: &mut PgConnection,
    quizzes: &mut [Quiz],
    now: PrimitiveDateTime,
) -> Result<usize, sqlx::Error> {
    let mut completed = 0;

    for quiz in quizzes.iter_mut() {
        let Some(next) = swept_status(quiz.status, quiz.end_time, now) else {
            continue;
        };

        let changed = repositories::quizzes::complete_if_active(&mut *conn, &quiz.id, now).await?;
        quiz.status = next;
        quiz.updated_at = now;

        if changed {
            completed += 1;
            tracing::info!(quiz_id = %quiz.id, "Quiz auto-completed after its end time");
        }
    }

    if completed > 0 {
        metrics::counter!(crate::core::metrics::STATUS_SWEEPS).increment(completed as u64);
    }

    Ok(completed)
}
