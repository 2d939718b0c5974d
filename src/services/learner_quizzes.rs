use std::collections::HashMap;

use sqlx::PgConnection;
use time::PrimitiveDateTime;

use crate::db::models::{Attempt, Quiz};
use crate::db::types::QuizStatus;
use crate::repositories;
use crate::services::quiz_status::{self, QuizBucket};
use crate::services::scoring::{self, ScoreEntry};

pub(crate) struct LearnerQuiz {
    pub(crate) quiz: Quiz,
    pub(crate) attempted: bool,
    pub(crate) score: Option<f64>,
    /// Only known once the quiz is completed.
    pub(crate) position: Option<usize>,
}

#[derive(Default)]
pub(crate) struct LearnerQuizzes {
    pub(crate) active: Vec<LearnerQuiz>,
    pub(crate) upcoming: Vec<LearnerQuiz>,
    pub(crate) completed: Vec<LearnerQuiz>,
}

impl LearnerQuizzes {
    fn push(&mut self, bucket: QuizBucket, entry: LearnerQuiz) {
        match bucket {
            QuizBucket::Active => self.active.push(entry),
            QuizBucket::Upcoming => self.upcoming.push(entry),
            QuizBucket::Completed => self.completed.push(entry),
        }
    }
}

/// Lists the learner's assigned quizzes, completing any whose end time has
/// passed before sorting them into buckets.
pub(crate) async fn list_for_learner(
    conn: &mut PgConnection,
    learner_id: &str,
    now: PrimitiveDateTime,
) -> Result<LearnerQuizzes, sqlx::Error> {
    let mut quizzes = repositories::quizzes::list_assigned_to_learner(&mut *conn, learner_id).await?;
    quiz_status::sweep_expired(conn, &mut quizzes, now).await?;

    let quiz_ids: Vec<String> = quizzes.iter().map(|quiz| quiz.id.clone()).collect();
    let mut attempts: HashMap<String, Attempt> =
        repositories::attempts::list_by_learner(&mut *conn, learner_id, &quiz_ids)
            .await?
            .into_iter()
            .map(|attempt| (attempt.quiz_id.clone(), attempt))
            .collect();

    let mut listing = LearnerQuizzes::default();

    for quiz in quizzes {
        let attempt = attempts.remove(&quiz.id);
        let attempted = attempt.is_some();

        let position = if attempted && quiz.status == QuizStatus::Completed {
            let entries: Vec<ScoreEntry> =
                repositories::attempts::list_scores_by_quiz(&mut *conn, &quiz.id)
                    .await?
                    .into_iter()
                    .map(|row| ScoreEntry { learner_id: row.learner_id, score: row.score })
                    .collect();
            scoring::rank(&entries, learner_id)
        } else {
            None
        };

        let bucket = quiz_status::classify(quiz.status, quiz.start_time, attempted, now);
        listing.push(
            bucket,
            LearnerQuiz { quiz, attempted, score: attempt.map(|attempt| attempt.score), position },
        );
    }

    Ok(listing)
}
