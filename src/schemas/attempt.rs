use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::time::{format_optional, format_primitive};
use crate::db::types::{QuestionType, QuizStatus};
use crate::services::attempts::{AttemptSummary, OrderedPaper, PaperQuestion, ReviewedAnswer};
use crate::services::grading::CorrectAnswer;
use crate::services::learner_quizzes::{LearnerQuiz, LearnerQuizzes};

#[derive(Debug, Serialize)]
pub(crate) struct StartAttemptResponse {
    pub(crate) attempt_id: String,
    pub(crate) message: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct OptionResponse {
    pub(crate) text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct OrderedQuestionResponse {
    pub(crate) question_id: String,
    pub(crate) text: String,
    pub(crate) question_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) options: Option<Vec<OptionResponse>>,
}

impl From<PaperQuestion> for OrderedQuestionResponse {
    fn from(entry: PaperQuestion) -> Self {
        let show_options = entry.question.kind().is_some_and(QuestionType::has_options);
        let options = show_options.then(|| {
            entry.options.into_iter().map(|option| OptionResponse { text: option.text }).collect()
        });

        Self {
            question_id: entry.question.id,
            text: entry.question.question_text,
            question_type: entry.question.question_type,
            options,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct OrderedQuestionsResponse {
    pub(crate) quiz_id: String,
    pub(crate) title: String,
    pub(crate) duration_minutes: i32,
    pub(crate) total_marks: i32,
    pub(crate) questions: Vec<OrderedQuestionResponse>,
}

impl From<OrderedPaper> for OrderedQuestionsResponse {
    fn from(paper: OrderedPaper) -> Self {
        Self {
            quiz_id: paper.quiz.id,
            title: paper.quiz.title,
            duration_minutes: paper.quiz.duration_minutes,
            total_marks: paper.quiz.total_marks,
            questions: paper.questions.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitAttemptRequest {
    #[serde(default)]
    pub(crate) answers: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitAttemptResponse {
    pub(crate) attempt_id: String,
    pub(crate) message: String,
    pub(crate) score: f64,
    pub(crate) raw_score: i64,
    pub(crate) max_raw_score: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct SummaryAnswerResponse {
    pub(crate) question_id: String,
    pub(crate) question: String,
    pub(crate) correct_answer: Option<CorrectAnswer>,
    pub(crate) your_answer: String,
    pub(crate) is_correct: bool,
    pub(crate) marks_awarded: i32,
    pub(crate) feedback: Option<String>,
}

impl From<ReviewedAnswer> for SummaryAnswerResponse {
    fn from(answer: ReviewedAnswer) -> Self {
        Self {
            question_id: answer.question_id,
            question: answer.question_text,
            correct_answer: answer.correct_answer,
            your_answer: answer.given_answer,
            is_correct: answer.is_correct,
            marks_awarded: answer.marks_awarded,
            feedback: answer.feedback,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SummaryResponse {
    pub(crate) quiz_id: String,
    pub(crate) quiz_title: String,
    pub(crate) total_marks: i32,
    pub(crate) your_score: f64,
    pub(crate) submitted_at: Option<String>,
    pub(crate) students_attempted: usize,
    pub(crate) average_marks: f64,
    pub(crate) median_marks: f64,
    pub(crate) highest_marks: f64,
    pub(crate) lowest_marks: f64,
    pub(crate) answers: Vec<SummaryAnswerResponse>,
}

impl From<AttemptSummary> for SummaryResponse {
    fn from(summary: AttemptSummary) -> Self {
        Self {
            quiz_id: summary.quiz.id,
            quiz_title: summary.quiz.title,
            total_marks: summary.quiz.total_marks,
            your_score: summary.attempt.score,
            submitted_at: format_optional(summary.attempt.submitted_at),
            students_attempted: summary.statistics.count,
            average_marks: summary.statistics.mean,
            median_marks: summary.statistics.median,
            highest_marks: summary.statistics.max,
            lowest_marks: summary.statistics.min,
            answers: summary.answers.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LearnerQuizResponse {
    pub(crate) quiz_id: String,
    pub(crate) title: String,
    pub(crate) start_time: String,
    pub(crate) end_time: Option<String>,
    pub(crate) duration_minutes: i32,
    pub(crate) total_marks: i32,
    pub(crate) status: QuizStatus,
    pub(crate) attempted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) position: Option<usize>,
}

impl From<LearnerQuiz> for LearnerQuizResponse {
    fn from(entry: LearnerQuiz) -> Self {
        Self {
            quiz_id: entry.quiz.id,
            title: entry.quiz.title,
            start_time: format_primitive(entry.quiz.start_time),
            end_time: format_optional(entry.quiz.end_time),
            duration_minutes: entry.quiz.duration_minutes,
            total_marks: entry.quiz.total_marks,
            status: entry.quiz.status,
            attempted: entry.attempted,
            score: entry.score,
            position: entry.position,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LearnerQuizListResponse {
    pub(crate) active: Vec<LearnerQuizResponse>,
    pub(crate) upcoming: Vec<LearnerQuizResponse>,
    pub(crate) completed: Vec<LearnerQuizResponse>,
}

impl From<LearnerQuizzes> for LearnerQuizListResponse {
    fn from(listing: LearnerQuizzes) -> Self {
        Self {
            active: listing.active.into_iter().map(Into::into).collect(),
            upcoming: listing.upcoming.into_iter().map(Into::into).collect(),
            completed: listing.completed.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{Question, QuestionOption};
    use time::macros::datetime;

    fn paper_question(question_type: &str, options: &[&str]) -> PaperQuestion {
        PaperQuestion {
            question: Question {
                id: "q1".to_string(),
                question_text: "Pick one".to_string(),
                question_type: question_type.to_string(),
                correct_answer: None,
                feedback: None,
                created_at: datetime!(2025-01-01 00:00),
            },
            options: options
                .iter()
                .enumerate()
                .map(|(index, text)| QuestionOption {
                    id: format!("o{index}"),
                    question_id: "q1".to_string(),
                    text: text.to_string(),
                    is_correct: index == 0,
                    order_index: index as i32,
                })
                .collect(),
        }
    }

    #[test]
    fn fill_blank_questions_omit_options() {
        let response = OrderedQuestionResponse::from(paper_question("FILL_BLANK", &[]));
        let value = serde_json::to_value(&response).expect("json");
        assert!(value.get("options").is_none());
        assert_eq!(value["question_type"], "FILL_BLANK");
    }

    #[test]
    fn choice_questions_list_option_texts_only() {
        let response = OrderedQuestionResponse::from(paper_question("MCQ", &["A", "B"]));
        let value = serde_json::to_value(&response).expect("json");
        assert_eq!(value["options"], serde_json::json!([{ "text": "A" }, { "text": "B" }]));
    }

    #[test]
    fn unknown_question_types_hide_their_options() {
        let response = OrderedQuestionResponse::from(paper_question("ESSAY", &["A", "B"]));
        let value = serde_json::to_value(&response).expect("json");
        assert!(value.get("options").is_none());
    }

    #[test]
    fn submit_request_defaults_to_no_answers() {
        let request: SubmitAttemptRequest =
            serde_json::from_value(serde_json::json!({})).expect("payload");
        assert!(request.answers.is_empty());
    }
}
