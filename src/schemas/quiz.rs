use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, macros::format_description};
use time::{OffsetDateTime, PrimitiveDateTime};
use validator::Validate;

use crate::core::time::{format_optional, format_primitive};
use crate::db::models::Quiz;
use crate::db::types::QuizStatus;
use crate::services::scoring::SummaryStatistics;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuizCreate {
    #[validate(length(min = 1, max = 255, message = "title must be 1-255 characters"))]
    pub(crate) title: String,
    #[serde(alias = "durationMinutes")]
    #[validate(range(min = 1, message = "duration_minutes must be positive"))]
    pub(crate) duration_minutes: i32,
    #[serde(alias = "totalMarks")]
    #[validate(range(min = 1, message = "total_marks must be positive"))]
    pub(crate) total_marks: i32,
    #[serde(alias = "startTime", deserialize_with = "deserialize_offset_datetime_flexible")]
    pub(crate) start_time: OffsetDateTime,
    #[serde(
        default,
        alias = "endTime",
        deserialize_with = "deserialize_option_offset_datetime_flexible"
    )]
    pub(crate) end_time: Option<OffsetDateTime>,
    #[serde(default = "default_true", alias = "isActive")]
    pub(crate) is_active: bool,
    #[serde(default, alias = "randomOrder")]
    pub(crate) random_order: bool,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub(crate) struct QuestionAssignment {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    #[serde(default)]
    #[validate(range(min = 1, message = "mark must be positive"))]
    pub(crate) mark: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AssignQuestionsRequest {
    #[validate(length(min = 1, message = "questions must not be empty"), nested)]
    pub(crate) questions: Vec<QuestionAssignment>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AssignLearnersRequest {
    #[serde(alias = "learnerIds")]
    #[validate(length(min = 1, message = "learner_ids must not be empty"))]
    pub(crate) learner_ids: Vec<String>,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuizzesQuery {
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "default_limit")]
    pub(crate) limit: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) duration_minutes: i32,
    pub(crate) total_marks: i32,
    pub(crate) start_time: String,
    pub(crate) end_time: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) status: QuizStatus,
    pub(crate) random_order: bool,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl From<Quiz> for QuizResponse {
    fn from(quiz: Quiz) -> Self {
        Self {
            id: quiz.id,
            title: quiz.title,
            duration_minutes: quiz.duration_minutes,
            total_marks: quiz.total_marks,
            start_time: format_primitive(quiz.start_time),
            end_time: format_optional(quiz.end_time),
            is_active: quiz.is_active,
            status: quiz.status,
            random_order: quiz.random_order,
            created_at: format_primitive(quiz.created_at),
            updated_at: format_primitive(quiz.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignmentResponse {
    pub(crate) quiz_id: String,
    pub(crate) requested: usize,
    pub(crate) added: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizStatisticsResponse {
    pub(crate) quiz_id: String,
    pub(crate) title: String,
    pub(crate) status: QuizStatus,
    pub(crate) total_marks: i32,
    pub(crate) students_attempted: usize,
    pub(crate) average_marks: f64,
    pub(crate) median_marks: f64,
    pub(crate) highest_marks: f64,
    pub(crate) lowest_marks: f64,
}

impl QuizStatisticsResponse {
    pub(crate) fn new(quiz: Quiz, statistics: SummaryStatistics) -> Self {
        Self {
            quiz_id: quiz.id,
            title: quiz.title,
            status: quiz.status,
            total_marks: quiz.total_marks,
            students_attempted: statistics.count,
            average_marks: statistics.mean,
            median_marks: statistics.median,
            highest_marks: statistics.max,
            lowest_marks: statistics.min,
        }
    }
}

fn default_true() -> bool {
    true
}

/// RFC 3339, or a naive `YYYY-MM-DDTHH:MM[:SS]` read as UTC.
fn parse_offset_datetime_flexible(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Some(value.assume_utc());
    }

    PrimitiveDateTime::parse(raw, &format_description!("[year]-[month]-[day]T[hour]:[minute]"))
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

fn deserialize_offset_datetime_flexible<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_offset_datetime_flexible(raw.trim())
        .ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}")))
}

fn deserialize_option_offset_datetime_flexible<'de, D>(
    deserializer: D,
) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => parse_offset_datetime_flexible(value.trim())
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid datetime: {value}"))),
    }
}
