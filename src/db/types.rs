use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "quizstatus", rename_all = "UPPERCASE")]
pub(crate) enum QuizStatus {
    Active,
    Completed,
}

impl QuizStatus {
    pub(crate) fn toggled(self) -> Self {
        match self {
            QuizStatus::Active => QuizStatus::Completed,
            QuizStatus::Completed => QuizStatus::Active,
        }
    }
}

/// Question kinds the grader understands.
///
/// Stored as free text in `questions.question_type` because the bank is owned by
/// the authoring side; values that do not parse stay unsupported and are never
/// graded correct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum QuestionType {
    Mcq,
    MultiSelect,
    TrueFalse,
    FillBlank,
}

impl QuestionType {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            QuestionType::Mcq => "MCQ",
            QuestionType::MultiSelect => "MULTI_SELECT",
            QuestionType::TrueFalse => "TRUE_FALSE",
            QuestionType::FillBlank => "FILL_BLANK",
        }
    }

    pub(crate) fn has_options(self) -> bool {
        !matches!(self, QuestionType::FillBlank)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UnknownQuestionType(pub(crate) String);

impl FromStr for QuestionType {
    type Err = UnknownQuestionType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "MCQ" => Ok(QuestionType::Mcq),
            "MULTI_SELECT" => Ok(QuestionType::MultiSelect),
            "TRUE_FALSE" => Ok(QuestionType::TrueFalse),
            "FILL_BLANK" => Ok(QuestionType::FillBlank),
            other => Err(UnknownQuestionType(other.to_string())),
        }
    }
}
