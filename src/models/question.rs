// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::option::{CreateOptionRequest, QuestionOption};

/// Question types as stored in `questions.question_type`.
///
/// `page_break` is a layout marker: it carries no options and no responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    Checkbox,
    ShortAnswer,
    PageBreak,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::Checkbox => "checkbox",
            QuestionType::ShortAnswer => "short_answer",
            QuestionType::PageBreak => "page_break",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "multiple_choice" => Some(QuestionType::MultipleChoice),
            "checkbox" => Some(QuestionType::Checkbox),
            "short_answer" => Some(QuestionType::ShortAnswer),
            "page_break" => Some(QuestionType::PageBreak),
            _ => None,
        }
    }

    /// Choice types own an ordered option list; the others own none.
    pub fn is_choice(&self) -> bool {
        matches!(self, QuestionType::MultipleChoice | QuestionType::Checkbox)
    }
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    pub survey_id: i64,

    /// The prompt shown to respondents.
    pub question_text: String,

    /// 'multiple_choice', 'checkbox', 'short_answer' or 'page_break'.
    pub question_type: String,

    /// Positive, unique within the survey; not necessarily contiguous.
    pub question_order: i32,

    /// Advisory flag for authoring clients; not enforced on submission.
    pub is_required: bool,
}

impl Question {
    pub fn kind(&self) -> Option<QuestionType> {
        QuestionType::parse(&self.question_type)
    }
}

/// DTO for one question inside a survey creation request.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(
        min = 1,
        max = 500,
        message = "Question text length must be between 1 and 500 characters."
    ))]
    pub question_text: String,

    pub question_type: QuestionType,

    #[validate(range(min = 1, message = "Question order must be a positive integer."))]
    pub question_order: i32,

    #[serde(default)]
    pub is_required: bool,

    /// Required non-empty for choice types, forbidden otherwise.
    /// Order is re-assigned server-side.
    #[serde(default)]
    #[validate(nested)]
    pub options: Vec<CreateOptionRequest>,
}

/// A question with its ordered options, as embedded in survey fetches.
#[derive(Debug, Serialize)]
pub struct QuestionWithOptions {
    pub id: i64,
    pub question_text: String,
    pub question_type: String,
    pub question_order: i32,
    pub is_required: bool,
    pub options: Vec<QuestionOption>,
}
