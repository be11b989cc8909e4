// src/models/response.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'responses' table in the database.
///
/// One row is exactly one answer unit: a checkbox question with three
/// selections produces three rows sharing the same `submission_id` and
/// `question_id`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Response {
    pub id: i64,
    pub submission_id: i64,
    pub question_id: i64,

    /// Set only for choice-type answers; must belong to `question_id`.
    pub selected_option_id: Option<i64>,

    /// Set only for short-answer responses.
    pub response_text: Option<String>,
}

/// Aggregated count for one option of a choice-type question.
/// Options with zero responses are always present.
#[derive(Debug, Serialize, PartialEq)]
pub struct OptionCount {
    pub option_text: String,
    pub count: i64,
}

/// Per-question result set returned by the results endpoint.
#[derive(Debug, Serialize)]
pub struct QuestionResults {
    pub question_id: i64,
    pub question_text: String,
    pub question_type: String,
    pub answers: QuestionAnswers,
}

/// Either per-option counts (choice types) or a sample of recent texts
/// (short answer). Page breaks serialize as an empty list.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum QuestionAnswers {
    Counts(Vec<OptionCount>),
    Texts(Vec<String>),
}

/// Survey metadata attached to the results payload.
#[derive(Debug, Serialize)]
pub struct SurveyResultsMeta {
    pub title: String,
    pub description: Option<String>,
    pub total_submissions: usize,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Ascending submission timestamps, for trend charting.
    pub submission_dates: Vec<chrono::DateTime<chrono::Utc>>,
}

/// Full results payload: metadata plus per-question aggregates.
#[derive(Debug, Serialize)]
pub struct SurveyResults {
    pub survey: SurveyResultsMeta,
    pub results: Vec<QuestionResults>,
}
