// src/models/submission.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'submissions' table in the database.
/// `user_id` is NULL for anonymous submissions.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub survey_id: i64,
    pub user_id: Option<i64>,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

/// One raw answer entry as submitted by a respondent.
///
/// Checkbox questions appear once per selected option, so several entries
/// may share a `question_id`.
#[derive(Debug, Deserialize)]
pub struct AnswerEntry {
    pub question_id: i64,
    pub selected_option_id: Option<i64>,
    pub response_text: Option<String>,
}

/// DTO for submitting responses to a survey.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub answers: Vec<AnswerEntry>,
}

/// One entry in a user's participation history.
#[derive(Debug, Serialize)]
pub struct ParticipationEntry {
    pub submission_id: i64,
    pub date: chrono::DateTime<chrono::Utc>,
    pub survey_title: String,
    pub survey_description: Option<String>,
    pub answers: Vec<ParticipationAnswer>,
}

/// One answered question within a participation history entry.
/// The `response` field uses the shared answer-resolution rule.
#[derive(Debug, Serialize)]
pub struct ParticipationAnswer {
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: String,
    pub response: String,
}
