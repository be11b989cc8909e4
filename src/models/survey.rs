// src/models/survey.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::question::{CreateQuestionRequest, QuestionWithOptions};

/// Survey lifecycle states as stored in `surveys.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyStatus {
    Draft,
    Published,
    Closed,
}

impl SurveyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SurveyStatus::Draft => "draft",
            SurveyStatus::Published => "published",
            SurveyStatus::Closed => "closed",
        }
    }
}

/// Represents the 'surveys' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Survey {
    pub id: i64,

    /// Opaque 32-char public identifier, assigned once at creation.
    pub public_id: String,

    pub title: String,
    pub description: Option<String>,

    /// 'draft', 'published' or 'closed'.
    pub status: String,

    pub is_public: bool,

    /// Flips false -> true on the first submission and never resets.
    pub has_responses: bool,

    pub creator_id: i64,

    pub created_at: chrono::DateTime<chrono::Utc>,

    /// Set once, when the survey is first published.
    pub published_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new survey with its full question/option tree.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSurveyRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Title length must be between 1 and 255 characters."
    ))]
    pub title: String,

    #[validate(length(max = 10000))]
    pub description: Option<String>,

    /// Only "published" is honored; anything else creates a draft.
    pub status: Option<String>,

    #[serde(default)]
    pub is_public: bool,

    #[validate(
        length(min = 1, message = "Survey must have at least one question."),
        nested
    )]
    pub questions: Vec<CreateQuestionRequest>,
}

impl CreateSurveyRequest {
    /// Whether the caller asked for the survey to go live immediately.
    pub fn wants_published(&self) -> bool {
        self.status.as_deref() == Some(SurveyStatus::Published.as_str())
    }
}

/// Response body for a successful survey creation.
#[derive(Debug, Serialize)]
pub struct CreateSurveyResponse {
    pub survey_id: i64,
    pub public_id: String,
}

/// One entry in the public survey listing, with the creator's display name.
#[derive(Debug, Serialize, FromRow)]
pub struct SurveyListItem {
    pub public_id: String,
    pub title: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// A published survey with its ordered question/option tree,
/// as served to respondents.
#[derive(Debug, Serialize)]
pub struct PublicSurvey {
    pub public_id: String,
    pub title: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub questions: Vec<QuestionWithOptions>,
}
