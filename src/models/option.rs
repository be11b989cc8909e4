// src/models/option.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'options' table in the database.
///
/// Named `QuestionOption` to avoid the obvious clash with `std::option`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: i64,

    pub question_id: i64,

    pub option_text: String,

    /// Contiguous 1-based position, assigned by the authoring service.
    pub option_order: i32,
}

/// DTO for one option inside a question creation request.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateOptionRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Option text length must be between 1 and 255 characters."
    ))]
    pub option_text: String,
}
