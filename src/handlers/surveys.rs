// src/handlers/surveys.rs

use std::collections::{HashMap, HashSet};

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        option::QuestionOption,
        question::{Question, QuestionWithOptions},
        survey::{CreateSurveyRequest, CreateSurveyResponse, PublicSurvey, Survey, SurveyListItem},
    },
    utils::{html::clean_text, jwt::Claims},
};

/// Cross-field rules the derive annotations cannot express:
/// choice questions need options, the others must not carry any, and
/// question order values must be unique within the survey.
fn validate_question_tree(payload: &CreateSurveyRequest) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen_orders = HashSet::new();

    for (idx, question) in payload.questions.iter().enumerate() {
        if question.question_type.is_choice() {
            if question.options.is_empty() {
                errors.push(format!(
                    "questions[{}]: {} questions need at least one option",
                    idx,
                    question.question_type.as_str()
                ));
            }
        } else if !question.options.is_empty() {
            errors.push(format!(
                "questions[{}]: {} questions cannot have options",
                idx,
                question.question_type.as_str()
            ));
        }

        if !seen_orders.insert(question.question_order) {
            errors.push(format!(
                "questions[{}]: duplicate question_order {}",
                idx, question.question_order
            ));
        }
    }

    errors
}

/// Creates a new survey with its full question/option tree.
///
/// The survey, its questions and their options are persisted as one
/// transaction: either the whole tree becomes visible or none of it does.
/// Option order is re-assigned contiguously (1-based) server-side, so the
/// per-question uniqueness invariant never depends on client input.
pub async fn create_survey(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateSurveyRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::validation(validation_errors.to_string()));
    }
    let tree_errors = validate_question_tree(&payload);
    if !tree_errors.is_empty() {
        return Err(AppError::Validation(tree_errors));
    }

    let creator_id = claims.user_id();
    let public_id = Uuid::new_v4().simple().to_string();
    let publish = payload.wants_published();

    let mut tx = pool.begin().await?;

    let survey = sqlx::query_as::<_, Survey>(
        r#"
        INSERT INTO surveys (public_id, title, description, status, is_public, creator_id, published_at)
        VALUES ($1, $2, $3, $4, $5, $6, CASE WHEN $4 = 'published' THEN NOW() END)
        RETURNING id, public_id, title, description, status, is_public, has_responses,
                  creator_id, created_at, published_at
        "#,
    )
    .bind(&public_id)
    .bind(clean_text(&payload.title))
    .bind(payload.description.as_deref().map(clean_text))
    .bind(if publish { "published" } else { "draft" })
    .bind(payload.is_public)
    .bind(creator_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if e.to_string().contains("surveys_public_id_key") {
            // Collision on the generated public id; retryable.
            AppError::Conflict("Public identifier collision, please retry".to_string())
        } else {
            tracing::error!("Failed to create survey: {:?}", e);
            AppError::from(e)
        }
    })?;

    for question in &payload.questions {
        let question_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO questions (survey_id, question_text, question_type, question_order, is_required)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(survey.id)
        .bind(clean_text(&question.question_text))
        .bind(question.question_type.as_str())
        .bind(question.question_order)
        .bind(question.is_required)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create question: {:?}", e);
            AppError::from(e)
        })?;

        if !question.options.is_empty() {
            let mut builder: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO options (question_id, option_text, option_order) ");
            builder.push_values(question.options.iter().enumerate(), |mut b, (idx, option)| {
                b.push_bind(question_id)
                    .push_bind(clean_text(&option.option_text))
                    .push_bind((idx + 1) as i32);
            });
            builder.build().execute(&mut *tx).await.map_err(|e| {
                tracing::error!("Failed to create options: {:?}", e);
                AppError::from(e)
            })?;
        }
    }

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateSurveyResponse {
            survey_id: survey.id,
            public_id: survey.public_id,
        }),
    ))
}

/// Lists published, public surveys (newest first) with creator names.
pub async fn list_surveys(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let surveys = sqlx::query_as::<_, SurveyListItem>(
        r#"
        SELECT s.public_id, s.title, s.created_at, u.first_name, u.last_name
        FROM surveys s
        JOIN users u ON s.creator_id = u.id
        WHERE s.status = 'published' AND s.is_public = TRUE
        ORDER BY s.created_at DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list surveys: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(surveys))
}

/// Fetches a published survey by its public identifier, with questions in
/// question order and options in option order. Unpublished surveys 404,
/// whether or not they exist.
pub async fn get_survey(
    State(pool): State<PgPool>,
    Path(public_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let survey = sqlx::query_as::<_, Survey>(
        r#"
        SELECT id, public_id, title, description, status, is_public, has_responses,
               creator_id, created_at, published_at
        FROM surveys
        WHERE public_id = $1 AND status = 'published'
        "#,
    )
    .bind(&public_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound(
        "Survey not found or not published".to_string(),
    ))?;

    let questions = fetch_question_tree(&pool, survey.id).await?;

    Ok(Json(PublicSurvey {
        public_id: survey.public_id,
        title: survey.title,
        description: survey.description,
        is_public: survey.is_public,
        created_at: survey.created_at,
        questions,
    }))
}

/// Loads a survey's questions with their options, both fully ordered.
pub async fn fetch_question_tree(
    pool: &PgPool,
    survey_id: i64,
) -> Result<Vec<QuestionWithOptions>, AppError> {
    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, survey_id, question_text, question_type, question_order, is_required
        FROM questions
        WHERE survey_id = $1
        ORDER BY question_order ASC
        "#,
    )
    .bind(survey_id)
    .fetch_all(pool)
    .await?;

    let options = sqlx::query_as::<_, QuestionOption>(
        r#"
        SELECT o.id, o.question_id, o.option_text, o.option_order
        FROM options o
        JOIN questions q ON o.question_id = q.id
        WHERE q.survey_id = $1
        ORDER BY o.question_id, o.option_order ASC
        "#,
    )
    .bind(survey_id)
    .fetch_all(pool)
    .await?;

    let mut by_question: HashMap<i64, Vec<QuestionOption>> = HashMap::new();
    for option in options {
        by_question.entry(option.question_id).or_default().push(option);
    }

    Ok(questions
        .into_iter()
        .map(|q| {
            let options = by_question.remove(&q.id).unwrap_or_default();
            QuestionWithOptions {
                id: q.id,
                question_text: q.question_text,
                question_type: q.question_type,
                question_order: q.question_order,
                is_required: q.is_required,
                options,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::option::CreateOptionRequest;
    use crate::models::question::{CreateQuestionRequest, QuestionType};

    fn question(
        kind: QuestionType,
        order: i32,
        options: &[&str],
    ) -> CreateQuestionRequest {
        CreateQuestionRequest {
            question_text: "q".to_string(),
            question_type: kind,
            question_order: order,
            is_required: false,
            options: options
                .iter()
                .map(|o| CreateOptionRequest {
                    option_text: o.to_string(),
                })
                .collect(),
        }
    }

    fn request(questions: Vec<CreateQuestionRequest>) -> CreateSurveyRequest {
        CreateSurveyRequest {
            title: "t".to_string(),
            description: None,
            status: None,
            is_public: false,
            questions,
        }
    }

    #[test]
    fn accepts_well_formed_tree() {
        let payload = request(vec![
            question(QuestionType::MultipleChoice, 1, &["a", "b"]),
            question(QuestionType::ShortAnswer, 2, &[]),
            question(QuestionType::PageBreak, 3, &[]),
        ]);
        assert!(validate_question_tree(&payload).is_empty());
    }

    #[test]
    fn rejects_choice_without_options() {
        let payload = request(vec![question(QuestionType::Checkbox, 1, &[])]);
        let errors = validate_question_tree(&payload);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("at least one option"));
    }

    #[test]
    fn rejects_options_on_non_choice_questions() {
        let payload = request(vec![question(QuestionType::ShortAnswer, 1, &["a"])]);
        assert_eq!(validate_question_tree(&payload).len(), 1);
    }

    #[test]
    fn rejects_duplicate_question_orders() {
        let payload = request(vec![
            question(QuestionType::ShortAnswer, 2, &[]),
            question(QuestionType::ShortAnswer, 2, &[]),
        ]);
        let errors = validate_question_tree(&payload);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("duplicate question_order"));
    }
}
