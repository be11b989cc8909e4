// src/handlers/results.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::{FromRow, PgPool};

use crate::{
    config::TEXT_SAMPLE_LIMIT,
    error::AppError,
    models::{
        option::QuestionOption,
        question::{Question, QuestionType},
        response::{OptionCount, QuestionAnswers, QuestionResults, SurveyResults, SurveyResultsMeta},
        survey::Survey,
    },
    utils::jwt::Claims,
};

#[derive(FromRow)]
struct OptionCountRow {
    selected_option_id: i64,
    count: i64,
}

/// Loads a survey owned by the requester, by numeric id.
/// Shared precondition of the results and export endpoints.
pub async fn fetch_owned_survey(
    pool: &PgPool,
    survey_id: i64,
    requester_id: i64,
) -> Result<Survey, AppError> {
    let survey = sqlx::query_as::<_, Survey>(
        r#"
        SELECT id, public_id, title, description, status, is_public, has_responses,
               creator_id, created_at, published_at
        FROM surveys
        WHERE id = $1
        "#,
    )
    .bind(survey_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Survey not found".to_string()))?;

    if survey.creator_id != requester_id {
        return Err(AppError::Forbidden(
            "Access denied. You are not the creator of this survey.".to_string(),
        ));
    }

    Ok(survey)
}

/// Computes per-question aggregates for the survey creator.
///
/// Choice questions report one count per option, in option order, with
/// zero-count options always present: the group-by only sees options that
/// actually received responses, so the full option list is walked and the
/// missing keys are backfilled with 0 here. Short-answer questions return
/// a bounded sample of the most recent texts. Page breaks report nothing.
pub async fn survey_results(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(survey_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let survey = fetch_owned_survey(&pool, survey_id, claims.user_id()).await?;

    let submission_dates: Vec<chrono::DateTime<chrono::Utc>> = sqlx::query_scalar(
        "SELECT submitted_at FROM submissions WHERE survey_id = $1 ORDER BY submitted_at ASC",
    )
    .bind(survey.id)
    .fetch_all(&pool)
    .await?;

    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, survey_id, question_text, question_type, question_order, is_required
        FROM questions
        WHERE survey_id = $1
        ORDER BY question_order ASC
        "#,
    )
    .bind(survey.id)
    .fetch_all(&pool)
    .await?;

    let mut results = Vec::with_capacity(questions.len());

    for question in questions {
        let answers = match question.kind() {
            Some(kind) if kind.is_choice() => {
                let options = sqlx::query_as::<_, QuestionOption>(
                    r#"
                    SELECT id, question_id, option_text, option_order
                    FROM options
                    WHERE question_id = $1
                    ORDER BY option_order ASC
                    "#,
                )
                .bind(question.id)
                .fetch_all(&pool)
                .await?;

                let counts: HashMap<i64, i64> = sqlx::query_as::<_, OptionCountRow>(
                    r#"
                    SELECT selected_option_id, COUNT(*) AS count
                    FROM responses
                    WHERE question_id = $1 AND selected_option_id IS NOT NULL
                    GROUP BY selected_option_id
                    "#,
                )
                .bind(question.id)
                .fetch_all(&pool)
                .await?
                .into_iter()
                .map(|row| (row.selected_option_id, row.count))
                .collect();

                QuestionAnswers::Counts(
                    options
                        .into_iter()
                        .map(|opt| OptionCount {
                            option_text: opt.option_text,
                            count: counts.get(&opt.id).copied().unwrap_or(0),
                        })
                        .collect(),
                )
            }
            Some(QuestionType::ShortAnswer) => {
                let texts: Vec<String> = sqlx::query_scalar(
                    r#"
                    SELECT response_text
                    FROM responses
                    WHERE question_id = $1 AND response_text IS NOT NULL
                    ORDER BY id DESC
                    LIMIT $2
                    "#,
                )
                .bind(question.id)
                .bind(TEXT_SAMPLE_LIMIT)
                .fetch_all(&pool)
                .await?;

                QuestionAnswers::Texts(texts)
            }
            // Page breaks carry no responses; unknown types aggregate as
            // nothing rather than failing the whole report.
            _ => QuestionAnswers::Texts(Vec::new()),
        };

        results.push(QuestionResults {
            question_id: question.id,
            question_text: question.question_text,
            question_type: question.question_type,
            answers,
        });
    }

    Ok(Json(SurveyResults {
        survey: SurveyResultsMeta {
            title: survey.title,
            description: survey.description,
            total_submissions: submission_dates.len(),
            created_at: survey.created_at,
            submission_dates,
        },
        results,
    }))
}
