// src/handlers/submissions.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::{
    config::Config,
    error::AppError,
    models::{
        question::QuestionType,
        submission::{ParticipationAnswer, ParticipationEntry, SubmitRequest, Submission},
        survey::Survey,
    },
    utils::{
        answers::{AnswerSource, AnswerValue, resolve_answer, validate_answers},
        html::clean_text,
        jwt::{Claims, optional_claims},
    },
};

#[derive(FromRow)]
struct QuestionTypeRow {
    id: i64,
    question_type: String,
}

#[derive(FromRow)]
struct OptionOwnerRow {
    id: i64,
    question_id: i64,
}

/// Records one submission with its responses.
///
/// Works anonymously; a valid bearer token attributes the submission to the
/// caller. The survey must be published — drafts and closed surveys are
/// indistinguishable from missing ones. The submission row, every response
/// row and the conditional `has_responses` flip commit as one transaction.
pub async fn submit_survey(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    headers: HeaderMap,
    Path(public_id): Path<String>,
    Json(payload): Json<SubmitRequest>,
) -> Result<impl IntoResponse, AppError> {
    let submitter_id = optional_claims(&headers, &config.jwt_secret).map(|c| c.user_id());

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
        "Survey not found or not accepting responses".to_string(),
    ))?;

    let question_types: HashMap<i64, QuestionType> = sqlx::query_as::<_, QuestionTypeRow>(
        "SELECT id, question_type FROM questions WHERE survey_id = $1",
    )
    .bind(survey.id)
    .fetch_all(&pool)
    .await?
    .into_iter()
    .filter_map(|row| QuestionType::parse(&row.question_type).map(|kind| (row.id, kind)))
    .collect();

    let option_owners: HashMap<i64, i64> = sqlx::query_as::<_, OptionOwnerRow>(
        r#"
        SELECT o.id, o.question_id
        FROM options o
        JOIN questions q ON o.question_id = q.id
        WHERE q.survey_id = $1
        "#,
    )
    .bind(survey.id)
    .fetch_all(&pool)
    .await?
    .into_iter()
    .map(|row| (row.id, row.question_id))
    .collect();

    let validated = validate_answers(&payload.answers, &question_types, &option_owners)
        .map_err(AppError::Validation)?;

    let mut tx = pool.begin().await?;

    let submission = sqlx::query_as::<_, Submission>(
        r#"
        INSERT INTO submissions (survey_id, user_id)
        VALUES ($1, $2)
        RETURNING id, survey_id, user_id, submitted_at
        "#,
    )
    .bind(survey.id)
    .bind(submitter_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create submission: {:?}", e);
        AppError::from(e)
    })?;

    if !validated.is_empty() {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO responses (submission_id, question_id, selected_option_id, response_text) ",
        );
        builder.push_values(validated.iter(), |mut b, answer| {
            b.push_bind(submission.id).push_bind(answer.question_id);
            match &answer.value {
                AnswerValue::Choice(option_id) => {
                    b.push_bind(Some(*option_id)).push_bind(None::<String>);
                }
                AnswerValue::Text(text) => {
                    b.push_bind(None::<i64>).push_bind(Some(clean_text(text)));
                }
            }
        });
        builder.build().execute(&mut *tx).await.map_err(|e| {
            tracing::error!("Failed to record responses: {:?}", e);
            AppError::from(e)
        })?;
    }

    // Conditional false -> true flip, in the same transaction as the
    // response inserts; idempotent under concurrent first submissions.
    sqlx::query("UPDATE surveys SET has_responses = TRUE WHERE id = $1 AND has_responses = FALSE")
        .bind(survey.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Submission saved",
            "submission_id": submission.id,
        })),
    ))
}

#[derive(FromRow)]
struct ParticipationSubmissionRow {
    id: i64,
    submitted_at: chrono::DateTime<chrono::Utc>,
    title: String,
    description: Option<String>,
}

#[derive(FromRow)]
struct ParticipationResponseRow {
    submission_id: i64,
    question_text: String,
    question_type: String,
    option_text: Option<String>,
    response_text: Option<String>,
}

/// Lists the caller's submissions, newest first, with every response row
/// resolved to its display value.
pub async fn participated(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let submissions = sqlx::query_as::<_, ParticipationSubmissionRow>(
        r#"
        SELECT sub.id, sub.submitted_at, s.title, s.description
        FROM submissions sub
        JOIN surveys s ON sub.survey_id = s.id
        WHERE sub.user_id = $1
        ORDER BY sub.submitted_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    let submission_ids: Vec<i64> = submissions.iter().map(|s| s.id).collect();

    let mut responses_by_submission: HashMap<i64, Vec<ParticipationResponseRow>> = HashMap::new();
    if !submission_ids.is_empty() {
        let rows = sqlx::query_as::<_, ParticipationResponseRow>(
            r#"
            SELECT r.submission_id, q.question_text, q.question_type,
                   o.option_text, r.response_text
            FROM responses r
            JOIN questions q ON r.question_id = q.id
            LEFT JOIN options o ON r.selected_option_id = o.id
            WHERE r.submission_id = ANY($1)
            ORDER BY q.question_order, r.id ASC
            "#,
        )
        .bind(&submission_ids)
        .fetch_all(&pool)
        .await?;

        for row in rows {
            responses_by_submission
                .entry(row.submission_id)
                .or_default()
                .push(row);
        }
    }

    let history: Vec<ParticipationEntry> = submissions
        .into_iter()
        .map(|sub| {
            let answers = responses_by_submission
                .remove(&sub.id)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|row| {
                    let kind = QuestionType::parse(&row.question_type)?;
                    let source = AnswerSource {
                        option_text: row.option_text,
                        response_text: row.response_text,
                    };
                    Some(ParticipationAnswer {
                        question: row.question_text,
                        question_type: row.question_type.clone(),
                        response: resolve_answer(kind, &source),
                    })
                })
                .collect();

            ParticipationEntry {
                submission_id: sub.id,
                date: sub.submitted_at,
                survey_title: sub.title,
                survey_description: sub.description,
                answers,
            }
        })
        .collect();

    Ok(Json(history))
}
