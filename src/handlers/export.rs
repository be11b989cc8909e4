// src/handlers/export.rs

use std::collections::HashMap;

use axum::{
    Extension,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use rust_xlsxwriter::{Color, Format, Workbook};
use sqlx::{FromRow, PgPool};

use crate::{
    error::AppError,
    handlers::results::fetch_owned_survey,
    models::question::Question,
    utils::{
        answers::{AnswerSource, resolve_cell},
        jwt::Claims,
    },
};

const CSV_CONTENT_TYPE: &str = "text/csv";
const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(FromRow)]
struct ExportSubmissionRow {
    id: i64,
    submitted_at: chrono::DateTime<chrono::Utc>,
    email: Option<String>,
}

#[derive(FromRow)]
struct ExportResponseRow {
    submission_id: i64,
    question_id: i64,
    option_text: Option<String>,
    response_text: Option<String>,
}

/// One fully resolved submission: identity columns plus one cell per
/// question, in the survey's question order.
#[derive(Debug)]
pub struct ResolvedSubmission {
    pub submission_id: i64,
    pub date: String,
    pub submitter: String,
    pub cells: Vec<String>,
}

/// Loads and resolves everything both export formats need.
///
/// Fails with EmptyResult when the survey has no submissions — there is
/// nothing to export, whichever format was requested.
async fn fetch_export_data(
    pool: &PgPool,
    survey_id: i64,
    requester_id: i64,
) -> Result<(i64, Vec<Question>, Vec<ResolvedSubmission>), AppError> {
    let survey = fetch_owned_survey(pool, survey_id, requester_id).await?;

    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, survey_id, question_text, question_type, question_order, is_required
        FROM questions
        WHERE survey_id = $1
        ORDER BY question_order ASC
        "#,
    )
    .bind(survey.id)
    .fetch_all(pool)
    .await?;

    let submissions = sqlx::query_as::<_, ExportSubmissionRow>(
        r#"
        SELECT sub.id, sub.submitted_at, u.email
        FROM submissions sub
        LEFT JOIN users u ON sub.user_id = u.id
        WHERE sub.survey_id = $1
        ORDER BY sub.submitted_at DESC
        "#,
    )
    .bind(survey.id)
    .fetch_all(pool)
    .await?;

    if submissions.is_empty() {
        return Err(AppError::EmptyResult("No data to export".to_string()));
    }

    let responses = sqlx::query_as::<_, ExportResponseRow>(
        r#"
        SELECT r.submission_id, r.question_id, o.option_text, r.response_text
        FROM responses r
        JOIN submissions sub ON r.submission_id = sub.id
        LEFT JOIN options o ON r.selected_option_id = o.id
        WHERE sub.survey_id = $1
        ORDER BY r.id ASC
        "#,
    )
    .bind(survey.id)
    .fetch_all(pool)
    .await?;

    let rows = resolve_submissions(&questions, &submissions, responses);

    Ok((survey.id, questions, rows))
}

/// Projects raw response rows onto the (submission, question) grid using
/// the shared resolution rule.
fn resolve_submissions(
    questions: &[Question],
    submissions: &[ExportSubmissionRow],
    responses: Vec<ExportResponseRow>,
) -> Vec<ResolvedSubmission> {
    let mut sources: HashMap<(i64, i64), Vec<AnswerSource>> = HashMap::new();
    for row in responses {
        sources
            .entry((row.submission_id, row.question_id))
            .or_default()
            .push(AnswerSource {
                option_text: row.option_text,
                response_text: row.response_text,
            });
    }

    submissions
        .iter()
        .map(|sub| {
            let cells = questions
                .iter()
                .map(|question| match question.kind() {
                    Some(kind) => {
                        let cell_sources = sources
                            .get(&(sub.id, question.id))
                            .map(Vec::as_slice)
                            .unwrap_or_default();
                        resolve_cell(kind, cell_sources)
                    }
                    None => String::new(),
                })
                .collect();

            ResolvedSubmission {
                submission_id: sub.id,
                date: sub.submitted_at.format("%Y-%m-%d").to_string(),
                submitter: sub.email.clone().unwrap_or_else(|| "Anonymous".to_string()),
                cells,
            }
        })
        .collect()
}

/// Renders the flat row-per-submission table.
fn build_csv(questions: &[Question], rows: &[ResolvedSubmission]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(vec![]);

    let mut header = vec![
        "Submission ID".to_string(),
        "Date".to_string(),
        "User".to_string(),
    ];
    header.extend(questions.iter().map(|q| q.question_text.clone()));
    writer.write_record(&header)?;

    for row in rows {
        let mut record = vec![row.submission_id.to_string(), row.date.clone(), row.submitter.clone()];
        record.extend(row.cells.iter().cloned());
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Renders the transposed question-grid workbook: one row per question,
/// one column per submission, with date/submitter header rows.
fn build_grid(questions: &[Question], rows: &[ResolvedSubmission]) -> Result<Vec<u8>, AppError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Survey Grid")?;

    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(0x1B263B));
    let question_format = Format::new().set_bold();

    worksheet.write_string_with_format(0, 0, "METRIC / QUESTION", &header_format)?;
    for (idx, _) in rows.iter().enumerate() {
        worksheet.write_string_with_format(
            0,
            (idx + 1) as u16,
            format!("Response #{}", idx + 1),
            &header_format,
        )?;
    }

    worksheet.write_string(1, 0, "Submission Date")?;
    worksheet.write_string(2, 0, "User")?;
    for (idx, row) in rows.iter().enumerate() {
        let col = (idx + 1) as u16;
        worksheet.write_string(1, col, row.date.as_str())?;
        worksheet.write_string(2, col, row.submitter.as_str())?;
    }

    // Row 3 stays blank to separate metadata from the question grid.
    for (q_idx, question) in questions.iter().enumerate() {
        let excel_row = (q_idx + 4) as u32;
        worksheet.write_string_with_format(
            excel_row,
            0,
            question.question_text.as_str(),
            &question_format,
        )?;
        for (s_idx, row) in rows.iter().enumerate() {
            worksheet.write_string(excel_row, (s_idx + 1) as u16, row.cells[q_idx].as_str())?;
        }
    }

    worksheet.set_column_width(0, 45)?;

    Ok(workbook.save_to_buffer()?)
}

fn attachment_headers(content_type: &str, filename: String) -> [(header::HeaderName, String); 2] {
    [
        (header::CONTENT_TYPE, content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ]
}

/// Streams the row-per-submission CSV download.
pub async fn export_csv(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(survey_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let (survey_id, questions, rows) =
        fetch_export_data(&pool, survey_id, claims.user_id()).await?;

    let body = build_csv(&questions, &rows)?;

    Ok((
        attachment_headers(CSV_CONTENT_TYPE, format!("survey_{}_results.csv", survey_id)),
        body,
    ))
}

/// Streams the question-grid spreadsheet download.
pub async fn export_grid(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(survey_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let (survey_id, questions, rows) =
        fetch_export_data(&pool, survey_id, claims.user_id()).await?;

    let body = build_grid(&questions, &rows)?;

    Ok((
        attachment_headers(XLSX_CONTENT_TYPE, format!("survey_{}_grid.xlsx", survey_id)),
        body,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::QuestionType;

    fn question(id: i64, kind: QuestionType, order: i32) -> Question {
        Question {
            id,
            survey_id: 1,
            question_text: format!("Question {}", id),
            question_type: kind.as_str().to_string(),
            question_order: order,
            is_required: false,
        }
    }

    fn fixture() -> (Vec<Question>, Vec<ResolvedSubmission>) {
        let questions = vec![
            question(1, QuestionType::MultipleChoice, 1),
            question(2, QuestionType::ShortAnswer, 2),
            question(3, QuestionType::PageBreak, 3),
        ];
        let submissions = vec![
            ExportSubmissionRow {
                id: 10,
                submitted_at: chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
                email: Some("a@example.com".to_string()),
            },
            ExportSubmissionRow {
                id: 11,
                submitted_at: chrono::DateTime::from_timestamp(1_700_086_400, 0).unwrap(),
                email: None,
            },
        ];
        let responses = vec![
            ExportResponseRow {
                submission_id: 10,
                question_id: 1,
                option_text: Some("Red".to_string()),
                response_text: None,
            },
            ExportResponseRow {
                submission_id: 10,
                question_id: 2,
                option_text: None,
                response_text: Some("hello".to_string()),
            },
            // Deleted option: the join produced no option text.
            ExportResponseRow {
                submission_id: 11,
                question_id: 1,
                option_text: None,
                response_text: None,
            },
        ];
        let rows = resolve_submissions(&questions, &submissions, responses);
        (questions, rows)
    }

    #[test]
    fn resolves_cells_in_question_order() {
        let (_, rows) = fixture();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].submitter, "a@example.com");
        assert_eq!(rows[0].cells, vec!["Red", "hello", ""]);
        assert_eq!(rows[1].submitter, "Anonymous");
        assert_eq!(rows[1].cells, vec!["(option deleted)", "", ""]);
    }

    #[test]
    fn csv_has_one_row_per_submission() {
        let (questions, rows) = fixture();
        let bytes = build_csv(&questions, &rows).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Submission ID,Date,User,Question 1"));
        assert!(lines[1].contains("a@example.com"));
        assert!(lines[2].contains("(option deleted)"));
    }

    #[test]
    fn grid_builds_a_workbook() {
        let (questions, rows) = fixture();
        let bytes = build_grid(&questions, &rows).unwrap();
        // xlsx files are zip archives
        assert!(bytes.starts_with(b"PK"));
    }
}
