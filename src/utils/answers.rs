// src/utils/answers.rs
//
// The single answer-resolution rule shared by the results view, both export
// formats and the participation history: every view resolves the same
// (submission, question) pair to the same display value.

use std::collections::HashMap;

use crate::models::question::QuestionType;
use crate::models::submission::AnswerEntry;

/// Shown in place of an option that was removed after responses referenced
/// it (`responses.selected_option_id` goes NULL on option delete).
pub const DELETED_OPTION_PLACEHOLDER: &str = "(option deleted)";

/// The stored data backing one response row, as joined from
/// responses LEFT JOIN options.
#[derive(Debug, Clone)]
pub struct AnswerSource {
    pub option_text: Option<String>,
    pub response_text: Option<String>,
}

/// Resolves a single response row to its display value.
pub fn resolve_answer(kind: QuestionType, source: &AnswerSource) -> String {
    match kind {
        QuestionType::MultipleChoice | QuestionType::Checkbox => source
            .option_text
            .clone()
            .unwrap_or_else(|| DELETED_OPTION_PLACEHOLDER.to_string()),
        QuestionType::ShortAnswer => source.response_text.clone().unwrap_or_default(),
        QuestionType::PageBreak => String::new(),
    }
}

/// Resolves one (submission, question) cell from all of its response rows.
///
/// Checkbox questions contribute one row per selected option; their values
/// are joined with ", ". A question with no rows resolves to an empty cell.
pub fn resolve_cell(kind: QuestionType, sources: &[AnswerSource]) -> String {
    match kind {
        QuestionType::MultipleChoice | QuestionType::Checkbox => sources
            .iter()
            .map(|s| resolve_answer(kind, s))
            .collect::<Vec<_>>()
            .join(", "),
        QuestionType::ShortAnswer => sources
            .first()
            .map(|s| resolve_answer(kind, s))
            .unwrap_or_default(),
        QuestionType::PageBreak => String::new(),
    }
}

/// A validated answer unit, discriminated by the owning question's type.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerValue {
    /// A selected option id, verified to belong to the question.
    Choice(i64),
    /// Free text for a short-answer question.
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedAnswer {
    pub question_id: i64,
    pub value: AnswerValue,
}

/// Validates raw answer entries against the survey's question tree.
///
/// * every entry must reference a question of the survey;
/// * choice answers must carry an option belonging to that question;
/// * short answers must carry text;
/// * page breaks accept no answers.
///
/// Multiple entries sharing a checkbox question id are expected, not an
/// error. Returns the full error list so the caller can surface every
/// problem at once.
pub fn validate_answers(
    entries: &[AnswerEntry],
    question_types: &HashMap<i64, QuestionType>,
    option_owners: &HashMap<i64, i64>,
) -> Result<Vec<ValidatedAnswer>, Vec<String>> {
    let mut validated = Vec::with_capacity(entries.len());
    let mut errors = Vec::new();

    for (idx, entry) in entries.iter().enumerate() {
        let Some(kind) = question_types.get(&entry.question_id) else {
            errors.push(format!(
                "answers[{}]: question {} does not belong to this survey",
                idx, entry.question_id
            ));
            continue;
        };

        match kind {
            QuestionType::MultipleChoice | QuestionType::Checkbox => {
                let Some(option_id) = entry.selected_option_id else {
                    errors.push(format!(
                        "answers[{}]: question {} requires a selected option",
                        idx, entry.question_id
                    ));
                    continue;
                };
                if option_owners.get(&option_id) != Some(&entry.question_id) {
                    errors.push(format!(
                        "answers[{}]: option {} does not belong to question {}",
                        idx, option_id, entry.question_id
                    ));
                    continue;
                }
                validated.push(ValidatedAnswer {
                    question_id: entry.question_id,
                    value: AnswerValue::Choice(option_id),
                });
            }
            QuestionType::ShortAnswer => {
                let Some(text) = entry.response_text.clone() else {
                    errors.push(format!(
                        "answers[{}]: question {} requires a text response",
                        idx, entry.question_id
                    ));
                    continue;
                };
                validated.push(ValidatedAnswer {
                    question_id: entry.question_id,
                    value: AnswerValue::Text(text),
                });
            }
            QuestionType::PageBreak => {
                errors.push(format!(
                    "answers[{}]: question {} is a page break and takes no answer",
                    idx, entry.question_id
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(validated)
    } else {
        Err(errors)
    }
}
