//! Trait Aggregator — converts a user's raw answers into normalized 0–100
//! trait scores.
//!
//! Scoring is purely additive. Each answered slider contributes
//! `effective/7 * 14.28` to its trait (reversed sliders invert first); each
//! correctly answered multiple-choice question contributes a flat 25. Text
//! and points-allocation answers are carried downstream unscored. Totals
//! are clamped to 100 and rounded only at finalization.
//!
//! The slider weight is deliberately NOT normalized against the actual
//! number of questions touching a trait. Changing it silently changes every
//! stored score, so it stays as-is.

use std::collections::BTreeMap;

use crate::errors::AppError;
use crate::quiz::bank::{Answer, Question, QuestionKind};

/// Normalized trait scores. A trait with zero contributing answered
/// questions is omitted entirely, never reported as zero.
pub type TraitScores = BTreeMap<String, u32>;

/// Maximum contribution of one slider question answered at full agreement.
const SLIDER_SATURATION_WEIGHT: f64 = 14.28;

/// Flat contribution of a correctly answered multiple-choice question.
const CORRECT_CHOICE_POINTS: f64 = 25.0;

/// Total points a points-allocation answer must distribute.
const POINTS_BUDGET: u32 = 100;

/// Aggregates raw answers into trait scores.
///
/// `answers` is parallel to `questions`; `None` at index i means question i
/// was skipped (no contribution, no penalty). A shape mismatch between an
/// answer and its question's kind is an upstream contract violation and
/// fails fast with a `Validation` error naming the question.
pub fn aggregate(
    questions: &[Question],
    answers: &[Option<Answer>],
) -> Result<TraitScores, AppError> {
    if questions.len() != answers.len() {
        return Err(AppError::Validation(format!(
            "expected {} answers, got {}",
            questions.len(),
            answers.len()
        )));
    }

    let mut raw: BTreeMap<&str, f64> = BTreeMap::new();

    for (question, answer) in questions.iter().zip(answers.iter()) {
        let Some(answer) = answer else {
            continue; // skipped question
        };

        match (question.kind, answer) {
            (QuestionKind::Slider, Answer::Slider(value)) => {
                let value = *value;
                if !(1..=7).contains(&value) {
                    return Err(AppError::Validation(format!(
                        "question '{}': slider value {} outside 1-7",
                        question.id, value
                    )));
                }
                let effective = if question.reversed { 8 - value } else { value };
                let contribution = f64::from(effective) / 7.0 * SLIDER_SATURATION_WEIGHT;
                for trait_id in question.target.trait_ids() {
                    *raw.entry(trait_id.as_str()).or_insert(0.0) += contribution;
                }
            }
            (QuestionKind::MultipleChoice, Answer::Choice(selected)) => {
                if !question.options.iter().any(|o| &o.id == selected) {
                    return Err(AppError::Validation(format!(
                        "question '{}': '{}' is not one of its options",
                        question.id, selected
                    )));
                }
                // Questions without a defined correct answer are not scored;
                // their answer is only carried through for qualitative analysis.
                let Some(correct) = &question.answer else {
                    continue;
                };
                if selected == correct {
                    for trait_id in question.target.trait_ids() {
                        *raw.entry(trait_id.as_str()).or_insert(0.0) += CORRECT_CHOICE_POINTS;
                    }
                }
            }
            (QuestionKind::TextInput, Answer::Text(_)) => {
                // Unscored; analyzed qualitatively downstream.
            }
            (QuestionKind::PointsAllocation, Answer::Points(allocation)) => {
                // The form layer owns this invariant, but a violation here
                // means the contract broke upstream, so re-check.
                for bucket in allocation.keys() {
                    if !question.options.iter().any(|o| &o.id == bucket) {
                        return Err(AppError::Validation(format!(
                            "question '{}': unknown allocation bucket '{}'",
                            question.id, bucket
                        )));
                    }
                }
                let total: u32 = allocation.values().sum();
                if total != POINTS_BUDGET {
                    return Err(AppError::Validation(format!(
                        "question '{}': allocation sums to {}, expected {}",
                        question.id, total, POINTS_BUDGET
                    )));
                }
            }
            (expected, got) => {
                return Err(AppError::Validation(format!(
                    "question '{}': answer shape {:?} does not match question kind {:?}",
                    question.id, got, expected
                )));
            }
        }
    }

    Ok(raw
        .into_iter()
        .map(|(trait_id, score)| (trait_id.to_string(), score.min(100.0).round() as u32))
        .collect())
}
