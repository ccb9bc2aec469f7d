use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::mentee::MenteeRow;
use crate::quiz::bank::{Answer, Question, QuestionBank};
use crate::quiz::insights::InsightResult;
use crate::quiz::session::{submit_dream_career, submit_quiz, QuizPhase};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Serialize)]
pub struct QuestionListResponse {
    pub questions: Vec<Question>,
    pub total: usize,
}

/// Correct-answer keys never leave the server.
fn redacted_questions(bank: &QuestionBank) -> Vec<Question> {
    bank.questions()
        .iter()
        .cloned()
        .map(|mut q| {
            q.answer = None;
            q
        })
        .collect()
}

/// GET /api/v1/quiz/questions
pub async fn handle_get_questions(State(state): State<AppState>) -> Json<QuestionListResponse> {
    let questions = redacted_questions(&state.bank);
    let total = questions.len();
    Json(QuestionListResponse { questions, total })
}

#[derive(Deserialize)]
pub struct StartRequest {
    pub user_id: Uuid,
}

#[derive(Serialize)]
pub struct StartResponse {
    pub phase: QuizPhase,
    pub total_questions: usize,
}

/// POST /api/v1/quiz/start
pub async fn handle_start(
    State(state): State<AppState>,
    Json(req): Json<StartRequest>,
) -> Result<Json<StartResponse>, AppError> {
    let phase = state.sessions.begin(req.user_id)?;
    Ok(Json(StartResponse {
        phase,
        total_questions: state.bank.len(),
    }))
}

#[derive(Deserialize)]
pub struct SubmitQuizRequest {
    pub user_id: Uuid,
    /// Parallel to the question bank; `null` marks a skipped question.
    pub answers: Vec<Option<Answer>>,
}

/// POST /api/v1/quiz/submit
pub async fn handle_submit(
    State(state): State<AppState>,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<Json<InsightResult>, AppError> {
    let result = submit_quiz(
        &state.sessions,
        &state.bank,
        state.generator.as_ref(),
        state.store.as_ref(),
        req.user_id,
        &req.answers,
    )
    .await?;
    Ok(Json(result))
}

#[derive(Deserialize)]
pub struct DreamCareerRequest {
    pub user_id: Uuid,
    pub dream_career: String,
}

/// POST /api/v1/quiz/dream-career
pub async fn handle_dream_career(
    State(state): State<AppState>,
    Json(req): Json<DreamCareerRequest>,
) -> Result<Json<InsightResult>, AppError> {
    let result = submit_dream_career(
        &state.sessions,
        state.generator.as_ref(),
        state.store.as_ref(),
        req.user_id,
        &req.dream_career,
    )
    .await?;
    Ok(Json(result))
}

/// GET /api/v1/quiz/results
pub async fn handle_get_results(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<MenteeRow>, AppError> {
    let row = state
        .store
        .fetch(params.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no quiz results for user {}", params.user_id)))?;
    Ok(Json(row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_questions_never_expose_answer_keys() {
        let bank = QuestionBank::builtin();
        let questions = redacted_questions(&bank);
        assert_eq!(questions.len(), bank.len());
        assert!(questions.iter().all(|q| q.answer.is_none()));
    }

    #[test]
    fn test_redacted_questions_keep_options_and_text() {
        let bank = QuestionBank::builtin();
        let questions = redacted_questions(&bank);
        for (original, redacted) in bank.questions().iter().zip(questions.iter()) {
            assert_eq!(original.id, redacted.id);
            assert_eq!(original.text, redacted.text);
            assert_eq!(original.options, redacted.options);
        }
    }
}
