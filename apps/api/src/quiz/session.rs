//! Per-user quiz session state machine.
//!
//! Each session walks a one-way lifecycle:
//! `NotStarted → InProgress → InitialSubmitted → FinalSubmitted`.
//! The final transition requires a dream career and never reverses; a failed
//! final submission leaves the session in `InitialSubmitted` with its initial
//! result intact. One submission may be in flight per session at a time — a
//! concurrent second call is rejected with `Busy`.
//!
//! Orchestration lives here (aggregate → build request → submit → persist)
//! so the whole flow is testable against stub generators and stores.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::quiz::aggregate::{aggregate, TraitScores};
use crate::quiz::bank::{Answer, Question, QuestionBank};
use crate::quiz::insights::{
    build_final_request, build_initial_request, submit, AnswerRecord, InsightGenerator,
    InsightResult,
};
use crate::store::MenteeStore;

/// Lifecycle phase of one user's quiz session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizPhase {
    #[default]
    NotStarted,
    InProgress,
    InitialSubmitted,
    FinalSubmitted,
}

/// One user's in-progress quiz data. Owned exclusively by that user's
/// session; never shared across sessions.
#[derive(Debug, Default)]
struct QuizSession {
    phase: QuizPhase,
    /// A submission is in flight for this session.
    busy: bool,
    trait_scores: Option<TraitScores>,
    answer_records: Vec<AnswerRecord>,
    initial_result: Option<InsightResult>,
    final_result: Option<InsightResult>,
}

/// Process-wide registry of quiz sessions, keyed by user id. This is also
/// the ephemeral storage for results that have not (or could not) be
/// persisted durably.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, QuizSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase for a user; `NotStarted` if no session exists yet.
    pub fn phase(&self, user_id: Uuid) -> QuizPhase {
        let sessions = self.lock();
        sessions.get(&user_id).map(|s| s.phase).unwrap_or_default()
    }

    /// `NotStarted → InProgress`. Idempotent for sessions already under way;
    /// rejected once the session is finalized.
    pub fn begin(&self, user_id: Uuid) -> Result<QuizPhase, AppError> {
        let mut sessions = self.lock();
        let session = sessions.entry(user_id).or_default();
        match session.phase {
            QuizPhase::FinalSubmitted => Err(AppError::Validation(
                "quiz is already finalized for this session".to_string(),
            )),
            QuizPhase::NotStarted => {
                session.phase = QuizPhase::InProgress;
                Ok(session.phase)
            }
            phase => Ok(phase),
        }
    }

    /// Marks a submission in flight, rejecting if one already is. The
    /// returned guard clears the flag when dropped, on success and failure
    /// paths alike.
    fn begin_submission(&self, user_id: Uuid) -> Result<BusyGuard<'_>, AppError> {
        let mut sessions = self.lock();
        let session = sessions.entry(user_id).or_default();
        if session.busy {
            return Err(AppError::Busy(
                "a submission is already in flight for this session".to_string(),
            ));
        }
        session.busy = true;
        Ok(BusyGuard {
            registry: self,
            user_id,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, QuizSession>> {
        self.sessions
            .lock()
            .expect("session registry lock poisoned")
    }
}

/// RAII release of a session's busy flag.
struct BusyGuard<'a> {
    registry: &'a SessionRegistry,
    user_id: Uuid,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut sessions = self.registry.lock();
        if let Some(session) = sessions.get_mut(&self.user_id) {
            session.busy = false;
        }
    }
}

/// Flattens answered questions into the ordered qualitative list handed to
/// the insight collaborator. Skipped questions are left out; answers keep
/// their wire shape.
fn answer_records(questions: &[Question], answers: &[Option<Answer>]) -> Vec<AnswerRecord> {
    questions
        .iter()
        .zip(answers.iter())
        .filter_map(|(question, answer)| {
            let answer = answer.as_ref()?;
            let value = match answer {
                Answer::Slider(v) => json!(v),
                Answer::Choice(id) => json!(id),
                Answer::Text(text) => json!(text),
                Answer::Points(allocation) => json!(allocation),
            };
            Some(AnswerRecord {
                question: question.text.clone(),
                answer: value,
                category: question.category,
            })
        })
        .collect()
}

/// Drives `InProgress → InitialSubmitted`: aggregates the full answer set,
/// requests the forward-only insight, caches and best-effort persists the
/// result. Retrying from `InitialSubmitted` is allowed (results are
/// idempotently derivable); re-submitting after finalization is not.
pub async fn submit_quiz(
    registry: &SessionRegistry,
    bank: &QuestionBank,
    generator: &dyn InsightGenerator,
    store: &dyn MenteeStore,
    user_id: Uuid,
    answers: &[Option<Answer>],
) -> Result<InsightResult, AppError> {
    let _busy = registry.begin_submission(user_id)?;

    if registry.phase(user_id) == QuizPhase::FinalSubmitted {
        return Err(AppError::Validation(
            "quiz is already finalized; answers can no longer be re-submitted".to_string(),
        ));
    }

    let trait_scores = aggregate(bank.questions(), answers)?;
    let records = answer_records(bank.questions(), answers);

    let request = build_initial_request(trait_scores.clone(), records.clone(), None);
    let result = submit(generator, &request).await?;

    {
        let mut sessions = registry.lock();
        let session = sessions.entry(user_id).or_default();
        session.phase = QuizPhase::InitialSubmitted;
        session.trait_scores = Some(trait_scores.clone());
        session.answer_records = records.clone();
        session.initial_result = Some(result.clone());
    }
    info!(%user_id, "initial insight generated");

    // Best-effort: the generated result is returned even if the durable
    // save fails.
    if let Err(e) = store
        .save_results(user_id, &result, &trait_scores, &records)
        .await
    {
        warn!(%user_id, "failed to persist initial quiz results: {e}");
    }

    Ok(result)
}

/// Drives `InitialSubmitted → FinalSubmitted`: requests the reverse-path
/// analysis against the user's dream career. A repeated call after
/// finalization returns the cached final result without another generation.
pub async fn submit_dream_career(
    registry: &SessionRegistry,
    generator: &dyn InsightGenerator,
    store: &dyn MenteeStore,
    user_id: Uuid,
    dream_career: &str,
) -> Result<InsightResult, AppError> {
    let _busy = registry.begin_submission(user_id)?;

    let (trait_scores, records) = {
        let sessions = registry.lock();
        let session = sessions.get(&user_id).ok_or_else(|| {
            AppError::Validation("complete the quiz before requesting a custom plan".to_string())
        })?;
        match session.phase {
            QuizPhase::FinalSubmitted => {
                let cached = session
                    .final_result
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("finalized session missing its result"))
                    .map_err(AppError::Internal)?;
                return Ok(cached);
            }
            QuizPhase::InitialSubmitted => (
                session
                    .trait_scores
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("submitted session missing trait scores"))
                    .map_err(AppError::Internal)?,
                session.answer_records.clone(),
            ),
            QuizPhase::NotStarted | QuizPhase::InProgress => {
                return Err(AppError::Validation(
                    "complete the quiz before requesting a custom plan".to_string(),
                ));
            }
        }
    };

    let request = build_final_request(trait_scores.clone(), records.clone(), dream_career)?;
    // On failure the session stays in InitialSubmitted; the forward-path
    // result remains valid and visible.
    let result = submit(generator, &request).await?;

    {
        let mut sessions = registry.lock();
        let session = sessions.entry(user_id).or_default();
        session.phase = QuizPhase::FinalSubmitted;
        session.final_result = Some(result.clone());
    }
    info!(%user_id, "final insight generated");

    if let Err(e) = store
        .save_results(user_id, &result, &trait_scores, &records)
        .await
    {
        warn!(%user_id, "failed to persist final quiz results: {e}");
    }

    Ok(result)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::mentee::MenteeRow;
    use crate::quiz::insights::{ForwardDevelopment, InsightRequest, RecommendedCareer, ReverseDevelopment};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Notify;

    fn full_answers(bank: &QuestionBank) -> Vec<Option<Answer>> {
        bank.questions()
            .iter()
            .map(|q| {
                Some(match q.kind {
                    crate::quiz::bank::QuestionKind::Slider => Answer::Slider(5),
                    crate::quiz::bank::QuestionKind::MultipleChoice => {
                        Answer::Choice(q.options[0].id.clone())
                    }
                    crate::quiz::bank::QuestionKind::TextInput => {
                        Answer::Text("a thoughtful answer".to_string())
                    }
                    crate::quiz::bank::QuestionKind::PointsAllocation => {
                        let mut allocation = std::collections::BTreeMap::new();
                        allocation.insert(q.options[0].id.clone(), 100);
                        Answer::Points(allocation)
                    }
                })
            })
            .collect()
    }

    fn result_for(request: &InsightRequest) -> InsightResult {
        InsightResult {
            forward_development: ForwardDevelopment {
                archetype: "The Builder".to_string(),
                recommended_career: RecommendedCareer {
                    title: "Engineer".to_string(),
                    description: "Hands-on and practical.".to_string(),
                },
                three_year_plan: vec![
                    "Year 1".to_string(),
                    "Year 2".to_string(),
                    "Year 3".to_string(),
                ],
                trait_scores: None,
            },
            reverse_development: request.is_final_analysis.then(|| ReverseDevelopment {
                is_feasible: true,
                analysis: "Aligned.".to_string(),
                three_year_plan: vec![
                    "Year 1".to_string(),
                    "Year 2".to_string(),
                    "Year 3".to_string(),
                ],
            }),
            quote: "Keep going.".to_string(),
        }
    }

    /// Counts calls; answers immediately.
    struct CountingGenerator {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingGenerator {
        fn ok() -> Self {
            Self { calls: AtomicUsize::new(0), fail: false }
        }

        fn failing() -> Self {
            Self { calls: AtomicUsize::new(0), fail: true }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl InsightGenerator for CountingGenerator {
        async fn generate(&self, request: &InsightRequest) -> Result<InsightResult, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::GenerationFailed("model unavailable".to_string()));
            }
            Ok(result_for(request))
        }
    }

    /// Blocks until released, so a second submission can race the first.
    struct BlockingGenerator {
        release: Notify,
    }

    #[async_trait]
    impl InsightGenerator for BlockingGenerator {
        async fn generate(&self, request: &InsightRequest) -> Result<InsightResult, AppError> {
            self.release.notified().await;
            Ok(result_for(request))
        }
    }

    struct MemStore {
        saves: AtomicUsize,
        fail: bool,
    }

    impl MemStore {
        fn ok() -> Self {
            Self { saves: AtomicUsize::new(0), fail: false }
        }

        fn failing() -> Self {
            Self { saves: AtomicUsize::new(0), fail: true }
        }
    }

    #[async_trait]
    impl MenteeStore for MemStore {
        async fn fetch(&self, _user_id: Uuid) -> Result<Option<MenteeRow>, AppError> {
            Ok(None)
        }

        async fn save_results(
            &self,
            _user_id: Uuid,
            _insights: &InsightResult,
            _trait_scores: &TraitScores,
            _answers: &[AnswerRecord],
        ) -> Result<(), AppError> {
            if self.fail {
                return Err(AppError::Persistence(sqlx::Error::PoolTimedOut));
            }
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_begin_moves_to_in_progress_and_is_idempotent() {
        let registry = SessionRegistry::new();
        let user = Uuid::new_v4();
        assert_eq!(registry.phase(user), QuizPhase::NotStarted);
        assert_eq!(registry.begin(user).unwrap(), QuizPhase::InProgress);
        assert_eq!(registry.begin(user).unwrap(), QuizPhase::InProgress);
    }

    #[tokio::test]
    async fn test_submit_quiz_transitions_to_initial_submitted() {
        let registry = SessionRegistry::new();
        let bank = QuestionBank::builtin();
        let generator = CountingGenerator::ok();
        let store = MemStore::ok();
        let user = Uuid::new_v4();

        registry.begin(user).unwrap();
        let answers = full_answers(&bank);
        let result = submit_quiz(&registry, &bank, &generator, &store, user, &answers)
            .await
            .unwrap();

        assert_eq!(registry.phase(user), QuizPhase::InitialSubmitted);
        assert!(result.forward_development.trait_scores.is_some());
        assert!(result.reverse_development.is_none());
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_submit_quiz_failure_preserves_phase() {
        let registry = SessionRegistry::new();
        let bank = QuestionBank::builtin();
        let generator = CountingGenerator::failing();
        let store = MemStore::ok();
        let user = Uuid::new_v4();

        registry.begin(user).unwrap();
        let answers = full_answers(&bank);
        let err = submit_quiz(&registry, &bank, &generator, &store, user, &answers)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::GenerationFailed(_)));
        assert_eq!(registry.phase(user), QuizPhase::InProgress);
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_retrying_initial_submission_is_allowed() {
        let registry = SessionRegistry::new();
        let bank = QuestionBank::builtin();
        let generator = CountingGenerator::ok();
        let store = MemStore::ok();
        let user = Uuid::new_v4();

        let answers = full_answers(&bank);
        submit_quiz(&registry, &bank, &generator, &store, user, &answers)
            .await
            .unwrap();
        submit_quiz(&registry, &bank, &generator, &store, user, &answers)
            .await
            .unwrap();
        assert_eq!(generator.call_count(), 2);
        assert_eq!(registry.phase(user), QuizPhase::InitialSubmitted);
    }

    #[tokio::test]
    async fn test_dream_career_requires_completed_quiz() {
        let registry = SessionRegistry::new();
        let generator = CountingGenerator::ok();
        let store = MemStore::ok();
        let user = Uuid::new_v4();

        let err = submit_dream_career(&registry, &generator, &store, user, "Pilot")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_dream_career_finalizes_session() {
        let registry = SessionRegistry::new();
        let bank = QuestionBank::builtin();
        let generator = CountingGenerator::ok();
        let store = MemStore::ok();
        let user = Uuid::new_v4();

        let answers = full_answers(&bank);
        submit_quiz(&registry, &bank, &generator, &store, user, &answers)
            .await
            .unwrap();
        let result = submit_dream_career(&registry, &generator, &store, user, "Pilot")
            .await
            .unwrap();

        assert_eq!(registry.phase(user), QuizPhase::FinalSubmitted);
        assert!(result.reverse_development.is_some());
    }

    #[tokio::test]
    async fn test_failed_final_submission_stays_initial_submitted() {
        let registry = SessionRegistry::new();
        let bank = QuestionBank::builtin();
        let ok_generator = CountingGenerator::ok();
        let store = MemStore::ok();
        let user = Uuid::new_v4();

        let answers = full_answers(&bank);
        let initial = submit_quiz(&registry, &bank, &ok_generator, &store, user, &answers)
            .await
            .unwrap();

        let failing = CountingGenerator::failing();
        let err = submit_dream_career(&registry, &failing, &store, user, "Pilot")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::GenerationFailed(_)));
        assert_eq!(registry.phase(user), QuizPhase::InitialSubmitted);

        // The forward-path result is still cached in the session.
        let sessions = registry.lock();
        let session = sessions.get(&user).unwrap();
        assert_eq!(
            session.initial_result.as_ref().unwrap().quote,
            initial.quote
        );
    }

    #[tokio::test]
    async fn test_repeated_finalization_returns_cached_result() {
        let registry = SessionRegistry::new();
        let bank = QuestionBank::builtin();
        let generator = CountingGenerator::ok();
        let store = MemStore::ok();
        let user = Uuid::new_v4();

        let answers = full_answers(&bank);
        submit_quiz(&registry, &bank, &generator, &store, user, &answers)
            .await
            .unwrap();
        let first = submit_dream_career(&registry, &generator, &store, user, "Pilot")
            .await
            .unwrap();
        let second = submit_dream_career(&registry, &generator, &store, user, "Astronaut")
            .await
            .unwrap();

        assert_eq!(first.quote, second.quote);
        // One initial + one final generation; the repeat was served from cache.
        assert_eq!(generator.call_count(), 2);
    }

    #[tokio::test]
    async fn test_resubmitting_answers_after_finalization_is_rejected() {
        let registry = SessionRegistry::new();
        let bank = QuestionBank::builtin();
        let generator = CountingGenerator::ok();
        let store = MemStore::ok();
        let user = Uuid::new_v4();

        let answers = full_answers(&bank);
        submit_quiz(&registry, &bank, &generator, &store, user, &answers)
            .await
            .unwrap();
        submit_dream_career(&registry, &generator, &store, user, "Pilot")
            .await
            .unwrap();

        let err = submit_quiz(&registry, &bank, &generator, &store, user, &answers)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(registry.phase(user), QuizPhase::FinalSubmitted);
    }

    #[tokio::test]
    async fn test_persistence_failure_still_returns_result() {
        let registry = SessionRegistry::new();
        let bank = QuestionBank::builtin();
        let generator = CountingGenerator::ok();
        let store = MemStore::failing();
        let user = Uuid::new_v4();

        let answers = full_answers(&bank);
        let result = submit_quiz(&registry, &bank, &generator, &store, user, &answers).await;
        assert!(result.is_ok());
        assert_eq!(registry.phase(user), QuizPhase::InitialSubmitted);
    }

    #[tokio::test]
    async fn test_concurrent_submissions_one_succeeds_one_busy() {
        let registry = Arc::new(SessionRegistry::new());
        let bank = Arc::new(QuestionBank::builtin());
        let generator = Arc::new(BlockingGenerator { release: Notify::new() });
        let store = Arc::new(MemStore::ok());
        let user = Uuid::new_v4();
        let answers = Arc::new(full_answers(&bank));

        let first = tokio::spawn({
            let (registry, bank, generator, store, answers) = (
                registry.clone(),
                bank.clone(),
                generator.clone(),
                store.clone(),
                answers.clone(),
            );
            async move {
                submit_quiz(&registry, &bank, generator.as_ref(), store.as_ref(), user, &answers)
                    .await
            }
        });

        // Let the first submission reach the blocked generator call.
        tokio::task::yield_now().await;
        while !registry.lock().get(&user).map(|s| s.busy).unwrap_or(false) {
            tokio::task::yield_now().await;
        }

        let second = submit_quiz(
            &registry,
            &bank,
            generator.as_ref(),
            store.as_ref(),
            user,
            &answers,
        )
        .await;
        assert!(matches!(second, Err(AppError::Busy(_))));

        generator.release.notify_one();
        let first = first.await.unwrap();
        assert!(first.is_ok());
        assert_eq!(registry.phase(user), QuizPhase::InitialSubmitted);
    }

    #[test]
    fn test_answer_records_skip_unanswered_and_keep_wire_shape() {
        let bank = QuestionBank::builtin();
        let mut answers: Vec<Option<Answer>> = vec![None; bank.len()];
        answers[0] = Some(Answer::Slider(6));
        let records = answer_records(bank.questions(), &answers);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].answer, json!(6));
        assert_eq!(records[0].question, bank.questions()[0].text);
    }
}
