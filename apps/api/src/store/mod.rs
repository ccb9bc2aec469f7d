//! Mentee document store — durable home for generated quiz results.
//!
//! Pluggable, trait-based: `AppState` carries an `Arc<dyn MenteeStore>` so
//! session orchestration is testable without a database. Writes happen only
//! after a successful insight generation, which is what lets the upsert set
//! `quiz_completed = TRUE` unconditionally — the flag never goes back.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::mentee::MenteeRow;
use crate::quiz::aggregate::TraitScores;
use crate::quiz::insights::{AnswerRecord, InsightResult};

#[async_trait]
pub trait MenteeStore: Send + Sync {
    /// Fetches a mentee's stored quiz record, if any.
    async fn fetch(&self, user_id: Uuid) -> Result<Option<MenteeRow>, AppError>;

    /// Upserts quiz results after a successful generation. A final-analysis
    /// save overwrites the initial one; `quiz_completed` stays TRUE either way.
    async fn save_results(
        &self,
        user_id: Uuid,
        insights: &InsightResult,
        trait_scores: &TraitScores,
        answers: &[AnswerRecord],
    ) -> Result<(), AppError>;
}

/// Postgres-backed store.
pub struct PgMenteeStore {
    pool: PgPool,
}

impl PgMenteeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MenteeStore for PgMenteeStore {
    async fn fetch(&self, user_id: Uuid) -> Result<Option<MenteeRow>, AppError> {
        let row = sqlx::query_as::<_, MenteeRow>(
            r#"
            SELECT user_id, personality_insights, trait_scores, answers, quiz_completed, updated_at
            FROM mentees
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn save_results(
        &self,
        user_id: Uuid,
        insights: &InsightResult,
        trait_scores: &TraitScores,
        answers: &[AnswerRecord],
    ) -> Result<(), AppError> {
        let insights_value = serde_json::to_value(insights)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize insights: {e}")))?;
        let scores_value = serde_json::to_value(trait_scores).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to serialize trait scores: {e}"))
        })?;
        let answers_value = serde_json::to_value(answers)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize answers: {e}")))?;

        // quiz_completed is only ever written TRUE; there is no code path
        // that clears it.
        sqlx::query(
            r#"
            INSERT INTO mentees (user_id, personality_insights, trait_scores, answers, quiz_completed, updated_at)
            VALUES ($1, $2, $3, $4, TRUE, NOW())
            ON CONFLICT (user_id) DO UPDATE
            SET personality_insights = EXCLUDED.personality_insights,
                trait_scores = EXCLUDED.trait_scores,
                answers = EXCLUDED.answers,
                quiz_completed = TRUE,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(&insights_value)
        .bind(&scores_value)
        .bind(&answers_value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
