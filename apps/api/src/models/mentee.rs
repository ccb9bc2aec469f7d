use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// A mentee's stored quiz record. The insight/score/answer payloads are
/// JSONB documents owned by the quiz module; this row is just their durable
/// home. `quiz_completed` is monotonic: set after the first successful
/// initial submission, never unset.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MenteeRow {
    pub user_id: Uuid,
    pub personality_insights: Option<Value>,
    pub trait_scores: Option<Value>,
    pub answers: Option<Value>,
    pub quiz_completed: bool,
    pub updated_at: DateTime<Utc>,
}
