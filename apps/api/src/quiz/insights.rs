//! Insight generation — request construction, the two-phase disclosure rule,
//! and orchestration of the external text-generation collaborator.
//!
//! Two request shapes exist. The initial ("forward-only") request is built
//! from trait scores and answers alone: a dream career is NEVER included,
//! even if a caller supplies one. The final request requires a non-empty
//! dream career and unlocks the reverse development path. This one-way
//! ordering is the core contract of the module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::quiz::aggregate::TraitScores;
use crate::quiz::bank::Category;
use crate::quiz::prompts::{
    insights_system, FORWARD_ONLY_SECTION, INSIGHTS_PROMPT_TEMPLATE, REVERSE_SECTION,
};

// ────────────────────────────────────────────────────────────────────────────
// Request / response data models
// ────────────────────────────────────────────────────────────────────────────

/// One question/answer pair carried to the collaborator for qualitative
/// analysis. The answer keeps its wire shape (slider integer, option id,
/// free text, or allocation map).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question: String,
    pub answer: Value,
    pub category: Category,
}

/// A fully assembled request to the insight collaborator. Constructed only
/// through `build_initial_request` / `build_final_request`.
#[derive(Debug, Clone, Serialize)]
pub struct InsightRequest {
    pub trait_scores: TraitScores,
    pub answers: Vec<AnswerRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dream_career: Option<String>,
    pub is_final_analysis: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendedCareer {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardDevelopment {
    pub archetype: String,
    pub recommended_career: RecommendedCareer,
    pub three_year_plan: Vec<String>,
    /// Passed through from the request; backfilled by `submit` if the
    /// collaborator drops it. Downstream persistence and display assume
    /// this is always populated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trait_scores: Option<TraitScores>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReverseDevelopment {
    pub is_feasible: bool,
    pub analysis: String,
    pub three_year_plan: Vec<String>,
}

/// Structured insight object returned by the collaborator.
/// `reverse_development` is present iff the originating request was a
/// final analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightResult {
    pub forward_development: ForwardDevelopment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse_development: Option<ReverseDevelopment>,
    pub quote: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Request builders
// ────────────────────────────────────────────────────────────────────────────

/// Builds the forward-only request. Any supplied dream career is dropped
/// unconditionally: the initial phase must never leak it into the analysis.
pub fn build_initial_request(
    trait_scores: TraitScores,
    answers: Vec<AnswerRecord>,
    dream_career: Option<String>,
) -> InsightRequest {
    if dream_career.as_deref().is_some_and(|dc| !dc.trim().is_empty()) {
        warn!("dream career supplied before final analysis; omitting from forward-only request");
    }
    InsightRequest {
        trait_scores,
        answers,
        dream_career: None,
        is_final_analysis: false,
    }
}

/// Builds the final request. Fails if the dream career is empty or
/// whitespace-only.
pub fn build_final_request(
    trait_scores: TraitScores,
    answers: Vec<AnswerRecord>,
    dream_career: &str,
) -> Result<InsightRequest, AppError> {
    let dream_career = dream_career.trim();
    if dream_career.is_empty() {
        return Err(AppError::Validation(
            "dream career must not be empty".to_string(),
        ));
    }
    Ok(InsightRequest {
        trait_scores,
        answers,
        dream_career: Some(dream_career.to_string()),
        is_final_analysis: true,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Generator seam
// ────────────────────────────────────────────────────────────────────────────

/// The insight generator seam. Carried in `AppState` as
/// `Arc<dyn InsightGenerator>` so the orchestrator and session state machine
/// are testable without network access.
#[async_trait]
pub trait InsightGenerator: Send + Sync {
    async fn generate(&self, request: &InsightRequest) -> Result<InsightResult, AppError>;
}

/// Production generator backed by the LLM client. Single attempt per call;
/// retry policy belongs to the caller.
pub struct LlmInsightGenerator {
    llm: LlmClient,
}

impl LlmInsightGenerator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl InsightGenerator for LlmInsightGenerator {
    async fn generate(&self, request: &InsightRequest) -> Result<InsightResult, AppError> {
        let prompt = build_insights_prompt(request)?;
        self.llm
            .call_json::<InsightResult>(&prompt, &insights_system())
            .await
            .map_err(|e| AppError::GenerationFailed(format!("insight call failed: {e}")))
    }
}

/// Builds the insight prompt from a request.
///
/// The dream career is rendered ONLY for final-analysis requests. A
/// hand-constructed forward-only request carrying a stray dream career
/// still never leaks it into the prompt.
pub fn build_insights_prompt(request: &InsightRequest) -> Result<String, AppError> {
    let trait_scores_json = serde_json::to_string_pretty(&request.trait_scores)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize trait scores: {e}")))?;
    let answers_json = serde_json::to_string_pretty(&request.answers)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize answers: {e}")))?;

    let dream_career = if request.is_final_analysis {
        request.dream_career.as_deref()
    } else {
        None
    };

    let (dream_career_block, reverse_section) = match dream_career {
        Some(dc) => (format!("\"{dc}\""), REVERSE_SECTION),
        None => ("Not provided.".to_string(), FORWARD_ONLY_SECTION),
    };

    Ok(INSIGHTS_PROMPT_TEMPLATE
        .replace("{trait_scores_json}", &trait_scores_json)
        .replace("{answers_json}", &answers_json)
        .replace("{dream_career}", &dream_career_block)
        .replace("{reverse_section}", reverse_section))
}

// ────────────────────────────────────────────────────────────────────────────
// Submission
// ────────────────────────────────────────────────────────────────────────────

/// Number of steps every development plan must carry — one per year.
const PLAN_STEPS: usize = 3;

/// Submits a request to the collaborator and enforces the output contract.
///
/// A response that fails schema validation, lacks a usable forward path, or
/// omits the reverse path on a final request is a fatal error for this call;
/// a partially populated result is never returned. The caller's pre-call
/// state is untouched on failure.
pub async fn submit(
    generator: &dyn InsightGenerator,
    request: &InsightRequest,
) -> Result<InsightResult, AppError> {
    let mut result = generator.generate(request).await?;

    if result.forward_development.three_year_plan.len() != PLAN_STEPS {
        return Err(AppError::GenerationFailed(format!(
            "forward plan has {} steps, expected {}",
            result.forward_development.three_year_plan.len(),
            PLAN_STEPS
        )));
    }

    if request.is_final_analysis {
        match &result.reverse_development {
            None => {
                return Err(AppError::GenerationFailed(
                    "final analysis response missing the reverse development path".to_string(),
                ));
            }
            Some(reverse) if reverse.three_year_plan.len() != PLAN_STEPS => {
                return Err(AppError::GenerationFailed(format!(
                    "reverse plan has {} steps, expected {}",
                    reverse.three_year_plan.len(),
                    PLAN_STEPS
                )));
            }
            Some(_) => {}
        }
    } else if result.reverse_development.take().is_some() {
        debug!("discarding unsolicited reverse development from a forward-only response");
    }

    // Passthrough invariant: downstream persistence and display assume
    // forward_development.trait_scores is always populated.
    if result.forward_development.trait_scores.is_none() {
        result.forward_development.trait_scores = Some(request.trait_scores.clone());
    }

    Ok(result)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
