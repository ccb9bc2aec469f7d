// All LLM prompt constants for the quiz insight module.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::llm_client::prompts::JSON_ONLY_SYSTEM;

/// System prompt for insight generation — career counselor role plus the
/// shared JSON-only contract.
pub fn insights_system() -> String {
    format!(
        "You are an expert career counselor for graduating students. \
        You provide career development paths based on psychometric test results. \
        The tone is professional, encouraging, and highly specific. {JSON_ONLY_SYSTEM}"
    )
}

/// Insight prompt template.
/// Replace: {trait_scores_json}, {answers_json}, {dream_career}, {reverse_section}
pub const INSIGHTS_PROMPT_TEMPLATE: &str = r#"Analyze the following user data from a psychometric assessment.

QUANTITATIVE TRAIT SCORES (0-100 scale):
{trait_scores_json}

ANSWERS BY QUESTION (slider: 1-7 agreement, choice: selected option id, text: free text, points: allocation map):
{answers_json}

USER'S STATED DREAM CAREER:
{dream_career}

Return a JSON object with this EXACT schema (no extra fields):
{
  "forward_development": {
    "archetype": "The Strategic Innovator",
    "recommended_career": {
      "title": "Sustainable Product Designer",
      "description": "A detailed explanation of why this career is an excellent match."
    },
    "three_year_plan": ["Year 1: ...", "Year 2: ...", "Year 3: ..."],
    "trait_scores": {"openness": 82}
  },
  "reverse_development": {
    "is_feasible": true,
    "analysis": "How the user's traits align with their dream career.",
    "three_year_plan": ["Year 1: ...", "Year 2: ...", "Year 3: ..."]
  },
  "quote": "A tailored, inspiring quote that sounds like professional wisdom."
}

PART A — forward_development (based SOLELY on the test results):
1. archetype: bestow a professional archetype that captures the user's core strengths
   (e.g., "The Strategic Innovator", "The Empathetic Builder").
2. recommended_career.title: the single best career path for this user. Be creative and
   specific (e.g., 'AI Prompt Engineer', 'Sustainable Product Designer', 'Commercial Drone Pilot').
3. recommended_career.description: explain *why* this career is an excellent match,
   referencing their specific trait scores.
4. three_year_plan: EXACTLY 3 steps, one per year, each suggesting popular, credible
   online platforms or courses (e.g., Coursera, Udemy, Behance).
5. trait_scores: pass through the trait scores given above, unchanged.

{reverse_section}

PART C — quote: an inspiring quote about career development that aligns with the archetype."#;

/// Reverse-path instructions, appended ONLY to final-analysis prompts.
pub const REVERSE_SECTION: &str = r#"PART B — reverse_development (MANDATORY because a dream career is provided):
1. is_feasible: is the dream career a realistic goal given the test results? (true/false)
2. analysis: an honest analysis of how the user's traits align with their dream career —
   their biggest strengths for this path, and the most significant skill gaps or
   personality misalignments to address.
3. three_year_plan: EXACTLY 3 steps designed to bridge the identified gaps, each
   suggesting specific, credible online courses or resources (Coursera, Udemy, etc.)."#;

/// Replaces PART B in forward-only prompts.
pub const FORWARD_ONLY_SECTION: &str =
    "PART B — reverse_development: OMIT this field entirely. No dream career was provided.";
