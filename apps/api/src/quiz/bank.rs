//! Question bank — the immutable, process-wide assessment content.
//!
//! Loaded once at startup and shared read-only by every session. Trait
//! identifiers used anywhere in the bank must exist in the trait registry;
//! `validate()` enforces this before the server starts taking traffic.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// A scorable dimension of personality or aptitude.
#[derive(Debug, Clone, Copy)]
pub struct TraitDef {
    pub id: &'static str,
    pub name: &'static str,
}

/// The global trait registry. Every `trait` reference in the question bank
/// must resolve to one of these ids.
pub const TRAITS: &[TraitDef] = &[
    // Big Five
    TraitDef { id: "openness", name: "Openness" },
    TraitDef { id: "conscientiousness", name: "Conscientiousness" },
    TraitDef { id: "extraversion", name: "Extraversion" },
    TraitDef { id: "agreeableness", name: "Agreeableness" },
    TraitDef { id: "neuroticism", name: "Neuroticism" },
    // Holland Code (RIASEC)
    TraitDef { id: "realistic", name: "Realistic" },
    TraitDef { id: "investigative", name: "Investigative" },
    TraitDef { id: "artistic", name: "Artistic" },
    TraitDef { id: "social", name: "Social" },
    TraitDef { id: "enterprising", name: "Enterprising" },
    TraitDef { id: "conventional", name: "Conventional" },
    // Emotional intelligence
    TraitDef { id: "self_awareness", name: "Self-awareness" },
    TraitDef { id: "self_regulation", name: "Self-regulation" },
    TraitDef { id: "motivation", name: "Motivation" },
    TraitDef { id: "empathy", name: "Empathy" },
    TraitDef { id: "social_skills", name: "Social Skills" },
    // SWOT reflection
    TraitDef { id: "analytical", name: "Analytical" },
    TraitDef { id: "problem_solving", name: "Problem Solving" },
    TraitDef { id: "creativity", name: "Creativity" },
    // Situational judgment
    TraitDef { id: "sjt_problem_solving", name: "SJT Problem Solving" },
    TraitDef { id: "sjt_interpersonal", name: "SJT Interpersonal" },
    TraitDef { id: "sjt_communication", name: "SJT Communication" },
    // Puzzles
    TraitDef { id: "puzzle_solving", name: "Puzzle Solving" },
    // Aptitude
    TraitDef { id: "numerical_reasoning", name: "Numerical Reasoning" },
    TraitDef { id: "verbal_reasoning", name: "Verbal Reasoning" },
    TraitDef { id: "logical_reasoning", name: "Logical Reasoning" },
    TraitDef { id: "spatial_reasoning", name: "Spatial Reasoning" },
    // Work values
    TraitDef { id: "work_value_prosperity", name: "Work Value: Prosperity" },
    TraitDef { id: "work_value_harmony", name: "Work Value: Harmony" },
    TraitDef { id: "work_value_pioneer", name: "Work Value: Pioneer" },
    TraitDef { id: "work_value_guardian", name: "Work Value: Guardian" },
    TraitDef { id: "work_value_autonomy", name: "Work Value: Autonomy" },
    TraitDef { id: "work_value_impact", name: "Work Value: Impact" },
];

/// Returns true if `id` exists in the global trait registry.
pub fn is_known_trait(id: &str) -> bool {
    TRAITS.iter().any(|t| t.id == id)
}

/// Assessment module a question belongs to. Every question belongs to
/// exactly one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    HollandCode,
    BigFive,
    #[serde(rename = "eq")]
    EmotionalIntelligence,
    Swot,
    Sjt,
    Puzzles,
    Aptitude,
    WorkValues,
}

impl Category {
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::HollandCode => "Holland Code Career Explorer",
            Category::BigFive => "Big Five Personality",
            Category::EmotionalIntelligence => "Emotional Intelligence",
            Category::Swot => "Personal SWOT Analysis",
            Category::Sjt => "Situational Judgment Test",
            Category::Puzzles => "Cognitive Puzzles",
            Category::Aptitude => "Core Aptitude",
            Category::WorkValues => "Work Values",
        }
    }

    pub const ALL: &'static [Category] = &[
        Category::HollandCode,
        Category::BigFive,
        Category::EmotionalIntelligence,
        Category::Swot,
        Category::Sjt,
        Category::Puzzles,
        Category::Aptitude,
        Category::WorkValues,
    ];
}

/// One or more trait ids a question contributes to. Questions that target
/// several traits (situational judgment items) contribute identically to
/// every named trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraitTarget {
    One(String),
    Many(Vec<String>),
}

impl TraitTarget {
    /// Normalizes to a slice so scoring has a single code path.
    pub fn trait_ids(&self) -> &[String] {
        match self {
            TraitTarget::One(id) => std::slice::from_ref(id),
            TraitTarget::Many(ids) => ids,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Slider,
    MultipleChoice,
    TextInput,
    PointsAllocation,
}

/// SWOT quadrant tag on reflective prompts. Carried through to the
/// qualitative analysis, never scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwotKind {
    Strength,
    Weakness,
    Opportunity,
    Threat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "trait", default, skip_serializing_if = "Option::is_none")]
    pub trait_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    #[serde(rename = "trait")]
    pub target: TraitTarget,
    /// Slider-only: the scored value is inverted (8 − raw) before normalization.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reversed: bool,
    pub category: Category,
    pub kind: QuestionKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<QuestionOption>,
    /// Multiple-choice only: option id considered correct for scoring.
    /// Absent means the question is not auto-scored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swot: Option<SwotKind>,
}

/// A user's response to one question. Shape must match the question's kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Answer {
    /// 1–7 agreement scale.
    Slider(u8),
    /// Selected option id.
    Choice(String),
    /// Free text.
    Text(String),
    /// Option id → points, summing to exactly 100.
    Points(BTreeMap<String, u32>),
}

/// The process-wide question bank. Construct once with `builtin()`, call
/// `validate()` at startup, then share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Checks the bank's structural invariants. Called once at startup;
    /// a failure here means the bank itself is wrong, not user input.
    pub fn validate(&self) -> Result<()> {
        let mut seen_ids = BTreeSet::new();
        for q in &self.questions {
            if !seen_ids.insert(q.id.as_str()) {
                bail!("duplicate question id '{}'", q.id);
            }
            for trait_id in q.target.trait_ids() {
                if !is_known_trait(trait_id) {
                    bail!("question '{}' references unknown trait '{}'", q.id, trait_id);
                }
            }
            for opt in &q.options {
                if let Some(trait_id) = &opt.trait_id {
                    if !is_known_trait(trait_id) {
                        bail!(
                            "option '{}' of question '{}' references unknown trait '{}'",
                            opt.id,
                            q.id,
                            trait_id
                        );
                    }
                }
            }
            if q.reversed && q.kind != QuestionKind::Slider {
                bail!("question '{}' is reversed but not a slider", q.id);
            }
            match q.kind {
                QuestionKind::MultipleChoice | QuestionKind::PointsAllocation => {
                    if q.options.is_empty() {
                        bail!("question '{}' has no options", q.id);
                    }
                }
                _ => {}
            }
            if let Some(answer) = &q.answer {
                if q.kind != QuestionKind::MultipleChoice {
                    bail!("question '{}' has a correct answer but is not multiple choice", q.id);
                }
                if !q.options.iter().any(|o| &o.id == answer) {
                    bail!("question '{}' answer '{}' is not one of its options", q.id, answer);
                }
            }
        }
        Ok(())
    }

    /// The built-in assessment: 83 questions across the 8 categories.
    pub fn builtin() -> Self {
        let mut questions = vec![
            // === Holland Code (RIASEC) - 12 questions ===
            slider("I like to work with my hands and use tools to build or repair things.", "realistic", Category::HollandCode),
            slider("I enjoy solving complex problems and understanding how things work.", "investigative", Category::HollandCode),
            slider("I am creative and enjoy expressing myself through art, music, or writing.", "artistic", Category::HollandCode),
            slider("I like helping people, teaching them, or providing care.", "social", Category::HollandCode),
            slider("I am ambitious and enjoy leading people and making decisions.", "enterprising", Category::HollandCode),
            slider("I like to work with data, have clear instructions, and keep things organized.", "conventional", Category::HollandCode),
            slider("I prefer practical, hands-on tasks over theoretical ones.", "realistic", Category::HollandCode),
            slider("I am curious and enjoy conducting research or experiments.", "investigative", Category::HollandCode),
            slider("I prefer unstructured situations that allow for self-expression.", "artistic", Category::HollandCode),
            slider("I am a good listener and enjoy working in teams.", "social", Category::HollandCode),
            slider("I am persuasive and enjoy selling ideas or products.", "enterprising", Category::HollandCode),
            slider("I am detail-oriented and enjoy following established procedures.", "conventional", Category::HollandCode),
            // === Big Five Personality - 15 questions ===
            slider("I am the life of the party.", "extraversion", Category::BigFive),
            reversed_slider("I prefer to spend my time alone or with a small group of close friends.", "extraversion", Category::BigFive),
            slider("I am sympathetic towards others' feelings.", "agreeableness", Category::BigFive),
            reversed_slider("I tend to be critical of others.", "agreeableness", Category::BigFive),
            slider("I am always prepared and organized.", "conscientiousness", Category::BigFive),
            reversed_slider("I tend to be messy and disorganized.", "conscientiousness", Category::BigFive),
            reversed_slider("I am relaxed most of the time.", "neuroticism", Category::BigFive),
            slider("I get stressed out easily.", "neuroticism", Category::BigFive),
            slider("I have a vivid imagination and enjoy abstract ideas.", "openness", Category::BigFive),
            reversed_slider("I am not interested in abstract ideas and prefer concrete facts.", "openness", Category::BigFive),
            slider("I start conversations with new people.", "extraversion", Category::BigFive),
            slider("I am interested in people's problems.", "agreeableness", Category::BigFive),
            slider("I pay attention to details.", "conscientiousness", Category::BigFive),
            slider("I often feel sad or down.", "neuroticism", Category::BigFive),
            slider("I am full of new, good ideas.", "openness", Category::BigFive),
            // === Emotional Intelligence - 10 questions ===
            slider("I can recognize my own emotions as they happen.", "self_awareness", Category::EmotionalIntelligence),
            slider("I am good at managing my impulses and staying calm under pressure.", "self_regulation", Category::EmotionalIntelligence),
            slider("I am driven to achieve my goals, even when faced with obstacles.", "motivation", Category::EmotionalIntelligence),
            slider("I can easily understand and share the feelings of others.", "empathy", Category::EmotionalIntelligence),
            slider("I am skilled at handling relationships and building networks.", "social_skills", Category::EmotionalIntelligence),
            slider("I have a clear understanding of my personal strengths and weaknesses.", "self_awareness", Category::EmotionalIntelligence),
            slider("I can adapt to changing situations and overcome setbacks.", "self_regulation", Category::EmotionalIntelligence),
            slider("I am optimistic about the future.", "motivation", Category::EmotionalIntelligence),
            slider("I am sensitive to the emotional needs of others.", "empathy", Category::EmotionalIntelligence),
            slider("I can communicate my ideas clearly and persuasively.", "social_skills", Category::EmotionalIntelligence),
            // === Personal SWOT Analysis - 8 questions ===
            swot_q("What are your key professional strengths? (e.g., specific skills, knowledge, network)", "analytical", SwotKind::Strength),
            swot_q("What skills or professional areas do you need to improve?", "analytical", SwotKind::Weakness),
            swot_q("What are your proudest professional achievements?", "analytical", SwotKind::Strength),
            swot_q("What tasks do you usually avoid because you don't feel confident doing them?", "analytical", SwotKind::Weakness),
            swot_q("What industry trends or new technologies can you leverage for your career?", "problem_solving", SwotKind::Opportunity),
            swot_q("What new skills could you learn to become more valuable in your field?", "problem_solving", SwotKind::Opportunity),
            swot_q("What obstacles are currently hindering your professional growth?", "creativity", SwotKind::Threat),
            swot_q("What are your competitors (peers, other companies) doing that you should be aware of?", "creativity", SwotKind::Threat),
            // === Situational Judgment Test - 8 scenarios ===
            sjt("You are leading a project, and a key team member is consistently missing deadlines. This is delaying the entire project. What do you do?", &["sjt_communication", "sjt_problem_solving"]),
            sjt("You notice a junior colleague is struggling with their tasks and seems afraid to ask for help. How do you approach the situation?", &["sjt_interpersonal", "sjt_communication"]),
            sjt("You are in a meeting, and a senior colleague presents an idea that you know is based on incorrect data. What is your course of action?", &["sjt_communication"]),
            sjt("Your team has been given a new, urgent project with a tight deadline, but everyone is already at full capacity. How do you handle this?", &["sjt_problem_solving"]),
            sjt("You receive negative feedback from a client about your work. How do you respond?", &["sjt_interpersonal", "sjt_communication"]),
            sjt("You discover a more efficient way to do a routine task, but it goes against the established process. What do you do?", &["sjt_problem_solving"]),
            sjt("A colleague from another department asks for your help on a task that is not your responsibility and will take up a significant amount of your time. How do you reply?", &["sjt_interpersonal", "sjt_communication"]),
            sjt("You have made a mistake that will impact the project timeline. What are your immediate next steps?", &["sjt_problem_solving", "sjt_communication"]),
            // === Cognitive Puzzles - 5 puzzles ===
            text_q("What has an eye, but cannot see?", "puzzle_solving", Category::Puzzles),
            text_q("You have a 3-gallon jug and a 5-gallon jug. How can you measure out exactly 4 gallons of water?", "puzzle_solving", Category::Puzzles),
            text_q("A man is looking at a portrait. Someone asks him whose portrait he is looking at, and he replies, 'Brothers and sisters I have none, but that man's father is my father's son.' Who is in the portrait?", "puzzle_solving", Category::Puzzles),
            text_q("What is full of holes but still holds water?", "puzzle_solving", Category::Puzzles),
            text_q("Which word in the dictionary is spelled incorrectly?", "puzzle_solving", Category::Puzzles),
            // === Core Aptitude - 24 questions, 6 per section ===
            // Numerical reasoning
            text_q("If a car travels at 60 km/h, how far will it travel in 2.5 hours?", "numerical_reasoning", Category::Aptitude),
            text_q("A shirt originally priced at ₹1200 is on sale for 25% off. What is the sale price?", "numerical_reasoning", Category::Aptitude),
            text_q("What is the next number in the sequence: 2, 5, 11, 23, ...?", "numerical_reasoning", Category::Aptitude),
            text_q("If 5 workers can build a wall in 8 hours, how long would it take 4 workers?", "numerical_reasoning", Category::Aptitude),
            text_q("The average of three numbers is 15. If two of the numbers are 12 and 18, what is the third number?", "numerical_reasoning", Category::Aptitude),
            text_q("A company's profit increased from ₹50,000 to ₹70,000. What is the percentage increase?", "numerical_reasoning", Category::Aptitude),
            // Verbal reasoning
            text_q("Which word is the odd one out: apple, banana, rose, orange?", "verbal_reasoning", Category::Aptitude),
            text_q("Complete the analogy: Doctor is to Hospital as Teacher is to ________.", "verbal_reasoning", Category::Aptitude),
            text_q("Rearrange the letters 'RTAEWH' to form a meaningful word.", "verbal_reasoning", Category::Aptitude),
            text_q("Choose the word that is most nearly opposite in meaning to 'generous'.", "verbal_reasoning", Category::Aptitude),
            text_q("If 'CAT' is coded as 'DBU', how is 'DOG' coded?", "verbal_reasoning", Category::Aptitude),
            text_q("What is the main idea of the proverb 'A stitch in time saves nine'?", "verbal_reasoning", Category::Aptitude),
            // Logical reasoning
            text_q("All artists are creative. Some creative people are introverts. Can we conclude that some artists are introverts?", "logical_reasoning", Category::Aptitude),
            text_q("If A is the brother of B, B is the sister of C, and C is the father of D, how is D related to A?", "logical_reasoning", Category::Aptitude),
            text_q("Look at this series: 7, 10, 8, 11, 9, 12, ... What number should come next?", "logical_reasoning", Category::Aptitude),
            text_q("Statements: 1. All clouds are white. 2. Some white things are birds. Conclusion: Some clouds are birds. Is the conclusion valid?", "logical_reasoning", Category::Aptitude),
            text_q("There are five houses in a row. The red house is to the left of the green house. The blue house is to the right of the red house and to the left of the yellow house. The green house is between the white and blue houses. Which house is in the middle?", "logical_reasoning", Category::Aptitude),
            text_q("If you are facing North and you turn right, then turn 180 degrees, which direction are you facing now?", "logical_reasoning", Category::Aptitude),
            // Spatial reasoning
            text_q("Which of the 2D shapes below can be folded to form a cube?", "spatial_reasoning", Category::Aptitude),
            text_q("Imagine a 3x3 grid. If you place a dot in the top-left corner and it moves one step right and then one step down, where is it now?", "spatial_reasoning", Category::Aptitude),
            text_q("You see a shape in a mirror. It looks like the letter 'b'. What is the actual letter?", "spatial_reasoning", Category::Aptitude),
            text_q("If you rotate a square by 45 degrees, what shape does it become?", "spatial_reasoning", Category::Aptitude),
            text_q("Which shape completes the pattern: [Circle, Triangle, Square, Circle, ... ]?", "spatial_reasoning", Category::Aptitude),
            text_q("A cube is painted red on all sides. It is then cut into 27 smaller cubes. How many of the smaller cubes have exactly one side painted red?", "spatial_reasoning", Category::Aptitude),
            // === Work Values - 1 points-allocation question ===
            work_values_question(),
        ];

        for (i, q) in questions.iter_mut().enumerate() {
            q.id = format!("q_{i}");
        }

        Self { questions }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Bank construction helpers — ids are assigned by position in builtin()
// ────────────────────────────────────────────────────────────────────────────

fn slider(text: &str, trait_id: &str, category: Category) -> Question {
    Question {
        id: String::new(),
        text: text.to_string(),
        target: TraitTarget::One(trait_id.to_string()),
        reversed: false,
        category,
        kind: QuestionKind::Slider,
        options: vec![],
        answer: None,
        swot: None,
    }
}

fn reversed_slider(text: &str, trait_id: &str, category: Category) -> Question {
    Question {
        reversed: true,
        ..slider(text, trait_id, category)
    }
}

fn text_q(text: &str, trait_id: &str, category: Category) -> Question {
    Question {
        kind: QuestionKind::TextInput,
        ..slider(text, trait_id, category)
    }
}

fn swot_q(text: &str, trait_id: &str, kind: SwotKind) -> Question {
    Question {
        swot: Some(kind),
        ..text_q(text, trait_id, Category::Swot)
    }
}

fn sjt(text: &str, trait_ids: &[&str]) -> Question {
    let target = if trait_ids.len() == 1 {
        TraitTarget::One(trait_ids[0].to_string())
    } else {
        TraitTarget::Many(trait_ids.iter().map(|t| t.to_string()).collect())
    };
    Question {
        id: String::new(),
        text: text.to_string(),
        target,
        reversed: false,
        category: Category::Sjt,
        kind: QuestionKind::TextInput,
        options: vec![],
        answer: None,
        swot: None,
    }
}

fn work_values_question() -> Question {
    let bucket = |id: &str, content: &str, description: &str| QuestionOption {
        id: id.to_string(),
        content: content.to_string(),
        description: Some(description.to_string()),
        trait_id: None,
    };
    Question {
        id: String::new(),
        text: "You have been granted 100 'Influence Points' to shape the future of your ideal \
               workplace. Allocate these points across the following 'City Edicts' based on what \
               you value most in a career. You must use all 100 points."
            .to_string(),
        target: TraitTarget::Many(vec![
            "work_value_prosperity".to_string(),
            "work_value_harmony".to_string(),
            "work_value_pioneer".to_string(),
            "work_value_guardian".to_string(),
            "work_value_autonomy".to_string(),
            "work_value_impact".to_string(),
        ]),
        reversed: false,
        category: Category::WorkValues,
        kind: QuestionKind::PointsAllocation,
        options: vec![
            bucket("prosperity", "Prosperity", "Boost economic growth and financial success."),
            bucket("harmony", "Harmony", "Foster a collaborative and supportive community."),
            bucket("pioneer", "Pioneer", "Drive innovation and cutting-edge discovery."),
            bucket("guardian", "Guardian", "Ensure stability, security, and tradition."),
            bucket("autonomy", "Autonomy", "Promote independence and creative freedom."),
            bucket("impact", "Impact", "Make a tangible difference and help others."),
        ],
        answer: None,
        swot: None,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
