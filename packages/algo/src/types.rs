//! Common Types and Constants
//!
//! Shared data structures used across all engine modules.

use std::fmt;

use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Numerical stability epsilon
pub const EPSILON: f64 = 1e-10;

/// Attempts required before a format's statistics are trusted
pub const MIN_ATTEMPTS_FOR_CONFIDENCE: u32 = 3;

/// Response-time ceiling (seconds) used when normalising speed into a score
pub const RESPONSE_TIME_CEILING: f64 = 20.0;

/// Weight of the success rate in the overall learning-style composite
pub const SUCCESS_RATE_WEIGHT: f64 = 0.7;

/// Weight of the normalised speed in the overall learning-style composite
pub const SPEED_WEIGHT: f64 = 0.3;

/// Question budget of a standard practice test
pub const DEFAULT_QUESTION_BUDGET: u32 = 20;

// ==================== Category ====================

/// Skill category a question belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Grammar,
    Vocabulary,
    Reading,
    Listening,
    Speaking,
}

impl Category {
    /// The fixed category list, in canonical order
    pub const ALL: [Category; 5] = [
        Category::Grammar,
        Category::Vocabulary,
        Category::Reading,
        Category::Listening,
        Category::Speaking,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "grammar" => Some(Category::Grammar),
            "vocabulary" => Some(Category::Vocabulary),
            "reading" => Some(Category::Reading),
            "listening" => Some(Category::Listening),
            "speaking" => Some(Category::Speaking),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Grammar => "grammar",
            Category::Vocabulary => "vocabulary",
            Category::Reading => "reading",
            Category::Listening => "listening",
            Category::Speaking => "speaking",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==================== Question Format ====================

/// Presentation format of a question
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum QuestionFormat {
    #[default]
    MultipleChoice,
    FillInBlank,
    TrueFalse,
    Matching,
    ShortAnswer,
}

impl QuestionFormat {
    pub const ALL: [QuestionFormat; 5] = [
        QuestionFormat::MultipleChoice,
        QuestionFormat::FillInBlank,
        QuestionFormat::TrueFalse,
        QuestionFormat::Matching,
        QuestionFormat::ShortAnswer,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "multiple_choice" => Some(QuestionFormat::MultipleChoice),
            "fill_in_blank" => Some(QuestionFormat::FillInBlank),
            "true_false" => Some(QuestionFormat::TrueFalse),
            "matching" => Some(QuestionFormat::Matching),
            "short_answer" => Some(QuestionFormat::ShortAnswer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionFormat::MultipleChoice => "multiple_choice",
            QuestionFormat::FillInBlank => "fill_in_blank",
            QuestionFormat::TrueFalse => "true_false",
            QuestionFormat::Matching => "matching",
            QuestionFormat::ShortAnswer => "short_answer",
        }
    }
}

impl fmt::Display for QuestionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==================== Proficiency Level ====================

/// Discrete proficiency label produced by the level classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProficiencyLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl ProficiencyLevel {
    /// Upper bound (inclusive) of the beginner band on the 0-100 scale
    pub const BEGINNER_MAX: f64 = 40.0;
    /// Upper bound (inclusive) of the intermediate band on the 0-100 scale
    pub const INTERMEDIATE_MAX: f64 = 70.0;

    /// Map a defuzzified proficiency score onto a level
    pub fn from_score(score: f64) -> Self {
        if score <= Self::BEGINNER_MAX {
            ProficiencyLevel::Beginner
        } else if score <= Self::INTERMEDIATE_MAX {
            ProficiencyLevel::Intermediate
        } else {
            ProficiencyLevel::Advanced
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProficiencyLevel::Beginner => "Beginner",
            ProficiencyLevel::Intermediate => "Intermediate",
            ProficiencyLevel::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for ProficiencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==================== Answer Record ====================

/// One graded answer as delivered by the persistence layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub learner_id: String,
    pub question_id: i64,
    pub category: Category,
    pub format: QuestionFormat,
    pub is_correct: bool,
    /// Seconds spent answering
    pub response_time: f64,
}
