//! # epp-algo - adaptive assessment engine
//!
//! Pure Rust building blocks for an English practice platform:
//!
//! - **Fuzzy inference** - Mamdani min/max rules with centroid defuzzification
//! - **Level classification** - test score and response time to a proficiency level
//! - **Learning style** - per-format running statistics and format recommendations
//! - **Allocation** - mistake-weighted question budgets and question selection
//!
//! Nothing here performs I/O or logs. Out-of-range inputs, missing data and
//! fallbacks are reported through return values so the service layer decides
//! what to record.
//!
//! ## Modules
//!
//! - [`fuzzy`] - membership shapes, variables and the inference engine
//! - [`level`] - the fixed score/response-time classifier
//! - [`learning_style`] - learning preference updates and queries
//! - [`mistakes`] - mistake profiles and misconception reports
//! - [`allocation`] - rank-banded allocation policy and practice plans
//! - [`selection`] - realising a plan from a question pool
//! - [`types`] - shared enums and constants
//!
//! ## Example
//!
//! ```rust
//! use epp_algo::{allocate, AllocationPolicy, Category, LevelClassifier, MistakeProfile};
//!
//! let classifier = LevelClassifier::new().unwrap();
//! let level = classifier.classify(85.0, 6.0).unwrap();
//! assert_eq!(level.level.as_str(), "Advanced");
//!
//! let profile = MistakeProfile::from_counts([(Category::Grammar, 4), (Category::Reading, 1)]);
//! let plan = allocate(&profile, 20, &Category::ALL, &AllocationPolicy::standard()).unwrap();
//! assert_eq!(plan.total(), 20);
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod allocation;
pub mod fuzzy;
pub mod learning_style;
pub mod level;
pub mod mistakes;
pub mod selection;
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use types::*;

pub use fuzzy::{EngineBuilder, FuzzyError, InferenceEngine, InferenceResult, OutOfRangePolicy};

pub use level::{LevelClassification, LevelClassifier};

pub use learning_style::{
    apply_attempt, best_format, overall_style, recommended_formats, Attempt, AttemptError,
    FormatStats, LearningPreference, PreferenceKey, StyleAnalysis, StyleConfig, StyleSummary,
};

pub use mistakes::{Misconception, MistakeProfile};

pub use allocation::{
    allocate, AllocationError, AllocationMode, AllocationPlan, AllocationPolicy,
    CategoryAllocation, PlannedCategory, PracticePlan, RankBand,
};

pub use selection::{seeded_rng, select_questions, QuestionRef, SelectedQuestion, Selection, SelectionSource};
