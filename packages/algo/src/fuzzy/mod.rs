//! Rule-based (Mamdani) fuzzy inference
//!
//! - [`membership`] - triangular and ramp membership shapes
//! - [`variable`] - universes and labelled variables
//! - [`engine`] - rule builder, min/max inference and centroid defuzzification
//! - [`error`] - construction and evaluation failures

pub mod engine;
pub mod error;
pub mod membership;
pub mod variable;

pub use engine::{
    Clause, EngineBuilder, InferenceEngine, InferenceResult, OutOfRangePolicy, Rule, RuleBuilder,
    VariableId,
};
pub use error::FuzzyError;
pub use membership::MembershipShape;
pub use variable::{Term, Universe, Variable};
