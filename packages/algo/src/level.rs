//! Proficiency Level Classifier
//!
//! Fixed Mamdani configuration with two inputs and one output:
//!
//! | variable        | universe      | labels                                                   |
//! |-----------------|---------------|----------------------------------------------------------|
//! | `score`         | 0-100, step 1 | low (0,20,40), medium (30,50,70), high (60,80,100)       |
//! | `response_time` | 0-20, step .5 | slow ramp-up (10,20), normal (4,8,12), fast ramp-down (0,5) |
//! | `proficiency`   | 0-100, step 1 | beginner (0,20,40), intermediate (30,50,70), advanced (60,80,100) |
//!
//! The rule base is the full 3x3 cross product of score x time labels, and
//! every rule for a given score label shares the same consequent, so the
//! response time can never push a learner across a score band.
//!
//! The score variable has open edges: a score of exactly 0 or 100 keeps
//! full membership in `low` / `high` instead of sitting on a triangle foot.

use std::collections::HashMap;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::fuzzy::{
    EngineBuilder, FuzzyError, InferenceEngine, MembershipShape, OutOfRangePolicy, Universe,
    Variable, VariableId,
};
use crate::types::ProficiencyLevel;

pub const SCORE_VARIABLE: &str = "score";
pub const RESPONSE_TIME_VARIABLE: &str = "response_time";
pub const PROFICIENCY_VARIABLE: &str = "proficiency";

/// Score label -> proficiency label; time labels never change the consequent
const SCORE_RULES: [(&str, &str); 3] = [
    ("low", "beginner"),
    ("medium", "intermediate"),
    ("high", "advanced"),
];

const TIME_LABELS: [&str; 3] = ["slow", "normal", "fast"];

/// Outcome of one classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelClassification {
    pub level: ProficiencyLevel,
    /// Defuzzified score rounded to an integer in [0, 100]
    pub proficiency_score: u8,
    /// Unrounded centroid
    pub raw_score: f64,
    /// Inputs that were outside their universe and got clamped
    pub clamped_inputs: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LevelClassifier {
    engine: InferenceEngine,
    score: VariableId,
    response_time: VariableId,
    proficiency: VariableId,
}

impl LevelClassifier {
    /// Classifier that clamps out-of-range inputs
    pub fn new() -> Result<Self, FuzzyError> {
        Self::with_policy(OutOfRangePolicy::Clamp)
    }

    pub fn with_policy(policy: OutOfRangePolicy) -> Result<Self, FuzzyError> {
        let mut builder = EngineBuilder::new();
        builder.out_of_range(policy);

        let score = builder.add_input(
            Variable::new(
                SCORE_VARIABLE,
                Universe::new(0.0, 100.0, 1.0)?,
                [
                    ("low", MembershipShape::triangular(0.0, 20.0, 40.0)?),
                    ("medium", MembershipShape::triangular(30.0, 50.0, 70.0)?),
                    ("high", MembershipShape::triangular(60.0, 80.0, 100.0)?),
                ],
            )?
            .with_open_edges(),
        );

        let response_time = builder.add_input(Variable::new(
            RESPONSE_TIME_VARIABLE,
            Universe::new(0.0, 20.0, 0.5)?,
            [
                ("slow", MembershipShape::step_up(10.0, 20.0)?),
                ("normal", MembershipShape::triangular(4.0, 8.0, 12.0)?),
                ("fast", MembershipShape::step_down(0.0, 5.0)?),
            ],
        )?);

        let proficiency = builder.add_output(Variable::new(
            PROFICIENCY_VARIABLE,
            Universe::new(0.0, 100.0, 1.0)?,
            [
                ("beginner", MembershipShape::triangular(0.0, 20.0, 40.0)?),
                ("intermediate", MembershipShape::triangular(30.0, 50.0, 70.0)?),
                ("advanced", MembershipShape::triangular(60.0, 80.0, 100.0)?),
            ],
        )?);

        for (score_label, level_label) in SCORE_RULES {
            for time_label in TIME_LABELS {
                builder
                    .when(score, score_label)
                    .and(response_time, time_label)
                    .then(proficiency, level_label);
            }
        }

        Ok(Self {
            engine: builder.build()?,
            score,
            response_time,
            proficiency,
        })
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    /// Classify a test score (0-100) and average response time (seconds)
    pub fn classify(&self, score: f64, avg_response_time: f64) -> Result<LevelClassification, FuzzyError> {
        self.classify_before(score, avg_response_time, None)
    }

    pub fn classify_before(
        &self,
        score: f64,
        avg_response_time: f64,
        deadline: Option<Instant>,
    ) -> Result<LevelClassification, FuzzyError> {
        let inputs = HashMap::from([(self.score, score), (self.response_time, avg_response_time)]);
        let result = self.engine.evaluate_before(&inputs, deadline)?;

        let raw_score = result
            .get(self.proficiency)
            .ok_or_else(|| FuzzyError::NoApplicableRule {
                variable: PROFICIENCY_VARIABLE.to_string(),
            })?;

        Ok(LevelClassification {
            level: ProficiencyLevel::from_score(raw_score),
            proficiency_score: raw_score.round().clamp(0.0, 100.0) as u8,
            raw_score,
            clamped_inputs: result.clamped,
        })
    }

    /// Classify many `(score, response_time)` pairs in parallel
    pub fn classify_batch(&self, inputs: &[(f64, f64)]) -> Vec<Result<LevelClassification, FuzzyError>> {
        inputs
            .par_iter()
            .map(|&(score, time)| self.classify(score, time))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> LevelClassifier {
        LevelClassifier::new().unwrap()
    }

    #[test]
    fn test_rule_base_is_full_cross_product() {
        assert_eq!(classifier().engine().rules().len(), 9);
    }

    #[test]
    fn test_perfect_fast_is_advanced() {
        let result = classifier().classify(100.0, 0.0).unwrap();
        assert_eq!(result.level, ProficiencyLevel::Advanced);
        assert!(result.proficiency_score > 70);
        assert_eq!(result.proficiency_score, 80);
    }

    #[test]
    fn test_zero_slow_is_beginner() {
        let result = classifier().classify(0.0, 20.0).unwrap();
        assert_eq!(result.level, ProficiencyLevel::Beginner);
        assert!(result.proficiency_score <= 40);
        assert_eq!(result.proficiency_score, 20);
    }

    #[test]
    fn test_middle_is_intermediate() {
        let result = classifier().classify(50.0, 8.0).unwrap();
        assert_eq!(result.level, ProficiencyLevel::Intermediate);
        assert_eq!(result.proficiency_score, 50);
    }

    #[test]
    fn test_time_never_overrides_score() {
        let c = classifier();
        let mut t = 0.0;
        while t <= 20.0 {
            assert_eq!(c.classify(90.0, t).unwrap().level, ProficiencyLevel::Advanced);
            assert_eq!(c.classify(50.0, t).unwrap().level, ProficiencyLevel::Intermediate);
            assert_eq!(c.classify(10.0, t).unwrap().level, ProficiencyLevel::Beginner);
            t += 0.5;
        }
    }

    #[test]
    fn test_score_dominance_on_grid() {
        let c = classifier();
        for half_seconds in 0..=40 {
            let time = half_seconds as f64 * 0.5;
            let mut previous = ProficiencyLevel::Beginner;
            for score in 0..=100 {
                let result = c.classify(score as f64, time).unwrap();
                assert!(
                    result.level >= previous,
                    "level dropped at score {score}, time {time}"
                );
                previous = result.level;
            }
        }
    }

    #[test]
    fn test_out_of_range_inputs_are_clamped() {
        let result = classifier().classify(130.0, 45.0).unwrap();
        assert_eq!(result.level, ProficiencyLevel::Advanced);
        assert_eq!(
            result.clamped_inputs,
            vec![RESPONSE_TIME_VARIABLE.to_string(), SCORE_VARIABLE.to_string()]
        );

        let low = classifier().classify(-10.0, 3.0).unwrap();
        assert_eq!(low.level, ProficiencyLevel::Beginner);
        assert_eq!(low.clamped_inputs, vec![SCORE_VARIABLE.to_string()]);
    }

    #[test]
    fn test_reject_policy() {
        let strict = LevelClassifier::with_policy(OutOfRangePolicy::Reject).unwrap();
        assert!(matches!(
            strict.classify(101.0, 5.0),
            Err(FuzzyError::InputOutOfRange { .. })
        ));
        assert!(strict.classify(100.0, 5.0).is_ok());
    }

    #[test]
    fn test_nan_is_rejected() {
        assert!(matches!(
            classifier().classify(f64::NAN, 5.0),
            Err(FuzzyError::NonFiniteInput { .. })
        ));
    }

    #[test]
    fn test_batch_matches_sequential() {
        let c = classifier();
        let inputs = vec![(100.0, 0.0), (0.0, 20.0), (50.0, 8.0), (f64::INFINITY, 1.0)];
        let batch = c.classify_batch(&inputs);
        assert_eq!(batch.len(), 4);
        for (result, &(score, time)) in batch.iter().zip(inputs.iter()) {
            assert_eq!(result, &c.classify(score, time));
        }
        assert!(batch[3].is_err());
    }
}
