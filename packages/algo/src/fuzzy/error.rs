use thiserror::Error;

/// Failures of the fuzzy inference stack.
///
/// Shape, universe, label and rule-set variants come out of builders and
/// validators. `UnknownVariable` and `NotAnInput` are raised both by the
/// builder and by `evaluate` when an input map names the wrong variable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FuzzyError {
    #[error("invalid membership shape: {0}")]
    InvalidShape(String),
    #[error("invalid universe [{min}, {max}] with step {step}")]
    InvalidUniverse { min: f64, max: f64, step: f64 },
    #[error("duplicate label '{label}' on variable '{variable}'")]
    DuplicateLabel { variable: String, label: String },
    #[error("label '{label}' leaves the universe of variable '{variable}'")]
    ShapeOutOfUniverse { variable: String, label: String },
    #[error("variable '{variable}' has no label '{label}'")]
    UnknownLabel { variable: String, label: String },
    #[error("unknown variable #{0}")]
    UnknownVariable(usize),
    #[error("variable '{0}' is not an input")]
    NotAnInput(String),
    #[error("variable '{0}' is not an output")]
    NotAnOutput(String),
    #[error("rule set is empty")]
    EmptyRuleSet,
    #[error("rule #{0} has no antecedent clause")]
    EmptyAntecedent(usize),

    #[error("no input supplied for variable '{0}'")]
    MissingInput(String),
    #[error("input {value} for '{variable}' is outside [{min}, {max}]")]
    InputOutOfRange {
        variable: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("input for '{variable}' is not finite ({value})")]
    NonFiniteInput { variable: String, value: f64 },
    #[error("deadline exceeded before defuzzification")]
    DeadlineExceeded,
    #[error("no applicable rule for output '{variable}'")]
    NoApplicableRule { variable: String },
}

impl FuzzyError {
    /// True for errors that can only arise while building shapes, variables or engines
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            FuzzyError::InvalidShape(_)
                | FuzzyError::InvalidUniverse { .. }
                | FuzzyError::DuplicateLabel { .. }
                | FuzzyError::ShapeOutOfUniverse { .. }
                | FuzzyError::UnknownLabel { .. }
                | FuzzyError::NotAnOutput(_)
                | FuzzyError::EmptyRuleSet
                | FuzzyError::EmptyAntecedent(_)
        )
    }
}
