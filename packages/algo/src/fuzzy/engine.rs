//! Mamdani Inference Engine
//!
//! Evaluation pipeline:
//! 1. Fuzzify every input variable against all of its labels
//! 2. Rule firing strength = min over antecedent clauses (fuzzy AND)
//! 3. Label activation = max firing strength among rules targeting it
//! 4. Discretised centroid over the output universe, where each sample's
//!    aggregate degree is `max_label min(activation, membership)`
//!
//! Rules are fixed once the engine is built. An output whose aggregate
//! surface is identically zero yields `NoApplicableRule`.

use std::collections::HashMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::error::FuzzyError;
use super::variable::Variable;
use crate::types::EPSILON;

// ==================== Identifiers ====================

/// Handle of a variable registered with an [`EngineBuilder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariableId(usize);

impl VariableId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Input,
    Output,
}

/// What to do with an input outside its variable's universe
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutOfRangePolicy {
    /// Move the input to the nearest bound and report it in [`InferenceResult::clamped`]
    #[default]
    Clamp,
    /// Fail with [`FuzzyError::InputOutOfRange`]
    Reject,
}

// ==================== Rules ====================

/// One `(variable, label)` clause with the label resolved to its index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clause {
    pub variable: VariableId,
    pub label: usize,
}

/// Conjunctive antecedents with a single consequent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub antecedents: Vec<Clause>,
    pub consequent: Clause,
}

#[derive(Debug, Clone)]
struct PendingRule {
    antecedents: Vec<(VariableId, String)>,
    consequent: (VariableId, String),
}

// ==================== Builder ====================

/// Collects variables and rules, validating everything in [`EngineBuilder::build`]
#[derive(Debug, Clone, Default)]
pub struct EngineBuilder {
    variables: Vec<(Variable, Role)>,
    rules: Vec<PendingRule>,
    policy: OutOfRangePolicy,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_input(&mut self, variable: Variable) -> VariableId {
        self.variables.push((variable, Role::Input));
        VariableId(self.variables.len() - 1)
    }

    pub fn add_output(&mut self, variable: Variable) -> VariableId {
        self.variables.push((variable, Role::Output));
        VariableId(self.variables.len() - 1)
    }

    pub fn out_of_range(&mut self, policy: OutOfRangePolicy) -> &mut Self {
        self.policy = policy;
        self
    }

    /// Start a rule: `when(score, "low").and(time, "slow").then(level, "beginner")`
    pub fn when(&mut self, variable: VariableId, label: &str) -> RuleBuilder<'_> {
        RuleBuilder {
            builder: self,
            antecedents: vec![(variable, label.to_string())],
        }
    }

    pub fn build(self) -> Result<InferenceEngine, FuzzyError> {
        if self.rules.is_empty() {
            return Err(FuzzyError::EmptyRuleSet);
        }

        let mut rules = Vec::with_capacity(self.rules.len());
        for (index, pending) in self.rules.iter().enumerate() {
            if pending.antecedents.is_empty() {
                return Err(FuzzyError::EmptyAntecedent(index));
            }

            let mut antecedents = Vec::with_capacity(pending.antecedents.len());
            for (id, label) in &pending.antecedents {
                let variable = lookup(&self.variables, *id, Role::Input)?;
                antecedents.push(resolve(variable, *id, label)?);
            }

            let (out_id, out_label) = &pending.consequent;
            let output = lookup(&self.variables, *out_id, Role::Output)?;
            let consequent = resolve(output, *out_id, out_label)?;

            rules.push(Rule {
                antecedents,
                consequent,
            });
        }

        Ok(InferenceEngine {
            variables: self.variables,
            rules,
            policy: self.policy,
        })
    }
}

/// Fluent rule construction; the rule is registered by [`RuleBuilder::then`]
pub struct RuleBuilder<'a> {
    builder: &'a mut EngineBuilder,
    antecedents: Vec<(VariableId, String)>,
}

impl<'a> RuleBuilder<'a> {
    pub fn and(mut self, variable: VariableId, label: &str) -> Self {
        self.antecedents.push((variable, label.to_string()));
        self
    }

    pub fn then(self, variable: VariableId, label: &str) {
        self.builder.rules.push(PendingRule {
            antecedents: self.antecedents,
            consequent: (variable, label.to_string()),
        });
    }
}

fn lookup(
    variables: &[(Variable, Role)],
    id: VariableId,
    expected: Role,
) -> Result<&Variable, FuzzyError> {
    let (variable, role) = variables
        .get(id.0)
        .ok_or(FuzzyError::UnknownVariable(id.0))?;
    match (expected, *role) {
        (Role::Input, Role::Output) => Err(FuzzyError::NotAnInput(variable.name().to_string())),
        (Role::Output, Role::Input) => Err(FuzzyError::NotAnOutput(variable.name().to_string())),
        _ => Ok(variable),
    }
}

fn resolve(variable: &Variable, id: VariableId, label: &str) -> Result<Clause, FuzzyError> {
    let index = variable
        .label_index(label)
        .ok_or_else(|| FuzzyError::UnknownLabel {
            variable: variable.name().to_string(),
            label: label.to_string(),
        })?;
    Ok(Clause {
        variable: id,
        label: index,
    })
}

// ==================== Result ====================

/// Crisp outputs of one evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    /// Defuzzified value per output variable
    pub outputs: HashMap<VariableId, f64>,
    /// Names of input variables whose value was clamped into the universe
    pub clamped: Vec<String>,
}

impl InferenceResult {
    pub fn get(&self, id: VariableId) -> Option<f64> {
        self.outputs.get(&id).copied()
    }
}

// ==================== Engine ====================

/// Immutable Mamdani engine
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    variables: Vec<(Variable, Role)>,
    rules: Vec<Rule>,
    policy: OutOfRangePolicy,
}

impl InferenceEngine {
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn variable(&self, id: VariableId) -> Option<&Variable> {
        self.variables.get(id.0).map(|(v, _)| v)
    }

    pub fn policy(&self) -> OutOfRangePolicy {
        self.policy
    }

    pub fn evaluate(&self, inputs: &HashMap<VariableId, f64>) -> Result<InferenceResult, FuzzyError> {
        self.evaluate_before(inputs, None)
    }

    /// Evaluate, failing with `DeadlineExceeded` if `deadline` has passed
    /// once rule aggregation is done.
    pub fn evaluate_before(
        &self,
        inputs: &HashMap<VariableId, f64>,
        deadline: Option<Instant>,
    ) -> Result<InferenceResult, FuzzyError> {
        let (crisp, clamped) = self.prepare_inputs(inputs)?;

        // Fuzzification: degrees[var][label] for input variables only
        let mut degrees: Vec<Option<Vec<f64>>> = vec![None; self.variables.len()];
        for rule in &self.rules {
            for clause in &rule.antecedents {
                let idx = clause.variable.0;
                if degrees[idx].is_some() {
                    continue;
                }
                let (variable, _) = &self.variables[idx];
                let value = crisp[idx].ok_or_else(|| FuzzyError::MissingInput(variable.name().to_string()))?;
                degrees[idx] = Some(variable.fuzzify(value));
            }
        }

        // Rule evaluation + max aggregation per output label
        let mut activation: Vec<Vec<f64>> = self
            .variables
            .iter()
            .map(|(v, role)| match role {
                Role::Output => vec![0.0; v.terms().len()],
                Role::Input => Vec::new(),
            })
            .collect();

        for rule in &self.rules {
            let strength = rule
                .antecedents
                .iter()
                .map(|c| {
                    degrees[c.variable.0]
                        .as_ref()
                        .map_or(0.0, |d| d[c.label])
                })
                .fold(1.0_f64, f64::min);

            let slot = &mut activation[rule.consequent.variable.0][rule.consequent.label];
            *slot = slot.max(strength);
        }

        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return Err(FuzzyError::DeadlineExceeded);
            }
        }

        let mut outputs = HashMap::new();
        for (idx, (variable, role)) in self.variables.iter().enumerate() {
            if *role != Role::Output {
                continue;
            }
            let crisp_out = defuzzify_centroid(variable, &activation[idx])?;
            outputs.insert(VariableId(idx), crisp_out);
        }

        Ok(InferenceResult { outputs, clamped })
    }

    fn prepare_inputs(
        &self,
        inputs: &HashMap<VariableId, f64>,
    ) -> Result<(Vec<Option<f64>>, Vec<String>), FuzzyError> {
        let mut crisp = vec![None; self.variables.len()];
        let mut clamped = Vec::new();

        for (&id, &value) in inputs {
            let variable = lookup(&self.variables, id, Role::Input)?;

            if !value.is_finite() {
                return Err(FuzzyError::NonFiniteInput {
                    variable: variable.name().to_string(),
                    value,
                });
            }

            let universe = variable.universe();
            let value = if universe.contains(value) {
                value
            } else {
                match self.policy {
                    OutOfRangePolicy::Clamp => {
                        clamped.push(variable.name().to_string());
                        universe.clamp(value)
                    }
                    OutOfRangePolicy::Reject => {
                        return Err(FuzzyError::InputOutOfRange {
                            variable: variable.name().to_string(),
                            value,
                            min: universe.min(),
                            max: universe.max(),
                        });
                    }
                }
            };

            crisp[id.0] = Some(value);
        }

        clamped.sort();
        Ok((crisp, clamped))
    }
}

/// Discretised centroid of the clipped, max-aggregated output surface
fn defuzzify_centroid(variable: &Variable, activation: &[f64]) -> Result<f64, FuzzyError> {
    let mut weighted_sum = 0.0;
    let mut total = 0.0;

    for x in variable.universe().samples() {
        let aggregate = activation
            .iter()
            .enumerate()
            .filter(|(_, level)| **level > 0.0)
            .map(|(label, level)| level.min(variable.degree(label, x)))
            .fold(0.0_f64, f64::max);

        weighted_sum += x * aggregate;
        total += aggregate;
    }

    if total <= EPSILON {
        return Err(FuzzyError::NoApplicableRule {
            variable: variable.name().to_string(),
        });
    }

    Ok(weighted_sum / total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuzzy::membership::MembershipShape;
    use crate::fuzzy::variable::Universe;
    use std::time::Duration;

    fn tri(a: f64, b: f64, c: f64) -> MembershipShape {
        MembershipShape::triangular(a, b, c).unwrap()
    }

    /// Single input, single output: "cold -> low", "hot -> high"
    fn thermostat(policy: OutOfRangePolicy) -> (InferenceEngine, VariableId, VariableId) {
        let mut builder = EngineBuilder::new();
        let temp = builder.add_input(
            Variable::new(
                "temperature",
                Universe::new(0.0, 40.0, 1.0).unwrap(),
                [("cold", tri(0.0, 10.0, 20.0)), ("hot", tri(20.0, 30.0, 40.0))],
            )
            .unwrap(),
        );
        let power = builder.add_output(
            Variable::new(
                "power",
                Universe::new(0.0, 100.0, 1.0).unwrap(),
                [("low", tri(0.0, 20.0, 40.0)), ("high", tri(60.0, 80.0, 100.0))],
            )
            .unwrap(),
        );
        builder.out_of_range(policy);
        builder.when(temp, "cold").then(power, "high");
        builder.when(temp, "hot").then(power, "low");
        (builder.build().unwrap(), temp, power)
    }

    fn inputs(pairs: &[(VariableId, f64)]) -> HashMap<VariableId, f64> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_full_activation_hits_symmetric_centroid() {
        let (engine, temp, power) = thermostat(OutOfRangePolicy::Clamp);
        let result = engine.evaluate(&inputs(&[(temp, 10.0)])).unwrap();
        assert!((result.get(power).unwrap() - 80.0).abs() < 1e-9);
        assert!(result.clamped.is_empty());

        let result = engine.evaluate(&inputs(&[(temp, 30.0)])).unwrap();
        assert!((result.get(power).unwrap() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_activation_clips_surface() {
        let (engine, temp, power) = thermostat(OutOfRangePolicy::Clamp);
        // cold = 0.5: clipped "high" plateau is still symmetric around 80
        let result = engine.evaluate(&inputs(&[(temp, 15.0)])).unwrap();
        assert!((result.get(power).unwrap() - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_rule_fires() {
        let (engine, temp, _) = thermostat(OutOfRangePolicy::Clamp);
        // exactly 20: both triangles have a foot here
        let err = engine.evaluate(&inputs(&[(temp, 20.0)])).unwrap_err();
        assert!(matches!(err, FuzzyError::NoApplicableRule { ref variable } if variable == "power"));
    }

    #[test]
    fn test_clamp_to_a_foot_still_needs_a_rule() {
        let (engine, temp, power) = thermostat(OutOfRangePolicy::Clamp);
        let result = engine.evaluate(&inputs(&[(temp, -15.0)])).unwrap_err();
        // clamped to 0, which is the foot of "cold"
        assert!(matches!(result, FuzzyError::NoApplicableRule { .. }));

        let result = engine.evaluate(&inputs(&[(temp, 12.0)])).unwrap();
        assert!(result.get(power).is_some());
    }

    #[test]
    fn test_clamped_names_are_reported() {
        let mut builder = EngineBuilder::new();
        let x = builder.add_input(
            Variable::new(
                "x",
                Universe::new(0.0, 10.0, 1.0).unwrap(),
                [("any", MembershipShape::step_up(0.0, 10.0).unwrap())],
            )
            .unwrap(),
        );
        let y = builder.add_output(
            Variable::new("y", Universe::new(0.0, 10.0, 1.0).unwrap(), [("mid", tri(0.0, 5.0, 10.0))])
                .unwrap(),
        );
        builder.when(x, "any").then(y, "mid");
        let engine = builder.build().unwrap();

        let result = engine.evaluate(&inputs(&[(x, 50.0)])).unwrap();
        assert_eq!(result.clamped, vec!["x".to_string()]);
        assert!((result.get(y).unwrap() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_reject_policy() {
        let (engine, temp, _) = thermostat(OutOfRangePolicy::Reject);
        let err = engine.evaluate(&inputs(&[(temp, 55.0)])).unwrap_err();
        assert!(matches!(err, FuzzyError::InputOutOfRange { .. }));
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let (engine, temp, _) = thermostat(OutOfRangePolicy::Clamp);
        let err = engine.evaluate(&inputs(&[(temp, f64::NAN)])).unwrap_err();
        assert!(matches!(err, FuzzyError::NonFiniteInput { .. }));
    }

    #[test]
    fn test_missing_input() {
        let (engine, _, _) = thermostat(OutOfRangePolicy::Clamp);
        let err = engine.evaluate(&HashMap::new()).unwrap_err();
        assert_eq!(err, FuzzyError::MissingInput("temperature".to_string()));
    }

    #[test]
    fn test_unknown_and_output_variables_in_input_map() {
        let (engine, _, power) = thermostat(OutOfRangePolicy::Clamp);
        let err = engine.evaluate(&inputs(&[(VariableId(42), 1.0)])).unwrap_err();
        assert_eq!(err, FuzzyError::UnknownVariable(42));

        let err = engine.evaluate(&inputs(&[(power, 1.0)])).unwrap_err();
        assert!(matches!(err, FuzzyError::NotAnInput(_)));
    }

    #[test]
    fn test_expired_deadline_fails_fast() {
        let (engine, temp, _) = thermostat(OutOfRangePolicy::Clamp);
        let past = Instant::now() - Duration::from_millis(5);
        let err = engine
            .evaluate_before(&inputs(&[(temp, 10.0)]), Some(past))
            .unwrap_err();
        assert_eq!(err, FuzzyError::DeadlineExceeded);

        let future = Instant::now() + Duration::from_secs(60);
        assert!(engine
            .evaluate_before(&inputs(&[(temp, 10.0)]), Some(future))
            .is_ok());
    }

    #[test]
    fn test_builder_validation() {
        let empty = EngineBuilder::new().build().unwrap_err();
        assert_eq!(empty, FuzzyError::EmptyRuleSet);

        let mut builder = EngineBuilder::new();
        let t = builder.add_input(
            Variable::new("t", Universe::new(0.0, 1.0, 0.1).unwrap(), [("on", tri(0.0, 1.0, 1.0))]).unwrap(),
        );
        let o = builder.add_output(
            Variable::new("o", Universe::new(0.0, 1.0, 0.1).unwrap(), [("yes", tri(0.0, 1.0, 1.0))]).unwrap(),
        );
        builder.when(t, "off").then(o, "yes");
        assert!(matches!(builder.build(), Err(FuzzyError::UnknownLabel { .. })));

        let mut builder = EngineBuilder::new();
        let t = builder.add_input(
            Variable::new("t", Universe::new(0.0, 1.0, 0.1).unwrap(), [("on", tri(0.0, 1.0, 1.0))]).unwrap(),
        );
        builder.when(t, "on").then(t, "on");
        let err = builder.build().unwrap_err();
        assert!(matches!(err, FuzzyError::NotAnOutput(_)));
        assert!(err.is_construction());
    }

    #[test]
    fn test_max_aggregation_does_not_double_count() {
        let mut builder = EngineBuilder::new();
        let a = builder.add_input(
            Variable::new("a", Universe::new(0.0, 10.0, 1.0).unwrap(), [("on", tri(0.0, 10.0, 10.0))]).unwrap(),
        );
        let b = builder.add_input(
            Variable::new("b", Universe::new(0.0, 10.0, 1.0).unwrap(), [("on", tri(0.0, 10.0, 10.0))]).unwrap(),
        );
        let out = builder.add_output(
            Variable::new(
                "out",
                Universe::new(0.0, 100.0, 1.0).unwrap(),
                [("low", tri(0.0, 20.0, 40.0)), ("high", tri(60.0, 80.0, 100.0))],
            )
            .unwrap(),
        );
        builder.when(a, "on").then(out, "high");
        builder.when(b, "on").then(out, "high");
        builder.when(a, "on").and(b, "on").then(out, "low");
        let engine = builder.build().unwrap();

        // a = 1.0, b = 0.5: high = max(1.0, 0.5) = 1.0, low = min(1.0, 0.5) = 0.5
        let result = engine.evaluate(&inputs(&[(a, 10.0), (b, 5.0)])).unwrap();
        let crisp = result.get(out).unwrap();
        assert!(crisp > 50.0 && crisp < 80.0);
    }
}
