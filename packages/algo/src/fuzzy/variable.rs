//! Fuzzy Variable Registry
//!
//! A variable binds a named signal to a discretised universe and a set of
//! uniquely labelled membership shapes.

use serde::{Deserialize, Serialize};

use super::error::FuzzyError;
use super::membership::MembershipShape;
use crate::types::EPSILON;

// ==================== Universe ====================

/// Closed numeric range `[min, max]` sampled every `step`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    min: f64,
    max: f64,
    step: f64,
}

impl Universe {
    pub fn new(min: f64, max: f64, step: f64) -> Result<Self, FuzzyError> {
        let valid = min.is_finite() && max.is_finite() && step.is_finite() && min < max && step > 0.0;
        if !valid {
            return Err(FuzzyError::InvalidUniverse { min, max, step });
        }
        Ok(Self { min, max, step })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn contains(&self, x: f64) -> bool {
        x >= self.min && x <= self.max
    }

    pub fn clamp(&self, x: f64) -> f64 {
        x.clamp(self.min, self.max)
    }

    /// Number of sample points, both bounds included when the step divides the range
    pub fn sample_count(&self) -> usize {
        ((self.max - self.min) / self.step + EPSILON).floor() as usize + 1
    }

    /// Sample points `min, min + step, ...` up to `max`
    pub fn samples(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.sample_count()).map(move |k| self.min + k as f64 * self.step)
    }
}

// ==================== Variable ====================

/// A labelled membership shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub label: String,
    pub shape: MembershipShape,
}

/// Named signal with its universe and labelled shapes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    name: String,
    universe: Universe,
    terms: Vec<Term>,
    open_edges: bool,
}

impl Variable {
    /// Build a variable; labels must be unique and every breakpoint must lie
    /// inside the universe.
    pub fn new<L, I>(name: impl Into<String>, universe: Universe, terms: I) -> Result<Self, FuzzyError>
    where
        L: Into<String>,
        I: IntoIterator<Item = (L, MembershipShape)>,
    {
        let name = name.into();
        let mut accepted: Vec<Term> = Vec::new();

        for (label, shape) in terms {
            let label = label.into();
            shape.validate()?;

            if accepted.iter().any(|t| t.label == label) {
                return Err(FuzzyError::DuplicateLabel {
                    variable: name,
                    label,
                });
            }

            if shape.breakpoints().iter().any(|p| !universe.contains(*p)) {
                return Err(FuzzyError::ShapeOutOfUniverse {
                    variable: name,
                    label,
                });
            }

            accepted.push(Term { label, shape });
        }

        Ok(Self {
            name,
            universe,
            terms: accepted,
            open_edges: false,
        })
    }

    /// Let triangles that start or end on a universe bound saturate toward
    /// that bound, so the extreme inputs keep full membership.
    pub fn with_open_edges(mut self) -> Self {
        self.open_edges = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn has_open_edges(&self) -> bool {
        self.open_edges
    }

    pub fn label_index(&self, label: &str) -> Option<usize> {
        self.terms.iter().position(|t| t.label == label)
    }

    /// Degree of `x` in the term at `index`
    pub fn degree(&self, index: usize, x: f64) -> f64 {
        let Some(term) = self.terms.get(index) else {
            return 0.0;
        };
        if self.open_edges {
            term.shape
                .membership_with_shoulders(x, self.universe.min, self.universe.max)
        } else {
            term.shape.membership(x)
        }
    }

    /// Degree of `x` in the named label
    pub fn membership(&self, label: &str, x: f64) -> Option<f64> {
        self.label_index(label).map(|i| self.degree(i, x))
    }

    /// Degrees of `x` in every label, in declaration order
    pub fn fuzzify(&self, x: f64) -> Vec<f64> {
        (0..self.terms.len()).map(|i| self.degree(i, x)).collect()
    }
}
