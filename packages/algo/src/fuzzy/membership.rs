//! Membership Functions
//!
//! Piecewise-linear shapes that map a crisp value onto a degree of truth
//! in [0, 1]:
//! - `Triangular(a, b, c)`: 0 outside [a, c], peak 1 at b
//! - `StepUp(a, b)`: 0 below a, linear ramp to 1 at b
//! - `StepDown(a, b)`: 1 below a, linear ramp to 0 at b
//!
//! Degenerate triangles (`a == b` or `b == c`) behave as a step at the
//! peak and never divide by zero.

use serde::{Deserialize, Serialize};

use super::error::FuzzyError;

/// A named fuzzy-set shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MembershipShape {
    Triangular { a: f64, b: f64, c: f64 },
    StepUp { a: f64, b: f64 },
    StepDown { a: f64, b: f64 },
}

impl MembershipShape {
    /// Build a triangle, requiring `a <= b <= c`
    pub fn triangular(a: f64, b: f64, c: f64) -> Result<Self, FuzzyError> {
        let shape = MembershipShape::Triangular { a, b, c };
        shape.validate()?;
        Ok(shape)
    }

    /// Build a rising ramp, requiring `a < b`
    pub fn step_up(a: f64, b: f64) -> Result<Self, FuzzyError> {
        let shape = MembershipShape::StepUp { a, b };
        shape.validate()?;
        Ok(shape)
    }

    /// Build a falling ramp, requiring `a < b`
    pub fn step_down(a: f64, b: f64) -> Result<Self, FuzzyError> {
        let shape = MembershipShape::StepDown { a, b };
        shape.validate()?;
        Ok(shape)
    }

    /// Check parameter ordering; enum literals bypass the constructors,
    /// so variables re-run this on every label they accept.
    pub fn validate(&self) -> Result<(), FuzzyError> {
        if self.breakpoints().iter().any(|p| !p.is_finite()) {
            return Err(FuzzyError::InvalidShape(format!(
                "{self:?} has non-finite parameters"
            )));
        }

        match *self {
            MembershipShape::Triangular { a, b, c } => {
                if a > b || b > c {
                    return Err(FuzzyError::InvalidShape(format!(
                        "triangle requires a <= b <= c, got ({a}, {b}, {c})"
                    )));
                }
            }
            MembershipShape::StepUp { a, b } | MembershipShape::StepDown { a, b } => {
                if a >= b {
                    return Err(FuzzyError::InvalidShape(format!(
                        "ramp requires a < b, got ({a}, {b})"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Degree of membership of `x`
    pub fn membership(&self, x: f64) -> f64 {
        let degree = match *self {
            MembershipShape::Triangular { a, b, c } => {
                if x < a || x > c {
                    0.0
                } else if x == b {
                    1.0
                } else if x < b {
                    // a <= x < b, so b - a > 0
                    (x - a) / (b - a)
                } else {
                    // b < x <= c, so c - b > 0
                    (c - x) / (c - b)
                }
            }
            MembershipShape::StepUp { a, b } => {
                if x <= a {
                    0.0
                } else if x >= b {
                    1.0
                } else {
                    (x - a) / (b - a)
                }
            }
            MembershipShape::StepDown { a, b } => {
                if x <= a {
                    1.0
                } else if x >= b {
                    0.0
                } else {
                    (b - x) / (b - a)
                }
            }
        };

        degree.clamp(0.0, 1.0)
    }

    /// Membership with the outer flank replaced by a shoulder.
    ///
    /// A triangle whose left foot sits on `lower` keeps degree 1 from the
    /// bound up to its peak; one whose right foot sits on `upper` keeps
    /// degree 1 from its peak up to the bound. Ramps are unaffected.
    pub fn membership_with_shoulders(&self, x: f64, lower: f64, upper: f64) -> f64 {
        if let MembershipShape::Triangular { a, b, c } = *self {
            if a == lower && x >= a && x <= b {
                return 1.0;
            }
            if c == upper && x >= b && x <= c {
                return 1.0;
            }
        }
        self.membership(x)
    }

    /// Parameters in ascending order
    pub fn breakpoints(&self) -> Vec<f64> {
        match *self {
            MembershipShape::Triangular { a, b, c } => vec![a, b, c],
            MembershipShape::StepUp { a, b } | MembershipShape::StepDown { a, b } => vec![a, b],
        }
    }
}
