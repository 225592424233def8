//! Constraint evaluation errors.

use thiserror::Error;

/// Errors raised while evaluating a constraint tree.
///
/// Both variants mean the caller handed over a malformed tree; retrying the
/// same tree will fail the same way.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintError {
    /// A node whose type is none of `and`, `or` or `label`.
    #[error("unknown enum value for Constraint.Type")]
    UnknownConstraintType,

    /// A label predicate whose condition is none of the known comparisons.
    #[error("unknown enum value for LabelConstraint.Condition")]
    UnknownLabelCondition,
}

impl ConstraintError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownConstraintType => "unknown_constraint_type",
            Self::UnknownLabelCondition => "unknown_label_condition",
        }
    }
}
