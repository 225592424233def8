//! Tri-valued constraint evaluation.

use tracing::error;

use crate::error::ConstraintError;
use crate::labels::LabelValues;
use crate::model::{Constraint, LabelCondition, LabelConstraint, LabelKind};
use crate::EXCLUSIVE_ATTRIBUTE_NAME;

/// Outcome of evaluating a constraint against a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvaluateResult {
    /// Every relevant part of the constraint holds.
    Match,
    /// Some relevant part of the constraint does not hold.
    Mismatch,
    /// Nothing in the constraint applies to this candidate.
    NotApplicable,
}

/// Evaluates constraint trees for one label kind.
///
/// Label predicates of any other kind are `NotApplicable`, which never
/// short-circuits an `and` or an `or`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluator {
    kind: LabelKind,
}

impl Evaluator {
    pub fn new(kind: LabelKind) -> Self {
        Self { kind }
    }

    /// Evaluate `constraint` against `label_values`.
    ///
    /// An error anywhere in the tree abandons the remaining siblings.
    pub fn evaluate(
        &self,
        constraint: &Constraint,
        label_values: &LabelValues,
    ) -> Result<EvaluateResult, ConstraintError> {
        match constraint {
            Constraint::And { constraints } => self.evaluate_and(constraints, label_values),
            Constraint::Or { constraints } => self.evaluate_or(constraints, label_values),
            Constraint::Label(label_constraint) => {
                self.evaluate_label(label_constraint, label_values)
            }
            Constraint::Unknown => {
                let err = ConstraintError::UnknownConstraintType;
                error!(kind = %self.kind, "{err}");
                Err(err)
            }
        }
    }

    fn evaluate_and(
        &self,
        constraints: &[Constraint],
        label_values: &LabelValues,
    ) -> Result<EvaluateResult, ConstraintError> {
        let mut result = EvaluateResult::NotApplicable;
        for constraint in constraints {
            match self.evaluate(constraint, label_values)? {
                EvaluateResult::Mismatch => return Ok(EvaluateResult::Mismatch),
                // One relevant child is enough to call the whole `and` a match.
                EvaluateResult::Match => result = EvaluateResult::Match,
                EvaluateResult::NotApplicable => {}
            }
        }
        Ok(result)
    }

    fn evaluate_or(
        &self,
        constraints: &[Constraint],
        label_values: &LabelValues,
    ) -> Result<EvaluateResult, ConstraintError> {
        let mut result = EvaluateResult::NotApplicable;
        for constraint in constraints {
            match self.evaluate(constraint, label_values)? {
                EvaluateResult::Match => return Ok(EvaluateResult::Match),
                EvaluateResult::Mismatch => result = EvaluateResult::Mismatch,
                EvaluateResult::NotApplicable => {}
            }
        }
        Ok(result)
    }

    fn evaluate_label(
        &self,
        constraint: &LabelConstraint,
        label_values: &LabelValues,
    ) -> Result<EvaluateResult, ConstraintError> {
        if constraint.kind != self.kind {
            return Ok(EvaluateResult::NotApplicable);
        }

        let count = label_values.count(&constraint.label.key, &constraint.label.value);
        let requirement = constraint.requirement;

        let matched = match constraint.condition {
            LabelCondition::LessThan => count < requirement,
            LabelCondition::Equal => count == requirement,
            LabelCondition::GreaterThan => count > requirement,
            LabelCondition::Unknown => {
                let err = ConstraintError::UnknownLabelCondition;
                error!(label = %constraint.label, "{err}");
                return Err(err);
            }
        };

        if matched {
            Ok(EvaluateResult::Match)
        } else {
            Ok(EvaluateResult::Mismatch)
        }
    }
}

/// Returns true unless the tree contains, anywhere, a host label predicate
/// on the exclusive attribute.
///
/// `None` imposes no restriction and is non-exclusive.
pub fn is_non_exclusive_constraint(constraint: Option<&Constraint>) -> bool {
    let Some(constraint) = constraint else {
        return true;
    };

    match constraint {
        Constraint::And { constraints } | Constraint::Or { constraints } => constraints
            .iter()
            .all(|child| is_non_exclusive_constraint(Some(child))),
        Constraint::Label(label_constraint) => {
            !(label_constraint.kind == LabelKind::Host
                && label_constraint.label.key == EXCLUSIVE_ATTRIBUTE_NAME)
        }
        Constraint::Unknown => true,
    }
}
