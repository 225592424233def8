//! Placement eligibility.
//!
//! Narrows a list of candidate hosts for one task: hosts in maintenance are
//! dropped, exclusive hosts are kept only for exclusive tasks, and the rest
//! are tested against the task's constraint with the host evaluator.

use berth_constraints::{
    host_label_values, is_non_exclusive_constraint, Constraint, ConstraintError, EvaluateResult,
    Evaluator, Label, LabelKind, EXCLUSIVE_ATTRIBUTE_NAME,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::registry::HostSnapshot;

/// A host offered for placement, with its attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub hostname: String,
    #[serde(default)]
    pub labels: Vec<Label>,
}

impl Candidate {
    pub fn new(hostname: impl Into<String>, labels: Vec<Label>) -> Self {
        Self {
            hostname: hostname.into(),
            labels,
        }
    }
}

/// Hostnames of the candidates the task may be placed on, in input order.
pub fn filter_eligible(
    maintenance: &HostSnapshot,
    constraint: Option<&Constraint>,
    candidates: &[Candidate],
) -> Result<Vec<String>, ConstraintError> {
    let unavailable = maintenance.hostnames();
    let exclusive_task = !is_non_exclusive_constraint(constraint);
    let evaluator = Evaluator::new(LabelKind::Host);

    let mut eligible = Vec::new();
    for candidate in candidates {
        if unavailable.contains(candidate.hostname.as_str()) {
            debug!(hostname = %candidate.hostname, "Skipping host in maintenance");
            continue;
        }

        let values = host_label_values(&candidate.hostname, &candidate.labels);
        if values.contains_key(EXCLUSIVE_ATTRIBUTE_NAME) && !exclusive_task {
            debug!(hostname = %candidate.hostname, "Skipping exclusive host");
            continue;
        }

        let result = match constraint {
            Some(constraint) => evaluator.evaluate(constraint, &values)?,
            None => EvaluateResult::NotApplicable,
        };
        if result == EvaluateResult::Mismatch {
            continue;
        }

        eligible.push(candidate.hostname.clone());
    }

    Ok(eligible)
}
