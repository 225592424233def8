//! # berth-constraints
//!
//! Placement constraints for the berth cluster resource manager.
//!
//! A task carries a constraint tree built from `and`/`or` combinators and
//! leaf label predicates. A candidate (a host, or the group of tasks already
//! placed somewhere) is described by [`LabelValues`]: how many times each
//! `key=value` label occurs on it.
//!
//! ## Evaluation
//!
//! [`Evaluator`] is bound to one [`LabelKind`]. Label predicates of the other
//! kind evaluate to [`EvaluateResult::NotApplicable`], so the same tree can be
//! evaluated once against host labels and once against task labels without
//! the irrelevant half getting in the way.
//!
//! Results are tri-valued:
//! - `and` fails fast on the first `Mismatch`; it is `Match` only if some
//!   child matched, otherwise `NotApplicable`
//! - `or` succeeds fast on the first `Match`; it is `Mismatch` only if some
//!   child mismatched, otherwise `NotApplicable`
//!
//! ## Exclusivity
//!
//! [`is_non_exclusive_constraint`] is a structural scan that looks for a host
//! label predicate on [`EXCLUSIVE_ATTRIBUTE_NAME`] anywhere in the tree.

mod error;
mod evaluate;
mod labels;
mod model;

pub use error::ConstraintError;
pub use evaluate::{is_non_exclusive_constraint, EvaluateResult, Evaluator};
pub use labels::{host_label_values, LabelValues, HOSTNAME_LABEL_KEY};
pub use model::*;

/// Reserved host label key marking a host for sole occupancy by one task.
pub const EXCLUSIVE_ATTRIBUTE_NAME: &str = "berth/exclusive";
