//! Constraint tree model.
//!
//! The JSON form is what tasks carry on the wire:
//!
//! ```json
//! {
//!   "type": "and",
//!   "constraints": [
//!     {
//!       "type": "label",
//!       "kind": "host",
//!       "label": { "key": "rack", "value": "a" },
//!       "condition": "less_than",
//!       "requirement": 1
//!     }
//!   ]
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// A node in a constraint tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Constraint {
    /// Every relevant child must hold.
    And { constraints: Vec<Constraint> },

    /// At least one relevant child must hold.
    Or { constraints: Vec<Constraint> },

    /// Leaf predicate over a label occurrence count.
    Label(LabelConstraint),

    /// A node type this build does not understand.
    #[serde(other)]
    Unknown,
}

impl Constraint {
    /// Build an `and` node.
    pub fn and(constraints: impl IntoIterator<Item = Constraint>) -> Self {
        Self::And {
            constraints: constraints.into_iter().collect(),
        }
    }

    /// Build an `or` node.
    pub fn or(constraints: impl IntoIterator<Item = Constraint>) -> Self {
        Self::Or {
            constraints: constraints.into_iter().collect(),
        }
    }

    /// Build a leaf node.
    pub fn label(constraint: LabelConstraint) -> Self {
        Self::Label(constraint)
    }
}

impl From<LabelConstraint> for Constraint {
    fn from(constraint: LabelConstraint) -> Self {
        Self::Label(constraint)
    }
}

/// Which label set a predicate is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelKind {
    /// Labels of the candidate host.
    Host,
    /// Labels of the tasks already placed on the candidate.
    Task,
}

impl LabelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Task => "task",
        }
    }
}

impl fmt::Display for LabelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison between an observed count and the requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LabelCondition {
    /// `count < requirement`
    LessThan,
    /// `count == requirement`
    Equal,
    /// `count > requirement`
    GreaterThan,
    /// Any condition name this build does not understand.
    Unknown,
}

impl LabelCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LessThan => "less_than",
            Self::Equal => "equal",
            Self::GreaterThan => "greater_than",
            Self::Unknown => "unknown",
        }
    }
}

impl From<String> for LabelCondition {
    fn from(value: String) -> Self {
        match value.as_str() {
            "less_than" => Self::LessThan,
            "equal" => Self::Equal,
            "greater_than" => Self::GreaterThan,
            _ => Self::Unknown,
        }
    }
}

impl From<LabelCondition> for String {
    fn from(value: LabelCondition) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for LabelCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `key=value` label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    pub key: String,
    pub value: String,
}

impl Label {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Leaf predicate: compare the occurrence count of `label` with `requirement`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelConstraint {
    pub kind: LabelKind,
    pub label: Label,
    pub condition: LabelCondition,
    pub requirement: u32,
}

impl LabelConstraint {
    /// Predicate over host labels.
    pub fn host(label: Label, condition: LabelCondition, requirement: u32) -> Self {
        Self {
            kind: LabelKind::Host,
            label,
            condition,
            requirement,
        }
    }

    /// Predicate over the labels of tasks already on the candidate.
    pub fn task(label: Label, condition: LabelCondition, requirement: u32) -> Self {
        Self {
            kind: LabelKind::Task,
            label,
            condition,
            requirement,
        }
    }
}
