//! Label occurrence counts for a placement candidate.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::Label;

/// Label key every host implicitly carries with its own hostname as value.
pub const HOSTNAME_LABEL_KEY: &str = "hostname";

/// Occurrence count of every `key=value` label on a candidate.
///
/// Pairs that were never added count as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelValues(HashMap<String, HashMap<String, u32>>);

impl LabelValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count labels, one occurrence per item.
    pub fn from_labels<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = &'a Label>,
    {
        let mut values = Self::new();
        for label in labels {
            values.add(&label.key, &label.value);
        }
        values
    }

    /// Occurrence count of `key=value`.
    pub fn count(&self, key: &str, value: &str) -> u32 {
        self.0
            .get(key)
            .and_then(|values| values.get(value))
            .copied()
            .unwrap_or(0)
    }

    /// Record one more occurrence of `key=value`.
    pub fn add(&mut self, key: &str, value: &str) {
        let slot = self
            .0
            .entry(key.to_string())
            .or_default()
            .entry(value.to_string())
            .or_insert(0);
        *slot = slot.saturating_add(1);
    }

    /// Whether any value of `key` has a non-zero count.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0
            .get(key)
            .is_some_and(|values| values.values().any(|count| *count > 0))
    }
}

/// Label values of a host: its own attributes plus `hostname=<hostname>`.
pub fn host_label_values<'a, I>(hostname: &str, labels: I) -> LabelValues
where
    I: IntoIterator<Item = &'a Label>,
{
    let mut values = LabelValues::from_labels(labels);
    values.add(HOSTNAME_LABEL_KEY, hostname);
    values
}
