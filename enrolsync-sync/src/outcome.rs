//! Per-run accumulation of reportable errors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Outcome category for enrolment problems.
pub const ENROLLMENT: &str = "enrollment";

/// Error messages of one sync run, keyed by category.
///
/// Owned by the caller once the run returns; typically shown to admins as
/// warnings. Never blocks the end user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncOutcome(BTreeMap<String, Vec<String>>);

impl SyncOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `message` to `category`, keeping insertion order.
    pub fn push(&mut self, category: &str, message: impl Into<String>) {
        self.0
            .entry(category.to_owned())
            .or_default()
            .push(message.into());
    }

    /// Messages recorded under `category`.
    pub fn errors(&self, category: &str) -> &[String] {
        self.0.get(category).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    /// Total number of messages across categories.
    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .flat_map(|(c, msgs)| msgs.iter().map(move |m| (c.as_str(), m.as_str())))
    }
}
