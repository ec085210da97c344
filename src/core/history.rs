//! Transition history tracking.
//!
//! Immutable record of the transitions a machine has completed, useful for
//! diagnostics and post-mortems. Only finished transitions are recorded —
//! a transition abandoned for a coalesced request leaves no trace here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of one completed transition.
///
/// Endpoints are stored by state name so the record stays meaningful when
/// serialized away from the machine that produced it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Name of the state the transition was requested from.
    pub from: String,
    /// Name of the target state.
    pub to: String,
    /// When the transition completed.
    pub timestamp: DateTime<Utc>,
    /// Whether the transition was begun from the coalescing buffer rather
    /// than directly from a request.
    pub coalesced: bool,
}

/// Ordered history of completed transitions.
///
/// History is immutable — [`record`](TransitionHistory::record) returns a
/// new history with the record appended, leaving the original untouched.
///
/// # Example
///
/// ```rust
/// use choreo::{TransitionHistory, TransitionRecord};
/// use chrono::Utc;
///
/// let history = TransitionHistory::new();
/// let history = history.record(TransitionRecord {
///     from: "Idle".to_string(),
///     to: "Move".to_string(),
///     timestamp: Utc::now(),
///     coalesced: false,
/// });
///
/// assert_eq!(history.path(), vec!["Idle", "Move"]);
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransitionHistory {
    records: Vec<TransitionRecord>,
}

impl TransitionHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, returning a new history.
    pub fn record(&self, record: TransitionRecord) -> Self {
        let mut records = self.records.clone();
        records.push(record);
        Self { records }
    }

    /// All records in completion order.
    pub fn records(&self) -> &[TransitionRecord] {
        &self.records
    }

    /// Names of the states traversed: the first record's origin, then each
    /// record's target.
    pub fn path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        if let Some(first) = self.records.first() {
            path.push(first.from.as_str());
        }
        for record in &self.records {
            path.push(record.to.as_str());
        }
        path
    }

    /// Elapsed time between the first and last completed transition.
    ///
    /// `None` with fewer than one record.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.records.first(), self.records.last()) {
            let elapsed = last.timestamp.signed_duration_since(first.timestamp);
            elapsed.to_std().ok()
        } else {
            None
        }
    }
}
