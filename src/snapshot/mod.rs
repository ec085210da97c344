//! Snapshot and restore for state machines.
//!
//! A snapshot captures the active path and the mode of every activity by
//! state name, so it stays meaningful when serialized away from the process
//! that produced it. Restoring validates the named path against the target
//! machine's tree and re-arms the active-child links structurally: no
//! enter/exit hooks run, and activity modes are recorded for diagnostics
//! only — restored activities come up wherever their own lifecycle left
//! them, which for a fresh process is `Inactive`.

pub mod error;

pub use error::SnapshotError;

use crate::core::ActivityMode;
use crate::machine::StateMachine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Version identifier for the snapshot format.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Modes of one state's activities, in declaration order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActivitySnapshot {
    pub state: String,
    pub modes: Vec<ActivityMode>,
}

/// Serializable capture of a machine's runtime position.
///
/// Does not include behaviors or activities themselves — topology and code
/// are rebuilt by the host, the snapshot only carries where the machine was.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot format version.
    pub version: u32,

    /// Unique snapshot identifier.
    pub id: Uuid,

    /// When the snapshot was captured.
    pub captured_at: DateTime<Utc>,

    /// Active path at capture time, root to leaf, by state name.
    pub active_path: Vec<String>,

    /// Activity modes for every state that owns activities.
    pub activities: Vec<ActivitySnapshot>,
}

impl Snapshot {
    /// Capture the machine's current active path and activity modes.
    pub fn capture<C>(machine: &StateMachine<C>) -> Self {
        let tree = machine.tree();
        let active_path = tree
            .active_path()
            .into_iter()
            .map(|id| tree.name(id).to_string())
            .collect();

        let mut activities = Vec::new();
        for id in tree.states() {
            let modes = tree.activity_modes(id);
            if !modes.is_empty() {
                activities.push(ActivitySnapshot {
                    state: tree.name(id).to_string(),
                    modes,
                });
            }
        }

        Self {
            version: SNAPSHOT_VERSION,
            id: Uuid::new_v4(),
            captured_at: Utc::now(),
            active_path,
            activities,
        }
    }

    /// Encode as pretty JSON.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    /// Decode from JSON.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(json).map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))
    }

    /// Encode as compact binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        bincode::serialize(self).map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    /// Decode from binary.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        bincode::deserialize(bytes)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))
    }
}

/// Validate a snapshot against the machine's tree and re-arm the active
/// path. See [`StateMachine::restore`].
pub(crate) fn apply<C>(
    machine: &mut StateMachine<C>,
    snapshot: &Snapshot,
) -> Result<(), SnapshotError> {
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion {
            found: snapshot.version,
            supported: SNAPSHOT_VERSION,
        });
    }

    let tree = machine.tree();
    let mut path = Vec::with_capacity(snapshot.active_path.len());
    for name in &snapshot.active_path {
        let id = tree.state_named(name).ok_or_else(|| {
            SnapshotError::ValidationFailed(format!("unknown state '{name}'"))
        })?;
        path.push(id);
    }

    match path.first() {
        None => {
            return Err(SnapshotError::ValidationFailed(
                "active path is empty".to_string(),
            ))
        }
        Some(&first) if first != tree.root() => {
            return Err(SnapshotError::ValidationFailed(format!(
                "path begins at '{}', not the root",
                tree.name(first)
            )))
        }
        Some(_) => {}
    }

    for pair in path.windows(2) {
        if !tree.children(pair[0]).contains(&pair[1]) {
            return Err(SnapshotError::ValidationFailed(format!(
                "'{}' is not a child of '{}'",
                tree.name(pair[1]),
                tree.name(pair[0])
            )));
        }
    }

    machine.tree_mut().force_active_path(&path);
    machine.sequencer_mut().reset();
    machine.mark_started();
    Ok(())
}
