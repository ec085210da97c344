//! Snapshot error types.

use thiserror::Error;

/// Errors that can occur capturing, encoding, or restoring a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Serialization to JSON or binary format failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(String),

    /// Deserialization from JSON or binary format failed.
    #[error("deserialization failed: {0}")]
    DeserializationFailed(String),

    /// The snapshot was written by an unsupported format version.
    #[error("unsupported snapshot version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// The snapshot does not fit the machine it is being restored into.
    #[error("snapshot validation failed: {0}")]
    ValidationFailed(String),
}
