use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Logical namespace of a stored artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Original upload as received from the client
    Uploaded,
    /// Output of a successful transform
    Processed,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 2] = [ArtifactKind::Uploaded, ArtifactKind::Processed];

    /// Directory name under the artifact root
    pub fn dir_name(&self) -> &'static str {
        match self {
            ArtifactKind::Uploaded => "uploads",
            ArtifactKind::Processed => "processed",
        }
    }

    /// Name prefix for generated names of this kind
    pub fn name_prefix(&self) -> &'static str {
        match self {
            ArtifactKind::Uploaded => "",
            ArtifactKind::Processed => "resized-",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Uploaded => write!(f, "uploaded"),
            ArtifactKind::Processed => write!(f, "processed"),
        }
    }
}

/// A stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ArtifactRef {
    pub name: String,
    pub kind: ArtifactKind,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

impl ArtifactRef {
    /// Age of the artifact relative to `now`. Zero for timestamps in the future.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        let age = now - self.created_at;
        if age < chrono::Duration::zero() {
            chrono::Duration::zero()
        } else {
            age
        }
    }
}
