//! Code artifact domain model.
//!
//! An artifact is one versioned unit of generated solution code plus its
//! lineage metadata. Artifacts are immutable once created: refinement and
//! repair always produce a *new* artifact rather than mutating an existing
//! one, so every attempted variant in a run can be reconstructed later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How an artifact came into existence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactOrigin {
    /// Initial baseline solution produced by the seeding stage.
    Seed,
    /// Improvement attempt targeting one code region of its parent.
    Refinement {
        /// Region the oracle was asked to improve.
        region: String,
    },
    /// Corrected version of a failed artifact from the debug subloop.
    Repair {
        /// Repair attempt index (1-based) within the subloop.
        attempt: u32,
    },
    /// Combination strategy over a fixed set of parent artifacts.
    Ensemble {
        /// The candidates being combined.
        parents: Vec<Uuid>,
    },
    /// Transient perturbed variant used by the ablation analyzer.
    /// Never admitted to the candidate pool.
    AblationProbe {
        /// Region that was disabled.
        region: String,
    },
}

impl ArtifactOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::Refinement { .. } => "refinement",
            Self::Repair { .. } => "repair",
            Self::Ensemble { .. } => "ensemble",
            Self::AblationProbe { .. } => "ablation_probe",
        }
    }
}

/// One versioned unit of generated solution code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeArtifact {
    /// Unique identifier.
    pub id: Uuid,
    /// Artifact this one was derived from, if any.
    pub parent_id: Option<Uuid>,
    /// How this artifact was produced.
    pub origin: ArtifactOrigin,
    /// Outer-loop round in which the artifact was created (0 for seeds).
    pub round: u32,
    /// The generated source code.
    pub source: String,
    /// When the artifact was created.
    pub created_at: DateTime<Utc>,
}

impl CodeArtifact {
    /// Create a seed artifact (round 0, no parent).
    pub fn seed(source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: None,
            origin: ArtifactOrigin::Seed,
            round: 0,
            source: source.into(),
            created_at: Utc::now(),
        }
    }

    /// Create a refinement attempt derived from `parent`, targeting `region`.
    pub fn refinement(source: impl Into<String>, parent: &Self, round: u32, region: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: Some(parent.id),
            origin: ArtifactOrigin::Refinement {
                region: region.into(),
            },
            round,
            source: source.into(),
            created_at: Utc::now(),
        }
    }

    /// Create a repaired version of a failed artifact.
    pub fn repair(source: impl Into<String>, failed: &Self, attempt: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: Some(failed.id),
            origin: ArtifactOrigin::Repair { attempt },
            round: failed.round,
            source: source.into(),
            created_at: Utc::now(),
        }
    }

    /// Create an ensemble artifact combining `parents`.
    pub fn ensemble(source: impl Into<String>, parents: Vec<Uuid>, round: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: None,
            origin: ArtifactOrigin::Ensemble { parents },
            round,
            source: source.into(),
            created_at: Utc::now(),
        }
    }

    /// Create a transient ablation probe for `region` of `parent`.
    pub fn ablation_probe(source: impl Into<String>, parent: &Self, region: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: Some(parent.id),
            origin: ArtifactOrigin::AblationProbe {
                region: region.into(),
            },
            round: parent.round,
            source: source.into(),
            created_at: Utc::now(),
        }
    }

    /// Whether this artifact is an ensemble combination.
    pub fn is_ensemble(&self) -> bool {
        matches!(self.origin, ArtifactOrigin::Ensemble { .. })
    }
}
