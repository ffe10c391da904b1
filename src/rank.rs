//! Result ranking and filtering
//!
//! Maps index positions back to document identifiers and drops hits that
//! do not clear the score threshold.

use crate::store::DocumentId;
use crate::vector::Neighbor;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A document identifier with its similarity to the query
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub id: DocumentId,
    /// Cosine similarity in [-1, 1]
    pub score: f32,
}

/// Turn raw neighbors into ranked results.
///
/// Keeps only scores strictly above `score_threshold` and keeps the input
/// order. A position with no identifier means the index and identifier
/// order came from different snapshots; that row is dropped and logged.
pub fn rank(raw: &[Neighbor], id_order: &[DocumentId], score_threshold: f32) -> Vec<RankedResult> {
    let mut results = Vec::with_capacity(raw.len());

    for neighbor in raw {
        let Some(&id) = id_order.get(neighbor.position) else {
            warn!(
                "Dropping hit at position {}: only {} identifiers in snapshot",
                neighbor.position,
                id_order.len()
            );
            continue;
        };

        if neighbor.score > score_threshold {
            results.push(RankedResult {
                id,
                score: neighbor.score,
            });
        }
    }

    results
}
