//! Hybrid score fusion
//!
//! Merges dense, sparse and lexical-overlap signals into one ranked list.
//! Pure and I/O free: unit-testable with synthetic candidate lists and
//! hand-computed expected scores.

use crate::retrieval::{DenseHit, RetrievalCandidate};
use crate::sparse::SparseHit;
use ahash::{AHashMap, AHashSet};
use std::collections::BTreeSet;
use thiserror::Error;

/// Per-match lexical weight for ordinary terms
const LEXICAL_MATCH_WEIGHT: f32 = 0.1;
/// Per-match lexical weight for curated important terms
const LEXICAL_IMPORTANT_WEIGHT: f32 = 0.3;
/// Hit-count caps, applied before weighting so very long documents cannot
/// run the bonus away
const LEXICAL_MATCH_CAP: usize = 10;
const LEXICAL_IMPORTANT_CAP: usize = 3;

#[derive(Error, Debug)]
pub enum FusionError {
    #[error("Invalid weight configuration: dense and sparse weights must be positive, lexical non-negative")]
    InvalidWeights,
}

/// Channel weights for the hybrid score.
///
/// The lexical weight is an additive bonus layered on top of the
/// dense/sparse budget: a strong keyword match can outrank a purely
/// semantic one.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct FusionWeights {
    pub dense: f32,
    pub sparse: f32,
    pub lexical: f32,
}

impl FusionWeights {
    pub fn new(dense: f32, sparse: f32, lexical: f32) -> Result<Self, FusionError> {
        if dense <= 0.0 || sparse <= 0.0 || lexical < 0.0 {
            return Err(FusionError::InvalidWeights);
        }
        Ok(Self {
            dense,
            sparse,
            lexical,
        })
    }
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            dense: 0.65,
            sparse: 0.35,
            lexical: 0.20,
        }
    }
}

/// Lexical overlap between the expanded query and a candidate text:
/// whitespace-delimited token matches, with important terms worth more.
/// Bounded to [0, 1].
fn lexical_overlap(
    expanded_terms: &BTreeSet<String>,
    important_terms: &BTreeSet<String>,
    text: &str,
) -> f32 {
    let lowered = text.to_lowercase();
    let doc_words: AHashSet<&str> = lowered.split_whitespace().collect();

    let mut matches = 0usize;
    let mut important_matches = 0usize;
    for term in expanded_terms {
        if doc_words.contains(term.as_str()) {
            matches += 1;
            if important_terms.contains(term) {
                important_matches += 1;
            }
        }
    }

    let matches = matches.min(LEXICAL_MATCH_CAP);
    let important_matches = important_matches.min(LEXICAL_IMPORTANT_CAP);

    let score = matches as f32 * LEXICAL_MATCH_WEIGHT
        + important_matches as f32 * LEXICAL_IMPORTANT_WEIGHT;
    score.min(1.0)
}

struct PartialCandidate {
    text: String,
    metadata: crate::store::DocumentMetadata,
    dense_score: f32,
    sparse_score: f32,
}

/// Fuse dense and sparse candidate lists into one ranked list.
///
/// 1. Normalize sparse scores by this candidate set's maximum (0 max means
///    every normalized sparse score is 0).
/// 2. Merge by document id; the channel a candidate is missing from
///    contributes 0.
/// 3. Score lexical overlap per merged entry.
/// 4. Combine with the configured weights.
/// 5. Sort by hybrid score descending, document id ascending on ties.
/// 6. Truncate to `top_k`.
pub fn fuse(
    expanded_terms: &BTreeSet<String>,
    important_terms: &BTreeSet<String>,
    dense: &[DenseHit],
    sparse: &[SparseHit],
    weights: &FusionWeights,
    top_k: usize,
) -> Vec<RetrievalCandidate> {
    let max_sparse = sparse
        .iter()
        .map(|hit| hit.raw_score)
        .fold(0.0f32, f32::max);

    let mut merged: AHashMap<String, PartialCandidate> = AHashMap::new();

    for hit in dense {
        merged.insert(
            hit.id.clone(),
            PartialCandidate {
                text: hit.text.clone(),
                metadata: hit.metadata.clone(),
                dense_score: hit.similarity,
                sparse_score: 0.0,
            },
        );
    }

    for hit in sparse {
        let normalized = if max_sparse > 0.0 {
            hit.raw_score / max_sparse
        } else {
            0.0
        };
        merged
            .entry(hit.id.clone())
            .and_modify(|entry| entry.sparse_score = normalized)
            .or_insert_with(|| PartialCandidate {
                text: hit.text.clone(),
                metadata: crate::store::DocumentMetadata::default(),
                dense_score: 0.0,
                sparse_score: normalized,
            });
    }

    let mut candidates: Vec<RetrievalCandidate> = merged
        .into_iter()
        .map(|(document_id, entry)| {
            let lexical_score = lexical_overlap(expanded_terms, important_terms, &entry.text);
            let hybrid_score = weights.dense * entry.dense_score
                + weights.sparse * entry.sparse_score
                + weights.lexical * lexical_score;
            RetrievalCandidate {
                document_id,
                text: entry.text,
                metadata: entry.metadata,
                dense_score: entry.dense_score,
                sparse_score: entry.sparse_score,
                lexical_score,
                hybrid_score,
            }
        })
        .collect();

    // Deterministic ordering: never dependent on map iteration order.
    candidates.sort_by(|a, b| {
        b.hybrid_score
            .total_cmp(&a.hybrid_score)
            .then_with(|| a.document_id.cmp(&b.document_id))
    });
    candidates.truncate(top_k);
    candidates
}
