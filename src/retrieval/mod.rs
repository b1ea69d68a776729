//! Hybrid retrieval: dual-channel search, score fusion, reranking
//!
//! The dual-channel retriever produces dense and sparse candidate lists per
//! document type, the fuser merges them into one ranked list with lexical
//! boosting, and the reranker adapter optionally reorders the fused top-N
//! through a cross-encoder oracle.

mod fusion;
mod reranker;
mod retriever;

pub use fusion::{fuse, FusionError, FusionWeights};
pub use reranker::{CrossEncoderOracle, RerankError, RerankOracle, RerankerAdapter};
pub use retriever::{ChannelLimits, DualChannelRetriever, RetrievedChannels, RetrieverError};

use crate::store::DocumentMetadata;
use serde::{Deserialize, Serialize};

/// A dense-channel hit: similarity already derived from the store's
/// distance metric (1 - distance, clamped to [0, 1]).
#[derive(Debug, Clone)]
pub struct DenseHit {
    pub id: String,
    pub text: String,
    pub metadata: DocumentMetadata,
    pub similarity: f32,
}

/// A fused retrieval candidate. Transient: created and discarded within a
/// single query's lifetime.
///
/// A candidate seen by only one channel still carries a score for the
/// other; the missing channel contributes 0, never null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalCandidate {
    pub document_id: String,
    pub text: String,
    pub metadata: DocumentMetadata,
    /// Semantic similarity in [0, 1], 1 = identical
    pub dense_score: f32,
    /// BM25 score normalized by this query's max sparse score
    pub sparse_score: f32,
    /// Term/phrase overlap bonus in [0, 1]
    pub lexical_score: f32,
    /// Weighted combination of the three signals
    pub hybrid_score: f32,
}
