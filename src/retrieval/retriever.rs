//! Dual-channel retriever: dense + sparse candidates per document type
//!
//! The dense channel queries the document store through the embedding
//! oracle, preferring the store's native type filter and falling back to a
//! larger unfiltered batch filtered client-side when the capability is
//! missing or fails. The sparse channel scores the expanded, filtered query
//! tokens against the BM25 index. A missing sparse index degrades to
//! dense-only; an unreachable store fails the query.

use crate::embedding::{EmbeddingError, EmbeddingOracle};
use crate::error::RispostaError;
use crate::expansion::QueryExpander;
use crate::retrieval::DenseHit;
use crate::sparse::{SparseHit, SparseIndex};
use crate::store::{DocType, DocumentStore, NearestNeighbor, StoreError};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrieverError {
    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Embedding(#[from] EmbeddingError),
}

impl From<RetrieverError> for RispostaError {
    fn from(err: RetrieverError) -> Self {
        match err {
            RetrieverError::Store(e) => RispostaError::Store(e),
            RetrieverError::Embedding(e) => RispostaError::Embedding(e),
        }
    }
}

/// Candidate-pool sizing for the two channels.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChannelLimits {
    /// Dense channel requests `max(k * dense_multiplier, dense_floor)`
    pub dense_multiplier: usize,
    pub dense_floor: usize,
    /// Unfiltered fallback batches are this many times larger
    pub fallback_factor: usize,
    /// Sparse channel keeps `min(k * sparse_multiplier, sparse_cap)`
    pub sparse_multiplier: usize,
    pub sparse_cap: usize,
}

impl Default for ChannelLimits {
    fn default() -> Self {
        Self {
            dense_multiplier: 10,
            dense_floor: 200,
            fallback_factor: 2,
            sparse_multiplier: 3,
            sparse_cap: 500,
        }
    }
}

/// Output of one retrieval pass. No overlap removal yet: fusion
/// deduplicates by document id.
#[derive(Debug)]
pub struct RetrievedChannels {
    pub dense: Vec<DenseHit>,
    pub sparse: Vec<SparseHit>,
    pub expanded: BTreeSet<String>,
}

pub struct DualChannelRetriever {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn EmbeddingOracle>,
    sparse: Option<Arc<SparseIndex>>,
    expander: QueryExpander,
    limits: ChannelLimits,
    /// Probed once at construction, not per query
    native_filter: bool,
}

impl DualChannelRetriever {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn EmbeddingOracle>,
        sparse: Option<Arc<SparseIndex>>,
        expander: QueryExpander,
        limits: ChannelLimits,
    ) -> Self {
        let native_filter = store.supports_type_filter();
        if !native_filter {
            tracing::warn!("Document store lacks native type filtering, using client-side fallback");
        }
        if sparse.is_none() {
            tracing::warn!("Sparse index not available, retrieval degrades to dense-only");
        }

        Self {
            store,
            embedder,
            sparse,
            expander,
            limits,
            native_filter,
        }
    }

    /// Retrieve dense and sparse candidates of one document type.
    pub fn retrieve(
        &self,
        query: &str,
        doc_type: DocType,
        k: usize,
    ) -> Result<RetrievedChannels, RetrieverError> {
        let expanded = self.expander.expand(query);
        let dense = self.dense_channel(query, doc_type, k)?;
        let sparse = self.sparse_channel(&expanded, doc_type, k);

        tracing::debug!(
            doc_type = doc_type.as_str(),
            dense = dense.len(),
            sparse = sparse.len(),
            "Retrieved candidates"
        );

        Ok(RetrievedChannels {
            dense,
            sparse,
            expanded,
        })
    }

    fn dense_channel(
        &self,
        query: &str,
        doc_type: DocType,
        k: usize,
    ) -> Result<Vec<DenseHit>, RetrieverError> {
        let embedding = self.embedder.embed(query)?;
        let count = (k * self.limits.dense_multiplier).max(self.limits.dense_floor);

        let neighbors = if self.native_filter {
            match self.store.query_nearest(&embedding, count, Some(doc_type)) {
                Ok(neighbors) => neighbors,
                Err(e) => {
                    // The probe said yes but the query failed anyway; fall
                    // back the same way as a store without the capability.
                    tracing::warn!(error = %e, "Native type filter failed, falling back to client-side filtering");
                    self.unfiltered_fallback(&embedding, doc_type, count)?
                }
            }
        } else {
            self.unfiltered_fallback(&embedding, doc_type, count)?
        };

        Ok(neighbors.into_iter().map(Self::to_dense_hit).collect())
    }

    fn unfiltered_fallback(
        &self,
        embedding: &[f32],
        doc_type: DocType,
        count: usize,
    ) -> Result<Vec<NearestNeighbor>, RetrieverError> {
        let batch = count.saturating_mul(self.limits.fallback_factor);
        let mut neighbors = self.store.query_nearest(embedding, batch, None)?;
        neighbors.retain(|n| n.doc_type == doc_type);
        neighbors.truncate(count);
        Ok(neighbors)
    }

    fn to_dense_hit(neighbor: NearestNeighbor) -> DenseHit {
        DenseHit {
            id: neighbor.id,
            text: neighbor.text,
            metadata: neighbor.metadata,
            similarity: (1.0 - neighbor.distance).clamp(0.0, 1.0),
        }
    }

    fn sparse_channel(
        &self,
        expanded: &BTreeSet<String>,
        doc_type: DocType,
        k: usize,
    ) -> Vec<SparseHit> {
        let Some(index) = &self.sparse else {
            return Vec::new();
        };

        let tokens = self.expander.sparse_query_tokens(expanded);
        if tokens.is_empty() {
            return Vec::new();
        }

        let limit = (k * self.limits.sparse_multiplier).min(self.limits.sparse_cap);
        index.top_scoring(&tokens, limit, doc_type.id_prefix())
    }
}
