//! Cross-encoder reranking adapter
//!
//! Wraps a relevance oracle that scores (query, text) pairs jointly. When
//! the oracle cannot be built the adapter becomes a no-op passthrough
//! instead of crashing the system. This is the only component allowed to
//! reverse the fused ordering, and always the last step before context
//! assembly.

use crate::retrieval::RetrievalCandidate;
use fastembed::{RerankInitOptions, RerankerModel, TextRerank};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RerankError {
    #[error("Reranker initialization failed: {0}")]
    InitializationError(String),

    #[error("Pair scoring failed: {0}")]
    ScoringError(String),
}

/// Cross-encoder relevance oracle: scores (query, text) pairs directly,
/// not via separate embeddings.
pub trait RerankOracle: Send + Sync {
    /// One score per text, in input order.
    fn score_pairs(&self, query: &str, texts: &[String]) -> Result<Vec<f32>, RerankError>;

    fn model_name(&self) -> &str;
}

/// FastEmbed cross-encoder oracle.
pub struct CrossEncoderOracle {
    model: Arc<TextRerank>,
    model_name: String,
}

impl CrossEncoderOracle {
    pub fn new(model_name: &str) -> Result<Self, RerankError> {
        tracing::info!("Initializing reranker model: {}", model_name);

        let init_options = RerankInitOptions::new(RerankerModel::BGERerankerBase)
            .with_show_download_progress(true);
        let model = TextRerank::try_new(init_options)
            .map_err(|e| RerankError::InitializationError(e.to_string()))?;

        Ok(Self {
            model: Arc::new(model),
            model_name: model_name.to_string(),
        })
    }
}

impl RerankOracle for CrossEncoderOracle {
    fn score_pairs(&self, query: &str, texts: &[String]) -> Result<Vec<f32>, RerankError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let documents: Vec<&str> = texts.iter().map(String::as_str).collect();
        let results = self
            .model
            .rerank(query, documents, false, None)
            .map_err(|e| RerankError::ScoringError(e.to_string()))?;

        // FastEmbed returns results ranked; restore input order.
        let mut scores = vec![0.0f32; texts.len()];
        for result in results {
            if let Some(slot) = scores.get_mut(result.index) {
                *slot = result.score;
            }
        }
        Ok(scores)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Adapter around an optional [`RerankOracle`].
///
/// Without an oracle (disabled, or failed to load) `rerank` truncates the
/// fused ordering unchanged.
pub struct RerankerAdapter {
    oracle: Option<Arc<dyn RerankOracle>>,
}

impl RerankerAdapter {
    pub fn new(oracle: Arc<dyn RerankOracle>) -> Self {
        Self {
            oracle: Some(oracle),
        }
    }

    pub fn passthrough() -> Self {
        Self { oracle: None }
    }

    /// Build the cross-encoder oracle, degrading to a passthrough when the
    /// model cannot be loaded.
    pub fn try_cross_encoder(model_name: &str) -> Self {
        match CrossEncoderOracle::new(model_name) {
            Ok(oracle) => Self::new(Arc::new(oracle)),
            Err(e) => {
                tracing::warn!(error = %e, "Reranker unavailable, continuing with fused ordering");
                Self::passthrough()
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.oracle.is_some()
    }

    /// Reorder candidates by oracle score and keep the top `top_k`. Oracle
    /// failures at scoring time degrade to the fused ordering as well.
    pub fn rerank(
        &self,
        query: &str,
        mut candidates: Vec<RetrievalCandidate>,
        top_k: usize,
    ) -> Vec<RetrievalCandidate> {
        let Some(oracle) = &self.oracle else {
            candidates.truncate(top_k);
            return candidates;
        };

        if candidates.len() <= 1 {
            candidates.truncate(top_k);
            return candidates;
        }

        let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
        let scores = match oracle.score_pairs(query, &texts) {
            Ok(scores) if scores.len() == candidates.len() => scores,
            Ok(_) => {
                tracing::warn!("Reranker returned a mismatched score count, keeping fused ordering");
                candidates.truncate(top_k);
                return candidates;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Reranking failed, keeping fused ordering");
                candidates.truncate(top_k);
                return candidates;
            }
        };

        let mut scored: Vec<(f32, RetrievalCandidate)> =
            scores.into_iter().zip(candidates).collect();
        // Stable sort: equal oracle scores preserve the fused ordering.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(top_k);
        scored.into_iter().map(|(_, candidate)| candidate).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DocumentMetadata;

    struct ReverseOracle;

    impl RerankOracle for ReverseOracle {
        fn score_pairs(&self, _query: &str, texts: &[String]) -> Result<Vec<f32>, RerankError> {
            // Highest score to the last candidate: reverses the input order.
            Ok((0..texts.len()).map(|i| i as f32).collect())
        }

        fn model_name(&self) -> &str {
            "reverse"
        }
    }

    struct FailingOracle;

    impl RerankOracle for FailingOracle {
        fn score_pairs(&self, _query: &str, _texts: &[String]) -> Result<Vec<f32>, RerankError> {
            Err(RerankError::ScoringError("model crashed".to_string()))
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    fn candidate(id: &str) -> RetrievalCandidate {
        RetrievalCandidate {
            document_id: id.to_string(),
            text: format!("testo {id}"),
            metadata: DocumentMetadata::default(),
            dense_score: 0.0,
            sparse_score: 0.0,
            lexical_score: 0.0,
            hybrid_score: 0.0,
        }
    }

    #[test]
    fn passthrough_truncates_unchanged() {
        let adapter = RerankerAdapter::passthrough();
        assert!(!adapter.is_active());

        let candidates = vec![candidate("a"), candidate("b"), candidate("c")];
        let reranked = adapter.rerank("query", candidates, 2);

        let ids: Vec<&str> = reranked.iter().map(|c| c.document_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn oracle_ordering_wins() {
        let adapter = RerankerAdapter::new(Arc::new(ReverseOracle));
        let candidates = vec![candidate("a"), candidate("b"), candidate("c")];

        let reranked = adapter.rerank("query", candidates, 2);
        let ids: Vec<&str> = reranked.iter().map(|c| c.document_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[test]
    fn scoring_failure_degrades_to_fused_ordering() {
        let adapter = RerankerAdapter::new(Arc::new(FailingOracle));
        let candidates = vec![candidate("a"), candidate("b"), candidate("c")];

        let reranked = adapter.rerank("query", candidates, 2);
        let ids: Vec<&str> = reranked.iter().map(|c| c.document_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
