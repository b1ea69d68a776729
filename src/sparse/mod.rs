//! Sparse (BM25) lexical index
//!
//! A fitted term-statistics model over the corpus snapshot, plus the
//! parallel arrays of document ids and raw texts captured at build time.
//! Built once offline by the indexing collaborator, serialized as a JSON
//! artifact, and read-only at query time: `score` ranks a filtered token
//! list against every indexed document.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

const DEFAULT_K1: f32 = 1.2;
const DEFAULT_B: f32 = 0.75;

#[derive(Error, Debug)]
pub enum SparseIndexError {
    #[error("Failed to read sparse index artifact {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to write sparse index artifact {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("Malformed sparse index artifact {path}: {source}")]
    Decode {
        path: String,
        source: serde_json::Error,
    },

    #[error("Sparse index artifact encode failed: {0}")]
    Encode(serde_json::Error),

    #[error("Sparse index is empty")]
    EmptyCorpus,
}

/// On-disk shape of the index. Opaque to the rest of the engine.
#[derive(Serialize, Deserialize)]
struct SparseArtifact {
    built_at: String,
    k1: f32,
    b: f32,
    /// term -> [(document index, term frequency)]
    postings: AHashMap<String, Vec<(u32, u32)>>,
    doc_lengths: Vec<u32>,
    ids: Vec<String>,
    texts: Vec<String>,
}

/// One sparse hit: raw BM25 score, not yet normalized (fusion normalizes
/// per query by the max score in the candidate set).
#[derive(Debug, Clone)]
pub struct SparseHit {
    pub id: String,
    pub text: String,
    pub raw_score: f32,
}

pub struct SparseIndex {
    postings: AHashMap<String, Vec<(u32, u32)>>,
    doc_lengths: Vec<u32>,
    avg_doc_len: f32,
    ids: Vec<String>,
    texts: Vec<String>,
    k1: f32,
    b: f32,
}

impl SparseIndex {
    /// Fit the term statistics over a corpus snapshot of (id, text) pairs.
    pub fn build<S: AsRef<str>>(corpus: &[(S, S)]) -> Result<Self, SparseIndexError> {
        if corpus.is_empty() {
            return Err(SparseIndexError::EmptyCorpus);
        }

        let mut postings: AHashMap<String, Vec<(u32, u32)>> = AHashMap::new();
        let mut doc_lengths = Vec::with_capacity(corpus.len());
        let mut ids = Vec::with_capacity(corpus.len());
        let mut texts = Vec::with_capacity(corpus.len());

        for (doc_idx, (id, text)) in corpus.iter().enumerate() {
            let tokens: Vec<String> = text
                .as_ref()
                .split_whitespace()
                .map(|t| t.to_lowercase())
                .collect();
            doc_lengths.push(tokens.len() as u32);

            let mut term_freqs: AHashMap<&str, u32> = AHashMap::new();
            for token in &tokens {
                *term_freqs.entry(token.as_str()).or_insert(0) += 1;
            }
            for (term, freq) in term_freqs {
                postings
                    .entry(term.to_string())
                    .or_default()
                    .push((doc_idx as u32, freq));
            }

            ids.push(id.as_ref().to_string());
            texts.push(text.as_ref().to_string());
        }

        let total_len: u64 = doc_lengths.iter().map(|&l| l as u64).sum();
        let avg_doc_len = (total_len as f32 / doc_lengths.len() as f32).max(1.0);

        Ok(Self {
            postings,
            doc_lengths,
            avg_doc_len,
            ids,
            texts,
            k1: DEFAULT_K1,
            b: DEFAULT_B,
        })
    }

    /// Load a previously built artifact.
    pub fn load(path: &Path) -> Result<Self, SparseIndexError> {
        let content = std::fs::read_to_string(path).map_err(|e| SparseIndexError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let artifact: SparseArtifact =
            serde_json::from_str(&content).map_err(|e| SparseIndexError::Decode {
                path: path.display().to_string(),
                source: e,
            })?;

        if artifact.ids.is_empty()
            || artifact.ids.len() != artifact.texts.len()
            || artifact.ids.len() != artifact.doc_lengths.len()
        {
            return Err(SparseIndexError::EmptyCorpus);
        }

        let total_len: u64 = artifact.doc_lengths.iter().map(|&l| l as u64).sum();
        let avg_doc_len = (total_len as f32 / artifact.doc_lengths.len() as f32).max(1.0);

        tracing::info!(
            documents = artifact.ids.len(),
            built_at = %artifact.built_at,
            "Sparse index loaded"
        );

        Ok(Self {
            postings: artifact.postings,
            doc_lengths: artifact.doc_lengths,
            avg_doc_len,
            ids: artifact.ids,
            texts: artifact.texts,
            k1: artifact.k1,
            b: artifact.b,
        })
    }

    /// Load the artifact if it was ever built. A missing file means the
    /// index was not built: the engine degrades to dense-only retrieval. A
    /// file that exists but cannot be decoded is a real error.
    pub fn load_if_present(path: &Path) -> Result<Option<Self>, SparseIndexError> {
        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Sparse index artifact not found, sparse retrieval disabled"
            );
            return Ok(None);
        }
        Self::load(path).map(Some)
    }

    /// Serialize the fitted model to disk.
    pub fn save(&self, path: &Path) -> Result<(), SparseIndexError> {
        let artifact = SparseArtifact {
            built_at: chrono::Utc::now().to_rfc3339(),
            k1: self.k1,
            b: self.b,
            postings: self.postings.clone(),
            doc_lengths: self.doc_lengths.clone(),
            ids: self.ids.clone(),
            texts: self.texts.clone(),
        };
        let content = serde_json::to_string(&artifact).map_err(SparseIndexError::Encode)?;
        std::fs::write(path, content).map_err(|e| SparseIndexError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// BM25 score of the token list against every indexed document.
    ///
    /// Returned vector is parallel to the document arrays; documents
    /// matching no token score 0.0.
    pub fn score(&self, tokens: &[String]) -> Vec<f32> {
        let mut scores = vec![0.0f32; self.ids.len()];
        let n = self.ids.len() as f32;

        for token in tokens {
            let Some(postings) = self.postings.get(token.as_str()) else {
                continue;
            };
            let df = postings.len() as f32;
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();

            for &(doc_idx, tf) in postings {
                let doc_len = self.doc_lengths[doc_idx as usize] as f32;
                let tf = tf as f32;
                let score = idf * (tf * (self.k1 + 1.0))
                    / (tf + self.k1 * (1.0 - self.b + self.b * doc_len / self.avg_doc_len));
                scores[doc_idx as usize] += score;
            }
        }

        scores
    }

    /// Top scoring documents for the token list, restricted to ids with the
    /// given prefix. Zero-scoring documents are never returned.
    pub fn top_scoring(&self, tokens: &[String], limit: usize, id_prefix: &str) -> Vec<SparseHit> {
        let scores = self.score(tokens);

        let mut ranked: Vec<(usize, f32)> = scores
            .into_iter()
            .enumerate()
            .filter(|&(idx, score)| score > 0.0 && self.ids[idx].starts_with(id_prefix))
            .collect();

        // Score descending, document id ascending on ties.
        ranked.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| self.ids[a.0].cmp(&self.ids[b.0]))
        });
        ranked.truncate(limit);

        ranked
            .into_iter()
            .map(|(idx, score)| SparseHit {
                id: self.ids[idx].clone(),
                text: self.texts[idx].clone(),
                raw_score: score,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn corpus() -> Vec<(String, String)> {
        vec![
            (
                "ticket_1".to_string(),
                "pellicola ppf ingiallita sul cofano come rimuovere".to_string(),
            ),
            (
                "ticket_2".to_string(),
                "shampoo neutro per lavaggio auto consigli".to_string(),
            ),
            (
                "guide_1_0".to_string(),
                "guida alla rimozione della pellicola ppf danneggiata".to_string(),
            ),
        ]
    }

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn scores_every_document() {
        let index = SparseIndex::build(&corpus()).unwrap();
        let scores = index.score(&tokens(&["pellicola", "ppf"]));

        assert_eq!(scores.len(), 3);
        assert!(scores[0] > 0.0);
        assert_eq!(scores[1], 0.0);
        assert!(scores[2] > 0.0);
    }

    #[test]
    fn top_scoring_respects_prefix() {
        let index = SparseIndex::build(&corpus()).unwrap();

        let hits = index.top_scoring(&tokens(&["pellicola", "ppf"]), 10, "ticket_");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "ticket_1");

        let hits = index.top_scoring(&tokens(&["pellicola", "ppf"]), 10, "guide_");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "guide_1_0");
    }

    #[test]
    fn zero_score_documents_excluded() {
        let index = SparseIndex::build(&corpus()).unwrap();
        let hits = index.top_scoring(&tokens(&["inesistente"]), 10, "ticket_");
        assert!(hits.is_empty());
    }

    #[test]
    fn artifact_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sparse_index.json");

        let index = SparseIndex::build(&corpus()).unwrap();
        index.save(&path).unwrap();

        let loaded = SparseIndex::load(&path).unwrap();
        assert_eq!(loaded.len(), 3);

        let before = index.top_scoring(&tokens(&["pellicola"]), 5, "ticket_");
        let after = loaded.top_scoring(&tokens(&["pellicola"]), 5, "ticket_");
        assert_eq!(before.len(), after.len());
        assert_eq!(before[0].id, after[0].id);
        assert!((before[0].raw_score - after[0].raw_score).abs() < 1e-6);
    }

    #[test]
    fn absent_artifact_loads_as_none() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.json");
        assert!(SparseIndex::load_if_present(&path).unwrap().is_none());
    }

    #[test]
    fn malformed_artifact_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("garbage.json");
        std::fs::write(&path, "not json at all").unwrap();

        assert!(matches!(
            SparseIndex::load_if_present(&path),
            Err(SparseIndexError::Decode { .. })
        ));
    }

    #[test]
    fn empty_corpus_rejected() {
        let corpus: Vec<(String, String)> = Vec::new();
        assert!(matches!(
            SparseIndex::build(&corpus),
            Err(SparseIndexError::EmptyCorpus)
        ));
    }
}
