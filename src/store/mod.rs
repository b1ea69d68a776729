//! Document model and the document store boundary
//!
//! The vector store itself is an external collaborator; this module pins the
//! query/response contract the retrieval engine uses against it, plus two
//! first-party implementations: an HNSW-backed store and a brute-force
//! in-memory store for small corpora and tests.

mod hnsw;
mod memory;

pub use hnsw::{HnswDocumentStore, HnswParams};
pub use memory::MemoryDocumentStore;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    #[error("Nearest-neighbor query failed: {0}")]
    Query(String),

    #[error("Type filtering is not supported by this store")]
    FilterUnsupported,

    #[error("Insert failed: {0}")]
    Insert(String),
}

/// Corpus partition. Tickets and guide chunks are never mixed in one
/// retrieval pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    Ticket,
    GuideChunk,
}

impl DocType {
    /// Prefix the indexing collaborator uses for document ids of this type.
    /// The sparse index restricts results by this prefix.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            DocType::Ticket => "ticket_",
            DocType::GuideChunk => "guide_",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Ticket => "ticket",
            DocType::GuideChunk => "guide_chunk",
        }
    }
}

/// Document metadata as written by the ingestion collaborator.
///
/// Absent values are normalized to empty strings before persistence; this
/// engine assumes that invariant holds and never sees a null sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default)]
    pub ticket_id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub guide_number: String,
    #[serde(default)]
    pub guide_title: String,
    #[serde(default)]
    pub section_title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl DocumentMetadata {
    /// True when no field carries information. Sparse-only candidates start
    /// out like this and get hydrated from the store before assembly.
    pub fn is_empty(&self) -> bool {
        self == &DocumentMetadata::default()
    }
}

/// An indexed document. Immutable once indexed; read-only to this engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub doc_type: DocType,
    pub metadata: DocumentMetadata,
}

/// One nearest-neighbor hit from the store.
#[derive(Debug, Clone)]
pub struct NearestNeighbor {
    pub id: String,
    pub text: String,
    pub doc_type: DocType,
    pub metadata: DocumentMetadata,
    /// Cosine distance, 0 = identical
    pub distance: f32,
}

/// Query contract against the external vector store.
///
/// Type filter support is optional; callers probe [`supports_type_filter`]
/// once and fall back to client-side filtering when the capability is
/// missing (`DualChannelRetriever` owns that fallback).
///
/// [`supports_type_filter`]: DocumentStore::supports_type_filter
pub trait DocumentStore: Send + Sync {
    /// Whether `query_nearest` honors a `doc_type` filter natively.
    fn supports_type_filter(&self) -> bool;

    /// Top-k nearest documents by cosine distance, optionally restricted
    /// to one document type.
    fn query_nearest(
        &self,
        vector: &[f32],
        k: usize,
        doc_type: Option<DocType>,
    ) -> Result<Vec<NearestNeighbor>, StoreError>;

    /// Bulk retrieval by id. Unknown ids are skipped, not an error.
    fn get_by_ids(&self, ids: &[String]) -> Result<Vec<Document>, StoreError>;

    /// Number of indexed documents.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_type_prefixes() {
        assert_eq!(DocType::Ticket.id_prefix(), "ticket_");
        assert_eq!(DocType::GuideChunk.id_prefix(), "guide_");
        assert_eq!(DocType::GuideChunk.as_str(), "guide_chunk");
    }

    #[test]
    fn metadata_emptiness() {
        let mut meta = DocumentMetadata::default();
        assert!(meta.is_empty());

        meta.subject = "Graffi sulla vernice".to_string();
        assert!(!meta.is_empty());
    }
}
