//! Brute-force in-memory document store
//!
//! Exact cosine search over a small corpus. Used in tests and by hosts whose
//! corpus is small enough that an ANN index is not worth building. Can be
//! constructed without type-filter support to model stores that lack the
//! capability, which exercises the retriever's client-side fallback.

use super::{DocType, Document, DocumentStore, NearestNeighbor, StoreError};
use ahash::AHashMap;
use std::sync::RwLock;

pub struct MemoryDocumentStore {
    entries: RwLock<Vec<(Document, Vec<f32>)>>,
    by_id: RwLock<AHashMap<String, usize>>,
    type_filter_supported: bool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            by_id: RwLock::new(AHashMap::new()),
            type_filter_supported: true,
        }
    }

    /// A store that does not honor type filters, for backends without the
    /// capability. `query_nearest` with a filter returns
    /// [`StoreError::FilterUnsupported`].
    pub fn without_type_filter() -> Self {
        Self {
            type_filter_supported: false,
            ..Self::new()
        }
    }

    pub fn insert(&self, document: Document, embedding: Vec<f32>) -> Result<(), StoreError> {
        let mut entries = self.entries.write().unwrap();
        let mut by_id = self.by_id.write().unwrap();
        if by_id.contains_key(&document.id) {
            return Err(StoreError::Insert(format!(
                "duplicate document id: {}",
                document.id
            )));
        }
        by_id.insert(document.id.clone(), entries.len());
        entries.push((document, embedding));
        Ok(())
    }

    fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if mag_a == 0.0 || mag_b == 0.0 {
            return 1.0;
        }
        1.0 - dot / (mag_a * mag_b)
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn supports_type_filter(&self) -> bool {
        self.type_filter_supported
    }

    fn query_nearest(
        &self,
        vector: &[f32],
        k: usize,
        doc_type: Option<DocType>,
    ) -> Result<Vec<NearestNeighbor>, StoreError> {
        if doc_type.is_some() && !self.type_filter_supported {
            return Err(StoreError::FilterUnsupported);
        }

        let entries = self.entries.read().unwrap();
        let mut hits: Vec<NearestNeighbor> = entries
            .iter()
            .filter(|(doc, _)| doc_type.map_or(true, |t| doc.doc_type == t))
            .map(|(doc, emb)| NearestNeighbor {
                id: doc.id.clone(),
                text: doc.text.clone(),
                doc_type: doc.doc_type,
                metadata: doc.metadata.clone(),
                distance: Self::cosine_distance(vector, emb),
            })
            .collect();

        // Distance ascending, id as a deterministic tie-break.
        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    fn get_by_ids(&self, ids: &[String]) -> Result<Vec<Document>, StoreError> {
        let entries = self.entries.read().unwrap();
        let by_id = self.by_id.read().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| {
                by_id
                    .get(id)
                    .and_then(|&idx| entries.get(idx))
                    .map(|(doc, _)| doc.clone())
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }
}
