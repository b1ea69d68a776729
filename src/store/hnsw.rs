//! HNSW-backed document store
//!
//! Approximate nearest neighbor search over the embedded corpus using
//! cosine distance. Supports native type filtering by over-fetching and
//! filtering before returning, so the retriever's client-side fallback is
//! never needed against this store.

use super::{DocType, Document, DocumentStore, NearestNeighbor, StoreError};
use ahash::AHashMap;
use hnsw_rs::prelude::*;
use std::sync::RwLock;

/// HNSW construction parameters.
#[derive(Debug, Clone)]
pub struct HnswParams {
    pub dimension: usize,
    pub ef_construction: usize,
    pub m: usize,
    pub ef_search: usize,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            dimension: 384,
            ef_construction: 200,
            m: 16,
            ef_search: 50,
        }
    }
}

pub struct HnswDocumentStore {
    index: RwLock<Hnsw<'static, f32, DistCosine>>,
    /// Documents in insertion order; the HNSW data id is the position here.
    documents: RwLock<Vec<Document>>,
    by_id: RwLock<AHashMap<String, usize>>,
    params: HnswParams,
}

impl HnswDocumentStore {
    pub fn new(params: HnswParams, capacity: usize) -> Self {
        let index = Hnsw::<f32, DistCosine>::new(
            params.m,
            capacity.max(1),
            params.ef_construction,
            200, // max_nb_connection
            DistCosine,
        );

        Self {
            index: RwLock::new(index),
            documents: RwLock::new(Vec::new()),
            by_id: RwLock::new(AHashMap::new()),
            params,
        }
    }

    /// Insert a document with its precomputed embedding.
    ///
    /// Called by the ingestion collaborator at index-build time; the
    /// retrieval engine itself never writes.
    pub fn insert(&self, document: Document, embedding: &[f32]) -> Result<(), StoreError> {
        if embedding.len() != self.params.dimension {
            return Err(StoreError::Insert(format!(
                "embedding dimension {} does not match store dimension {}",
                embedding.len(),
                self.params.dimension
            )));
        }

        let mut documents = self.documents.write().unwrap();
        let mut by_id = self.by_id.write().unwrap();
        if by_id.contains_key(&document.id) {
            return Err(StoreError::Insert(format!(
                "duplicate document id: {}",
                document.id
            )));
        }

        let data_id = documents.len();
        let data = embedding.to_vec();
        let index = self.index.write().unwrap();
        index.insert((&data, data_id));

        by_id.insert(document.id.clone(), data_id);
        documents.push(document);
        Ok(())
    }

    pub fn insert_batch(
        &self,
        items: Vec<(Document, Vec<f32>)>,
    ) -> Result<(), StoreError> {
        for (document, embedding) in items {
            self.insert(document, &embedding)?;
        }
        Ok(())
    }
}

impl DocumentStore for HnswDocumentStore {
    fn supports_type_filter(&self) -> bool {
        true
    }

    fn query_nearest(
        &self,
        vector: &[f32],
        k: usize,
        doc_type: Option<DocType>,
    ) -> Result<Vec<NearestNeighbor>, StoreError> {
        if vector.len() != self.params.dimension {
            return Err(StoreError::Query(format!(
                "query dimension {} does not match store dimension {}",
                vector.len(),
                self.params.dimension
            )));
        }

        let documents = self.documents.read().unwrap();
        if documents.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        // Over-fetch when filtering so a type-skewed neighborhood still
        // yields k hits of the requested type.
        let fetch = if doc_type.is_some() { k.saturating_mul(3) } else { k };
        let fetch = fetch.min(documents.len()).max(1);

        let index = self.index.read().unwrap();
        let neighbors = index.search(vector, fetch, self.params.ef_search);

        let mut hits = Vec::with_capacity(k);
        for neighbor in neighbors {
            let Some(document) = documents.get(neighbor.d_id) else {
                continue;
            };
            if let Some(wanted) = doc_type {
                if document.doc_type != wanted {
                    continue;
                }
            }
            hits.push(NearestNeighbor {
                id: document.id.clone(),
                text: document.text.clone(),
                doc_type: document.doc_type,
                metadata: document.metadata.clone(),
                distance: neighbor.distance,
            });
            if hits.len() == k {
                break;
            }
        }

        Ok(hits)
    }

    fn get_by_ids(&self, ids: &[String]) -> Result<Vec<Document>, StoreError> {
        let documents = self.documents.read().unwrap();
        let by_id = self.by_id.read().unwrap();

        Ok(ids
            .iter()
            .filter_map(|id| by_id.get(id).and_then(|&idx| documents.get(idx)).cloned())
            .collect())
    }

    fn len(&self) -> usize {
        self.documents.read().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DocumentMetadata;

    fn doc(id: &str, doc_type: DocType, text: &str) -> Document {
        Document {
            id: id.to_string(),
            text: text.to_string(),
            doc_type,
            metadata: DocumentMetadata::default(),
        }
    }

    fn unit(dim: usize, axis: usize) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[axis] = 1.0;
        v
    }

    #[test]
    fn insert_and_query() {
        let store = HnswDocumentStore::new(
            HnswParams {
                dimension: 8,
                ..HnswParams::default()
            },
            16,
        );

        store
            .insert(doc("ticket_1", DocType::Ticket, "lavaggio auto"), &unit(8, 0))
            .unwrap();
        store
            .insert(doc("guide_1_0", DocType::GuideChunk, "guida lavaggio"), &unit(8, 1))
            .unwrap();

        assert_eq!(store.len(), 2);

        let hits = store.query_nearest(&unit(8, 0), 2, None).unwrap();
        assert_eq!(hits[0].id, "ticket_1");
        assert!(hits[0].distance < hits[1].distance);
    }

    #[test]
    fn native_type_filter() {
        let store = HnswDocumentStore::new(
            HnswParams {
                dimension: 4,
                ..HnswParams::default()
            },
            16,
        );

        store
            .insert(doc("ticket_1", DocType::Ticket, "t"), &unit(4, 0))
            .unwrap();
        store
            .insert(doc("guide_1_0", DocType::GuideChunk, "g"), &unit(4, 0))
            .unwrap();

        let hits = store
            .query_nearest(&unit(4, 0), 5, Some(DocType::GuideChunk))
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_type, DocType::GuideChunk);
    }

    #[test]
    fn duplicate_id_rejected() {
        let store = HnswDocumentStore::new(
            HnswParams {
                dimension: 4,
                ..HnswParams::default()
            },
            8,
        );

        store
            .insert(doc("ticket_1", DocType::Ticket, "t"), &unit(4, 0))
            .unwrap();
        let err = store.insert(doc("ticket_1", DocType::Ticket, "t"), &unit(4, 1));
        assert!(err.is_err());
    }

    #[test]
    fn get_by_ids_skips_unknown() {
        let store = HnswDocumentStore::new(
            HnswParams {
                dimension: 4,
                ..HnswParams::default()
            },
            8,
        );
        store
            .insert(doc("ticket_1", DocType::Ticket, "t"), &unit(4, 0))
            .unwrap();

        let docs = store
            .get_by_ids(&["ticket_1".to_string(), "ticket_999".to_string()])
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "ticket_1");
    }
}
