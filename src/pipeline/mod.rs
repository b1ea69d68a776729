//! Answer pipeline orchestration
//!
//! Control flow per query: cache lookup, dense+sparse retrieval per
//! document type, hybrid fusion, reranking, context assembly, generation,
//! cache store. Every dependency is injected at construction so hosts and
//! tests choose their own oracles; per-query state is local and never
//! shared, the response cache being the only cross-query structure.

use crate::cache::{key_for, ResponseCache};
use crate::config::Config;
use crate::context::{AssembledContext, ContextAssembler};
use crate::embedding::EmbeddingOracle;
use crate::error::{Result, RispostaError};
use crate::expansion::QueryExpander;
use crate::generation::{build_prompt, generate_drafts, Draft, Generator, Language};
use crate::retrieval::{
    fuse, DualChannelRetriever, FusionWeights, RerankerAdapter, RetrievalCandidate,
};
use crate::sparse::SparseIndex;
use crate::store::{DocType, DocumentStore};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Temperature used for single-answer requests
const SINGLE_ANSWER_TEMPERATURE: f32 = 0.7;

/// One answering request.
#[derive(Debug, Clone)]
pub struct AnswerRequest {
    pub query: String,
    /// Relevant tickets to retrieve
    pub n_tickets: usize,
    /// Relevant guide sections to retrieve
    pub n_guides: usize,
    /// Draft answers to generate (sequentially)
    pub num_drafts: usize,
    pub language: Language,
    pub use_cache: bool,
    /// Whether the host streams the answer; streaming requests always
    /// bypass the cache
    pub streaming: bool,
}

impl AnswerRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            n_tickets: 3,
            n_guides: 3,
            num_drafts: 1,
            language: Language::default(),
            use_cache: true,
            streaming: false,
        }
    }
}

/// Source pointer the host can cite without re-querying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub document_id: String,
    pub doc_type: DocType,
    pub title: String,
    pub hybrid_score: f32,
}

/// Full answer payload: also the cache value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerPayload {
    pub query: String,
    /// Primary answer (first draft)
    pub answer: String,
    pub context: AssembledContext,
    pub drafts: Vec<Draft>,
    pub sources: Vec<SourceRef>,
    pub model: String,
}

pub struct AnswerPipeline {
    store: Arc<dyn DocumentStore>,
    retriever: DualChannelRetriever,
    reranker: RerankerAdapter,
    assembler: ContextAssembler,
    cache: ResponseCache<AnswerPayload>,
    generator: Arc<dyn Generator>,
    weights: FusionWeights,
    important_terms: BTreeSet<String>,
    fused_pool_multiplier: usize,
    fused_pool_floor: usize,
    rerank_multiplier: usize,
    max_tokens: usize,
}

impl AnswerPipeline {
    pub fn new(
        config: &Config,
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn EmbeddingOracle>,
        sparse: Option<Arc<SparseIndex>>,
        reranker: RerankerAdapter,
        generator: Arc<dyn Generator>,
    ) -> Self {
        let expander = QueryExpander::new(config.vocabulary.clone());
        let retriever = DualChannelRetriever::new(
            Arc::clone(&store),
            embedder,
            sparse,
            expander,
            config.retrieval.channels.clone(),
        );

        tracing::info!(
            reranker_active = reranker.is_active(),
            model = generator.model_name(),
            "Answer pipeline initialized"
        );

        Self {
            store,
            retriever,
            reranker,
            assembler: ContextAssembler::new(config.context.clone()),
            cache: ResponseCache::new(&config.cache),
            generator,
            weights: config.fusion,
            important_terms: config.vocabulary.important_terms.clone(),
            fused_pool_multiplier: config.retrieval.fused_pool_multiplier,
            fused_pool_floor: config.retrieval.fused_pool_floor,
            rerank_multiplier: config.retrieval.rerank_multiplier,
            max_tokens: config.generation.max_tokens,
        }
    }

    /// Answer a customer question end to end.
    pub fn answer(&self, request: &AnswerRequest) -> Result<AnswerPayload> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(RispostaError::InvalidQuery(
                "Query text cannot be empty".to_string(),
            ));
        }

        tracing::info!(query = %query, "Processing query");

        // Only non-streaming single-answer requests hit the cache.
        let cacheable = request.use_cache && !request.streaming && request.num_drafts <= 1;
        let cache_key = key_for(
            query,
            request.n_tickets,
            request.n_guides,
            request.language.as_str(),
        );
        if cacheable {
            if let Some(cached) = self.cache.get(&cache_key) {
                tracing::info!("Cache hit, returning cached answer");
                return Ok(cached);
            }
        }

        let tickets = self.retrieve_ranked(query, DocType::Ticket, request.n_tickets)?;
        let guides = self.retrieve_ranked(query, DocType::GuideChunk, request.n_guides)?;

        let context = self.assembler.assemble(&tickets, &guides);
        let prompt = build_prompt(query, &context.text, request.language);

        let drafts = if request.num_drafts <= 1 {
            let text =
                self.generator
                    .generate(&prompt, SINGLE_ANSWER_TEMPERATURE, self.max_tokens)?;
            vec![Draft {
                text,
                temperature: SINGLE_ANSWER_TEMPERATURE,
                draft_number: 1,
                failed: false,
            }]
        } else {
            generate_drafts(
                self.generator.as_ref(),
                &prompt,
                request.num_drafts,
                self.max_tokens,
            )
        };

        let mut sources = Vec::with_capacity(tickets.len() + guides.len());
        sources.extend(tickets.iter().map(|c| source_ref(DocType::Ticket, c)));
        sources.extend(guides.iter().map(|c| source_ref(DocType::GuideChunk, c)));

        let payload = AnswerPayload {
            query: query.to_string(),
            answer: drafts[0].text.clone(),
            context,
            drafts,
            sources,
            model: self.generator.model_name().to_string(),
        };

        if cacheable {
            self.cache.put(cache_key, payload.clone());
        }

        Ok(payload)
    }

    /// Retrieve, fuse, rerank and hydrate the final candidates of one type.
    fn retrieve_ranked(
        &self,
        query: &str,
        doc_type: DocType,
        k: usize,
    ) -> Result<Vec<RetrievalCandidate>> {
        let channels = self.retriever.retrieve(query, doc_type, k)?;

        let pool = (k * self.fused_pool_multiplier).max(self.fused_pool_floor);
        let fused = fuse(
            &channels.expanded,
            &self.important_terms,
            &channels.dense,
            &channels.sparse,
            &self.weights,
            pool,
        );

        let mut ranked = self
            .reranker
            .rerank(query, fused, k * self.rerank_multiplier);
        ranked.truncate(k);

        self.hydrate_metadata(&mut ranked)?;
        Ok(ranked)
    }

    /// Sparse-only candidates carry no metadata (the sparse artifact stores
    /// only ids and texts); fill it in from the store for the few finalists.
    fn hydrate_metadata(&self, candidates: &mut [RetrievalCandidate]) -> Result<()> {
        let missing: Vec<String> = candidates
            .iter()
            .filter(|c| c.metadata.is_empty())
            .map(|c| c.document_id.clone())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        let documents = self.store.get_by_ids(&missing)?;
        let by_id: AHashMap<&str, &crate::store::Document> = documents
            .iter()
            .map(|doc| (doc.id.as_str(), doc))
            .collect();

        for candidate in candidates.iter_mut() {
            if candidate.metadata.is_empty() {
                if let Some(doc) = by_id.get(candidate.document_id.as_str()) {
                    candidate.metadata = doc.metadata.clone();
                }
            }
        }
        Ok(())
    }

    /// Drop every cached answer.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cached_answers(&self) -> usize {
        self.cache.len()
    }
}

fn source_ref(doc_type: DocType, candidate: &RetrievalCandidate) -> SourceRef {
    let meta = &candidate.metadata;
    let title = match doc_type {
        DocType::Ticket => {
            if meta.subject.is_empty() {
                candidate.document_id.clone()
            } else {
                meta.subject.clone()
            }
        }
        DocType::GuideChunk => {
            if meta.section_title.is_empty() {
                meta.guide_title.clone()
            } else {
                format!("{} - {}", meta.guide_title, meta.section_title)
            }
        }
    };

    SourceRef {
        document_id: candidate.document_id.clone(),
        doc_type,
        title,
        hybrid_score: candidate.hybrid_score,
    }
}
