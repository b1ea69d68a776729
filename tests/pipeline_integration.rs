//! Integration tests: full answer pipeline over a realistic bilingual corpus
//!
//! Runs the whole control flow (expansion, dual-channel retrieval, fusion,
//! reranking, assembly, generation, caching) against deterministic fake
//! oracles, so every assertion is reproducible without model downloads.

use risposta::config::Config;
use risposta::embedding::{EmbeddingError, EmbeddingOracle};
use risposta::generation::{GenerationError, Generator};
use risposta::pipeline::{AnswerPipeline, AnswerRequest};
use risposta::retrieval::RerankerAdapter;
use risposta::sparse::SparseIndex;
use risposta::store::{DocType, Document, DocumentMetadata, MemoryDocumentStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Deterministic embedder: texts mentioning film/pellicola cluster on one
/// axis, interior cleaning on another, everything else on a third.
struct KeywordEmbedder;

impl EmbeddingOracle for KeywordEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let lowered = text.to_lowercase();
        if lowered.contains("pellicola") {
            Ok(vec![1.0, 0.0, 0.0])
        } else if lowered.contains("interni") {
            Ok(vec![0.0, 1.0, 0.0])
        } else {
            Ok(vec![0.0, 0.0, 1.0])
        }
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimension(&self) -> usize {
        3
    }

    fn model_name(&self) -> &str {
        "keyword-fake"
    }
}

struct CountingGenerator {
    calls: AtomicUsize,
}

impl CountingGenerator {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

impl Generator for CountingGenerator {
    fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        _max_tokens: usize,
    ) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!(
            "Risposta (temp {temperature}, contesto {} byte)",
            prompt.len()
        ))
    }

    fn model_name(&self) -> &str {
        "counting-fake"
    }
}

fn ticket(id: &str, subject: &str, text: &str) -> Document {
    Document {
        id: id.to_string(),
        text: text.to_string(),
        doc_type: DocType::Ticket,
        metadata: DocumentMetadata {
            ticket_id: id.trim_start_matches("ticket_").to_string(),
            subject: subject.to_string(),
            status: "solved".to_string(),
            ..DocumentMetadata::default()
        },
    }
}

fn guide(id: &str, title: &str, section: &str, text: &str) -> Document {
    Document {
        id: id.to_string(),
        text: text.to_string(),
        doc_type: DocType::GuideChunk,
        metadata: DocumentMetadata {
            guide_number: "G1".to_string(),
            guide_title: title.to_string(),
            section_title: section.to_string(),
            ..DocumentMetadata::default()
        },
    }
}

fn corpus() -> Vec<Document> {
    vec![
        ticket(
            "ticket_1",
            "Pellicola opacizzata",
            "la pellicola del cofano si è opacizzata con il sole",
        ),
        ticket(
            "ticket_2",
            "PPF ingiallita",
            "ppf ingiallita dopo due anni carteggiatura necessaria per rimuoverla",
        ),
        ticket(
            "ticket_3",
            "Ritardo spedizione",
            "problema con ordine numero 5521 spedizione in ritardo",
        ),
        guide(
            "guide_1_0",
            "Rimozione pellicole",
            "Preparazione",
            "guida alla rimozione della pellicola ppf passaggi e attrezzi",
        ),
        guide(
            "guide_2_0",
            "Pulizia interni",
            "Abitacolo",
            "guida alla pulizia degli interni e del cruscotto",
        ),
    ]
}

fn seeded_store(store: &MemoryDocumentStore, embedder: &KeywordEmbedder) {
    for doc in corpus() {
        let embedding = embedder.embed(&doc.text).unwrap();
        store.insert(doc, embedding).unwrap();
    }
}

fn sparse_artifact(dir: &TempDir) -> SparseIndex {
    let entries: Vec<(String, String)> = corpus()
        .into_iter()
        .map(|doc| (doc.id, doc.text))
        .collect();
    let index = SparseIndex::build(&entries).unwrap();

    // Round-trip through the on-disk artifact, as a host would at startup.
    let path = dir.path().join("sparse_index.json");
    index.save(&path).unwrap();
    SparseIndex::load_if_present(&path).unwrap().unwrap()
}

fn build_pipeline(
    config: Config,
    store: MemoryDocumentStore,
    sparse: Option<SparseIndex>,
    generator: Arc<CountingGenerator>,
) -> AnswerPipeline {
    let embedder = KeywordEmbedder;
    seeded_store(&store, &embedder);

    AnswerPipeline::new(
        &config,
        Arc::new(store),
        Arc::new(embedder),
        sparse.map(Arc::new),
        RerankerAdapter::passthrough(),
        generator,
    )
}

#[test]
fn end_to_end_hybrid_answer() {
    init_tracing();
    let temp = TempDir::new().unwrap();
    let generator = Arc::new(CountingGenerator::new());
    let pipeline = build_pipeline(
        Config::default(),
        MemoryDocumentStore::new(),
        Some(sparse_artifact(&temp)),
        Arc::clone(&generator),
    );

    let payload = pipeline
        .answer(&AnswerRequest::new("pellicola ppf ingiallita sul cofano"))
        .unwrap();

    assert!(!payload.answer.is_empty());
    assert!(payload.context.text.contains("=== HISTORICAL TICKETS ==="));
    assert!(payload.context.text.contains("=== PRODUCT GUIDES ==="));
    assert_eq!(payload.model, "counting-fake");

    // The keyword-heavy ticket is found even though its embedding is far
    // from the query: sparse + lexical signals carry it.
    let t2 = payload
        .sources
        .iter()
        .find(|s| s.document_id == "ticket_2")
        .expect("keyword-matched ticket retrieved");
    let t3 = payload
        .sources
        .iter()
        .find(|s| s.document_id == "ticket_3")
        .expect("filler ticket retrieved");
    assert!(t2.hybrid_score > t3.hybrid_score);

    // The semantically-close ticket still wins overall.
    let t1 = payload
        .sources
        .iter()
        .find(|s| s.document_id == "ticket_1")
        .unwrap();
    assert!(t1.hybrid_score > t2.hybrid_score);
}

#[test]
fn fallback_keeps_document_types_pure() {
    init_tracing();
    let generator = Arc::new(CountingGenerator::new());
    let pipeline = build_pipeline(
        Config::default(),
        MemoryDocumentStore::without_type_filter(),
        None,
        Arc::clone(&generator),
    );

    let payload = pipeline
        .answer(&AnswerRequest::new("pellicola ingiallita"))
        .unwrap();

    for source in &payload.sources {
        match source.doc_type {
            DocType::Ticket => assert!(source.document_id.starts_with("ticket_")),
            DocType::GuideChunk => assert!(source.document_id.starts_with("guide_")),
        }
    }
    assert!(payload
        .sources
        .iter()
        .any(|s| s.doc_type == DocType::Ticket));
    assert!(payload
        .sources
        .iter()
        .any(|s| s.doc_type == DocType::GuideChunk));
}

#[test]
fn missing_sparse_artifact_degrades_to_dense_only() {
    init_tracing();
    let temp = TempDir::new().unwrap();
    let absent = temp.path().join("never_built.json");
    let sparse = SparseIndex::load_if_present(&absent).unwrap();
    assert!(sparse.is_none());

    let generator = Arc::new(CountingGenerator::new());
    let pipeline = build_pipeline(
        Config::default(),
        MemoryDocumentStore::new(),
        sparse,
        Arc::clone(&generator),
    );

    let payload = pipeline
        .answer(&AnswerRequest::new("pellicola opacizzata"))
        .unwrap();
    assert!(!payload.sources.is_empty());
}

#[test]
fn cache_round_trip_and_ttl_expiry() {
    init_tracing();

    // Long TTL: second identical request is served from cache.
    let generator = Arc::new(CountingGenerator::new());
    let pipeline = build_pipeline(
        Config::default(),
        MemoryDocumentStore::new(),
        None,
        Arc::clone(&generator),
    );
    let request = AnswerRequest::new("pellicola ingiallita");
    pipeline.answer(&request).unwrap();
    pipeline.answer(&request).unwrap();
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);

    // Zero TTL: the entry expires before the second request.
    let mut config = Config::default();
    config.cache.ttl_secs = 0;
    let generator = Arc::new(CountingGenerator::new());
    let pipeline = build_pipeline(
        config,
        MemoryDocumentStore::new(),
        None,
        Arc::clone(&generator),
    );
    pipeline.answer(&request).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(20));
    pipeline.answer(&request).unwrap();
    assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    assert_eq!(pipeline.cached_answers(), 1);
}

#[test]
fn context_respects_global_budget_end_to_end() {
    init_tracing();
    let mut config = Config::default();
    config.context.max_total_len = 500;
    config.context.min_tail_len = 50;

    let store = MemoryDocumentStore::new();
    let embedder = KeywordEmbedder;
    let long_body = "pellicola dettaglio ".repeat(500);
    for i in 1..=4 {
        let embedding = embedder.embed(&long_body).unwrap();
        store
            .insert(
                ticket(&format!("ticket_{i}"), "Soggetto", &long_body),
                embedding,
            )
            .unwrap();
    }

    let generator = Arc::new(CountingGenerator::new());
    let pipeline = AnswerPipeline::new(
        &config,
        Arc::new(store),
        Arc::new(KeywordEmbedder),
        None,
        RerankerAdapter::passthrough(),
        generator,
    );

    let payload = pipeline
        .answer(&AnswerRequest::new("pellicola"))
        .unwrap();
    assert!(payload.context.text.len() <= 500);
    assert!(payload.context.truncated);
}

#[test]
fn repeated_queries_produce_identical_context() {
    init_tracing();
    let temp = TempDir::new().unwrap();
    let generator = Arc::new(CountingGenerator::new());
    let pipeline = build_pipeline(
        Config::default(),
        MemoryDocumentStore::new(),
        Some(sparse_artifact(&temp)),
        Arc::clone(&generator),
    );

    let mut request = AnswerRequest::new("pellicola ppf ingiallita");
    request.use_cache = false;

    let first = pipeline.answer(&request).unwrap();
    for _ in 0..3 {
        let again = pipeline.answer(&request).unwrap();
        assert_eq!(first.context.text, again.context.text);
    }
}

#[test]
fn sparse_only_candidates_are_hydrated_from_the_store() {
    init_tracing();
    let temp = TempDir::new().unwrap();

    // Tight dense channel: only the two nearest tickets come back dense,
    // so the keyword-rich ticket_9 is reachable through sparse alone.
    let mut config = Config::default();
    config.retrieval.channels.dense_multiplier = 1;
    config.retrieval.channels.dense_floor = 1;

    let docs = vec![
        ticket(
            "ticket_1",
            "Pellicola opacizzata",
            "la pellicola del cofano si è opacizzata",
        ),
        ticket(
            "ticket_5",
            "Ritardo spedizione",
            "problema con ordine spedizione in ritardo",
        ),
        ticket(
            "ticket_9",
            "PPF da rimuovere",
            "ppf ingiallita carteggiatura rimozione completa",
        ),
    ];

    let store = MemoryDocumentStore::new();
    let embedder = KeywordEmbedder;
    for doc in docs.clone() {
        let embedding = embedder.embed(&doc.text).unwrap();
        store.insert(doc, embedding).unwrap();
    }

    let entries: Vec<(String, String)> = docs.into_iter().map(|d| (d.id, d.text)).collect();
    let sparse = SparseIndex::build(&entries).unwrap();
    let path = temp.path().join("sparse_index.json");
    sparse.save(&path).unwrap();
    let sparse = SparseIndex::load_if_present(&path).unwrap().unwrap();

    let pipeline = AnswerPipeline::new(
        &config,
        Arc::new(store),
        Arc::new(KeywordEmbedder),
        Some(Arc::new(sparse)),
        RerankerAdapter::passthrough(),
        Arc::new(CountingGenerator::new()),
    );

    let mut request = AnswerRequest::new("pellicola ppf ingiallita");
    request.n_tickets = 2;

    let payload = pipeline.answer(&request).unwrap();
    let t9 = payload
        .sources
        .iter()
        .find(|s| s.document_id == "ticket_9")
        .expect("sparse-only ticket surfaced");

    // Metadata came from the store, not the sparse artifact.
    assert_eq!(t9.title, "PPF da rimuovere");
    assert!(payload.context.text.contains("Subject: PPF da rimuovere"));
}

#[test]
fn multi_draft_records_failures_in_place() {
    init_tracing();

    struct FlakyGenerator {
        calls: AtomicUsize,
    }

    impl Generator for FlakyGenerator {
        fn generate(
            &self,
            _prompt: &str,
            temperature: f32,
            _max_tokens: usize,
        ) -> Result<String, GenerationError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == 2 {
                return Err(GenerationError::BackendUnavailable(
                    "connection refused".to_string(),
                ));
            }
            Ok(format!("bozza a temperatura {temperature}"))
        }

        fn model_name(&self) -> &str {
            "flaky-fake"
        }
    }

    let store = MemoryDocumentStore::new();
    seeded_store(&store, &KeywordEmbedder);

    let pipeline = AnswerPipeline::new(
        &Config::default(),
        Arc::new(store),
        Arc::new(KeywordEmbedder),
        None,
        RerankerAdapter::passthrough(),
        Arc::new(FlakyGenerator {
            calls: AtomicUsize::new(0),
        }),
    );

    let mut request = AnswerRequest::new("pellicola ingiallita");
    request.num_drafts = 3;

    let payload = pipeline.answer(&request).unwrap();
    assert_eq!(payload.drafts.len(), 3);
    assert!(!payload.drafts[0].failed);
    assert!(payload.drafts[1].failed);
    assert!(payload.drafts[1].text.contains("connection refused"));
    assert!(!payload.drafts[2].failed);

    // Temperatures follow the ascending schedule.
    assert_eq!(payload.drafts[0].temperature, 0.3);
    assert_eq!(payload.drafts[1].temperature, 0.5);
    assert_eq!(payload.drafts[2].temperature, 0.7);
}
