//! End-to-end scenarios: indexing a corpus, answering questions, appending
//! and reloading.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tarih_rag::document::{Record, RecordOrigin};
use tarih_rag::generation::{GenerationRequest, TextGenerator};
use tarih_rag::pipeline::CorpusStats;
use tarih_rag::{
    EmbeddingProvider, HashingEmbeddingProvider, IndexPipeline, InMemoryVectorStore, NO_INFORMATION_RESPONSE,
    RagConfig, RagError, RagSystem, RetrievalMode, VectorStore,
};

/// Records every prompt it is asked to answer.
#[derive(Default)]
struct CountingGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl TextGenerator for CountingGenerator {
    async fn generate(&self, request: &GenerationRequest) -> tarih_rag::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("YANIT[{}]", request.context.lines().count()))
    }

    fn name(&self) -> &str {
        "counting"
    }
}

fn write_corpus(dir: &Path) {
    fs::write(
        dir.join("osmanli_devleti.json"),
        r#"[
            {
                "id": "osm_001",
                "donem": "Osmanlı Devleti",
                "kategori": {"ana": "Siyasi", "alt": "Fetih"},
                "konu": "İstanbul'un Fethi",
                "icerik": "İstanbul 1453 yılında Fatih Sultan Mehmet tarafından fethedildi.",
                "anahtar_kelimeler": ["İstanbul", "Fetih", "1453"],
                "yil": 1453,
                "kaynak": "Türk Tarih Kurumu"
            },
            {
                "id": "osm_002",
                "donem": "Osmanlı Devleti",
                "konu": "Lale Devri",
                "icerik": "Lale Devri 1718 ile 1730 yılları arasında yaşandı.",
                "yil": 1718,
                "kaynak": "TTK"
            }
        ]"#,
    )
    .unwrap();
    fs::write(
        dir.join("cumhuriyet_donemi.json"),
        r#"[
            {
                "id": "cum_001",
                "donem": "Cumhuriyet Dönemi",
                "konu": "Cumhuriyetin İlanı",
                "icerik": "Cumhuriyet 29 Ekim 1923 tarihinde Ankara'da ilan edildi.",
                "yil": 1923,
                "kaynak": "TBMM Arşivi"
            }
        ]"#,
    )
    .unwrap();
    fs::write(dir.join("bozuk.json"), "[{").unwrap();
}

fn config(data_dir: &Path, index_dir: &Path) -> RagConfig {
    RagConfig::builder()
        .data_dir(data_dir)
        .index_dir(index_dir)
        .similarity_threshold(0.0)
        .top_k(2)
        .build()
        .unwrap()
}

#[tokio::test]
async fn single_record_is_found_at_zero_threshold() {
    let embedder = Arc::new(HashingEmbeddingProvider::default());
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = IndexPipeline::builder()
        .config(RagConfig::default())
        .embedding_provider(embedder.clone())
        .vector_store(store.clone())
        .build()
        .unwrap();

    let record = Record { body: "İstanbul 1453 yılında fethedildi.".into(), ..Record::default() };
    let chunks = pipeline.chunk_records(&[(record, RecordOrigin::default())]);
    assert_eq!(chunks.len(), 1);
    let vectors = pipeline.embed_chunks(&chunks).await.unwrap();
    store.build(embedder.dimensions(), vectors, chunks).await.unwrap();

    let config = RagConfig::builder().similarity_threshold(0.0).build().unwrap();
    let system = RagSystem::new(config, embedder, store, Arc::new(CountingGenerator::default()));
    let results = system.retrieve("İstanbul'un fethi ne zaman oldu?").await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.content, "İstanbul 1453 yılında fethedildi.");
    assert!(results[0].similarity > 0.0);
}

#[tokio::test]
async fn high_threshold_answers_without_calling_the_generator() {
    let temp = tempfile::tempdir().unwrap();
    let data_dir = temp.path().join("raw");
    let index_dir = temp.path().join("index");
    fs::create_dir_all(&data_dir).unwrap();
    write_corpus(&data_dir);

    let embedder = Arc::new(HashingEmbeddingProvider::default());
    IndexPipeline::builder()
        .config(config(&data_dir, &index_dir))
        .embedding_provider(embedder.clone())
        .build()
        .unwrap()
        .build_index()
        .await
        .unwrap();

    let generator = Arc::new(CountingGenerator::default());
    let strict = config(&data_dir, &index_dir).to_builder().similarity_threshold(0.99).build().unwrap();
    let system = RagSystem::open(strict, embedder, generator.clone()).await.unwrap();

    let response = system.query("Osmanlı ekonomisi nasıldı?").await;
    assert_eq!(response.response, NO_INFORMATION_RESPONSE);
    assert_eq!(response.num_sources, 0);
    assert!(response.sources.is_empty());
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn built_index_answers_with_cited_sources() {
    let temp = tempfile::tempdir().unwrap();
    let data_dir = temp.path().join("raw");
    let index_dir = temp.path().join("index");
    fs::create_dir_all(&data_dir).unwrap();
    write_corpus(&data_dir);

    let embedder = Arc::new(HashingEmbeddingProvider::default());
    let report = IndexPipeline::builder()
        .config(config(&data_dir, &index_dir))
        .embedding_provider(embedder.clone())
        .build()
        .unwrap()
        .build_index()
        .await
        .unwrap();

    assert_eq!(report.corpus.files_read, 2);
    assert_eq!(report.corpus.files_skipped, 1);
    assert_eq!(report.corpus.records, 3);
    assert_eq!(report.stats.total_chunks, 3);
    assert_eq!(report.stats.periods, vec!["Cumhuriyet Dönemi", "Osmanlı Devleti"]);
    assert!(index_dir.join("index.bin").is_file());
    assert!(index_dir.join("metadata.json").is_file());
    assert_eq!(CorpusStats::read(&index_dir).await.unwrap(), report.stats);

    let generator = Arc::new(CountingGenerator::default());
    let system =
        RagSystem::open(config(&data_dir, &index_dir), embedder, generator.clone()).await.unwrap();
    let response = system.query("İstanbul hangi yıl fethedildi?").await;

    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    assert!(response.response.starts_with("YANIT["));
    assert_eq!(response.num_sources, response.sources.len());
    assert!(response.num_sources >= 1 && response.num_sources <= 2);
    assert_eq!(response.sources[0].donem, "Osmanlı Devleti");
    assert_eq!(response.sources[0].yil, Some(1453));
    assert_eq!(response.sources[0].kaynak, "Türk Tarih Kurumu");

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["num_sources"], response.num_sources);
}

#[tokio::test]
async fn appending_nothing_changes_nothing() {
    let embedder = Arc::new(HashingEmbeddingProvider::new(32));
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = IndexPipeline::builder()
        .config(RagConfig::default())
        .embedding_provider(embedder.clone())
        .vector_store(store.clone())
        .build()
        .unwrap();

    let record = Record { topic: "Malazgirt".into(), body: "Malazgirt 1071.".into(), ..Record::default() };
    let chunks = pipeline.chunk_records(&[(record, RecordOrigin::default())]);
    let vectors = pipeline.embed_chunks(&chunks).await.unwrap();
    store.build(32, vectors, chunks).await.unwrap();

    let query = embedder.embed_sync("Malazgirt");
    let before = store.search(&query, 5).await.unwrap();

    store.append(Vec::new(), Vec::new()).await.unwrap();
    assert_eq!(pipeline.append_records(&[]).await.unwrap(), 0);
    let blank = Record::default();
    assert_eq!(pipeline.append_records(&[(blank, RecordOrigin::default())]).await.unwrap(), 0);

    assert_eq!(store.len().await.unwrap(), 1);
    assert_eq!(store.search(&query, 5).await.unwrap(), before);
}

#[tokio::test]
async fn appended_records_follow_existing_positions() {
    let temp = tempfile::tempdir().unwrap();
    let data_dir = temp.path().join("raw");
    let index_dir = temp.path().join("index");
    fs::create_dir_all(&data_dir).unwrap();
    write_corpus(&data_dir);

    let embedder = Arc::new(HashingEmbeddingProvider::default());
    let pipeline = IndexPipeline::builder()
        .config(config(&data_dir, &index_dir))
        .embedding_provider(embedder.clone())
        .build()
        .unwrap();
    pipeline.build_index().await.unwrap();

    let extra = Record {
        id: "sel_001".into(),
        era: "Büyük Selçuklu".into(),
        body: "Malazgirt Meydan Muharebesi 1071 yılında yapıldı.".into(),
        year: 1071,
        ..Record::default()
    };
    assert_eq!(pipeline.append_records(&[(extra, RecordOrigin::default())]).await.unwrap(), 1);
    pipeline.persist().await.unwrap();

    let system = RagSystem::open(
        config(&data_dir, &index_dir),
        embedder,
        Arc::new(CountingGenerator::default()),
    )
    .await
    .unwrap();
    assert_eq!(system.stats().await.unwrap().total_vectors, 4);

    let results = system.retrieve("Malazgirt Meydan Muharebesi").await.unwrap();
    assert_eq!(results[0].position, 3);
    assert_eq!(results[0].chunk.metadata.id, "sel_001");
}

#[tokio::test]
async fn hybrid_mode_reports_keyword_and_fused_scores() {
    let temp = tempfile::tempdir().unwrap();
    let data_dir = temp.path().join("raw");
    let index_dir = temp.path().join("index");
    fs::create_dir_all(&data_dir).unwrap();
    write_corpus(&data_dir);

    let embedder = Arc::new(HashingEmbeddingProvider::default());
    IndexPipeline::builder()
        .config(config(&data_dir, &index_dir))
        .embedding_provider(embedder.clone())
        .build()
        .unwrap()
        .build_index()
        .await
        .unwrap();

    let hybrid = config(&data_dir, &index_dir)
        .to_builder()
        .retrieval_mode(RetrievalMode::Hybrid)
        .hybrid_alpha(0.5)
        .build()
        .unwrap();
    let system =
        RagSystem::open(hybrid, embedder, Arc::new(CountingGenerator::default())).await.unwrap();
    let results = system.retrieve("lale devri").await.unwrap();

    assert!(!results.is_empty() && results.len() <= 2);
    assert_eq!(results[0].chunk.metadata.id, "osm_002");
    for result in &results {
        let keyword = result.keyword_score.unwrap();
        let hybrid = result.hybrid_score.unwrap();
        assert!((hybrid - (0.5 * result.similarity + 0.5 * keyword)).abs() < 1e-6);
        if keyword > 0.0 {
            assert!(result.similarity > 0.0, "keyword match {} lost its similarity", result.position);
        }
    }
    for pair in results.windows(2) {
        assert!(pair[0].hybrid_score >= pair[1].hybrid_score);
    }
}

#[tokio::test]
async fn hybrid_mode_applies_the_threshold_to_keyword_matches() {
    let temp = tempfile::tempdir().unwrap();
    let data_dir = temp.path().join("raw");
    let index_dir = temp.path().join("index");
    fs::create_dir_all(&data_dir).unwrap();
    write_corpus(&data_dir);

    let embedder = Arc::new(HashingEmbeddingProvider::default());
    IndexPipeline::builder()
        .config(config(&data_dir, &index_dir))
        .embedding_provider(embedder.clone())
        .build()
        .unwrap()
        .build_index()
        .await
        .unwrap();

    let generator = Arc::new(CountingGenerator::default());
    let strict = config(&data_dir, &index_dir)
        .to_builder()
        .retrieval_mode(RetrievalMode::Hybrid)
        .similarity_threshold(0.99)
        .build()
        .unwrap();
    let system = RagSystem::open(strict, embedder, generator.clone()).await.unwrap();

    assert!(system.retrieve("lale devri ne zaman").await.unwrap().is_empty());
    let response = system.query("lale devri ne zaman").await;
    assert_eq!(response.response, NO_INFORMATION_RESPONSE);
    assert_eq!(response.num_sources, 0);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_or_damaged_index_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    let index_dir = temp.path().join("index");
    let embedder = Arc::new(HashingEmbeddingProvider::default());
    let generator = Arc::new(CountingGenerator::default());
    let cfg = config(temp.path(), &index_dir);

    let err = RagSystem::open(cfg.clone(), embedder.clone(), generator.clone()).await.err().unwrap();
    assert!(matches!(err, RagError::IndexNotFound { .. }));

    fs::create_dir_all(temp.path().join("raw")).unwrap();
    write_corpus(&temp.path().join("raw"));
    let cfg = config(&temp.path().join("raw"), &index_dir);
    IndexPipeline::builder()
        .config(cfg.clone())
        .embedding_provider(embedder.clone())
        .build()
        .unwrap()
        .build_index()
        .await
        .unwrap();
    fs::write(index_dir.join("metadata.json"), "[]").unwrap();

    let err = RagSystem::open(cfg, embedder, generator).await.err().unwrap();
    assert!(matches!(err, RagError::CorruptIndex(_)));
}

#[tokio::test]
async fn query_before_load_is_a_message_not_a_panic() {
    let embedder = Arc::new(HashingEmbeddingProvider::default());
    let generator = Arc::new(CountingGenerator::default());
    let system = RagSystem::new(
        RagConfig::default(),
        embedder,
        Arc::new(InMemoryVectorStore::new()),
        generator.clone(),
    );

    let response = system.query("Kurtuluş Savaşı").await;
    assert!(response.response.contains("Index not loaded"));
    assert_eq!(response.num_sources, 0);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}
