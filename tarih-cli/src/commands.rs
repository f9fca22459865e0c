//! Command bodies shared by the binary and the REPL.

use std::sync::Arc;

use anyhow::{Context, Result};
use tarih_rag::{
    BuildReport, CorpusStats, EmbeddingProvider, InMemoryVectorStore, IndexPipeline,
    QueryResponse, RagConfig, RagSystem, TextGenerator, VectorStore,
};
use tracing::{debug, warn};

/// Run the indexing pipeline over `config.data_dir`.
pub async fn build(config: &RagConfig, embedder: Arc<dyn EmbeddingProvider>) -> Result<BuildReport> {
    let pipeline = IndexPipeline::builder()
        .config(config.clone())
        .embedding_provider(embedder)
        .build()?;
    pipeline
        .build_index()
        .await
        .with_context(|| format!("failed to build the index from {}", config.data_dir.display()))
}

/// Human-readable summary of a finished build, with per-era chunk counts.
pub fn render_build_report(report: &BuildReport, config: &RagConfig) -> String {
    let corpus = &report.corpus;
    let stats = &report.stats;
    let mut out = format!(
        "İndeks oluşturuldu: {}\n  dosya: {} okundu, {} atlandı\n  kayıt: {} okundu, {} atlandı\n  parça: {} (boyut {}, model {})\n",
        config.index_dir.display(),
        corpus.files_read,
        corpus.files_skipped,
        corpus.records,
        corpus.records_skipped,
        stats.total_chunks,
        stats.dimension,
        stats.model_name,
    );
    for (period, count) in &stats.chunks_per_period {
        out.push_str(&format!("  {period}: {count}\n"));
    }
    out
}

/// Load the persisted index into a ready-to-query system.
pub async fn open_system(
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn TextGenerator>,
) -> Result<RagSystem> {
    warn_on_embedder_mismatch(&config, embedder.name()).await;
    let index_dir = config.index_dir.clone();
    RagSystem::open(config, embedder, generator).await.with_context(|| {
        format!("no usable index in {}; run `tarih build` first", index_dir.display())
    })
}

async fn warn_on_embedder_mismatch(config: &RagConfig, embedder: &str) {
    match CorpusStats::read(&config.index_dir).await {
        Ok(stats) if stats.model_name != embedder => warn!(
            built_with = %stats.model_name,
            querying_with = embedder,
            "index was built with a different embedder; similarities will be meaningless"
        ),
        Ok(_) => {}
        Err(e) => debug!(error = %e, "stats.json unavailable, skipping embedder check"),
    }
}

/// Human-readable answer followed by its citations.
pub fn render_response(response: &QueryResponse) -> String {
    let mut out = response.response.clone();
    if !response.sources.is_empty() {
        out.push_str("\n\nKaynaklar:");
        for (i, source) in response.sources.iter().enumerate() {
            let year = source.yil.map(|y| format!(", {y}")).unwrap_or_default();
            out.push_str(&format!(
                "\n  {}. {}{} - {} (benzerlik {:.3})",
                i + 1,
                source.donem,
                year,
                source.kaynak,
                source.similarity
            ));
        }
    }
    out
}

/// The response as pretty JSON when `json` is set, otherwise as
/// [`render_response`] text.
pub fn format_response(response: &QueryResponse, json: bool) -> Result<String> {
    if json {
        Ok(serde_json::to_string_pretty(response)?)
    } else {
        Ok(render_response(response))
    }
}

/// Index and corpus statistics of `config.index_dir`.
pub async fn stats(config: &RagConfig) -> Result<String> {
    let store = InMemoryVectorStore::new();
    store
        .load(&config.index_dir)
        .await
        .with_context(|| format!("failed to load the index from {}", config.index_dir.display()))?;
    let index = store.stats().await?;

    let mut out = format!(
        "İndeks: {}\n  tür: {}\n  vektör: {}\n  boyut: {}\n  metadata: {}\n",
        config.index_dir.display(),
        index.index_type,
        index.total_vectors,
        index.dimension,
        index.metadata_count,
    );
    match CorpusStats::read(&config.index_dir).await {
        Ok(corpus) => {
            out.push_str(&format!(
                "  model: {}\n  kaynak: {}\n  dönemler: {}\n",
                corpus.model_name,
                corpus.data_source,
                corpus.periods.join(", ")
            ));
        }
        Err(e) => debug!(error = %e, "stats.json unavailable"),
    }
    Ok(out)
}
