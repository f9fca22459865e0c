//! Argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tarih_rag::{RagConfig, RagConfigBuilder, RetrievalMode};

#[derive(Debug, Parser)]
#[command(
    name = "tarih",
    version,
    about = "Türk tarihi bilgi rehberi: kayıtları indeksle, soru sor, kaynaklı yanıt al"
)]
pub struct Cli {
    /// Log output format
    #[arg(long, global = true, value_enum, env = "TARIH_LOG_FORMAT", default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Directory holding the persisted index (overrides INDEX_DIR)
    #[arg(long, global = true)]
    pub index_dir: Option<PathBuf>,

    /// Embedding backend. Queries must use the backend the index was built with.
    #[arg(long, global = true, value_enum, env = "TARIH_EMBEDDER", default_value_t = EmbedderKind::Hashing)]
    pub embedder: EmbedderKind,

    /// Answer generator
    #[arg(long, global = true, value_enum, env = "TARIH_GENERATOR", default_value_t = GeneratorKind::Extractive)]
    pub generator: GeneratorKind,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build the index from the corpus directory
    Build(BuildArgs),
    /// Answer a single question
    Query(QueryArgs),
    /// Ask questions interactively
    Repl(QueryOptions),
    /// Show statistics of the persisted index
    Stats,
}

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Corpus directory (overrides DATA_DIR)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Maximum chunk size in characters (overrides CHUNK_SIZE)
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Overlap between consecutive chunks (overrides CHUNK_OVERLAP)
    #[arg(long)]
    pub chunk_overlap: Option<usize>,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// The question; several words are joined with spaces
    #[arg(required = true, num_args = 1..)]
    pub question: Vec<String>,

    #[command(flatten)]
    pub options: QueryOptions,
}

impl QueryArgs {
    /// The question words joined with single spaces.
    pub fn question(&self) -> String {
        self.question.join(" ")
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct QueryOptions {
    /// Number of chunks to retrieve (overrides TOP_K_RESULTS)
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Minimum similarity (overrides SIMILARITY_THRESHOLD)
    #[arg(long, allow_negative_numbers = true)]
    pub threshold: Option<f32>,

    /// Fuse semantic similarity with keyword overlap
    #[arg(long)]
    pub hybrid: bool,

    /// Semantic weight in hybrid mode (overrides HYBRID_ALPHA)
    #[arg(long)]
    pub alpha: Option<f32>,

    /// Print the response as JSON
    #[arg(long)]
    pub json: bool,
}

impl QueryOptions {
    fn apply(&self, mut builder: RagConfigBuilder) -> RagConfigBuilder {
        if let Some(k) = self.top_k {
            builder = builder.top_k(k);
        }
        if let Some(t) = self.threshold {
            builder = builder.similarity_threshold(t);
        }
        if self.hybrid {
            builder = builder.retrieval_mode(RetrievalMode::Hybrid);
        }
        if let Some(a) = self.alpha {
            builder = builder.hybrid_alpha(a);
        }
        builder
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbedderKind {
    /// Offline character-trigram hashing
    Hashing,
    /// OpenAI-compatible embeddings endpoint (OPENAI_API_KEY)
    Openai,
    /// Gemini embeddings (GOOGLE_API_KEY)
    Gemini,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GeneratorKind {
    /// List the retrieved records without a model
    Extractive,
    /// OpenAI-compatible chat completions (OPENAI_API_KEY)
    Openai,
    /// Gemini generateContent (GOOGLE_API_KEY)
    Gemini,
}

impl Cli {
    /// Apply command-line overrides on top of `base` and validate the result.
    pub fn resolve_config(&self, base: RagConfig) -> tarih_rag::Result<RagConfig> {
        let mut builder = base.to_builder();
        if let Some(dir) = &self.index_dir {
            builder = builder.index_dir(dir.clone());
        }
        builder = match &self.command {
            Command::Build(args) => {
                if let Some(dir) = &args.data_dir {
                    builder = builder.data_dir(dir.clone());
                }
                if let Some(size) = args.chunk_size {
                    builder = builder.chunk_size(size);
                }
                if let Some(overlap) = args.chunk_overlap {
                    builder = builder.chunk_overlap(overlap);
                }
                builder
            }
            Command::Query(args) => args.options.apply(builder),
            Command::Repl(options) => options.apply(builder),
            Command::Stats => builder,
        };
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("tarih").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn query_words_are_joined() {
        let cli = parse(&["query", "İstanbul", "ne", "zaman", "fethedildi?"]);
        match cli.command {
            Command::Query(args) => assert_eq!(args.question(), "İstanbul ne zaman fethedildi?"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn query_without_question_is_rejected() {
        assert!(Cli::try_parse_from(["tarih", "query"]).is_err());
    }

    #[test]
    fn global_flags_are_accepted_after_the_subcommand() {
        let cli = parse(&["stats", "--index-dir", "/tmp/idx", "--log-format", "json"]);
        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.index_dir.as_deref(), Some(std::path::Path::new("/tmp/idx")));
    }

    #[test]
    fn query_overrides_reach_the_config() {
        let cli = parse(&[
            "query", "soru", "--top-k", "3", "--threshold", "0.5", "--hybrid", "--alpha", "0.4",
        ]);
        let config = cli.resolve_config(RagConfig::default()).unwrap();
        assert_eq!(config.top_k, 3);
        assert_eq!(config.similarity_threshold, 0.5);
        assert_eq!(config.retrieval_mode, RetrievalMode::Hybrid);
        assert_eq!(config.hybrid_alpha, 0.4);
    }

    #[test]
    fn build_overrides_reach_the_config() {
        let cli = parse(&["build", "--data-dir", "veri", "--chunk-size", "200", "--chunk-overlap", "20"]);
        let config = cli.resolve_config(RagConfig::default()).unwrap();
        assert_eq!(config.data_dir, std::path::PathBuf::from("veri"));
        assert_eq!(config.chunk_size, 200);
        assert_eq!(config.chunk_overlap, 20);
    }

    #[test]
    fn invalid_overrides_fail_validation() {
        let cli = parse(&["query", "soru", "--alpha", "1.5"]);
        assert!(cli.resolve_config(RagConfig::default()).is_err());
    }

    #[test]
    fn unset_flags_keep_the_base_config() {
        let base = RagConfig::builder().top_k(9).build().unwrap();
        let cli = parse(&["repl"]);
        assert_eq!(cli.resolve_config(base.clone()).unwrap(), base);
    }
}
