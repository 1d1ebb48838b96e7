use anyhow::{Context, Result};
use blend_core::chunk::{fixed_chunk, semantic_chunk};
use blend_core::config::{
    BM25_B, BM25_K1, CHUNK_MAX_SENTENCES, CHUNK_OVERLAP_SENTENCES, DEFAULT_ALPHA, DEFAULT_SEARCH_LIMIT,
    FIXED_CHUNK_WORDS, RRF_K,
};
use blend_core::embed::{Embedder, HashingEmbedder};
use blend_core::fusion::normalize;
use blend_core::hybrid::{HybridResult, HybridSearch};
use blend_core::persist::IndexPaths;
use blend_core::search::LexicalSearch;
use blend_core::semantic::ChunkedSemanticSearch;
use blend_core::source::{load_documents, load_stop_words};
use blend_core::tokenizer::{default_stop_words, StopWords};
use blend_core::{DocId, Document, InvertedIndex};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "blend")]
#[command(about = "Keyword, semantic and hybrid search over a document collection", long_about = None)]
struct Cli {
    /// Document collection: a JSON/JSONL file or a directory of them
    #[arg(long, global = true, env = "BLEND_DATA", default_value = "data/movies.json")]
    data: PathBuf,
    /// Stop-word list, one word per line (built-in English list when omitted)
    #[arg(long, global = true, env = "BLEND_STOPWORDS")]
    stopwords: Option<PathBuf>,
    /// Directory holding the persisted index and chunk embeddings
    #[arg(long, global = true, env = "BLEND_CACHE", default_value = "cache")]
    cache: PathBuf,
    /// Print search results as JSON
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the inverted index and save it to the cache directory
    Build,
    /// List documents containing any query term
    Search {
        query: String,
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },
    /// Rank documents with BM25
    Bm25search {
        query: String,
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },
    /// Term frequency of a single term in a document
    Tf { doc_id: DocId, term: String },
    /// Inverse document frequency of a term
    Idf { term: String },
    /// TF-IDF of a single term in a document
    Tfidf { doc_id: DocId, term: String },
    /// BM25 inverse document frequency of a single term
    Bm25idf { term: String },
    /// BM25 saturated term frequency of a single term in a document
    Bm25tf {
        doc_id: DocId,
        term: String,
        #[arg(long, default_value_t = BM25_K1)]
        k1: f64,
        #[arg(long, default_value_t = BM25_B)]
        b: f64,
    },
    /// Min-max normalize a list of scores
    Normalize {
        #[arg(allow_negative_numbers = true)]
        scores: Vec<f64>,
    },
    /// Hybrid search: weighted sum of normalized BM25 and semantic scores
    WeightedSearch {
        query: String,
        /// Lexical weight in [0, 1]
        #[arg(long, default_value_t = DEFAULT_ALPHA)]
        alpha: f64,
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },
    /// Hybrid search with Reciprocal Rank Fusion
    RrfSearch {
        query: String,
        #[arg(long, default_value_t = RRF_K)]
        k: f64,
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },
    /// Build (or load cached) chunk embeddings
    EmbedChunks,
    /// Rank documents by their best chunk's similarity to the query
    SemanticSearch {
        query: String,
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },
    /// Embed a piece of text and show a summary of the vector
    EmbedText { text: String },
    /// Split text into chunks
    Chunk {
        text: String,
        /// Words per chunk, or sentences per chunk with --sentences
        #[arg(long)]
        chunk_size: Option<usize>,
        /// Shared words (or sentences) between neighbouring chunks
        #[arg(long)]
        overlap: Option<usize>,
        /// Chunk by sentences instead of words
        #[arg(long, default_value_t = false)]
        sentences: bool,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.kind() == ErrorKind::InvalidSubcommand => {
            return print_help();
        }
        Err(e) => e.exit(),
    };

    let Some(command) = cli.command.as_ref() else {
        return print_help();
    };

    match command {
        Commands::Build => build_index(&cli),
        Commands::Search { query, limit } => {
            let index = open_index(&cli)?;
            let docs = LexicalSearch::new(&index).keyword_search(query, *limit)?;
            for (i, doc) in docs.iter().enumerate() {
                println!("{}. ({}) {}", i + 1, doc.id, doc.title);
            }
            Ok(())
        }
        Commands::Bm25search { query, limit } => {
            let index = open_index(&cli)?;
            let hits = LexicalSearch::new(&index).search(query, *limit)?;
            for (i, hit) in hits.iter().enumerate() {
                println!("{}. ({}) {} - score: {:.2}", i + 1, hit.document.id, hit.document.title, hit.score);
            }
            Ok(())
        }
        Commands::Tf { doc_id, term } => {
            let tf = open_index(&cli)?.get_term_frequency(*doc_id, term)?;
            println!("Term frequency of '{term}' in document '{doc_id}': {tf}");
            Ok(())
        }
        Commands::Idf { term } => {
            let idf = open_index(&cli)?.get_idf(term);
            println!("Inverse document frequency of '{term}': {idf:.2}");
            Ok(())
        }
        Commands::Tfidf { doc_id, term } => {
            let tf_idf = open_index(&cli)?.get_tf_idf(*doc_id, term)?;
            println!("TF-IDF score of '{term}' in document '{doc_id}': {tf_idf:.2}");
            Ok(())
        }
        Commands::Bm25idf { term } => {
            let idf = open_index(&cli)?.get_bm25_idf(term)?;
            println!("BM25 IDF score of '{term}': {idf:.2}");
            Ok(())
        }
        Commands::Bm25tf { doc_id, term, k1, b } => {
            let tf = open_index(&cli)?.get_bm25_tf(*doc_id, term, *k1, *b)?;
            println!("BM25 TF score of '{term}' in document '{doc_id}': {tf:.2}");
            Ok(())
        }
        Commands::Normalize { scores } => {
            for score in normalize(scores) {
                println!("* {score:.4}");
            }
            Ok(())
        }
        Commands::WeightedSearch { query, alpha, limit } => {
            let results = open_hybrid(&cli)?.weighted_search(query, *alpha, *limit)?;
            print_hybrid(&cli, &results)
        }
        Commands::RrfSearch { query, k, limit } => {
            let results = open_hybrid(&cli)?.rrf_search(query, *k, *limit)?;
            print_hybrid(&cli, &results)
        }
        Commands::EmbedChunks => {
            let semantic = open_semantic(&cli, &load_collection(&cli)?)?;
            println!("Generated {} chunked embeddings", semantic.num_chunks());
            Ok(())
        }
        Commands::SemanticSearch { query, limit } => {
            let documents = load_collection(&cli)?;
            let semantic = open_semantic(&cli, &documents)?;
            for (i, hit) in semantic.search_chunks(query, *limit)?.iter().enumerate() {
                let title = semantic.document(hit.doc_id).map_or("<unknown>", |d| d.title.as_str());
                println!("{}. ({}) {} (score: {:.4})", i + 1, hit.doc_id, title, hit.score);
            }
            Ok(())
        }
        Commands::EmbedText { text } => {
            let embedder = HashingEmbedder::new(stop_words(&cli)?);
            let embedding = embedder.embed(text)?;
            println!("Text: {text}");
            println!("Model: {}", embedder.model_name());
            println!("First 3 dimensions: {:?}", &embedding[..embedding.len().min(3)]);
            println!("Dimensions: {}", embedding.len());
            Ok(())
        }
        Commands::Chunk { text, chunk_size, overlap, sentences } => {
            let chunks = if *sentences {
                let size = chunk_size.unwrap_or(CHUNK_MAX_SENTENCES);
                semantic_chunk(text, size, sentence_overlap(size, *overlap))?
            } else {
                fixed_chunk(text, chunk_size.unwrap_or(FIXED_CHUNK_WORDS), overlap.unwrap_or(0))?
            };
            println!("Chunking {} characters", text.chars().count());
            for (i, chunk) in chunks.iter().enumerate() {
                println!("{}. {}", i + 1, chunk);
            }
            Ok(())
        }
    }
}

/// Explicit overlap wins; otherwise the default, kept below the window size.
fn sentence_overlap(size: usize, overlap: Option<usize>) -> usize {
    overlap.unwrap_or_else(|| CHUNK_OVERLAP_SENTENCES.min(size.saturating_sub(1)))
}

fn print_help() -> Result<()> {
    Cli::command().print_help()?;
    println!();
    Ok(())
}

fn stop_words(cli: &Cli) -> Result<StopWords> {
    match &cli.stopwords {
        Some(path) => Ok(load_stop_words(path)?),
        None => Ok(default_stop_words()),
    }
}

fn load_collection(cli: &Cli) -> Result<Vec<Document>> {
    load_documents(&cli.data).with_context(|| format!("loading documents from {}", cli.data.display()))
}

fn build_index(cli: &Cli) -> Result<()> {
    let documents = load_collection(cli)?;
    let mut index = InvertedIndex::new(stop_words(cli)?);
    index.build(documents)?;
    index.save(&IndexPaths::new(&cli.cache))?;
    tracing::info!(cache = %cli.cache.display(), num_docs = index.len(), num_terms = index.num_terms(), "index build complete");
    println!("Indexed {} documents ({} terms) into {}", index.len(), index.num_terms(), cli.cache.display());
    Ok(())
}

fn open_index(cli: &Cli) -> Result<InvertedIndex> {
    InvertedIndex::load(&IndexPaths::new(&cli.cache), stop_words(cli)?)
        .with_context(|| format!("loading index from {} (run `blend build` first)", cli.cache.display()))
}

fn open_semantic(cli: &Cli, documents: &[Document]) -> Result<ChunkedSemanticSearch<HashingEmbedder>> {
    let mut semantic = ChunkedSemanticSearch::new(HashingEmbedder::new(stop_words(cli)?));
    semantic.load_or_create(documents, &IndexPaths::new(&cli.cache))?;
    Ok(semantic)
}

fn open_hybrid(cli: &Cli) -> Result<HybridSearch<HashingEmbedder>> {
    let documents = load_collection(cli)?;
    let stops = stop_words(cli)?;
    let embedder = HashingEmbedder::new(stops.clone());
    Ok(HybridSearch::open(documents, &IndexPaths::new(&cli.cache), stops, embedder)?)
}

fn print_hybrid(cli: &Cli, results: &[HybridResult]) -> Result<()> {
    if cli.json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }
    for (i, r) in results.iter().enumerate() {
        println!("{}. {}", i + 1, r.title);
        println!("   Hybrid Score: {:.3}", r.hybrid_score);
        println!("   BM25: {:.3}, Semantic: {:.3}", r.lexical_score, r.semantic_score);
        let preview: String = r.description.chars().take(100).collect();
        println!("   {preview}...");
    }
    Ok(())
}
