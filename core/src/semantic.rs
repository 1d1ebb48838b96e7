//! Chunked semantic search.
//!
//! Each document description is cut into overlapping sentence windows, every
//! window is embedded, and a query is scored against all windows. A document's
//! score is the best score among its own windows.

use crate::chunk::semantic_chunk;
use crate::config::{CHUNK_MAX_SENTENCES, CHUNK_OVERLAP_SENTENCES};
use crate::embed::{cosine_similarity, Embedder, Embedding};
use crate::persist::{read_bincode, write_bincode, IndexPaths};
use crate::{sort_scored, DocId, Document, IndexError, Result, ScoredDoc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Write};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub doc_id: DocId,
    pub chunk_idx: usize,
    pub total_chunks: usize,
}

#[derive(Serialize, Deserialize)]
struct ChunkMetadataFile {
    chunks: Vec<ChunkMetadata>,
    total_chunks: usize,
}

pub struct ChunkedSemanticSearch<E: Embedder> {
    embedder: E,
    documents: BTreeMap<DocId, Document>,
    chunk_embeddings: Vec<Embedding>,
    chunk_metadata: Vec<ChunkMetadata>,
    ready: bool,
    query_cache: Mutex<HashMap<String, Embedding>>,
}

impl<E: Embedder> ChunkedSemanticSearch<E> {
    pub fn new(embedder: E) -> Self {
        Self {
            embedder,
            documents: BTreeMap::new(),
            chunk_embeddings: Vec::new(),
            chunk_metadata: Vec::new(),
            ready: false,
            query_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn embedder(&self) -> &E { &self.embedder }

    pub fn is_ready(&self) -> bool { self.ready }

    pub fn num_chunks(&self) -> usize { self.chunk_metadata.len() }

    pub fn chunk_metadata(&self) -> &[ChunkMetadata] { &self.chunk_metadata }

    pub fn document(&self, doc_id: DocId) -> Option<&Document> { self.documents.get(&doc_id) }

    fn set_documents(&mut self, documents: &[Document]) {
        self.documents = documents.iter().map(|d| (d.id, d.clone())).collect();
    }

    /// Chunk and embed every non-empty description. Returns the chunk count.
    pub fn build_chunk_embeddings(&mut self, documents: &[Document]) -> Result<usize> {
        self.set_documents(documents);

        let mut chunks: Vec<String> = Vec::new();
        let mut metadata: Vec<ChunkMetadata> = Vec::new();
        for doc in documents {
            let description = doc.description.trim();
            if description.is_empty() {
                continue;
            }
            let doc_chunks = semantic_chunk(description, CHUNK_MAX_SENTENCES, CHUNK_OVERLAP_SENTENCES)?;
            let total_chunks = doc_chunks.len();
            metadata.extend((0..total_chunks).map(|chunk_idx| ChunkMetadata { doc_id: doc.id, chunk_idx, total_chunks }));
            chunks.extend(doc_chunks);
        }

        self.chunk_embeddings = self.embedder.embed_batch(&chunks)?;
        self.chunk_metadata = metadata;
        self.ready = true;
        tracing::info!(num_docs = documents.len(), num_chunks = chunks.len(), model = self.embedder.model_name(), "chunk embeddings built");
        Ok(chunks.len())
    }

    pub fn save_chunks(&self, paths: &IndexPaths) -> Result<()> {
        create_dir_all(&paths.root)?;
        write_bincode(&paths.chunk_embeddings(), &self.chunk_embeddings)?;

        let file = ChunkMetadataFile { chunks: self.chunk_metadata.clone(), total_chunks: self.chunk_metadata.len() };
        let mut writer = BufWriter::new(File::create(paths.chunk_metadata())?);
        serde_json::to_writer_pretty(&mut writer, &file)?;
        writer.flush()?;
        Ok(())
    }

    /// Reuse cached chunk embeddings when both cache files exist, agree with
    /// each other and with the embedder dimension, and cover exactly the
    /// documents that have a description. Returns whether the cache was used.
    pub fn load_chunks(&mut self, documents: &[Document], paths: &IndexPaths) -> Result<bool> {
        if !paths.chunk_embeddings().is_file() || !paths.chunk_metadata().is_file() {
            return Ok(false);
        }
        let embeddings: Vec<Embedding> = read_bincode(&paths.chunk_embeddings())?;
        let file: ChunkMetadataFile = serde_json::from_reader(BufReader::new(File::open(paths.chunk_metadata())?))?;

        let dimension = self.embedder.dimension();
        if embeddings.len() != file.chunks.len() || embeddings.iter().any(|e| e.len() != dimension) {
            tracing::warn!(root = %paths.root.display(), "chunk cache is inconsistent, ignoring it");
            return Ok(false);
        }
        let cached: BTreeSet<DocId> = file.chunks.iter().map(|m| m.doc_id).collect();
        let expected: BTreeSet<DocId> =
            documents.iter().filter(|d| !d.description.trim().is_empty()).map(|d| d.id).collect();
        if cached != expected {
            tracing::warn!(root = %paths.root.display(), "chunk cache belongs to another collection, ignoring it");
            return Ok(false);
        }

        self.set_documents(documents);
        self.chunk_embeddings = embeddings;
        self.chunk_metadata = file.chunks;
        self.ready = true;
        tracing::info!(num_chunks = self.chunk_metadata.len(), "chunk embeddings loaded");
        Ok(true)
    }

    pub fn load_or_create(&mut self, documents: &[Document], paths: &IndexPaths) -> Result<()> {
        if self.load_chunks(documents, paths)? {
            return Ok(());
        }
        self.build_chunk_embeddings(documents)?;
        self.save_chunks(paths)
    }

    /// Embed a query, reusing the vector for repeated queries.
    pub fn embed_query(&self, query: &str) -> Result<Embedding> {
        if let Some(hit) = self.query_cache.lock().get(query) {
            return Ok(hit.clone());
        }
        let embedding = self.embedder.embed(query)?;
        self.query_cache.lock().insert(query.to_string(), embedding.clone());
        Ok(embedding)
    }

    /// One entry per document: its best chunk's cosine similarity to `query`,
    /// sorted descending with ties by ascending id.
    pub fn search_chunks(&self, query: &str, limit: usize) -> Result<Vec<ScoredDoc>> {
        if !self.ready {
            return Err(IndexError::IndexNotReady);
        }
        let query_embedding = self.embed_query(query)?;

        let mut best: HashMap<DocId, f64> = HashMap::new();
        for (meta, embedding) in self.chunk_metadata.iter().zip(&self.chunk_embeddings) {
            let score = cosine_similarity(&query_embedding, embedding) as f64;
            best.entry(meta.doc_id).and_modify(|s| *s = s.max(score)).or_insert(score);
        }

        let mut scored: Vec<ScoredDoc> = best.into_iter().map(|(doc_id, score)| ScoredDoc::new(doc_id, score)).collect();
        sort_scored(&mut scored);
        scored.truncate(limit);
        tracing::debug!(query, hits = scored.len(), "chunk search");
        Ok(scored)
    }
}
