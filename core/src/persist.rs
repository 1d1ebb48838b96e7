//! On-disk layout of a built index: four bincode artifacts that are only
//! meaningful together.

use crate::config::FORMAT_VERSION;
use crate::tokenizer::StopWords;
use crate::{DocId, Document, IndexError, InvertedIndex, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::{self, create_dir_all, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const POSTINGS: &str = "postings";
pub const TERM_FREQUENCIES: &str = "term_frequencies";
pub const DOC_LENGTHS: &str = "doc_lengths";
pub const DOCMAP: &str = "docmap";

/// Every artifact `load_index` requires, in save order.
pub const ARTIFACTS: [&str; 4] = [POSTINGS, TERM_FREQUENCIES, DOC_LENGTHS, DOCMAP];

#[derive(Debug, Serialize, Deserialize)]
struct Artifact<T> {
    version: u32,
    payload: T,
}

#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    pub fn artifact(&self, name: &str) -> PathBuf { self.root.join(format!("{name}.bin")) }
    fn staging(&self, name: &str) -> PathBuf { self.root.join(format!("{name}.bin.tmp")) }
    pub fn chunk_embeddings(&self) -> PathBuf { self.root.join("chunk_embeddings.bin") }
    pub fn chunk_metadata(&self) -> PathBuf { self.root.join("chunk_metadata.json") }
}

/// Names of required artifacts absent under `paths.root`.
pub fn missing_artifacts(paths: &IndexPaths) -> Vec<String> {
    ARTIFACTS
        .iter()
        .filter(|name| !paths.artifact(name).is_file())
        .map(|name| name.to_string())
        .collect()
}

pub(crate) fn write_bincode<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

pub(crate) fn read_bincode<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(reader)?)
}

fn stage_artifact<T: Serialize>(paths: &IndexPaths, name: &str, payload: &T) -> Result<()> {
    write_bincode(&paths.staging(name), &Artifact { version: FORMAT_VERSION, payload })
}

fn load_artifact<T: DeserializeOwned>(paths: &IndexPaths, name: &str) -> Result<T> {
    let artifact: Artifact<T> = read_bincode(&paths.artifact(name))?;
    if artifact.version != FORMAT_VERSION {
        return Err(IndexError::IncompatibleVersion {
            artifact: name.to_string(),
            found: artifact.version,
            expected: FORMAT_VERSION,
        });
    }
    Ok(artifact.payload)
}

/// Write all four structures to staging files, then move them into place. A
/// failure while staging leaves the previous artifacts untouched; the renames
/// are individually atomic but not as a group.
pub fn save_index(paths: &IndexPaths, index: &InvertedIndex) -> Result<()> {
    create_dir_all(&paths.root)?;

    let staged = (|| -> Result<()> {
        stage_artifact(paths, POSTINGS, &index.postings)?;
        stage_artifact(paths, TERM_FREQUENCIES, &index.term_frequencies)?;
        stage_artifact(paths, DOC_LENGTHS, &index.doc_lengths)?;
        stage_artifact(paths, DOCMAP, &index.docmap)?;
        Ok(())
    })();
    if let Err(err) = staged {
        for name in ARTIFACTS {
            let _ = fs::remove_file(paths.staging(name));
        }
        return Err(err);
    }

    for name in ARTIFACTS {
        fs::rename(paths.staging(name), paths.artifact(name))?;
    }
    tracing::info!(root = %paths.root.display(), num_docs = index.len(), "index saved");
    Ok(())
}

/// Restore an index. Fails with [`IndexError::MissingIndexArtifact`] naming
/// every absent artifact before anything is read.
pub fn load_index(paths: &IndexPaths, stop_words: StopWords) -> Result<InvertedIndex> {
    let missing = missing_artifacts(paths);
    if !missing.is_empty() {
        return Err(IndexError::MissingIndexArtifact { missing });
    }

    let postings: BTreeMap<String, BTreeSet<DocId>> = load_artifact(paths, POSTINGS)?;
    let term_frequencies: HashMap<DocId, HashMap<String, u32>> = load_artifact(paths, TERM_FREQUENCIES)?;
    let doc_lengths: HashMap<DocId, u32> = load_artifact(paths, DOC_LENGTHS)?;
    let docmap: BTreeMap<DocId, Document> = load_artifact(paths, DOCMAP)?;

    tracing::info!(root = %paths.root.display(), num_docs = docmap.len(), num_terms = postings.len(), "index loaded");
    Ok(InvertedIndex::from_parts(postings, term_frequencies, doc_lengths, docmap, stop_words))
}
