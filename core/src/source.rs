//! Loading documents and stop words from local files.

use crate::tokenizer::{normalize_stop_words, StopWords};
use crate::{Document, IndexError, Result};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn source_err(path: &Path, err: impl std::fmt::Display) -> IndexError {
    IndexError::DocumentSource(format!("{}: {err}", path.display()))
}

/// Load documents from a `.json`/`.jsonl` file or from every such file under a
/// directory (visited in path order).
pub fn load_documents<P: AsRef<Path>>(path: P) -> Result<Vec<Document>> {
    let input_path = path.as_ref();
    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|e| source_err(input_path, e))?;
            let p = entry.path();
            if p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    } else {
        return Err(source_err(input_path, "no such file or directory"));
    }

    let mut documents = Vec::new();
    for file in files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file, &mut documents)?;
        } else {
            read_json(&file, &mut documents)?;
        }
    }
    tracing::info!(path = %input_path.display(), num_docs = documents.len(), "documents loaded");
    Ok(documents)
}

fn read_jsonl(file: &Path, documents: &mut Vec<Document>) -> Result<()> {
    let reader = BufReader::new(File::open(file).map_err(|e| source_err(file, e))?);
    for line in reader.lines() {
        let line = line.map_err(|e| source_err(file, e))?;
        if line.trim().is_empty() { continue; }
        documents.push(serde_json::from_str(&line).map_err(|e| source_err(file, e))?);
    }
    Ok(())
}

/// A JSON file may hold an array of documents, a single document, or an object
/// wrapping the array under `movies` or `documents`.
fn read_json(file: &Path, documents: &mut Vec<Document>) -> Result<()> {
    let reader = BufReader::new(File::open(file).map_err(|e| source_err(file, e))?);
    let json: serde_json::Value = serde_json::from_reader(reader).map_err(|e| source_err(file, e))?;
    let items = match json {
        serde_json::Value::Array(arr) => arr,
        serde_json::Value::Object(mut obj) => {
            match obj.remove("movies").or_else(|| obj.remove("documents")) {
                Some(serde_json::Value::Array(arr)) => arr,
                Some(_) => return Err(source_err(file, "document list must be an array")),
                None => vec![serde_json::Value::Object(obj)],
            }
        }
        _ => return Err(source_err(file, "expected a JSON array or object")),
    };
    for v in items {
        documents.push(serde_json::from_value(v).map_err(|e| source_err(file, e))?);
    }
    Ok(())
}

/// One stop word per line; blank lines are skipped. Entries go through the
/// same punctuation stripping as document text, so "don't" also stops the
/// token "dont" that tokenizing "don't" produces.
pub fn load_stop_words<P: AsRef<Path>>(path: P) -> Result<StopWords> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| source_err(path, e))?;
    Ok(normalize_stop_words(text.lines()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn loads_wrapped_array_and_jsonl_directory() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("a.json"),
            r#"{"movies": [{"id": 1, "title": "Space Adventure", "description": "A crew travels to space."}]}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("b.jsonl"),
            "{\"id\": 2, \"title\": \"Love Story\", \"description\": \"Two people fall in love.\"}\n\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let docs = load_documents(dir.path()).unwrap();
        let ids: Vec<u32> = docs.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn single_object_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("one.json");
        fs::write(&file, r#"{"id": 9, "title": "T", "description": "D"}"#).unwrap();
        assert_eq!(load_documents(&file).unwrap(), vec![Document::new(9, "T", "D")]);
    }

    #[test]
    fn unreadable_source_fails() {
        let dir = tempdir().unwrap();
        assert!(matches!(load_documents(dir.path().join("nope.json")), Err(IndexError::DocumentSource(_))));
        let bad = dir.path().join("bad.json");
        fs::write(&bad, "not json").unwrap();
        assert!(matches!(load_documents(&bad), Err(IndexError::DocumentSource(_))));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_entry_fails() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.json"), r#"[{"id": 1, "title": "T", "description": "D"}]"#).unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.json"), dir.path().join("b.json")).unwrap();
        assert!(matches!(load_documents(dir.path()), Err(IndexError::DocumentSource(_))));
    }

    #[test]
    fn stop_words_match_tokenized_contractions() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("stopwords.txt");
        fs::write(&file, "don't
").unwrap();
        let stops = load_stop_words(&file).unwrap();
        assert_eq!(crate::tokenizer::tokenize("Don't panic", &stops), vec!["panic"]);
    }

    #[test]
    fn stop_words_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("stopwords.txt");
        fs::write(&file, "The\n  a \n\ndon't\n").unwrap();
        let stops = load_stop_words(&file).unwrap();
        assert_eq!(stops.len(), 3);
        assert!(stops.contains("the") && stops.contains("a") && stops.contains("dont"));
    }
}
