use blend_core::persist::{IndexPaths, ARTIFACTS};
use blend_core::tokenizer::default_stop_words;
use blend_core::{Document, IndexError, InvertedIndex};
use std::fs;
use tempfile::tempdir;

fn sample_docs() -> Vec<Document> {
    vec![
        Document::new(1, "Space Adventure", "A crew travels to space."),
        Document::new(2, "Love Story", "Two people fall in love."),
        Document::new(3, "Space Love", "A space crew falls in love."),
        Document::new(4, "Deep Ocean", "Divers explore the deep ocean and find a crew of whales."),
    ]
}

fn built_index() -> InvertedIndex {
    let mut index = InvertedIndex::new(default_stop_words());
    index.build(sample_docs()).unwrap();
    index
}

#[test]
fn save_then_load_reproduces_queries() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path().join("cache"));
    let original = built_index();
    original.save(&paths).unwrap();

    let loaded = InvertedIndex::load(&paths, default_stop_words()).unwrap();
    assert!(loaded.is_ready());
    assert_eq!(loaded.len(), original.len());

    for term in ["space", "love", "crew", "ocean", "unicorn"] {
        let a: Vec<u32> = original.get_documents(term).iter().map(|d| d.id).collect();
        let b: Vec<u32> = loaded.get_documents(term).iter().map(|d| d.id).collect();
        assert_eq!(a, b, "posting mismatch for {term}");
        for doc in original.documents() {
            assert_eq!(
                original.get_term_frequency(doc.id, term).unwrap(),
                loaded.get_term_frequency(doc.id, term).unwrap()
            );
        }
    }
    for query in ["space", "love crew", "deep ocean whales", "nothing matches"] {
        assert_eq!(original.bm25_search(query, 10).unwrap(), loaded.bm25_search(query, 10).unwrap());
    }
}

#[test]
fn load_fails_naming_each_missing_artifact() {
    for name in ARTIFACTS {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        built_index().save(&paths).unwrap();
        fs::remove_file(paths.artifact(name)).unwrap();

        match InvertedIndex::load(&paths, default_stop_words()) {
            Err(IndexError::MissingIndexArtifact { missing }) => assert_eq!(missing, vec![name.to_string()]),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("load succeeded without {name}"),
        }
    }
}

#[test]
fn load_from_empty_directory_lists_everything() {
    let dir = tempdir().unwrap();
    let err = InvertedIndex::load(&IndexPaths::new(dir.path()), default_stop_words()).err().unwrap();
    match err {
        IndexError::MissingIndexArtifact { missing } => assert_eq!(missing.len(), ARTIFACTS.len()),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn corrupt_artifact_is_an_error() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    built_index().save(&paths).unwrap();
    fs::write(paths.artifact("docmap"), b"garbage").unwrap();
    assert!(InvertedIndex::load(&paths, default_stop_words()).is_err());
}

#[test]
fn resave_overwrites_previous_build() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    built_index().save(&paths).unwrap();

    let mut smaller = InvertedIndex::new(default_stop_words());
    smaller.build(vec![Document::new(10, "Solo", "Only one document.")]).unwrap();
    smaller.save(&paths).unwrap();

    let loaded = InvertedIndex::load(&paths, default_stop_words()).unwrap();
    assert_eq!(loaded.len(), 1);
    assert!(loaded.get_documents("space").is_empty());
}

#[test]
fn failed_staging_keeps_previous_build() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    built_index().save(&paths).unwrap();

    // a directory squatting on the last staging path makes that write fail
    fs::create_dir(dir.path().join("docmap.bin.tmp")).unwrap();
    let mut smaller = InvertedIndex::new(default_stop_words());
    smaller.build(vec![Document::new(7, "Ocean", "Deep water.")]).unwrap();
    assert!(smaller.save(&paths).is_err());

    for name in ["postings", "term_frequencies", "doc_lengths"] {
        assert!(!dir.path().join(format!("{name}.bin.tmp")).exists(), "{name} staging left behind");
    }
    let loaded = InvertedIndex::load(&paths, default_stop_words()).unwrap();
    assert_eq!(loaded.len(), sample_docs().len());
}
