use blend_core::tokenizer::{default_stop_words, tokenize};
use blend_core::{Document, InvertedIndex};
use criterion::{criterion_group, criterion_main, Criterion};

fn readme_documents() -> Vec<Document> {
    include_str!("../README.md")
        .split("\n\n")
        .enumerate()
        .map(|(i, para)| Document::new(i as u32, format!("section {i}"), para))
        .collect()
}

fn bench_tokenize(c: &mut Criterion) {
    let text = include_str!("../README.md");
    let stops = default_stop_words();
    c.bench_function("tokenize_readme", |b| b.iter(|| tokenize(text, &stops)));
}

fn bench_bm25(c: &mut Criterion) {
    let mut index = InvertedIndex::new(default_stop_words());
    index.build(readme_documents()).expect("unique ids");
    c.bench_function("bm25_search_readme", |b| b.iter(|| index.bm25_search("inverted index fusion", 10)));
}

criterion_group!(benches, bench_tokenize, bench_bm25);
criterion_main!(benches);
