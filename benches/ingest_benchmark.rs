use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use framedex::{Config, FieldType, IndexConfig, IndexWriter, Schema};
use rand::Rng;
use tempfile::TempDir;

const WORDS: [&str; 12] = [
    "alice", "rabbit", "hatter", "queen", "tea", "party", "garden", "croquet", "cat", "grin", "hole", "door",
];

/// Helper to create random document text
fn random_text(words: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..words)
        .map(|_| WORDS[rng.gen_range(0..WORDS.len())])
        .collect::<Vec<_>>()
        .join(" ")
}

fn writer(dir: &TempDir) -> IndexWriter {
    let schema = Schema::new()
        .field("text", FieldType::text())
        .field("score", FieldType::numeric());
    let config = Config { sync_on_commit: false, ..Config::default() };
    IndexWriter::with_config(dir.path(), Some(IndexConfig::new(schema)), config).unwrap()
}

/// Benchmark framing a single document inside an open transaction
fn bench_add_document(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let mut writer = writer(&dir);
    writer.begin(None).unwrap();
    let text = random_text(200);

    c.bench_function("add_document_200_words", |b| {
        b.iter(|| writer.add_document(Some(10), [("text", black_box(text.as_str()))]).unwrap());
    });
    writer.rollback().unwrap();
}

/// Benchmark committing batches of documents
fn bench_commit_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit_batch");

    for batch_size in [10, 100, 500] {
        let texts: Vec<String> = (0..batch_size).map(|_| random_text(100)).collect();
        group.bench_with_input(BenchmarkId::from_parameter(batch_size), &texts, |b, texts| {
            let dir = TempDir::new().unwrap();
            let mut writer = writer(&dir);
            b.iter(|| {
                writer
                    .transaction(None, |w| {
                        for text in texts {
                            w.add_document(Some(5), [("text", text.as_str())])?;
                        }
                        Ok(())
                    })
                    .unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_add_document, bench_commit_batch);
criterion_main!(benches);
