use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use selfindex::tokenizer::tokenize;
use selfindex::{
    Compression, Document, EngineConfig, IndexDescriptor, Optimization, QueryStrategy, Representation, SearchEngine,
    SimpleTokenizer, Storage,
};

const VOCAB: [&str; 12] = [
    "river", "stone", "lantern", "harbor", "meadow", "copper", "falcon", "orchard", "glacier", "summit", "willow",
    "ember",
];

fn corpus(n: usize) -> Vec<Document> {
    (0..n)
        .map(|i| {
            let words: Vec<&str> = (0..24).map(|j| VOCAB[(i * 7 + j * j + i / 3) % VOCAB.len()]).collect();
            Document::new(format!("doc{i}"), words.join(" "))
        })
        .collect()
}

fn bench_tokenize(c: &mut Criterion) {
    let text = "The Running runners ran past the harbour lanterns, glowing over quiet meadows. ".repeat(64);
    c.bench_function("tokenize_paragraphs", |b| b.iter(|| tokenize(&text)));
}

fn bench_strategies(c: &mut Criterion) {
    let docs = corpus(5_000);
    let mut group = c.benchmark_group("ranked_query");
    for (strategy, optimization) in [
        (QueryStrategy::TermAtATime, Optimization::None),
        (QueryStrategy::TermAtATime, Optimization::Thresholding),
        (QueryStrategy::DocumentAtATime, Optimization::None),
        (QueryStrategy::DocumentAtATime, Optimization::Thresholding),
        (QueryStrategy::DocumentAtATime, Optimization::EarlyStopping),
    ] {
        let d = IndexDescriptor::new(Representation::TfIdf, Storage::CustomInMemory, Compression::None, strategy, optimization)
            .expect("valid variant");
        let engine = SearchEngine::new(d, EngineConfig::default(), Box::new(SimpleTokenizer));
        engine.build(docs.clone()).expect("build");
        group.bench_with_input(BenchmarkId::from_parameter(d.short_id()), &engine, |b, e| {
            b.iter(|| e.query_top_k("river OR falcon OR glacier OR ember", 10))
        });
    }
    group.finish();

    let d = IndexDescriptor::new(
        Representation::Boolean,
        Storage::CustomInMemory,
        Compression::None,
        QueryStrategy::DocumentAtATime,
        Optimization::SkipPointers,
    )
    .expect("valid variant");
    let engine = SearchEngine::new(d, EngineConfig::default(), Box::new(SimpleTokenizer));
    engine.build(docs).expect("build");
    c.bench_function("boolean_and_skip_pointers", |b| b.iter(|| engine.query("river AND summit AND willow")));
}

criterion_group!(benches, bench_tokenize, bench_strategies);
criterion_main!(benches);
