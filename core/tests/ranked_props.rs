use proptest::prelude::*;
use selfindex::{
    Compression, Document, EngineConfig, IndexDescriptor, Optimization, QueryStrategy, Representation, SearchEngine,
    SearchHit, SimpleTokenizer, Storage,
};

const WORDS: [&str; 5] = ["kestrel", "lupin", "moss", "nettle", "osprey"];

fn build(representation: Representation, strategy: QueryStrategy, optimization: Optimization, docs: &[Vec<usize>]) -> SearchEngine {
    let d = IndexDescriptor::new(representation, Storage::CustomInMemory, Compression::None, strategy, optimization).unwrap();
    let config = EngineConfig { skip_interval: 2, ..EngineConfig::default() };
    let e = SearchEngine::new(d, config, Box::new(SimpleTokenizer));
    e.build(docs.iter().enumerate().map(|(i, words)| {
        let text: Vec<&str> = words.iter().map(|w| WORDS[*w]).collect();
        Document::new(format!("r{i}"), text.join(" "))
    }))
    .unwrap();
    e
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn pruned_evaluation_matches_exhaustive(
        docs in prop::collection::vec(prop::collection::vec(0..WORDS.len(), 1..12), 1..60),
        terms in prop::collection::btree_set(0..WORDS.len(), 1..4),
        k in 1usize..8,
    ) {
        let query: Vec<&str> = terms.iter().map(|t| WORDS[*t]).collect();
        let query = query.join(" OR ");
        for representation in [Representation::WordCount, Representation::TfIdf] {
            let baseline: Vec<SearchHit> =
                build(representation, QueryStrategy::TermAtATime, Optimization::None, &docs).query_top_k(&query, k).unwrap();
            for (strategy, optimization) in [
                (QueryStrategy::TermAtATime, Optimization::Thresholding),
                (QueryStrategy::DocumentAtATime, Optimization::None),
                (QueryStrategy::DocumentAtATime, Optimization::SkipPointers),
                (QueryStrategy::DocumentAtATime, Optimization::Thresholding),
                (QueryStrategy::DocumentAtATime, Optimization::EarlyStopping),
            ] {
                let got = build(representation, strategy, optimization, &docs).query_top_k(&query, k).unwrap();
                prop_assert_eq!(&got, &baseline, "{:?} {:?} {:?}", representation, strategy, optimization);
            }
        }
    }
}
