//! Query evaluation against a ready index snapshot.
//!
//! The strategy and optimization come from the descriptor. Every combination returns the
//! same documents in the same order; they differ in how many postings they touch and how
//! much accumulator state they hold.

mod daat;
mod taat;

use crate::descriptor::{IndexDescriptor, Optimization, QueryStrategy};
use crate::document::{DocId, DocumentStore};
use crate::index::InvertedIndex;
use crate::query::Query;
use crate::scoring::{Ranked, Scorer};

/// Result of evaluating one query.
#[derive(Debug, Clone, PartialEq)]
pub enum Hits {
    /// Boolean matches in ascending doc id order.
    Unranked(Vec<DocId>),
    /// Best first, at most k.
    Ranked(Vec<Ranked>),
}

impl Hits {
    pub fn len(&self) -> usize {
        match self {
            Hits::Unranked(docs) => docs.len(),
            Hits::Ranked(docs) => docs.len(),
        }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// Borrowed view over one snapshot, configured for a descriptor.
pub struct Searcher<'a> {
    index: &'a InvertedIndex,
    store: &'a DocumentStore,
    descriptor: IndexDescriptor,
    scorer: Scorer,
}

impl<'a> Searcher<'a> {
    pub fn new(index: &'a InvertedIndex, store: &'a DocumentStore, descriptor: IndexDescriptor) -> Self {
        let scorer = Scorer::new(descriptor.representation, index.doc_count());
        Self { index, store, descriptor, scorer }
    }

    fn live(&self, doc: DocId) -> bool { !self.store.is_tombstoned(doc) }

    /// Skip entries are followed by DAAT cursors when the optimization relies on jumping ahead.
    fn use_skips(&self) -> bool {
        matches!(self.descriptor.optimization, Optimization::SkipPointers | Optimization::EarlyStopping)
    }

    pub fn search(&self, query: &Query, k: usize) -> Hits {
        let strategy = self.descriptor.strategy;
        if !self.descriptor.representation.is_ranked() {
            return Hits::Unranked(match strategy {
                QueryStrategy::TermAtATime => taat::matches(self, query),
                QueryStrategy::DocumentAtATime => daat::matches(self, query),
            });
        }
        let pruned = match (self.descriptor.optimization, query.disjunctive_terms()) {
            (Optimization::Thresholding, Some(terms)) => Some(match strategy {
                QueryStrategy::TermAtATime => taat::top_k_thresholded(self, &terms, k),
                QueryStrategy::DocumentAtATime => daat::top_k_thresholded(self, &terms, k),
            }),
            (Optimization::EarlyStopping, Some(terms)) => Some(daat::top_k_max_score(self, &terms, k)),
            _ => None,
        };
        if let Some(hits) = pruned {
            return Hits::Ranked(hits);
        }
        tracing::trace!(optimization = ?self.descriptor.optimization, "exhaustive ranked evaluation");
        Hits::Ranked(match strategy {
            QueryStrategy::TermAtATime => taat::ranked(self, query, k),
            QueryStrategy::DocumentAtATime => daat::ranked(self, query, k),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build, CancellationToken};
    use crate::config::{DefaultOperator, EngineConfig};
    use crate::descriptor::{Compression, Representation, Storage};
    use crate::document::Document;
    use crate::query::parse;
    use crate::tokenizer::SimpleTokenizer;

    fn corpus() -> (InvertedIndex, DocumentStore) {
        let words = ["apple", "banana", "cherry", "date", "elder", "fig", "grape"];
        let docs = (0..120u32).map(|i| {
            let mut text = Vec::new();
            for (w, word) in words.iter().enumerate() {
                let reps = (i as usize * (w + 3) + w) % (w + 4);
                for _ in 0..reps {
                    text.push(*word);
                }
            }
            Document::new(format!("doc{i}"), text.join(" "))
        });
        let cfg = EngineConfig { skip_interval: 4, ..EngineConfig::default() };
        let (index, store, _) = build(docs, &SimpleTokenizer, &cfg, &CancellationToken::new()).unwrap();
        (index, store)
    }

    fn run(index: &InvertedIndex, store: &DocumentStore, d: IndexDescriptor, q: &str, k: usize) -> Hits {
        let query = parse(q, &SimpleTokenizer, DefaultOperator::Or).unwrap().unwrap();
        Searcher::new(index, store, d).search(&query, k)
    }

    fn variant(r: Representation, q: QueryStrategy, o: Optimization) -> IndexDescriptor {
        IndexDescriptor::new(r, Storage::CustomInMemory, Compression::None, q, o).unwrap()
    }

    #[test]
    fn every_variant_agrees_with_baseline() {
        let (index, store) = corpus();
        let queries = ["apple", "banana cherry", "fig OR grape OR date", "apple AND fig", "(banana OR elder) AND NOT grape"];
        for r in Representation::ALL {
            let baseline = variant(r, QueryStrategy::TermAtATime, Optimization::None);
            for q in queries {
                let expected = run(&index, &store, baseline, q, 10);
                assert!(!expected.is_empty(), "{q}");
                for d in IndexDescriptor::all()
                    .into_iter()
                    .filter(|d| d.representation == r && d.storage == Storage::CustomInMemory)
                    .filter(|d| d.compression == Compression::None)
                {
                    let got = run(&index, &store, d, q, 10);
                    assert_eq!(expected, got, "{} on {q}", d.short_id());
                }
            }
        }
    }

    #[test]
    fn unknown_terms_contribute_nothing() {
        let (index, store) = corpus();
        let d = variant(Representation::Boolean, QueryStrategy::DocumentAtATime, Optimization::SkipPointers);
        assert!(run(&index, &store, d, "kiwi", 10).is_empty());
        assert!(run(&index, &store, d, "kiwi AND apple", 10).is_empty());
        let with = run(&index, &store, d, "kiwi OR apple", 10);
        assert_eq!(with, run(&index, &store, d, "apple", 10));
    }
}
