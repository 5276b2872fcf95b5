//! Term-at-a-time: one posting list at a time folded into an accumulator.

use super::Searcher;
use crate::document::DocId;
use crate::index::PostingList;
use crate::query::Query;
use crate::scoring::{cannot_beat, Ranked, Score, TopK};
use std::collections::{HashMap, HashSet};

fn postings_of<'a>(s: &Searcher<'a>, term: &str) -> Option<&'a PostingList> { s.index.get(term) }

/// Doc ids matching `query`, tombstones included.
fn match_set(s: &Searcher<'_>, query: &Query) -> HashSet<DocId> {
    match query {
        Query::Term(t) => postings_of(s, t).map(|l| l.doc_ids().collect()).unwrap_or_default(),
        Query::Or(children) => {
            let mut acc = HashSet::new();
            for c in children {
                acc.extend(match_set(s, c));
            }
            acc
        }
        Query::And(children) => {
            let (negated, required): (Vec<&Query>, Vec<&Query>) =
                children.iter().partition(|c| matches!(c, Query::Not(_)));
            let mut counts: HashMap<DocId, usize> = HashMap::new();
            for (i, c) in required.iter().enumerate() {
                for doc in match_set(s, c) {
                    // Only documents that matched every earlier operand can still qualify.
                    if let Some(n) = counts.get_mut(&doc) {
                        *n += 1;
                    } else if i == 0 {
                        counts.insert(doc, 1);
                    }
                }
            }
            let mut acc: HashSet<DocId> =
                counts.into_iter().filter(|(_, n)| *n == required.len()).map(|(d, _)| d).collect();
            for n in negated {
                if let Query::Not(inner) = n {
                    for doc in match_set(s, inner) {
                        acc.remove(&doc);
                    }
                }
            }
            acc
        }
        // Rejected by the parser outside a conjunction.
        Query::Not(_) => HashSet::new(),
    }
}

pub(super) fn matches(s: &Searcher<'_>, query: &Query) -> Vec<DocId> {
    let mut docs: Vec<DocId> = match_set(s, query).into_iter().filter(|d| s.live(*d)).collect();
    docs.sort_unstable();
    docs
}

pub(super) fn ranked(s: &Searcher<'_>, query: &Query, k: usize) -> Vec<Ranked> {
    let matched = match_set(s, query);
    let mut scores: HashMap<DocId, Score> = HashMap::with_capacity(matched.len());
    for term in query.positive_terms() {
        let Some(list) = postings_of(s, term) else { continue };
        let df = list.len();
        for p in list.postings() {
            if matched.contains(&p.doc_id) && s.live(p.doc_id) {
                *scores.entry(p.doc_id).or_insert(0) += s.scorer.weight(p.tf(), df);
            }
        }
    }
    let mut top = TopK::new(k);
    for (doc, score) in scores {
        top.offer(doc, score);
    }
    top.into_sorted()
}

/// k-th best accumulated score, if at least k candidates exist.
fn kth_best(acc: &HashMap<DocId, Score>, k: usize) -> Option<Score> {
    if k == 0 || acc.len() < k {
        return None;
    }
    let mut scores: Vec<Score> = acc.values().copied().collect();
    let (_, kth, _) = scores.select_nth_unstable_by(k - 1, |a, b| b.cmp(a));
    Some(*kth)
}

/// Ranked disjunction with bounded accumulators.
///
/// Terms are visited in decreasing upper-bound order. Once the bound of all remaining
/// terms falls below the k-th best partial score, unseen documents are no longer admitted
/// and candidates that can no longer reach the threshold are dropped.
pub(super) fn top_k_thresholded(s: &Searcher<'_>, terms: &[&str], k: usize) -> Vec<Ranked> {
    let mut lists: Vec<(&PostingList, Score)> =
        terms.iter().filter_map(|t| postings_of(s, t)).map(|l| (l, s.scorer.upper_bound(l))).collect();
    lists.sort_by(|a, b| b.1.cmp(&a.1));

    let mut remaining = vec![0; lists.len() + 1];
    for i in (0..lists.len()).rev() {
        remaining[i] = remaining[i + 1] + lists[i].1;
    }

    let mut acc: HashMap<DocId, Score> = HashMap::new();
    for (i, (list, _)) in lists.iter().enumerate() {
        let admit = !cannot_beat(remaining[i], kth_best(&acc, k));
        let df = list.len();
        for p in list.postings() {
            if !s.live(p.doc_id) {
                continue;
            }
            let w = s.scorer.weight(p.tf(), df);
            if let Some(score) = acc.get_mut(&p.doc_id) {
                *score += w;
            } else if admit {
                acc.insert(p.doc_id, w);
            }
        }
        if !admit {
            let threshold = kth_best(&acc, k);
            let rest = remaining[i + 1];
            acc.retain(|_, score| !cannot_beat(*score + rest, threshold));
        }
    }
    tracing::trace!(candidates = acc.len(), "thresholded accumulators");

    let mut top = TopK::new(k);
    for (doc, score) in acc {
        top.offer(doc, score);
    }
    top.into_sorted()
}
