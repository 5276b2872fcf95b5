use crate::document::DocId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Occurrences of one term in one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    /// Zero-based token positions, ascending.
    pub positions: Vec<u32>,
}

impl Posting {
    pub fn tf(&self) -> u32 { self.positions.len() as u32 }
}

/// Jump target: the posting at `index` holds `doc_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipEntry {
    pub index: usize,
    pub doc_id: DocId,
}

/// All postings for one term, sorted by doc_id once finalized.
///
/// Skip entries and the maximum term frequency are derived in `finalize` and are not
/// part of the persisted form.
#[derive(Debug, Clone, Default)]
pub struct PostingList {
    postings: Vec<Posting>,
    skips: Vec<SkipEntry>,
    max_tf: u32,
}

impl PartialEq for PostingList {
    fn eq(&self, other: &Self) -> bool { self.postings == other.postings }
}

impl PostingList {
    pub fn from_postings(postings: Vec<Posting>) -> Self {
        Self { postings, skips: Vec::new(), max_tf: 0 }
    }

    pub(crate) fn push(&mut self, posting: Posting) { self.postings.push(posting); }

    pub fn postings(&self) -> &[Posting] { &self.postings }

    pub fn skips(&self) -> &[SkipEntry] { &self.skips }

    pub fn len(&self) -> usize { self.postings.len() }

    pub fn is_empty(&self) -> bool { self.postings.is_empty() }

    pub fn max_tf(&self) -> u32 { self.max_tf }

    pub fn doc_ids(&self) -> impl Iterator<Item = DocId> + '_ { self.postings.iter().map(|p| p.doc_id) }

    /// Sorts by doc_id and rebuilds the skip entries every `interval` postings.
    pub(crate) fn finalize(&mut self, interval: usize) {
        if !self.postings.windows(2).all(|w| w[0].doc_id < w[1].doc_id) {
            self.postings.sort_by_key(|p| p.doc_id);
        }
        let interval = interval.max(1);
        self.skips = self
            .postings
            .iter()
            .enumerate()
            .step_by(interval)
            .skip(1)
            .map(|(index, p)| SkipEntry { index, doc_id: p.doc_id })
            .collect();
        self.max_tf = self.postings.iter().map(Posting::tf).max().unwrap_or(0);
    }

    /// First index at or after `from` whose doc_id is >= `target`, following skip entries
    /// over blocks that end before `target`.
    pub fn seek(&self, from: usize, target: DocId) -> usize {
        let mut pos = from;
        let first = self.skips.partition_point(|s| s.index <= pos);
        for skip in &self.skips[first..] {
            if skip.doc_id > target {
                break;
            }
            pos = skip.index;
        }
        self.scan(pos, target)
    }

    /// Same contract as `seek`, visiting every posting.
    pub fn scan(&self, from: usize, target: DocId) -> usize {
        let mut pos = from;
        while pos < self.postings.len() && self.postings[pos].doc_id < target {
            pos += 1;
        }
        pos
    }

    fn drop_docs(&mut self, dead: &BTreeSet<DocId>) -> bool {
        let before = self.postings.len();
        self.postings.retain(|p| !dead.contains(&p.doc_id));
        before != self.postings.len()
    }
}

/// term -> postings, plus the live document count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvertedIndex {
    terms: HashMap<String, PostingList>,
    doc_count: u32,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    pub(crate) fn from_parts(terms: HashMap<String, PostingList>, doc_count: u32) -> Self {
        Self { terms, doc_count }
    }

    pub fn get(&self, term: &str) -> Option<&PostingList> { self.terms.get(term) }

    pub fn doc_count(&self) -> u32 { self.doc_count }

    pub(crate) fn set_doc_count(&mut self, n: u32) { self.doc_count = n; }

    pub fn vocabulary_size(&self) -> usize { self.terms.len() }

    pub fn total_postings(&self) -> usize { self.terms.values().map(PostingList::len).sum() }

    pub fn terms(&self) -> impl Iterator<Item = (&String, &PostingList)> { self.terms.iter() }

    /// Terms in lexicographic order.
    pub fn sorted_terms(&self) -> Vec<&String> {
        let mut terms: Vec<&String> = self.terms.keys().collect();
        terms.sort();
        terms
    }

    pub(crate) fn append(&mut self, term: String, posting: Posting) {
        self.terms.entry(term).or_default().push(posting);
    }

    pub(crate) fn finalize_all(&mut self, interval: usize) {
        for list in self.terms.values_mut() {
            list.finalize(interval);
        }
    }

    pub(crate) fn finalize_terms<'a>(&mut self, terms: impl IntoIterator<Item = &'a String>, interval: usize) {
        for term in terms {
            if let Some(list) = self.terms.get_mut(term) {
                list.finalize(interval);
            }
        }
    }

    /// Physically removes postings of tombstoned documents and drops emptied terms.
    pub(crate) fn compact(&mut self, dead: &BTreeSet<DocId>, interval: usize) -> usize {
        if dead.is_empty() {
            return 0;
        }
        let mut touched = 0;
        self.terms.retain(|_, list| {
            if list.drop_docs(dead) {
                touched += 1;
                list.finalize(interval);
            }
            !list.is_empty()
        });
        touched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(ids: &[DocId]) -> PostingList {
        let mut l = PostingList::from_postings(ids.iter().map(|&d| Posting { doc_id: d, positions: vec![0] }).collect());
        l.finalize(3);
        l
    }

    #[test]
    fn finalize_sorts_and_places_skips() {
        let l = list(&[9, 1, 4, 7, 2, 8, 3]);
        let ids: Vec<DocId> = l.doc_ids().collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 7, 8, 9]);
        assert_eq!(l.skips(), &[SkipEntry { index: 3, doc_id: 4 }, SkipEntry { index: 6, doc_id: 9 }]);
    }

    #[test]
    fn seek_agrees_with_scan() {
        let l = list(&(0..50).map(|i| i * 3).collect::<Vec<_>>());
        for from in [0usize, 5, 17, 49] {
            for target in [0u32, 1, 14, 15, 75, 146, 147, 200] {
                assert_eq!(l.seek(from, target), l.scan(from, target), "from {from} target {target}");
            }
        }
    }

    #[test]
    fn compact_drops_dead_docs_and_empty_terms() {
        let mut idx = InvertedIndex::new();
        idx.append("a".into(), Posting { doc_id: 0, positions: vec![0] });
        idx.append("a".into(), Posting { doc_id: 1, positions: vec![0, 2] });
        idx.append("b".into(), Posting { doc_id: 1, positions: vec![1] });
        idx.finalize_all(2);
        let dead: BTreeSet<DocId> = [1].into_iter().collect();
        assert_eq!(idx.compact(&dead, 2), 2);
        assert!(idx.get("b").is_none());
        assert_eq!(idx.get("a").unwrap().max_tf(), 1);
    }
}
