//! Document-at-a-time: all operand cursors advance together in doc id order.

use super::Searcher;
use crate::document::DocId;
use crate::index::PostingList;
use crate::query::Query;
use crate::scoring::{cannot_beat, Ranked, Score, TopK};

/// Forward-only position over a sorted stream of doc ids.
pub(super) trait DocCursor {
    /// Current document, `None` once exhausted.
    fn doc(&self) -> Option<DocId>;

    /// Moves past the current document.
    fn next(&mut self);

    /// Moves to the first document >= `target`. Never moves backwards.
    fn advance(&mut self, target: DocId);
}

struct TermCursor<'a> {
    list: &'a PostingList,
    pos: usize,
    skips: bool,
    upper_bound: Score,
}

impl<'a> TermCursor<'a> {
    fn new(list: &'a PostingList, skips: bool) -> Self { Self { list, pos: 0, skips, upper_bound: 0 } }

    fn weight(&self, s: &Searcher<'_>) -> Score {
        self.list.postings().get(self.pos).map(|p| s.scorer.weight(p.tf(), self.list.len())).unwrap_or(0)
    }
}

impl DocCursor for TermCursor<'_> {
    fn doc(&self) -> Option<DocId> { self.list.postings().get(self.pos).map(|p| p.doc_id) }

    fn next(&mut self) { self.pos = (self.pos + 1).min(self.list.len()); }

    fn advance(&mut self, target: DocId) {
        if self.doc().is_some_and(|d| d < target) {
            self.pos = if self.skips { self.list.seek(self.pos, target) } else { self.list.scan(self.pos, target) };
        }
    }
}

struct EmptyCursor;

impl DocCursor for EmptyCursor {
    fn doc(&self) -> Option<DocId> { None }
    fn next(&mut self) {}
    fn advance(&mut self, _target: DocId) {}
}

struct OrCursor<'a> {
    children: Vec<Box<dyn DocCursor + 'a>>,
    current: Option<DocId>,
}

impl<'a> OrCursor<'a> {
    fn new(children: Vec<Box<dyn DocCursor + 'a>>) -> Self {
        let mut c = Self { children, current: None };
        c.settle();
        c
    }

    fn settle(&mut self) { self.current = self.children.iter().filter_map(|c| c.doc()).min(); }
}

impl DocCursor for OrCursor<'_> {
    fn doc(&self) -> Option<DocId> { self.current }

    fn next(&mut self) {
        let Some(current) = self.current else { return };
        for c in &mut self.children {
            if c.doc() == Some(current) {
                c.next();
            }
        }
        self.settle();
    }

    fn advance(&mut self, target: DocId) {
        for c in &mut self.children {
            c.advance(target);
        }
        self.settle();
    }
}

/// Leap-frog intersection of `required`, minus anything an `excluded` cursor lands on.
struct AndCursor<'a> {
    required: Vec<Box<dyn DocCursor + 'a>>,
    excluded: Vec<Box<dyn DocCursor + 'a>>,
    current: Option<DocId>,
}

impl<'a> AndCursor<'a> {
    fn new(required: Vec<Box<dyn DocCursor + 'a>>, excluded: Vec<Box<dyn DocCursor + 'a>>) -> Self {
        let mut c = Self { required, excluded, current: None };
        c.align();
        c
    }

    fn align(&mut self) {
        self.current = None;
        if self.required.is_empty() {
            return;
        }
        loop {
            let mut candidate = 0;
            for c in &self.required {
                match c.doc() {
                    Some(d) => candidate = candidate.max(d),
                    None => return,
                }
            }
            let mut agreed = true;
            for c in &mut self.required {
                c.advance(candidate);
                if c.doc() != Some(candidate) {
                    agreed = false;
                }
            }
            if !agreed {
                continue;
            }
            let mut vetoed = false;
            for c in &mut self.excluded {
                c.advance(candidate);
                vetoed |= c.doc() == Some(candidate);
            }
            if !vetoed {
                self.current = Some(candidate);
                return;
            }
            self.required[0].next();
        }
    }
}

impl DocCursor for AndCursor<'_> {
    fn doc(&self) -> Option<DocId> { self.current }

    fn next(&mut self) {
        if self.current.is_some() {
            self.required[0].next();
            self.align();
        }
    }

    fn advance(&mut self, target: DocId) {
        if self.current.is_some_and(|d| d < target) {
            self.required[0].advance(target);
            self.align();
        }
    }
}

fn cursor<'a>(s: &Searcher<'a>, query: &Query) -> Box<dyn DocCursor + 'a> {
    match query {
        Query::Term(t) => match s.index.get(t) {
            Some(list) => Box::new(TermCursor::new(list, s.use_skips())),
            None => Box::new(EmptyCursor),
        },
        Query::Or(children) => Box::new(OrCursor::new(children.iter().map(|c| cursor(s, c)).collect())),
        Query::And(children) => {
            let mut required = Vec::new();
            let mut excluded = Vec::new();
            for c in children {
                match c {
                    Query::Not(inner) => excluded.push(cursor(s, inner)),
                    other => required.push(cursor(s, other)),
                }
            }
            Box::new(AndCursor::new(required, excluded))
        }
        Query::Not(_) => Box::new(EmptyCursor),
    }
}

pub(super) fn matches(s: &Searcher<'_>, query: &Query) -> Vec<DocId> {
    let mut out = Vec::new();
    let mut c = cursor(s, query);
    while let Some(doc) = c.doc() {
        if s.live(doc) {
            out.push(doc);
        }
        c.next();
    }
    out
}

fn term_cursors<'a>(s: &Searcher<'a>, terms: &[&str]) -> Vec<TermCursor<'a>> {
    terms
        .iter()
        .filter_map(|t| s.index.get(t))
        .map(|list| TermCursor { upper_bound: s.scorer.upper_bound(list), ..TermCursor::new(list, s.use_skips()) })
        .collect()
}

pub(super) fn ranked(s: &Searcher<'_>, query: &Query, k: usize) -> Vec<Ranked> {
    let mut matcher = cursor(s, query);
    let mut scorers = term_cursors(s, &query.positive_terms());
    let mut top = TopK::new(k);
    while let Some(doc) = matcher.doc() {
        if s.live(doc) {
            let mut score = 0;
            for c in &mut scorers {
                c.advance(doc);
                if c.doc() == Some(doc) {
                    score += c.weight(s);
                }
            }
            top.offer(doc, score);
        }
        matcher.next();
    }
    top.into_sorted()
}

/// Ranked disjunction that skips scoring documents whose summed bounds cannot beat the
/// current k-th score.
pub(super) fn top_k_thresholded(s: &Searcher<'_>, terms: &[&str], k: usize) -> Vec<Ranked> {
    let mut cursors = term_cursors(s, terms);
    let mut top = TopK::new(k);
    let mut skipped = 0usize;
    while let Some(doc) = cursors.iter().filter_map(|c| c.doc()).min() {
        let bound: Score = cursors.iter().filter(|c| c.doc() == Some(doc)).map(|c| c.upper_bound).sum();
        let score_it = s.live(doc) && !cannot_beat(bound, top.threshold());
        let mut score = 0;
        for c in cursors.iter_mut().filter(|c| c.doc() == Some(doc)) {
            if score_it {
                score += c.weight(s);
            }
            c.next();
        }
        if score_it {
            top.offer(doc, score);
        } else {
            skipped += 1;
        }
    }
    tracing::trace!(skipped, "thresholded cursors");
    top.into_sorted()
}

/// MaxScore early termination.
///
/// Cursors are ordered by upper bound. The lowest-bound prefix whose summed bounds cannot
/// reach the threshold is non-essential: it never introduces candidates and is only probed
/// with `advance` for documents found through the essential lists. Evaluation ends when
/// every list has become non-essential.
pub(super) fn top_k_max_score(s: &Searcher<'_>, terms: &[&str], k: usize) -> Vec<Ranked> {
    let mut cursors = term_cursors(s, terms);
    cursors.sort_by_key(|c| c.upper_bound);
    let prefix: Vec<Score> = cursors
        .iter()
        .scan(0, |sum, c| {
            *sum += c.upper_bound;
            Some(*sum)
        })
        .collect();

    let mut top = TopK::new(k);
    let mut essential_from = 0;
    loop {
        let threshold = top.threshold();
        while essential_from < cursors.len() && cannot_beat(prefix[essential_from], threshold) {
            essential_from += 1;
        }
        if essential_from == cursors.len() {
            tracing::trace!("all lists non-essential, stopping early");
            break;
        }
        let Some(doc) = cursors[essential_from..].iter().filter_map(|c| c.doc()).min() else { break };

        let mut score = 0;
        for c in cursors[essential_from..].iter_mut().filter(|c| c.doc() == Some(doc)) {
            score += c.weight(s);
            c.next();
        }
        if !s.live(doc) {
            continue;
        }
        let mut complete = true;
        for i in (0..essential_from).rev() {
            if cannot_beat(score + prefix[i], threshold) {
                complete = false;
                break;
            }
            let c = &mut cursors[i];
            c.advance(doc);
            if c.doc() == Some(doc) {
                score += c.weight(s);
            }
        }
        if complete {
            top.offer(doc, score);
        }
    }
    top.into_sorted()
}
