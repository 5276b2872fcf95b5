//! Single-writer construction of an inverted index and its document store.

use crate::config::EngineConfig;
use crate::document::{DocMeta, Document, DocumentStore};
use crate::error::{BuildError, TokenizeError};
use crate::index::{InvertedIndex, Posting};
use crate::tokenizer::Tokenizer;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cooperative cancellation flag, checked between documents.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self { Self::default() }

    pub fn cancel(&self) { self.0.store(true, Ordering::SeqCst); }

    pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::SeqCst) }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildReport {
    pub processed: usize,
    /// Documents the tokenizer rejected.
    pub skipped: usize,
    pub removed: usize,
    pub terms: usize,
    pub elapsed: Duration,
}

/// Grows an index one document at a time. Postings are appended in arrival order and
/// sorted per term in `finish`.
pub struct IndexBuilder<'a> {
    tokenizer: &'a dyn Tokenizer,
    skip_interval: usize,
    index: InvertedIndex,
    store: DocumentStore,
    report: BuildReport,
    /// Terms whose lists changed since the builder was created.
    touched: HashSet<String>,
    incremental: bool,
    started: Instant,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(tokenizer: &'a dyn Tokenizer, skip_interval: usize) -> Self {
        Self::resume(InvertedIndex::new(), DocumentStore::new(), tokenizer, skip_interval, false)
    }

    /// Continues from an existing snapshot; only touched lists are re-finalized.
    pub fn incremental(
        index: InvertedIndex,
        store: DocumentStore,
        tokenizer: &'a dyn Tokenizer,
        skip_interval: usize,
    ) -> Self {
        Self::resume(index, store, tokenizer, skip_interval, true)
    }

    fn resume(
        index: InvertedIndex,
        store: DocumentStore,
        tokenizer: &'a dyn Tokenizer,
        skip_interval: usize,
        incremental: bool,
    ) -> Self {
        Self {
            tokenizer,
            skip_interval,
            index,
            store,
            report: BuildReport::default(),
            touched: HashSet::new(),
            incremental,
            started: Instant::now(),
        }
    }

    pub fn add(&mut self, doc: Document) -> Result<(), BuildError> {
        let terms = self.tokenizer.tokenize(&doc.content);
        self.add_tokenized(doc, terms)
    }

    pub(crate) fn add_tokenized(
        &mut self,
        doc: Document,
        terms: Result<Vec<String>, TokenizeError>,
    ) -> Result<(), BuildError> {
        if self.store.contains(&doc.doc_id) {
            tracing::warn!(doc_id = %doc.doc_id, "duplicate document rejected");
            return Err(BuildError::DuplicateDocument(doc.doc_id));
        }
        let terms = match terms {
            Ok(terms) => terms,
            Err(e) => {
                tracing::debug!(doc_id = %doc.doc_id, error = %e, "skipping document");
                self.report.skipped += 1;
                return Ok(());
            }
        };

        let mut positions: HashMap<String, Vec<u32>> = HashMap::new();
        for (pos, term) in terms.iter().enumerate() {
            positions.entry(term.clone()).or_default().push(pos as u32);
        }
        let doc_id = self.store.insert(DocMeta::from_document(&doc, terms.len() as u32));
        for (term, positions) in positions {
            if self.incremental {
                self.touched.insert(term.clone());
            }
            self.index.append(term, Posting { doc_id, positions });
        }
        self.report.processed += 1;
        Ok(())
    }

    /// Tombstones a live document; its postings stay until compaction.
    pub fn remove(&mut self, external_id: &str) -> Result<(), BuildError> {
        match self.store.remove(external_id) {
            Some(_) => {
                self.report.removed += 1;
                Ok(())
            }
            None => Err(BuildError::UnknownDocument(external_id.to_string())),
        }
    }

    pub fn finish(mut self) -> (InvertedIndex, DocumentStore, BuildReport) {
        if self.incremental {
            self.index.finalize_terms(self.touched.iter(), self.skip_interval);
        } else {
            self.index.finalize_all(self.skip_interval);
        }
        self.index.set_doc_count(self.store.len() as u32);
        self.report.terms = self.index.vocabulary_size();
        self.report.elapsed = self.started.elapsed();
        (self.index, self.store, self.report)
    }
}

/// Builds from a lazy document stream in one forward pass.
///
/// With `config.parallel` documents are pulled in batches of `config.batch_size`,
/// tokenized on the rayon pool and merged in arrival order.
pub fn build<I>(
    documents: I,
    tokenizer: &dyn Tokenizer,
    config: &EngineConfig,
    cancel: &CancellationToken,
) -> Result<(InvertedIndex, DocumentStore, BuildReport), BuildError>
where
    I: IntoIterator<Item = Document>,
{
    let builder = IndexBuilder::new(tokenizer, config.skip_interval);
    feed(builder, documents, tokenizer, config, cancel)
}

pub(crate) fn feed<I>(
    mut builder: IndexBuilder<'_>,
    documents: I,
    tokenizer: &dyn Tokenizer,
    config: &EngineConfig,
    cancel: &CancellationToken,
) -> Result<(InvertedIndex, DocumentStore, BuildReport), BuildError>
where
    I: IntoIterator<Item = Document>,
{
    let mut docs = documents.into_iter();
    if config.parallel {
        loop {
            if cancel.is_cancelled() {
                return Err(BuildError::Cancelled);
            }
            let batch: Vec<Document> = docs.by_ref().take(config.batch_size).collect();
            if batch.is_empty() {
                break;
            }
            let tokenized: Vec<(Document, Result<Vec<String>, TokenizeError>)> = batch
                .into_par_iter()
                .map(|doc| {
                    let terms = tokenizer.tokenize(&doc.content);
                    (doc, terms)
                })
                .collect();
            for (doc, terms) in tokenized {
                if cancel.is_cancelled() {
                    return Err(BuildError::Cancelled);
                }
                builder.add_tokenized(doc, terms)?;
            }
            tracing::debug!(processed = builder.report.processed, "merged batch");
        }
    } else {
        for doc in docs {
            if cancel.is_cancelled() {
                return Err(BuildError::Cancelled);
            }
            builder.add(doc)?;
        }
    }
    Ok(builder.finish())
}
