//! One engine instance per descriptor: build or load a snapshot, query it, update it.
//!
//! A snapshot is immutable once published. Builds and updates work on a private copy and
//! swap the new snapshot in when they complete, so readers never observe partial state.

use crate::builder::{self, BuildReport, CancellationToken, IndexBuilder};
use crate::config::{EngineConfig, MAX_TOP_K};
use crate::descriptor::IndexDescriptor;
use crate::document::{DocId, DocMeta, Document, DocumentStore};
use crate::error::{BuildError, Error, QueryError, Result};
use crate::index::InvertedIndex;
use crate::persist::{self, IndexStore};
use crate::query;
use crate::scoring;
use crate::search::{Hits, Searcher};
use crate::tokenizer::Tokenizer;
use parking_lot::RwLock;
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    Empty,
    Building,
    Ready,
    /// Ready with at least one query in flight.
    Querying,
}

#[derive(Debug)]
struct Snapshot {
    index: InvertedIndex,
    store: DocumentStore,
}

enum Slot {
    Empty,
    /// `previous` keeps serving queries while an update runs.
    Building { previous: Option<Arc<Snapshot>> },
    Ready(Arc<Snapshot>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub doc_id: String,
    /// `None` for boolean indexes.
    pub score: Option<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub short_id: String,
    pub long_id: String,
    pub state: EngineState,
    pub num_docs: usize,
    pub num_terms: usize,
    pub num_postings: usize,
    pub tombstones: usize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) { self.0.fetch_sub(1, Ordering::SeqCst); }
}

pub struct SearchEngine {
    descriptor: IndexDescriptor,
    config: EngineConfig,
    tokenizer: Box<dyn Tokenizer>,
    storage: Box<dyn IndexStore>,
    slot: RwLock<Slot>,
    in_flight: AtomicUsize,
}

impl SearchEngine {
    pub fn new(descriptor: IndexDescriptor, config: EngineConfig, tokenizer: Box<dyn Tokenizer>) -> Self {
        let storage = persist::for_storage(&config.root, descriptor.storage, config.skip_interval);
        Self { descriptor, config, tokenizer, storage, slot: RwLock::new(Slot::Empty), in_flight: AtomicUsize::new(0) }
    }

    pub fn descriptor(&self) -> &IndexDescriptor { &self.descriptor }

    pub fn config(&self) -> &EngineConfig { &self.config }

    pub fn state(&self) -> EngineState {
        match &*self.slot.read() {
            Slot::Empty => EngineState::Empty,
            Slot::Building { .. } => EngineState::Building,
            Slot::Ready(_) if self.in_flight.load(Ordering::SeqCst) > 0 => EngineState::Querying,
            Slot::Ready(_) => EngineState::Ready,
        }
    }

    /// Snapshot visible to readers: the ready one, or the one an update started from.
    fn snapshot(&self) -> Option<Arc<Snapshot>> {
        match &*self.slot.read() {
            Slot::Ready(s) => Some(Arc::clone(s)),
            Slot::Building { previous } => previous.clone(),
            Slot::Empty => None,
        }
    }

    /// Claims the single writer role by moving the slot to Building. Returns the snapshot
    /// readers keep using meanwhile.
    fn begin_write(&self) -> Result<Option<Arc<Snapshot>>> {
        let mut slot = self.slot.write();
        let previous = match &*slot {
            Slot::Ready(s) => Some(Arc::clone(s)),
            Slot::Building { .. } => return Err(BuildError::Busy.into()),
            Slot::Empty => None,
        };
        *slot = Slot::Building { previous: previous.clone() };
        Ok(previous)
    }

    /// Releases the writer role without publishing anything new.
    fn abandon_write(&self, previous: Option<Arc<Snapshot>>) {
        *self.slot.write() = match previous {
            Some(s) => Slot::Ready(s),
            None => Slot::Empty,
        };
    }

    fn publish(&self, index: InvertedIndex, store: DocumentStore) {
        *self.slot.write() = Slot::Ready(Arc::new(Snapshot { index, store }));
        tracing::info!(short_id = %self.descriptor.short_id(), "engine ready");
    }

    pub fn build<I>(&self, documents: I) -> Result<BuildReport>
    where
        I: IntoIterator<Item = Document>,
    {
        self.build_with_cancel(documents, &CancellationToken::new())
    }

    /// Full rebuild from Empty. Any failure, cancellation included, leaves the engine Empty.
    pub fn build_with_cancel<I>(&self, documents: I, cancel: &CancellationToken) -> Result<BuildReport>
    where
        I: IntoIterator<Item = Document>,
    {
        {
            let mut slot = self.slot.write();
            if matches!(*slot, Slot::Building { .. }) {
                return Err(BuildError::Busy.into());
            }
            *slot = Slot::Building { previous: None };
        }
        tracing::info!(short_id = %self.descriptor.short_id(), "build started");
        match builder::build(documents, self.tokenizer.as_ref(), &self.config, cancel) {
            Ok((index, store, report)) => {
                tracing::info!(
                    processed = report.processed,
                    skipped = report.skipped,
                    num_terms = report.terms,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "build finished"
                );
                self.publish(index, store);
                Ok(report)
            }
            Err(e) => {
                *self.slot.write() = Slot::Empty;
                tracing::warn!(error = %e, "build failed, partial index discarded");
                Err(e.into())
            }
        }
    }

    /// Persists the current snapshot under the descriptor's short id.
    pub fn save(&self) -> Result<()> {
        let snap = self.snapshot().ok_or(BuildError::NotReady)?;
        self.storage.save(&self.descriptor, &snap.index, &snap.store)?;
        Ok(())
    }

    /// Replaces the current snapshot with the persisted one. On failure the state is unchanged.
    pub fn load(&self) -> Result<()> {
        let previous = self.begin_write()?;
        match self.storage.load(&self.descriptor) {
            Ok((index, store)) => {
                self.publish(index, store);
                Ok(())
            }
            Err(e) => {
                self.abandon_write(previous);
                Err(e.into())
            }
        }
    }

    pub fn query(&self, text: &str) -> Result<Vec<SearchHit>> { self.query_top_k(text, self.config.default_top_k) }

    /// Boolean indexes return every match; ranked ones the best `k`, capped at `MAX_TOP_K`.
    pub fn query_top_k(&self, text: &str, k: usize) -> Result<Vec<SearchHit>> { self.evaluate(text, k, |hit, _| hit) }

    /// Like `query_top_k`, with each hit's metadata read from the same snapshot.
    pub fn query_documents(&self, text: &str, k: usize) -> Result<Vec<(SearchHit, DocMeta)>> {
        self.evaluate(text, k, |hit, meta| (hit, meta.clone()))
    }

    fn evaluate<T>(&self, text: &str, k: usize, emit: impl Fn(SearchHit, &DocMeta) -> T) -> Result<Vec<T>> {
        let snap = self.snapshot().ok_or(QueryError::IndexNotLoaded)?;
        let _guard = InFlight::enter(&self.in_flight);
        let Some(parsed) = query::parse(text, self.tokenizer.as_ref(), self.config.default_operator)? else {
            return Ok(Vec::new());
        };
        let searcher = Searcher::new(&snap.index, &snap.store, self.descriptor);
        let hits = searcher.search(&parsed, k.min(MAX_TOP_K));
        let hit = |doc: DocId, score: Option<f32>| {
            snap.store.get(doc).map(|m| emit(SearchHit { doc_id: m.external_id.clone(), score }, m))
        };
        let out: Vec<T> = match hits {
            Hits::Unranked(docs) => docs.into_iter().filter_map(|d| hit(d, None)).collect(),
            Hits::Ranked(ranked) => {
                ranked.into_iter().filter_map(|r| hit(r.doc, Some(scoring::to_f32(r.score)))).collect()
            }
        };
        tracing::debug!(query = text, hits = out.len(), "query evaluated");
        Ok(out)
    }

    /// Tombstones `remove_ids`, then appends `add_docs` under fresh internal ids.
    ///
    /// Queries keep reading the previous snapshot until the update is published. On failure
    /// that snapshot stays in place.
    pub fn update<I>(&self, remove_ids: &[String], add_docs: I) -> Result<BuildReport>
    where
        I: IntoIterator<Item = Document>,
    {
        let Some(previous) = self.begin_write()? else {
            self.abandon_write(None);
            return Err(BuildError::NotReady.into());
        };
        match self.apply_update(&previous, remove_ids, add_docs) {
            Ok((index, store, report)) => {
                tracing::info!(processed = report.processed, removed = report.removed, "update applied");
                self.publish(index, store);
                Ok(report)
            }
            Err(e) => {
                self.abandon_write(Some(previous));
                tracing::warn!(error = %e, "update failed, keeping previous snapshot");
                Err(e)
            }
        }
    }

    fn apply_update<I>(
        &self,
        previous: &Snapshot,
        remove_ids: &[String],
        add_docs: I,
    ) -> Result<(InvertedIndex, DocumentStore, BuildReport)>
    where
        I: IntoIterator<Item = Document>,
    {
        let interval = self.config.skip_interval;
        let mut incremental =
            IndexBuilder::incremental(previous.index.clone(), previous.store.clone(), self.tokenizer.as_ref(), interval);
        for id in remove_ids {
            incremental.remove(id)?;
        }
        let (mut index, mut store, report) =
            builder::feed(incremental, add_docs, self.tokenizer.as_ref(), &self.config, &CancellationToken::new())?;
        let dead = store.tombstones().len();
        if dead > 0 && dead as f64 / (dead + store.len()) as f64 > self.config.compaction_ratio {
            compact_in_place(&mut index, &mut store, interval);
        }
        Ok((index, store, report))
    }

    pub fn delete(&self, doc_ids: &[String]) -> Result<BuildReport> { self.update(doc_ids, std::iter::empty()) }

    /// Drops postings of tombstoned documents. Returns how many documents were purged.
    pub fn compact(&self) -> Result<usize> {
        let Some(snap) = self.begin_write()? else {
            self.abandon_write(None);
            return Err(BuildError::NotReady.into());
        };
        let purged = snap.store.tombstones().len();
        if purged == 0 {
            self.abandon_write(Some(snap));
            return Ok(0);
        }
        let mut index = snap.index.clone();
        let mut store = snap.store.clone();
        compact_in_place(&mut index, &mut store, self.config.skip_interval);
        self.publish(index, store);
        Ok(purged)
    }

    pub fn stats(&self) -> EngineStats {
        let snap = self.snapshot();
        EngineStats {
            short_id: self.descriptor.short_id(),
            long_id: self.descriptor.long_id(),
            state: self.state(),
            num_docs: snap.as_ref().map_or(0, |s| s.store.len()),
            num_terms: snap.as_ref().map_or(0, |s| s.index.vocabulary_size()),
            num_postings: snap.as_ref().map_or(0, |s| s.index.total_postings()),
            tombstones: snap.as_ref().map_or(0, |s| s.store.tombstones().len()),
        }
    }

    /// External ids of live documents in arrival order.
    pub fn list_indexed_files(&self) -> Result<Vec<String>> {
        let snap = self.snapshot().ok_or(QueryError::IndexNotLoaded)?;
        Ok(snap.store.external_ids())
    }

    pub fn document(&self, doc_id: &str) -> Result<Option<DocMeta>> {
        let snap = self.snapshot().ok_or(QueryError::IndexNotLoaded)?;
        Ok(snap.store.get_by_external(doc_id).cloned())
    }
}

fn compact_in_place(index: &mut InvertedIndex, store: &mut DocumentStore, interval: usize) {
    let touched = index.compact(store.tombstones(), interval);
    tracing::info!(tombstones = store.tombstones().len(), lists = touched, "compacted");
    store.clear_tombstones();
}

/// Descriptors with a persisted artifact under `root`.
pub fn list_indices<P: AsRef<Path>>(root: P) -> Result<Vec<IndexDescriptor>> { Ok(persist::list_indices(root)?) }

/// Removes the artifact of `descriptor`. Returns false when none existed.
pub fn delete_index<P: AsRef<Path>>(root: P, descriptor: &IndexDescriptor) -> Result<bool> {
    let storage = persist::for_storage(root, descriptor.storage, EngineConfig::default().skip_interval);
    storage.delete(descriptor).map_err(Error::from)
}

/// Bytes the artifact of `descriptor` occupies on disk.
pub fn footprint<P: AsRef<Path>>(root: P, descriptor: &IndexDescriptor) -> Result<u64> {
    let storage = persist::for_storage(root, descriptor.storage, EngineConfig::default().skip_interval);
    storage.footprint(descriptor).map_err(Error::from)
}
