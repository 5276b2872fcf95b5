use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

pub type DocId = u32;

/// A record produced by a document source and consumed once per build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(alias = "id")]
    pub doc_id: String,
    #[serde(default, alias = "body")]
    pub content: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, alias = "timestamp")]
    pub published_date: Option<String>,
    #[serde(default)]
    pub source: String,
}

impl Document {
    pub fn new(doc_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            content: content.into(),
            title: None,
            author: None,
            url: None,
            published_date: None,
            source: String::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocMeta {
    pub external_id: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub url: Option<String>,
    pub published_date: Option<String>,
    pub source: String,
    /// Number of terms the content tokenized to.
    pub num_terms: u32,
}

impl DocMeta {
    pub fn from_document(doc: &Document, num_terms: u32) -> Self {
        Self {
            external_id: doc.doc_id.clone(),
            title: doc.title.clone(),
            author: doc.author.clone(),
            url: doc.url.clone(),
            published_date: doc.published_date.clone(),
            source: doc.source.clone(),
            num_terms,
        }
    }
}

/// doc_id -> metadata for every live document, plus the tombstones of removed ones.
///
/// Internal ids are handed out in strictly increasing order and never reused, so
/// postings appended by an update always sort after existing ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentStore {
    docs: HashMap<DocId, DocMeta>,
    ids: HashMap<String, DocId>,
    tombstones: BTreeSet<DocId>,
    next_id: DocId,
}

impl DocumentStore {
    pub fn new() -> Self { Self::default() }

    pub fn next_id(&self) -> DocId { self.next_id }

    /// Registers a document under a fresh internal id. The caller checks for duplicates first.
    pub(crate) fn insert(&mut self, meta: DocMeta) -> DocId {
        let id = self.next_id;
        self.next_id += 1;
        self.ids.insert(meta.external_id.clone(), id);
        self.docs.insert(id, meta);
        id
    }

    /// Removes a live document, leaving a tombstone for its postings.
    pub(crate) fn remove(&mut self, external_id: &str) -> Option<DocId> {
        let id = self.ids.remove(external_id)?;
        self.docs.remove(&id);
        self.tombstones.insert(id);
        Some(id)
    }

    pub(crate) fn clear_tombstones(&mut self) {
        self.tombstones.clear();
    }

    pub fn contains(&self, external_id: &str) -> bool { self.ids.contains_key(external_id) }

    pub fn internal_id(&self, external_id: &str) -> Option<DocId> { self.ids.get(external_id).copied() }

    pub fn get(&self, id: DocId) -> Option<&DocMeta> { self.docs.get(&id) }

    pub fn get_by_external(&self, external_id: &str) -> Option<&DocMeta> {
        self.internal_id(external_id).and_then(|id| self.docs.get(&id))
    }

    pub fn is_tombstoned(&self, id: DocId) -> bool { self.tombstones.contains(&id) }

    pub fn tombstones(&self) -> &BTreeSet<DocId> { &self.tombstones }

    pub fn len(&self) -> usize { self.docs.len() }

    pub fn is_empty(&self) -> bool { self.docs.is_empty() }

    /// Live documents in internal id order.
    pub fn iter(&self) -> impl Iterator<Item = (DocId, &DocMeta)> {
        let mut ids: Vec<DocId> = self.docs.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter().map(move |id| (id, &self.docs[&id]))
    }

    /// External ids of live documents in arrival order.
    pub fn external_ids(&self) -> Vec<String> {
        self.iter().map(|(_, m)| m.external_id.clone()).collect()
    }

    /// Rebuilds a store from persisted parts, checking that they agree with each other.
    pub(crate) fn from_parts(
        docs: HashMap<DocId, DocMeta>,
        tombstones: BTreeSet<DocId>,
        next_id: DocId,
    ) -> Result<Self, String> {
        let mut ids = HashMap::with_capacity(docs.len());
        for (id, meta) in docs.iter() {
            if *id >= next_id || tombstones.contains(id) {
                return Err(format!("document id {id} out of range"));
            }
            if ids.insert(meta.external_id.clone(), *id).is_some() {
                return Err(format!("document {:?} stored twice", meta.external_id));
            }
        }
        Ok(Self { docs, ids, tombstones, next_id })
    }

    pub(crate) fn parts(&self) -> (&HashMap<DocId, DocMeta>, &BTreeSet<DocId>, DocId) {
        (&self.docs, &self.tombstones, self.next_id)
    }
}
