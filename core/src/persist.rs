//! Durable save/load of a built index under its descriptor's short identifier.
//!
//! Every backend writes to a temporary location and renames it into place, so a reader
//! sees either the previous artifact or the complete new one.

use crate::codec::{self, PostingCodec};
use crate::config::{FORMAT_MAGIC, FORMAT_VERSION};
use crate::descriptor::{IndexDescriptor, Storage};
use crate::document::{DocId, DocMeta, DocumentStore};
use crate::error::PersistenceError;
use crate::index::{InvertedIndex, PostingList};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs::{self, create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub type TermId = u32;

type Result<T> = std::result::Result<T, PersistenceError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub identifier: String,
    pub long_id: String,
    pub num_docs: u32,
    pub num_terms: u64,
    pub next_id: DocId,
    pub created_at: String,
    pub version: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredDocs {
    docs: HashMap<DocId, DocMeta>,
    tombstones: BTreeSet<DocId>,
}

#[derive(Serialize, Deserialize)]
struct SingleFile {
    meta: MetaFile,
    /// (term, encoded postings), sorted by term.
    terms: Vec<(String, Vec<u8>)>,
    docs: StoredDocs,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    /// Where the artifact for `descriptor` lives, depending on its storage backend.
    pub fn artifact(&self, descriptor: &IndexDescriptor) -> PathBuf {
        self.root.join(format!("{}.{}", descriptor.short_id(), extension(descriptor.storage)))
    }
}

fn extension(storage: Storage) -> &'static str {
    match storage {
        Storage::CustomInMemory => "sidx",
        Storage::ExternalBackendA => "sled",
        Storage::ExternalBackendB => "terms",
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(suffix);
    PathBuf::from(os)
}

/// Storage backend for persisted indexes.
pub trait IndexStore: Send + Sync {
    fn save(&self, descriptor: &IndexDescriptor, index: &InvertedIndex, store: &DocumentStore) -> Result<()>;

    /// Loads and validates an artifact. Posting lists come back finalized.
    fn load(&self, descriptor: &IndexDescriptor) -> Result<(InvertedIndex, DocumentStore)>;

    fn paths(&self) -> &IndexPaths;

    fn exists(&self, descriptor: &IndexDescriptor) -> bool {
        self.paths().artifact(descriptor).exists()
    }

    /// Returns false when there was nothing to delete.
    fn delete(&self, descriptor: &IndexDescriptor) -> Result<bool> {
        let path = self.paths().artifact(descriptor);
        if !path.exists() {
            return Ok(false);
        }
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        tracing::info!(short_id = %descriptor.short_id(), "deleted persisted index");
        Ok(true)
    }

    /// Bytes on disk.
    fn footprint(&self, descriptor: &IndexDescriptor) -> Result<u64> {
        let path = self.paths().artifact(descriptor);
        if !path.exists() {
            return Err(PersistenceError::IndexNotFound(descriptor.short_id()));
        }
        Ok(disk_usage(&path)?)
    }
}

pub fn for_storage<P: AsRef<Path>>(root: P, storage: Storage, skip_interval: usize) -> Box<dyn IndexStore> {
    let paths = IndexPaths::new(root);
    match storage {
        Storage::CustomInMemory => Box::new(FileStore { paths, skip_interval }),
        Storage::ExternalBackendA => Box::new(SledStore { paths, skip_interval }),
        Storage::ExternalBackendB => Box::new(TermFileStore { paths, skip_interval }),
    }
}

/// Every descriptor with an artifact under `root`, sorted by short id.
pub fn list_indices<P: AsRef<Path>>(root: P) -> Result<Vec<IndexDescriptor>> {
    let root = root.as_ref();
    if !root.exists() {
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some((stem, ext)) = name.to_str().and_then(|n| n.rsplit_once('.')) else { continue };
        if let Ok(descriptor) = stem.parse::<IndexDescriptor>() {
            if extension(descriptor.storage) == ext {
                found.push(descriptor);
            }
        }
    }
    found.sort_by_key(|d| d.short_id());
    Ok(found)
}

fn disk_usage(path: &Path) -> std::io::Result<u64> {
    let meta = fs::metadata(path)?;
    if !meta.is_dir() {
        return Ok(meta.len());
    }
    let mut total = 0;
    for entry in fs::read_dir(path)? {
        total += disk_usage(&entry?.path())?;
    }
    Ok(total)
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

fn make_meta(descriptor: &IndexDescriptor, index: &InvertedIndex, store: &DocumentStore) -> MetaFile {
    MetaFile {
        identifier: descriptor.short_id(),
        long_id: descriptor.long_id(),
        num_docs: index.doc_count(),
        num_terms: index.vocabulary_size() as u64,
        next_id: store.next_id(),
        created_at: now_rfc3339(),
        version: FORMAT_VERSION,
    }
}

fn stored_docs(store: &DocumentStore) -> StoredDocs {
    let (docs, tombstones, _) = store.parts();
    StoredDocs { docs: docs.clone(), tombstones: tombstones.clone() }
}

fn encode_terms(codec: &dyn PostingCodec, short_id: &str, index: &InvertedIndex) -> Result<Vec<(String, Vec<u8>)>> {
    index
        .sorted_terms()
        .into_iter()
        .map(|term| {
            let list = index.get(term).map(PostingList::postings).unwrap_or_default();
            let bytes = codec
                .encode(list)
                .map_err(|e| PersistenceError::Backend(format!("{short_id}: encoding {term:?}: {e}")))?;
            Ok((term.clone(), bytes))
        })
        .collect()
}

/// Decodes, validates and finalizes the pieces every backend reads back.
fn assemble(
    descriptor: &IndexDescriptor,
    meta: MetaFile,
    terms: Vec<(String, Vec<u8>)>,
    docs: StoredDocs,
    skip_interval: usize,
) -> Result<(InvertedIndex, DocumentStore)> {
    let short_id = descriptor.short_id();
    if meta.identifier != short_id {
        return Err(PersistenceError::DescriptorMismatch { expected: short_id, found: meta.identifier });
    }
    if meta.version != FORMAT_VERSION {
        return Err(PersistenceError::corrupt(&short_id, format!("unsupported format version {}", meta.version)));
    }
    if meta.num_terms != terms.len() as u64 {
        return Err(PersistenceError::corrupt(&short_id, "term count does not match header"));
    }
    let codec = codec::for_compression(descriptor.compression);
    let mut lists = HashMap::with_capacity(terms.len());
    for (term, bytes) in terms {
        let postings = codec
            .decode(&bytes)
            .map_err(|e| PersistenceError::corrupt(&short_id, format!("postings of {term:?}: {e}")))?;
        if !postings.windows(2).all(|w| w[0].doc_id < w[1].doc_id) {
            return Err(PersistenceError::corrupt(&short_id, format!("postings of {term:?} out of order")));
        }
        if postings.last().is_some_and(|p| p.doc_id >= meta.next_id) {
            return Err(PersistenceError::corrupt(&short_id, format!("postings of {term:?} reference unknown docs")));
        }
        let mut list = PostingList::from_postings(postings);
        list.finalize(skip_interval);
        if lists.insert(term.clone(), list).is_some() {
            return Err(PersistenceError::corrupt(&short_id, format!("term {term:?} stored twice")));
        }
    }
    let store = DocumentStore::from_parts(docs.docs, docs.tombstones, meta.next_id)
        .map_err(|reason| PersistenceError::corrupt(&short_id, reason))?;
    if store.len() as u32 != meta.num_docs {
        return Err(PersistenceError::corrupt(&short_id, "document count does not match header"));
    }
    let index = InvertedIndex::from_parts(lists, meta.num_docs);
    tracing::info!(short_id = %short_id, num_docs = index.doc_count(), num_terms = index.vocabulary_size(), "index loaded");
    Ok((index, store))
}

/// Writes `bytes` next to `path` and renames over it.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = with_suffix(path, ".tmp");
    let mut f = File::create(&tmp)?;
    f.write_all(bytes)?;
    f.sync_all()?;
    drop(f);
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Moves a fully written directory into place, replacing any previous one.
fn swap_dir(tmp: &Path, dst: &Path) -> Result<()> {
    if dst.exists() {
        let old = with_suffix(dst, ".old");
        if old.exists() {
            fs::remove_dir_all(&old)?;
        }
        fs::rename(dst, &old)?;
        if let Err(e) = fs::rename(tmp, dst) {
            fs::rename(&old, dst)?;
            return Err(e.into());
        }
        fs::remove_dir_all(&old)?;
    } else {
        fs::rename(tmp, dst)?;
    }
    Ok(())
}

/// Puts back a directory artifact left at `<name>.old` by a swap that never finished.
fn recover_dir(dst: &Path) -> Result<()> {
    let old = with_suffix(dst, ".old");
    if !dst.exists() && old.is_dir() {
        fs::rename(&old, dst)?;
        tracing::warn!(path = %dst.display(), "restored artifact from an interrupted save");
    }
    Ok(())
}

fn fresh_dir(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)?;
    }
    create_dir_all(path)?;
    Ok(())
}

/// One self-describing file: magic, version, bincode payload, CRC32 footer.
pub struct FileStore {
    paths: IndexPaths,
    skip_interval: usize,
}

impl IndexStore for FileStore {
    fn save(&self, descriptor: &IndexDescriptor, index: &InvertedIndex, store: &DocumentStore) -> Result<()> {
        create_dir_all(&self.paths.root)?;
        let short_id = descriptor.short_id();
        let codec = codec::for_compression(descriptor.compression);
        let payload = SingleFile {
            meta: make_meta(descriptor, index, store),
            terms: encode_terms(codec.as_ref(), &short_id, index)?,
            docs: stored_docs(store),
        };
        let body = bincode::serialize(&payload).map_err(|e| PersistenceError::Backend(e.to_string()))?;
        let mut out = Vec::with_capacity(body.len() + 12);
        out.extend_from_slice(FORMAT_MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&body);
        let crc = crc32fast::hash(&out);
        out.extend_from_slice(&crc.to_le_bytes());
        write_atomic(&self.paths.artifact(descriptor), &out)?;
        tracing::info!(short_id = %short_id, bytes = out.len(), crc, "index saved");
        Ok(())
    }

    fn load(&self, descriptor: &IndexDescriptor) -> Result<(InvertedIndex, DocumentStore)> {
        let short_id = descriptor.short_id();
        let path = self.paths.artifact(descriptor);
        let mut f = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PersistenceError::IndexNotFound(short_id));
            }
            Err(e) => return Err(e.into()),
        };
        let mut raw = Vec::new();
        f.read_to_end(&mut raw)?;
        if raw.len() < 12 || &raw[..4] != FORMAT_MAGIC {
            return Err(PersistenceError::corrupt(&short_id, "not an index file"));
        }
        let (content, footer) = raw.split_at(raw.len() - 4);
        let stored_crc = u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]);
        let computed = crc32fast::hash(content);
        if stored_crc != computed {
            return Err(PersistenceError::corrupt(
                &short_id,
                format!("checksum mismatch: expected {stored_crc:#010x}, got {computed:#010x}"),
            ));
        }
        let version = u32::from_le_bytes([content[4], content[5], content[6], content[7]]);
        if version != FORMAT_VERSION {
            return Err(PersistenceError::corrupt(&short_id, format!("unsupported format version {version}")));
        }
        let payload: SingleFile =
            bincode::deserialize(&content[8..]).map_err(|e| PersistenceError::corrupt(&short_id, e))?;
        assemble(descriptor, payload.meta, payload.terms, payload.docs, self.skip_interval)
    }

    fn paths(&self) -> &IndexPaths { &self.paths }
}

/// Embedded sled database with `meta`, `postings` and `docs` trees.
pub struct SledStore {
    paths: IndexPaths,
    skip_interval: usize,
}

const META_KEY: &[u8] = b"meta";
const TOMBSTONES_KEY: &[u8] = b"tombstones";

impl IndexStore for SledStore {
    fn save(&self, descriptor: &IndexDescriptor, index: &InvertedIndex, store: &DocumentStore) -> Result<()> {
        create_dir_all(&self.paths.root)?;
        let short_id = descriptor.short_id();
        let dst = self.paths.artifact(descriptor);
        let tmp = with_suffix(&dst, ".tmp");
        if tmp.exists() {
            fs::remove_dir_all(&tmp)?;
        }
        {
            let db = sled::open(&tmp)?;
            let meta_tree = db.open_tree("meta")?;
            let postings = db.open_tree("postings")?;
            let docs = db.open_tree("docs")?;
            let codec = codec::for_compression(descriptor.compression);
            for (term, bytes) in encode_terms(codec.as_ref(), &short_id, index)? {
                postings.insert(term.as_bytes(), bytes)?;
            }
            let (doc_map, tombstones, _) = store.parts();
            for (id, meta) in doc_map {
                let bytes = bincode::serialize(meta).map_err(|e| PersistenceError::Backend(e.to_string()))?;
                docs.insert(id.to_be_bytes(), bytes)?;
            }
            let tomb = bincode::serialize(tombstones).map_err(|e| PersistenceError::Backend(e.to_string()))?;
            meta_tree.insert(TOMBSTONES_KEY, tomb)?;
            let meta = serde_json::to_vec(&make_meta(descriptor, index, store))
                .map_err(|e| PersistenceError::Backend(e.to_string()))?;
            meta_tree.insert(META_KEY, meta)?;
            db.flush()?;
        }
        swap_dir(&tmp, &dst)?;
        tracing::info!(short_id = %short_id, path = %dst.display(), "index saved");
        Ok(())
    }

    fn load(&self, descriptor: &IndexDescriptor) -> Result<(InvertedIndex, DocumentStore)> {
        let short_id = descriptor.short_id();
        let path = self.paths.artifact(descriptor);
        recover_dir(&path)?;
        if !path.is_dir() {
            return Err(PersistenceError::IndexNotFound(short_id));
        }
        let corrupt = |e: &dyn std::fmt::Display| PersistenceError::corrupt(&short_id, e);
        let db = sled::open(&path).map_err(|e| corrupt(&e))?;
        let meta_tree = db.open_tree("meta")?;
        let raw_meta = meta_tree.get(META_KEY)?.ok_or_else(|| corrupt(&"missing meta record"))?;
        let meta: MetaFile = serde_json::from_slice(&raw_meta).map_err(|e| corrupt(&e))?;
        let tombstones: BTreeSet<DocId> = match meta_tree.get(TOMBSTONES_KEY)? {
            Some(bytes) => bincode::deserialize(&bytes).map_err(|e| corrupt(&e))?,
            None => BTreeSet::new(),
        };
        let mut terms = Vec::new();
        for item in db.open_tree("postings")?.iter() {
            let (key, value) = item?;
            let term = String::from_utf8(key.to_vec()).map_err(|e| corrupt(&e))?;
            terms.push((term, value.to_vec()));
        }
        let mut docs = HashMap::new();
        for item in db.open_tree("docs")?.iter() {
            let (key, value) = item?;
            let id: [u8; 4] = key.as_ref().try_into().map_err(|_| corrupt(&"bad document key"))?;
            let meta: DocMeta = bincode::deserialize(&value).map_err(|e| corrupt(&e))?;
            docs.insert(DocId::from_be_bytes(id), meta);
        }
        assemble(descriptor, meta, terms, StoredDocs { docs, tombstones }, self.skip_interval)
    }

    fn paths(&self) -> &IndexPaths { &self.paths }
}

/// Directory layout with a dictionary, a docs file, meta.json and one postings file per term.
pub struct TermFileStore {
    paths: IndexPaths,
    skip_interval: usize,
}

impl TermFileStore {
    fn postings_file(dir: &Path, term_id: TermId) -> PathBuf {
        dir.join("postings").join(format!("{term_id:08}.postings.bin"))
    }
}

impl IndexStore for TermFileStore {
    fn save(&self, descriptor: &IndexDescriptor, index: &InvertedIndex, store: &DocumentStore) -> Result<()> {
        create_dir_all(&self.paths.root)?;
        let short_id = descriptor.short_id();
        let dst = self.paths.artifact(descriptor);
        let tmp = with_suffix(&dst, ".tmp");
        fresh_dir(&tmp)?;
        create_dir_all(tmp.join("postings"))?;

        let codec = codec::for_compression(descriptor.compression);
        let mut dictionary: HashMap<String, TermId> = HashMap::new();
        for (term_id, (term, bytes)) in encode_terms(codec.as_ref(), &short_id, index)?.into_iter().enumerate() {
            let term_id = term_id as TermId;
            let mut f = File::create(Self::postings_file(&tmp, term_id))?;
            f.write_all(&bytes)?;
            dictionary.insert(term, term_id);
        }
        let to_backend = |e: bincode::Error| PersistenceError::Backend(e.to_string());
        let mut f = File::create(tmp.join("dictionary.bin"))?;
        f.write_all(&bincode::serialize(&dictionary).map_err(to_backend)?)?;
        let mut f = File::create(tmp.join("docs.bin"))?;
        f.write_all(&bincode::serialize(&stored_docs(store)).map_err(to_backend)?)?;
        let json = serde_json::to_string_pretty(&make_meta(descriptor, index, store))
            .map_err(|e| PersistenceError::Backend(e.to_string()))?;
        let mut f = File::create(tmp.join("meta.json"))?;
        f.write_all(json.as_bytes())?;
        f.sync_all()?;

        swap_dir(&tmp, &dst)?;
        tracing::info!(short_id = %short_id, num_terms = dictionary.len(), "index saved");
        Ok(())
    }

    fn load(&self, descriptor: &IndexDescriptor) -> Result<(InvertedIndex, DocumentStore)> {
        let short_id = descriptor.short_id();
        let dir = self.paths.artifact(descriptor);
        recover_dir(&dir)?;
        if !dir.is_dir() {
            return Err(PersistenceError::IndexNotFound(short_id));
        }
        let corrupt = |e: &dyn std::fmt::Display| PersistenceError::corrupt(&short_id, e);
        let read = |name: &str| fs::read(dir.join(name)).map_err(|e| corrupt(&format!("{name}: {e}")));

        let meta: MetaFile = serde_json::from_slice(&read("meta.json")?).map_err(|e| corrupt(&e))?;
        let dictionary: HashMap<String, TermId> =
            bincode::deserialize(&read("dictionary.bin")?).map_err(|e| corrupt(&e))?;
        let docs: StoredDocs = bincode::deserialize(&read("docs.bin")?).map_err(|e| corrupt(&e))?;
        let mut terms = Vec::with_capacity(dictionary.len());
        for (term, term_id) in dictionary {
            let bytes = fs::read(Self::postings_file(&dir, term_id))
                .map_err(|e| corrupt(&format!("postings {term_id:08}: {e}")))?;
            terms.push((term, bytes));
        }
        assemble(descriptor, meta, terms, docs, self.skip_interval)
    }

    fn paths(&self) -> &IndexPaths { &self.paths }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{self, CancellationToken, IndexBuilder};
    use crate::config::EngineConfig;
    use crate::descriptor::{Compression, Optimization, QueryStrategy, Representation};
    use crate::document::Document;
    use crate::tokenizer::SimpleTokenizer;

    const INTERVAL: usize = 4;

    fn descriptor(storage: Storage, compression: Compression) -> IndexDescriptor {
        IndexDescriptor::new(Representation::TfIdf, storage, compression, QueryStrategy::TermAtATime, Optimization::None)
            .unwrap()
    }

    /// Twelve documents with repeated terms, one of them tombstoned.
    fn sample() -> (InvertedIndex, DocumentStore) {
        let docs = (0..12).map(|i| {
            Document::new(format!("d{i}"), format!("alpha beta{} alpha gamma{} alpha", i % 3, i % 5)).with_title(format!("T{i}"))
        });
        let cfg = EngineConfig { skip_interval: INTERVAL, ..EngineConfig::default() };
        let (index, store, _) = builder::build(docs, &SimpleTokenizer, &cfg, &CancellationToken::new()).unwrap();
        let mut incremental = IndexBuilder::incremental(index, store, &SimpleTokenizer, INTERVAL);
        incremental.remove("d4").unwrap();
        let (index, store, _) = incremental.finish();
        assert_eq!(store.tombstones().len(), 1);
        (index, store)
    }

    #[test]
    fn every_backend_restores_postings_and_documents_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let (index, store) = sample();
        for storage in Storage::ALL {
            for compression in Compression::ALL {
                let d = descriptor(storage, compression);
                let backend = for_storage(dir.path(), storage, INTERVAL);
                backend.save(&d, &index, &store).unwrap();
                let (loaded_index, loaded_store) = backend.load(&d).unwrap();
                assert_eq!(loaded_index, index, "{d}");
                assert_eq!(loaded_store, store, "{d}");
                assert!(loaded_store.is_tombstoned(4));
                let alpha = loaded_index.get("alpha").unwrap();
                assert_eq!(alpha.max_tf(), 3);
                assert!(!alpha.skips().is_empty());
            }
        }
    }

    #[test]
    fn term_files_detect_truncated_postings_and_missing_meta() {
        let dir = tempfile::tempdir().unwrap();
        let (index, store) = sample();
        let d = descriptor(Storage::ExternalBackendB, Compression::None);
        let backend = for_storage(dir.path(), d.storage, INTERVAL);
        backend.save(&d, &index, &store).unwrap();

        let artifact = backend.paths().artifact(&d);
        let first = TermFileStore::postings_file(&artifact, 0);
        let bytes = fs::read(&first).unwrap();
        fs::write(&first, &bytes[..bytes.len() / 2]).unwrap();
        assert!(matches!(backend.load(&d), Err(PersistenceError::CorruptIndex { .. })));

        backend.save(&d, &index, &store).unwrap();
        fs::remove_file(artifact.join("meta.json")).unwrap();
        assert!(matches!(backend.load(&d), Err(PersistenceError::CorruptIndex { .. })));
    }

    #[test]
    fn sled_detects_missing_meta_record() {
        let dir = tempfile::tempdir().unwrap();
        let (index, store) = sample();
        let d = descriptor(Storage::ExternalBackendA, Compression::CodecA);
        let backend = for_storage(dir.path(), d.storage, INTERVAL);
        backend.save(&d, &index, &store).unwrap();
        {
            let db = sled::open(backend.paths().artifact(&d)).unwrap();
            db.open_tree("meta").unwrap().remove(META_KEY).unwrap();
            db.flush().unwrap();
        }
        assert!(matches!(backend.load(&d), Err(PersistenceError::CorruptIndex { .. })));
    }

    #[test]
    fn failed_swap_keeps_previous_directory() {
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("artifact.terms");
        create_dir_all(&dst).unwrap();
        fs::write(dst.join("meta.json"), b"{}").unwrap();

        assert!(swap_dir(&dir.path().join("never-written"), &dst).is_err());
        assert!(dst.join("meta.json").is_file());
        assert!(!with_suffix(&dst, ".old").exists());
    }

    #[test]
    fn load_recovers_artifact_left_by_interrupted_save() {
        let dir = tempfile::tempdir().unwrap();
        let (index, store) = sample();
        for storage in [Storage::ExternalBackendA, Storage::ExternalBackendB] {
            let d = descriptor(storage, Compression::NativeCodec);
            let backend = for_storage(dir.path(), storage, INTERVAL);
            backend.save(&d, &index, &store).unwrap();
            let artifact = backend.paths().artifact(&d);
            fs::rename(&artifact, with_suffix(&artifact, ".old")).unwrap();

            let (loaded_index, loaded_store) = backend.load(&d).unwrap();
            assert_eq!((loaded_index, loaded_store), (index.clone(), store.clone()));
            assert!(artifact.is_dir());
        }
    }
}
