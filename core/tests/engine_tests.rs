use selfindex::error::{BuildError, PersistenceError, QueryError};
use selfindex::{
    delete_index, footprint, list_indices, CancellationToken, Compression, Document, EngineConfig, EngineState, Error,
    IndexDescriptor, Optimization, QueryStrategy, Representation, SearchEngine, SimpleTokenizer, Storage,
};
use std::path::Path;

fn worked_example() -> Vec<Document> {
    vec![Document::new("d1", "the quick fox"), Document::new("d2", "quick dogs")]
}

fn engine(root: &Path, descriptor: IndexDescriptor) -> SearchEngine {
    SearchEngine::new(descriptor, EngineConfig::with_root(root), Box::new(SimpleTokenizer))
}

fn ids(engine: &SearchEngine, q: &str) -> Vec<String> {
    engine.query(q).unwrap().into_iter().map(|h| h.doc_id).collect()
}

#[test]
fn worked_example_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let e = engine(dir.path(), IndexDescriptor::default());
    let report = e.build(worked_example()).unwrap();
    assert_eq!((report.processed, report.skipped, report.terms), (2, 0, 3));
    assert_eq!(e.state(), EngineState::Ready);

    assert_eq!(ids(&e, "quick AND fox"), vec!["d1"]);
    assert_eq!(ids(&e, "quick OR dogs"), vec!["d1", "d2"]);
    assert!(ids(&e, "cat").is_empty());
    e.save().unwrap();

    let fresh = engine(dir.path(), IndexDescriptor::default());
    fresh.load().unwrap();
    let stats = fresh.stats();
    assert_eq!((stats.num_terms, stats.num_docs), (3, 2));
    assert_eq!(ids(&fresh, "quick AND fox"), vec!["d1"]);
}

#[test]
fn every_backend_and_codec_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let docs: Vec<Document> = (0..40)
        .map(|i| Document::new(format!("doc{i}"), format!("alpha beta{} gamma{} alpha delta", i % 3, i % 7)))
        .collect();
    for storage in Storage::ALL {
        for compression in Compression::ALL {
            let d = IndexDescriptor::new(
                Representation::TfIdf,
                storage,
                compression,
                QueryStrategy::DocumentAtATime,
                Optimization::EarlyStopping,
            )
            .unwrap();
            let e = engine(dir.path(), d);
            e.build(docs.clone()).unwrap();
            let before = e.query_top_k("alpha beta1 gamma3", 15).unwrap();
            e.save().unwrap();

            let loaded = engine(dir.path(), d);
            loaded.load().unwrap();
            assert_eq!(loaded.query_top_k("alpha beta1 gamma3", 15).unwrap(), before, "{d}");
            assert_eq!(loaded.list_indexed_files().unwrap(), e.list_indexed_files().unwrap());
            assert!(footprint(dir.path(), &d).unwrap() > 0);
        }
    }
    assert_eq!(list_indices(dir.path()).unwrap().len(), Storage::ALL.len() * Compression::ALL.len());
}

#[test]
fn load_reports_missing_and_corrupt_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let d = IndexDescriptor::default();
    let e = engine(dir.path(), d);
    assert!(matches!(e.load(), Err(Error::Persistence(PersistenceError::IndexNotFound(_)))));
    assert_eq!(e.state(), EngineState::Empty);

    e.build(worked_example()).unwrap();
    e.save().unwrap();
    let path = dir.path().join(format!("{}.sidx", d.short_id()));
    let mut bytes = std::fs::read(&path).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0xff;
    std::fs::write(&path, bytes).unwrap();

    let fresh = engine(dir.path(), d);
    assert!(matches!(fresh.load(), Err(Error::Persistence(PersistenceError::CorruptIndex { .. }))));
    assert_eq!(fresh.state(), EngineState::Empty);
}

#[test]
fn rebuilding_is_idempotent() {
    let e = engine(Path::new("unused"), IndexDescriptor::default());
    e.build(worked_example()).unwrap();
    let first = (e.stats().num_terms, e.stats().num_postings, ids(&e, "quick OR dogs OR fox"));
    e.build(worked_example()).unwrap();
    let second = (e.stats().num_terms, e.stats().num_postings, ids(&e, "quick OR dogs OR fox"));
    assert_eq!(first, second);
}

#[test]
fn state_machine_guards_queries_and_updates() {
    let e = engine(Path::new("unused"), IndexDescriptor::default());
    assert!(matches!(e.query("quick"), Err(Error::Query(QueryError::IndexNotLoaded))));
    assert!(matches!(e.list_indexed_files(), Err(Error::Query(QueryError::IndexNotLoaded))));

    let cancel = CancellationToken::new();
    cancel.cancel();
    assert!(matches!(e.build_with_cancel(worked_example(), &cancel), Err(Error::Build(BuildError::Cancelled))));
    assert_eq!(e.state(), EngineState::Empty);

    e.build(worked_example()).unwrap();
    assert!(matches!(e.query("quick AND"), Err(Error::Query(QueryError::Parse { .. }))));
    assert!(e.query("the").unwrap().is_empty());
}

#[test]
fn update_and_delete_use_tombstones() {
    let mut config = EngineConfig::with_root("unused");
    config.compaction_ratio = 0.9;
    let e = SearchEngine::new(IndexDescriptor::default(), config, Box::new(SimpleTokenizer));
    e.build(worked_example()).unwrap();

    let report = e.update(&["d1".to_string()], vec![Document::new("d3", "quick cats")]).unwrap();
    assert_eq!((report.processed, report.removed), (1, 1));
    assert_eq!(ids(&e, "quick"), vec!["d2", "d3"]);
    assert!(ids(&e, "fox").is_empty());
    assert_eq!(e.stats().tombstones, 1);

    // Re-adding a removed id is allowed.
    e.update(&[], vec![Document::new("d1", "slow fox")]).unwrap();
    assert_eq!(ids(&e, "fox"), vec!["d1"]);

    e.delete(&["d2".to_string()]).unwrap();
    assert_eq!(e.list_indexed_files().unwrap(), vec!["d3", "d1"]);
    assert!(matches!(e.delete(&["nope".to_string()]), Err(Error::Build(BuildError::UnknownDocument(_)))));

    assert_eq!(e.compact().unwrap(), 2);
    assert_eq!(e.stats().tombstones, 0);
    assert_eq!(ids(&e, "quick OR fox"), vec!["d3", "d1"]);
}

#[test]
fn updates_compact_past_the_ratio() {
    let e = engine(Path::new("unused"), IndexDescriptor::default());
    e.build((0..4).map(|i| Document::new(format!("d{i}"), "shared word"))).unwrap();
    e.delete(&["d0".to_string()]).unwrap();
    assert_eq!(e.stats().tombstones, 1);
    e.delete(&["d1".to_string()]).unwrap();
    assert_eq!(e.stats().tombstones, 0);
    assert_eq!(e.stats().num_postings, 4);
}

#[test]
fn ranked_variants_score_and_order() {
    let d = IndexDescriptor::new(
        Representation::WordCount,
        Storage::CustomInMemory,
        Compression::None,
        QueryStrategy::TermAtATime,
        Optimization::Thresholding,
    )
    .unwrap();
    let e = engine(Path::new("unused"), d);
    e.build(vec![
        Document::new("a", "fox"),
        Document::new("b", "fox fox fox"),
        Document::new("c", "fox fox"),
        Document::new("d", "fox fox"),
    ])
    .unwrap();
    let hits = e.query_top_k("fox", 3).unwrap();
    let order: Vec<&str> = hits.iter().map(|h| h.doc_id.as_str()).collect();
    assert_eq!(order, vec!["b", "c", "d"]);
    assert_eq!(hits[0].score, Some(3.0));
}

#[test]
fn delete_index_removes_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let d = IndexDescriptor::default();
    let e = engine(dir.path(), d);
    e.build(worked_example()).unwrap();
    e.save().unwrap();
    assert_eq!(list_indices(dir.path()).unwrap(), vec![d]);
    assert!(delete_index(dir.path(), &d).unwrap());
    assert!(!delete_index(dir.path(), &d).unwrap());
    assert!(list_indices(dir.path()).unwrap().is_empty());
    assert!(matches!(footprint(dir.path(), &d), Err(Error::Persistence(PersistenceError::IndexNotFound(_)))));
}
