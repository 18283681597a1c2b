use std::fs;
use std::sync::Arc;
use std::thread;

use ragdb_core::types::{Chunk, Document, TenantId};
use ragdb_core::{Error, StorageError};
use ragdb_text::TfidfVectorizer;
use ragdb_vector::{rank, FsIndexStore, IndexStore, MemoryIndexStore, TenantIndex};
use tempfile::TempDir;

fn tenant(id: &str) -> TenantId {
    TenantId::new(id).unwrap()
}

fn build(tenant_id: &str, texts: &[&str]) -> TenantIndex {
    let (vocabulary, vectors) = TfidfVectorizer::default().fit(texts);
    let chunks = texts
        .iter()
        .enumerate()
        .map(|(i, t)| Chunk { id: format!("doc{i}_0"), document_id: format!("doc{i}"), text: t.to_string() })
        .collect();
    let documents = texts.iter().enumerate().map(|(i, t)| Document::new(format!("doc{i}"), *t)).collect();
    TenantIndex::new(tenant(tenant_id), vocabulary, vectors, chunks, documents)
}

fn top_ids(index: &TenantIndex, query: &str, k: usize) -> Vec<String> {
    let q = TfidfVectorizer::default().transform(&index.vocabulary, query);
    rank(&q, &index.vectors, k).into_iter().map(|r| index.chunks[r.chunk_index].id.clone()).collect()
}

#[test]
fn fs_round_trip_preserves_ranking() {
    let tmp = TempDir::new().unwrap();
    let store = FsIndexStore::new(tmp.path());
    let index = build("tenant1", &["pets are not allowed", "the hoa fee is $100", "pool hours are 9 to 5"]);

    assert!(!store.exists(&tenant("tenant1")).unwrap());
    store.save(&index).unwrap();
    assert!(store.exists(&tenant("tenant1")).unwrap());
    assert!(store.index_path(&tenant("tenant1")).is_file());

    let loaded = store.load(&tenant("tenant1")).unwrap();
    assert_eq!(*loaded, index);
    for query in ["are pets allowed?", "hoa fee", "hours", "nothing matches"] {
        assert_eq!(top_ids(&loaded, query, 3), top_ids(&index, query, 3), "query {query:?}");
    }
}

#[test]
fn missing_tenant_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let store = FsIndexStore::new(tmp.path());
    let err = store.load(&tenant("unknown-tenant")).unwrap_err();
    assert!(err.is_not_found(), "got {err:?}");
}

#[test]
fn io_failure_is_not_reported_as_not_found() {
    let tmp = TempDir::new().unwrap();
    let store = FsIndexStore::new(tmp.path());
    // a directory where the artifact should be
    fs::create_dir_all(store.index_path(&tenant("t"))).unwrap();
    let err = store.load(&tenant("t")).unwrap_err();
    assert!(matches!(err, Error::Storage(StorageError::Io { .. })), "got {err:?}");
}

#[test]
fn tampered_artifact_is_corrupt() {
    let tmp = TempDir::new().unwrap();
    let store = FsIndexStore::new(tmp.path());
    store.save(&build("t", &["alpha beta", "gamma"])).unwrap();
    let path = store.index_path(&tenant("t"));

    let mut bytes = fs::read(&path).unwrap();
    let last = bytes.len() - 2;
    bytes[last] = if bytes[last] == b'1' { b'2' } else { b'1' };
    fs::write(&path, &bytes).unwrap();
    let err = store.load(&tenant("t")).unwrap_err();
    assert!(matches!(err, Error::Storage(StorageError::Corrupt { .. })), "got {err:?}");

    fs::write(&path, b"not an index").unwrap();
    let err = store.load(&tenant("t")).unwrap_err();
    assert!(matches!(err, Error::Storage(StorageError::Corrupt { .. })), "got {err:?}");
}

#[test]
fn artifact_of_another_tenant_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let store = FsIndexStore::new(tmp.path());
    store.save(&build("a", &["alpha"])).unwrap();
    fs::create_dir_all(store.tenant_dir(&tenant("b"))).unwrap();
    fs::copy(store.index_path(&tenant("a")), store.index_path(&tenant("b"))).unwrap();

    let err = store.load(&tenant("b")).unwrap_err();
    assert!(matches!(err, Error::Storage(StorageError::Corrupt { .. })), "got {err:?}");
}

#[test]
fn save_replaces_previous_index() {
    let tmp = TempDir::new().unwrap();
    let store = FsIndexStore::new(tmp.path());
    store.save(&build("t", &["old text", "more old text"])).unwrap();
    store.save(&build("t", &["brand new"])).unwrap();

    let loaded = store.load(&tenant("t")).unwrap();
    assert_eq!(loaded.chunks.len(), 1);
    assert_eq!(loaded.vocabulary.terms(), &["brand", "new"]);
    let leftovers: Vec<_> = fs::read_dir(store.tenant_dir(&tenant("t"))).unwrap().collect();
    assert_eq!(leftovers.len(), 1, "temporary files are renamed away");
}

#[test]
fn empty_index_round_trips() {
    let tmp = TempDir::new().unwrap();
    let store = FsIndexStore::new(tmp.path());
    let empty = build("t", &[]);
    store.save(&empty).unwrap();
    let loaded = store.load(&tenant("t")).unwrap();
    assert!(loaded.is_empty());
    assert!(loaded.vocabulary.is_empty());
    assert!(top_ids(&loaded, "anything", 3).is_empty());
}

#[test]
fn readers_see_whole_indexes_during_rewrites() {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(FsIndexStore::new(tmp.path()));
    let small = build("t", &["one"]);
    let large = build("t", &["one two", "three four", "five six", "seven"]);
    store.save(&small).unwrap();

    let writer = {
        let store = Arc::clone(&store);
        let (small, large) = (small.clone(), large.clone());
        thread::spawn(move || {
            for i in 0..40 {
                store.save(if i % 2 == 0 { &large } else { &small }).unwrap();
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let (small, large) = (small.clone(), large.clone());
            thread::spawn(move || {
                for _ in 0..40 {
                    let loaded = store.load(&tenant("t")).unwrap();
                    assert!(*loaded == small || *loaded == large);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }
}

#[test]
fn memory_store_swaps_snapshots() {
    let store = MemoryIndexStore::new();
    assert!(store.load(&tenant("t")).unwrap_err().is_not_found());

    store.save(&build("t", &["first"])).unwrap();
    let held = store.load(&tenant("t")).unwrap();
    store.save(&build("t", &["second", "third"])).unwrap();

    assert_eq!(held.chunks.len(), 1, "earlier snapshot is untouched");
    assert_eq!(store.load(&tenant("t")).unwrap().chunks.len(), 2);
    assert!(store.exists(&tenant("t")).unwrap());
    assert!(!store.exists(&tenant("other")).unwrap());
}

#[test]
fn tenant_ids_differing_in_case_resolve_to_one_index() {
    let tmp = TempDir::new().unwrap();
    let store = FsIndexStore::new(tmp.path());
    store.save(&build("Tenant1", &["pets are not allowed"])).unwrap();

    let loaded = store.load(&tenant("tenant1")).unwrap();
    assert_eq!(loaded.tenant_id.as_str(), "tenant1");
    assert_eq!(store.index_path(&tenant("TENANT1")), tmp.path().join("tenant1").join("index.json"));
}
