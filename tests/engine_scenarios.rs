//! End-to-end scenarios against a disk-backed index

use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};

use hamfts::persistence::RECORD_HEADER_LEN;
use hamfts::{Document, HamftsError, IndexConfig, SearchIndex, SnapshotFormat};
use serde_json::json;
use tempfile::TempDir;

fn open_index(tmp: &TempDir) -> SearchIndex {
    SearchIndex::open(IndexConfig::new(tmp.path())).unwrap()
}

fn hit_ids(index: &SearchIndex, query: &str) -> BTreeSet<String> {
    index
        .search(query)
        .unwrap()
        .into_iter()
        .map(|d| d.id)
        .collect()
}

fn set(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

fn corrupt_first_record(config: &IndexConfig) {
    let mut file = OpenOptions::new()
        .write(true)
        .open(config.documents_path())
        .unwrap();
    file.seek(SeekFrom::Start(RECORD_HEADER_LEN + 2)).unwrap();
    file.write_all(b"\xff\xff").unwrap();
    file.sync_all().unwrap();
}

fn log_len(config: &IndexConfig) -> u64 {
    std::fs::metadata(config.documents_path()).unwrap().len()
}

#[test]
fn test_end_to_end_scenario() {
    let tmp = TempDir::new().unwrap();
    let index = open_index(&tmp);

    index
        .add_document(Document::new(
            "1",
            "The quick brown fox jumps over the lazy dog",
        ))
        .unwrap();
    index
        .add_document(Document::new("2", "The lazy cat sleeps all day"))
        .unwrap();

    assert_eq!(hit_ids(&index, "lazy"), set(&["1", "2"]));
    assert_eq!(hit_ids(&index, "quick fox"), set(&["1"]));

    assert!(index.delete_document("1").unwrap());
    assert!(hit_ids(&index, "quick").is_empty());
    assert_eq!(index.document_count().unwrap(), 1);
}

#[test]
fn test_bulk_add_delete_compact() {
    let tmp = TempDir::new().unwrap();
    let index = open_index(&tmp);

    for i in 0..100 {
        index
            .add_document(Document::new(
                format!("doc-{:03}", i),
                format!("document {} has common words", i),
            ))
            .unwrap();
    }
    assert_eq!(index.search("common words").unwrap().len(), 100);

    for i in (0..100).step_by(2) {
        assert!(index.delete_document(&format!("doc-{:03}", i)).unwrap());
    }

    let report = index.compact().unwrap();
    assert_eq!(report.documents_retained, 50);
    assert_eq!(report.documents_dropped, 0);
    assert!(report.bytes_reclaimed() > 0);

    let stats = index.stats().unwrap();
    assert_eq!(stats.document_count, 50);
    assert_eq!(stats.store_size_bytes, report.bytes_after);

    let survivors = hit_ids(&index, "common words");
    assert_eq!(survivors.len(), 50);
    assert!(survivors.contains("doc-001"));
    assert!(!survivors.contains("doc-000"));
    assert_eq!(hit_ids(&index, "51"), set(&["doc-051"]));
    assert!(hit_ids(&index, "50").is_empty());
    assert!(index.check_consistency().unwrap().is_empty());
}

#[test]
fn test_search_edge_cases() {
    let tmp = TempDir::new().unwrap();
    let index = open_index(&tmp);
    index
        .add_document(Document::new("1", "Hello, World! Is anyone there?"))
        .unwrap();

    // Punctuation and case are normalized the same way on both sides
    assert_eq!(hit_ids(&index, "WORLD hello"), set(&["1"]));
    assert_eq!(hit_ids(&index, "there?"), set(&["1"]));
    // Whole-word only
    assert!(hit_ids(&index, "wor").is_empty());
    // A missing term empties the intersection
    assert!(hit_ids(&index, "hello missing").is_empty());
    // Nothing to match
    assert!(index.search("").unwrap().is_empty());
    assert!(index.search("  ,.! ").unwrap().is_empty());
}

#[test]
fn test_add_then_get_preserves_document() {
    let tmp = TempDir::new().unwrap();
    let index = open_index(&tmp);

    let doc = Document::new("meta", "document with attributes")
        .with_attribute("category", json!("animals"))
        .with_attribute("tags", json!(["a", "b"]))
        .with_attribute("nested", json!({"depth": 2, "ok": true}));
    index.add_document(doc.clone()).unwrap();

    let stored = index.get_document("meta").unwrap().unwrap();
    assert_eq!(stored, doc);
    assert_eq!(stored.created_at, doc.created_at);
}

#[test]
fn test_state_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    let doc = Document::new("persist", "durable words on disk");
    {
        let index = open_index(&tmp);
        index.add_document(doc.clone()).unwrap();
        index
            .add_document(Document::new("gone", "durable but deleted"))
            .unwrap();
        index.delete_document("gone").unwrap();
        index.close().unwrap();
    }

    let index = open_index(&tmp);
    assert_eq!(index.document_count().unwrap(), 1);
    assert_eq!(index.get_document("persist").unwrap(), Some(doc));
    assert_eq!(hit_ids(&index, "durable"), set(&["persist"]));
    assert_eq!(index.list_ids().unwrap(), vec!["persist"]);
}

#[test]
fn test_bincode_snapshot_format() {
    let tmp = TempDir::new().unwrap();
    let config = IndexConfig::new(tmp.path()).with_snapshot_format(SnapshotFormat::Bincode);
    {
        let index = SearchIndex::open(config.clone()).unwrap();
        index
            .add_document(Document::new("b1", "binary snapshot").with_attribute("n", json!(1)))
            .unwrap();
        index.close().unwrap();
    }

    assert!(tmp.path().join("metadata.bin").exists());
    assert!(!tmp.path().join("metadata.json").exists());

    let index = SearchIndex::open(config).unwrap();
    assert_eq!(hit_ids(&index, "binary"), set(&["b1"]));
}

#[test]
fn test_malformed_snapshot_fails_open() {
    let tmp = TempDir::new().unwrap();
    let config = IndexConfig::new(tmp.path());
    std::fs::write(config.metadata_path(), b"{ not json").unwrap();

    let err = SearchIndex::open(config).err().unwrap();
    assert!(matches!(err, HamftsError::CorruptSnapshot(_)));
}

#[test]
fn test_inconsistent_snapshot_fails_open() {
    let tmp = TempDir::new().unwrap();
    let config = IndexConfig::new(tmp.path());
    let snapshot = json!({
        "documentCount": 2,
        "indexEntries": { "orphan": [99] },
        "documentPositions": { "1": 0 }
    });
    std::fs::write(config.metadata_path(), snapshot.to_string()).unwrap();

    let err = SearchIndex::open(config).err().unwrap();
    assert!(matches!(err, HamftsError::CorruptSnapshot(_)));
    assert_eq!(err.kind(), "corrupt_snapshot");
}

#[test]
fn test_corrupt_record_surfaces_and_compaction_skips_it() {
    let tmp = TempDir::new().unwrap();
    let config = IndexConfig::new(tmp.path());
    let index = SearchIndex::open(config.clone()).unwrap();

    // First record starts at offset 0
    index
        .add_document(Document::new("bad", "shared damaged record"))
        .unwrap();
    index
        .add_document(Document::new("good", "shared healthy record"))
        .unwrap();

    corrupt_first_record(&config);

    let err = index.get_document("bad").unwrap_err();
    assert!(matches!(err, HamftsError::CorruptRecord { offset: 0, .. }));
    assert!(index.search("damaged").unwrap_err().is_corruption());
    assert!(index.search("shared").unwrap_err().is_corruption());
    assert!(index.delete_document("bad").unwrap_err().is_corruption());
    assert_eq!(hit_ids(&index, "healthy"), set(&["good"]));

    let report = index.compact().unwrap();
    assert_eq!(report.documents_retained, 1);
    assert_eq!(report.documents_dropped, 1);

    assert!(index.get_document("bad").unwrap().is_none());
    assert_eq!(hit_ids(&index, "shared"), set(&["good"]));
    assert!(hit_ids(&index, "damaged").is_empty());
    assert_eq!(index.document_count().unwrap(), 1);
    assert!(index.check_consistency().unwrap().is_empty());
}

#[test]
fn test_readd_over_corrupt_record_changes_nothing() {
    let tmp = TempDir::new().unwrap();
    let config = IndexConfig::new(tmp.path());
    let index = SearchIndex::open(config.clone()).unwrap();
    index
        .add_document(Document::new("bad", "original damaged text"))
        .unwrap();
    index
        .add_document(Document::new("good", "untouched text"))
        .unwrap();
    corrupt_first_record(&config);

    let stats_before = index.stats().unwrap();
    let ids_before = index.list_ids().unwrap();
    let len_before = log_len(&config);

    let err = index
        .add_document(Document::new("bad", "replacement text"))
        .unwrap_err();
    assert!(matches!(err, HamftsError::CorruptRecord { offset: 0, .. }));

    assert_eq!(index.stats().unwrap(), stats_before);
    assert_eq!(index.list_ids().unwrap(), ids_before);
    assert_eq!(log_len(&config), len_before);
    assert!(hit_ids(&index, "replacement").is_empty());
    assert!(index.check_consistency().unwrap().is_empty());
}

#[test]
fn test_failed_batch_leaves_earlier_documents_unpersisted() {
    let tmp = TempDir::new().unwrap();
    let config = IndexConfig::new(tmp.path());
    let index = SearchIndex::open(config.clone()).unwrap();
    index
        .add_document(Document::new("bad", "original damaged text"))
        .unwrap();
    corrupt_first_record(&config);

    let err = index
        .add_documents(vec![
            Document::new("fresh", "applied before the failure"),
            Document::new("bad", "replacement text"),
        ])
        .unwrap_err();
    assert!(err.is_corruption());

    // Applied in memory
    assert_eq!(
        index.get_document("fresh").unwrap().unwrap().content,
        "applied before the failure"
    );

    // Not in the last snapshot
    let reopened = SearchIndex::open(config).unwrap();
    assert_eq!(reopened.list_ids().unwrap(), vec!["bad"]);
    assert!(reopened.get_document("fresh").unwrap().is_none());
}

#[test]
fn test_writes_after_compaction_survive_reopen() {
    let tmp = TempDir::new().unwrap();
    {
        let index = open_index(&tmp);
        index.add_document(Document::new("old", "first generation")).unwrap();
        index.add_document(Document::new("dead", "removed entry")).unwrap();
        index.delete_document("dead").unwrap();
        index.compact().unwrap();

        index
            .add_document(Document::new("new", "second generation"))
            .unwrap();
        index.close().unwrap();
    }

    let index = open_index(&tmp);
    assert_eq!(hit_ids(&index, "generation"), set(&["new", "old"]));
    assert_eq!(
        index.get_document("new").unwrap().unwrap().content,
        "second generation"
    );
    assert!(index.check_consistency().unwrap().is_empty());
}

#[test]
fn test_compaction_persists_remapped_offsets() {
    let tmp = TempDir::new().unwrap();
    {
        let index = open_index(&tmp);
        for i in 0..20 {
            index
                .add_document(Document::new(format!("{}", i), format!("entry number {}", i)))
                .unwrap();
        }
        for i in 0..15 {
            index.delete_document(&format!("{}", i)).unwrap();
        }
        index.compact().unwrap();
        index.close().unwrap();
    }

    let index = open_index(&tmp);
    assert_eq!(
        hit_ids(&index, "entry number"),
        set(&["15", "16", "17", "18", "19"])
    );
    assert_eq!(
        index.get_document("17").unwrap().unwrap().content,
        "entry number 17"
    );
}
