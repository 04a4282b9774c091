use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::IndexConfig;
use crate::engine::compaction::Compactor;
use crate::engine::query::{matching_offsets, parse_query};
use crate::error::{HamftsError, Result};
use crate::models::{CompactionReport, Document, IndexStats};
use crate::persistence::{DocStore, IndexMetadata, SnapshotFile, Violation};
use crate::tokenizer::Tokenizer;

/// Disk-backed full-text index.
///
/// A single readers-writer lock guards the record log and the metadata.
/// `get`, `search`, `stats`, `list_ids`, `document_count` and
/// `check_consistency` share it; `add_document`, `add_documents`,
/// `delete_document`, `compact` and `close` take it exclusively. Every
/// mutation persists the metadata snapshot before the lock is released.
pub struct SearchIndex {
    config: IndexConfig,
    tokenizer: Tokenizer,
    state: RwLock<IndexState>,
}

struct IndexState {
    /// `None` once the index has been closed
    store: Option<DocStore>,
    metadata: IndexMetadata,
    snapshot: SnapshotFile,
    sync_on_persist: bool,
}

impl IndexState {
    fn store(&self) -> Result<&DocStore> {
        self.store.as_ref().ok_or(HamftsError::Closed)
    }

    /// Write `doc` to the log and index it, replacing any live document with
    /// the same id. Nothing is mutated if the previous record is unreadable.
    fn apply_add(&mut self, tokenizer: &Tokenizer, doc: &Document) -> Result<u64> {
        let store = self.store.as_ref().ok_or(HamftsError::Closed)?;

        let previous = match self.metadata.position(&doc.id) {
            Some(old_offset) => Some((old_offset, store.read_at(old_offset)?)),
            None => None,
        };

        let offset = store.append(doc)?;

        if let Some((old_offset, old_doc)) = previous {
            self.metadata
                .deindex_terms(tokenizer, old_offset, &old_doc.content);
            debug!(doc_id = %doc.id, old_offset, new_offset = offset, "replacing document");
        }
        self.metadata.insert_document(doc.id.clone(), offset);
        self.metadata.index_terms(tokenizer, offset, &doc.content);
        Ok(offset)
    }

    fn persist(&self) -> Result<()> {
        if self.sync_on_persist {
            self.store()?.sync()?;
        }
        self.snapshot.persist(&self.metadata)
    }
}

impl SearchIndex {
    /// Open the index stored under `config.data_dir`, creating it if needed
    pub fn open(config: IndexConfig) -> Result<Self> {
        std::fs::create_dir_all(config.documents_dir())?;

        let leftover = config.compaction_path();
        if leftover.exists() {
            warn!(path = %leftover.display(), "removing leftover compaction file");
            std::fs::remove_file(&leftover)?;
        }

        let store = DocStore::open(config.documents_path())?;
        let snapshot = SnapshotFile::new(
            config.metadata_path(),
            config.snapshot_format,
            config.sync_on_persist,
        );
        let metadata = snapshot.load()?.unwrap_or_default();

        info!(
            data_dir = %config.data_dir.display(),
            documents = metadata.document_count,
            terms = metadata.unique_word_count(),
            "opened search index"
        );

        Ok(Self {
            tokenizer: Tokenizer::new(),
            state: RwLock::new(IndexState {
                store: Some(store),
                metadata,
                snapshot,
                sync_on_persist: config.sync_on_persist,
            }),
            config,
        })
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Add a document. Re-adding an existing id replaces the old document.
    pub fn add_document(&self, doc: Document) -> Result<()> {
        let mut state = self.state.write();
        let offset = state.apply_add(&self.tokenizer, &doc)?;
        state.persist()?;
        debug!(doc_id = %doc.id, offset, "added document");
        Ok(())
    }

    /// Add a batch of documents in one critical section with one persist.
    ///
    /// If a document fails, the ones before it stay applied in memory but
    /// are not persisted, and the error is returned.
    pub fn add_documents(&self, docs: Vec<Document>) -> Result<usize> {
        let mut state = self.state.write();
        state.store()?;
        if docs.is_empty() {
            return Ok(0);
        }
        for doc in &docs {
            state.apply_add(&self.tokenizer, doc)?;
        }
        state.persist()?;
        debug!(count = docs.len(), "added document batch");
        Ok(docs.len())
    }

    /// Fetch a document by id; `None` if it does not exist
    pub fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let state = self.state.read();
        let store = state.store()?;
        match state.metadata.position(id) {
            Some(offset) => store.read_at(offset).map(Some),
            None => Ok(None),
        }
    }

    /// Delete a document. Returns `false` without touching anything if the
    /// id is absent.
    pub fn delete_document(&self, id: &str) -> Result<bool> {
        let mut state = self.state.write();
        let store = state.store()?;
        let Some(offset) = state.metadata.position(id) else {
            return Ok(false);
        };

        let doc = store.read_at(offset)?;
        state
            .metadata
            .deindex_terms(&self.tokenizer, offset, &doc.content);
        state.metadata.remove_document(id);
        state.persist()?;
        debug!(doc_id = %id, offset, "deleted document");
        Ok(true)
    }

    /// Documents containing every term of `query`, in record-log order
    pub fn search(&self, query: &str) -> Result<Vec<Document>> {
        let started = Instant::now();
        let state = self.state.read();
        let store = state.store()?;

        let terms = parse_query(&self.tokenizer, query);
        let offsets = matching_offsets(&state.metadata, &terms);
        let docs = offsets
            .into_iter()
            .map(|offset| store.read_at(offset))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            query,
            terms = terms.len(),
            hits = docs.len(),
            took_us = started.elapsed().as_micros() as u64,
            "search"
        );
        Ok(docs)
    }

    /// Ids of all live documents, sorted
    pub fn list_ids(&self) -> Result<Vec<String>> {
        let state = self.state.read();
        state.store()?;
        Ok(state.metadata.document_positions.keys().cloned().collect())
    }

    pub fn document_count(&self) -> Result<usize> {
        let state = self.state.read();
        state.store()?;
        Ok(state.metadata.document_count)
    }

    pub fn stats(&self) -> Result<IndexStats> {
        let state = self.state.read();
        let store = state.store()?;
        Ok(IndexStats {
            document_count: state.metadata.document_count,
            unique_word_count: state.metadata.unique_word_count(),
            total_indexed_word_occurrences: state.metadata.total_indexed_word_occurrences(),
            store_size_bytes: store.len()?,
        })
    }

    /// Metadata invariant violations observed under the shared lock
    pub fn check_consistency(&self) -> Result<Vec<Violation>> {
        let state = self.state.read();
        state.store()?;
        Ok(state.metadata.check_invariants().err().unwrap_or_default())
    }

    /// Rewrite the record log without deleted documents
    pub fn compact(&self) -> Result<CompactionReport> {
        let mut state = self.state.write();
        let generation = Compactor::new(&self.config).run(state.store()?, &state.metadata)?;

        state.store = Some(generation.store);
        state.metadata = generation.metadata;
        let persisted = state.persist();
        if let Some(e) = generation.sync_error {
            warn!(error = %e, "compacted log installed but directory sync failed");
            return Err(e);
        }
        persisted?;

        let report = generation.report;
        info!(
            retained = report.documents_retained,
            dropped = report.documents_dropped,
            bytes_before = report.bytes_before,
            bytes_after = report.bytes_after,
            "compacted record log"
        );
        Ok(report)
    }

    /// Persist the metadata and release the record log. Later calls on this
    /// index fail with [`HamftsError::Closed`]; closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.write();
        if state.store.is_none() {
            return Ok(());
        }
        state.persist()?;
        if !state.sync_on_persist {
            state.store()?.sync()?;
        }
        state.store = None;
        info!(data_dir = %self.config.data_dir.display(), "closed search index");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.state.read().store.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn open_index(tmp: &TempDir) -> SearchIndex {
        SearchIndex::open(IndexConfig::new(tmp.path())).unwrap()
    }

    fn ids(docs: &[Document]) -> Vec<String> {
        let mut ids: Vec<String> = docs.iter().map(|d| d.id.clone()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_add_get_and_delete() {
        let tmp = TempDir::new().unwrap();
        let index = open_index(&tmp);

        let doc = Document::new("1", "hello world").with_attribute("lang", json!("en"));
        index.add_document(doc.clone()).unwrap();

        assert_eq!(index.get_document("1").unwrap(), Some(doc));
        assert_eq!(index.document_count().unwrap(), 1);

        assert!(index.delete_document("1").unwrap());
        assert!(index.get_document("1").unwrap().is_none());
        assert!(index.search("hello").unwrap().is_empty());
        assert_eq!(index.document_count().unwrap(), 0);
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let tmp = TempDir::new().unwrap();
        let index = open_index(&tmp);
        index.add_document(Document::new("1", "kept")).unwrap();

        let before = index.stats().unwrap();
        assert!(!index.delete_document("nope").unwrap());
        assert_eq!(index.stats().unwrap(), before);
    }

    #[test]
    fn test_readd_replaces_without_dangling_postings() {
        let tmp = TempDir::new().unwrap();
        let index = open_index(&tmp);

        index.add_document(Document::new("1", "old words here")).unwrap();
        index.add_document(Document::new("1", "new words")).unwrap();

        assert_eq!(index.document_count().unwrap(), 1);
        assert!(index.search("old").unwrap().is_empty());
        assert_eq!(ids(&index.search("words").unwrap()), vec!["1"]);
        assert_eq!(
            index.get_document("1").unwrap().unwrap().content,
            "new words"
        );
        assert!(index.check_consistency().unwrap().is_empty());
    }

    #[test]
    fn test_add_documents_batch() {
        let tmp = TempDir::new().unwrap();
        let index = open_index(&tmp);

        let added = index
            .add_documents(vec![
                Document::new("a", "alpha shared"),
                Document::new("b", "beta shared"),
            ])
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(index.add_documents(Vec::new()).unwrap(), 0);
        assert_eq!(ids(&index.search("shared").unwrap()), vec!["a", "b"]);
        assert_eq!(index.list_ids().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_stats() {
        let tmp = TempDir::new().unwrap();
        let index = open_index(&tmp);
        index
            .add_document(Document::new("1", "The quick brown fox"))
            .unwrap();
        index.add_document(Document::new("2", "the lazy fox")).unwrap();

        let stats = index.stats().unwrap();
        assert_eq!(stats.document_count, 2);
        // the, quick, brown, fox, lazy
        assert_eq!(stats.unique_word_count, 5);
        // the x2, fox x2, quick, brown, lazy
        assert_eq!(stats.total_indexed_word_occurrences, 7);
        assert!(stats.store_size_bytes > 0);
    }

    #[test]
    fn test_compact_reclaims_space() {
        let tmp = TempDir::new().unwrap();
        let index = open_index(&tmp);
        for i in 0..10 {
            index
                .add_document(Document::new(format!("doc{}", i), format!("common term {}", i)))
                .unwrap();
        }
        for i in 0..5 {
            index.delete_document(&format!("doc{}", i)).unwrap();
        }

        let report = index.compact().unwrap();
        assert_eq!(report.documents_retained, 5);
        assert_eq!(report.documents_dropped, 0);
        assert!(report.bytes_after < report.bytes_before);
        assert_eq!(index.search("common").unwrap().len(), 5);
        assert!(index.check_consistency().unwrap().is_empty());
        assert!(!index.config().compaction_path().exists());
    }

    #[test]
    fn test_operations_after_close_fail() {
        let tmp = TempDir::new().unwrap();
        let index = open_index(&tmp);
        index.add_document(Document::new("1", "closing time")).unwrap();
        index.close().unwrap();
        index.close().unwrap();

        assert!(index.is_closed());
        assert!(matches!(index.search("closing"), Err(HamftsError::Closed)));
        assert!(matches!(index.get_document("1"), Err(HamftsError::Closed)));
        assert!(matches!(
            index.add_document(Document::new("2", "late")),
            Err(HamftsError::Closed)
        ));
        assert!(matches!(index.compact(), Err(HamftsError::Closed)));
    }

    #[test]
    fn test_close_without_sync_on_persist_keeps_data() {
        let tmp = TempDir::new().unwrap();
        let config = IndexConfig::new(tmp.path()).with_sync_on_persist(false);
        let index = SearchIndex::open(config.clone()).unwrap();
        index.add_document(Document::new("1", "unsynced write")).unwrap();
        index.close().unwrap();

        let reopened = SearchIndex::open(config).unwrap();
        assert_eq!(ids(&reopened.search("unsynced").unwrap()), vec!["1"]);
    }

    #[test]
    fn test_leftover_compaction_file_is_removed_on_open() {
        let tmp = TempDir::new().unwrap();
        let config = IndexConfig::new(tmp.path());
        std::fs::create_dir_all(config.documents_dir()).unwrap();
        std::fs::write(config.compaction_path(), b"half-written generation").unwrap();

        let index = SearchIndex::open(config.clone()).unwrap();
        assert!(!config.compaction_path().exists());
        assert_eq!(index.document_count().unwrap(), 0);
    }
}
