//! Index metadata: the document-ID → offset map, the term → offsets inverted
//! index, and the snapshot file they are persisted to.
//!
//! Snapshot writes go through a sibling `.tmp` file:
//! 1. Write `<snapshot>.tmp` → fsync
//! 2. Atomic rename to `<snapshot>` → fsync directory

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::SnapshotFormat;
use crate::error::HamftsError;
use crate::models::DocumentId;
use crate::tokenizer::Tokenizer;
use crate::Result;

/// Durable binding of document IDs and terms to record-log offsets
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexMetadata {
    #[serde(alias = "DocumentCount")]
    pub document_count: usize,
    #[serde(alias = "IndexEntries")]
    pub index_entries: BTreeMap<String, BTreeSet<u64>>,
    #[serde(alias = "DocumentPositions")]
    pub document_positions: BTreeMap<DocumentId, u64>,
}

/// A broken metadata invariant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub invariant: &'static str,
    pub description: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.invariant, self.description)
    }
}

impl IndexMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `offset` to the posting set of every term in `content`
    pub fn index_terms(&mut self, tokenizer: &Tokenizer, offset: u64, content: &str) {
        for term in tokenizer.unique_terms(content) {
            self.index_entries.entry(term).or_default().insert(offset);
        }
    }

    /// Remove `offset` from the posting set of every term in `content`,
    /// dropping terms left without postings
    pub fn deindex_terms(&mut self, tokenizer: &Tokenizer, offset: u64, content: &str) {
        for term in tokenizer.unique_terms(content) {
            if let Some(offsets) = self.index_entries.get_mut(&term) {
                offsets.remove(&offset);
                if offsets.is_empty() {
                    self.index_entries.remove(&term);
                }
            }
        }
    }

    pub fn position(&self, id: &str) -> Option<u64> {
        self.document_positions.get(id).copied()
    }

    /// Bind `id` to `offset`, counting it as a new live document
    pub fn insert_document(&mut self, id: DocumentId, offset: u64) {
        if self.document_positions.insert(id, offset).is_none() {
            self.document_count += 1;
        }
    }

    /// Unbind `id`, returning the offset it pointed at
    pub fn remove_document(&mut self, id: &str) -> Option<u64> {
        let offset = self.document_positions.remove(id)?;
        self.document_count = self.document_count.saturating_sub(1);
        Some(offset)
    }

    pub fn postings(&self, term: &str) -> Option<&BTreeSet<u64>> {
        self.index_entries.get(term)
    }

    pub fn unique_word_count(&self) -> usize {
        self.index_entries.len()
    }

    pub fn total_indexed_word_occurrences(&self) -> usize {
        self.index_entries.values().map(BTreeSet::len).sum()
    }

    /// Rewrite every offset through `mapping` (old → new).
    ///
    /// Documents and postings whose old offset has no mapping are dropped,
    /// as are terms left without postings.
    pub fn remap_offsets(&mut self, mapping: &HashMap<u64, u64>) {
        let positions: BTreeMap<DocumentId, u64> = std::mem::take(&mut self.document_positions)
            .into_iter()
            .filter_map(|(id, old)| mapping.get(&old).map(|new| (id, *new)))
            .collect();

        let entries: BTreeMap<String, BTreeSet<u64>> = std::mem::take(&mut self.index_entries)
            .into_iter()
            .filter_map(|(term, offsets)| {
                let remapped: BTreeSet<u64> = offsets
                    .iter()
                    .filter_map(|old| mapping.get(old).copied())
                    .collect();
                (!remapped.is_empty()).then_some((term, remapped))
            })
            .collect();

        self.document_count = positions.len();
        self.document_positions = positions;
        self.index_entries = entries;
    }

    /// Check the structural invariants binding the two maps together
    pub fn check_invariants(&self) -> std::result::Result<(), Vec<Violation>> {
        let mut violations = Vec::new();

        if self.document_count != self.document_positions.len() {
            violations.push(Violation {
                invariant: "DocumentCountMatchesPositions",
                description: format!(
                    "documentCount is {} but {} documents are positioned",
                    self.document_count,
                    self.document_positions.len()
                ),
            });
        }

        let mut live: HashSet<u64> = HashSet::with_capacity(self.document_positions.len());
        for (id, offset) in &self.document_positions {
            if !live.insert(*offset) {
                violations.push(Violation {
                    invariant: "UniqueDocumentOffsets",
                    description: format!("document {} shares offset {}", id, offset),
                });
            }
        }

        for (term, offsets) in &self.index_entries {
            if offsets.is_empty() {
                violations.push(Violation {
                    invariant: "NoEmptyPostings",
                    description: format!("term {:?} has no postings", term),
                });
            }
            for offset in offsets {
                if !live.contains(offset) {
                    violations.push(Violation {
                        invariant: "PostingsReferenceLiveDocuments",
                        description: format!(
                            "term {:?} references offset {} with no live document",
                            term, offset
                        ),
                    });
                }
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    pub fn encode(&self, format: SnapshotFormat) -> Result<Vec<u8>> {
        match format {
            SnapshotFormat::Json => Ok(serde_json::to_vec(self)?),
            SnapshotFormat::Bincode => Ok(bincode::serialize(self)?),
        }
    }

    pub fn decode(data: &[u8], format: SnapshotFormat) -> Result<Self> {
        let decoded: std::result::Result<Self, String> = match format {
            SnapshotFormat::Json => serde_json::from_slice(data).map_err(|e| e.to_string()),
            SnapshotFormat::Bincode => bincode::deserialize(data).map_err(|e| e.to_string()),
        };
        decoded.map_err(HamftsError::CorruptSnapshot)
    }
}

/// Whole-file snapshot of [`IndexMetadata`]
pub struct SnapshotFile {
    path: PathBuf,
    format: SnapshotFormat,
    sync: bool,
}

impl SnapshotFile {
    pub fn new(path: PathBuf, format: SnapshotFormat, sync: bool) -> Self {
        Self { path, format, sync }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Load the snapshot. A missing file yields `None`; a malformed or
    /// inconsistent one is a `CorruptSnapshot` error.
    pub fn load(&self) -> Result<Option<IndexMetadata>> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(HamftsError::Io(e)),
        };

        let metadata = IndexMetadata::decode(&data, self.format)?;
        if let Err(violations) = metadata.check_invariants() {
            let summary: Vec<String> = violations.iter().map(ToString::to_string).collect();
            return Err(HamftsError::CorruptSnapshot(summary.join("; ")));
        }
        Ok(Some(metadata))
    }

    /// Replace the snapshot with `metadata`
    pub fn persist(&self, metadata: &IndexMetadata) -> Result<()> {
        let data = metadata.encode(self.format)?;
        let tmp = self.tmp_path();

        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp)?;
            file.write_all(&data)?;
            if self.sync {
                file.sync_all()?;
            }
        }

        std::fs::rename(&tmp, &self.path)?;
        if self.sync {
            sync_parent_dir(&self.path)?;
        }
        Ok(())
    }
}

/// fsync the directory holding `path` so a completed rename is durable
pub(crate) fn sync_parent_dir(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        if let Some(parent) = path.parent() {
            std::fs::File::open(parent)?.sync_all()?;
        }
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
