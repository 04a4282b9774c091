use serde::{Deserialize, Serialize};

/// Index-wide counters reported by `stats()`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub document_count: usize,
    /// Number of distinct terms in the inverted index
    pub unique_word_count: usize,
    /// Sum of offset-set sizes over all terms
    pub total_indexed_word_occurrences: usize,
    pub store_size_bytes: u64,
}

/// Outcome of a compaction pass
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactionReport {
    pub documents_retained: usize,
    /// Documents skipped because their record could not be decoded
    pub documents_dropped: usize,
    pub bytes_before: u64,
    pub bytes_after: u64,
}

impl CompactionReport {
    pub fn bytes_reclaimed(&self) -> u64 {
        self.bytes_before.saturating_sub(self.bytes_after)
    }
}
