//! Record-log compaction.
//!
//! Live documents are copied into a fresh generation at
//! `documents/docs.dat.compact`, which is then renamed over `docs.dat`.
//! Offsets are remapped through the old → new correspondence collected while
//! copying, so the inverted index is rewritten in a single linear pass.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::config::IndexConfig;
use crate::error::HamftsError;
use crate::models::CompactionReport;
use crate::persistence::{sync_parent_dir, DocStore, IndexMetadata};
use crate::Result;

/// Result of a compaction whose rename went through, ready to be installed
/// by the engine
pub(crate) struct CompactedGeneration {
    pub store: DocStore,
    pub metadata: IndexMetadata,
    pub report: CompactionReport,
    /// Failure after the rename. The new generation is already the live
    /// file and must still be installed before this is surfaced.
    pub sync_error: Option<HamftsError>,
}

pub(crate) struct Compactor<'a> {
    config: &'a IndexConfig,
}

impl<'a> Compactor<'a> {
    pub fn new(config: &'a IndexConfig) -> Self {
        Self { config }
    }

    /// Rewrite `current` without dead records and swap it into place.
    ///
    /// Unreadable documents are skipped and dropped from the metadata. On
    /// any failure before the rename the old generation stays live and the
    /// temporary file is removed. Once the rename succeeds a generation is
    /// always returned; its handle is the one opened on the temporary path,
    /// which follows the renamed file.
    pub fn run(&self, current: &DocStore, metadata: &IndexMetadata) -> Result<CompactedGeneration> {
        let bytes_before = current.len()?;
        let tmp_path = self.config.compaction_path();

        let copied = self
            .copy_live(current, metadata)
            .and_then(|(next, mapping, dropped)| {
                next.sync()?;
                let bytes_after = next.len()?;
                Ok((next, mapping, dropped, bytes_after))
            });
        let (next, mapping, dropped, bytes_after) = match copied {
            Ok(copied) => copied,
            Err(e) => {
                let _ = std::fs::remove_file(&tmp_path);
                return Err(e);
            }
        };

        let live_path = self.config.documents_path();
        if let Err(e) = std::fs::rename(&tmp_path, &live_path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        let sync_error = sync_parent_dir(&live_path).err();

        let mut remapped = metadata.clone();
        remapped.remap_offsets(&mapping);

        let report = CompactionReport {
            documents_retained: mapping.len(),
            documents_dropped: dropped,
            bytes_before,
            bytes_after,
        };

        Ok(CompactedGeneration {
            store: next,
            metadata: remapped,
            report,
            sync_error,
        })
    }

    fn copy_live(
        &self,
        current: &DocStore,
        metadata: &IndexMetadata,
    ) -> Result<(DocStore, HashMap<u64, u64>, usize)> {
        let next = DocStore::create(self.config.compaction_path())?;
        let mut mapping = HashMap::with_capacity(metadata.document_positions.len());
        let mut dropped = 0usize;

        for (id, &old_offset) in &metadata.document_positions {
            let doc = match current.read_at(old_offset) {
                Ok(doc) => doc,
                Err(e) if e.is_corruption() => {
                    warn!(doc_id = %id, offset = old_offset, error = %e, "dropping unreadable document during compaction");
                    dropped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };
            let new_offset = next.append(&doc)?;
            debug!(doc_id = %id, old_offset, new_offset, "relocated document");
            mapping.insert(old_offset, new_offset);
        }

        Ok((next, mapping, dropped))
    }
}
