//! Persistence primitives: append-only record log, document store and the
//! metadata snapshot.

mod blob_log;
mod doc_store;
mod metadata;

pub use blob_log::{BlobLog, RECORD_HEADER_LEN};
pub use doc_store::DocStore;
pub use metadata::{IndexMetadata, SnapshotFile, Violation};

pub(crate) use metadata::sync_parent_dir;
