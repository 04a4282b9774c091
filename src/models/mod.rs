pub mod document;
pub mod search;

pub use document::{Document, DocumentId, DocumentMetadata};
pub use search::{CompactionReport, IndexStats};
