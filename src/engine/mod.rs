//! The indexing engine: write path, conjunctive search and compaction over a
//! single record log guarded by one readers-writer lock.

mod compaction;
pub mod index;
pub mod query;

pub use index::SearchIndex;
