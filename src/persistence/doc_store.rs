use std::path::PathBuf;

use crate::error::HamftsError;
use crate::models::Document;
use crate::persistence::BlobLog;
use crate::Result;

/// Document store over an append-only record log.
///
/// Documents are addressed by the byte offset of their record. Payloads are
/// JSON so that open metadata values survive the round trip.
pub struct DocStore {
    log: BlobLog,
}

impl DocStore {
    /// Open an existing store (or an empty one if the file is missing)
    pub fn open(path: PathBuf) -> Result<Self> {
        Ok(Self {
            log: BlobLog::open(path)?,
        })
    }

    /// Start a fresh, empty store generation at `path`
    pub fn create(path: PathBuf) -> Result<Self> {
        Ok(Self {
            log: BlobLog::create(path)?,
        })
    }

    /// Serialize a document, append it and return its offset.
    ///
    /// Callers must hold the engine's exclusive lock.
    pub fn append(&self, doc: &Document) -> Result<u64> {
        let payload = serde_json::to_vec(doc)?;
        self.log.append(&payload)
    }

    /// Decode the document whose record starts at `offset`
    pub fn read_at(&self, offset: u64) -> Result<Document> {
        let payload = self.log.read(offset)?;
        serde_json::from_slice(&payload).map_err(|e| {
            HamftsError::corrupt_record(offset, format!("undecodable document: {}", e))
        })
    }

    pub fn sync(&self) -> Result<()> {
        self.log.sync()
    }

    /// Size of the store in bytes
    pub fn len(&self) -> Result<u64> {
        self.log.len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.log.is_empty()
    }
}
