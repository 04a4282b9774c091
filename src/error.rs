use thiserror::Error;

/// Main error type for hamfts operations
#[derive(Error, Debug)]
pub enum HamftsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt record at offset {offset}: {reason}")]
    CorruptRecord { offset: u64, reason: String },

    #[error("Corrupt metadata snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Index is closed")]
    Closed,
}

/// Result type alias for hamfts operations
pub type Result<T> = std::result::Result<T, HamftsError>;

impl HamftsError {
    pub(crate) fn corrupt_record(offset: u64, reason: impl Into<String>) -> Self {
        HamftsError::CorruptRecord {
            offset,
            reason: reason.into(),
        }
    }

    /// Stable label used in service responses and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            HamftsError::Io(_) => "io_error",
            HamftsError::CorruptRecord { .. } => "corrupt_record",
            HamftsError::CorruptSnapshot(_) => "corrupt_snapshot",
            HamftsError::InvalidQuery(_) => "invalid_query",
            HamftsError::NotFound(_) => "not_found",
            HamftsError::Serialization(_) => "serialization_error",
            HamftsError::Closed => "closed",
        }
    }

    /// Check if this error means stored bytes could not be decoded
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            HamftsError::CorruptRecord { .. } | HamftsError::CorruptSnapshot(_)
        )
    }
}

impl From<serde_json::Error> for HamftsError {
    fn from(e: serde_json::Error) -> Self {
        HamftsError::Serialization(e.to_string())
    }
}

impl From<bincode::Error> for HamftsError {
    fn from(e: bincode::Error) -> Self {
        HamftsError::Serialization(e.to_string())
    }
}
