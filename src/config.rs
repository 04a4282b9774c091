use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Encoding used for the metadata snapshot file
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    Json,
    Bincode,
}

impl SnapshotFormat {
    /// File name of the snapshot inside the data directory
    pub fn file_name(&self) -> &'static str {
        match self {
            SnapshotFormat::Json => "metadata.json",
            SnapshotFormat::Bincode => "metadata.bin",
        }
    }
}

/// Storage configuration for a search index
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexConfig {
    pub data_dir: PathBuf,
    pub snapshot_format: SnapshotFormat,
    /// fsync the snapshot and record log on every persist
    pub sync_on_persist: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            snapshot_format: SnapshotFormat::Json,
            sync_on_persist: true,
        }
    }
}

impl IndexConfig {
    /// Create a configuration rooted at `data_dir`
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_snapshot_format(mut self, format: SnapshotFormat) -> Self {
        self.snapshot_format = format;
        self
    }

    pub fn with_sync_on_persist(mut self, sync: bool) -> Self {
        self.sync_on_persist = sync;
        self
    }

    pub fn documents_dir(&self) -> PathBuf {
        self.data_dir.join("documents")
    }

    /// Path of the live record log
    pub fn documents_path(&self) -> PathBuf {
        self.documents_dir().join("docs.dat")
    }

    /// Path of the record log generation written during compaction
    pub fn compaction_path(&self) -> PathBuf {
        self.documents_dir().join("docs.dat.compact")
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join(self.snapshot_format.file_name())
    }
}

/// HTTP service configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub index: IndexConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            index: IndexConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(bind_addr: impl Into<String>, index: IndexConfig) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            index,
        }
    }
}

/// HTTP client configuration for `hamctl`
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 10,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}
