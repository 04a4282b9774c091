pub mod api;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod models;
pub mod persistence;
pub mod tokenizer;

pub use api::{create_router, AppState};
pub use client::{ClientError, HamftsClient};
pub use config::{ClientConfig, IndexConfig, ServerConfig, SnapshotFormat};
pub use engine::SearchIndex;
pub use error::{HamftsError, Result};
pub use metrics::SearchMetrics;
pub use models::*;
pub use tokenizer::Tokenizer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
