//! HTTP service exposing the index over JSON request/response calls.

pub mod handlers;
pub mod router;
pub mod types;

pub use handlers::ApiError;
pub use router::{create_router, AppState};
pub use types::{DocumentRequest, SearchRequest};
