//! # agora-server
//!
//! Mock backend for the Agora discussion board.
//!
//! Serves the same REST contract as the production API from in-memory
//! tables (see `agora-store`), so the client can be developed and tested
//! without a real server:
//! - **Auth**: register, login and `me`, with opaque session tokens
//! - **Discussions**: list, fetch, create, admin-only delete
//! - **Comments**: list by discussion with the author joined in, create,
//!   and owner-or-admin delete

pub mod api;
pub mod auth;
pub mod comments;
pub mod config;
pub mod discussions;
pub mod error;

pub use api::{build_router, serve, serve_listener, AppState};
pub use config::ServerConfig;
pub use error::ServerError;

/// Milliseconds since the Unix epoch, the wire format of `createdAt`.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Fresh primary key for a created row.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
