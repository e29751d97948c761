//! # agora-client
//!
//! Client side of the Agora discussion board.
//!
//! - [`api::ApiClient`] wraps reqwest: injects the session token and
//!   `Accept` header, unwraps response bodies and publishes one error
//!   notification per failed request
//! - [`cache::QueryCache`] is the query cache port, keyed by
//!   [`cache::QueryKey`]; [`cache::MemoryQueryCache`] implements it
//! - [`mutation::OptimisticAppend`] runs validated create mutations that
//!   show up in the cached list before the server answers
//! - [`discussions`] and [`comments`] wire those pieces to the REST API

pub mod api;
pub mod auth;
pub mod cache;
pub mod comments;
pub mod config;
pub mod discussions;
pub mod error;
pub mod mutation;
pub mod notifications;

pub use api::ApiClient;
pub use auth::{CredentialProvider, TokenStore};
pub use cache::{Entry, MemoryQueryCache, QueryCache, QueryKey};
pub use config::ClientConfig;
pub use error::{ApiError, MutationError};
pub use notifications::{NotificationStore, Notifier};

#[cfg(test)]
pub(crate) mod test_support;
