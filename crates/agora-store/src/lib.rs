//! # agora-store
//!
//! Storage for the Agora mock backend.
//!
//! Entities live in in-memory [`Table`]s owned by a [`MockDb`]. After every
//! write the backend calls [`MockDb::persist`], which flushes the table's
//! rows as a JSON snapshot into a SQLite database; [`MockDb::open_at`]
//! restores every table from those snapshots on startup.

pub mod database;
pub mod migrations;
pub mod mock_db;
pub mod models;
pub mod table;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use mock_db::{MockDb, TableName};
pub use models::{hash_password, verify_password, UserRecord};
pub use table::{Record, Table};
