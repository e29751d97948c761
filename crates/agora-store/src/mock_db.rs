//! The mock backend's database: one in-memory table per entity, flushed to a
//! [`Database`] after every write.

use std::collections::HashMap;
use std::path::Path;

use agora_shared::{Comment, Discussion};
use tracing::{debug, info};

use crate::database::Database;
use crate::error::Result;
use crate::models::UserRecord;
use crate::table::{Record, Table};

/// Identifies a table for [`MockDb::persist`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableName {
    User,
    Discussion,
    Comment,
}

impl TableName {
    pub const ALL: [TableName; 3] = [TableName::User, TableName::Discussion, TableName::Comment];

    pub fn as_str(self) -> &'static str {
        match self {
            TableName::User => UserRecord::TABLE,
            TableName::Discussion => Discussion::TABLE,
            TableName::Comment => Comment::TABLE,
        }
    }
}

pub struct MockDb {
    pub users: Table<UserRecord>,
    pub discussions: Table<Discussion>,
    pub comments: Table<Comment>,
    /// Session token -> user id. Sessions are not persisted.
    sessions: HashMap<String, String>,
    database: Database,
}

impl MockDb {
    /// Start empty, persisting to an in-memory SQLite connection.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::with_database(Database::open_in_memory()?))
    }

    /// Open the snapshot database at `path` and restore every table from it.
    pub fn open_at(path: &Path) -> Result<Self> {
        let mut db = Self::with_database(Database::open_at(path)?);
        db.load()?;
        Ok(db)
    }

    fn with_database(database: Database) -> Self {
        Self {
            users: Table::new(),
            discussions: Table::new(),
            comments: Table::new(),
            sessions: HashMap::new(),
            database,
        }
    }

    /// Replace the in-memory tables with the persisted snapshots. Tables
    /// that were never persisted come back empty.
    pub fn load(&mut self) -> Result<()> {
        self.users = Table::new();
        self.discussions = Table::new();
        self.comments = Table::new();

        for name in TableName::ALL {
            let Some(json) = self.database.load_snapshot(name.as_str())? else {
                continue;
            };
            match name {
                TableName::User => self.users = Table::from_json(&json)?,
                TableName::Discussion => self.discussions = Table::from_json(&json)?,
                TableName::Comment => self.comments = Table::from_json(&json)?,
            }
        }

        info!(
            users = self.users.len(),
            discussions = self.discussions.len(),
            comments = self.comments.len(),
            "mock database loaded"
        );
        Ok(())
    }

    /// Flush one table to durable storage.
    pub fn persist(&self, name: TableName) -> Result<()> {
        let json = match name {
            TableName::User => self.users.to_json()?,
            TableName::Discussion => self.discussions.to_json()?,
            TableName::Comment => self.comments.to_json()?,
        };
        self.database.save_snapshot(name.as_str(), &json)?;
        debug!(table = name.as_str(), bytes = json.len(), "table persisted");
        Ok(())
    }

    /// Issue a fresh session token for `user_id`.
    pub fn issue_session(&mut self, user_id: &str) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        self.sessions.insert(token.clone(), user_id.to_string());
        token
    }

    /// Resolve a session token to its user, if both still exist.
    pub fn session_user(&self, token: &str) -> Option<&UserRecord> {
        let user_id = self.sessions.get(token)?;
        self.users.find_by_id(user_id)
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<&UserRecord> {
        self.users.find_first(|u| u.email.eq_ignore_ascii_case(email))
    }

    pub fn database(&self) -> &Database {
        &self.database
    }
}
