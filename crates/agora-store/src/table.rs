//! A tiny in-memory table with predicate queries.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StoreError};

/// A row type stored in a [`Table`].
pub trait Record: Clone + Serialize + DeserializeOwned {
    /// Name of the table the record lives in.
    const TABLE: &'static str;

    /// Primary key.
    fn id(&self) -> &str;
}

impl Record for agora_shared::Discussion {
    const TABLE: &'static str = "discussion";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for agora_shared::Comment {
    const TABLE: &'static str = "comment";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Rows in insertion order.
#[derive(Debug, Clone)]
pub struct Table<T> {
    rows: Vec<T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<T: Record> Table<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> &[T] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn find_many<P>(&self, predicate: P) -> impl Iterator<Item = &T>
    where
        P: Fn(&T) -> bool,
    {
        self.rows.iter().filter(move |row| predicate(*row))
    }

    pub fn find_first<P>(&self, predicate: P) -> Option<&T>
    where
        P: Fn(&T) -> bool,
    {
        self.rows.iter().find(|row| predicate(*row))
    }

    pub fn find_by_id(&self, id: &str) -> Option<&T> {
        self.find_first(|row| row.id() == id)
    }

    /// Insert a row, rejecting a primary key that is already taken.
    pub fn create(&mut self, row: T) -> Result<T> {
        if self.find_by_id(row.id()).is_some() {
            return Err(StoreError::Duplicate {
                table: T::TABLE,
                id: row.id().to_string(),
            });
        }
        self.rows.push(row.clone());
        Ok(row)
    }

    /// Remove the first row matching `predicate` and return it.
    pub fn delete_first<P>(&mut self, predicate: P) -> Option<T>
    where
        P: Fn(&T) -> bool,
    {
        let index = self.rows.iter().position(|row| predicate(row))?;
        Some(self.rows.remove(index))
    }

    /// Remove every row matching `predicate`, returning how many went.
    pub fn delete_many<P>(&mut self, predicate: P) -> usize
    where
        P: Fn(&T) -> bool,
    {
        let before = self.rows.len();
        self.rows.retain(|row| !predicate(row));
        before - self.rows.len()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.rows)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self {
            rows: serde_json::from_str(json)?,
        })
    }
}
