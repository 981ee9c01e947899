use axum::http::StatusCode;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::timestamp;

/// A single stored row. Rows are plain JSON objects so patches can carry any field.
pub type Record = Map<String, Value>;

/// Field name to substring, matched case-insensitively with OR semantics.
pub type Filter = BTreeMap<String, String>;

type Tables = BTreeMap<String, Vec<Record>>;

/// Error type for Storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No row in the table carries the requested id.
    #[error("Record not found.")]
    RecordNotFound,
    /// Reading or writing the store file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The store could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    /// Returns the HTTP-style status code for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            StorageError::RecordNotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Successful outcome of a storage operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Stored<T> {
    status: StatusCode,
    data: T,
}

impl<T> Stored<T> {
    fn new(status: StatusCode, data: T) -> Self {
        Self { status, data }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn into_data(self) -> T {
        self.data
    }
}

/// In-memory table store backed by a single JSON file.
///
/// The whole store is rewritten after every mutation. The lock is held across
/// the write, so the file always ends up matching the last mutation applied.
#[derive(Debug)]
pub struct Storage {
    path: PathBuf,
    tables: Mutex<Tables>,
}

impl Storage {
    /// Loads the store from `path`.
    ///
    /// A missing or unparsable file yields an empty store, which is persisted
    /// right away.
    #[tracing::instrument(skip(path))]
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        match read_tables(&path).await {
            Ok(tables) => {
                tracing::info!("Loaded {} table(s) from {}", tables.len(), path.display());
                Self {
                    path,
                    tables: Mutex::new(tables),
                }
            }
            Err(err) => {
                tracing::warn!(
                    "Starting with an empty store, could not read {}: {}",
                    path.display(),
                    err
                );
                let storage = Self {
                    path,
                    tables: Mutex::new(Tables::new()),
                };
                {
                    let tables = storage.tables.lock().await;
                    storage.persist(&tables).await;
                }
                storage
            }
        }
    }

    /// Returns the file this store is persisted to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a record to `table`, creating the table if needed.
    #[tracing::instrument(skip(self, record))]
    pub async fn insert(&self, table: &str, record: Record) -> Stored<Record> {
        let mut tables = self.tables.lock().await;
        tables
            .entry(table.to_string())
            .or_default()
            .push(record.clone());
        self.persist(&tables).await;

        Stored::new(StatusCode::CREATED, record)
    }

    /// Lists the rows of `table`, optionally narrowed by `filter`.
    ///
    /// A row is kept when any filter field's string value contains the
    /// filter text, ignoring case. Rows lacking a filter field, or holding a
    /// non-string there, do not match on that field.
    #[tracing::instrument(skip(self))]
    pub async fn select(&self, table: &str, filter: Option<&Filter>) -> Stored<Vec<Record>> {
        let tables = self.tables.lock().await;
        let rows = tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| filter.is_none_or(|filter| matches_filter(row, filter)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Stored::new(StatusCode::OK, rows)
    }

    /// Shallow-merges `patch` over the row with `id` and refreshes `updated_at`.
    ///
    /// No field is protected; a patch may overwrite `id` or `created_at`.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update(
        &self,
        table: &str,
        id: &str,
        patch: Record,
    ) -> Result<Stored<Record>, StorageError> {
        let mut tables = self.tables.lock().await;
        let row = find_row_mut(&mut tables, table, id).ok_or(StorageError::RecordNotFound)?;
        row.extend(patch);
        row.insert("updated_at".to_string(), timestamp::now());
        let updated = row.clone();
        self.persist(&tables).await;

        Ok(Stored::new(StatusCode::OK, updated))
    }

    /// Removes the row with `id`.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, table: &str, id: &str) -> Result<Stored<()>, StorageError> {
        let mut tables = self.tables.lock().await;
        let rows = tables.get_mut(table).ok_or(StorageError::RecordNotFound)?;
        let index = rows
            .iter()
            .position(|row| has_id(row, id))
            .ok_or(StorageError::RecordNotFound)?;
        rows.remove(index);
        self.persist(&tables).await;

        Ok(Stored::new(StatusCode::NO_CONTENT, ()))
    }

    /// Stamps `completed_at` and `updated_at` on the row with `id`.
    #[tracing::instrument(skip(self))]
    pub async fn mark_complete(&self, table: &str, id: &str) -> Result<Stored<()>, StorageError> {
        let mut tables = self.tables.lock().await;
        let row = find_row_mut(&mut tables, table, id).ok_or(StorageError::RecordNotFound)?;
        let now = timestamp::now();
        row.insert("updated_at".to_string(), now.clone());
        row.insert("completed_at".to_string(), now);
        self.persist(&tables).await;

        Ok(Stored::new(StatusCode::NO_CONTENT, ()))
    }

    /// Rewrites the store file. Failures are logged, never returned.
    async fn persist(&self, tables: &Tables) {
        if let Err(err) = write_tables(&self.path, tables).await {
            tracing::error!("Failed to persist store to {}: {}", self.path.display(), err);
        }
    }
}

async fn read_tables(path: &Path) -> Result<Tables, StorageError> {
    let contents = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&contents)?)
}

async fn write_tables(path: &Path, tables: &Tables) -> Result<(), StorageError> {
    let contents = serde_json::to_vec(tables)?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;
    Ok(())
}

fn has_id(row: &Record, id: &str) -> bool {
    row.get("id").and_then(Value::as_str) == Some(id)
}

fn find_row_mut<'a>(tables: &'a mut Tables, table: &str, id: &str) -> Option<&'a mut Record> {
    tables
        .get_mut(table)?
        .iter_mut()
        .find(|row| has_id(row, id))
}

fn matches_filter(row: &Record, filter: &Filter) -> bool {
    filter.iter().any(|(field, needle)| {
        row.get(field)
            .and_then(Value::as_str)
            .is_some_and(|value| value.to_lowercase().contains(&needle.to_lowercase()))
    })
}
