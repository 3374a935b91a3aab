//! Shared handler state.
//!
//! # Invariants
//! - One SQLite connection per process, guarded by a mutex.
//! - Database work never runs on async worker threads.

use crate::error::ApiError;
use personhub_core::db::{open_db, open_db_in_memory, DbResult};
use personhub_core::{PersonService, SqlitePersonRepository};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Wraps a connection that already has migrations applied.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
        }
    }

    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn in_memory() -> DbResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    /// Runs `op` against a fresh service on the blocking pool.
    pub async fn run<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: for<'conn> FnOnce(&PersonService<SqlitePersonRepository<'conn>>) -> Result<T, ApiError>
            + Send
            + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| ApiError::internal("database mutex poisoned"))?;
            let service = PersonService::new(SqlitePersonRepository::try_new(&conn)?);
            op(&service)
        })
        .await
        .map_err(|err| ApiError::internal(format!("database task failed: {err}")))?
    }
}
