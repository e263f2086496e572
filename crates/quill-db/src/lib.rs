pub mod error;
pub mod migrations;
pub mod models;
pub mod queries;

pub use error::{DbError, Result};

use rusqlite::{Connection, Transaction};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

const READER_POOL_SIZE: usize = 4;

/// One writer connection plus a small pool of read-only connections.
/// In-memory databases have no readers; reads go through the writer.
pub struct Database {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    reader_idx: AtomicUsize,
}

/// Open a connection with the pragmas every Quill connection needs.
/// Does not touch the schema.
pub fn connect(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;

    // WAL mode for concurrent reads
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    Ok(conn)
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let mut writer = connect(path)?;

        migrations::upgrade(&mut writer)?;

        let mut readers = Vec::with_capacity(READER_POOL_SIZE);
        for _ in 0..READER_POOL_SIZE {
            let conn = Connection::open_with_flags(
                path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            readers.push(Mutex::new(conn));
        }

        info!(
            "Database opened at {} (1 writer + {} readers)",
            path.display(),
            READER_POOL_SIZE
        );
        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            reader_idx: AtomicUsize::new(0),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::upgrade(&mut conn)?;

        Ok(Self {
            writer: Mutex::new(conn),
            readers: Vec::new(),
            reader_idx: AtomicUsize::new(0),
        })
    }

    /// Run a read-only closure against a pooled connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        if self.readers.is_empty() {
            let conn = self.writer.lock().map_err(|_| DbError::Poisoned)?;
            return f(&conn);
        }

        let idx = self.reader_idx.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[idx].lock().map_err(|_| DbError::Poisoned)?;
        f(&conn)
    }

    /// Run a closure inside a write transaction. Commits when the closure
    /// returns `Ok`; any error drops the transaction, which rolls it back.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.writer.lock().map_err(|_| DbError::Poisoned)?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_backed_database_reads_its_own_writes() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("quill.db")).unwrap();

        let user = db.create_user("reader@example.com", "hash").unwrap();
        let found = db.get_user_by_id(user.id).unwrap().unwrap();
        assert_eq!(found.email, "reader@example.com");
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let db = Database::open_in_memory().unwrap();

        let result: Result<()> = db.with_tx(|tx| {
            tx.execute(
                "INSERT INTO users (email, password) VALUES (?1, ?2)",
                ("ghost@example.com", "hash"),
            )?;
            Err(DbError::Conflict)
        });
        assert!(result.is_err());

        assert!(db.get_user_by_email("ghost@example.com").unwrap().is_none());
    }
}
