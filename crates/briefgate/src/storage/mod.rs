//! Storage layer for briefgate.
//!
//! A `SQLite`-backed key-value store holding JSON documents. Users, access
//! codes, run history, cached briefs and the CLI session all live here under
//! namespaced keys built by the helpers in [`keys`].

pub mod keys;
pub mod migrations;
pub mod schema;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, trace};

use crate::error::{Error, Result};

/// Key-value storage engine.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and decode the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored JSON does not decode
    /// as `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        trace!(key, "kv get");
        get_raw(&self.conn, key)?
            .map(|raw| decode(key, &raw))
            .transpose()
    }

    /// Store `value` under `key`, replacing any previous document.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        trace!(key, "kv put");
        let raw = serde_json::to_string(value)?;
        put_raw(&self.conn, key, &raw)
    }

    /// Whether a document exists under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn contains(&self, key: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    /// Delete the document under `key`.
    ///
    /// Returns `true` if a document was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete(&self, key: &str) -> Result<bool> {
        let affected = self.conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(affected > 0)
    }

    /// Read-modify-write the document under `key` in one transaction.
    ///
    /// `apply` receives the current document (if any) and returns the new
    /// one, which is stored and returned. If `apply` fails nothing is
    /// written.
    ///
    /// # Errors
    ///
    /// Returns an error from `apply`, from decoding the stored document, or
    /// from the database.
    pub fn update<T, F>(&self, key: &str, apply: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Option<T>) -> Result<T>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let current = get_raw(&tx, key)?
            .map(|raw| decode::<T>(key, &raw))
            .transpose()?;
        let next = apply(current)?;
        put_raw(&tx, key, &serde_json::to_string(&next)?)?;
        tx.commit()?;
        trace!(key, "kv update committed");
        Ok(next)
    }

    /// All keys starting with `prefix`, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT key FROM kv
            WHERE substr(key, 1, length(?1)) = ?1
            ORDER BY key
            ",
        )?;
        let keys = stmt
            .query_map([prefix], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    /// Count total documents in storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let mut stmt = self
            .conn
            .prepare("SELECT namespace, COUNT(*) FROM kv GROUP BY namespace")?;
        let namespaces = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<std::result::Result<BTreeMap<_, _>, _>>()?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_records: namespaces.values().sum(),
            namespaces,
            db_size_bytes,
        })
    }
}

fn get_raw(conn: &Connection, key: &str) -> Result<Option<String>> {
    let raw = conn
        .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(raw)
}

fn put_raw(conn: &Connection, key: &str, raw: &str) -> Result<()> {
    conn.execute(
        r"
        INSERT INTO kv (key, namespace, value, updated_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at
        ",
        params![key, keys::namespace(key), raw, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|source| Error::RecordDecode {
        key: key.to_string(),
        source,
    })
}

/// Statistics about the storage database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Total number of stored documents.
    pub total_records: i64,
    /// Document count per key namespace (`user`, `code`, `history`, ...).
    pub namespaces: BTreeMap<String, i64>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

impl StorageStats {
    /// Number of documents in `namespace`.
    #[must_use]
    pub fn in_namespace(&self, namespace: &str) -> i64 {
        self.namespaces.get(namespace).copied().unwrap_or(0)
    }
}
