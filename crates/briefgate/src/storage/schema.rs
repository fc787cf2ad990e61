//! `SQLite` schema definitions for briefgate.
//!
//! Everything the application persists is a JSON document in the `kv`
//! table, keyed by a namespaced string such as `user:ada@example.com`.

/// SQL statement to create the key-value table.
pub const CREATE_KV_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    namespace TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create an index on namespace for prefix scans and stats.
pub const CREATE_NAMESPACE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_kv_namespace ON kv(namespace)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_KV_TABLE,
    CREATE_NAMESPACE_INDEX,
    CREATE_METADATA_TABLE,
];
