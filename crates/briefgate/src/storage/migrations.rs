//! Schema versioning for the briefgate database.
//!
//! The version lives in the `metadata` table. Opening a database created by
//! an older build runs the missing migrations in order, inside one
//! transaction.

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::{Error, Result};

use super::schema::SCHEMA_STATEMENTS;

/// The current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

type Migration = fn(&Connection) -> Result<()>;

/// Migrations indexed by the version they produce.
const MIGRATIONS: &[(i32, Migration)] = &[(1, migrate_v1)];

/// Initialize the database schema.
///
/// Creates all tables and indexes if they don't exist, then brings the
/// schema up to [`CURRENT_VERSION`]. A database written by a newer build is
/// left untouched.
///
/// # Errors
///
/// Returns an error if schema creation or migration fails.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(&SCHEMA_STATEMENTS.join(";\n"))?;

    let version = get_schema_version(conn)?;
    if version < CURRENT_VERSION {
        let tx = conn.unchecked_transaction()?;
        run_migrations(&tx, version)?;
        tx.commit()?;
        info!(from = version, to = CURRENT_VERSION, "Migrated database schema");
    }

    Ok(())
}

/// Stored schema version, 0 for a fresh database.
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            [VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;

    match value {
        None => Ok(0),
        Some(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

fn run_migrations(conn: &Connection, from_version: i32) -> Result<()> {
    for version in (from_version + 1)..=CURRENT_VERSION {
        run_migration(conn, version)?;
    }
    set_schema_version(conn, CURRENT_VERSION)
}

fn run_migration(conn: &Connection, version: i32) -> Result<()> {
    let (_, migrate) = MIGRATIONS
        .iter()
        .find(|(v, _)| *v == version)
        .ok_or_else(|| Error::DatabaseMigration {
            message: format!("unknown migration version: {version}"),
        })?;
    migrate(conn)
}

/// Version 1 is the base schema from `SCHEMA_STATEMENTS`.
fn migrate_v1(conn: &Connection) -> Result<()> {
    set_schema_version(conn, 1)
}
