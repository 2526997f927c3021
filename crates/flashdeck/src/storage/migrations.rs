//! Database migration system for flashdeck.
//!
//! Each migration is a list of statements applied in one transaction together
//! with the version bump, so a failed migration leaves the previous version
//! in place.

use rusqlite::Connection;
use tracing::info;

use crate::error::{Error, Result};

use super::schema::{CREATE_FLASHCARDS_DECK_INDEX, SCHEMA_STATEMENTS};

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// Ordered migrations; entry `i` brings the schema to version `i + 1`.
const MIGRATIONS: &[&[&str]] = &[
    // v1: base tables come from SCHEMA_STATEMENTS
    &[],
    // v2: per-deck index
    &[CREATE_FLASHCARDS_DECK_INDEX],
];

/// The current schema version.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub const CURRENT_VERSION: i32 = MIGRATIONS.len() as i32;

/// Initialize the database schema.
///
/// Creates the base tables if they don't exist, then runs any pending
/// migrations to bring the schema up to the current version.
///
/// # Errors
///
/// Returns an error if schema creation or migration fails, or if the
/// database was written by a newer version.
pub fn initialize_schema(conn: &mut Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }

    let version = get_schema_version(conn)?;
    if version > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {version} is newer than supported version {CURRENT_VERSION}"
            ),
        });
    }

    for target in (version + 1)..=CURRENT_VERSION {
        run_migration(conn, target)?;
    }

    Ok(())
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (fresh database).
///
/// # Errors
///
/// Returns an error if the metadata table cannot be read or holds a
/// malformed version.
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    let result: std::result::Result<String, rusqlite::Error> = conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [VERSION_KEY],
        |row| row.get(0),
    );

    match result {
        Ok(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

fn run_migration(conn: &mut Connection, version: i32) -> Result<()> {
    let statements = usize::try_from(version - 1)
        .ok()
        .and_then(|i| MIGRATIONS.get(i))
        .ok_or_else(|| Error::DatabaseMigration {
            message: format!("unknown migration version: {version}"),
        })?;

    let tx = conn.transaction()?;
    for statement in *statements {
        tx.execute(statement, [])?;
    }
    tx.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    tx.commit()?;

    info!("Migrated database schema to version {}", version);
    Ok(())
}
