//! `SQLite` storage backend.
//!
//! Write transactions are opened `IMMEDIATE`, so two processes sharing one
//! database file serialize their deck mutations instead of interleaving a
//! recount with another writer's insert.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{Deck, Flashcard};

use super::migrations;
use super::{Backend, DatabaseFile, Transaction};

const MEMORY_PATH: &str = ":memory:";

const DECK_COLUMNS: &str = "id, title, description, card_count";
const FLASHCARD_COLUMNS: &str = "id, deck_id, front, back, sort_order";

/// Storage backend over a `SQLite` database.
#[derive(Debug)]
pub struct SqliteBackend {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl SqliteBackend {
    /// Open or create a database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist,
    /// and brings the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
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
        let mut conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.busy_timeout(busy_timeout)?;
        // WAL lets readers proceed while a writer holds the lock
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&mut conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create a backend over a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(MEMORY_PATH),
            source,
        })?;

        migrations::initialize_schema(&mut conn)?;

        Ok(Self {
            path: PathBuf::from(MEMORY_PATH),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the database file in bytes, 0 for in-memory databases.
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        if self.path.as_os_str() == MEMORY_PATH {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        }
    }

    /// Direct access to the connection, for maintenance and tests.
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn row_to_deck(row: &rusqlite::Row) -> rusqlite::Result<Deck> {
    Ok(Deck {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        card_count: row.get(3)?,
    })
}

fn row_to_flashcard(row: &rusqlite::Row) -> rusqlite::Result<Flashcard> {
    Ok(Flashcard {
        id: row.get(0)?,
        deck_id: row.get(1)?,
        front: row.get(2)?,
        back: row.get(3)?,
        order: row.get(4)?,
    })
}

fn query_deck(conn: &Connection, id: &str) -> Result<Option<Deck>> {
    let deck = conn
        .query_row(
            &format!("SELECT {DECK_COLUMNS} FROM decks WHERE id = ?1"),
            [id],
            row_to_deck,
        )
        .optional()?;
    Ok(deck)
}

fn query_flashcard(conn: &Connection, id: &str) -> Result<Option<Flashcard>> {
    let card = conn
        .query_row(
            &format!("SELECT {FLASHCARD_COLUMNS} FROM flashcards WHERE id = ?1"),
            [id],
            row_to_flashcard,
        )
        .optional()?;
    Ok(card)
}

fn query_count(conn: &Connection, deck_id: &str) -> Result<u32> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM flashcards WHERE deck_id = ?1",
        [deck_id],
        |row| row.get(0),
    )?;
    u32::try_from(count).map_err(|_| Error::internal(format!("card count overflow: {count}")))
}

impl Backend for SqliteBackend {
    type Tx<'a> = SqliteTransaction<'a>;

    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn begin(&mut self) -> Result<SqliteTransaction<'_>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(SqliteTransaction { tx })
    }

    fn list_decks(&self) -> Result<Vec<Deck>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {DECK_COLUMNS} FROM decks ORDER BY rowid"))?;
        let decks = stmt
            .query_map([], row_to_deck)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(decks)
    }

    fn get_deck(&self, id: &str) -> Result<Option<Deck>> {
        query_deck(&self.conn, id)
    }

    fn list_flashcards(&self, deck_id: &str) -> Result<Vec<Flashcard>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FLASHCARD_COLUMNS} FROM flashcards WHERE deck_id = ?1 \
             ORDER BY sort_order ASC, rowid ASC"
        ))?;
        let cards = stmt
            .query_map([deck_id], row_to_flashcard)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(cards)
    }

    fn get_flashcard(&self, id: &str) -> Result<Option<Flashcard>> {
        query_flashcard(&self.conn, id)
    }

    fn count_flashcards(&self, deck_id: &str) -> Result<u32> {
        query_count(&self.conn, deck_id)
    }

    fn totals(&self) -> Result<(u64, u64)> {
        let (decks, flashcards): (i64, i64) = self.conn.query_row(
            "SELECT (SELECT COUNT(*) FROM decks), (SELECT COUNT(*) FROM flashcards)",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok((decks.unsigned_abs(), flashcards.unsigned_abs()))
    }

    fn database_file(&self) -> Option<DatabaseFile> {
        (self.path.as_os_str() != MEMORY_PATH).then(|| DatabaseFile {
            path: self.path.clone(),
            size_bytes: self.size_bytes(),
        })
    }
}

/// An open `IMMEDIATE` transaction. Rolled back on drop unless committed.
#[derive(Debug)]
pub struct SqliteTransaction<'a> {
    tx: rusqlite::Transaction<'a>,
}

impl Transaction for SqliteTransaction<'_> {
    fn get_deck(&self, id: &str) -> Result<Option<Deck>> {
        query_deck(&self.tx, id)
    }

    fn get_flashcard(&self, id: &str) -> Result<Option<Flashcard>> {
        query_flashcard(&self.tx, id)
    }

    fn count_flashcards(&self, deck_id: &str) -> Result<u32> {
        query_count(&self.tx, deck_id)
    }

    fn max_order(&self, deck_id: &str) -> Result<Option<i64>> {
        let max = self.tx.query_row(
            "SELECT MAX(sort_order) FROM flashcards WHERE deck_id = ?1",
            [deck_id],
            |row| row.get(0),
        )?;
        Ok(max)
    }

    fn insert_deck(&mut self, deck: &Deck) -> Result<()> {
        self.tx.execute(
            "INSERT INTO decks (id, title, description, card_count) VALUES (?1, ?2, ?3, ?4)",
            params![deck.id, deck.title, deck.description, deck.card_count],
        )?;
        Ok(())
    }

    fn delete_deck(&mut self, id: &str) -> Result<bool> {
        let affected = self.tx.execute("DELETE FROM decks WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    fn insert_flashcard(&mut self, card: &Flashcard) -> Result<()> {
        self.tx.execute(
            "INSERT INTO flashcards (id, deck_id, front, back, sort_order) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![card.id, card.deck_id, card.front, card.back, card.order],
        )?;
        Ok(())
    }

    fn delete_flashcard(&mut self, id: &str) -> Result<bool> {
        let affected = self
            .tx
            .execute("DELETE FROM flashcards WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    fn delete_flashcards_of_deck(&mut self, deck_id: &str) -> Result<usize> {
        let affected = self
            .tx
            .execute("DELETE FROM flashcards WHERE deck_id = ?1", [deck_id])?;
        Ok(affected)
    }

    fn set_card_count(&mut self, deck_id: &str, count: u32) -> Result<bool> {
        let affected = self.tx.execute(
            "UPDATE decks SET card_count = ?1 WHERE id = ?2",
            params![count, deck_id],
        )?;
        Ok(affected > 0)
    }

    fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewDeck, NewFlashcard};

    fn create_test_backend() -> SqliteBackend {
        SqliteBackend::open_in_memory().expect("failed to create test backend")
    }

    fn temp_db_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("flashdeck_test_{}_{name}.db", std::process::id()))
    }

    fn cleanup(path: &Path) {
        let _ = std::fs::remove_file(path);
        let _ = std::fs::remove_file(path.with_extension("db-wal"));
        let _ = std::fs::remove_file(path.with_extension("db-shm"));
    }

    #[test]
    fn test_open_in_memory() {
        let backend = create_test_backend();
        assert_eq!(backend.path(), Path::new(":memory:"));
        assert_eq!(backend.size_bytes(), 0);
        assert!(backend.database_file().is_none());
        assert_eq!(backend.name(), "sqlite");
    }

    #[test]
    fn test_deck_round_trip_keeps_null_description() {
        let mut backend = create_test_backend();
        let deck = Deck::create(NewDeck::titled("Bio"));

        let mut tx = backend.begin().unwrap();
        tx.insert_deck(&deck).unwrap();
        tx.commit().unwrap();

        let stored = backend.get_deck(&deck.id).unwrap().unwrap();
        assert_eq!(stored, deck);
        assert!(stored.description.is_none());
    }

    #[test]
    fn test_dropped_transaction_rolls_back() {
        let mut backend = create_test_backend();
        let deck = Deck::create(NewDeck::titled("Bio"));

        {
            let mut tx = backend.begin().unwrap();
            tx.insert_deck(&deck).unwrap();
        }

        assert!(backend.get_deck(&deck.id).unwrap().is_none());
    }

    #[test]
    fn test_list_flashcards_sorted_then_by_insertion() {
        let mut backend = create_test_backend();
        let cards = [
            Flashcard::create(NewFlashcard::new("d", "two", "b", 2)),
            Flashcard::create(NewFlashcard::new("d", "zero-a", "b", 0)),
            Flashcard::create(NewFlashcard::new("d", "zero-b", "b", 0)),
            Flashcard::create(NewFlashcard::new("other", "x", "y", 1)),
        ];
        let mut tx = backend.begin().unwrap();
        for card in &cards {
            tx.insert_flashcard(card).unwrap();
        }
        tx.commit().unwrap();

        let fronts: Vec<String> = backend
            .list_flashcards("d")
            .unwrap()
            .into_iter()
            .map(|c| c.front)
            .collect();
        assert_eq!(fronts, vec!["zero-a", "zero-b", "two"]);
    }

    #[test]
    fn test_max_order_and_count_inside_transaction() {
        let mut backend = create_test_backend();
        let mut tx = backend.begin().unwrap();
        assert_eq!(tx.max_order("d").unwrap(), None);
        assert_eq!(tx.count_flashcards("d").unwrap(), 0);

        tx.insert_flashcard(&Flashcard::create(NewFlashcard::new("d", "Q", "A", 5)))
            .unwrap();
        assert_eq!(tx.max_order("d").unwrap(), Some(5));
        assert_eq!(tx.count_flashcards("d").unwrap(), 1);
    }

    #[test]
    fn test_totals() {
        let mut backend = create_test_backend();
        let deck = Deck::create(NewDeck::titled("Bio"));
        let mut tx = backend.begin().unwrap();
        tx.insert_deck(&deck).unwrap();
        tx.insert_flashcard(&Flashcard::create(NewFlashcard::new(&deck.id, "Q", "A", 0)))
            .unwrap();
        tx.commit().unwrap();

        assert_eq!(backend.totals().unwrap(), (1, 1));
    }

    #[test]
    fn test_open_file_based_persists() {
        let db_path = temp_db_path("persist");
        cleanup(&db_path);
        let deck = Deck::create(NewDeck::titled("Bio"));

        {
            let mut backend = SqliteBackend::open(&db_path, Duration::from_secs(1)).unwrap();
            let mut tx = backend.begin().unwrap();
            tx.insert_deck(&deck).unwrap();
            tx.commit().unwrap();
            assert_eq!(backend.path(), db_path);
        }

        let backend = SqliteBackend::open(&db_path, Duration::from_secs(1)).unwrap();
        assert_eq!(backend.get_deck(&deck.id).unwrap(), Some(deck));
        assert!(backend.size_bytes() > 0);
        let file = backend.database_file().unwrap();
        assert_eq!(file.path, db_path);
        assert_eq!(file.size_bytes, backend.size_bytes());

        drop(backend);
        cleanup(&db_path);
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let root = std::env::temp_dir().join(format!("flashdeck_test_{}", std::process::id()));
        let nested_path = root.join("nested").join("db.sqlite");
        let _ = std::fs::remove_dir_all(&root);

        let backend = SqliteBackend::open(&nested_path, Duration::from_secs(1)).unwrap();
        assert!(nested_path.exists());

        drop(backend);
        let _ = std::fs::remove_dir_all(&root);
    }
}
