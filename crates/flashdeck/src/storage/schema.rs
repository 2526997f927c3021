//! `SQLite` schema definitions for flashdeck.
//!
//! Flashcards reference their deck by `deck_id` without a foreign key: the
//! store performs the cascade itself, inside the same transaction as the
//! deck delete.

/// SQL statement to create the decks table.
pub const CREATE_DECKS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS decks (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    card_count INTEGER NOT NULL DEFAULT 0 CHECK (card_count >= 0)
)
";

/// SQL statement to create the flashcards table.
///
/// `sort_order` holds the record's `order` field, which is a reserved word.
pub const CREATE_FLASHCARDS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS flashcards (
    id TEXT PRIMARY KEY NOT NULL,
    deck_id TEXT NOT NULL,
    front TEXT NOT NULL,
    back TEXT NOT NULL,
    sort_order INTEGER NOT NULL
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// Index backing per-deck listing, counting and cascading deletes.
pub const CREATE_FLASHCARDS_DECK_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_flashcards_deck ON flashcards(deck_id, sort_order)
";

/// Base tables, created before migrations run.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_DECKS_TABLE,
    CREATE_FLASHCARDS_TABLE,
    CREATE_METADATA_TABLE,
];
