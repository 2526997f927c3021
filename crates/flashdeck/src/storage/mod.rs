//! Storage layer for flashdeck.
//!
//! [`Store`] owns decks and flashcards through a pluggable [`Backend`] and
//! keeps every deck's `card_count` equal to the number of flashcards it owns.
//! Every mutation runs in a single backend [`Transaction`]: the record writes
//! and the recount commit together or not at all.

pub mod memory;
pub mod migrations;
pub mod schema;
pub mod sqlite;

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::{CardDraft, Deck, Flashcard, NewDeck, NewDeckWithCards, NewFlashcard};
use crate::validation::{Validate, ValidationError, Violation};

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

/// A persistence implementation for the store.
///
/// Reads go straight to the backend. Writes only happen through a
/// [`Transaction`] obtained from [`Backend::begin`].
pub trait Backend {
    /// The transaction type handed out by [`Backend::begin`].
    type Tx<'a>: Transaction
    where
        Self: 'a;

    /// Short name used in logs and status output.
    fn name(&self) -> &'static str;

    /// Start a write transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot start a transaction.
    fn begin(&mut self) -> Result<Self::Tx<'_>>;

    /// All decks.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    fn list_decks(&self) -> Result<Vec<Deck>>;

    /// Look up one deck.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    fn get_deck(&self, id: &str) -> Result<Option<Deck>>;

    /// Cards of a deck, ascending by `order`, ties in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    fn list_flashcards(&self, deck_id: &str) -> Result<Vec<Flashcard>>;

    /// Look up one flashcard.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    fn get_flashcard(&self, id: &str) -> Result<Option<Flashcard>>;

    /// Live number of flashcards carrying `deck_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    fn count_flashcards(&self, deck_id: &str) -> Result<u32>;

    /// Total (decks, flashcards).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    fn totals(&self) -> Result<(u64, u64)>;

    /// The file holding the data, for file-backed backends.
    fn database_file(&self) -> Option<DatabaseFile> {
        None
    }
}

/// A unit of writes applied all-or-nothing.
///
/// Dropping a transaction without calling [`Transaction::commit`] discards
/// its writes. Reads through the transaction see its own pending writes.
#[allow(clippy::missing_errors_doc)]
pub trait Transaction {
    /// Look up one deck.
    fn get_deck(&self, id: &str) -> Result<Option<Deck>>;
    /// Look up one flashcard.
    fn get_flashcard(&self, id: &str) -> Result<Option<Flashcard>>;
    /// Live number of flashcards carrying `deck_id`.
    fn count_flashcards(&self, deck_id: &str) -> Result<u32>;
    /// Highest `order` among a deck's cards.
    fn max_order(&self, deck_id: &str) -> Result<Option<i64>>;
    /// Insert a deck record as given.
    fn insert_deck(&mut self, deck: &Deck) -> Result<()>;
    /// Remove a deck record only. Returns whether it existed.
    fn delete_deck(&mut self, id: &str) -> Result<bool>;
    /// Insert a flashcard record as given.
    fn insert_flashcard(&mut self, card: &Flashcard) -> Result<()>;
    /// Remove one flashcard. Returns whether it existed.
    fn delete_flashcard(&mut self, id: &str) -> Result<bool>;
    /// Remove every flashcard carrying `deck_id`. Returns how many.
    fn delete_flashcards_of_deck(&mut self, deck_id: &str) -> Result<usize>;
    /// Overwrite a deck's stored count. Returns whether the deck exists.
    fn set_card_count(&mut self, deck_id: &str, count: u32) -> Result<bool>;
    /// Apply all writes.
    fn commit(self) -> Result<()>
    where
        Self: Sized;
}

/// Set a deck's stored count to its live count, inside `tx`.
///
/// This is the only place `card_count` is written after creation.
fn recount<T: Transaction>(tx: &mut T, deck_id: &str) -> Result<u32> {
    let count = tx.count_flashcards(deck_id)?;
    if tx.set_card_count(deck_id, count)? {
        debug!(deck_id, count, "recomputed card count");
    }
    Ok(count)
}

/// Totals reported by [`Store::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Number of decks.
    pub decks: u64,
    /// Number of flashcards across all decks.
    pub flashcards: u64,
}

/// Location and size of a backend's database file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseFile {
    /// Path to the file.
    pub path: PathBuf,
    /// Size on disk in bytes.
    pub size_bytes: u64,
}

/// A deck whose stored count disagrees with its live count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountDrift {
    /// The deck.
    pub deck_id: String,
    /// Value in the deck record.
    pub stored: u32,
    /// Number of flashcards actually owned.
    pub actual: u32,
}

/// A deck created together with its cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeckWithCards {
    /// The new deck, with its final card count.
    pub deck: Deck,
    /// The new cards, in order.
    pub cards: Vec<Flashcard>,
}

/// The deck and flashcard store.
///
/// Mutations take `&mut self`: a store has one owner, and concurrent callers
/// must go through something that serializes them (see
/// [`crate::service::DeckService`]).
#[derive(Debug)]
pub struct Store<B> {
    backend: B,
}

impl Store<MemoryBackend> {
    /// A store over a fresh in-memory backend.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }
}

impl<B: Backend> Store<B> {
    /// Wrap a backend.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// The underlying backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// All decks, in no guaranteed order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub fn list_decks(&self) -> Result<Vec<Deck>> {
        self.backend.list_decks()
    }

    /// Look up a deck. A missing deck is `None`, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub fn get_deck(&self, id: &str) -> Result<Option<Deck>> {
        self.backend.get_deck(id)
    }

    /// Create an empty deck.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a blank title, or a store error.
    pub fn create_deck(&mut self, new: NewDeck) -> Result<Deck> {
        new.validate()?;
        let deck = Deck::create(new);

        let mut tx = self.backend.begin()?;
        tx.insert_deck(&deck)?;
        tx.commit()?;

        debug!(deck_id = %deck.id, title = %deck.title, "created deck");
        Ok(deck)
    }

    /// Delete a deck and every flashcard it owns.
    ///
    /// Returns whether the deck existed. Flashcards carrying `id` are removed
    /// either way.
    ///
    /// # Errors
    ///
    /// Returns a store error; nothing is deleted in that case.
    pub fn delete_deck(&mut self, id: &str) -> Result<bool> {
        let mut tx = self.backend.begin()?;
        let removed_cards = tx.delete_flashcards_of_deck(id)?;
        let existed = tx.delete_deck(id)?;
        tx.commit()?;

        if existed {
            info!(deck_id = id, removed_cards, "deleted deck");
        } else if removed_cards > 0 {
            warn!(deck_id = id, removed_cards, "removed orphaned flashcards");
        } else {
            debug!(deck_id = id, "delete of unknown deck");
        }
        Ok(existed)
    }

    /// Cards of a deck sorted by `order`; empty for an unknown deck.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub fn list_flashcards(&self, deck_id: &str) -> Result<Vec<Flashcard>> {
        self.backend.list_flashcards(deck_id)
    }

    /// Look up a flashcard.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub fn get_flashcard(&self, id: &str) -> Result<Option<Flashcard>> {
        self.backend.get_flashcard(id)
    }

    /// Create a flashcard and update its deck's count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for blank fields, [`Error::NotFound`]
    /// when the deck does not exist, or a store error. Nothing is written in
    /// any of these cases.
    pub fn create_flashcard(&mut self, new: NewFlashcard) -> Result<Flashcard> {
        new.validate()?;
        let card = Flashcard::create(new);

        let mut tx = self.backend.begin()?;
        if tx.get_deck(&card.deck_id)?.is_none() {
            return Err(Error::deck_not_found(&card.deck_id));
        }
        tx.insert_flashcard(&card)?;
        recount(&mut tx, &card.deck_id)?;
        tx.commit()?;

        debug!(card_id = %card.id, deck_id = %card.deck_id, "created flashcard");
        Ok(card)
    }

    /// Delete a flashcard and update its deck's count.
    ///
    /// Returns whether the card existed.
    ///
    /// # Errors
    ///
    /// Returns a store error; nothing is deleted in that case.
    pub fn delete_flashcard(&mut self, id: &str) -> Result<bool> {
        let mut tx = self.backend.begin()?;
        let Some(card) = tx.get_flashcard(id)? else {
            debug!(card_id = id, "delete of unknown flashcard");
            return Ok(false);
        };
        tx.delete_flashcard(id)?;
        recount(&mut tx, &card.deck_id)?;
        tx.commit()?;

        debug!(card_id = id, deck_id = %card.deck_id, "deleted flashcard");
        Ok(true)
    }

    /// Set a deck's `card_count` to the exact number of flashcards it owns.
    ///
    /// Does nothing for an unknown deck.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub fn recompute_deck_card_count(&mut self, deck_id: &str) -> Result<()> {
        let mut tx = self.backend.begin()?;
        recount(&mut tx, deck_id)?;
        tx.commit()
    }

    /// Create a deck and its cards at once, ordered 0.. in the given sequence.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the deck or any card is invalid, or a
    /// store error. Nothing is written in either case.
    pub fn create_deck_with_cards(&mut self, input: NewDeckWithCards) -> Result<DeckWithCards> {
        input.validate()?;
        let mut deck = Deck::create(input.deck);

        let mut tx = self.backend.begin()?;
        tx.insert_deck(&deck)?;
        let cards = insert_drafts(&mut tx, &deck.id, 0, input.cards)?;
        deck.card_count = recount(&mut tx, &deck.id)?;
        tx.commit()?;

        info!(deck_id = %deck.id, cards = cards.len(), "created deck with cards");
        Ok(DeckWithCards { deck, cards })
    }

    /// Append cards after the deck's current highest `order`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if any draft is invalid,
    /// [`Error::NotFound`] for an unknown deck, or a store error.
    pub fn append_flashcards(
        &mut self,
        deck_id: &str,
        drafts: Vec<CardDraft>,
    ) -> Result<Vec<Flashcard>> {
        let mut violations = Vec::new();
        for (i, draft) in drafts.iter().enumerate() {
            draft.collect_violations(&format!("cards[{i}]."), &mut violations);
        }
        if !violations.is_empty() {
            return Err(ValidationError::new(violations).into());
        }

        let mut tx = self.backend.begin()?;
        if tx.get_deck(deck_id)?.is_none() {
            return Err(Error::deck_not_found(deck_id));
        }
        let start = match tx.max_order(deck_id)? {
            Some(max) => max.checked_add(1).ok_or_else(order_overflow)?,
            None => 0,
        };
        let cards = insert_drafts(&mut tx, deck_id, start, drafts)?;
        recount(&mut tx, deck_id)?;
        tx.commit()?;

        info!(deck_id, cards = cards.len(), "appended flashcards");
        Ok(cards)
    }

    /// Append one card after the deck's current highest `order`.
    ///
    /// # Errors
    ///
    /// Same as [`Store::append_flashcards`].
    pub fn append_flashcard(&mut self, deck_id: &str, draft: CardDraft) -> Result<Flashcard> {
        self.append_flashcards(deck_id, vec![draft])?
            .pop()
            .ok_or_else(|| Error::internal("append returned no card"))
    }

    /// Deck and flashcard totals.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub fn stats(&self) -> Result<StoreStats> {
        let (decks, flashcards) = self.backend.totals()?;
        Ok(StoreStats { decks, flashcards })
    }

    /// Decks whose stored count differs from the live count.
    ///
    /// Only possible when the database was changed outside this store.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub fn check_card_counts(&self) -> Result<Vec<CountDrift>> {
        let mut drifts = Vec::new();
        for deck in self.backend.list_decks()? {
            let actual = self.backend.count_flashcards(&deck.id)?;
            if actual != deck.card_count {
                warn!(deck_id = %deck.id, stored = deck.card_count, actual, "card count drift");
                drifts.push(CountDrift {
                    deck_id: deck.id,
                    stored: deck.card_count,
                    actual,
                });
            }
        }
        Ok(drifts)
    }

    /// Recount every drifting deck in one transaction. Returns how many.
    ///
    /// # Errors
    ///
    /// Returns a store error; no count is changed in that case.
    pub fn repair_card_counts(&mut self) -> Result<usize> {
        let drifts = self.check_card_counts()?;
        if drifts.is_empty() {
            return Ok(0);
        }

        let mut tx = self.backend.begin()?;
        for drift in &drifts {
            recount(&mut tx, &drift.deck_id)?;
        }
        tx.commit()?;

        info!(repaired = drifts.len(), "repaired card counts");
        Ok(drifts.len())
    }
}

/// Appended cards would need an `order` past `i64::MAX`.
fn order_overflow() -> Error {
    ValidationError::new(vec![Violation::new(
        "order",
        "no position left after the deck's last card",
    )])
    .into()
}

/// Insert drafts at consecutive orders from `start`.
///
/// Fails without finishing when the orders run past `i64::MAX`; the caller's
/// transaction is then dropped and nothing is written.
fn insert_drafts<T: Transaction>(
    tx: &mut T,
    deck_id: &str,
    start: i64,
    drafts: Vec<CardDraft>,
) -> Result<Vec<Flashcard>> {
    let mut cards = Vec::with_capacity(drafts.len());
    let mut next = Some(start);
    for draft in drafts {
        let order = next.ok_or_else(order_overflow)?;
        next = order.checked_add(1);
        let card = Flashcard::create(draft.into_new_flashcard(deck_id, order));
        tx.insert_flashcard(&card)?;
        cards.push(card);
    }
    Ok(cards)
}
