//! Access facade over the store.
//!
//! [`DeckService`] is what a transport layer (HTTP handlers, the CLI) talks
//! to. It takes request payloads as JSON values, validates them, and maps
//! missing records to [`Error::NotFound`]. The store sits behind a mutex, so
//! a service can be shared between threads and mutations never interleave.

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::import::parse_card_text;
use crate::model::{CardDraft, Deck, Flashcard, NewDeck, NewDeckWithCards, NewFlashcard};
use crate::storage::{Backend, CountDrift, DatabaseFile, DeckWithCards, Store, StoreStats};
use crate::validation::{Schema, ValidationError, Violation};

/// Shared, validated access to a [`Store`].
#[derive(Debug)]
pub struct DeckService<B> {
    store: Mutex<Store<B>>,
    config: ServiceConfig,
}

impl<B: Backend> DeckService<B> {
    /// Wrap a store.
    #[must_use]
    pub fn new(store: Store<B>, config: ServiceConfig) -> Self {
        Self {
            store: Mutex::new(store),
            config,
        }
    }

    /// Name of the backing storage.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.store.lock().backend().name()
    }

    /// The backend's database file, if it has one.
    #[must_use]
    pub fn database_file(&self) -> Option<DatabaseFile> {
        self.store.lock().backend().database_file()
    }

    /// List all decks.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub fn list_decks(&self) -> Result<Vec<Deck>> {
        self.store.lock().list_decks()
    }

    /// Get one deck.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id, or a store error.
    pub fn get_deck(&self, id: &str) -> Result<Deck> {
        self.store
            .lock()
            .get_deck(id)?
            .ok_or_else(|| Error::deck_not_found(id))
    }

    /// Create a deck from a `{title, description?}` payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a malformed payload, or a store error.
    pub fn create_deck(&self, payload: &Value) -> Result<Deck> {
        let new = NewDeck::parse(payload)?;
        self.store.lock().create_deck(new)
    }

    /// Delete a deck and its flashcards.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id when strict deletes are
    /// configured, or a store error.
    pub fn delete_deck(&self, id: &str) -> Result<()> {
        let existed = self.store.lock().delete_deck(id)?;
        self.absent_delete(existed, || Error::deck_not_found(id))
    }

    /// List a deck's flashcards in order. Empty for an unknown deck.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub fn list_flashcards(&self, deck_id: &str) -> Result<Vec<Flashcard>> {
        self.store.lock().list_flashcards(deck_id)
    }

    /// Get one flashcard.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id, or a store error.
    pub fn get_flashcard(&self, id: &str) -> Result<Flashcard> {
        self.store
            .lock()
            .get_flashcard(id)?
            .ok_or_else(|| Error::flashcard_not_found(id))
    }

    /// Create a flashcard from a `{deckId, front, back, order}` payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a malformed payload,
    /// [`Error::NotFound`] for an unknown deck, or a store error.
    pub fn create_flashcard(&self, payload: &Value) -> Result<Flashcard> {
        let new = NewFlashcard::parse(payload)?;
        self.store.lock().create_flashcard(new)
    }

    /// Append a card from a `{front, back}` payload after the deck's last card.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a malformed payload or when no
    /// position is left after the last card, [`Error::NotFound`] for an
    /// unknown deck, or a store error.
    pub fn append_flashcard(&self, deck_id: &str, payload: &Value) -> Result<Flashcard> {
        let draft = CardDraft::parse(payload)?;
        self.store.lock().append_flashcard(deck_id, draft)
    }

    /// Delete a flashcard.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id when strict deletes are
    /// configured, or a store error.
    pub fn delete_flashcard(&self, id: &str) -> Result<()> {
        let existed = self.store.lock().delete_flashcard(id)?;
        self.absent_delete(existed, || Error::flashcard_not_found(id))
    }

    /// Create a deck with cards from a `{title, description?, cards: [{front, back}]}`
    /// payload, all or nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a malformed payload, or a store error.
    pub fn create_deck_with_cards(&self, payload: &Value) -> Result<DeckWithCards> {
        let input = NewDeckWithCards::parse(payload)?;
        self.store.lock().create_deck_with_cards(input)
    }

    /// Append cards parsed from alternating front/back lines to a deck.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the text holds no complete card,
    /// [`Error::NotFound`] for an unknown deck, or a store error.
    pub fn import_cards(&self, deck_id: &str, text: &str) -> Result<Vec<Flashcard>> {
        let drafts = parse_card_text(text);
        if drafts.is_empty() {
            return Err(ValidationError::new(vec![Violation::new(
                "text",
                "contains no front/back pair",
            )])
            .into());
        }
        self.store.lock().append_flashcards(deck_id, drafts)
    }

    /// Deck and flashcard totals.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub fn stats(&self) -> Result<StoreStats> {
        self.store.lock().stats()
    }

    /// Decks whose stored card count has drifted.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub fn check_card_counts(&self) -> Result<Vec<CountDrift>> {
        self.store.lock().check_card_counts()
    }

    /// Recount drifting decks; returns how many were fixed.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub fn repair_card_counts(&self) -> Result<usize> {
        self.store.lock().repair_card_counts()
    }

    fn absent_delete(&self, existed: bool, not_found: impl FnOnce() -> Error) -> Result<()> {
        if existed || !self.config.strict_deletes {
            Ok(())
        } else {
            let err = not_found();
            debug!("strict delete rejected: {err}");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use serde_json::json;

    use super::*;
    use crate::storage::{MemoryBackend, SqliteBackend};

    fn service() -> DeckService<MemoryBackend> {
        DeckService::new(Store::in_memory(), ServiceConfig::default())
    }

    fn strict_service() -> DeckService<MemoryBackend> {
        DeckService::new(
            Store::in_memory(),
            ServiceConfig {
                strict_deletes: true,
            },
        )
    }

    #[test]
    fn test_deck_lifecycle() {
        let svc = service();
        let deck = svc.create_deck(&json!({"title": "Bio"})).unwrap();
        assert_eq!(deck.card_count, 0);
        assert_eq!(svc.get_deck(&deck.id).unwrap(), deck);
        assert_eq!(svc.list_decks().unwrap().len(), 1);

        svc.delete_deck(&deck.id).unwrap();
        assert!(svc.get_deck(&deck.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_get_missing_deck_is_not_found() {
        let err = service().get_deck("missing").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "deck not found: missing");
    }

    #[test]
    fn test_create_deck_rejects_empty_title() {
        let svc = service();
        let err = svc.create_deck(&json!({"title": ""})).unwrap_err();
        match err {
            Error::Validation(v) => assert!(v.has_field("title")),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(svc.list_decks().unwrap().is_empty());
    }

    #[test]
    fn test_flashcard_payload_scenario() {
        let svc = service();
        let deck = svc.create_deck(&json!({"title": "Bio"})).unwrap();
        let card = svc
            .create_flashcard(&json!({
                "deckId": deck.id, "front": "Q1", "back": "A1", "order": 0
            }))
            .unwrap();
        assert_eq!(svc.get_deck(&deck.id).unwrap().card_count, 1);
        assert_eq!(svc.get_flashcard(&card.id).unwrap(), card);

        svc.delete_flashcard(&card.id).unwrap();
        assert_eq!(svc.get_deck(&deck.id).unwrap().card_count, 0);
        assert!(svc.get_flashcard(&card.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_create_flashcard_for_unknown_deck() {
        let svc = service();
        let err = svc
            .create_flashcard(&json!({
                "deckId": "missing", "front": "Q", "back": "A", "order": 0
            }))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_append_flashcard_goes_after_last_card() {
        let svc = service();
        let deck = svc.create_deck(&json!({"title": "Bio"})).unwrap();
        svc.create_flashcard(&json!({
            "deckId": deck.id, "front": "Q", "back": "A", "order": i64::MAX
        }))
        .unwrap();

        let err = svc
            .append_flashcard(&deck.id, &json!({"front": "Q2", "back": "A2"}))
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(svc.get_deck(&deck.id).unwrap().card_count, 1);

        let other = svc.create_deck(&json!({"title": "Chem"})).unwrap();
        let card = svc
            .append_flashcard(&other.id, &json!({"front": "Q", "back": "A"}))
            .unwrap();
        assert_eq!(card.order, 0);
        assert_eq!(svc.get_deck(&other.id).unwrap().card_count, 1);

        let err = svc
            .append_flashcard(&other.id, &json!({"front": "", "back": "A"}))
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_lenient_deletes_of_unknown_ids() {
        let svc = service();
        assert!(svc.delete_deck("missing").is_ok());
        assert!(svc.delete_flashcard("missing").is_ok());
    }

    #[test]
    fn test_strict_deletes_of_unknown_ids() {
        let svc = strict_service();
        assert!(svc.delete_deck("missing").unwrap_err().is_not_found());
        assert!(svc.delete_flashcard("missing").unwrap_err().is_not_found());

        let deck = svc.create_deck(&json!({"title": "Bio"})).unwrap();
        assert!(svc.delete_deck(&deck.id).is_ok());
    }

    #[test]
    fn test_create_deck_with_cards_payload() {
        let svc = service();
        let created = svc
            .create_deck_with_cards(&json!({
                "title": "Polish Vocabulary",
                "description": "Basics",
                "cards": [
                    {"front": "cześć", "back": "hello"},
                    {"front": "dziękuję", "back": "thank you"}
                ]
            }))
            .unwrap();
        assert_eq!(created.deck.card_count, 2);
        assert_eq!(created.deck.description.as_deref(), Some("Basics"));
        assert_eq!(svc.list_flashcards(&created.deck.id).unwrap().len(), 2);
    }

    #[test]
    fn test_import_cards() {
        let svc = service();
        let deck = svc.create_deck(&json!({"title": "Capitals"})).unwrap();
        let added = svc
            .import_cards(&deck.id, "France\nParis\n\nPoland\nWarsaw\nSpain")
            .unwrap();
        assert_eq!(added.len(), 2);
        assert_eq!(svc.get_deck(&deck.id).unwrap().card_count, 2);

        let err = svc.import_cards(&deck.id, "only one line").unwrap_err();
        assert!(err.is_validation());
        assert_eq!(svc.get_deck(&deck.id).unwrap().card_count, 2);
    }

    #[test]
    fn test_concurrent_creates_keep_count() {
        let svc = Arc::new(DeckService::new(
            Store::new(SqliteBackend::open_in_memory().unwrap()),
            ServiceConfig::default(),
        ));
        let deck = svc.create_deck(&json!({"title": "Bio"})).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let svc = Arc::clone(&svc);
                let deck_id = deck.id.clone();
                thread::spawn(move || {
                    for i in 0..10 {
                        svc.create_flashcard(&json!({
                            "deckId": deck_id, "front": format!("Q{t}-{i}"), "back": "A", "order": i
                        }))
                        .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(svc.get_deck(&deck.id).unwrap().card_count, 40);
        assert_eq!(svc.list_flashcards(&deck.id).unwrap().len(), 40);
    }

    #[test]
    fn test_backend_name_and_stats() {
        let svc = service();
        assert_eq!(svc.backend_name(), "memory");
        assert!(svc.database_file().is_none());
        svc.create_deck(&json!({"title": "Bio"})).unwrap();
        assert_eq!(svc.stats().unwrap().decks, 1);
        assert!(svc.check_card_counts().unwrap().is_empty());
        assert_eq!(svc.repair_card_counts().unwrap(), 0);
    }
}
