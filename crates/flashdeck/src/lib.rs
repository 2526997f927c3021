//! `flashdeck` - Decks of flashcards with a consistent card store
//!
//! This library provides the deck and flashcard records, a transactional
//! store that keeps every deck's `card_count` exact, payload validation, and
//! a thread-safe access facade.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod import;
pub mod logging;
pub mod model;
pub mod service;
pub mod storage;
pub mod validation;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use model::{CardDraft, Deck, Flashcard, NewDeck, NewDeckWithCards, NewFlashcard};
pub use service::DeckService;
pub use storage::{MemoryBackend, SqliteBackend, Store, StoreStats};
pub use validation::{Schema, Validate, ValidationError};
