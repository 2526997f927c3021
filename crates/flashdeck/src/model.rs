//! Core record types for flashdeck.
//!
//! This module defines the persisted Deck and Flashcard records and the
//! validated inputs used to create them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate a fresh opaque record identifier.
#[must_use]
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// A named collection of flashcards.
///
/// `card_count` is derived: the store keeps it equal to the number of
/// flashcards whose `deck_id` is this deck's `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    /// Unique identifier, assigned at creation.
    pub id: String,
    /// Display title, never blank.
    pub title: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Number of flashcards owned by this deck.
    pub card_count: u32,
}

impl Deck {
    /// Build a new, empty deck record with a fresh id.
    #[must_use]
    pub fn create(new: NewDeck) -> Self {
        Self {
            id: new_id(),
            title: new.title,
            description: new.description,
            card_count: 0,
        }
    }
}

/// A front/back pair belonging to exactly one deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    /// Unique identifier, assigned at creation.
    pub id: String,
    /// The owning deck.
    pub deck_id: String,
    /// Prompt side.
    pub front: String,
    /// Answer side.
    pub back: String,
    /// Position within the deck; lists are sorted ascending by this.
    pub order: i64,
}

impl Flashcard {
    /// Build a new flashcard record with a fresh id.
    #[must_use]
    pub fn create(new: NewFlashcard) -> Self {
        Self {
            id: new_id(),
            deck_id: new.deck_id,
            front: new.front,
            back: new.back,
            order: new.order,
        }
    }
}

/// Input for creating a deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDeck {
    /// Deck title.
    pub title: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}

impl NewDeck {
    /// Create a deck input with no description.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
        }
    }
}

/// Input for creating a flashcard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFlashcard {
    /// The owning deck.
    pub deck_id: String,
    /// Prompt side.
    pub front: String,
    /// Answer side.
    pub back: String,
    /// Position within the deck.
    pub order: i64,
}

impl NewFlashcard {
    /// Create a flashcard input.
    #[must_use]
    pub fn new(
        deck_id: impl Into<String>,
        front: impl Into<String>,
        back: impl Into<String>,
        order: i64,
    ) -> Self {
        Self {
            deck_id: deck_id.into(),
            front: front.into(),
            back: back.into(),
            order,
        }
    }
}

/// A card without a deck or position yet.
///
/// Drafts come from bulk inputs (deck creation with cards, text import);
/// the store assigns `deck_id` and `order` when they are persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDraft {
    /// Prompt side.
    pub front: String,
    /// Answer side.
    pub back: String,
}

impl CardDraft {
    /// Create a draft.
    #[must_use]
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
        }
    }

    /// Attach the draft to a deck at the given position.
    #[must_use]
    pub fn into_new_flashcard(self, deck_id: &str, order: i64) -> NewFlashcard {
        NewFlashcard {
            deck_id: deck_id.to_string(),
            front: self.front,
            back: self.back,
            order,
        }
    }
}

/// Input for creating a deck together with its initial cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDeckWithCards {
    /// The deck to create.
    #[serde(flatten)]
    pub deck: NewDeck,
    /// Cards in display order.
    #[serde(default)]
    pub cards: Vec<CardDraft>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_deck_starts_empty() {
        let deck = Deck::create(NewDeck::titled("Bio"));
        assert_eq!(deck.title, "Bio");
        assert_eq!(deck.card_count, 0);
        assert!(deck.description.is_none());
        assert!(!deck.id.is_empty());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Deck::create(NewDeck::titled("A"));
        let b = Deck::create(NewDeck::titled("A"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_deck_serializes_camel_case() {
        let deck = Deck {
            id: "d1".to_string(),
            title: "Bio".to_string(),
            description: None,
            card_count: 3,
        };
        let json = serde_json::to_value(&deck).unwrap();
        assert_eq!(json["cardCount"], 3);
        assert!(json["description"].is_null());
    }

    #[test]
    fn test_flashcard_serializes_camel_case() {
        let card = Flashcard::create(NewFlashcard::new("d1", "Q", "A", 2));
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["deckId"], "d1");
        assert_eq!(json["order"], 2);
    }

    #[test]
    fn test_draft_into_new_flashcard() {
        let new = CardDraft::new("cześć", "hello").into_new_flashcard("d1", 4);
        assert_eq!(new.deck_id, "d1");
        assert_eq!(new.front, "cześć");
        assert_eq!(new.order, 4);
    }
}
