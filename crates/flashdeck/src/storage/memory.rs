//! In-process storage backend.
//!
//! Records live in hash maps keyed by id, each tagged with an insertion
//! sequence number so listings keep creation order. A per-deck index of card
//! ids keeps counts and deck listings proportional to the deck, not the
//! whole store. A transaction writes in place and keeps an undo log; dropping
//! it without committing replays the log backwards.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::error::{Error, Result};
use crate::model::{Deck, Flashcard};

use super::{Backend, Transaction};

/// A stored record and its insertion sequence number.
#[derive(Debug, Clone)]
struct Entry<T> {
    seq: u64,
    record: T,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_seq: u64,
    decks: HashMap<String, Entry<Deck>>,
    flashcards: HashMap<String, Entry<Flashcard>>,
    /// Card ids per `deck_id`, including decks that do not exist.
    deck_cards: HashMap<String, HashSet<String>>,
}

impl MemoryState {
    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn put_flashcard(&mut self, entry: Entry<Flashcard>) {
        self.deck_cards
            .entry(entry.record.deck_id.clone())
            .or_default()
            .insert(entry.record.id.clone());
        self.flashcards.insert(entry.record.id.clone(), entry);
    }

    fn take_flashcard(&mut self, id: &str) -> Option<Entry<Flashcard>> {
        let entry = self.flashcards.remove(id)?;
        if let Some(ids) = self.deck_cards.get_mut(&entry.record.deck_id) {
            ids.remove(id);
            if ids.is_empty() {
                self.deck_cards.remove(&entry.record.deck_id);
            }
        }
        Some(entry)
    }

    fn card_ids(&self, deck_id: &str) -> Vec<String> {
        self.deck_cards
            .get(deck_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn owned_by<'a>(&'a self, deck_id: &str) -> impl Iterator<Item = &'a Entry<Flashcard>> + 'a {
        self.deck_cards
            .get(deck_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.flashcards.get(id))
    }

    fn sorted_decks(&self) -> Vec<Deck> {
        let mut entries: Vec<&Entry<Deck>> = self.decks.values().collect();
        entries.sort_by_key(|e| e.seq);
        entries.into_iter().map(|e| e.record.clone()).collect()
    }

    fn sorted_cards(&self, deck_id: &str) -> Vec<Flashcard> {
        let mut entries: Vec<&Entry<Flashcard>> = self.owned_by(deck_id).collect();
        // Equal orders keep insertion order.
        entries.sort_by_key(|e| (e.record.order, e.seq));
        entries.into_iter().map(|e| e.record.clone()).collect()
    }

    fn count(&self, deck_id: &str) -> Result<u32> {
        let n = self.deck_cards.get(deck_id).map_or(0, HashSet::len);
        u32::try_from(n).map_err(|_| Error::internal(format!("card count overflow: {n}")))
    }
}

/// Storage backend kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: MemoryState,
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for MemoryBackend {
    type Tx<'a> = MemoryTransaction<'a>;

    fn name(&self) -> &'static str {
        "memory"
    }

    fn begin(&mut self) -> Result<MemoryTransaction<'_>> {
        Ok(MemoryTransaction {
            state: &mut self.state,
            undo: Vec::new(),
        })
    }

    fn list_decks(&self) -> Result<Vec<Deck>> {
        Ok(self.state.sorted_decks())
    }

    fn get_deck(&self, id: &str) -> Result<Option<Deck>> {
        Ok(self.state.decks.get(id).map(|e| e.record.clone()))
    }

    fn list_flashcards(&self, deck_id: &str) -> Result<Vec<Flashcard>> {
        Ok(self.state.sorted_cards(deck_id))
    }

    fn get_flashcard(&self, id: &str) -> Result<Option<Flashcard>> {
        Ok(self.state.flashcards.get(id).map(|e| e.record.clone()))
    }

    fn count_flashcards(&self, deck_id: &str) -> Result<u32> {
        self.state.count(deck_id)
    }

    fn totals(&self) -> Result<(u64, u64)> {
        Ok((
            self.state.decks.len() as u64,
            self.state.flashcards.len() as u64,
        ))
    }
}

/// One reversible write.
#[derive(Debug)]
enum Undo {
    InsertDeck(String),
    RemoveDeck(Entry<Deck>),
    InsertFlashcard(String),
    RemoveFlashcard(Entry<Flashcard>),
    SetCount { deck_id: String, previous: u32 },
}

/// A pending set of writes against a [`MemoryBackend`].
///
/// Writes are applied immediately; dropping the transaction uncommitted
/// reverts them.
#[derive(Debug)]
pub struct MemoryTransaction<'a> {
    state: &'a mut MemoryState,
    undo: Vec<Undo>,
}

impl MemoryTransaction<'_> {
    fn rollback(&mut self) {
        trace!(steps = self.undo.len(), "rolling back memory transaction");
        while let Some(step) = self.undo.pop() {
            match step {
                Undo::InsertDeck(id) => {
                    self.state.decks.remove(&id);
                }
                Undo::RemoveDeck(entry) => {
                    self.state.decks.insert(entry.record.id.clone(), entry);
                }
                Undo::InsertFlashcard(id) => {
                    self.state.take_flashcard(&id);
                }
                Undo::RemoveFlashcard(entry) => self.state.put_flashcard(entry),
                Undo::SetCount { deck_id, previous } => {
                    if let Some(entry) = self.state.decks.get_mut(&deck_id) {
                        entry.record.card_count = previous;
                    }
                }
            }
        }
    }
}

impl Drop for MemoryTransaction<'_> {
    fn drop(&mut self) {
        if !self.undo.is_empty() {
            self.rollback();
        }
    }
}

impl Transaction for MemoryTransaction<'_> {
    fn get_deck(&self, id: &str) -> Result<Option<Deck>> {
        Ok(self.state.decks.get(id).map(|e| e.record.clone()))
    }

    fn get_flashcard(&self, id: &str) -> Result<Option<Flashcard>> {
        Ok(self.state.flashcards.get(id).map(|e| e.record.clone()))
    }

    fn count_flashcards(&self, deck_id: &str) -> Result<u32> {
        self.state.count(deck_id)
    }

    fn max_order(&self, deck_id: &str) -> Result<Option<i64>> {
        Ok(self.state.owned_by(deck_id).map(|e| e.record.order).max())
    }

    fn insert_deck(&mut self, deck: &Deck) -> Result<()> {
        if self.state.decks.contains_key(&deck.id) {
            return Err(Error::internal(format!("duplicate deck id: {}", deck.id)));
        }
        let seq = self.state.next_seq();
        self.state.decks.insert(
            deck.id.clone(),
            Entry {
                seq,
                record: deck.clone(),
            },
        );
        self.undo.push(Undo::InsertDeck(deck.id.clone()));
        Ok(())
    }

    fn delete_deck(&mut self, id: &str) -> Result<bool> {
        match self.state.decks.remove(id) {
            Some(entry) => {
                self.undo.push(Undo::RemoveDeck(entry));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn insert_flashcard(&mut self, card: &Flashcard) -> Result<()> {
        if self.state.flashcards.contains_key(&card.id) {
            return Err(Error::internal(format!("duplicate flashcard id: {}", card.id)));
        }
        let seq = self.state.next_seq();
        self.state.put_flashcard(Entry {
            seq,
            record: card.clone(),
        });
        self.undo.push(Undo::InsertFlashcard(card.id.clone()));
        Ok(())
    }

    fn delete_flashcard(&mut self, id: &str) -> Result<bool> {
        match self.state.take_flashcard(id) {
            Some(entry) => {
                self.undo.push(Undo::RemoveFlashcard(entry));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_flashcards_of_deck(&mut self, deck_id: &str) -> Result<usize> {
        let ids = self.state.card_ids(deck_id);
        for id in &ids {
            if let Some(entry) = self.state.take_flashcard(id) {
                self.undo.push(Undo::RemoveFlashcard(entry));
            }
        }
        Ok(ids.len())
    }

    fn set_card_count(&mut self, deck_id: &str, count: u32) -> Result<bool> {
        let Some(entry) = self.state.decks.get_mut(deck_id) else {
            return Ok(false);
        };
        let previous = std::mem::replace(&mut entry.record.card_count, count);
        self.undo.push(Undo::SetCount {
            deck_id: deck_id.to_string(),
            previous,
        });
        Ok(true)
    }

    fn commit(mut self) -> Result<()> {
        trace!(writes = self.undo.len(), "committing memory transaction");
        self.undo.clear();
        Ok(())
    }
}
