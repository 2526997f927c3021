//! Text rendering of records for command output.

use std::fmt::Write as _;

use serde::Serialize;

use super::OutputFormat;
use crate::model::{Deck, Flashcard};
use crate::storage::CountDrift;

/// Longest cell rendered in table output before truncation.
const MAX_CELL: usize = 40;

fn to_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_CELL {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX_CELL - 3).collect();
        format!("{head}...")
    }
}

/// Render one deck.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn deck(deck: &Deck, format: OutputFormat) -> serde_json::Result<String> {
    if format == OutputFormat::Json {
        return to_json(deck);
    }
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", deck.title, deck.id);
    if let Some(description) = &deck.description {
        let _ = writeln!(out, "  {description}");
    }
    let _ = writeln!(out, "  cards: {}", deck.card_count);
    Ok(out)
}

/// Render a list of decks.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn decks(decks: &[Deck], format: OutputFormat) -> serde_json::Result<String> {
    let mut out = String::new();
    match format {
        OutputFormat::Json => return to_json(decks),
        OutputFormat::Plain => {
            for d in decks {
                let _ = writeln!(out, "{}\t{}\t{}", d.id, d.card_count, d.title);
            }
        }
        OutputFormat::Table => {
            let _ = writeln!(out, "{:<36}  {:>5}  TITLE", "ID", "CARDS");
            for d in decks {
                let _ = writeln!(
                    out,
                    "{:<36}  {:>5}  {}",
                    d.id,
                    d.card_count,
                    truncate(&d.title)
                );
            }
        }
    }
    Ok(out)
}

/// Render a list of flashcards.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn flashcards(cards: &[Flashcard], format: OutputFormat) -> serde_json::Result<String> {
    let mut out = String::new();
    match format {
        OutputFormat::Json => return to_json(cards),
        OutputFormat::Plain => {
            for c in cards {
                let _ = writeln!(out, "[{}] {}\n    {}", c.order, c.front, c.back);
            }
        }
        OutputFormat::Table => {
            let _ = writeln!(
                out,
                "{:>5}  {:<36}  {:<MAX_CELL$}  BACK",
                "ORDER", "ID", "FRONT"
            );
            for c in cards {
                let _ = writeln!(
                    out,
                    "{:>5}  {:<36}  {:<MAX_CELL$}  {}",
                    c.order,
                    c.id,
                    truncate(&c.front),
                    truncate(&c.back)
                );
            }
        }
    }
    Ok(out)
}

/// Render one flashcard.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn flashcard(card: &Flashcard, format: OutputFormat) -> serde_json::Result<String> {
    if format == OutputFormat::Json {
        return to_json(card);
    }
    Ok(format!(
        "{} (deck {}, order {})\n  front: {}\n  back:  {}\n",
        card.id, card.deck_id, card.order, card.front, card.back
    ))
}

/// Render the result of a card count check.
#[must_use]
pub fn drift_report(drift: &[CountDrift]) -> String {
    if drift.is_empty() {
        return "All deck card counts are consistent.\n".to_string();
    }
    let mut out = format!("{} deck(s) with drifted card counts:\n", drift.len());
    for d in drift {
        let _ = writeln!(
            out,
            "  {}: stored {}, actual {}",
            d.deck_id, d.stored, d.actual
        );
    }
    out
}
