//! Payload validation.
//!
//! Each entity has an explicit schema: [`Schema::parse`] turns a loosely
//! typed JSON payload into a typed input or a list of field-level
//! [`Violation`]s, and [`Validate`] re-checks typed inputs built in code.
//! Both share the same field rules, so a payload rejected here never reaches
//! the store.

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{CardDraft, NewDeck, NewDeckWithCards, NewFlashcard};

const EMPTY: &str = "must not be empty";
const REQUIRED: &str = "is required";

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Path of the offending field, e.g. `title` or `cards[2].back`.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl Violation {
    /// Create a violation.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

/// A payload was rejected. Carries every violation found, not just the first.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("validation failed: {}", join(.violations))]
pub struct ValidationError {
    /// The individual field violations, in field order.
    pub violations: Vec<Violation>,
}

fn join(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    /// Wrap a list of violations.
    #[must_use]
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    /// Whether a given field was rejected.
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

fn into_result(violations: Vec<Violation>) -> Result<(), ValidationError> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(violations))
    }
}

fn check_text(field: String, value: &str, out: &mut Vec<Violation>) {
    if value.trim().is_empty() {
        out.push(Violation::new(field, EMPTY));
    }
}

/// Field rules for a typed input.
pub trait Validate {
    /// Collect every violation, prefixing field names with `prefix`.
    fn collect_violations(&self, prefix: &str, out: &mut Vec<Violation>);

    /// All violations of this input.
    fn violations(&self) -> Vec<Violation> {
        let mut out = Vec::new();
        self.collect_violations("", &mut out);
        out
    }

    /// Succeed only when there are no violations.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing every violation.
    fn validate(&self) -> Result<(), ValidationError> {
        into_result(self.violations())
    }
}

impl Validate for NewDeck {
    fn collect_violations(&self, prefix: &str, out: &mut Vec<Violation>) {
        check_text(format!("{prefix}title"), &self.title, out);
    }
}

impl Validate for NewFlashcard {
    fn collect_violations(&self, prefix: &str, out: &mut Vec<Violation>) {
        check_text(format!("{prefix}deckId"), &self.deck_id, out);
        check_text(format!("{prefix}front"), &self.front, out);
        check_text(format!("{prefix}back"), &self.back, out);
    }
}

impl Validate for CardDraft {
    fn collect_violations(&self, prefix: &str, out: &mut Vec<Violation>) {
        check_text(format!("{prefix}front"), &self.front, out);
        check_text(format!("{prefix}back"), &self.back, out);
    }
}

impl Validate for NewDeckWithCards {
    fn collect_violations(&self, prefix: &str, out: &mut Vec<Violation>) {
        self.deck.collect_violations(prefix, out);
        for (i, card) in self.cards.iter().enumerate() {
            card.collect_violations(&format!("{prefix}cards[{i}]."), out);
        }
    }
}

/// Parse an untyped request payload into a typed input.
pub trait Schema: Sized {
    /// Parse `payload`, reporting every missing, mistyped or blank field.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when any field is rejected.
    fn parse(payload: &Value) -> Result<Self, ValidationError>;
}

/// Reads fields out of a JSON object while accumulating violations.
struct Fields<'a> {
    object: Option<&'a Map<String, Value>>,
    prefix: String,
    violations: Vec<Violation>,
}

impl<'a> Fields<'a> {
    fn new(payload: &'a Value, prefix: &str) -> Self {
        let mut fields = Self {
            object: payload.as_object(),
            prefix: prefix.to_string(),
            violations: Vec::new(),
        };
        if fields.object.is_none() {
            let name = if prefix.is_empty() {
                "payload".to_string()
            } else {
                prefix.trim_end_matches('.').to_string()
            };
            fields.violations.push(Violation::new(name, "must be an object"));
        }
        fields
    }

    fn path(&self, name: &str) -> String {
        format!("{}{name}", self.prefix)
    }

    fn get(&self, name: &str) -> Option<&'a Value> {
        self.object.and_then(|o| o.get(name))
    }

    fn required_text(&mut self, name: &str) -> Option<String> {
        if self.object.is_none() {
            return None;
        }
        match self.get(name) {
            None | Some(Value::Null) => {
                self.violations.push(Violation::new(self.path(name), REQUIRED));
                None
            }
            Some(Value::String(s)) => {
                check_text(self.path(name), s, &mut self.violations);
                Some(s.clone())
            }
            Some(_) => {
                self.violations
                    .push(Violation::new(self.path(name), "must be a string"));
                None
            }
        }
    }

    fn optional_text(&mut self, name: &str) -> Option<String> {
        match self.get(name) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                self.violations
                    .push(Violation::new(self.path(name), "must be a string or null"));
                None
            }
        }
    }

    fn required_integer(&mut self, name: &str) -> Option<i64> {
        if self.object.is_none() {
            return None;
        }
        match self.get(name) {
            None | Some(Value::Null) => {
                self.violations.push(Violation::new(self.path(name), REQUIRED));
                None
            }
            Some(Value::Number(n)) => {
                let value = n.as_i64();
                if value.is_none() {
                    self.violations
                        .push(Violation::new(self.path(name), "must be an integer"));
                }
                value
            }
            Some(_) => {
                self.violations
                    .push(Violation::new(self.path(name), "must be an integer"));
                None
            }
        }
    }

    fn optional_array(&mut self, name: &str) -> &'a [Value] {
        match self.get(name) {
            None | Some(Value::Null) => &[],
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.violations
                    .push(Violation::new(self.path(name), "must be an array"));
                &[]
            }
        }
    }

    fn finish<T>(self, value: Option<T>) -> Result<T, ValidationError> {
        match value {
            Some(value) if self.violations.is_empty() => Ok(value),
            _ => Err(ValidationError::new(self.violations)),
        }
    }
}

impl Schema for NewDeck {
    fn parse(payload: &Value) -> Result<Self, ValidationError> {
        let mut fields = Fields::new(payload, "");
        let title = fields.required_text("title");
        let description = fields.optional_text("description");
        fields.finish(title.map(|title| NewDeck { title, description }))
    }
}

impl Schema for NewFlashcard {
    fn parse(payload: &Value) -> Result<Self, ValidationError> {
        let mut fields = Fields::new(payload, "");
        let deck_id = fields.required_text("deckId");
        let front = fields.required_text("front");
        let back = fields.required_text("back");
        let order = fields.required_integer("order");
        let card = match (deck_id, front, back, order) {
            (Some(deck_id), Some(front), Some(back), Some(order)) => Some(NewFlashcard {
                deck_id,
                front,
                back,
                order,
            }),
            _ => None,
        };
        fields.finish(card)
    }
}

fn parse_draft(payload: &Value, prefix: &str, out: &mut Vec<Violation>) -> Option<CardDraft> {
    let mut fields = Fields::new(payload, prefix);
    let front = fields.required_text("front");
    let back = fields.required_text("back");
    out.append(&mut fields.violations);
    Some(CardDraft::new(front?, back?))
}

impl Schema for CardDraft {
    fn parse(payload: &Value) -> Result<Self, ValidationError> {
        let mut violations = Vec::new();
        match parse_draft(payload, "", &mut violations) {
            Some(draft) if violations.is_empty() => Ok(draft),
            _ => Err(ValidationError::new(violations)),
        }
    }
}

impl Schema for NewDeckWithCards {
    fn parse(payload: &Value) -> Result<Self, ValidationError> {
        let mut fields = Fields::new(payload, "");
        let title = fields.required_text("title");
        let description = fields.optional_text("description");
        let items = fields.optional_array("cards");

        let mut cards = Vec::with_capacity(items.len());
        let mut card_violations = Vec::new();
        for (i, item) in items.iter().enumerate() {
            if let Some(draft) = parse_draft(item, &format!("cards[{i}]."), &mut card_violations) {
                cards.push(draft);
            }
        }
        fields.violations.append(&mut card_violations);

        fields.finish(title.map(|title| NewDeckWithCards {
            deck: NewDeck { title, description },
            cards,
        }))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_deck() {
        let deck = NewDeck::parse(&json!({"title": "Bio"})).unwrap();
        assert_eq!(deck.title, "Bio");
        assert!(deck.description.is_none());

        let deck = NewDeck::parse(&json!({"title": "Bio", "description": null})).unwrap();
        assert!(deck.description.is_none());

        let deck = NewDeck::parse(&json!({"title": "Bio", "description": "cells"})).unwrap();
        assert_eq!(deck.description.as_deref(), Some("cells"));
    }

    #[test]
    fn test_parse_deck_ignores_client_card_count() {
        let deck = NewDeck::parse(&json!({"title": "Bio", "cardCount": 99})).unwrap();
        assert_eq!(deck, NewDeck::titled("Bio"));
    }

    #[test]
    fn test_parse_deck_rejects_empty_title() {
        let err = NewDeck::parse(&json!({"title": ""})).unwrap_err();
        assert!(err.has_field("title"));

        let err = NewDeck::parse(&json!({"title": "   "})).unwrap_err();
        assert!(err.has_field("title"));
    }

    #[test]
    fn test_parse_deck_rejects_missing_and_mistyped() {
        let err = NewDeck::parse(&json!({})).unwrap_err();
        assert_eq!(err.violations, vec![Violation::new("title", REQUIRED)]);

        let err = NewDeck::parse(&json!({"title": 5, "description": 7})).unwrap_err();
        assert!(err.has_field("title"));
        assert!(err.has_field("description"));
    }

    #[test]
    fn test_parse_non_object() {
        let err = NewDeck::parse(&json!("Bio")).unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert!(err.has_field("payload"));
    }

    #[test]
    fn test_parse_flashcard() {
        let card = NewFlashcard::parse(&json!({
            "deckId": "d1", "front": "Q1", "back": "A1", "order": 0
        }))
        .unwrap();
        assert_eq!(card, NewFlashcard::new("d1", "Q1", "A1", 0));
    }

    #[test]
    fn test_parse_flashcard_collects_all_violations() {
        let err = NewFlashcard::parse(&json!({"front": "", "back": "A", "order": 1.5})).unwrap_err();
        assert!(err.has_field("deckId"));
        assert!(err.has_field("front"));
        assert!(err.has_field("order"));
        assert!(!err.has_field("back"));
        assert_eq!(err.violations.len(), 3);
    }

    #[test]
    fn test_parse_flashcard_order_must_be_integer() {
        let err = NewFlashcard::parse(&json!({
            "deckId": "d1", "front": "Q", "back": "A", "order": "1"
        }))
        .unwrap_err();
        assert_eq!(err.violations, vec![Violation::new("order", "must be an integer")]);
    }

    #[test]
    fn test_parse_deck_with_cards() {
        let input = NewDeckWithCards::parse(&json!({
            "title": "Polish",
            "cards": [
                {"front": "cześć", "back": "hello"},
                {"front": "proszę", "back": "please"}
            ]
        }))
        .unwrap();
        assert_eq!(input.deck.title, "Polish");
        assert_eq!(input.cards.len(), 2);
        assert_eq!(input.cards[1], CardDraft::new("proszę", "please"));
    }

    #[test]
    fn test_parse_deck_with_cards_reports_indexed_fields() {
        let err = NewDeckWithCards::parse(&json!({
            "title": "Polish",
            "cards": [
                {"front": "cześć", "back": "hello"},
                {"front": "dziękuję", "back": ""},
                "oops"
            ]
        }))
        .unwrap_err();
        assert!(err.has_field("cards[1].back"));
        assert!(err.has_field("cards[2]"));
        assert_eq!(err.violations.len(), 2);
    }

    #[test]
    fn test_parse_card_draft() {
        let draft = CardDraft::parse(&json!({"front": "Q", "back": "A"})).unwrap();
        assert_eq!(draft, CardDraft::new("Q", "A"));

        let err = CardDraft::parse(&json!({"front": " "})).unwrap_err();
        assert_eq!(
            err.violations,
            vec![Violation::new("front", EMPTY), Violation::new("back", REQUIRED)]
        );

        let err = CardDraft::parse(&json!([1, 2])).unwrap_err();
        assert!(err.has_field("payload"));
    }

    #[test]
    fn test_validate_typed_inputs() {
        assert!(NewDeck::titled("Bio").validate().is_ok());
        assert!(NewDeck::titled("").validate().is_err());

        let err = NewFlashcard::new("d1", " ", "", 0).validate().unwrap_err();
        assert!(err.has_field("front"));
        assert!(err.has_field("back"));

        let input = NewDeckWithCards {
            deck: NewDeck::titled("Bio"),
            cards: vec![CardDraft::new("Q", "A"), CardDraft::new("", "A")],
        };
        let err = input.validate().unwrap_err();
        assert_eq!(err.violations, vec![Violation::new("cards[1].front", EMPTY)]);
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new(vec![
            Violation::new("title", EMPTY),
            Violation::new("order", REQUIRED),
        ]);
        assert_eq!(
            err.to_string(),
            "validation failed: title must not be empty; order is required"
        );
    }
}
