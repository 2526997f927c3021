//! Pasted-text card import.
//!
//! Text is read as alternating lines: a front, then its back. Blank lines are
//! skipped and surrounding whitespace trimmed, so cards may be separated by
//! empty lines. A final front without a back is dropped.

use crate::model::CardDraft;

/// Parse alternating front/back lines into drafts.
#[must_use]
pub fn parse_card_text(text: &str) -> Vec<CardDraft> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    lines
        .chunks_exact(2)
        .map(|pair| CardDraft::new(pair[0], pair[1]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_lines() {
        let cards = parse_card_text("What is 2+2?\n4\nCapital of France?\nParis\n");
        assert_eq!(
            cards,
            vec![
                CardDraft::new("What is 2+2?", "4"),
                CardDraft::new("Capital of France?", "Paris"),
            ]
        );
    }

    #[test]
    fn test_skips_blank_lines_and_trims() {
        let cards = parse_card_text("  cześć \n\n   hello\n\n\n proszę\r\nplease  ");
        assert_eq!(
            cards,
            vec![
                CardDraft::new("cześć", "hello"),
                CardDraft::new("proszę", "please"),
            ]
        );
    }

    #[test]
    fn test_drops_trailing_unpaired_line() {
        let cards = parse_card_text("Q1\nA1\nQ2");
        assert_eq!(cards, vec![CardDraft::new("Q1", "A1")]);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_card_text("").is_empty());
        assert!(parse_card_text("\n  \n").is_empty());
    }
}
