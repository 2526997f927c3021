//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

/// Deck commands.
#[derive(Debug, Subcommand)]
pub enum DeckCommand {
    /// List all decks
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show one deck with its cards
    Show {
        /// Deck id
        id: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Create an empty deck
    Create {
        /// Deck title
        title: String,

        /// Optional description
        #[arg(short, long)]
        description: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Delete a deck and all of its cards
    Delete {
        /// Deck id
        id: String,
    },
}

/// Flashcard commands.
#[derive(Debug, Subcommand)]
pub enum CardCommand {
    /// List a deck's cards in order
    List {
        /// Deck id
        deck_id: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Add a card to a deck
    Add {
        /// Deck id
        deck_id: String,

        /// Prompt side
        front: String,

        /// Answer side
        back: String,

        /// Position in the deck (defaults to after the last card)
        #[arg(short, long, allow_negative_numbers = true)]
        order: Option<i64>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Delete a card
    Delete {
        /// Card id
        id: String,
    },
}

/// Import command arguments.
///
/// Reads alternating front/back lines. Creates a new deck titled `TITLE`, or
/// appends to an existing deck with `--into`.
#[derive(Debug, Args)]
pub struct ImportCommand {
    /// Title of the deck to create
    #[arg(required_unless_present = "into", conflicts_with = "into")]
    pub title: Option<String>,

    /// Append to this existing deck instead of creating one
    #[arg(long, value_name = "DECK_ID")]
    pub into: Option<String>,

    /// Description for the new deck
    #[arg(short, long, conflicts_with = "into")]
    pub description: Option<String>,

    /// File to read (defaults to stdin)
    #[arg(short = 'F', long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Check command arguments.
#[derive(Debug, Args)]
pub struct CheckCommand {
    /// Recount decks whose stored card count has drifted
    #[arg(long)]
    pub repair: bool,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }

    #[test]
    fn test_deck_command_debug() {
        let cmd = DeckCommand::Delete {
            id: "d1".to_string(),
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Delete"));
        assert!(debug_str.contains("d1"));
    }

    #[test]
    fn test_check_command_debug() {
        let cmd = CheckCommand {
            repair: true,
            json: false,
        };
        assert!(format!("{cmd:?}").contains("repair"));
    }
}
