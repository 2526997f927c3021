//! Command-line interface for flashdeck.
//!
//! This module provides the CLI structure and output rendering for the
//! `flashdeck` binary.

mod commands;
pub mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    CardCommand, CheckCommand, ConfigCommand, DeckCommand, ImportCommand, OutputFormat,
    StatusCommand,
};

/// flashdeck - Study decks of flashcards
///
/// Manage decks and their cards from the command line. Every change keeps
/// each deck's card count exact.
#[derive(Debug, Parser)]
#[command(name = "flashdeck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage decks
    #[command(subcommand)]
    Deck(DeckCommand),

    /// Manage flashcards
    #[command(subcommand)]
    Card(CardCommand),

    /// Import cards from alternating front/back lines
    Import(ImportCommand),

    /// Verify (and optionally repair) deck card counts
    Check(CheckCommand),

    /// Show storage status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
