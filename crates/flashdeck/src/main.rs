//! `flashdeck` - CLI for flashdeck
//!
//! This binary provides the command-line interface for managing decks and
//! flashcards stored in the local database.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::Read;
use std::path::Path;

use anyhow::Context;
use clap::Parser;
use serde_json::json;
use tracing::{info, warn};

use flashdeck::cli::{
    render, CardCommand, CheckCommand, Cli, Command, ConfigCommand, DeckCommand, ImportCommand,
    OutputFormat, StatusCommand,
};
use flashdeck::config::BackendKind;
use flashdeck::import::parse_card_text;
use flashdeck::storage::{Backend, MemoryBackend, SqliteBackend};
use flashdeck::{init_logging, Config, DeckService, Store};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    let Cli {
        config: config_path,
        command,
        ..
    } = cli;

    // Config commands must work even when the config is broken
    if let Command::Config(config_cmd) = command {
        return handle_config(config_path.as_deref(), config_cmd);
    }

    let config = Config::load_from(config_path).context("failed to load configuration")?;

    match config.storage.backend {
        BackendKind::Sqlite => {
            let path = config.database_path();
            let backend = SqliteBackend::open(&path, config.busy_timeout())
                .with_context(|| format!("failed to open database {}", path.display()))?;
            let service = DeckService::new(Store::new(backend), config.service.clone());
            run(&service, command)
        }
        BackendKind::Memory => {
            warn!("Using the memory backend; changes are discarded on exit");
            let service =
                DeckService::new(Store::new(MemoryBackend::new()), config.service.clone());
            run(&service, command)
        }
    }
}

/// Dispatch a command that needs the store.
///
/// `Command::Config` never gets here: `main` handles it before loading the
/// configuration or opening a backend.
fn run<B: Backend>(service: &DeckService<B>, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Deck(cmd) => handle_deck(service, cmd),
        Command::Card(cmd) => handle_card(service, cmd),
        Command::Import(cmd) => handle_import(service, &cmd),
        Command::Check(cmd) => handle_check(service, &cmd),
        Command::Status(cmd) => handle_status(service, &cmd),
        Command::Config(_) => unreachable!("config commands are handled before a store is opened"),
    }
}

fn handle_deck<B: Backend>(service: &DeckService<B>, cmd: DeckCommand) -> anyhow::Result<()> {
    match cmd {
        DeckCommand::List { format } => {
            let decks = service.list_decks()?;
            if decks.is_empty() && format != OutputFormat::Json {
                println!("No decks.");
            } else {
                print!("{}", render::decks(&decks, format)?);
            }
        }
        DeckCommand::Show { id, format } => {
            let deck = service.get_deck(&id)?;
            let cards = service.list_flashcards(&id)?;
            if format == OutputFormat::Json {
                let shown = json!({ "deck": deck, "cards": cards });
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                print!("{}", render::deck(&deck, format)?);
                if !cards.is_empty() {
                    println!();
                    print!("{}", render::flashcards(&cards, format)?);
                }
            }
        }
        DeckCommand::Create {
            title,
            description,
            format,
        } => {
            let deck =
                service.create_deck(&json!({ "title": title, "description": description }))?;
            print!("{}", render::deck(&deck, format)?);
        }
        DeckCommand::Delete { id } => {
            service.delete_deck(&id)?;
            info!("Deleted deck {id}");
        }
    }
    Ok(())
}

fn handle_card<B: Backend>(service: &DeckService<B>, cmd: CardCommand) -> anyhow::Result<()> {
    match cmd {
        CardCommand::List { deck_id, format } => {
            // Distinguish an unknown deck from an empty one
            service.get_deck(&deck_id)?;
            let cards = service.list_flashcards(&deck_id)?;
            print!("{}", render::flashcards(&cards, format)?);
        }
        CardCommand::Add {
            deck_id,
            front,
            back,
            order,
            format,
        } => {
            let card = match order {
                Some(order) => service.create_flashcard(&json!({
                    "deckId": deck_id,
                    "front": front,
                    "back": back,
                    "order": order,
                }))?,
                None => {
                    service.append_flashcard(&deck_id, &json!({ "front": front, "back": back }))?
                }
            };
            print!("{}", render::flashcard(&card, format)?);
        }
        CardCommand::Delete { id } => {
            service.delete_flashcard(&id)?;
            info!("Deleted flashcard {id}");
        }
    }
    Ok(())
}

fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

fn handle_import<B: Backend>(service: &DeckService<B>, cmd: &ImportCommand) -> anyhow::Result<()> {
    let text = read_input(cmd.file.as_deref())?;

    if let Some(deck_id) = &cmd.into {
        let added = service.import_cards(deck_id, &text)?;
        info!("Imported {} card(s) into deck {deck_id}", added.len());
        print!("{}", render::flashcards(&added, cmd.format)?);
        return Ok(());
    }

    let cards = parse_card_text(&text);
    if cards.is_empty() {
        anyhow::bail!("input contains no front/back pair");
    }
    let created = service.create_deck_with_cards(&json!({
        "title": cmd.title,
        "description": cmd.description,
        "cards": cards,
    }))?;
    info!(
        "Created deck {} with {} card(s)",
        created.deck.id,
        created.cards.len()
    );
    if cmd.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&created)?);
    } else {
        print!("{}", render::deck(&created.deck, cmd.format)?);
    }
    Ok(())
}

fn handle_check<B: Backend>(service: &DeckService<B>, cmd: &CheckCommand) -> anyhow::Result<()> {
    let drift = service.check_card_counts()?;
    let repaired = if cmd.repair && !drift.is_empty() {
        service.repair_card_counts()?
    } else {
        0
    };

    if cmd.json {
        let report = json!({ "drift": drift, "repaired": repaired });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render::drift_report(&drift));
        if cmd.repair && repaired > 0 {
            println!("Repaired {repaired} deck(s).");
        } else if !drift.is_empty() {
            println!("Run with --repair to recount them.");
        }
    }
    Ok(())
}

fn handle_status<B: Backend>(service: &DeckService<B>, cmd: &StatusCommand) -> anyhow::Result<()> {
    let stats = service.stats()?;
    let file = service.database_file();

    if cmd.json {
        let status = json!({
            "backend": service.backend_name(),
            "database_path": file.as_ref().map(|f| &f.path),
            "database_size_bytes": file.as_ref().map(|f| f.size_bytes),
            "decks": stats.decks,
            "flashcards": stats.flashcards,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("flashdeck status");
        println!("----------------");
        println!("Backend:       {}", service.backend_name());
        if let Some(file) = &file {
            println!("Database:      {}", file.path.display());
            println!("Size:          {} bytes", file.size_bytes);
        }
        println!("Decks:         {}", stats.decks);
        println!("Flashcards:    {}", stats.flashcards);
    }
    Ok(())
}

fn handle_config(config_path: Option<&Path>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path.map(Path::to_path_buf))
                .context("failed to load configuration")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Backend:            {}", config.storage.backend);
                println!("  Database path:      {}", config.database_path().display());
                println!("  Busy timeout (ms):  {}", config.storage.busy_timeout_ms);
                println!();
                println!("[Service]");
                println!("  Strict deletes:     {}", config.service.strict_deletes);
            }
        }
        ConfigCommand::Path => {
            let path = config_path.map_or_else(Config::default_config_path, Path::to_path_buf);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or_else(|| config_path.map(Path::to_path_buf))
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => anyhow::bail!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
