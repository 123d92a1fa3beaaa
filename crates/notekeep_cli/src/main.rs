//! Command-line driver over the notes store.
//!
//! # Responsibility
//! - Validate user input before it reaches the store.
//! - Render store state and outcomes; all persistence stays in core.

use clap::{Parser, Subcommand};
use log::info;
use notekeep_core::{
    CoreConfig, Note, NoteDraft, NoteId, NoteValidationError, SqliteNoteStore,
    PREVIEW_DEFAULT_CHARS,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

/// NoteKeep - local notes
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite file holding the notes (overrides NOTEKEEP_DB_PATH)
    #[arg(long, value_name = "FILE", global = true)]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List notes, most recent first
    List {
        /// Print the raw collection as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one note in full
    Show { id: String },

    /// Create a note
    Add { title: String, content: String },

    /// Replace title and content of a note
    Edit {
        id: String,
        title: String,
        content: String,
    },

    /// Delete a note
    Rm { id: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = CoreConfig::from_env()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    config.init_logging()?;

    let store = config.open_store()?;
    if let Some(error) = store.error() {
        eprintln!("warning: {error}");
    }

    match cli.command {
        Commands::List { json } => {
            let notes = store.notes();
            if json {
                println!("{}", serde_json::to_string_pretty(&notes)?);
            } else if notes.is_empty() {
                println!("No notes yet.");
            } else {
                for note in &notes {
                    print_summary(note);
                }
            }
        }
        Commands::Show { id } => {
            let note = find(&store, &id)?;
            print_full(&note);
        }
        Commands::Add { title, content } => {
            let draft = checked_draft(title, content)?;
            let note = store.add(&draft)?;
            info!("event=cli_add module=cli status=ok note_id={}", note.id);
            println!("Note saved.");
            print_summary(&note);
        }
        Commands::Edit { id, title, content } => {
            let draft = checked_draft(title, content)?;
            let note = store.edit(&NoteId::from(id), &draft)?;
            println!("Note updated.");
            print_summary(&note);
        }
        Commands::Rm { id } => {
            let id = NoteId::from(id);
            if store.remove(&id) {
                println!("Note deleted.");
            } else if let Some(error) = store.error() {
                return Err(error.into());
            } else {
                println!("No note with id {id}.");
            }
        }
    }
    Ok(())
}

/// Rejects blank fields; the text itself is stored exactly as typed.
fn checked_draft(title: String, content: String) -> Result<NoteDraft, NoteValidationError> {
    let draft = NoteDraft::new(title, content);
    draft.validate()?;
    Ok(draft)
}

fn find(store: &SqliteNoteStore, id: &str) -> Result<Note, String> {
    store
        .get(&NoteId::from(id))
        .ok_or_else(|| format!("Note not found: {id}"))
}

fn print_summary(note: &Note) {
    let edited = if note.is_edited() { " (edited)" } else { "" };
    println!("{}  {}{}", note.id, note.title, edited);
    println!("    {}", note.preview(PREVIEW_DEFAULT_CHARS));
}

fn print_full(note: &Note) {
    println!("id:          {}", note.id);
    println!("title:       {}", note.title);
    println!("created_at:  {}", note.created_at);
    match note.last_updated {
        Some(at) => println!("last_update: {at}"),
        None => println!("last_update: never"),
    }
    println!();
    println!("{}", note.content);
}
