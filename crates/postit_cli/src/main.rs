//! Line-oriented smoke driver for `postit_core`.
//!
//! # Responsibility
//! - Wire config, logging, store and a note session the way a UI shell would.
//! - Keep output plain so the core can be exercised by hand or by script.

use chrono::{Local, TimeZone};
use clap::Parser;
use log::info;
use postit_core::{
    core_version, init_logging, open_store, CoreConfig, Note, NoteSession, Notice, Notifier,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "commands:
  add <text>          create a post-it
  edit <id> <text>    replace the text of a post-it
  delete <id>         delete a post-it
  list                show all post-its, newest first
  help                show this message
  quit                exit";

#[derive(Debug, Parser)]
#[command(name = "postit", version)]
#[command(about = "Line-oriented driver for the post-it board")]
struct Cli {
    /// JSON config file; POSTIT_* environment variables override it
    #[arg(long, env = "POSTIT_CONFIG")]
    config: Option<PathBuf>,
}

/// Prints notices the way a toast would show them.
struct StdoutNotifier;

impl Notifier for StdoutNotifier {
    fn notify(&self, notice: Notice) {
        let marker = if notice.is_error() { "!" } else { "*" };
        println!("{marker} {}", notice.message());
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Add(&'a str),
    Edit { id: &'a str, content: &'a str },
    Delete(&'a str),
    List,
    Help,
    Quit,
    Unknown(&'a str),
}

fn parse_command(line: &str) -> Option<Command<'_>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let command = match verb {
        "add" => Command::Add(rest),
        "edit" => match rest.split_once(char::is_whitespace) {
            Some((id, content)) => Command::Edit {
                id,
                content: content.trim(),
            },
            None => Command::Unknown(line),
        },
        "delete" if !rest.is_empty() => Command::Delete(rest),
        "list" => Command::List,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => Command::Unknown(line),
    };
    Some(command)
}

fn format_created_at(ms: i64) -> String {
    Local
        .timestamp_millis_opt(ms)
        .single()
        .map(|at| at.format("%d/%m/%Y %H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}

fn print_notes(notes: &[Note]) {
    if notes.is_empty() {
        println!("(no post-its)");
        return;
    }
    for note in notes {
        println!(
            "{}  {}  {}",
            note.id,
            format_created_at(note.created_at),
            note.content
        );
    }
}

fn load_config(cli: &Cli) -> Result<CoreConfig, Box<dyn Error>> {
    let config = match &cli.config {
        Some(path) => CoreConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => CoreConfig::default(),
    };
    Ok(config.with_env_overrides(|name| std::env::var(name).ok())?)
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = load_config(&cli)?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(config.effective_log_level(), log_dir)?;
    }
    info!(
        "event=cli_start module=cli status=ok version={} collection={}",
        core_version(),
        config.collection
    );

    let store = Arc::new(open_store(&config)?);
    let session = NoteSession::start(store, Arc::new(StdoutNotifier));

    println!("postit {} collection={}", core_version(), config.collection);
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(command) = parse_command(&line) else {
            continue;
        };
        match command {
            Command::Add(text) => {
                session.set_draft_content(text);
                if let Ok(task) = session.add_note() {
                    task.await?;
                }
            }
            Command::Edit { id, content } => session.edit_note(id, content).await?,
            Command::Delete(id) => session.delete_note(id).await?,
            Command::List => print_notes(&session.state().notes),
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
            Command::Unknown(raw) => println!("unknown command `{raw}`; try `help`"),
        }
    }

    info!("event=cli_exit module=cli status=ok");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("postit: {err}");
            ExitCode::FAILURE
        }
    }
}
