// UI layer: the interactive menu shell built on `dialoguer`, plus the
// renderers the one-shot CLI shares with it.
// Every menu entry builds an `Action` and hands it to the dispatcher, so the
// shell never talks to the remote service directly.

use crate::api::RemoteFiles;
use crate::client::FileClient;
use crate::commands::{self, Action, Outcome};
use crate::config::ApiKey;
use crate::error::{describe, Error};
use crate::export;
use crate::models::{RemoteFile, SearchResult};
use crate::session::Session;
use anyhow::Result;
use crossterm::style::Stylize;
use dialoguer::{Confirm, Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

const MENU: [&str; 11] = [
    "Configure API key",
    "Upload document",
    "List remote files",
    "Search a document",
    "Search all session files",
    "Delete a file",
    "Show search history",
    "Export search history",
    "Clear search history",
    "Reset session",
    "Exit",
];

/// Run the interactive menu until the user chooses "Exit". `initial_key`
/// (from the environment or `--api-key`) is validated up front; if it is
/// rejected the session simply starts unconfigured.
pub fn main_menu<R: RemoteFiles>(client: &FileClient<R>, initial_key: Option<ApiKey>) -> Result<()> {
    let mut session = Session::new();
    println!("{}", "Google File Search".bold());
    println!("Upload documents and ask questions about them.\n");

    if let Some(key) = initial_key {
        run(client, &mut session, Action::Configure(key));
    }

    loop {
        print_status(&session);
        let selection = Select::new().items(&MENU).default(0).interact()?;
        let action = match selection {
            0 => prompt_key()?,
            1 => prompt_upload()?,
            2 => Some(Action::List),
            3 => prompt_search(&session)?,
            4 => prompt_search_all(&session)?,
            5 => prompt_delete(&session)?,
            6 => Some(Action::History),
            7 => prompt_export(&session)?,
            8 => Confirm::new()
                .with_prompt("Clear the search history?")
                .default(false)
                .interact()?
                .then_some(Action::ClearHistory),
            9 => Confirm::new()
                .with_prompt("Forget the API key, uploaded files and history? Remote files are kept.")
                .default(false)
                .interact()?
                .then_some(Action::Reset),
            _ => break,
        };
        if let Some(action) = action {
            run(client, &mut session, action);
        }
        println!();
    }
    Ok(())
}

/// Dispatch one action and print its outcome. Errors are shown and the
/// shell carries on; they never end the session.
fn run<R: RemoteFiles>(client: &FileClient<R>, session: &mut Session, action: Action) {
    let spinner = spinner_message(&action).map(spinner);
    let result = commands::execute(client, session, action);
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    match result {
        Ok(outcome) => print_outcome(&outcome),
        Err(e) => print_error(&e),
    }
}

fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Local actions answer instantly and get no spinner.
fn spinner_message(action: &Action) -> Option<&'static str> {
    match action {
        Action::Configure(_) => Some("Checking API key..."),
        Action::Upload { .. } => Some("Uploading..."),
        Action::List => Some("Listing files..."),
        Action::Search { .. } | Action::SearchAll { .. } => Some("Searching..."),
        Action::Delete(_) => Some("Deleting..."),
        Action::Export(_) => Some("Exporting..."),
        Action::History | Action::ClearHistory | Action::Reset => None,
    }
}

fn print_status(session: &Session) {
    let api = if session.is_configured() {
        "API connected".green()
    } else {
        "API not configured".red()
    };
    println!(
        "[{}] files this session: {}, searches: {}",
        api,
        session.store.files().count(),
        session.store.history().len()
    );
}

/// `Password` hides the key as it is typed. An empty entry falls back to
/// `GOOGLE_API_KEY` when it is set.
fn prompt_key() -> Result<Option<Action>> {
    let typed: String = Password::new()
        .with_prompt("Google API key (leave empty to use GOOGLE_API_KEY)")
        .allow_empty_password(true)
        .interact()?;
    let key = ApiKey::new(typed);
    if !key.is_empty() {
        return Ok(Some(Action::Configure(key)));
    }
    match ApiKey::from_env() {
        Some(key) => Ok(Some(Action::Configure(key))),
        None => {
            println!("No key entered and GOOGLE_API_KEY is not set.");
            Ok(None)
        }
    }
}

fn prompt_upload() -> Result<Option<Action>> {
    let path: String = Input::new()
        .with_prompt("Document path (pdf, txt, docx, csv, json)")
        .interact_text()?;
    let display_name: String = Input::new()
        .with_prompt("Display name (empty for file name)")
        .allow_empty(true)
        .interact_text()?;
    let display_name = Some(display_name.trim().to_string()).filter(|n| !n.is_empty());
    Ok(Some(Action::Upload {
        path: PathBuf::from(path.trim()),
        display_name,
    }))
}

/// Pick a file uploaded this session, or type any remote id.
fn choose_file(session: &Session, prompt: &str) -> Result<Option<String>> {
    let files: Vec<&RemoteFile> = session.store.files().collect();
    if !files.is_empty() {
        let mut items: Vec<String> = files
            .iter()
            .map(|f| format!("{} ({})", f.display_name, f.id))
            .collect();
        items.push("Enter a file id...".to_string());
        items.push("Cancel".to_string());
        let choice = Select::new().with_prompt(prompt).items(&items).default(0).interact()?;
        if choice < files.len() {
            return Ok(Some(files[choice].id.clone()));
        }
        if choice == files.len() + 1 {
            return Ok(None);
        }
    }
    let id: String = Input::new()
        .with_prompt("File id (e.g. files/abc123)")
        .interact_text()?;
    Ok(Some(id.trim().to_string()).filter(|id| !id.is_empty()))
}

fn prompt_search(session: &Session) -> Result<Option<Action>> {
    let Some(file_id) = choose_file(session, "Search which file?")? else {
        return Ok(None);
    };
    let query: String = Input::new()
        .with_prompt("Query")
        .interact_text()?;
    Ok(Some(Action::Search { file_id, query }))
}

fn prompt_search_all(session: &Session) -> Result<Option<Action>> {
    let count = session.store.files().count();
    if count == 0 {
        println!("No files uploaded this session; upload one first.");
        return Ok(None);
    }
    let query: String = Input::new()
        .with_prompt(format!("Query across {} file(s)", count))
        .interact_text()?;
    Ok(Some(Action::SearchAll { query }))
}

fn prompt_delete(session: &Session) -> Result<Option<Action>> {
    let Some(file_id) = choose_file(session, "Delete which file?")? else {
        return Ok(None);
    };
    let label = match session.store.file(&file_id) {
        Some(file) => format!("{} ({})", file.display_name, file_id),
        None => file_id.clone(),
    };
    let confirmed = Confirm::new()
        .with_prompt(format!("Delete {} from the remote service?", label))
        .default(false)
        .interact()?;
    Ok(confirmed.then_some(Action::Delete(file_id)))
}

fn prompt_export(session: &Session) -> Result<Option<Action>> {
    if session.store.history().is_empty() {
        println!("No searches yet; the export will be an empty list.");
    }
    let path: String = Input::new()
        .with_prompt("Export to")
        .default(export::default_file_name())
        .interact_text()?;
    Ok(Some(Action::Export(PathBuf::from(path.trim()))))
}

/// Print the result of a successful action to stdout.
pub fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Configured => println!("{}", "API key accepted.".green()),
        Outcome::Uploaded(file) => {
            println!("{} {}", "Uploaded".green(), file.id.clone().bold());
            print_file(file);
        }
        Outcome::Listed(files) => print_files(files),
        Outcome::Searched(result) => print_result(result),
        Outcome::Deleted(id) => println!("{} {}", "Deleted".green(), id),
        Outcome::Exported { path, entries } => {
            println!("Exported {} search(es) to {}", entries, path.display())
        }
        Outcome::History { recent, total } => print_history(recent, *total),
        Outcome::HistoryCleared => println!("Search history cleared."),
        Outcome::SessionReset => println!("Session reset. Configure an API key to continue."),
    }
}

/// Human-readable error with its causes, on stderr.
pub fn print_error(err: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), describe(err));
}

fn print_file(file: &RemoteFile) {
    println!("  name:     {}", file.display_name);
    println!("  size:     {} bytes", file.size);
    println!("  type:     {}", file.mime_type);
    println!("  state:    {}", file.state.label());
    println!("  uploaded: {}", file.upload_time.format("%Y-%m-%d %H:%M:%S"));
}

pub fn print_files(files: &[RemoteFile]) {
    if files.is_empty() {
        println!("No files found.");
        return;
    }
    for file in files {
        println!(
            "{}  {}  ({} bytes, {})",
            file.id.clone().bold(),
            file.display_name,
            file.size,
            file.state.label()
        );
    }
}

pub fn print_result(result: &SearchResult) {
    let confidence = match result.confidence {
        Some(c) if c >= 0.75 => format!("{:.0}%", c * 100.0).green(),
        Some(c) if c >= 0.4 => format!("{:.0}%", c * 100.0).yellow(),
        Some(c) => format!("{:.0}%", c * 100.0).red(),
        None => "unknown".to_string().dark_grey(),
    };
    println!("{}", "Answer".bold());
    println!("{}\n", result.answer);
    if !result.snippets.is_empty() {
        println!("{}", "Relevant excerpts".bold());
        for snippet in &result.snippets {
            println!("  > {}", snippet.text);
        }
        println!();
    }
    if !result.sources.is_empty() {
        println!("{}", "Sources".bold());
        for source in &result.sources {
            println!("  - {}", source);
        }
        println!();
    }
    println!("Confidence: {}", confidence);
    println!("Searched at {}", result.timestamp.format("%Y-%m-%d %H:%M:%S"));
}

/// `recent` is newest first; entries are numbered by their place in the
/// full history of `total` searches.
fn print_history(recent: &[SearchResult], total: usize) {
    if recent.is_empty() {
        println!("No search history yet.");
        return;
    }
    if recent.len() < total {
        println!("Showing the last {} of {} searches.", recent.len(), total);
    }
    for (i, result) in recent.iter().enumerate() {
        let answer: String = result.answer.chars().take(120).collect();
        println!(
            "{}. {} [{}]",
            total - i,
            result.query.clone().bold(),
            result.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
        println!("   {}", answer);
    }
}
