// Shared command dispatcher. The CLI and the interactive shell both turn
// user input into an `Action` and hand it here with the session, so both
// surfaces behave identically.

use crate::api::RemoteFiles;
use crate::client::FileClient;
use crate::config::ApiKey;
use crate::error::Result;
use crate::export;
use crate::models::{RemoteFile, SearchResult};
use crate::session::Session;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone)]
pub enum Action {
    Configure(ApiKey),
    Upload {
        path: PathBuf,
        display_name: Option<String>,
    },
    List,
    Search {
        file_id: String,
        query: String,
    },
    /// Search every file uploaded during this session at once.
    SearchAll {
        query: String,
    },
    Delete(String),
    Export(PathBuf),
    History,
    ClearHistory,
    Reset,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Configure(_) => "configure",
            Action::Upload { .. } => "upload",
            Action::List => "list",
            Action::Search { .. } => "search",
            Action::SearchAll { .. } => "search-all",
            Action::Delete(_) => "delete",
            Action::Export(_) => "export",
            Action::History => "history",
            Action::ClearHistory => "clear-history",
            Action::Reset => "reset",
        }
    }
}

/// What a successful action produced, for the shell to render.
#[derive(Debug, Clone)]
pub enum Outcome {
    Configured,
    Uploaded(RemoteFile),
    Listed(Vec<RemoteFile>),
    Searched(SearchResult),
    Deleted(String),
    Exported { path: PathBuf, entries: usize },
    /// Newest results first, capped at `HISTORY_PANEL`; `total` counts all.
    History { recent: Vec<SearchResult>, total: usize },
    HistoryCleared,
    SessionReset,
}

/// How many past results the history view shows.
pub const HISTORY_PANEL: usize = 10;

/// Run one action against the session. A failed action leaves the session
/// exactly as it was; only local actions work before a key is configured.
pub fn execute<R: RemoteFiles>(client: &FileClient<R>, session: &mut Session, action: Action) -> Result<Outcome> {
    debug!(action = action.name(), "executing");
    match action {
        Action::Configure(key) => {
            client.configure(&key)?;
            session.set_api_key(key);
            Ok(Outcome::Configured)
        }
        Action::Upload { path, display_name } => {
            let key = session.api_key()?;
            let file = client.upload(key, &path, display_name.as_deref())?;
            session.store.record_upload(file.clone());
            Ok(Outcome::Uploaded(file))
        }
        Action::List => {
            let key = session.api_key()?;
            Ok(Outcome::Listed(client.list(key)?))
        }
        Action::Search { file_id, query } => {
            let key = session.api_key()?;
            let result = client.search(key, &file_id, &query)?;
            session.store.push_result(result.clone());
            Ok(Outcome::Searched(result))
        }
        Action::SearchAll { query } => {
            let key = session.api_key()?;
            let ids: Vec<&str> = session.store.files().map(|f| f.id.as_str()).collect();
            let result = client.search_files(key, &ids, &query)?;
            session.store.push_result(result.clone());
            Ok(Outcome::Searched(result))
        }
        Action::Delete(file_id) => {
            let key = session.api_key()?;
            client.delete(key, &file_id)?;
            session.store.forget(&file_id);
            Ok(Outcome::Deleted(file_id))
        }
        Action::Export(path) => {
            let history = session.store.history();
            export::write_history(history, &path)?;
            Ok(Outcome::Exported {
                entries: history.len(),
                path,
            })
        }
        Action::History => Ok(Outcome::History {
            recent: session.store.recent(HISTORY_PANEL).cloned().collect(),
            total: session.store.history().len(),
        }),
        Action::ClearHistory => {
            session.store.clear_history();
            Ok(Outcome::HistoryCleared)
        }
        Action::Reset => {
            session.reset();
            Ok(Outcome::SessionReset)
        }
    }
}
