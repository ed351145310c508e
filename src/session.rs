// Per-session state: the files uploaded during this run, the search
// history and the API key. Lives only as long as the process and is passed
// explicitly to every operation.

use crate::config::ApiKey;
use crate::error::{Error, Result};
use crate::models::{RemoteFile, SearchResult};
use std::collections::BTreeMap;

/// In-memory bookkeeping of uploads and searches. Snippet file ids in the
/// history are not checked against `uploaded_files`.
#[derive(Debug, Default)]
pub struct SessionStore {
    uploaded_files: BTreeMap<String, RemoteFile>,
    history: Vec<SearchResult>,
}

impl SessionStore {
    pub fn record_upload(&mut self, file: RemoteFile) {
        self.uploaded_files.insert(file.id.clone(), file);
    }

    /// Drop a file reference; returns it if it was known.
    pub fn forget(&mut self, id: &str) -> Option<RemoteFile> {
        self.uploaded_files.remove(id)
    }

    pub fn push_result(&mut self, result: SearchResult) {
        self.history.push(result);
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn files(&self) -> impl Iterator<Item = &RemoteFile> {
        self.uploaded_files.values()
    }

    pub fn file(&self, id: &str) -> Option<&RemoteFile> {
        self.uploaded_files.get(id)
    }

    pub fn history(&self) -> &[SearchResult] {
        &self.history
    }

    /// The last `n` results, newest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &SearchResult> {
        self.history.iter().rev().take(n)
    }
}

/// One interactive run: its store plus the key that was validated for it.
#[derive(Debug, Default)]
pub struct Session {
    pub store: SessionStore,
    api_key: Option<ApiKey>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a key that has already passed `FileClient::configure`.
    pub fn set_api_key(&mut self, key: ApiKey) {
        self.api_key = Some(key);
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn api_key(&self) -> Result<&ApiKey> {
        self.api_key.as_ref().ok_or(Error::NotConfigured)
    }

    /// Forget everything, including the key.
    pub fn reset(&mut self) {
        *self = Session::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileState;
    use chrono::Utc;

    fn file(id: &str) -> RemoteFile {
        RemoteFile {
            id: id.into(),
            display_name: format!("{id}.txt"),
            size: 1,
            upload_time: Utc::now(),
            state: FileState::Active,
            mime_type: "text/plain".into(),
            uri: String::new(),
        }
    }

    fn result(query: &str) -> SearchResult {
        SearchResult {
            query: query.into(),
            answer: String::new(),
            snippets: vec![],
            sources: vec![],
            confidence: None,
            timestamp: Utc::now(),
            raw_response: String::new(),
        }
    }

    #[test]
    fn test_record_and_forget() {
        let mut store = SessionStore::default();
        store.record_upload(file("files/a"));
        store.record_upload(file("files/b"));
        assert_eq!(store.files().count(), 2);
        assert!(store.forget("files/a").is_some());
        assert!(store.forget("files/a").is_none());
        assert!(store.file("files/b").is_some());
    }

    #[test]
    fn test_recent_is_newest_first() {
        let mut store = SessionStore::default();
        for q in ["one", "two", "three"] {
            store.push_result(result(q));
        }
        let recent: Vec<_> = store.recent(2).map(|r| r.query.as_str()).collect();
        assert_eq!(recent, vec!["three", "two"]);
        store.clear_history();
        assert!(store.history().is_empty());
    }

    #[test]
    fn test_unconfigured_session_has_no_key() {
        let mut session = Session::new();
        assert!(matches!(session.api_key(), Err(Error::NotConfigured)));
        session.set_api_key(ApiKey::new("k"));
        assert!(session.is_configured());
        session.reset();
        assert!(!session.is_configured());
    }
}
