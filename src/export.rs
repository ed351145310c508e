// JSON export of the search history. The file is written to a temporary
// sibling first and renamed into place, so readers never see a partial
// document.

use crate::error::{Error, Result};
use crate::models::SearchResult;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Serialize `history` as a pretty-printed JSON array.
pub fn to_json(history: &[SearchResult]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(history)
}

/// Write `history` to `path` atomically.
pub fn write_history(history: &[SearchResult], path: &Path) -> Result<()> {
    let export_err = |source: std::io::Error| Error::Export {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let json = to_json(history).map_err(|e| export_err(e.into()))?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(export_err)?;
    tmp.write_all(json.as_bytes()).map_err(export_err)?;
    tmp.write_all(b"\n").map_err(export_err)?;
    tmp.as_file().sync_all().map_err(export_err)?;
    tmp.persist(path).map_err(|e| export_err(e.error))?;
    Ok(())
}

/// Default export file name, e.g. `search_history_20240501_101500.json`.
pub fn default_file_name() -> String {
    format!("search_history_{}.json", chrono::Local::now().format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Snippet;
    use chrono::Utc;

    fn result(query: &str) -> SearchResult {
        SearchResult {
            query: query.into(),
            answer: format!("answer to {query}"),
            snippets: vec![Snippet {
                text: "excerpt".into(),
                source_file_id: "files/a".into(),
            }],
            sources: vec!["a.txt".into()],
            confidence: Some(0.5),
            timestamp: Utc::now(),
            raw_response: String::new(),
        }
    }

    #[test]
    fn test_to_json_is_array_of_results() {
        assert_eq!(to_json(&[]).unwrap(), "[]");
        let json = to_json(&[result("q")]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["query"], "q");
        assert_eq!(value[0]["confidence"], 0.5);
    }

    #[test]
    fn test_empty_history_is_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        write_history(&[], &path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value.as_array().map(|a| a.len()), Some(0));
    }

    #[test]
    fn test_history_keeps_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let history: Vec<_> = ["first", "second", "third"].iter().map(|q| result(q)).collect();
        write_history(&history, &path).unwrap();

        let parsed: Vec<SearchResult> = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.len(), 3);
        let queries: Vec<_> = parsed.iter().map(|r| r.query.as_str()).collect();
        assert_eq!(queries, vec!["first", "second", "third"]);
        assert_eq!(parsed[0].snippets[0].source_file_id, "files/a");
    }

    #[test]
    fn test_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "stale").unwrap();
        write_history(&[result("q")], &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.trim_start().starts_with('['));
    }

    #[test]
    fn test_missing_directory_is_export_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("history.json");
        assert!(matches!(write_history(&[], &path), Err(Error::Export { .. })));
    }

    #[test]
    fn test_default_file_name_shape() {
        let name = default_file_name();
        assert!(name.starts_with("search_history_"));
        assert!(name.ends_with(".json"));
    }
}
