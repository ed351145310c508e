// Data shapes shared by the client, the session and both shells.
//
// `RemoteFile` is only a cached reference: the remote service owns the
// document and is the source of truth for its lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Processing state reported by the remote service for an uploaded file.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileState {
    Processing,
    Active,
    Failed,
}

impl FileState {
    /// Map the remote's state string. Anything we do not recognise
    /// (including `STATE_UNSPECIFIED`) is treated as still processing.
    pub fn from_remote(state: &str) -> Self {
        match state {
            "ACTIVE" => FileState::Active,
            "FAILED" => FileState::Failed,
            _ => FileState::Processing,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileState::Processing => "processing",
            FileState::Active => "active",
            FileState::Failed => "failed",
        }
    }
}

/// Reference to a document stored by the remote service.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RemoteFile {
    /// Remote resource name, e.g. `files/abc123`.
    pub id: String,
    pub display_name: String,
    pub size: u64,
    pub upload_time: DateTime<Utc>,
    pub state: FileState,
    pub mime_type: String,
    /// URI used to attach the file to a generate-content request.
    pub uri: String,
}

/// One supporting excerpt returned with an answer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Snippet {
    pub text: String,
    pub source_file_id: String,
}

/// Structured answer for a single query. Created once per search and
/// never mutated afterwards.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub query: String,
    pub answer: String,
    pub snippets: Vec<Snippet>,
    /// File names the model cited, as it reported them.
    pub sources: Vec<String>,
    /// Between 0 and 1 when the model gave a usable confidence.
    pub confidence: Option<f32>,
    pub timestamp: DateTime<Utc>,
    pub raw_response: String,
}
