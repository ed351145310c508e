// Remote access layer: a small blocking HTTP client for the Gemini Files
// and generate-content endpoints.
//
// `RemoteFiles` is the seam between `FileClient` and the network. The real
// implementation is `GeminiApi`; tests substitute an in-memory remote.

use crate::config::{ApiKey, Config};
use crate::error::RemoteError;
use crate::models::{FileState, RemoteFile};
use anyhow::Context;
use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";
const LIST_PAGE_SIZE: &str = "100";

/// Bytes plus metadata for one upload.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub display_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Operations the remote file-search service offers. Every call is a
/// single blocking request with no retry.
pub trait RemoteFiles {
    /// Cheap authenticated call used to validate a key.
    fn verify_key(&self, key: &ApiKey) -> Result<(), RemoteError>;
    fn upload(&self, key: &ApiKey, file: FileUpload) -> Result<RemoteFile, RemoteError>;
    fn list(&self, key: &ApiKey) -> Result<Vec<RemoteFile>, RemoteError>;
    fn get(&self, key: &ApiKey, id: &str) -> Result<RemoteFile, RemoteError>;
    fn delete(&self, key: &ApiKey, id: &str) -> Result<(), RemoteError>;
    /// Ask the model `prompt` with `files` attached; returns the answer text.
    fn generate(&self, key: &ApiKey, files: &[RemoteFile], prompt: &str) -> Result<String, RemoteError>;
}

/// Blocking client for the Generative Language REST API.
#[derive(Clone)]
pub struct GeminiApi {
    client: Client,
    base_url: String,
    model: String,
}

impl GeminiApi {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(GeminiApi {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl RemoteFiles for GeminiApi {
    fn verify_key(&self, key: &ApiKey) -> Result<(), RemoteError> {
        let url = self.url("v1beta/models");
        debug!(%url, "probing API key");
        let res = self
            .client
            .get(&url)
            .query(&[("pageSize", "1")])
            .header(KEY_HEADER, key.expose())
            .send()?;
        check(res)?;
        Ok(())
    }

    fn upload(&self, key: &ApiKey, file: FileUpload) -> Result<RemoteFile, RemoteError> {
        // Resumable protocol: the start request hands back a session URL,
        // the second request sends the bytes and finalizes.
        let url = self.url("upload/v1beta/files");
        debug!(%url, name = %file.display_name, bytes = file.bytes.len(), "starting upload");
        let res = self
            .client
            .post(&url)
            .header(KEY_HEADER, key.expose())
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", file.bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", file.mime_type.as_str())
            .json(&json!({ "file": { "display_name": file.display_name } }))
            .send()?;
        let res = check(res)?;
        let session_url = res
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| RemoteError::Decode("upload session URL missing from response".into()))?;

        let res = self
            .client
            .post(&session_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(file.bytes)
            .send()?;
        let envelope: FileEnvelope = decode(check(res)?)?;
        envelope.file.into_remote_file()
    }

    fn list(&self, key: &ApiKey) -> Result<Vec<RemoteFile>, RemoteError> {
        let url = self.url("v1beta/files");
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut req = self
                .client
                .get(&url)
                .query(&[("pageSize", LIST_PAGE_SIZE)])
                .header(KEY_HEADER, key.expose());
            if let Some(token) = &page_token {
                req = req.query(&[("pageToken", token.as_str())]);
            }
            let page: FileListing = decode(check(req.send()?)?)?;
            for file in page.files {
                files.push(file.into_remote_file()?);
            }
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => {
                    debug!(fetched = files.len(), "fetching next page of files");
                    page_token = Some(token);
                }
                None => return Ok(files),
            }
        }
    }

    fn get(&self, key: &ApiKey, id: &str) -> Result<RemoteFile, RemoteError> {
        let res = self
            .client
            .get(self.url(&format!("v1beta/{}", id)))
            .header(KEY_HEADER, key.expose())
            .send()?;
        let file: ApiFile = decode(check(res)?)?;
        file.into_remote_file()
    }

    fn delete(&self, key: &ApiKey, id: &str) -> Result<(), RemoteError> {
        let res = self
            .client
            .delete(self.url(&format!("v1beta/{}", id)))
            .header(KEY_HEADER, key.expose())
            .send()?;
        check(res)?;
        Ok(())
    }

    fn generate(&self, key: &ApiKey, files: &[RemoteFile], prompt: &str) -> Result<String, RemoteError> {
        let url = self.url(&format!("v1beta/models/{}:generateContent", self.model));
        debug!(%url, files = files.len(), "generating answer");
        let mut parts: Vec<serde_json::Value> = files
            .iter()
            .map(|f| json!({ "fileData": { "mimeType": f.mime_type, "fileUri": f.uri } }))
            .collect();
        parts.push(json!({ "text": prompt }));
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": parts
            }]
        });
        let res = self
            .client
            .post(&url)
            .header(KEY_HEADER, key.expose())
            .json(&body)
            .send()?;
        let reply: GenerateResponse = decode(check(res)?)?;
        reply.text()
    }
}

/// Turn a non-success response into `RemoteError::Status`, preferring the
/// service's own error message over the raw body.
fn check(res: Response) -> Result<Response, RemoteError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    Err(RemoteError::Status {
        status: status.as_u16(),
        message,
    })
}

fn decode<T: serde::de::DeserializeOwned>(res: Response) -> Result<T, RemoteError> {
    res.json::<T>().map_err(|e| RemoteError::Decode(e.to_string()))
}

/// File resource as the API serializes it.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ApiFile {
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    /// int64 fields arrive as JSON strings.
    #[serde(default)]
    size_bytes: Option<String>,
    #[serde(default)]
    create_time: Option<DateTime<Utc>>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    uri: Option<String>,
}

impl ApiFile {
    fn into_remote_file(self) -> Result<RemoteFile, RemoteError> {
        let size = match self.size_bytes.as_deref() {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| RemoteError::Decode(format!("invalid sizeBytes `{}` for {}", raw, self.name)))?,
            None => 0,
        };
        Ok(RemoteFile {
            display_name: self.display_name.unwrap_or_else(|| self.name.clone()),
            size,
            upload_time: self.create_time.unwrap_or_else(Utc::now),
            state: FileState::from_remote(self.state.as_deref().unwrap_or_default()),
            mime_type: self.mime_type.unwrap_or_default(),
            uri: self.uri.unwrap_or_default(),
            id: self.name,
        })
    }
}

#[derive(Deserialize, Debug)]
struct FileEnvelope {
    file: ApiFile,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct FileListing {
    #[serde(default)]
    files: Vec<ApiFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize, Debug)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenate the text parts of the first candidate.
    fn text(self) -> Result<String, RemoteError> {
        let parts = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .ok_or_else(|| RemoteError::Decode("model returned no candidates".into()))?;
        let text: String = parts.into_iter().filter_map(|p| p.text).collect();
        if text.trim().is_empty() {
            return Err(RemoteError::Decode("model returned an empty answer".into()));
        }
        Ok(text)
    }
}

#[derive(Deserialize, Debug)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize, Debug)]
struct ApiErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_resource_parsing() {
        let json = r#"{
            "file": {
                "name": "files/abc123",
                "displayName": "report.pdf",
                "mimeType": "application/pdf",
                "sizeBytes": "20480",
                "createTime": "2024-05-01T10:00:00.000000Z",
                "state": "ACTIVE",
                "uri": "https://generativelanguage.googleapis.com/v1beta/files/abc123"
            }
        }"#;
        let envelope: FileEnvelope = serde_json::from_str(json).unwrap();
        let file = envelope.file.into_remote_file().unwrap();
        assert_eq!(file.id, "files/abc123");
        assert_eq!(file.display_name, "report.pdf");
        assert_eq!(file.size, 20480);
        assert_eq!(file.state, FileState::Active);
        assert_eq!(file.upload_time.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn test_file_resource_with_missing_fields() {
        let file: ApiFile = serde_json::from_str(r#"{"name": "files/x", "state": "STATE_UNSPECIFIED"}"#).unwrap();
        let file = file.into_remote_file().unwrap();
        assert_eq!(file.display_name, "files/x");
        assert_eq!(file.size, 0);
        assert_eq!(file.state, FileState::Processing);
    }

    #[test]
    fn test_invalid_size_is_a_decode_error() {
        let file: ApiFile = serde_json::from_str(r#"{"name": "files/x", "sizeBytes": "lots"}"#).unwrap();
        assert!(matches!(file.into_remote_file(), Err(RemoteError::Decode(_))));
    }

    #[test]
    fn test_empty_listing() {
        let page: FileListing = serde_json::from_str("{}").unwrap();
        assert!(page.files.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn test_listing_with_next_page_token() {
        let json = r#"{
            "files": [
                {"name": "files/one", "displayName": "one.txt", "state": "ACTIVE"},
                {"name": "files/two", "displayName": "two.pdf", "state": "PROCESSING"}
            ],
            "nextPageToken": "CiAKHmZpbGVzL3R3bw"
        }"#;
        let page: FileListing = serde_json::from_str(json).unwrap();
        assert_eq!(page.files.len(), 2);
        assert_eq!(page.next_page_token.as_deref(), Some("CiAKHmZpbGVzL3R3bw"));
    }

    #[test]
    fn test_generate_response_text() {
        let json = r#"{"candidates": [{"content": {"parts": [{"text": "ANSWER: "}, {"text": "42"}], "role": "model"}}]}"#;
        let reply: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(reply.text().unwrap(), "ANSWER: 42");
    }

    #[test]
    fn test_generate_response_without_candidates() {
        let reply: GenerateResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(matches!(reply.text(), Err(RemoteError::Decode(_))));
    }

    #[test]
    fn test_url_joining() {
        let config = Config {
            base_url: "http://localhost:9000/".into(),
            ..Config::default()
        };
        let api = GeminiApi::new(&config).unwrap();
        assert_eq!(api.url("/v1beta/files"), "http://localhost:9000/v1beta/files");
    }
}
