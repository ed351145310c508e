// `FileClient`: the boundary between the shells and the remote service.
//
// Input is validated here before any request goes out, and every remote
// failure is translated into `Error` with the operation and its target
// attached. Nothing is retried.

use crate::answer;
use crate::api::{FileUpload, RemoteFiles};
use crate::config::ApiKey;
use crate::error::{Error, RemoteError, Result};
use crate::models::{RemoteFile, SearchResult};
use std::path::Path;
use tracing::{info, warn};

/// Document formats the service accepts from this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Txt,
    Docx,
    Csv,
    Json,
}

impl DocumentFormat {
    /// Infer the format from the file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "pdf" => Ok(DocumentFormat::Pdf),
            "txt" => Ok(DocumentFormat::Txt),
            "docx" => Ok(DocumentFormat::Docx),
            "csv" => Ok(DocumentFormat::Csv),
            "json" => Ok(DocumentFormat::Json),
            _ => Err(Error::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            }),
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "application/pdf",
            DocumentFormat::Txt => "text/plain",
            DocumentFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            DocumentFormat::Csv => "text/csv",
            DocumentFormat::Json => "application/json",
        }
    }
}

pub struct FileClient<R> {
    remote: R,
}

impl<R: RemoteFiles> FileClient<R> {
    pub fn new(remote: R) -> Self {
        FileClient { remote }
    }

    #[cfg(test)]
    pub(crate) fn remote(&self) -> &R {
        &self.remote
    }

    /// Validate `key` with a cheap authenticated call. Only a key that passes should be
    /// stored in the session.
    pub fn configure(&self, key: &ApiKey) -> Result<()> {
        if key.is_empty() {
            return Err(Error::Auth("API key is empty".into()));
        }
        match self.remote.verify_key(key) {
            Ok(()) => {
                info!("API key accepted");
                Ok(())
            }
            Err(e) if e.is_auth() => {
                warn!(error = %e, "API key rejected");
                Err(Error::Auth(e.to_string()))
            }
            Err(source) => Err(Error::Network {
                operation: "configure",
                target: "API key".into(),
                source,
            }),
        }
    }

    /// Upload the file at `path`. The format check happens before the file
    /// is read or any request is made.
    pub fn upload(&self, key: &ApiKey, path: &Path, display_name: Option<&str>) -> Result<RemoteFile> {
        let format = DocumentFormat::from_path(path)?;
        let bytes = std::fs::read(path).map_err(|source| Error::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let display_name = display_name
            .map(str::to_string)
            .or_else(|| path.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .unwrap_or_else(|| "document".to_string());

        let upload = FileUpload {
            display_name,
            mime_type: format.mime_type().to_string(),
            bytes,
        };
        match self.remote.upload(key, upload) {
            Ok(file) => {
                info!(id = %file.id, size = file.size, "uploaded {}", path.display());
                Ok(file)
            }
            Err(source) => {
                warn!(error = %source, "upload of {} failed", path.display());
                Err(Error::Upload {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }

    /// Everything the remote reports, unfiltered.
    pub fn list(&self, key: &ApiKey) -> Result<Vec<RemoteFile>> {
        self.remote.list(key).map_err(|source| Error::Network {
            operation: "list",
            target: "files".into(),
            source,
        })
    }

    pub fn get(&self, key: &ApiKey, file_ref: &str) -> Result<RemoteFile> {
        self.remote
            .get(key, file_ref)
            .map_err(|source| lookup_error("get", file_ref, source))
    }

    /// Ask `query` about one file and parse the answer.
    pub fn search(&self, key: &ApiKey, file_ref: &str, query: &str) -> Result<SearchResult> {
        self.search_files(key, &[file_ref], query)
    }

    /// Ask `query` about several files at once. All of them are attached to
    /// a single generate-content request.
    pub fn search_files(&self, key: &ApiKey, file_refs: &[&str], query: &str) -> Result<SearchResult> {
        let target = file_refs.join(", ");
        let query = query.trim();
        if query.is_empty() || file_refs.is_empty() {
            let reason = if query.is_empty() { "query is empty" } else { "no files to search" };
            return Err(Error::Search {
                file: target,
                reason: reason.into(),
                source: None,
            });
        }

        let mut files = Vec::with_capacity(file_refs.len());
        for file_ref in file_refs {
            let file = self.get(key, file_ref).map_err(search_lookup_error)?;
            files.push(file);
        }

        let prompt = answer::build_prompt(query, &files);
        let reply = self.remote.generate(key, &files, &prompt).map_err(|source| {
            warn!(error = %source, files = %target, "search failed");
            Error::Search {
                file: target.clone(),
                reason: "the service did not return an answer".into(),
                source: Some(source),
            }
        })?;

        let result = answer::parse_reply(query, &files, &reply);
        info!(files = %target, snippets = result.snippets.len(), "search completed");
        Ok(result)
    }

    /// Delete a remote file. Deleting an id the remote does not know is an
    /// error, not a no-op.
    pub fn delete(&self, key: &ApiKey, file_ref: &str) -> Result<()> {
        self.remote
            .delete(key, file_ref)
            .map_err(|source| lookup_error("delete", file_ref, source))?;
        info!(id = file_ref, "deleted");
        Ok(())
    }
}

/// Only a missing file stays `NotFound` during a search; any other failure
/// to resolve it is a search failure.
fn search_lookup_error(err: Error) -> Error {
    match err {
        Error::NotFound { target, source, .. } => Error::NotFound {
            operation: "search",
            target,
            source,
        },
        Error::Network { target, source, .. } => Error::Search {
            file: target,
            reason: "could not resolve the file".into(),
            source: Some(source),
        },
        other => other,
    }
}

fn lookup_error(operation: &'static str, target: &str, source: RemoteError) -> Error {
    if source.is_not_found() {
        Error::NotFound {
            operation,
            target: target.to_string(),
            source,
        }
    } else {
        Error::Network {
            operation,
            target: target.to_string(),
            source,
        }
    }
}

#[cfg(test)]
pub(crate) mod mock {
    // In-memory remote used by the client and dispatcher tests.

    use super::*;
    use crate::models::FileState;
    use chrono::Utc;
    use std::cell::{Cell, RefCell};

    pub const GOOD_KEY: &str = "good-key";

    #[derive(Default)]
    pub struct MockRemote {
        pub files: RefCell<Vec<RemoteFile>>,
        pub reply: RefCell<String>,
        pub calls: Cell<usize>,
        pub fail_generate: Cell<bool>,
        /// Returned once by the next `get`.
        pub get_error: RefCell<Option<RemoteError>>,
        /// Ids attached to each `generate` call.
        pub generated_with: RefCell<Vec<Vec<String>>>,
        next_id: Cell<usize>,
    }

    impl MockRemote {
        pub fn with_reply(reply: &str) -> Self {
            let remote = MockRemote::default();
            *remote.reply.borrow_mut() = reply.to_string();
            remote
        }

        fn call(&self, key: &ApiKey) -> std::result::Result<(), RemoteError> {
            self.calls.set(self.calls.get() + 1);
            if key.expose() == GOOD_KEY {
                Ok(())
            } else {
                Err(RemoteError::Status {
                    status: 400,
                    message: "API key not valid".into(),
                })
            }
        }

        fn not_found(id: &str) -> RemoteError {
            RemoteError::Status {
                status: 404,
                message: format!("{} not found", id),
            }
        }
    }

    impl RemoteFiles for MockRemote {
        fn verify_key(&self, key: &ApiKey) -> std::result::Result<(), RemoteError> {
            self.call(key)
        }

        fn upload(&self, key: &ApiKey, file: FileUpload) -> std::result::Result<RemoteFile, RemoteError> {
            self.call(key)?;
            let n = self.next_id.get() + 1;
            self.next_id.set(n);
            let id = format!("files/mock{}", n);
            let remote = RemoteFile {
                uri: format!("https://example.test/{}", id),
                id,
                display_name: file.display_name,
                size: file.bytes.len() as u64,
                upload_time: Utc::now(),
                state: FileState::Active,
                mime_type: file.mime_type,
            };
            self.files.borrow_mut().push(remote.clone());
            Ok(remote)
        }

        fn list(&self, key: &ApiKey) -> std::result::Result<Vec<RemoteFile>, RemoteError> {
            self.call(key)?;
            Ok(self.files.borrow().clone())
        }

        fn get(&self, key: &ApiKey, id: &str) -> std::result::Result<RemoteFile, RemoteError> {
            self.call(key)?;
            if let Some(err) = self.get_error.borrow_mut().take() {
                return Err(err);
            }
            self.files
                .borrow()
                .iter()
                .find(|f| f.id == id)
                .cloned()
                .ok_or_else(|| Self::not_found(id))
        }

        fn delete(&self, key: &ApiKey, id: &str) -> std::result::Result<(), RemoteError> {
            self.call(key)?;
            let mut files = self.files.borrow_mut();
            let before = files.len();
            files.retain(|f| f.id != id);
            if files.len() == before {
                return Err(Self::not_found(id));
            }
            Ok(())
        }

        fn generate(&self, key: &ApiKey, files: &[RemoteFile], _prompt: &str) -> std::result::Result<String, RemoteError> {
            self.call(key)?;
            self.generated_with
                .borrow_mut()
                .push(files.iter().map(|f| f.id.clone()).collect());
            if self.fail_generate.get() {
                return Err(RemoteError::Status {
                    status: 429,
                    message: "Resource has been exhausted".into(),
                });
            }
            Ok(self.reply.borrow().clone())
        }
    }
}
