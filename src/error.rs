use std::path::PathBuf;
use thiserror::Error;

/// Every failure the export pipeline can produce. None of them are recovered:
/// the first one aborts the whole run.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("storage error: {context}")]
    Storage {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("malformed timestamp {value:?} on message {message_id}")]
    MalformedTimestamp { message_id: String, value: String },

    #[error("no user with id {sender_id:?} (sender of message {message_id})")]
    UserNotFound {
        message_id: String,
        sender_id: String,
    },

    #[error("failed to write {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    /// Adapter for `map_err` on rusqlite results.
    pub fn storage(context: impl Into<String>) -> impl FnOnce(rusqlite::Error) -> Self {
        let context = context.into();
        move |source| Self::Storage { context, source }
    }

    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
