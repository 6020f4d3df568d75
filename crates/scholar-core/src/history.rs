//! Append-only conversation log.
//!
//! The log is the default tracked source: every exchange is appended as a
//! delimited entry, the file's modification time moves forward, and the next
//! [`initialize`](crate::search::RetrievalEngine::initialize) re-indexes it.

use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Line that opens and closes every entry.
pub const ENTRY_SEPARATOR: &str =
    "================================================================================";

/// Replacement for separator lines that occur inside a message.
const ESCAPED_SEPARATOR: &str =
    "--------------------------------------------------------------------------------";

/// Writer for the tracked conversation log.
#[derive(Debug, Clone)]
pub struct ConversationLog {
    path: PathBuf,
}

impl ConversationLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one user/assistant exchange, creating the file if needed.
    pub async fn append(&self, user: &str, assistant: &str, model: &str) -> std::io::Result<()> {
        let entry = format_entry(
            &Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            user,
            assistant,
            model,
        );

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(entry.as_bytes()).await?;
        file.flush().await?;

        debug!("Appended {} bytes to {}", entry.len(), self.path.display());
        Ok(())
    }
}

fn format_entry(timestamp: &str, user: &str, assistant: &str, model: &str) -> String {
    let model = model.replace(['\r', '\n'], " ");
    format!(
        "{sep}\nTimestamp: {timestamp}\nModel: {model}\n\n[User]:\n{user}\n\n[Assistant]:\n{assistant}\n{sep}\n\n",
        sep = ENTRY_SEPARATOR,
        timestamp = timestamp,
        user = escape_message(user),
        assistant = escape_message(assistant),
    )
}

fn escape_message(message: &str) -> String {
    message.replace(ENTRY_SEPARATOR, ESCAPED_SEPARATOR)
}
