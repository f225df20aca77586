use async_trait::async_trait;

use crate::{
    domain::{ChatId, FilePath},
    Result,
};

/// Outbound side of the chat platform.
///
/// Telegram is the only implementation; tests substitute an in-memory fake.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a plain-text message with link previews suppressed.
    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<()>;

    /// Resolve an attachment's file id to a transient download path.
    async fn get_file(&self, file_id: &str) -> Result<FilePath>;

    /// Download the raw bytes behind a path returned by [`ChatTransport::get_file`].
    async fn download(&self, path: &FilePath) -> Result<Vec<u8>>;
}
