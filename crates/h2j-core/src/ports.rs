use async_trait::async_trait;

use crate::{domain::ChatId, Result};

/// Hexagonal port for the chat platform.
///
/// Telegram is the only implementation; tests plug in fakes.
#[async_trait]
pub trait PlatformPort: Send + Sync {
    /// Resolve a platform file id and download its bytes.
    async fn resolve_file(&self, file_id: &str) -> Result<Vec<u8>>;

    /// Upload as a generic file (no recompression).
    async fn send_document(&self, chat_id: ChatId, name: &str, bytes: Vec<u8>) -> Result<()>;

    /// Upload as an inline photo (the platform recompresses it).
    async fn send_photo(&self, chat_id: ChatId, name: &str, bytes: Vec<u8>) -> Result<()>;
}

/// Source-format bytes in, target-format bytes out.
pub trait Converter: Send + Sync {
    fn convert(&self, source: &[u8]) -> Result<Vec<u8>>;
}
