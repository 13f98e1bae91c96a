//! Telegram adapter (teloxide + reqwest).
//!
//! Implements the `h2j-core` PlatformPort over the Telegram Bot API.

use std::{future::Future, time::Duration};

use async_trait::async_trait;

use teloxide::{prelude::*, types::InputFile};

pub mod files;
pub mod poller;
pub mod router;
pub mod updates;

use h2j_core::{domain::ChatId, errors::Error, ports::PlatformPort, Result};

use crate::files::FileFetcher;

#[derive(Clone)]
pub struct TelegramPlatform {
    bot: Bot,
    files: FileFetcher,
    upload_timeout: Duration,
}

impl TelegramPlatform {
    pub fn new(bot: Bot, files: FileFetcher, upload_timeout: Duration) -> Self {
        Self {
            bot,
            files,
            upload_timeout,
        }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Network(format!("telegram error: {e}"))
    }

    /// Single attempt, bounded by the upload timeout.
    async fn bounded<T>(
        &self,
        method: &str,
        fut: impl Future<Output = std::result::Result<T, teloxide::RequestError>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.upload_timeout, fut).await {
            Ok(res) => res.map_err(Self::map_err),
            Err(_) => Err(Error::Network(format!(
                "{method} timed out after {:?}",
                self.upload_timeout
            ))),
        }
    }
}

#[async_trait]
impl PlatformPort for TelegramPlatform {
    async fn resolve_file(&self, file_id: &str) -> Result<Vec<u8>> {
        self.files.fetch(file_id).await
    }

    async fn send_document(&self, chat_id: ChatId, name: &str, bytes: Vec<u8>) -> Result<()> {
        let file = InputFile::memory(bytes).file_name(name.to_string());
        self.bounded("sendDocument", async {
            self.bot.send_document(Self::tg_chat(chat_id), file).await
        })
        .await?;
        Ok(())
    }

    async fn send_photo(&self, chat_id: ChatId, name: &str, bytes: Vec<u8>) -> Result<()> {
        let file = InputFile::memory(bytes).file_name(name.to_string());
        self.bounded("sendPhoto", async {
            self.bot.send_photo(Self::tg_chat(chat_id), file).await
        })
        .await?;
        Ok(())
    }
}
