//! Update routing and the sequential handling loop.

use std::{fmt, sync::Arc};

use tokio::sync::mpsc;

use crate::{
    convert::SOURCE_MIME,
    domain::{Attachment, ChatId, ConvertedImage, IncomingUpdate},
    errors::Error,
    naming::jpeg_name,
    ports::{Converter, PlatformPort},
    Result,
};

/// Reply with this to a HEIC document to get the full-resolution JPEG.
pub const FULL_COMMAND: &str = "/full";

/// What to do with an update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Ignore,
    /// HEIC sent directly: answer with a compressed photo.
    Compressed {
        chat_id: ChatId,
        attachment: Attachment,
    },
    /// `/full` in reply to a HEIC document: answer with a document.
    Full {
        chat_id: ChatId,
        attachment: Attachment,
    },
}

/// Guards are checked in priority order; the first match wins.
pub fn route(update: &IncomingUpdate) -> Route {
    let Some(msg) = &update.message else {
        return Route::Ignore;
    };

    if let Some(doc) = msg.document.as_ref().filter(|d| d.has_mime(SOURCE_MIME)) {
        return Route::Compressed {
            chat_id: msg.chat_id,
            attachment: doc.clone(),
        };
    }

    if msg.text.as_deref() == Some(FULL_COMMAND) {
        if let Some(reply) = &msg.reply_to {
            if let Some(doc) = reply.document.as_ref().filter(|d| d.has_mime(SOURCE_MIME)) {
                return Route::Full {
                    chat_id: reply.chat_id,
                    attachment: doc.clone(),
                };
            }
        }
    }

    Route::Ignore
}

/// Pipeline stage a failure happened in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Retrieve,
    Convert,
    Send,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Retrieve => "retrieve",
            Stage::Convert => "convert",
            Stage::Send => "send",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Ignored,
    Sent { name: String },
    Failed(Stage),
}

/// Holds the process-lifetime collaborators and handles one update at a time.
#[derive(Clone)]
pub struct Dispatcher {
    platform: Arc<dyn PlatformPort>,
    converter: Arc<dyn Converter>,
}

impl Dispatcher {
    pub fn new(platform: Arc<dyn PlatformPort>, converter: Arc<dyn Converter>) -> Self {
        Self {
            platform,
            converter,
        }
    }

    /// Consume updates until the channel closes. Per-update failures are
    /// reported and never end the loop.
    pub async fn run(&self, mut updates: mpsc::Receiver<IncomingUpdate>) {
        while let Some(update) = updates.recv().await {
            let outcome = self.handle(update).await;
            tracing::debug!(?outcome, "update handled");
        }
        tracing::info!("update stream closed; dispatch loop exiting");
    }

    pub async fn handle(&self, update: IncomingUpdate) -> Outcome {
        let (chat_id, attachment, as_photo) = match route(&update) {
            Route::Ignore => {
                tracing::trace!(update_id = update.id, "ignored");
                return Outcome::Ignored;
            }
            Route::Compressed {
                chat_id,
                attachment,
            } => (chat_id, attachment, true),
            Route::Full {
                chat_id,
                attachment,
            } => (chat_id, attachment, false),
        };

        match self.process(chat_id, &attachment, as_photo).await {
            Ok(name) => {
                let kind = if as_photo { "photo" } else { "document" };
                tracing::info!(
                    chat_id = chat_id.0,
                    file_id = %attachment.file_id,
                    %name,
                    kind,
                    "sent converted image"
                );
                Outcome::Sent { name }
            }
            Err((stage, e)) => {
                report_failure(stage, chat_id, &attachment, &e);
                Outcome::Failed(stage)
            }
        }
    }

    async fn process(
        &self,
        chat_id: ChatId,
        attachment: &Attachment,
        as_photo: bool,
    ) -> std::result::Result<String, (Stage, Error)> {
        let source = self
            .platform
            .resolve_file(&attachment.file_id)
            .await
            .map_err(|e| (Stage::Retrieve, e))?;

        let converted = self
            .convert(source, attachment.file_name.as_deref())
            .await
            .map_err(|e| (Stage::Convert, e))?;

        let sent = if as_photo {
            self.platform
                .send_photo(chat_id, &converted.name, converted.bytes)
                .await
        } else {
            self.platform
                .send_document(chat_id, &converted.name, converted.bytes)
                .await
        };
        sent.map_err(|e| (Stage::Send, e))?;

        Ok(converted.name)
    }

    /// Decoding is CPU bound; keep it off the async workers.
    async fn convert(&self, source: Vec<u8>, file_name: Option<&str>) -> Result<ConvertedImage> {
        let converter = self.converter.clone();
        let bytes = tokio::task::spawn_blocking(move || converter.convert(&source))
            .await
            .map_err(|e| Error::External(format!("conversion task failed: {e}")))??;

        Ok(ConvertedImage {
            name: jpeg_name(file_name),
            bytes,
        })
    }
}

/// Error sink: one structured event per abandoned update.
fn report_failure(stage: Stage, chat_id: ChatId, attachment: &Attachment, e: &Error) {
    tracing::warn!(
        %stage,
        chat_id = chat_id.0,
        file_id = %attachment.file_id,
        file_name = attachment.file_name.as_deref().unwrap_or(""),
        error = %e,
        "conversion abandoned"
    );
}
