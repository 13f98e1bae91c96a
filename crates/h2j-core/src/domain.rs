/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// A file carried by a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    /// Mime essence, e.g. `image/heic`.
    pub mime_type: Option<String>,
    pub file_id: String,
    pub file_name: Option<String>,
}

impl Attachment {
    pub fn has_mime(&self, mime: &str) -> bool {
        self.mime_type.as_deref() == Some(mime)
    }
}

/// Incoming message, reduced to what the bot looks at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncomingMessage {
    pub chat_id: ChatId,
    pub text: Option<String>,
    pub document: Option<Attachment>,
    pub reply_to: Option<Box<IncomingMessage>>,
}

/// One event from the long-poll feed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncomingUpdate {
    pub id: i32,
    pub message: Option<IncomingMessage>,
}

/// A re-encoded file ready to be sent.
#[derive(Clone, Debug)]
pub struct ConvertedImage {
    pub name: String,
    pub bytes: Vec<u8>,
}
