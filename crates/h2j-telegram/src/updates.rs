//! teloxide update → core domain mapping.

use teloxide::types::{Document, Message, Update, UpdateKind};

use h2j_core::domain::{Attachment, ChatId, IncomingMessage, IncomingUpdate};

pub fn map_update(update: &Update) -> IncomingUpdate {
    let message = match &update.kind {
        UpdateKind::Message(msg) => Some(map_message(msg)),
        _ => None,
    };
    IncomingUpdate {
        id: update.id,
        message,
    }
}

pub fn map_message(msg: &Message) -> IncomingMessage {
    IncomingMessage {
        chat_id: ChatId(msg.chat.id.0),
        text: msg.text().map(str::to_string),
        document: msg.document().map(map_document),
        reply_to: msg
            .reply_to_message()
            .map(|reply| Box::new(map_message(reply))),
    }
}

fn map_document(doc: &Document) -> Attachment {
    Attachment {
        mime_type: doc.mime_type.as_ref().map(|m| m.essence_str().to_string()),
        file_id: doc.file.id.clone(),
        file_name: doc.file_name.clone(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use serde_json::json;

    use super::*;

    fn chat() -> serde_json::Value {
        json!({ "id": 42, "type": "private", "first_name": "Ada" })
    }

    fn user() -> serde_json::Value {
        json!({ "id": 7, "is_bot": false, "first_name": "Ada" })
    }

    pub(crate) fn text_message(id: i32, text: &str) -> serde_json::Value {
        json!({
            "message_id": id,
            "date": 1_700_000_000,
            "chat": chat(),
            "from": user(),
            "text": text
        })
    }

    pub(crate) fn heic_document_message(id: i32) -> serde_json::Value {
        json!({
            "message_id": id,
            "date": 1_700_000_000,
            "chat": chat(),
            "from": user(),
            "document": {
                "file_id": "F1",
                "file_unique_id": "U1",
                "file_size": 1024,
                "file_name": "x.heic",
                "mime_type": "image/heic"
            }
        })
    }

    /// Goes through a JSON string, as teloxide does with Bot API replies.
    /// `from_value` leaves `UpdateKind::Error` for messages.
    fn parse_update(value: serde_json::Value) -> Update {
        serde_json::from_str(&value.to_string()).unwrap()
    }

    #[test]
    fn maps_document_message() {
        let update = parse_update(json!({
            "update_id": 10,
            "message": heic_document_message(1)
        }));

        let mapped = map_update(&update);
        assert_eq!(mapped.id, 10);
        let msg = mapped.message.unwrap();
        assert_eq!(msg.chat_id, ChatId(42));
        assert_eq!(msg.text, None);
        assert_eq!(
            msg.document,
            Some(Attachment {
                mime_type: Some("image/heic".to_string()),
                file_id: "F1".to_string(),
                file_name: Some("x.heic".to_string()),
            })
        );
        assert!(msg.reply_to.is_none());
    }

    #[test]
    fn maps_reply_with_command_text() {
        let update = parse_update(json!({
            "update_id": 11,
            "message": {
                "message_id": 2,
                "date": 1_700_000_001,
                "chat": chat(),
                "from": user(),
                "text": "/full",
                "entities": [{ "type": "bot_command", "offset": 0, "length": 5 }],
                "reply_to_message": heic_document_message(1)
            }
        }));

        let msg = map_update(&update).message.unwrap();
        assert_eq!(msg.text.as_deref(), Some("/full"));
        assert!(msg.document.is_none());
        let reply = msg.reply_to.unwrap();
        assert_eq!(reply.document.unwrap().file_id, "F1");
    }

    #[test]
    fn maps_plain_text_message() {
        let update = parse_update(json!({ "update_id": 12, "message": text_message(3, "hi") }));

        let msg = map_update(&update).message.unwrap();
        assert_eq!(msg.chat_id, ChatId(42));
        assert_eq!(msg.text.as_deref(), Some("hi"));
        assert!(msg.document.is_none());
    }

    #[test]
    fn edited_message_carries_no_message() {
        let update = parse_update(json!({
            "update_id": 13,
            "edited_message": text_message(3, "hi again")
        }));

        let mapped = map_update(&update);
        assert_eq!(mapped.id, 13);
        assert!(mapped.message.is_none());
    }
}
