use serde::Deserialize;

use crate::domain::ChatId;

/// Inbound webhook update, reduced to the fields the bot reads.
///
/// Unknown fields are ignored so new Bot API fields never break parsing.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub update_id: Option<i64>,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub chat: Option<Chat>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub document: Option<Document>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Chat {
    pub id: ChatId,
}

/// Attachment reference as declared by the sender; nothing here is verified.
#[derive(Clone, Debug, Deserialize)]
pub struct Document {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl Update {
    pub fn sender(&self) -> Option<ChatId> {
        self.message.as_ref()?.chat.as_ref().map(|c| c.id)
    }
}

impl Message {
    /// Message body, whichever of `text`/`caption` carries it.
    pub fn body(&self) -> Option<&str> {
        self.text.as_deref().or(self.caption.as_deref())
    }
}
