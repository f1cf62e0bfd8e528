//! Wire-shape message records consumed by the feed.
//!
//! A snapshot is a complete, timestamp-ascending slice of [`Message`]
//! records: the full known conversation at fetch time, never a delta.
//! Messages are immutable once observed; the feed keys everything off
//! `Message::id`.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Stable, unique message identifier
pub type MessageId = String;

/// Message payload discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    File,
    /// Unrecognized type tags on the wire. These still get a cached handle
    /// so id accounting stays exact.
    #[serde(other)]
    Unknown,
}

/// One immutable conversation record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    /// Milliseconds since the Unix epoch; snapshots arrive ascending
    pub timestamp: u64,
    pub device_id: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_key: Option<String>,
}

impl Message {
    /// Decode one record from its JSON wire form
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Whether this is a file message carrying an image mime type
    pub fn is_image(&self) -> bool {
        self.kind == MessageKind::File
            && self
                .mime_type
                .as_deref()
                .is_some_and(crate::format::is_image_mime)
    }

    /// Build a plain text message
    pub fn text(id: impl Into<MessageId>, timestamp: u64, device_id: &str, content: &str) -> Self {
        Self {
            id: id.into(),
            timestamp,
            device_id: device_id.to_string(),
            kind: MessageKind::Text,
            content: Some(content.to_string()),
            mime_type: None,
            original_name: None,
            file_size: None,
            asset_key: None,
        }
    }

    /// Build a file message
    pub fn file(
        id: impl Into<MessageId>,
        timestamp: u64,
        device_id: &str,
        original_name: &str,
        mime_type: &str,
        file_size: u64,
        asset_key: &str,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            device_id: device_id.to_string(),
            kind: MessageKind::File,
            content: None,
            mime_type: Some(mime_type.to_string()),
            original_name: Some(original_name.to_string()),
            file_size: Some(file_size),
            asset_key: Some(asset_key.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_wire_shape() {
        let raw = r#"{
            "id": "m-1",
            "timestamp": 1700000000000,
            "device_id": "dev-a",
            "type": "text",
            "content": "hello"
        }"#;
        let message = Message::from_json(raw).unwrap();
        assert_eq!(message.id, "m-1");
        assert_eq!(message.kind, MessageKind::Text);
        assert_eq!(message.content.as_deref(), Some("hello"));
        assert!(message.asset_key.is_none());
    }

    #[test]
    fn test_decode_file_wire_shape() {
        let raw = r#"{
            "id": "m-2",
            "timestamp": 1700000001000,
            "device_id": "dev-b",
            "type": "file",
            "mime_type": "image/png",
            "original_name": "shot.png",
            "file_size": 2048,
            "asset_key": "blob/shot.png"
        }"#;
        let message = Message::from_json(raw).unwrap();
        assert_eq!(message.kind, MessageKind::File);
        assert!(message.is_image());
        assert_eq!(message.asset_key.as_deref(), Some("blob/shot.png"));
    }

    #[test]
    fn test_unknown_type_tag_still_decodes() {
        let raw = r#"{
            "id": "m-3",
            "timestamp": 1700000002000,
            "device_id": "dev-a",
            "type": "sticker"
        }"#;
        let message = Message::from_json(raw).unwrap();
        assert_eq!(message.kind, MessageKind::Unknown);
    }

    #[test]
    fn test_malformed_record_is_an_error() {
        assert!(Message::from_json("{\"id\": 7}").is_err());
    }
}
