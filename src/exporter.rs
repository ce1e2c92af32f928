//! Write side of the export: the chat-export JSON schema, the row-to-record
//! mapping and document assembly.

use crate::error::ExportError;
use crate::importer::{StoredMessage, User};
use crate::utils::{self, MappingOptions, UserResolution};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Guild {
    pub id: String,
    pub name: String,
    /// The literal string `"null"`, not a JSON null.
    pub icon_url: String,
}

impl Guild {
    /// The source only models direct messages, so every export shares one guild.
    pub fn direct_messages() -> Self {
        Self {
            id: "0".into(),
            name: "Direct Messages".into(),
            icon_url: "null".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub category_id: String,
    pub category: String,
    pub name: String,
    pub topic: Option<String>,
}

impl Channel {
    pub fn direct(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: "DirectTextChat".into(),
            category_id: "0".into(),
            category: "Private".into(),
            name: name.to_string(),
            topic: None,
        }
    }
}

/// Always unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub after: Option<String>,
    pub before: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub name: Option<String>,
    pub discriminator: Option<String>,
    pub nickname: Option<String>,
    pub color: Option<String>,
    pub is_bot: bool,
    pub avatar_url: Option<String>,
}

impl Author {
    fn new(sender_id: &str, user: Option<&User>) -> Self {
        let name = user.and_then(|u| u.display_name.clone());
        Self {
            id: sender_id.to_string(),
            nickname: name.clone(),
            name,
            discriminator: user.and_then(|u| u.discriminator.clone()),
            color: None,
            is_bot: false,
            avatar_url: user.and_then(|u| u.avatar_url.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMessage {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: String,
    pub timestamp_edited: String,
    pub is_pinned: bool,
    pub content: String,
    pub author: Author,
    // The schema has room for these but the source never fills them.
    pub attachments: Vec<serde_json::Value>,
    pub embeds: Vec<serde_json::Value>,
    pub stickers: Vec<serde_json::Value>,
    pub reactions: Vec<serde_json::Value>,
    pub mentions: Vec<serde_json::Value>,
}

/// One channel's export. `messageCount` is derived from `messages` when serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub guild: Guild,
    pub channel: Channel,
    pub date_range: DateRange,
    pub messages: Vec<ExportMessage>,
}

impl ExportDocument {
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

impl Serialize for ExportDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut doc = serializer.serialize_struct("ExportDocument", 5)?;
        doc.serialize_field("guild", &self.guild)?;
        doc.serialize_field("channel", &self.channel)?;
        doc.serialize_field("dateRange", &self.date_range)?;
        doc.serialize_field("messages", &self.messages)?;
        doc.serialize_field("messageCount", &self.message_count())?;
        doc.end()
    }
}

/// Turn a stored message and its (possibly missing) sender into an export record.
pub fn map_message(
    msg: &StoredMessage,
    user: Option<&User>,
    options: MappingOptions,
) -> Result<ExportMessage, ExportError> {
    if user.is_none() && options.user_resolution == UserResolution::Strict {
        return Err(ExportError::UserNotFound {
            message_id: msg.message_id.clone(),
            sender_id: msg.sender_id.clone(),
        });
    }

    let timestamp = utils::format_timestamp(&msg.timestamp, &msg.message_id, options)?;
    // Never-edited messages report their send time as the edit time.
    let timestamp_edited = if msg.edit_timestamp.is_empty() {
        timestamp.clone()
    } else {
        utils::format_timestamp(&msg.edit_timestamp, &msg.message_id, options)?
    };

    Ok(ExportMessage {
        id: msg.message_id.clone(),
        kind: "Default".into(),
        timestamp,
        timestamp_edited,
        is_pinned: false,
        content: msg.content.clone(),
        author: Author::new(&msg.sender_id, user),
        attachments: Vec::new(),
        embeds: Vec::new(),
        stickers: Vec::new(),
        reactions: Vec::new(),
        mentions: Vec::new(),
    })
}

pub fn assemble_document(
    channel_id: &str,
    channel_name: &str,
    messages: Vec<ExportMessage>,
) -> ExportDocument {
    ExportDocument {
        guild: Guild::direct_messages(),
        channel: Channel::direct(channel_id, channel_name),
        date_range: DateRange::default(),
        messages,
    }
}

/// Serialize `doc` as JSON with two-space indentation.
pub fn write_document<W: Write>(writer: &mut W, doc: &ExportDocument) -> std::io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, doc).map_err(std::io::Error::other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::TimestampMode;
    use serde_json::{Value, json};

    fn stored(id: &str, sender: &str, ts: &str) -> StoredMessage {
        StoredMessage {
            message_id: id.into(),
            sender_id: sender.into(),
            content: format!("message {id}"),
            timestamp: ts.into(),
            edit_timestamp: String::new(),
        }
    }

    fn alice() -> User {
        User {
            display_name: Some("Alice".into()),
            avatar_url: Some("https://cdn.example/u1.png".into()),
            discriminator: Some("0420".into()),
        }
    }

    fn to_value(doc: &ExportDocument) -> Value {
        let mut buf = Vec::new();
        write_document(&mut buf, doc).unwrap();
        serde_json::from_slice(&buf).unwrap()
    }

    #[test]
    fn maps_a_message_with_a_known_sender() {
        let user = alice();
        let record = map_message(&stored("1", "u1", "1609459200000"), Some(&user), MappingOptions::default()).unwrap();

        assert_eq!(record.kind, "Default");
        assert_eq!(record.timestamp, "2021-01-01T00:00:00.000+00:00");
        assert_eq!(record.timestamp_edited, record.timestamp);
        assert_eq!(record.content, "message 1");
        assert_eq!(record.author.name.as_deref(), Some("Alice"));
        assert_eq!(record.author.nickname, record.author.name);
        assert_eq!(record.author.discriminator.as_deref(), Some("0420"));
        assert_eq!(record.author.avatar_url.as_deref(), Some("https://cdn.example/u1.png"));
        assert!(!record.author.is_bot);
        assert!(record.author.color.is_none());
    }

    #[test]
    fn lenient_resolution_leaves_author_fields_null() {
        let record = map_message(&stored("1", "ghost", "1609459200000"), None, MappingOptions::default()).unwrap();

        let author = serde_json::to_value(&record.author).unwrap();
        assert_eq!(
            author,
            json!({
                "id": "ghost",
                "name": null,
                "discriminator": null,
                "nickname": null,
                "color": null,
                "isBot": false,
                "avatarUrl": null,
            })
        );
    }

    #[test]
    fn strict_resolution_rejects_unknown_senders() {
        let options = MappingOptions {
            user_resolution: UserResolution::Strict,
            ..MappingOptions::default()
        };
        let err = map_message(&stored("9", "ghost", "1609459200000"), None, options).unwrap_err();
        assert!(matches!(
            err,
            ExportError::UserNotFound { ref sender_id, .. } if sender_id == "ghost"
        ));
    }

    #[test]
    fn stored_edit_time_is_used_when_present() {
        let mut msg = stored("1", "u1", "1609459200000");
        msg.edit_timestamp = "1609459260500".into();
        let record = map_message(&msg, None, MappingOptions::default()).unwrap();
        assert_eq!(record.timestamp_edited, "2021-01-01T00:01:00.500+00:00");
    }

    #[test]
    fn raw_mode_copies_stored_text() {
        let options = MappingOptions {
            timestamp_mode: TimestampMode::Raw,
            ..MappingOptions::default()
        };
        let record = map_message(&stored("1", "u1", "1609459200000"), None, options).unwrap();
        assert_eq!(record.timestamp, "1609459200000");
        assert_eq!(record.timestamp_edited, "1609459200000");
    }

    #[test]
    fn malformed_timestamp_is_an_error() {
        let err = map_message(&stored("1", "u1", "12:00"), None, MappingOptions::default()).unwrap_err();
        assert!(matches!(err, ExportError::MalformedTimestamp { .. }));
    }

    #[test]
    fn empty_channel_document_keeps_fixed_metadata() {
        let doc = assemble_document("C", "", Vec::new());
        assert_eq!(
            to_value(&doc),
            json!({
                "guild": { "id": "0", "name": "Direct Messages", "iconUrl": "null" },
                "channel": {
                    "id": "C",
                    "type": "DirectTextChat",
                    "categoryId": "0",
                    "category": "Private",
                    "name": "",
                    "topic": null,
                },
                "dateRange": { "after": null, "before": null },
                "messages": [],
                "messageCount": 0,
            })
        );
    }

    #[test]
    fn message_count_tracks_message_list() {
        for n in [1usize, 2, 17] {
            let records = (0..n)
                .map(|i| map_message(&stored(&i.to_string(), "u1", "0"), None, MappingOptions::default()).unwrap())
                .collect();
            let doc = assemble_document("C", "dm", records);
            let value = to_value(&doc);
            assert_eq!(doc.message_count(), n);
            assert_eq!(value["messageCount"], json!(n));
            assert_eq!(value["messages"].as_array().unwrap().len(), n);
        }
    }

    #[test]
    fn output_uses_two_space_indent_and_schema_field_order() {
        let record = map_message(&stored("1", "u1", "1609459200000"), None, MappingOptions::default()).unwrap();
        let doc = assemble_document("C", "dm", vec![record]);
        let mut buf = Vec::new();
        write_document(&mut buf, &doc).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.starts_with("{\n  \"guild\": {\n    \"id\": \"0\""));
        assert!(!text.ends_with('\n'));
        let order = ["\"guild\"", "\"channel\"", "\"dateRange\"", "\"messages\"", "\"messageCount\""];
        let positions: Vec<_> = order.iter().map(|k| text.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        for key in ["\"attachments\": []", "\"embeds\": []", "\"stickers\": []", "\"reactions\": []", "\"mentions\": []"] {
            assert!(text.contains(key), "missing {key}");
        }
    }
}
