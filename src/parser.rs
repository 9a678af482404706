// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! JSON parsing for ChatGPT conversation exports.
//!
//! This module handles deserialization of the `conversations.json` file
//! produced by ChatGPT's data export. The format is loosely structured, so
//! every field is read through small accessors that treat a missing or
//! wrongly typed value as absent instead of failing.
//!
//! # Format Overview
//!
//! An export is a JSON array of conversations. Each conversation contains:
//! - A title and creation/update timestamps (epoch seconds)
//! - A `mapping` from node identifiers to nodes
//! - Each node links to its parent and children and may carry a message
//!
//! # Example
//!
//! ```
//! use gpt2md::parser::parse_export;
//!
//! let json = r#"[{
//!     "title": "Greetings",
//!     "create_time": 1733356800.0,
//!     "mapping": {
//!         "root": { "parent": null, "children": ["a"] },
//!         "a": {
//!             "parent": "root",
//!             "children": [],
//!             "message": {
//!                 "author": { "role": "user" },
//!                 "content": { "content_type": "text", "parts": ["Hi"] }
//!             }
//!         }
//!     }
//! }]"#;
//!
//! let export = parse_export(json).unwrap();
//! assert_eq!(export.len(), 1);
//! assert_eq!(export[0].mapping.len(), 2);
//! ```

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use snafu::prelude::*;

/// Error type for export parsing failures.
#[derive(Debug, Snafu)]
pub enum ParseError {
    /// Failed to parse JSON content.
    #[snafu(display("failed to parse JSON: {source}"))]
    Json {
        /// The underlying JSON parsing error.
        source: serde_json::Error,
    },

    /// The document is valid JSON but not a list of conversations.
    #[snafu(display("expected a JSON array of conversations"))]
    NotAnArray,
}

/// Node identifier to node, in the order the export lists them.
pub type Mapping = IndexMap<String, Node>;

/// A single conversation from the export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    /// The conversation title, if one was set.
    pub title: Option<String>,

    /// Creation time in epoch seconds.
    pub create_time: Option<f64>,

    /// Last update time in epoch seconds.
    pub update_time: Option<f64>,

    /// The message tree.
    pub mapping: Mapping,
}

/// A node in a conversation's message tree.
///
/// Structural nodes (such as the root) carry no message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    /// Identifier of the parent node. `None` only for the root.
    pub parent: Option<String>,

    /// Child identifiers in export order.
    ///
    /// `None` when the node has no `children` field at all, which is
    /// distinct from an empty list.
    pub children: Option<Vec<String>>,

    /// The message stored at this node.
    pub message: Option<Message>,
}

/// A message carried by a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Who wrote the message.
    pub role: Role,

    /// The message body.
    pub content: Content,

    /// Creation time in epoch seconds.
    pub create_time: Option<f64>,
}

/// The author role of a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    /// The person using the assistant.
    User,
    /// The assistant.
    Assistant,
    /// Output from a tool (browser, code interpreter, ...).
    Tool,
    /// System prompts and hidden context.
    System,
    /// Any other role, kept verbatim.
    Other(String),
}

impl Role {
    /// Parses a role name as it appears in `author.role`.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "user" => Self::User,
            "assistant" => Self::Assistant,
            "tool" => Self::Tool,
            "system" => Self::System,
            other => Self::Other(other.to_owned()),
        }
    }

    /// The role name as it appears in the export.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
            Self::System => "system",
            Self::Other(name) => name,
        }
    }

    /// Whether messages with this role appear in a rendered thread.
    #[must_use]
    pub const fn is_displayed(&self) -> bool {
        matches!(self, Self::User | Self::Assistant | Self::Tool)
    }

    /// Whether messages with this role count towards a conversation's
    /// message total.
    #[must_use]
    pub const fn is_counted(&self) -> bool {
        matches!(self, Self::User | Self::Assistant)
    }
}

/// The body of a message, keyed by its `content_type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// `text` and `multimodal_text` content: a list of parts.
    Text {
        /// The parts in order.
        parts: Vec<Part>,
    },

    /// `code` content: a single code string.
    Code {
        /// The code text.
        text: String,
    },

    /// Any other content type.
    Unsupported,
}

/// One part of a text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// A plain string part, or an object part with a `text` field.
    Text(String),

    /// An uploaded or generated image.
    Image,

    /// Any other part shape.
    Other,
}

impl Conversation {
    /// Builds a conversation from a JSON value, defaulting absent fields.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let mapping = value
            .get("mapping")
            .and_then(Value::as_object)
            .map(|nodes| {
                // Entries that are not objects are not nodes at all.
                nodes
                    .iter()
                    .filter(|(_, node)| node.is_object())
                    .map(|(id, node)| (id.clone(), Node::from_value(node)))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            title: get_string(value, &["title"]),
            create_time: get_f64(value, &["create_time"]),
            update_time: get_f64(value, &["update_time"]),
            mapping,
        }
    }
}

impl Node {
    /// Builds a node from a JSON value, defaulting absent fields.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let parent = match value.get("parent") {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) => Some(id.clone()),
            // Not a usable identifier, but the node still is not a root.
            Some(other) => Some(other.to_string()),
        };

        let children = value.get("children").map(|children| {
            children
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        });

        let message = value.get("message").and_then(Message::from_value);

        Self {
            parent,
            children,
            message,
        }
    }
}

impl Message {
    /// Builds a message from a JSON value.
    ///
    /// Returns `None` when the value is not an object.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_object()?;

        let role = get_str(value, &["author", "role"]).map_or_else(
            || Role::Other("unknown".to_owned()),
            Role::parse,
        );

        Some(Self {
            role,
            content: value
                .get("content")
                .map_or(Content::Unsupported, Content::from_value),
            create_time: get_f64(value, &["create_time"]),
        })
    }
}

impl Content {
    /// Builds message content from the `content` object.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match get_str(value, &["content_type"]) {
            Some("text" | "multimodal_text") => Self::Text {
                parts: value
                    .get("parts")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                    .map(Part::from_value)
                    .collect(),
            },
            Some("code") => Self::Code {
                text: get_string(value, &["text"]).unwrap_or_default(),
            },
            _ => Self::Unsupported,
        }
    }
}

impl Part {
    /// Classifies one entry of a `parts` array.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text.clone()),
            Value::Object(_) => {
                if get_str(value, &["content_type"]) == Some("image_asset_pointer") {
                    Self::Image
                } else if let Some(text) = get_str(value, &["text"]) {
                    Self::Text(text.to_owned())
                } else {
                    Self::Other
                }
            }
            _ => Self::Other,
        }
    }
}

impl<'de> Deserialize<'de> for Conversation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

/// Navigates a JSON path and returns the string value at the end.
///
/// # Arguments
///
/// * `value` - The root JSON value to navigate from
/// * `path` - A sequence of keys to follow through the JSON structure
fn get_str<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut current = value;
    for key in path {
        current = current.get(*key)?;
    }
    current.as_str()
}

/// Like [`get_str`] but returns an owned `String`.
fn get_string(value: &Value, path: &[&str]) -> Option<String> {
    get_str(value, path).map(str::to_owned)
}

/// Navigates a JSON path and returns the number at the end.
fn get_f64(value: &Value, path: &[&str]) -> Option<f64> {
    let mut current = value;
    for key in path {
        current = current.get(*key)?;
    }
    current.as_f64()
}

/// Converts an epoch timestamp in (fractional) seconds to a UTC date-time.
///
/// Returns `None` for non-finite or out-of-range values.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn epoch_to_datetime(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0);
    DateTime::from_timestamp(whole as i64, nanos as u32)
}

/// Parses a `conversations.json` document into its conversations.
///
/// This is the main entry point for parsing ChatGPT exports. Individual
/// conversations never fail to parse; malformed fields are treated as
/// absent.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or its top level is not an
/// array.
///
/// # Example
///
/// ```
/// use gpt2md::parser::parse_export;
///
/// let export = parse_export("[]").unwrap();
/// assert!(export.is_empty());
///
/// assert!(parse_export("{}").is_err());
/// ```
pub fn parse_export(json_str: &str) -> Result<Vec<Conversation>, ParseError> {
    let value: Value = serde_json::from_str(json_str).context(JsonSnafu)?;
    let Value::Array(items) = value else {
        return NotAnArraySnafu.fail();
    };
    Ok(items.iter().map(Conversation::from_value).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message_json(role: &str, content: &Value) -> Value {
        json!({
            "author": { "role": role },
            "content": content,
            "create_time": 1_733_356_800.5
        })
    }

    #[test]
    fn parses_minimal_export() {
        let export = parse_export(
            r#"[{
                "title": "Hello",
                "create_time": 1733356800.0,
                "update_time": 1733360400.0,
                "mapping": {}
            }]"#,
        )
        .unwrap();

        assert_eq!(export.len(), 1);
        assert_eq!(export[0].title.as_deref(), Some("Hello"));
        assert_eq!(export[0].create_time, Some(1_733_356_800.0));
        assert_eq!(export[0].update_time, Some(1_733_360_400.0));
        assert!(export[0].mapping.is_empty());
    }

    #[test]
    fn preserves_mapping_order() {
        let export = parse_export(
            r#"[{"mapping": {
                "zeta": { "parent": null },
                "alpha": { "parent": "zeta" },
                "mid": { "parent": "alpha" }
            }}]"#,
        )
        .unwrap();

        let keys: Vec<&str> = export[0].mapping.keys().map(String::as_str).collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn drops_non_object_mapping_entries() {
        let conv = Conversation::from_value(&json!({
            "mapping": {
                "junk": null,
                "root": { "parent": null },
                "num": 7,
                "str": "node"
            }
        }));

        let keys: Vec<&str> = conv.mapping.keys().map(String::as_str).collect();
        assert_eq!(keys, ["root"]);
    }

    #[test]
    fn defaults_missing_conversation_fields() {
        let conv = Conversation::from_value(&json!({}));

        assert_eq!(conv, Conversation::default());
    }

    #[test]
    fn treats_non_object_conversation_as_empty() {
        let export = parse_export(r#"[42, "text", null]"#).unwrap();

        assert_eq!(export.len(), 3);
        assert!(export.iter().all(|c| *c == Conversation::default()));
    }

    #[test]
    fn ignores_wrongly_typed_fields() {
        let conv = Conversation::from_value(&json!({
            "title": 7,
            "create_time": "yesterday",
            "mapping": ["not", "an", "object"]
        }));

        assert!(conv.title.is_none());
        assert!(conv.create_time.is_none());
        assert!(conv.mapping.is_empty());
    }

    #[test]
    fn parses_node_links() {
        let node = Node::from_value(&json!({
            "parent": "p",
            "children": ["a", 5, "b"]
        }));

        assert_eq!(node.parent.as_deref(), Some("p"));
        assert_eq!(node.children, Some(vec!["a".to_owned(), "b".to_owned()]));
        assert!(node.message.is_none());
    }

    #[test]
    fn distinguishes_missing_from_empty_children() {
        let missing = Node::from_value(&json!({ "parent": null }));
        let empty = Node::from_value(&json!({ "parent": null, "children": [] }));

        assert!(missing.children.is_none());
        assert_eq!(empty.children, Some(Vec::new()));
    }

    #[test]
    fn non_string_parent_is_not_root() {
        let node = Node::from_value(&json!({ "parent": 12 }));

        assert_eq!(node.parent.as_deref(), Some("12"));
    }

    #[test]
    fn null_message_is_absent() {
        let node = Node::from_value(&json!({ "parent": null, "message": null }));

        assert!(node.message.is_none());
    }

    #[test]
    fn parses_text_message() {
        let msg = Message::from_value(&message_json(
            "user",
            &json!({ "content_type": "text", "parts": ["Hello"] }),
        ))
        .unwrap();

        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.create_time, Some(1_733_356_800.5));
        assert_eq!(
            msg.content,
            Content::Text {
                parts: vec![Part::Text("Hello".into())]
            }
        );
    }

    #[test]
    fn parses_multimodal_parts() {
        let msg = Message::from_value(&message_json(
            "user",
            &json!({
                "content_type": "multimodal_text",
                "parts": [
                    { "content_type": "image_asset_pointer", "asset_pointer": "file-service://x" },
                    "Describe this",
                    { "text": "from object" },
                    { "content_type": "audio_transcription" },
                    17
                ]
            }),
        ))
        .unwrap();

        assert_eq!(
            msg.content,
            Content::Text {
                parts: vec![
                    Part::Image,
                    Part::Text("Describe this".into()),
                    Part::Text("from object".into()),
                    Part::Other,
                    Part::Other,
                ]
            }
        );
    }

    #[test]
    fn image_marker_wins_over_text_field() {
        let part = Part::from_value(&json!({
            "content_type": "image_asset_pointer",
            "text": "caption"
        }));

        assert_eq!(part, Part::Image);
    }

    #[test]
    fn parses_code_content() {
        let msg = Message::from_value(&message_json(
            "assistant",
            &json!({ "content_type": "code", "language": "python", "text": "print(1)" }),
        ))
        .unwrap();

        assert_eq!(
            msg.content,
            Content::Code {
                text: "print(1)".into()
            }
        );
    }

    #[test]
    fn unknown_content_type_is_unsupported() {
        let msg = Message::from_value(&message_json(
            "tool",
            &json!({ "content_type": "tether_browsing_display", "result": "..." }),
        ))
        .unwrap();

        assert_eq!(msg.content, Content::Unsupported);
    }

    #[test]
    fn missing_author_is_unknown_role() {
        let msg = Message::from_value(&json!({ "content": { "content_type": "text" } })).unwrap();

        assert_eq!(msg.role, Role::Other("unknown".into()));
        assert_eq!(msg.content, Content::Text { parts: vec![] });
    }

    #[test]
    fn role_round_trips_names() {
        for name in ["user", "assistant", "tool", "system", "critic"] {
            assert_eq!(Role::parse(name).as_str(), name);
        }
    }

    #[test]
    fn role_classification() {
        assert!(Role::Tool.is_displayed());
        assert!(!Role::Tool.is_counted());
        assert!(Role::User.is_counted());
        assert!(!Role::System.is_displayed());
        assert!(!Role::Other("critic".into()).is_displayed());
    }

    #[test]
    fn deserializes_through_serde() {
        let conv: Conversation = serde_json::from_value(json!({ "title": "T" })).unwrap();

        assert_eq!(conv.title.as_deref(), Some("T"));
    }

    #[test]
    fn converts_epoch_seconds() {
        let dt = epoch_to_datetime(1_733_356_800.25).unwrap();

        assert_eq!(dt.to_rfc3339(), "2024-12-05T00:00:00.250+00:00");
    }

    #[test]
    fn rejects_invalid_epoch_seconds() {
        assert!(epoch_to_datetime(f64::NAN).is_none());
        assert!(epoch_to_datetime(f64::INFINITY).is_none());
        assert!(epoch_to_datetime(1e300).is_none());
    }

    #[test]
    fn returns_error_for_invalid_json() {
        assert!(matches!(
            parse_export("not valid json"),
            Err(ParseError::Json { .. })
        ));
    }

    #[test]
    fn returns_error_for_non_array_document() {
        assert!(matches!(
            parse_export(r#"{"title": "x"}"#),
            Err(ParseError::NotAnArray)
        ));
    }
}
