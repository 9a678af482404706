// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Index metadata derived from a conversation's mapping.
//!
//! These scans look at nodes in mapping order and do not depend on the
//! tree walk in [`crate::thread`], so a conversation without a root still
//! gets a preview and a message count.

use crate::parser::{Mapping, Role};
use crate::text::display_text;

/// Maximum preview length in characters.
pub const PREVIEW_LENGTH: usize = 150;

/// Returns a one-line snippet of the first user message.
///
/// Nodes are scanned in mapping order. The first user message with
/// non-empty text is flattened onto one line, trimmed and cut to
/// [`PREVIEW_LENGTH`] characters. Returns an empty string when no user
/// message has text.
///
/// # Example
///
/// ```
/// use gpt2md::metadata::preview;
/// use gpt2md::parser::Conversation;
///
/// let conv: Conversation = serde_json::from_str(r#"{
///     "mapping": {
///         "a": {
///             "message": {
///                 "author": { "role": "user" },
///                 "content": { "content_type": "text", "parts": ["line one\nline two"] }
///             }
///         }
///     }
/// }"#).unwrap();
///
/// assert_eq!(preview(&conv.mapping), "line one line two");
/// ```
#[must_use]
pub fn preview(mapping: &Mapping) -> String {
    mapping
        .values()
        .filter_map(|node| node.message.as_ref())
        .filter(|message| message.role == Role::User)
        .find_map(display_text)
        .map(|text| {
            text.replace('\n', " ")
                .trim()
                .chars()
                .take(PREVIEW_LENGTH)
                .collect()
        })
        .unwrap_or_default()
}

/// Counts the user and assistant messages in a mapping.
///
/// Every node is counted, including nodes on abandoned branches and nodes
/// the tree walk cannot reach. Tool output is not counted.
#[must_use]
pub fn message_count(mapping: &Mapping) -> usize {
    mapping
        .values()
        .filter_map(|node| node.message.as_ref())
        .filter(|message| message.role.is_counted())
        .count()
}
