// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Per-conversation record assembly.
//!
//! A [`ConversationRecord`] combines the linearized thread from
//! [`crate::thread`] with the index metadata from [`crate::metadata`]. It is
//! everything the renderers need to know about one conversation.

use crate::metadata::{message_count, preview};
use crate::parser::{Conversation, epoch_to_datetime};
use crate::thread::{DisplayMessage, ThreadOptions, linearize};
use chrono::{DateTime, Utc};

/// Title used when a conversation has none.
pub const UNTITLED: &str = "Untitled Conversation";

/// A conversation ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationRecord {
    /// The conversation title, never empty.
    pub title: String,

    /// When the conversation was started.
    pub created_at: Option<DateTime<Utc>>,

    /// When the conversation was last updated.
    pub updated_at: Option<DateTime<Utc>>,

    /// The displayable messages in thread order.
    pub messages: Vec<DisplayMessage>,

    /// A one-line snippet of the first user message.
    pub preview: String,

    /// Number of user and assistant messages.
    pub message_count: usize,
}

/// Builds the record for one conversation.
///
/// # Example
///
/// ```
/// use gpt2md::conversation::assemble;
/// use gpt2md::parser::Conversation;
/// use gpt2md::thread::ThreadOptions;
///
/// let record = assemble(&Conversation::default(), &ThreadOptions::default());
///
/// assert_eq!(record.title, "Untitled Conversation");
/// assert!(record.messages.is_empty());
/// assert!(record.created_at.is_none());
/// ```
#[must_use]
pub fn assemble(conv: &Conversation, opts: &ThreadOptions) -> ConversationRecord {
    let title = conv
        .title
        .as_deref()
        .filter(|title| !title.is_empty())
        .unwrap_or(UNTITLED)
        .to_owned();

    ConversationRecord {
        title,
        created_at: conv.create_time.and_then(epoch_to_datetime),
        updated_at: conv.update_time.and_then(epoch_to_datetime),
        messages: linearize(&conv.mapping, opts),
        preview: preview(&conv.mapping),
        message_count: message_count(&conv.mapping),
    }
}

/// Builds records for every conversation in an export, in export order.
#[must_use]
pub fn assemble_all(export: &[Conversation], opts: &ThreadOptions) -> Vec<ConversationRecord> {
    export.iter().map(|conv| assemble(conv, opts)).collect()
}
