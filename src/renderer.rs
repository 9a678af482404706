// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Markdown rendering for assembled conversations.
//!
//! This module transforms a [`ConversationRecord`] into a readable Markdown
//! document.
//!
//! # Output Format
//!
//! The rendered Markdown includes:
//! - A top-level heading with the conversation title
//! - Creation and last update times, when known
//! - `## You`, `## ChatGPT` and `## Tool Output` sections for each message,
//!   separated by horizontal rules
//! - Optional per-message timestamps
//!
//! # Example
//!
//! ```
//! use gpt2md::conversation::ConversationRecord;
//! use gpt2md::parser::Role;
//! use gpt2md::renderer::{render_conversation, RenderOptions};
//! use gpt2md::thread::DisplayMessage;
//!
//! let record = ConversationRecord {
//!     title: "Greetings".into(),
//!     created_at: None,
//!     updated_at: None,
//!     messages: vec![
//!         DisplayMessage { role: Role::User, text: "Hello!".into(), time: None },
//!         DisplayMessage { role: Role::Assistant, text: "Hi there!".into(), time: None },
//!     ],
//!     preview: "Hello!".into(),
//!     message_count: 2,
//! };
//!
//! let markdown = render_conversation(&record, &RenderOptions::default());
//!
//! assert!(markdown.starts_with("# Greetings"));
//! assert!(markdown.contains("## You\n\nHello!"));
//! assert!(markdown.contains("## ChatGPT\n\nHi there!"));
//! ```

use crate::conversation::ConversationRecord;
use crate::parser::Role;
use crate::thread::DisplayMessage;
use std::fmt::Write;

/// Configuration options for Markdown rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Whether to show when each message was sent.
    pub show_timestamps: bool,

    /// Number of heading levels to shift (0-5).
    ///
    /// A value of 0 produces H1/H2 headings (default).
    /// A value of 1 produces H2/H3 headings, useful for embedding.
    pub heading_offset: u8,
}

/// Returns a markdown heading prefix with the given level and offset.
///
/// The heading level is clamped to a maximum of 6 (H6).
fn heading(level: u8, offset: u8) -> String {
    let actual = level.saturating_add(offset).min(6);
    "#".repeat(actual as usize)
}

/// The section heading text for a message author.
fn role_label(role: &Role) -> String {
    match role {
        Role::User => "You".to_owned(),
        Role::Assistant => "ChatGPT".to_owned(),
        Role::Tool => "Tool Output".to_owned(),
        other => {
            let name = other.as_str();
            let mut chars = name.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        }
    }
}

/// Renders one conversation as Markdown.
///
/// # Arguments
///
/// * `record` - The assembled conversation to render
/// * `opts` - Configuration options controlling the output format
///
/// # Returns
///
/// A `String` containing the complete Markdown document.
#[must_use]
pub fn render_conversation(record: &ConversationRecord, opts: &RenderOptions) -> String {
    let mut out = String::new();
    writeln!(out, "{} {}\n", heading(1, opts.heading_offset), record.title).unwrap();

    if let Some(created) = record.created_at {
        writeln!(out, "**Created:** {}", created.format("%Y-%m-%d %H:%M")).unwrap();
    }
    if let Some(updated) = record.updated_at {
        writeln!(out, "**Last Updated:** {}", updated.format("%Y-%m-%d %H:%M")).unwrap();
    }
    out.push_str("\n---\n\n");

    for message in &record.messages {
        render_message(&mut out, message, opts);
    }

    out
}

fn render_message(out: &mut String, message: &DisplayMessage, opts: &RenderOptions) {
    writeln!(
        out,
        "{} {}\n",
        heading(2, opts.heading_offset),
        role_label(&message.role)
    )
    .unwrap();

    if opts.show_timestamps
        && let Some(time) = message.time
    {
        writeln!(out, "*{}*\n", time.format("%Y-%m-%d %H:%M UTC")).unwrap();
    }

    writeln!(out, "{}\n\n---\n", escape_outside_fences(&message.text)).unwrap();
}

/// Applies [`escape_xml_tags`] to every line outside fenced code blocks.
fn escape_outside_fences(s: &str) -> String {
    let mut in_fence = false;
    s.split('\n')
        .map(|line| {
            if line.trim_start().starts_with("```") {
                in_fence = !in_fence;
                line.to_owned()
            } else if in_fence {
                line.to_owned()
            } else {
                escape_xml_tags(line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Escapes XML/HTML-like tags so they render literally in Markdown.
///
/// Uses HTML entities (`&lt;` `&gt;`) which are more reliably rendered across
/// markdown viewers. Only escapes `<` when followed by a letter, `/`, or `!`
/// to avoid false positives on mathematical comparisons like `x < 5`.
fn escape_xml_tags(s: &str) -> String {
    let mut result = String::with_capacity(s.len() * 2);
    let mut chars = s.chars().peekable();
    let mut in_tag = false;

    while let Some(c) = chars.next() {
        if c == '<' {
            let is_tag_start = chars
                .peek()
                .is_some_and(|&next| next.is_ascii_alphabetic() || next == '/' || next == '!');

            if is_tag_start {
                result.push_str("&lt;");
                in_tag = true;
            } else {
                result.push(c);
            }
        } else if c == '>' && in_tag {
            result.push_str("&gt;");
            in_tag = false;
        } else {
            result.push(c);
        }
    }

    result
}
