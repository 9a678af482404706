// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Display text extraction from message content.

use crate::parser::{Content, Message, Part};

/// Stand-in text for image parts.
pub const IMAGE_PLACEHOLDER: &str = "[Image]";

/// Extracts readable text from a message.
///
/// Text parts are joined with newlines, images become [`IMAGE_PLACEHOLDER`]
/// and code content is wrapped in a fence without a language tag.
///
/// Returns `None` for unsupported content types and for text content with
/// no usable parts. The result may still be `Some("")` when every part is
/// an empty string.
///
/// # Example
///
/// ```
/// use gpt2md::parser::{Content, Message, Part, Role};
/// use gpt2md::text::extract_text;
///
/// let msg = Message {
///     role: Role::User,
///     content: Content::Text {
///         parts: vec![Part::Image, Part::Text("What is this?".into())],
///     },
///     create_time: None,
/// };
///
/// assert_eq!(extract_text(&msg).as_deref(), Some("[Image]\nWhat is this?"));
/// ```
#[must_use]
pub fn extract_text(message: &Message) -> Option<String> {
    match &message.content {
        Content::Text { parts } => {
            let pieces: Vec<&str> = parts
                .iter()
                .filter_map(|part| match part {
                    Part::Text(text) => Some(text.as_str()),
                    Part::Image => Some(IMAGE_PLACEHOLDER),
                    Part::Other => None,
                })
                .collect();

            if pieces.is_empty() {
                None
            } else {
                Some(pieces.join("\n"))
            }
        }
        Content::Code { text } => Some(format!("```\n{text}\n```")),
        Content::Unsupported => None,
    }
}

/// Like [`extract_text`] but treats empty text as absent.
#[must_use]
pub fn display_text(message: &Message) -> Option<String> {
    extract_text(message).filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Role;

    fn make_message(content: Content) -> Message {
        Message {
            role: Role::Assistant,
            content,
            create_time: None,
        }
    }

    fn text_message(parts: Vec<Part>) -> Message {
        make_message(Content::Text { parts })
    }

    #[test]
    fn joins_text_parts_with_newlines() {
        let msg = text_message(vec![Part::Text("one".into()), Part::Text("two".into())]);

        assert_eq!(extract_text(&msg).as_deref(), Some("one\ntwo"));
    }

    #[test]
    fn image_only_message_is_placeholder() {
        let msg = text_message(vec![Part::Image]);

        assert_eq!(extract_text(&msg).as_deref(), Some("[Image]"));
    }

    #[test]
    fn skips_other_parts() {
        let msg = text_message(vec![
            Part::Other,
            Part::Text("kept".into()),
            Part::Other,
        ]);

        assert_eq!(extract_text(&msg).as_deref(), Some("kept"));
    }

    #[test]
    fn no_usable_parts_is_no_text() {
        assert_eq!(extract_text(&text_message(vec![])), None);
        assert_eq!(extract_text(&text_message(vec![Part::Other])), None);
    }

    #[test]
    fn empty_string_part_is_empty_text() {
        let msg = text_message(vec![Part::Text(String::new())]);

        assert_eq!(extract_text(&msg).as_deref(), Some(""));
        assert_eq!(display_text(&msg), None);
    }

    #[test]
    fn wraps_code_in_plain_fence() {
        let msg = make_message(Content::Code {
            text: "print(1)".into(),
        });

        assert_eq!(extract_text(&msg).as_deref(), Some("```\nprint(1)\n```"));
    }

    #[test]
    fn empty_code_still_produces_fence() {
        let msg = make_message(Content::Code {
            text: String::new(),
        });

        assert_eq!(extract_text(&msg).as_deref(), Some("```\n\n```"));
    }

    #[test]
    fn unsupported_content_is_no_text() {
        assert_eq!(extract_text(&make_message(Content::Unsupported)), None);
    }
}
