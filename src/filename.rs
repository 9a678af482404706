// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Output file names for rendered conversations.
//!
//! Names have the form `{YYYYMMDD}_{title}.md`, built from the creation date
//! and a sanitized title. [`FileNamer`] keeps them unique within a run.

use crate::conversation::ConversationRecord;
use std::collections::HashSet;

/// Characters that are invalid in filenames on common filesystems.
const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Maximum length of the title component, in characters.
pub const MAX_TITLE_LENGTH: usize = 50;

/// Fallback used when sanitization leaves nothing.
const FALLBACK_NAME: &str = "Untitled";

/// Date prefix for conversations without a creation time.
const UNKNOWN_DATE: &str = "00000000";

/// Sanitizes a conversation title for use in a filename.
///
/// Applies the following transformations in order:
/// 1. Invalid filesystem characters and non-whitespace control characters
///    removed
/// 2. Whitespace runs collapsed to a single space, ends trimmed
/// 3. Titles over [`MAX_TITLE_LENGTH`] characters cut, dropping the
///    trailing partial word
/// 4. Empty results replaced with `"Untitled"`
///
/// # Example
///
/// ```
/// use gpt2md::filename::sanitize;
///
/// assert_eq!(sanitize("What is 2/3?"), "What is 23");
/// assert_eq!(sanitize("   "), "Untitled");
/// ```
#[must_use]
pub fn sanitize(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !INVALID_CHARS.contains(c) && !(c.is_control() && !c.is_whitespace()))
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    let result = if collapsed.chars().count() > MAX_TITLE_LENGTH {
        let cut: String = collapsed.chars().take(MAX_TITLE_LENGTH).collect();
        match cut.rsplit_once(' ') {
            Some((head, _)) => head.to_owned(),
            None => cut,
        }
    } else {
        collapsed
    };

    if result.is_empty() {
        FALLBACK_NAME.to_owned()
    } else {
        result
    }
}

/// Hands out unique Markdown file names for conversations.
#[derive(Debug, Default)]
pub struct FileNamer {
    used: HashSet<String>,
}

impl FileNamer {
    /// Creates a namer with no names taken.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a file name for `record` not handed out before.
    ///
    /// Collisions get `_1`, `_2`, ... appended to the stem.
    pub fn name_for(&mut self, record: &ConversationRecord) -> String {
        let date = record
            .created_at
            .map_or_else(|| UNKNOWN_DATE.to_owned(), |dt| dt.format("%Y%m%d").to_string());
        let stem = format!("{date}_{}", sanitize(&record.title));

        let mut name = format!("{stem}.md");
        let mut counter = 1;
        while self.used.contains(&name) {
            name = format!("{stem}_{counter}.md");
            counter += 1;
        }
        self.used.insert(name.clone());
        name
    }
}
