// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Searchable HTML index of rendered conversations.
//!
//! The index is a single self-contained page. Conversations are grouped by
//! the month they were started, newest first, and a small inline script
//! filters them by title and preview as the user types.
//!
//! # Example
//!
//! ```
//! use gpt2md::index::{IndexEntry, render_index};
//!
//! let entries = vec![IndexEntry {
//!     title: "Rust <3".into(),
//!     created_at: None,
//!     filename: "00000000_Rust 3.md".into(),
//!     preview: "Why is the borrow checker".into(),
//!     message_count: 4,
//! }];
//!
//! let html = render_index(&entries);
//!
//! assert!(html.contains("Rust &lt;3"));
//! assert!(html.contains("Unknown Date"));
//! ```

use crate::conversation::ConversationRecord;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::fmt::Write;

/// One row of the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// The conversation title.
    pub title: String,

    /// When the conversation was started.
    pub created_at: Option<DateTime<Utc>>,

    /// File name of the rendered Markdown, relative to the index.
    pub filename: String,

    /// Snippet of the first user message.
    pub preview: String,

    /// Number of user and assistant messages.
    pub message_count: usize,
}

impl IndexEntry {
    /// Builds the index row for a record written to `filename`.
    #[must_use]
    pub fn new(record: &ConversationRecord, filename: impl Into<String>) -> Self {
        Self {
            title: record.title.clone(),
            created_at: record.created_at,
            filename: filename.into(),
            preview: record.preview.clone(),
            message_count: record.message_count,
        }
    }
}

/// Conversations started in the same month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGroup<'a> {
    /// First day of the month, or `None` for conversations without a date.
    pub month: Option<NaiveDate>,

    /// Entries in this month, newest first.
    pub entries: Vec<&'a IndexEntry>,
}

impl MonthGroup<'_> {
    /// Stable identifier such as `2024-12`, or `Unknown`.
    #[must_use]
    pub fn key(&self) -> String {
        self.month
            .map_or_else(|| "Unknown".to_owned(), |m| m.format("%Y-%m").to_string())
    }

    /// Heading text such as `December 2024`, or `Unknown Date`.
    #[must_use]
    pub fn label(&self) -> String {
        self.month.map_or_else(
            || "Unknown Date".to_owned(),
            |m| m.format("%B %Y").to_string(),
        )
    }
}

/// Groups entries by creation month.
///
/// Months are ordered newest first with undated entries last. Within a
/// month, entries are ordered by creation time, newest first; ties keep
/// their input order.
#[must_use]
pub fn group_by_month(entries: &[IndexEntry]) -> Vec<MonthGroup<'_>> {
    let mut by_month: BTreeMap<Option<NaiveDate>, Vec<&IndexEntry>> = BTreeMap::new();
    for entry in entries {
        let month = entry
            .created_at
            .and_then(|dt| NaiveDate::from_ymd_opt(dt.year(), dt.month(), 1));
        by_month.entry(month).or_default().push(entry);
    }

    // `None` sorts first, so walking backwards puts undated entries last.
    by_month
        .into_iter()
        .rev()
        .map(|(month, mut entries)| {
            entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            MonthGroup { month, entries }
        })
        .collect()
}

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>My ChatGPT Conversations</title>
    <style>
        * { box-sizing: border-box; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, sans-serif;
            max-width: 900px;
            margin: 0 auto;
            padding: 20px;
            background: #f5f5f5;
            color: #333;
        }
        h1 { color: #10a37f; border-bottom: 3px solid #10a37f; padding-bottom: 10px; }
        .stats {
            background: #fff;
            padding: 15px 20px;
            border-radius: 8px;
            margin-bottom: 20px;
            box-shadow: 0 2px 4px rgba(0,0,0,0.1);
        }
        .search-box {
            width: 100%;
            padding: 12px 16px;
            font-size: 16px;
            border: 2px solid #ddd;
            border-radius: 8px;
            margin-bottom: 20px;
        }
        .search-box:focus { outline: none; border-color: #10a37f; }
        .month-section {
            background: #fff;
            border-radius: 8px;
            margin-bottom: 15px;
            box-shadow: 0 2px 4px rgba(0,0,0,0.1);
            overflow: hidden;
        }
        .month-header {
            background: #10a37f;
            color: white;
            padding: 12px 20px;
            font-size: 18px;
            font-weight: 600;
            cursor: pointer;
            display: flex;
            justify-content: space-between;
            align-items: center;
        }
        .month-header:hover { background: #0d8a6a; }
        .month-header .count {
            background: rgba(255,255,255,0.2);
            padding: 4px 10px;
            border-radius: 12px;
            font-size: 14px;
        }
        .month-header .toggle { font-size: 14px; }
        .month-content.collapsed { display: none; }
        .conversation { padding: 15px 20px; border-bottom: 1px solid #eee; }
        .conversation:last-child { border-bottom: none; }
        .conversation:hover { background: #f9f9f9; }
        .conversation a { color: #10a37f; text-decoration: none; font-weight: 600; font-size: 16px; }
        .conversation a:hover { text-decoration: underline; }
        .conversation .meta { color: #888; font-size: 13px; margin-top: 4px; }
        .conversation .preview {
            color: #666;
            font-size: 14px;
            margin-top: 8px;
            font-style: italic;
            line-height: 1.4;
        }
        .hidden { display: none; }
        .no-results {
            text-align: center;
            padding: 40px;
            color: #888;
            font-size: 18px;
            background: #fff;
            border-radius: 8px;
        }
    </style>
</head>
<body>
    <h1>My ChatGPT Conversations</h1>
"#;

const PAGE_TAIL: &str = r#"    </div>
    <div id="no-results" class="no-results hidden">No conversations found matching your search.</div>

    <script>
        function toggleMonth(header) {
            const content = header.nextElementSibling;
            const toggle = header.querySelector('.toggle');
            content.classList.toggle('collapsed');
            toggle.textContent = content.classList.contains('collapsed') ? '►' : '▼';
        }

        const searchBox = document.getElementById('search');
        const noResults = document.getElementById('no-results');
        const showingCount = document.getElementById('showing-count');

        searchBox.addEventListener('input', function() {
            const query = this.value.toLowerCase().trim();
            let visibleCount = 0;

            document.querySelectorAll('.month-section').forEach(section => {
                let monthVisible = false;
                section.querySelectorAll('.conversation').forEach(conv => {
                    const title = conv.dataset.title || '';
                    const preview = conv.dataset.preview || '';
                    const matches = !query || title.includes(query) || preview.includes(query);
                    conv.classList.toggle('hidden', !matches);
                    if (matches) {
                        monthVisible = true;
                        visibleCount++;
                    }
                });
                section.classList.toggle('hidden', !monthVisible);

                if (query && monthVisible) {
                    section.querySelector('.month-content').classList.remove('collapsed');
                    section.querySelector('.toggle').textContent = '▼';
                }
            });

            showingCount.textContent = visibleCount;
            noResults.classList.toggle('hidden', visibleCount > 0);
        });
    </script>
</body>
</html>
"#;

/// Renders the complete index page.
///
/// All interpolated text is HTML-escaped. Titles and previews are also
/// stored lowercased in `data-` attributes for the search filter.
#[must_use]
pub fn render_index(entries: &[IndexEntry]) -> String {
    let mut out = String::from(PAGE_HEAD);
    let total = entries.len();

    writeln!(
        out,
        r#"    <div class="stats">
        <strong>Total Conversations:</strong> {total} |
        <strong>Showing:</strong> <span id="showing-count">{total}</span>
    </div>

    <input type="text" class="search-box" id="search" placeholder="Search conversations by title or content...">

    <div id="conversations-container">"#
    )
    .unwrap();

    for group in group_by_month(entries) {
        render_month(&mut out, &group);
    }

    out.push_str(PAGE_TAIL);
    out
}

fn render_month(out: &mut String, group: &MonthGroup<'_>) {
    writeln!(
        out,
        r#"        <div class="month-section" data-month="{key}">
            <div class="month-header" onclick="toggleMonth(this)">
                <span>{label}</span>
                <span><span class="count">{count} conversations</span> <span class="toggle">▼</span></span>
            </div>
            <div class="month-content">"#,
        key = group.key(),
        label = group.label(),
        count = group.entries.len(),
    )
    .unwrap();

    for entry in &group.entries {
        render_entry(out, entry);
    }

    out.push_str("            </div>\n        </div>\n");
}

fn render_entry(out: &mut String, entry: &IndexEntry) {
    let date = entry
        .created_at
        .map_or_else(|| "Unknown".to_owned(), |dt| dt.format("%Y-%m-%d").to_string());

    writeln!(
        out,
        r#"                <div class="conversation" data-title="{search_title}" data-preview="{search_preview}">
                    <a href="{href}">{title}</a>
                    <div class="meta">{date} &bull; {count} messages</div>"#,
        search_title = escape_attr(&entry.title.to_lowercase()),
        search_preview = escape_attr(&entry.preview.to_lowercase()),
        href = escape_html(&escape_href(&entry.filename)),
        title = escape_html(&entry.title),
        count = entry.message_count,
    )
    .unwrap();

    if !entry.preview.is_empty() {
        writeln!(
            out,
            r#"                    <div class="preview">"{}..."</div>"#,
            escape_html(&entry.preview)
        )
        .unwrap();
    }

    out.push_str("                </div>\n");
}

/// Escapes HTML special characters, including both quote styles.
fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// Escapes text for a single-line attribute value.
fn escape_attr(s: &str) -> String {
    escape_html(&s.replace('\r', "").replace('\n', " "))
}

/// Percent-encodes the characters that would change a relative link's
/// meaning.
fn escape_href(s: &str) -> String {
    s.replace('%', "%25").replace('#', "%23")
}
