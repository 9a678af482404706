// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Linearization of a conversation's message tree.
//!
//! ChatGPT stores every conversation as a tree: editing a prompt or
//! regenerating a reply adds a sibling branch under the same parent. This
//! module walks that tree depth-first from its root and produces the flat
//! sequence of messages that a reader sees.
//!
//! The walk is iterative and keeps its own visited set, so cyclic or
//! diamond-shaped mappings terminate and never repeat a node.
//!
//! # Example
//!
//! ```
//! use gpt2md::parser::Conversation;
//! use gpt2md::thread::{linearize, ThreadOptions};
//!
//! let conv: Conversation = serde_json::from_str(r#"{
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
//! }"#).unwrap();
//!
//! let messages = linearize(&conv.mapping, &ThreadOptions::default());
//! assert_eq!(messages.len(), 1);
//! assert_eq!(messages[0].text, "Hi");
//! ```

use crate::parser::{Mapping, Node, Role, epoch_to_datetime};
use crate::text::display_text;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Controls how branch points are traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadOptions {
    /// Whether to follow every child of a node.
    ///
    /// When enabled (the default), every edited or regenerated branch is
    /// emitted in export order, one after another. When disabled, only the
    /// last child of each node that exists in the mapping is followed,
    /// which keeps just the most recent edit.
    pub include_all_branches: bool,
}

impl Default for ThreadOptions {
    fn default() -> Self {
        Self {
            include_all_branches: true,
        }
    }
}

/// A message selected for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMessage {
    /// The author role. Always one of user, assistant or tool.
    pub role: Role,

    /// The extracted, non-empty display text.
    pub text: String,

    /// When the message was created, if known.
    pub time: Option<DateTime<Utc>>,
}

/// Returns the identifier of the tree root.
///
/// The root is the first node, in mapping order, without a parent.
#[must_use]
pub fn find_root(mapping: &Mapping) -> Option<&str> {
    mapping
        .iter()
        .find(|(_, node)| node.parent.is_none())
        .map(|(id, _)| id.as_str())
}

/// Builds a parent to children index from the nodes' `parent` links.
///
/// Children appear in mapping order.
#[must_use]
pub fn child_index(mapping: &Mapping) -> HashMap<&str, Vec<&str>> {
    let mut index: HashMap<&str, Vec<&str>> = HashMap::new();
    for (id, node) in mapping {
        if let Some(parent) = node.parent.as_deref()
            && !parent.is_empty()
        {
            index.entry(parent).or_default().push(id);
        }
    }
    index
}

/// Depth-first, pre-order iterator over the nodes reachable from the root.
///
/// Created by [`walk`]. Yields each reachable node exactly once, together
/// with its identifier.
#[derive(Debug)]
pub struct Walk<'a> {
    mapping: &'a Mapping,
    fallback: HashMap<&'a str, Vec<&'a str>>,
    include_all_branches: bool,
    stack: Vec<&'a str>,
    visited: HashSet<&'a str>,
}

impl<'a> Walk<'a> {
    /// Children to descend into, in display order.
    ///
    /// A node's own `children` list is authoritative. Nodes that have no
    /// `children` field fall back to the index built from `parent` links.
    fn children_of(&self, id: &'a str, node: &'a Node) -> Vec<&'a str> {
        node.children.as_deref().map_or_else(
            || self.fallback.get(id).cloned().unwrap_or_default(),
            |children| children.iter().map(String::as_str).collect(),
        )
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = (&'a str, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            if !self.visited.insert(id) {
                trace!(node = id, "skipping already visited node");
                continue;
            }
            let Some(node) = self.mapping.get(id) else {
                debug!(node = id, "skipping dangling child reference");
                continue;
            };

            let children = self.children_of(id, node);
            if self.include_all_branches {
                // Reversed so the first child is popped first.
                self.stack.extend(children.into_iter().rev());
            } else if let Some(&last) = children
                .iter()
                .rev()
                .find(|child| self.mapping.contains_key(**child))
            {
                self.stack.push(last);
            }

            return Some((id, node));
        }
        None
    }
}

/// Walks the tree of `mapping` from its root.
///
/// The walk is empty when no node lacks a parent.
#[must_use]
pub fn walk<'a>(mapping: &'a Mapping, opts: &ThreadOptions) -> Walk<'a> {
    let stack = find_root(mapping).into_iter().collect::<Vec<_>>();
    if stack.is_empty() && !mapping.is_empty() {
        debug!(nodes = mapping.len(), "no root node found");
    }

    Walk {
        mapping,
        fallback: child_index(mapping),
        include_all_branches: opts.include_all_branches,
        stack,
        visited: HashSet::new(),
    }
}

/// Converts a node into a display message, if it has something to show.
fn to_display_message(node: &Node) -> Option<DisplayMessage> {
    let message = node.message.as_ref()?;
    if !message.role.is_displayed() {
        return None;
    }
    let text = display_text(message)?;

    Some(DisplayMessage {
        role: message.role.clone(),
        text,
        time: message.create_time.and_then(epoch_to_datetime),
    })
}

/// Produces the ordered sequence of displayable messages in a conversation.
///
/// Nodes are visited depth-first in `children` order starting at the root.
/// A node contributes a message when it carries one with a user, assistant
/// or tool role and non-empty text.
///
/// This never fails: missing roots, dangling child references and cycles
/// all degrade to fewer messages.
#[must_use]
pub fn linearize(mapping: &Mapping, opts: &ThreadOptions) -> Vec<DisplayMessage> {
    walk(mapping, opts)
        .filter_map(|(_, node)| to_display_message(node))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Conversation;
    use serde_json::{Value, json};

    fn mapping(value: &Value) -> Mapping {
        Conversation::from_value(&json!({ "mapping": value })).mapping
    }

    fn text_node(parent: Option<&str>, role: &str, text: &str, children: &[&str]) -> Value {
        json!({
            "parent": parent,
            "children": children,
            "message": {
                "author": { "role": role },
                "content": { "content_type": "text", "parts": [text] },
                "create_time": 1_733_356_800.0
            }
        })
    }

    fn texts(messages: &[DisplayMessage]) -> Vec<&str> {
        messages.iter().map(|m| m.text.as_str()).collect()
    }

    fn all() -> ThreadOptions {
        ThreadOptions::default()
    }

    fn latest() -> ThreadOptions {
        ThreadOptions {
            include_all_branches: false,
        }
    }

    #[test]
    fn linearizes_simple_exchange() {
        let map = mapping(&json!({
            "root": { "parent": null, "children": ["a"] },
            "a": text_node(Some("root"), "user", "Hi", &["b"]),
            "b": text_node(Some("a"), "assistant", "Hello", &[]),
        }));

        let messages = linearize(&map, &all());

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].text, "Hi");
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].text, "Hello");
        assert_eq!(
            messages[0].time.map(|t| t.timestamp()),
            Some(1_733_356_800)
        );
    }

    #[test]
    fn emits_every_branch_in_children_order() {
        let map = mapping(&json!({
            "root": { "parent": null, "children": ["q"] },
            "q": text_node(Some("root"), "user", "question", &["r1", "r2"]),
            "r1": text_node(Some("q"), "assistant", "first answer", &["f"]),
            "f": text_node(Some("r1"), "user", "follow-up", &[]),
            "r2": text_node(Some("q"), "assistant", "regenerated answer", &[]),
        }));

        assert_eq!(
            texts(&linearize(&map, &all())),
            ["question", "first answer", "follow-up", "regenerated answer"]
        );
    }

    #[test]
    fn latest_branch_follows_last_child_only() {
        let map = mapping(&json!({
            "root": { "parent": null, "children": ["q"] },
            "q": text_node(Some("root"), "user", "question", &["r1", "r2"]),
            "r1": text_node(Some("q"), "assistant", "first answer", &[]),
            "r2": text_node(Some("q"), "assistant", "regenerated answer", &["f"]),
            "f": text_node(Some("r2"), "user", "follow-up", &[]),
        }));

        assert_eq!(
            texts(&linearize(&map, &latest())),
            ["question", "regenerated answer", "follow-up"]
        );
    }

    #[test]
    fn children_order_beats_mapping_order() {
        let map = mapping(&json!({
            "b": text_node(Some("root"), "assistant", "second", &[]),
            "a": text_node(Some("root"), "user", "first", &[]),
            "root": { "parent": null, "children": ["a", "b"] },
        }));

        assert_eq!(texts(&linearize(&map, &all())), ["first", "second"]);
    }

    #[test]
    fn visits_shared_child_once() {
        let map = mapping(&json!({
            "root": { "parent": null, "children": ["a", "b"] },
            "a": text_node(Some("root"), "user", "left", &["shared"]),
            "b": text_node(Some("root"), "user", "right", &["shared"]),
            "shared": text_node(Some("a"), "assistant", "shared", &[]),
        }));

        assert_eq!(
            texts(&linearize(&map, &all())),
            ["left", "shared", "right"]
        );
    }

    #[test]
    fn terminates_on_cycles() {
        let map = mapping(&json!({
            "root": { "parent": null, "children": ["a"] },
            "a": text_node(Some("root"), "user", "ping", &["b"]),
            "b": text_node(Some("a"), "assistant", "pong", &["a", "root"]),
        }));

        assert_eq!(texts(&linearize(&map, &all())), ["ping", "pong"]);
    }

    #[test]
    fn missing_root_yields_nothing() {
        let map = mapping(&json!({
            "a": text_node(Some("b"), "user", "Hi", &["b"]),
            "b": text_node(Some("a"), "assistant", "Hello", &["a"]),
        }));

        assert!(linearize(&map, &all()).is_empty());
        assert!(find_root(&map).is_none());
    }

    #[test]
    fn empty_mapping_yields_nothing() {
        assert!(linearize(&Mapping::new(), &all()).is_empty());
    }

    #[test]
    fn first_parentless_node_is_root() {
        let map = mapping(&json!({
            "x": text_node(None, "user", "from x", &[]),
            "y": text_node(None, "user", "from y", &[]),
        }));

        assert_eq!(find_root(&map), Some("x"));
        assert_eq!(texts(&linearize(&map, &all())), ["from x"]);
    }

    #[test]
    fn non_object_entries_do_not_become_root() {
        let map = mapping(&json!({
            "junk": null,
            "root": { "parent": null, "children": ["a"] },
            "a": text_node(Some("root"), "user", "Hi", &[]),
        }));

        assert_eq!(find_root(&map), Some("root"));
        assert_eq!(texts(&linearize(&map, &all())), ["Hi"]);
    }

    #[test]
    fn latest_branch_skips_dangling_last_child() {
        let map = mapping(&json!({
            "root": { "parent": null, "children": ["a", "gone"] },
            "a": text_node(Some("root"), "user", "Hi", &["b", "also-gone"]),
            "b": text_node(Some("a"), "assistant", "Hello", &[]),
        }));

        assert_eq!(texts(&linearize(&map, &latest())), ["Hi", "Hello"]);
    }

    #[test]
    fn skips_dangling_children() {
        let map = mapping(&json!({
            "root": { "parent": null, "children": ["gone", "a"] },
            "a": text_node(Some("root"), "user", "still here", &["also-gone"]),
        }));

        assert_eq!(texts(&linearize(&map, &all())), ["still here"]);
    }

    #[test]
    fn filters_roles_outside_the_thread() {
        let map = mapping(&json!({
            "root": { "parent": null, "children": ["s"] },
            "s": text_node(Some("root"), "system", "You are ChatGPT", &["u"]),
            "u": text_node(Some("s"), "user", "Hi", &["t"]),
            "t": text_node(Some("u"), "tool", "search results", &["c"]),
            "c": text_node(Some("t"), "critic", "hmm", &[]),
        }));

        let messages = linearize(&map, &all());

        assert_eq!(texts(&messages), ["Hi", "search results"]);
        assert_eq!(messages[1].role, Role::Tool);
    }

    #[test]
    fn skips_messages_without_text() {
        let map = mapping(&json!({
            "root": { "parent": null, "children": ["a", "b", "c"] },
            "a": text_node(Some("root"), "assistant", "", &[]),
            "b": {
                "parent": "root",
                "children": [],
                "message": {
                    "author": { "role": "assistant" },
                    "content": { "content_type": "tether_quote", "text": "quote" }
                }
            },
            "c": text_node(Some("root"), "assistant", "visible", &[]),
        }));

        assert_eq!(texts(&linearize(&map, &all())), ["visible"]);
    }

    #[test]
    fn falls_back_to_parent_links_without_children_field() {
        let map = mapping(&json!({
            "root": { "parent": null },
            "a": {
                "parent": "root",
                "message": {
                    "author": { "role": "user" },
                    "content": { "content_type": "text", "parts": ["one"] }
                }
            },
            "b": text_node(Some("a"), "assistant", "two", &[]),
        }));

        assert_eq!(texts(&linearize(&map, &all())), ["one", "two"]);
    }

    #[test]
    fn empty_children_field_is_authoritative() {
        let map = mapping(&json!({
            "root": { "parent": null, "children": [] },
            "a": text_node(Some("root"), "user", "orphaned by children list", &[]),
        }));

        assert!(linearize(&map, &all()).is_empty());
    }

    #[test]
    fn invalid_message_time_is_absent() {
        let map = mapping(&json!({
            "root": { "parent": null, "children": ["a"] },
            "a": {
                "parent": "root",
                "children": [],
                "message": {
                    "author": { "role": "user" },
                    "content": { "content_type": "text", "parts": ["Hi"] },
                    "create_time": null
                }
            }
        }));

        let messages = linearize(&map, &all());

        assert_eq!(messages.len(), 1);
        assert!(messages[0].time.is_none());
    }

    #[test]
    fn is_deterministic() {
        let map = mapping(&json!({
            "root": { "parent": null, "children": ["q"] },
            "q": text_node(Some("root"), "user", "q", &["r1", "r2", "r3"]),
            "r1": text_node(Some("q"), "assistant", "r1", &[]),
            "r2": text_node(Some("q"), "assistant", "r2", &[]),
            "r3": text_node(Some("q"), "assistant", "r3", &[]),
        }));

        let first = linearize(&map, &all());
        for _ in 0..10 {
            assert_eq!(linearize(&map, &all()), first);
        }
    }

    #[test]
    fn handles_very_deep_chains() {
        let depth = 50_000;
        let mut map = Mapping::new();
        for i in 0..depth {
            let parent = (i > 0).then(|| format!("n{}", i - 1));
            let children = if i + 1 < depth {
                vec![format!("n{}", i + 1)]
            } else {
                Vec::new()
            };
            map.insert(
                format!("n{i}"),
                Node {
                    parent,
                    children: Some(children),
                    message: None,
                },
            );
        }

        assert_eq!(walk(&map, &all()).count(), depth);
    }
}
