// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Convert ChatGPT conversation exports to Markdown.
//!
//! This crate provides parsing, thread reconstruction and rendering for
//! turning a ChatGPT data export (`conversations.json`) into one Markdown
//! document per conversation plus a searchable `INDEX.html`.
//!
//! # Overview
//!
//! Each exported conversation stores its messages as a tree of nodes: every
//! edit or regeneration adds a branch. This crate:
//!
//! 1. Parses the JSON export into typed, lenient Rust representations
//! 2. Linearizes each node tree into an ordered list of displayable messages
//! 3. Extracts index metadata (preview text, message count)
//! 4. Renders Markdown documents and an HTML index
//!
//! # Example
//!
//! ```no_run
//! use gpt2md::{conversation, parser, renderer, thread};
//!
//! let json = std::fs::read_to_string("conversations.json").unwrap();
//! let export = parser::parse_export(&json).unwrap();
//!
//! let records = conversation::assemble_all(&export, &thread::ThreadOptions::default());
//! for record in &records {
//!     println!("{}", renderer::render_conversation(record, &renderer::RenderOptions::default()));
//! }
//! ```
//!
//! # Modules
//!
//! - [`parser`]: JSON parsing and type definitions for the export format
//! - [`text`]: display text extraction from message content
//! - [`thread`]: node tree linearization
//! - [`metadata`]: preview and message count extraction
//! - [`conversation`]: per-conversation record assembly
//! - [`filename`]: safe, unique output file names
//! - [`renderer`]: Markdown generation
//! - [`index`]: searchable HTML index generation

#![deny(missing_docs)]

pub mod conversation;
pub mod filename;
pub mod index;
pub mod metadata;
pub mod parser;
pub mod renderer;
pub mod text;
pub mod thread;
