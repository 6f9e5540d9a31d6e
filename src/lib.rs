// Copyright (c) 2025 John Wilger
// SPDX-License-Identifier: MIT

//! Story Weaver - a type-safe parser and interpreter for branching story
//! documents.
//!
//! This crate parses `.sdc` story documents into an immutable
//! [`StoryGraph`](story::StoryGraph) and steps through node timelines
//! with a borrowing [`StoryCursor`](execution::StoryCursor), yielding
//! discriminated results for dialogue lines, actions, events, choices,
//! and transitions. Hosts (game engines, editors, demo drivers) own all
//! side effects; the core only describes what should happen.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]

/// The version of Story Weaver.
/// This must match the version in Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Cursor-based execution over parsed graphs.
pub mod execution;

/// Lexing and parsing of story document text.
pub mod parsing;

/// Story domain types, lookup, and reference validation.
pub mod story;
