// Copyright (c) 2025 John Wilger
// SPDX-License-Identifier: MIT

//! Text parsing for story documents.
//!
//! This module turns `.sdc` source text into a [`StoryGraph`]. Parsing is
//! a pure function of the input: each call builds its own parser, and the
//! first error aborts the parse, so independent parses never share state.
//!
//! The format is free-form UTF-8 with `#` comments:
//!
//! ```text
//! chapter 1 { name: "Arrival" }
//!
//! group 10 {
//!     chapter: 1,
//!     name: "The Docks",
//!     nodes: { start: 1, end: 1, points: { 1: [] } }
//! }
//!
//! node 1 {
//!     title: "Pier",
//!     timeline: {
//!         dialogue 1 { Saniyah: "We made it." }
//!     }
//! }
//! ```
//!
//! [`StoryGraph`]: crate::story::StoryGraph

pub mod lexer;
pub mod parser;
mod timeline;

use std::fs;
use std::path::Path;

use crate::story::StoryGraph;

pub use lexer::{tokenize, Keyword, LexErrorKind, Lexer, Token, TokenKind};
pub use parser::ParseError;

use parser::Parser;

/// Errors from parsing a story document held in a file.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// The file could not be read.
    #[error("failed to read story document: {0}")]
    Io(#[from] std::io::Error),

    /// The file's contents did not parse.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Parses story document source text into a [`StoryGraph`].
///
/// # Errors
///
/// Returns the first [`ParseError`] encountered, lexical faults included.
/// No partial graph is exposed on failure.
pub fn parse_string(source: &str) -> Result<StoryGraph, ParseError> {
    Parser::new(source).parse()
}

/// Reads and parses a story document file.
///
/// The `.sdc` extension is conventional but not required.
///
/// # Errors
///
/// Returns [`DocumentError::Io`] if the file cannot be read, or
/// [`DocumentError::Parse`] if its contents do not parse.
pub fn parse_file(path: impl AsRef<Path>) -> Result<StoryGraph, DocumentError> {
    let source = fs::read_to_string(path)?;
    Ok(parse_string(&source)?)
}
