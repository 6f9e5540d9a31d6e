// Copyright (c) 2025 John Wilger
// SPDX-License-Identifier: MIT

//! Cursor-based execution of parsed story graphs.
//!
//! Execution is cooperative and single-threaded: the host calls
//! [`StoryCursor::step`] in a loop, renders or applies each
//! [`ExecutionResult`], and feeds choice selections back through
//! [`StoryCursor::select_choice`]. The cursor only describes what should
//! happen; evaluating code blocks, mutating character state, and
//! rendering text are all host concerns.

pub mod cursor;
pub mod result;

pub use cursor::{CursorError, StoryCursor};
pub use result::{
    EndReason, EventOutcome, ExecutionResult, ListModification, OfferedChoice, SpokenLine, Target,
};
