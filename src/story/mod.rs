// Copyright (c) 2025 John Wilger
// SPDX-License-Identifier: MIT

//! The core concepts of a story document.
//!
//! A story document describes a branching narrative through a handful of
//! cross-referenced entities:
//!
//! - **Chapters** are the coarsest structural unit
//! - **Groups** collect nodes within a chapter and carry tags and
//!   linked-list bindings
//! - **Nodes** hold the actual content: an ordered timeline of dialogues
//!   and actions
//! - **Characters**, **states**, **global variables**, **tag definitions**,
//!   and **linked-list types** are the shared vocabulary those timelines
//!   refer to
//!
//! Everything here is owned by the [`StoryGraph`], built once by the
//! parser and read-only afterwards.

pub mod entities;
pub mod graph;
pub mod validator;

pub use entities::{
    ActionItem, ActionKind, AppliedTag, Chapter, ChapterId, Character, ChoiceOption, DialogueItem,
    DialogueLine, ExitScope, FieldChange, GlobalVariable, Group, GroupId, LinkedListType, ListData,
    ListOp, ListRecord, ListScope, Node, NodeGraph, NodeId, StoryEvent, TagColor, TagDefinition,
    TagKind, TimelineItem, Value, ValueType, VariableOp,
};
pub use graph::StoryGraph;
pub use validator::{validate_references, RefKind, UnresolvedReference};
