// Copyright (c) 2025 John Wilger
// SPDX-License-Identifier: MIT

//! Domain model entities for story documents.
//!
//! This module defines every entity the parser can produce. All entities
//! are owned by the [`StoryGraph`](super::graph::StoryGraph) for its entire
//! lifetime; cross-references between entities are carried as id newtypes
//! and resolved through the graph's lookup accessors rather than through
//! back-pointers.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use nutype::nutype;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

// Id newtypes
// Ids are authored as integer literals; distinct wrappers keep a chapter id
// from being handed to a node lookup.

/// Identifier of a chapter.
#[nutype(derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize
))]
pub struct ChapterId(i64);

/// Identifier of a group.
#[nutype(derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize
))]
pub struct GroupId(i64);

/// Identifier of a node.
#[nutype(derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize
))]
pub struct NodeId(i64);

// Literal values

/// A literal value as authored in a story document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// A string literal.
    String(String),
    /// An integer literal.
    Int(i64),
    /// A floating-point literal.
    Float(f64),
    /// A boolean literal.
    Bool(bool),
}

impl Value {
    /// Returns the type of this literal.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::String(_) => ValueType::String,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Bool(_) => ValueType::Bool,
        }
    }
}

/// The declared type of a variable or linked-list field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueType {
    /// String values.
    String,
    /// Integer values.
    Int,
    /// Boolean values.
    Bool,
    /// Floating-point values.
    Float,
}

impl ValueType {
    /// Resolves a type-name literal (`"string"`, `"int"`, `"bool"`,
    /// `"float"`) to a [`ValueType`].
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(ValueType::String),
            "int" => Some(ValueType::Int),
            "bool" => Some(ValueType::Bool),
            "float" => Some(ValueType::Float),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::String => "string",
            ValueType::Int => "int",
            ValueType::Bool => "bool",
            ValueType::Float => "float",
        };
        f.write_str(name)
    }
}

// Global variables

/// A global variable declaration with a typed default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalVariable {
    /// Name of the variable, unique among global variables.
    pub name: String,
    /// Declared type.
    pub value_type: ValueType,
    /// Default value; its type always matches `value_type`.
    pub default: Value,
}

// Linked lists

/// Who a linked list applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListScope {
    /// Per-character data.
    Character,
    /// Both character and global data.
    Both,
    /// Global data.
    Global,
}

impl ListScope {
    /// Resolves a scope-name literal to a [`ListScope`].
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "character" => Some(ListScope::Character),
            "both" => Some(ListScope::Both),
            "global" => Some(ListScope::Global),
            _ => None,
        }
    }
}

/// A linked-list type declaration: a named, scoped record structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedListType {
    /// Name of the list type, unique among linked lists.
    pub name: String,
    /// Scope the list applies to.
    pub scope: ListScope,
    /// Field name to field type, in declaration order. Never empty.
    pub structure: IndexMap<String, ValueType>,
}

// Characters

/// One record of linked-list data: field name to value, in authored order.
pub type ListRecord = IndexMap<String, Value>;

/// A character's data for one linked list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ListData {
    /// A single record.
    Single(ListRecord),
    /// An ordered sequence of keyed records.
    Keyed(Vec<(String, ListRecord)>),
}

/// A character definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Name of the character, unique among characters.
    pub name: String,
    /// Biography text, possibly empty.
    pub biography: String,
    /// Description text, possibly empty.
    pub description: String,
    /// Linked-list name to this character's data for that list.
    pub list_data: IndexMap<String, ListData>,
}

// Tags

/// Whether a tag is a bare marker or carries a selected key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagKind {
    /// A bare marker tag.
    Single,
    /// A tag with a set of selectable keys.
    KeyValue,
}

impl TagKind {
    /// Resolves a kind-name literal (`"single"`, `"key-value"`) to a
    /// [`TagKind`].
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "single" => Some(TagKind::Single),
            "key-value" => Some(TagKind::KeyValue),
            _ => None,
        }
    }
}

lazy_static! {
    static ref TAG_COLOR_FORMAT: Regex = Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap();
}

/// A display color in `#rrggbb` form.
#[nutype(
    validate(regex = TAG_COLOR_FORMAT),
    derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)
)]
pub struct TagColor(String);

/// A tag definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagDefinition {
    /// Name of the tag, unique among tags.
    pub name: String,
    /// Marker or key-value tag.
    pub kind: TagKind,
    /// Display color.
    pub color: TagColor,
    /// Selectable keys, in authored order. Preserved as written even for
    /// marker tags.
    pub keys: Vec<String>,
}

// Chapters, groups, nodes

/// A chapter: the coarsest unit of story structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    /// Identifier, unique among chapters.
    pub id: ChapterId,
    /// Display name.
    pub name: String,
}

/// A tag applied to a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedTag {
    /// Name of the tag definition being applied.
    pub name: String,
    /// Selected key, for key-value tags.
    pub key: Option<String>,
    /// Value recorded for the selected key.
    pub value: Option<Value>,
}

/// The directed successor structure of a group's nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGraph {
    /// Entry node.
    pub start: NodeId,
    /// Exit node.
    pub end: NodeId,
    /// Node id to its ordered successors.
    pub points: IndexMap<NodeId, Vec<NodeId>>,
}

/// A group: a set of nodes within a chapter, with tags and list bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Identifier, unique among groups.
    pub id: GroupId,
    /// Chapter this group belongs to.
    pub chapter: ChapterId,
    /// Display name.
    pub name: String,
    /// Content text.
    pub content: String,
    /// Enclosing group, if any.
    pub parent: Option<GroupId>,
    /// Tags applied to this group, in authored order.
    pub tags: Vec<AppliedTag>,
    /// Names of linked lists active within this group.
    pub linked_lists: Vec<String>,
    /// Node successor structure, if the group declares one.
    pub node_graph: Option<NodeGraph>,
}

/// A node: a titled timeline of dialogues and actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Identifier, unique among nodes.
    pub id: NodeId,
    /// Display title.
    pub title: String,
    /// Content text.
    pub content: String,
    /// Ordered timeline items. Labels within the timeline are authored
    /// numbers and are not required to be unique.
    pub timeline: Vec<TimelineItem>,
}

// Timeline items

/// One item in a node's timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TimelineItem {
    /// A block of spoken lines.
    Dialogue(DialogueItem),
    /// An action.
    Action(ActionItem),
}

/// A dialogue block: one or more speaker/text lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueItem {
    /// Authored numeric label.
    pub label: i64,
    /// Spoken lines, in authored order. Never empty.
    pub lines: Vec<DialogueLine>,
}

/// One spoken line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueLine {
    /// Speaker name.
    pub speaker: String,
    /// Spoken text.
    pub text: String,
}

/// An action with its authored label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    /// Authored numeric label.
    pub label: i64,
    /// What the action does.
    pub kind: ActionKind,
}

/// What kind of work an action describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionKind {
    /// An opaque code block, carried verbatim for the host to evaluate.
    Code(String),
    /// Jump to another node in the current group.
    Goto(NodeId),
    /// Leave the current node or group.
    Exit(ExitScope),
    /// Enter another group at its start node.
    Enter(GroupId),
    /// Offer the player a set of options.
    Choice(Vec<ChoiceOption>),
    /// A structured story event.
    Event(StoryEvent),
}

/// What an exit action leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitScope {
    /// End the current node.
    Node,
    /// End the current node and group.
    Group,
}

/// One selectable option of a choice action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
    /// Text shown to the player.
    pub text: String,
    /// Actions executed when this option is selected, in authored order.
    pub actions: Vec<ActionItem>,
}

// Events

/// A structured story event. Navigation events move the cursor; the rest
/// are passed through to the host, which owns all game state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoryEvent {
    /// Move to the current node's first successor in the group point-map.
    NextNode,
    /// End the current node.
    ExitCurrentNode,
    /// End the current node and group.
    ExitCurrentGroup,
    /// Change a global variable.
    AdjustVariable {
        /// Name of the variable.
        name: String,
        /// The change to apply.
        op: VariableOp,
    },
    /// Add a state to a character.
    AddState {
        /// Name of the state.
        state: String,
        /// Name of the character.
        character: String,
    },
    /// Remove a state from a character.
    RemoveState {
        /// Name of the state.
        state: String,
        /// Name of the character.
        character: String,
    },
    /// Navigate to any combination of chapter, group, and node. Unset
    /// targets are left unchanged.
    ProgressStory {
        /// Target chapter, if any.
        chapter: Option<ChapterId>,
        /// Target group, if any.
        group: Option<GroupId>,
        /// Target node, if any.
        node: Option<NodeId>,
    },
    /// Modify linked-list data for every owning character in the current
    /// group.
    LinkedList {
        /// Name of the linked list.
        list: String,
        /// Field changes, in authored order.
        changes: Vec<FieldChange>,
    },
}

/// The single change an `adjust-variable` event applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VariableOp {
    /// Add the value to the variable.
    Increment(Value),
    /// Assign the value to the variable.
    Set(Value),
    /// Flip a boolean variable.
    Toggle,
}

/// One field change within a linked-list event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Name of the field being changed.
    pub field: String,
    /// The change to apply.
    pub op: ListOp,
}

/// The change a linked-list field change applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ListOp {
    /// Add the value to the field.
    Amount(Value),
    /// Assign the value to the field.
    Set(Value),
    /// Append the value to the field.
    Append(Value),
    /// Replace the field with the value.
    Replace(Value),
    /// Toggle the field with the value.
    Toggle(Value),
}
