// Copyright (c) 2025 John Wilger
// SPDX-License-Identifier: MIT

//! The story graph: the root value produced by a successful parse.
//!
//! The graph owns every parsed entity and is immutable once built. Lookup
//! is by linear scan; story documents are small enough that an index would
//! not pay for itself, and the collections keep declaration order, which
//! the bulk accessors expose directly.

use serde::{Deserialize, Serialize};

use super::entities::{
    Chapter, ChapterId, Character, GlobalVariable, Group, GroupId, LinkedListType, Node, NodeId,
    TagDefinition,
};

/// The root in-memory value holding all parsed entities.
///
/// Constructed only by the parser; thereafter read-only. Execution cursors
/// borrow the graph for their lifetime, so one graph may serve any number
/// of cursors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryGraph {
    pub(crate) states: Vec<String>,
    pub(crate) variables: Vec<GlobalVariable>,
    pub(crate) linked_lists: Vec<LinkedListType>,
    pub(crate) characters: Vec<Character>,
    pub(crate) tags: Vec<TagDefinition>,
    pub(crate) chapters: Vec<Chapter>,
    pub(crate) groups: Vec<Group>,
    pub(crate) nodes: Vec<Node>,
}

impl StoryGraph {
    /// Looks up a chapter by id.
    pub fn get_chapter(&self, id: ChapterId) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id == id)
    }

    /// Looks up a group by id.
    pub fn get_group(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// Looks up a node by id.
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Looks up a tag definition by name.
    pub fn get_tag_definition(&self, name: &str) -> Option<&TagDefinition> {
        self.tags.iter().find(|t| t.name == name)
    }

    /// Looks up a global variable by name.
    pub fn get_global_variable(&self, name: &str) -> Option<&GlobalVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Looks up a linked-list type by name.
    pub fn get_linked_list(&self, name: &str) -> Option<&LinkedListType> {
        self.linked_lists.iter().find(|l| l.name == name)
    }

    /// Looks up a character by name.
    pub fn get_character(&self, name: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.name == name)
    }

    /// All declared states, in declaration order.
    pub fn states(&self) -> &[String] {
        &self.states
    }

    /// All global variables, in declaration order.
    pub fn global_variables(&self) -> &[GlobalVariable] {
        &self.variables
    }

    /// All linked-list types, in declaration order.
    pub fn linked_lists(&self) -> &[LinkedListType] {
        &self.linked_lists
    }

    /// All characters, in declaration order.
    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    /// All tag definitions, in declaration order.
    pub fn tag_definitions(&self) -> &[TagDefinition] {
        &self.tags
    }

    /// All chapters, in declaration order.
    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    /// All groups, in declaration order.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// All nodes, in declaration order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}
