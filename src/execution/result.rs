// Copyright (c) 2025 John Wilger
// SPDX-License-Identifier: MIT

//! Step results returned to the host.
//!
//! Every variant is a self-contained snapshot: payloads carry copies of
//! names, text, and ids rather than borrows into the graph, so a result
//! outlives the step that produced it and can be shipped across any host
//! boundary. The execution core never applies side effects itself: a
//! result describes what should happen, and the host owns all game state.

use serde::Serialize;

use crate::story::entities::{ChapterId, GroupId, ListOp, ListScope, NodeId, ValueType, VariableOp};

/// What one cursor step produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExecutionResult {
    /// A dialogue block to present.
    Dialogue {
        /// Authored label of the dialogue item.
        label: i64,
        /// Spoken lines, in authored order.
        lines: Vec<SpokenLine>,
    },
    /// An opaque code action for the host to evaluate.
    Action {
        /// Authored label of the action.
        label: i64,
        /// The code block's content, verbatim.
        code: String,
    },
    /// A story event for the host to apply.
    Event {
        /// Authored label of the action that carried the event.
        label: i64,
        /// The normalized event payload.
        event: EventOutcome,
    },
    /// A choice awaiting selection. The cursor holds position until the
    /// host calls `select_choice` and steps again.
    Choice {
        /// Authored label of the choice action.
        label: i64,
        /// The selectable options, in authored order.
        options: Vec<OfferedChoice>,
    },
    /// The cursor moved to a new node or group.
    Transition(Target),
    /// Execution stopped.
    End(EndReason),
}

/// One line of a dialogue result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpokenLine {
    /// Speaker name.
    pub speaker: String,
    /// Spoken text.
    pub text: String,
}

/// One option of a choice result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfferedChoice {
    /// Index to pass to `select_choice`.
    pub index: usize,
    /// Text shown to the player.
    pub text: String,
}

/// Where a transition landed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Target {
    /// The cursor moved to a node.
    Node(NodeId),
    /// The cursor moved to a group.
    Group(GroupId),
}

/// Why execution stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EndReason {
    /// The current node's timeline has no more items.
    TimelineComplete,
    /// An exit action ended the current node.
    ExitNode,
    /// An exit action ended the current node and group.
    ExitGroup,
    /// A next-node event found no successor in the group point-map.
    NoNextNode,
    /// The current item references something that does not resolve.
    InvalidItem,
    /// The cursor's position itself does not resolve to any content.
    NoContent,
}

/// A normalized event payload passed through to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EventOutcome {
    /// Change a global variable. The declared type is resolved from the
    /// graph so the host can apply the operation without a second lookup.
    AdjustVariable {
        /// Name of the variable.
        variable: String,
        /// The variable's declared type.
        value_type: ValueType,
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
    /// A progress-story event that performed no node or group navigation
    /// (chapter-only, or fully unset; the latter is a no-op that still
    /// advances the timeline).
    ProgressStory {
        /// Target chapter, if one was supplied.
        chapter: Option<ChapterId>,
        /// Target group, if one was supplied.
        group: Option<GroupId>,
        /// Target node, if one was supplied.
        node: Option<NodeId>,
    },
    /// Modify linked-list data for the affected characters.
    LinkedList {
        /// Name of the linked list.
        list: String,
        /// The list's declared scope.
        scope: ListScope,
        /// Field modifications, in authored order, with any caller
        /// parameter overrides already substituted.
        modifications: Vec<ListModification>,
        /// Characters that own the list and sit in the current group's
        /// linked-list bindings.
        affected_characters: Vec<String>,
    },
}

/// One field modification of a linked-list event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListModification {
    /// Name of the field being modified.
    pub field: String,
    /// The change to apply.
    pub op: ListOp,
}
