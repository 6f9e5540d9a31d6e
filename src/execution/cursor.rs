// Copyright (c) 2025 John Wilger
// SPDX-License-Identifier: MIT

//! The execution cursor: a stepping interpreter over a story graph.
//!
//! A [`StoryCursor`] borrows a parsed [`StoryGraph`] and owns the only
//! mutable state in the system: the current position (chapter, group,
//! node, timeline index), a pending-choice flag, and a transient parameter
//! map. Each call to [`StoryCursor::step`] advances one timeline item and
//! returns one [`ExecutionResult`]; the cursor never applies side effects
//! itself.
//!
//! The graph is read-only, so any number of cursors may share one graph.
//! Abnormal story outcomes (no successor, dangling references, exhausted
//! timelines) surface as [`ExecutionResult::End`] values; the only errors
//! raised to the caller are choice-selection misuse.

use std::collections::HashMap;

use crate::story::entities::{
    ActionItem, ActionKind, ChapterId, ChoiceOption, ExitScope, FieldChange, GroupId, ListOp,
    NodeId, StoryEvent, TimelineItem, Value,
};
use crate::story::graph::StoryGraph;

use super::result::{
    EndReason, EventOutcome, ExecutionResult, ListModification, OfferedChoice, SpokenLine, Target,
};

/// Caller misuse of the choice protocol.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CursorError {
    /// `select_choice` was called when the previous step did not return a
    /// choice.
    #[error("no choice is pending")]
    NoChoicePending,

    /// The selected index does not name an option of the pending choice.
    #[error("choice index {index} is out of range for {len} options")]
    ChoiceIndexOutOfRange {
        /// The index that was passed.
        index: usize,
        /// How many options the pending choice has.
        len: usize,
    },

    /// `select_choice` was called twice without stepping in between.
    #[error("a selection has already been made for the pending choice")]
    SelectionAlreadyMade,
}

/// A choice returned by the previous step, held until the host selects an
/// option and steps again.
struct PendingChoice {
    label: i64,
    options: Vec<ChoiceOption>,
    selected: Option<usize>,
}

/// What evaluating one action did.
enum Evaluated {
    /// A finished result; `moved` records whether the action repositioned
    /// the cursor (in which case the timeline index was already reset and
    /// must not be advanced past the action).
    Outcome {
        result: ExecutionResult,
        moved: bool,
    },
    /// The action was a choice and execution must suspend.
    Offer {
        label: i64,
        options: Vec<ChoiceOption>,
    },
}

/// A stepping interpreter positioned inside a story graph.
pub struct StoryCursor<'a> {
    graph: &'a StoryGraph,
    chapter: Option<ChapterId>,
    group: Option<GroupId>,
    node: Option<NodeId>,
    timeline_index: usize,
    pending: Option<PendingChoice>,
    parameters: HashMap<(String, String), Value>,
}

impl<'a> StoryCursor<'a> {
    /// Creates an unpositioned cursor over the graph.
    pub fn new(graph: &'a StoryGraph) -> Self {
        Self {
            graph,
            chapter: None,
            group: None,
            node: None,
            timeline_index: 0,
            pending: None,
            parameters: HashMap::new(),
        }
    }

    /// Positions the cursor and clears all transient state.
    ///
    /// The ids are taken as given; a position that does not resolve
    /// surfaces as [`EndReason::NoContent`] on the next step.
    pub fn start(&mut self, chapter: ChapterId, group: GroupId, node: NodeId) {
        self.chapter = Some(chapter);
        self.group = Some(group);
        self.node = Some(node);
        self.timeline_index = 0;
        self.pending = None;
        self.parameters.clear();
    }

    /// Clears all position and transient state.
    pub fn reset(&mut self) {
        self.chapter = None;
        self.group = None;
        self.node = None;
        self.timeline_index = 0;
        self.pending = None;
        self.parameters.clear();
    }

    /// Records which option of the pending choice to execute on the next
    /// step.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::NoChoicePending`] if the previous step did
    /// not return a choice, [`CursorError::SelectionAlreadyMade`] if a
    /// selection was already recorded, and
    /// [`CursorError::ChoiceIndexOutOfRange`] for a bad index.
    pub fn select_choice(&mut self, index: usize) -> Result<(), CursorError> {
        let Some(pending) = self.pending.as_mut() else {
            return Err(CursorError::NoChoicePending);
        };
        if pending.selected.is_some() {
            return Err(CursorError::SelectionAlreadyMade);
        }
        if index >= pending.options.len() {
            return Err(CursorError::ChoiceIndexOutOfRange {
                index,
                len: pending.options.len(),
            });
        }
        pending.selected = Some(index);
        Ok(())
    }

    /// Pushes one override onto the transient parameter stack.
    ///
    /// The next `linked-list` event substitutes the value into the
    /// modification whose list name matches `context` and field name
    /// matches `key`. The stack is cleared after every step that does not
    /// return a choice.
    pub fn add_parameter(
        &mut self,
        context: impl Into<String>,
        key: impl Into<String>,
        value: Value,
    ) {
        self.parameters.insert((context.into(), key.into()), value);
    }

    /// Whether a choice is awaiting selection.
    pub fn is_choice_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether any parameter overrides are currently held.
    pub fn has_parameters(&self) -> bool {
        !self.parameters.is_empty()
    }

    /// The current chapter, if positioned.
    pub fn current_chapter(&self) -> Option<ChapterId> {
        self.chapter
    }

    /// The current group, if positioned.
    pub fn current_group(&self) -> Option<GroupId> {
        self.group
    }

    /// The current node, if positioned.
    pub fn current_node(&self) -> Option<NodeId> {
        self.node
    }

    /// Index of the next timeline item to visit.
    pub fn timeline_index(&self) -> usize {
        self.timeline_index
    }

    /// Advances one timeline item, or consumes a previously-submitted
    /// choice selection.
    pub fn step(&mut self) -> ExecutionResult {
        // a pending choice takes priority over the timeline
        if let Some(pending) = self.pending.take() {
            let Some(index) = pending.selected else {
                // stepped again without selecting: re-offer the choice
                let result = ExecutionResult::Choice {
                    label: pending.label,
                    options: offered(&pending.options),
                };
                self.pending = Some(pending);
                return result;
            };
            let mut last: Option<(ExecutionResult, bool)> = None;
            for action in &pending.options[index].actions {
                let (result, moved) = self.eval_inner(action);
                let terminal = matches!(
                    result,
                    ExecutionResult::Transition(_) | ExecutionResult::End(_)
                );
                last = Some((result, moved));
                if terminal {
                    break;
                }
            }
            let (result, moved) =
                last.unwrap_or((ExecutionResult::End(EndReason::InvalidItem), false));
            if !moved {
                // move past the choice action itself
                self.timeline_index += 1;
            }
            self.parameters.clear();
            return result;
        }

        let graph = self.graph;
        let Some(node_id) = self.node else {
            self.parameters.clear();
            return ExecutionResult::End(EndReason::NoContent);
        };
        let Some(node) = graph.get_node(node_id) else {
            self.parameters.clear();
            return ExecutionResult::End(EndReason::NoContent);
        };
        let Some(item) = node.timeline.get(self.timeline_index) else {
            self.parameters.clear();
            return ExecutionResult::End(EndReason::TimelineComplete);
        };

        match item {
            TimelineItem::Dialogue(dialogue) => {
                let result = ExecutionResult::Dialogue {
                    label: dialogue.label,
                    lines: dialogue
                        .lines
                        .iter()
                        .map(|line| SpokenLine {
                            speaker: line.speaker.clone(),
                            text: line.text.clone(),
                        })
                        .collect(),
                };
                self.timeline_index += 1;
                self.parameters.clear();
                result
            }
            TimelineItem::Action(action) => match self.eval_action(action) {
                Evaluated::Offer { label, options } => {
                    // hold position and parameters until the selection runs
                    let result = ExecutionResult::Choice {
                        label,
                        options: offered(&options),
                    };
                    self.pending = Some(PendingChoice {
                        label,
                        options,
                        selected: None,
                    });
                    result
                }
                Evaluated::Outcome { result, moved } => {
                    if !moved {
                        self.timeline_index += 1;
                    }
                    self.parameters.clear();
                    result
                }
            },
        }
    }

    /// Evaluates one action, mutating position for navigation kinds.
    fn eval_action(&mut self, action: &ActionItem) -> Evaluated {
        let label = action.label;
        match &action.kind {
            ActionKind::Code(code) => Evaluated::Outcome {
                result: ExecutionResult::Action {
                    label,
                    code: code.clone(),
                },
                moved: false,
            },
            ActionKind::Goto(target) => Evaluated::Outcome {
                result: self.move_to_node(*target),
                moved: true,
            },
            ActionKind::Exit(ExitScope::Node) => {
                self.node = None;
                Evaluated::Outcome {
                    result: ExecutionResult::End(EndReason::ExitNode),
                    moved: true,
                }
            }
            ActionKind::Exit(ExitScope::Group) => {
                self.node = None;
                self.group = None;
                Evaluated::Outcome {
                    result: ExecutionResult::End(EndReason::ExitGroup),
                    moved: true,
                }
            }
            ActionKind::Enter(group_id) => self.enter_group(*group_id),
            ActionKind::Choice(options) => Evaluated::Offer {
                label,
                options: options.clone(),
            },
            ActionKind::Event(event) => self.eval_event(label, event),
        }
    }

    /// Evaluates a sub-action of a chosen option. A nested choice cannot
    /// suspend a suspension, so it surfaces as an invalid item.
    fn eval_inner(&mut self, action: &ActionItem) -> (ExecutionResult, bool) {
        match self.eval_action(action) {
            Evaluated::Outcome { result, moved } => (result, moved),
            Evaluated::Offer { .. } => (ExecutionResult::End(EndReason::InvalidItem), false),
        }
    }

    fn move_to_node(&mut self, target: NodeId) -> ExecutionResult {
        self.node = Some(target);
        self.timeline_index = 0;
        ExecutionResult::Transition(Target::Node(target))
    }

    fn enter_group(&mut self, group_id: GroupId) -> Evaluated {
        let graph = self.graph;
        let Some(group) = graph.get_group(group_id) else {
            return Evaluated::Outcome {
                result: ExecutionResult::End(EndReason::InvalidItem),
                moved: false,
            };
        };
        self.group = Some(group.id);
        self.chapter = Some(group.chapter);
        match &group.node_graph {
            Some(node_graph) => {
                self.node = Some(node_graph.start);
                self.timeline_index = 0;
                Evaluated::Outcome {
                    result: ExecutionResult::Transition(Target::Group(group_id)),
                    moved: true,
                }
            }
            None => {
                // nothing to land on: the index is left alone, matching
                // the other NoContent outcomes
                self.node = None;
                Evaluated::Outcome {
                    result: ExecutionResult::End(EndReason::NoContent),
                    moved: true,
                }
            }
        }
    }

    fn eval_event(&mut self, label: i64, event: &StoryEvent) -> Evaluated {
        let graph = self.graph;
        match event {
            StoryEvent::NextNode => {
                let successor = self
                    .group
                    .and_then(|group_id| graph.get_group(group_id))
                    .and_then(|group| group.node_graph.as_ref())
                    .zip(self.node)
                    .and_then(|(node_graph, node)| node_graph.points.get(&node))
                    .and_then(|successors| successors.first())
                    .copied();
                match successor {
                    Some(next) => Evaluated::Outcome {
                        result: self.move_to_node(next),
                        moved: true,
                    },
                    None => Evaluated::Outcome {
                        result: ExecutionResult::End(EndReason::NoNextNode),
                        moved: false,
                    },
                }
            }
            StoryEvent::ExitCurrentNode => {
                self.node = None;
                Evaluated::Outcome {
                    result: ExecutionResult::End(EndReason::ExitNode),
                    moved: true,
                }
            }
            StoryEvent::ExitCurrentGroup => {
                self.node = None;
                self.group = None;
                Evaluated::Outcome {
                    result: ExecutionResult::End(EndReason::ExitGroup),
                    moved: true,
                }
            }
            StoryEvent::AdjustVariable { name, op } => {
                match graph.get_global_variable(name) {
                    Some(variable) => Evaluated::Outcome {
                        result: ExecutionResult::Event {
                            label,
                            event: EventOutcome::AdjustVariable {
                                variable: name.clone(),
                                value_type: variable.value_type,
                                op: op.clone(),
                            },
                        },
                        moved: false,
                    },
                    // the declared type cannot be resolved
                    None => Evaluated::Outcome {
                        result: ExecutionResult::End(EndReason::InvalidItem),
                        moved: false,
                    },
                }
            }
            StoryEvent::AddState { state, character } => Evaluated::Outcome {
                result: ExecutionResult::Event {
                    label,
                    event: EventOutcome::AddState {
                        state: state.clone(),
                        character: character.clone(),
                    },
                },
                moved: false,
            },
            StoryEvent::RemoveState { state, character } => Evaluated::Outcome {
                result: ExecutionResult::Event {
                    label,
                    event: EventOutcome::RemoveState {
                        state: state.clone(),
                        character: character.clone(),
                    },
                },
                moved: false,
            },
            StoryEvent::ProgressStory {
                chapter,
                group,
                node,
            } => {
                if let Some(chapter) = chapter {
                    self.chapter = Some(*chapter);
                }
                if let Some(node) = node {
                    if let Some(group) = group {
                        self.group = Some(*group);
                    }
                    return Evaluated::Outcome {
                        result: self.move_to_node(*node),
                        moved: true,
                    };
                }
                if let Some(group) = group {
                    // same entry path as an enter action: the target must
                    // resolve and the cursor lands on its start node
                    let outcome = self.enter_group(*group);
                    if let Some(chapter) = chapter {
                        self.chapter = Some(*chapter);
                    }
                    return outcome;
                }
                // chapter-only, or fully unset: a pass-through that still
                // advances the timeline
                Evaluated::Outcome {
                    result: ExecutionResult::Event {
                        label,
                        event: EventOutcome::ProgressStory {
                            chapter: *chapter,
                            group: *group,
                            node: *node,
                        },
                    },
                    moved: false,
                }
            }
            StoryEvent::LinkedList { list, changes } => {
                let Some(list_type) = graph.get_linked_list(list) else {
                    return Evaluated::Outcome {
                        result: ExecutionResult::End(EndReason::InvalidItem),
                        moved: false,
                    };
                };
                let modifications = changes
                    .iter()
                    .map(|change| ListModification {
                        field: change.field.clone(),
                        op: self.substituted_op(list, change),
                    })
                    .collect();
                let in_scope = self
                    .group
                    .and_then(|group_id| graph.get_group(group_id))
                    .is_some_and(|group| group.linked_lists.iter().any(|name| name == list));
                let affected_characters = if in_scope {
                    graph
                        .characters()
                        .iter()
                        .filter(|character| character.list_data.contains_key(list))
                        .map(|character| character.name.clone())
                        .collect()
                } else {
                    Vec::new()
                };
                Evaluated::Outcome {
                    result: ExecutionResult::Event {
                        label,
                        event: EventOutcome::LinkedList {
                            list: list.clone(),
                            scope: list_type.scope,
                            modifications,
                            affected_characters,
                        },
                    },
                    moved: false,
                }
            }
        }
    }

    /// Rebuilds a field change's operation, substituting the caller's
    /// parameter override if one was pushed under (list name, field name).
    fn substituted_op(&self, list: &str, change: &FieldChange) -> ListOp {
        let key = (list.to_string(), change.field.clone());
        match self.parameters.get(&key) {
            Some(value) => match &change.op {
                ListOp::Amount(_) => ListOp::Amount(value.clone()),
                ListOp::Set(_) => ListOp::Set(value.clone()),
                ListOp::Append(_) => ListOp::Append(value.clone()),
                ListOp::Replace(_) => ListOp::Replace(value.clone()),
                ListOp::Toggle(_) => ListOp::Toggle(value.clone()),
            },
            None => change.op.clone(),
        }
    }
}

fn offered(options: &[ChoiceOption]) -> Vec<OfferedChoice> {
    options
        .iter()
        .enumerate()
        .map(|(index, option)| OfferedChoice {
            index,
            text: option.text.clone(),
        })
        .collect()
}
