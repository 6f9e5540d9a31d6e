// Copyright (c) 2025 John Wilger
// SPDX-License-Identifier: MIT

//! Advisory cross-reference validation.
//!
//! After a successful parse every `@node(…)`, `@group(…)`, and
//! `@chapter(…)` reference in the graph can be checked against the
//! entities that actually exist. Validation is advisory: an unresolved
//! reference does not invalidate the graph, and nothing is removed or
//! repaired. Hosts typically run this once after loading a document and
//! surface the report to the author.

use std::fmt;

use super::entities::{ActionItem, ActionKind, StoryEvent, TimelineItem};
use super::graph::StoryGraph;

/// Which kind of entity a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// A `@node(…)` reference.
    Node,
    /// A `@group(…)` reference.
    Group,
    /// A `@chapter(…)` reference.
    Chapter,
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RefKind::Node => "node",
            RefKind::Group => "group",
            RefKind::Chapter => "chapter",
        };
        f.write_str(name)
    }
}

/// The first reference that failed to resolve.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unresolved {kind} reference {id} in {context}")]
pub struct UnresolvedReference {
    /// Kind of the missing entity.
    pub kind: RefKind,
    /// The id that did not resolve.
    pub id: i64,
    /// Where the reference was found.
    pub context: String,
}

/// Checks that every embedded reference resolves.
///
/// Walks group chapter and parent ids, node-graph edges (start, end, and
/// every point-map key and successor), and each timeline action, including
/// actions nested inside choice options. Returns the first unresolved
/// reference found, in graph order.
pub fn validate_references(graph: &StoryGraph) -> Result<(), UnresolvedReference> {
    for group in graph.groups() {
        let context = format!("group {}", group.id.into_inner());
        check_chapter(graph, group.chapter.into_inner(), &context)?;
        if let Some(parent) = group.parent {
            check_group(graph, parent.into_inner(), &context)?;
        }
        if let Some(node_graph) = &group.node_graph {
            check_node(graph, node_graph.start.into_inner(), &context)?;
            check_node(graph, node_graph.end.into_inner(), &context)?;
            for (from, successors) in &node_graph.points {
                check_node(graph, from.into_inner(), &context)?;
                for to in successors {
                    check_node(graph, to.into_inner(), &context)?;
                }
            }
        }
    }

    for node in graph.nodes() {
        let context = format!("node {}", node.id.into_inner());
        for item in &node.timeline {
            if let TimelineItem::Action(action) = item {
                check_action(graph, action, &context)?;
            }
        }
    }

    Ok(())
}

fn check_action(
    graph: &StoryGraph,
    action: &ActionItem,
    context: &str,
) -> Result<(), UnresolvedReference> {
    match &action.kind {
        ActionKind::Goto(node) => check_node(graph, node.into_inner(), context),
        ActionKind::Enter(group) => check_group(graph, group.into_inner(), context),
        ActionKind::Choice(options) => {
            for option in options {
                for inner in &option.actions {
                    check_action(graph, inner, context)?;
                }
            }
            Ok(())
        }
        ActionKind::Event(StoryEvent::ProgressStory {
            chapter,
            group,
            node,
        }) => {
            if let Some(chapter) = chapter {
                check_chapter(graph, chapter.into_inner(), context)?;
            }
            if let Some(group) = group {
                check_group(graph, group.into_inner(), context)?;
            }
            if let Some(node) = node {
                check_node(graph, node.into_inner(), context)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn check_node(graph: &StoryGraph, id: i64, context: &str) -> Result<(), UnresolvedReference> {
    if graph.get_node(crate::story::entities::NodeId::new(id)).is_some() {
        Ok(())
    } else {
        Err(UnresolvedReference {
            kind: RefKind::Node,
            id,
            context: context.to_string(),
        })
    }
}

fn check_group(graph: &StoryGraph, id: i64, context: &str) -> Result<(), UnresolvedReference> {
    if graph.get_group(crate::story::entities::GroupId::new(id)).is_some() {
        Ok(())
    } else {
        Err(UnresolvedReference {
            kind: RefKind::Group,
            id,
            context: context.to_string(),
        })
    }
}

fn check_chapter(graph: &StoryGraph, id: i64, context: &str) -> Result<(), UnresolvedReference> {
    if graph
        .get_chapter(crate::story::entities::ChapterId::new(id))
        .is_some()
    {
        Ok(())
    } else {
        Err(UnresolvedReference {
            kind: RefKind::Chapter,
            id,
            context: context.to_string(),
        })
    }
}
