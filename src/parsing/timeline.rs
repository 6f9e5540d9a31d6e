// Copyright (c) 2025 John Wilger
// SPDX-License-Identifier: MIT

//! Timeline grammar: the items that make up a node's body.
//!
//! A timeline holds `dialogue N { … }` and `action N { … }` items in
//! authored order. Action bodies are the loosest part of the grammar:
//! the declared `type` string, a bare code block, a `data` event block,
//! a `choices` array, or a flat `goto` / `exit` / `enter` reference may
//! appear in any order, and unrecognized structure is skipped with a
//! local brace-depth counter. The payload that actually appears decides
//! the action's kind.

use super::lexer::{Keyword, TokenKind};
use super::parser::{ParseError, Parser};
use crate::story::entities::{
    ActionItem, ActionKind, ChapterId, ChoiceOption, DialogueItem, DialogueLine, ExitScope,
    FieldChange, GroupId, ListOp, NodeId, StoryEvent, TimelineItem, Value, VariableOp,
};

impl Parser {
    /// `timeline: { <items> }`
    pub(crate) fn parse_timeline(&mut self) -> Result<Vec<TimelineItem>, ParseError> {
        self.expect(&TokenKind::LeftBrace, "'{' to open timeline")?;
        let mut items = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
            match self.peek_kind() {
                TokenKind::Keyword(Keyword::Dialogue) => {
                    self.bump()?;
                    items.push(TimelineItem::Dialogue(self.parse_dialogue()?));
                }
                TokenKind::Keyword(Keyword::Action) => {
                    self.bump()?;
                    items.push(TimelineItem::Action(self.parse_action()?));
                }
                _ => {
                    let token = self.peek().clone();
                    return Err(self.error_at(&token, "expected dialogue or action"));
                }
            }
            self.eat(&TokenKind::Comma);
        }
        self.expect(&TokenKind::RightBrace, "'}' to close timeline")?;
        Ok(items)
    }

    /// `dialogue N { Speaker: "text"  Speaker: "text"  … }`
    fn parse_dialogue(&mut self) -> Result<DialogueItem, ParseError> {
        let label = self.expect_integer("dialogue label")?;
        self.expect(&TokenKind::LeftBrace, "'{' to open dialogue body")?;
        let mut lines = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
            let speaker = self.expect_field_name("speaker name")?;
            self.expect(&TokenKind::Colon, "':' after speaker name")?;
            let text = self.expect_string("dialogue text")?;
            lines.push(DialogueLine { speaker, text });
            self.eat(&TokenKind::Comma);
        }
        let close = self.expect(&TokenKind::RightBrace, "'}' to close dialogue body")?;
        if lines.is_empty() {
            return Err(self.error_at(&close, "dialogue must contain at least one line"));
        }
        Ok(DialogueItem { label, lines })
    }

    /// `action N { … }`
    pub(crate) fn parse_action(&mut self) -> Result<ActionItem, ParseError> {
        let label = self.expect_integer("action label")?;
        self.expect(&TokenKind::LeftBrace, "'{' to open action body")?;

        let mut kind: Option<ActionKind> = None;
        while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
            if matches!(self.peek_kind(), TokenKind::CodeBlock(_)) {
                let token = self.bump()?;
                if let TokenKind::CodeBlock(code) = token.kind {
                    kind = Some(ActionKind::Code(code));
                }
                self.eat(&TokenKind::Comma);
                continue;
            }
            let Some(key) = self.field_key() else {
                self.skip_value()?;
                continue;
            };
            self.bump()?;
            match key.as_str() {
                // the declared type string is informational; the payload
                // that follows decides the kind
                "type" => {
                    self.expect(&TokenKind::Colon, "':' after type")?;
                    self.expect_string("action type")?;
                }
                "data" => {
                    self.expect(&TokenKind::Colon, "':' after data")?;
                    kind = Some(ActionKind::Event(self.parse_event_data()?));
                }
                "choices" => {
                    self.expect(&TokenKind::Colon, "':' after choices")?;
                    kind = Some(ActionKind::Choice(self.parse_choices()?));
                }
                "goto" => {
                    self.expect(&TokenKind::Colon, "':' after goto")?;
                    let id = self.parse_reference(Keyword::Node, "@node reference")?;
                    kind = Some(ActionKind::Goto(NodeId::new(id)));
                }
                "exit" => {
                    self.expect(&TokenKind::Colon, "':' after exit")?;
                    let token = self.peek().clone();
                    let scope = self.expect_string("exit scope")?;
                    kind = Some(match scope.as_str() {
                        "node" => ActionKind::Exit(ExitScope::Node),
                        "group" => ActionKind::Exit(ExitScope::Group),
                        _ => {
                            return Err(self.error_at(
                                &token,
                                "expected exit scope \"node\" or \"group\"",
                            ));
                        }
                    });
                }
                "enter" => {
                    self.expect(&TokenKind::Colon, "':' after enter")?;
                    let id = self.parse_reference(Keyword::Group, "@group reference")?;
                    kind = Some(ActionKind::Enter(GroupId::new(id)));
                }
                _ => {
                    if self.eat(&TokenKind::Colon) {
                        self.skip_value()?;
                    }
                }
            }
            self.eat(&TokenKind::Comma);
        }
        let close = self.expect(&TokenKind::RightBrace, "'}' to close action body")?;

        let Some(kind) = kind else {
            return Err(self.error_at(&close, format!("action {label} has no payload")));
        };
        Ok(ActionItem { label, kind })
    }

    /// `data: { type: "<event-kind>" …fields… }`
    ///
    /// Fields may appear in any order; the `type` string selects the
    /// variant and which of the collected fields it consumes.
    fn parse_event_data(&mut self) -> Result<StoryEvent, ParseError> {
        self.expect(&TokenKind::LeftBrace, "'{' to open event data")?;

        let mut event_type: Option<(String, super::lexer::Token)> = None;
        let mut name: Option<String> = None;
        let mut character: Option<String> = None;
        let mut increment: Option<Value> = None;
        let mut value: Option<Value> = None;
        let mut toggle = false;
        let mut chapter: Option<ChapterId> = None;
        let mut group: Option<GroupId> = None;
        let mut node: Option<NodeId> = None;
        let mut reference: Option<String> = None;
        let mut changes: Vec<FieldChange> = Vec::new();

        while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
            let Some(key) = self.field_key() else {
                self.skip_value()?;
                continue;
            };
            let key_token = self.bump()?;
            self.expect(&TokenKind::Colon, "':' after field name")?;
            match key.as_str() {
                "type" => {
                    let text = self.expect_string("event type")?;
                    event_type = Some((text, key_token));
                }
                "name" => name = Some(self.expect_string("name")?),
                "character" => character = Some(self.expect_string("character name")?),
                "increment" => {
                    let token = self.peek().clone();
                    let amount = self.parse_value("numeric amount")?;
                    if !matches!(amount, Value::Int(_) | Value::Float(_)) {
                        return Err(self.error_at(&token, "expected numeric amount"));
                    }
                    increment = Some(amount);
                }
                "value" => value = Some(self.parse_value("value literal")?),
                "toggle" => {
                    self.expect_string("toggle marker")?;
                    toggle = true;
                }
                "chapter" => {
                    let id = self.parse_reference(Keyword::Chapter, "@chapter reference")?;
                    chapter = Some(ChapterId::new(id));
                }
                "group" => {
                    let id = self.parse_reference(Keyword::Group, "@group reference")?;
                    group = Some(GroupId::new(id));
                }
                "node" => {
                    let id = self.parse_reference(Keyword::Node, "@node reference")?;
                    node = Some(NodeId::new(id));
                }
                "reference" => reference = Some(self.expect_string("linked-list name")?),
                "values" => changes = self.parse_field_changes()?,
                _ => self.skip_value()?,
            }
            self.eat(&TokenKind::Comma);
        }
        let close = self.expect(&TokenKind::RightBrace, "'}' to close event data")?;

        let Some((event_type, type_token)) = event_type else {
            return Err(self.error_at(&close, "event data is missing its type"));
        };
        match event_type.as_str() {
            "next-node" => Ok(StoryEvent::NextNode),
            "exit-current-node" => Ok(StoryEvent::ExitCurrentNode),
            "exit-current-group" => Ok(StoryEvent::ExitCurrentGroup),
            "adjust-variable" => {
                let Some(name) = name else {
                    return Err(self.error_at(&type_token, "adjust-variable requires a name"));
                };
                let op = match (increment, value, toggle) {
                    (Some(amount), None, false) => VariableOp::Increment(amount),
                    (None, Some(value), false) => VariableOp::Set(value),
                    (None, None, true) => VariableOp::Toggle,
                    _ => {
                        return Err(self.error_at(
                            &type_token,
                            "adjust-variable requires exactly one of increment, value, toggle",
                        ));
                    }
                };
                Ok(StoryEvent::AdjustVariable { name, op })
            }
            "add-state" | "remove-state" => {
                let Some(state) = name else {
                    return Err(
                        self.error_at(&type_token, format!("{event_type} requires a name"))
                    );
                };
                let Some(character) = character else {
                    return Err(
                        self.error_at(&type_token, format!("{event_type} requires a character"))
                    );
                };
                if event_type == "add-state" {
                    Ok(StoryEvent::AddState { state, character })
                } else {
                    Ok(StoryEvent::RemoveState { state, character })
                }
            }
            "progress-story" => Ok(StoryEvent::ProgressStory {
                chapter,
                group,
                node,
            }),
            "linked-list" => {
                let Some(list) = reference else {
                    return Err(self.error_at(&type_token, "linked-list requires a reference"));
                };
                Ok(StoryEvent::LinkedList { list, changes })
            }
            other => Err(self.error_at(&type_token, format!("unknown event type \"{other}\""))),
        }
    }

    /// `values: [ "FieldName": { amount|set|append|replace|toggle:
    /// <literal> }, … ]`
    fn parse_field_changes(&mut self) -> Result<Vec<FieldChange>, ParseError> {
        self.expect(&TokenKind::LeftBracket, "'[' to open values list")?;
        let mut changes = Vec::new();
        while !self.check(&TokenKind::RightBracket) && !self.check(&TokenKind::Eof) {
            let field = self.expect_string("field name")?;
            self.expect(&TokenKind::Colon, "':' after field name")?;
            self.expect(&TokenKind::LeftBrace, "'{' to open field change")?;
            let mut op: Option<ListOp> = None;
            while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
                let Some(key) = self.field_key() else {
                    self.skip_value()?;
                    continue;
                };
                let key_token = self.bump()?;
                self.expect(&TokenKind::Colon, "':' after field name")?;
                match key.as_str() {
                    "amount" | "set" | "append" | "replace" | "toggle" => {
                        if op.is_some() {
                            return Err(self.error_at(
                                &key_token,
                                format!("field \"{field}\" already has an operation"),
                            ));
                        }
                        let change = self.parse_value("change value")?;
                        op = Some(match key.as_str() {
                            "amount" => ListOp::Amount(change),
                            "set" => ListOp::Set(change),
                            "append" => ListOp::Append(change),
                            "replace" => ListOp::Replace(change),
                            _ => ListOp::Toggle(change),
                        });
                    }
                    _ => self.skip_value()?,
                }
                self.eat(&TokenKind::Comma);
            }
            let close = self.expect(&TokenKind::RightBrace, "'}' to close field change")?;
            let Some(op) = op else {
                return Err(
                    self.error_at(&close, format!("field \"{field}\" has no operation"))
                );
            };
            changes.push(FieldChange { field, op });
            self.eat(&TokenKind::Comma);
        }
        self.expect(&TokenKind::RightBracket, "']' to close values list")?;
        Ok(changes)
    }

    /// `choices: [ { text: "…" choice: { action M { … } … } }, … ]`
    fn parse_choices(&mut self) -> Result<Vec<ChoiceOption>, ParseError> {
        self.expect(&TokenKind::LeftBracket, "'[' to open choices list")?;
        let mut options = Vec::new();
        while !self.check(&TokenKind::RightBracket) && !self.check(&TokenKind::Eof) {
            self.expect(&TokenKind::LeftBrace, "'{' to open choice option")?;
            let mut text = String::new();
            let mut actions = Vec::new();
            while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
                let Some(key) = self.field_key() else {
                    self.skip_value()?;
                    continue;
                };
                self.bump()?;
                match key.as_str() {
                    "text" => {
                        self.expect(&TokenKind::Colon, "':' after text")?;
                        text = self.expect_string("choice text")?;
                    }
                    "choice" => {
                        self.expect(&TokenKind::Colon, "':' after choice")?;
                        actions = self.parse_choice_actions()?;
                    }
                    _ => {
                        if self.eat(&TokenKind::Colon) {
                            self.skip_value()?;
                        }
                    }
                }
                self.eat(&TokenKind::Comma);
            }
            self.expect(&TokenKind::RightBrace, "'}' to close choice option")?;
            options.push(ChoiceOption { text, actions });
            self.eat(&TokenKind::Comma);
        }
        self.expect(&TokenKind::RightBracket, "']' to close choices list")?;
        Ok(options)
    }

    /// `choice: { action M { … } action K { … } … }`
    fn parse_choice_actions(&mut self) -> Result<Vec<ActionItem>, ParseError> {
        self.expect(&TokenKind::LeftBrace, "'{' to open choice body")?;
        let mut actions = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
            match self.peek_kind() {
                TokenKind::Keyword(Keyword::Action) => {
                    self.bump()?;
                    actions.push(self.parse_action()?);
                }
                _ => {
                    let token = self.peek().clone();
                    return Err(self.error_at(&token, "expected action in choice body"));
                }
            }
            self.eat(&TokenKind::Comma);
        }
        self.expect(&TokenKind::RightBrace, "'}' to close choice body")?;
        Ok(actions)
    }

    /// `@<kind>(<integer>)`: `@`, a reference kind, `(`, the id, `)`.
    fn parse_reference(&mut self, expected: Keyword, what: &str) -> Result<i64, ParseError> {
        self.expect(&TokenKind::At, "'@' to open reference")?;
        let token = self.bump()?;
        let matches_kind = matches!(&token.kind, TokenKind::Keyword(k) if *k == expected);
        if !matches_kind {
            return Err(self.error_at(&token, format!("expected {what}")));
        }
        self.expect(&TokenKind::LeftParen, "'(' after reference kind")?;
        let id = self.expect_integer("reference id")?;
        self.expect(&TokenKind::RightParen, "')' to close reference")?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use crate::parsing::parse_string;
    use crate::story::entities::{
        ActionKind, ExitScope, ListOp, NodeId, StoryEvent, TimelineItem, Value, VariableOp,
    };
    use crate::story::entities::{ChapterId, GroupId, Node};

    fn parse_node(timeline: &str) -> Node {
        let source = format!("node 1 {{ timeline: {{ {timeline} }} }}");
        let graph = parse_string(&source).expect("parse");
        graph.get_node(NodeId::new(1)).expect("node 1").clone()
    }

    fn parse_timeline_error(timeline: &str) -> crate::parsing::ParseError {
        let source = format!("node 1 {{ timeline: {{ {timeline} }} }}");
        parse_string(&source).unwrap_err()
    }

    #[test]
    fn timeline_reads_dialogue_lines_in_order() {
        let node = parse_node(r#"dialogue 1 { A: "hi"  B: "hey" }"#);
        let TimelineItem::Dialogue(dialogue) = &node.timeline[0] else {
            panic!("expected dialogue");
        };
        assert_eq!(dialogue.label, 1);
        assert_eq!(dialogue.lines.len(), 2);
        assert_eq!(dialogue.lines[0].speaker, "A");
        assert_eq!(dialogue.lines[0].text, "hi");
        assert_eq!(dialogue.lines[1].speaker, "B");
    }

    #[test]
    fn timeline_rejects_empty_dialogue() {
        let error = parse_timeline_error("dialogue 1 { }");
        assert!(error.message.contains("at least one line"));
    }

    #[test]
    fn timeline_permits_repeated_labels() {
        let node = parse_node(
            r#"dialogue 1 { A: "one" }
               dialogue 1 { A: "two" }"#,
        );
        assert_eq!(node.timeline.len(), 2);
    }

    #[test]
    fn timeline_reads_code_actions_verbatim() {
        let node = parse_node(r#"action 1 { type: "code" <! x=1; !> }"#);
        let TimelineItem::Action(action) = &node.timeline[0] else {
            panic!("expected action");
        };
        assert_eq!(action.kind, ActionKind::Code(" x=1; ".to_string()));
    }

    #[test]
    fn timeline_reads_flat_references() {
        let node = parse_node(
            r#"action 1 { type: "event" goto: @node(7) }
               action 2 { type: "event" exit: "group" }
               action 3 { type: "event" enter: @group(3) }"#,
        );
        let kinds: Vec<_> = node
            .timeline
            .iter()
            .map(|item| match item {
                TimelineItem::Action(a) => a.kind.clone(),
                other => panic!("expected action, got {other:?}"),
            })
            .collect();
        assert_eq!(kinds[0], ActionKind::Goto(NodeId::new(7)));
        assert_eq!(kinds[1], ActionKind::Exit(ExitScope::Group));
        assert_eq!(kinds[2], ActionKind::Enter(GroupId::new(3)));
    }

    #[test]
    fn timeline_rejects_mismatched_reference_kinds() {
        let error = parse_timeline_error(r#"action 1 { goto: @group(7) }"#);
        assert!(error.message.contains("expected @node reference"));
    }

    #[test]
    fn timeline_reads_adjust_variable_events() {
        let node = parse_node(
            r#"action 1 { type: "event" data: { type: "adjust-variable" name: "Money" increment: 5.6 } }"#,
        );
        let TimelineItem::Action(action) = &node.timeline[0] else {
            panic!("expected action");
        };
        assert_eq!(
            action.kind,
            ActionKind::Event(StoryEvent::AdjustVariable {
                name: "Money".to_string(),
                op: VariableOp::Increment(Value::Float(5.6)),
            })
        );
    }

    #[test]
    fn timeline_rejects_conflicting_adjust_variable_fields() {
        let error = parse_timeline_error(
            r#"action 1 { data: { type: "adjust-variable" name: "Money" increment: 1 value: 2 } }"#,
        );
        assert!(error.message.contains("exactly one of"));
    }

    #[test]
    fn timeline_reads_toggle_adjustments() {
        let node = parse_node(
            r#"action 1 { data: { type: "adjust-variable" name: "Alive" toggle: "toggle" } }"#,
        );
        let TimelineItem::Action(action) = &node.timeline[0] else {
            panic!("expected action");
        };
        assert_eq!(
            action.kind,
            ActionKind::Event(StoryEvent::AdjustVariable {
                name: "Alive".to_string(),
                op: VariableOp::Toggle,
            })
        );
    }

    #[test]
    fn timeline_reads_state_events() {
        let node = parse_node(
            r#"action 1 { data: { type: "add-state" name: "calm" character: "Saniyah" } }"#,
        );
        let TimelineItem::Action(action) = &node.timeline[0] else {
            panic!("expected action");
        };
        assert_eq!(
            action.kind,
            ActionKind::Event(StoryEvent::AddState {
                state: "calm".to_string(),
                character: "Saniyah".to_string(),
            })
        );
    }

    #[test]
    fn timeline_reads_progress_story_targets() {
        let node = parse_node(
            r#"action 1 { data: { type: "progress-story" chapter: @chapter(2) node: @node(5) } }"#,
        );
        let TimelineItem::Action(action) = &node.timeline[0] else {
            panic!("expected action");
        };
        assert_eq!(
            action.kind,
            ActionKind::Event(StoryEvent::ProgressStory {
                chapter: Some(ChapterId::new(2)),
                group: None,
                node: Some(NodeId::new(5)),
            })
        );
    }

    #[test]
    fn timeline_reads_linked_list_events() {
        let node = parse_node(
            r#"action 1 { data: { type: "linked-list" reference: "Profession"
                values: [ "Value": { amount: 4 }, "Title": { replace: "Mayor" } ] } }"#,
        );
        let TimelineItem::Action(action) = &node.timeline[0] else {
            panic!("expected action");
        };
        let ActionKind::Event(StoryEvent::LinkedList { list, changes }) = &action.kind else {
            panic!("expected linked-list event");
        };
        assert_eq!(list, "Profession");
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].field, "Value");
        assert_eq!(changes[0].op, ListOp::Amount(Value::Int(4)));
        assert_eq!(
            changes[1].op,
            ListOp::Replace(Value::String("Mayor".to_string()))
        );
    }

    #[test]
    fn timeline_reads_choices_with_nested_actions() {
        let node = parse_node(
            r#"action 2 { type: "choice" choices: [
                { text: "Go" choice: { action 3 { type: "event" goto: @node(2) } } },
                { text: "Stay" choice: { action 4 { type: "event" data: { type: "exit-current-node" } } } },
            ] }"#,
        );
        let TimelineItem::Action(action) = &node.timeline[0] else {
            panic!("expected action");
        };
        let ActionKind::Choice(options) = &action.kind else {
            panic!("expected choice");
        };
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].text, "Go");
        assert_eq!(options[0].actions.len(), 1);
        assert_eq!(options[0].actions[0].kind, ActionKind::Goto(NodeId::new(2)));
        assert_eq!(options[1].text, "Stay");
        assert_eq!(
            options[1].actions[0].kind,
            ActionKind::Event(StoryEvent::ExitCurrentNode)
        );
    }

    #[test]
    fn timeline_rejects_unknown_event_types() {
        let error = parse_timeline_error(r#"action 1 { data: { type: "teleport" } }"#);
        assert!(error.message.contains("unknown event type"));
    }

    #[test]
    fn timeline_rejects_actions_without_payload() {
        let error = parse_timeline_error(r#"action 1 { type: "event" }"#);
        assert!(error.message.contains("has no payload"));
    }

    #[test]
    fn timeline_tolerates_unrecognized_nested_structure() {
        let node = parse_node(
            r#"action 1 { type: "code" staging: { camera: [1, 2, { pan: true }] } <! run(); !> }"#,
        );
        let TimelineItem::Action(action) = &node.timeline[0] else {
            panic!("expected action");
        };
        assert_eq!(action.kind, ActionKind::Code(" run(); ".to_string()));
    }
}
