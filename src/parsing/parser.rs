// Copyright (c) 2025 John Wilger
// SPDX-License-Identifier: MIT

//! Recursive-descent parser for story documents.
//!
//! The parser consumes the token list produced by the lexer and builds a
//! [`StoryGraph`]. Each top-level section has its own subroutine; sections
//! may appear in any order and each is optional. Stray tokens between
//! sections are skipped. The first error encountered aborts the parse;
//! no partial graph is ever exposed.
//!
//! Commas are optional separators: after consuming any element the parser
//! greedily consumes one trailing comma, which also permits trailing
//! commas inside `[ … ]` and `{ … }`.

use indexmap::IndexMap;

use crate::story::entities::{
    AppliedTag, Chapter, ChapterId, Character, GlobalVariable, GroupId, Group, LinkedListType,
    ListData, ListRecord, ListScope, Node, NodeGraph, NodeId, TagColor, TagDefinition, TagKind,
    Value, ValueType,
};
use crate::story::graph::StoryGraph;

use super::lexer::{tokenize, Keyword, Token, TokenKind};

/// A parse failure with its source position.
///
/// Parsing is first-error-wins: the error carried here is always the
/// earliest one, and later faults are never reported.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Error at line {line}, column {column}: {message} (got '{found}')")]
pub struct ParseError {
    /// Line the offending token starts on, 1-indexed.
    pub line: u32,
    /// Column the offending token starts on, 1-indexed.
    pub column: u32,
    /// What the parser expected or found wrong.
    pub message: String,
    /// The lexeme of the offending token.
    pub found: String,
}

/// Internal parser state: the token list, a position, and the collections
/// accumulated so far.
pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    states: Vec<String>,
    variables: Vec<GlobalVariable>,
    linked_lists: Vec<LinkedListType>,
    characters: Vec<Character>,
    tags: Vec<TagDefinition>,
    chapters: Vec<Chapter>,
    groups: Vec<Group>,
    nodes: Vec<Node>,
}

impl Parser {
    pub(crate) fn new(source: &str) -> Self {
        Self {
            tokens: tokenize(source),
            pos: 0,
            states: Vec::new(),
            variables: Vec::new(),
            linked_lists: Vec::new(),
            characters: Vec::new(),
            tags: Vec::new(),
            chapters: Vec::new(),
            groups: Vec::new(),
            nodes: Vec::new(),
        }
    }

    /// Runs the top-level loop to `Eof` and assembles the graph.
    pub(crate) fn parse(mut self) -> Result<StoryGraph, ParseError> {
        loop {
            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::Keyword(Keyword::States) => {
                    self.bump()?;
                    self.parse_states()?;
                }
                TokenKind::Keyword(Keyword::GlobalVars) => {
                    self.bump()?;
                    self.parse_global_vars()?;
                }
                TokenKind::Keyword(Keyword::LinkedLists) => {
                    self.bump()?;
                    self.parse_linked_lists()?;
                }
                TokenKind::Keyword(Keyword::Characters) => {
                    self.bump()?;
                    self.parse_characters()?;
                }
                TokenKind::Keyword(Keyword::Tags) => {
                    self.bump()?;
                    self.parse_tags()?;
                }
                TokenKind::Keyword(Keyword::Chapter) => {
                    self.bump()?;
                    self.parse_chapter()?;
                }
                TokenKind::Keyword(Keyword::Group) => {
                    self.bump()?;
                    self.parse_group()?;
                }
                TokenKind::Keyword(Keyword::Node) => {
                    self.bump()?;
                    self.parse_node()?;
                }
                // stray tokens between sections are tolerated; a lexer
                // Error token fails inside bump
                _ => {
                    self.bump()?;
                }
            }
        }

        Ok(StoryGraph {
            states: self.states,
            variables: self.variables,
            linked_lists: self.linked_lists,
            characters: self.characters,
            tags: self.tags,
            chapters: self.chapters,
            groups: self.groups,
            nodes: self.nodes,
        })
    }

    // Token primitives

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    /// Consumes and returns the next token. A lexer `Error` token is a
    /// fatal parse failure; the `Eof` token is returned without advancing.
    pub(crate) fn bump(&mut self) -> Result<Token, ParseError> {
        let token = self.tokens[self.pos].clone();
        match &token.kind {
            TokenKind::Error(fault) => Err(self.error_at(&token, fault.message())),
            TokenKind::Eof => Ok(token),
            _ => {
                self.pos += 1;
                Ok(token)
            }
        }
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// Consumes the next token if it matches.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            self.bump()
        } else {
            let token = self.peek().clone();
            if let TokenKind::Error(fault) = &token.kind {
                return Err(self.error_at(&token, fault.message()));
            }
            Err(self.error_at(&token, format!("expected {what}")))
        }
    }

    pub(crate) fn expect_string(&mut self, what: &str) -> Result<String, ParseError> {
        let token = self.bump()?;
        match token.kind {
            TokenKind::Str(value) => Ok(value),
            _ => Err(self.error_at(&token, format!("expected {what}"))),
        }
    }

    pub(crate) fn expect_integer(&mut self, what: &str) -> Result<i64, ParseError> {
        let token = self.bump()?;
        match token.kind {
            TokenKind::Integer(value) => Ok(value),
            _ => Err(self.error_at(&token, format!("expected {what}"))),
        }
    }

    /// A field name: a bare identifier or keyword (matched by lexeme), or
    /// a string literal.
    pub(crate) fn expect_field_name(&mut self, what: &str) -> Result<String, ParseError> {
        let token = self.bump()?;
        match &token.kind {
            TokenKind::Identifier | TokenKind::Keyword(_) => Ok(token.lexeme.clone()),
            TokenKind::Str(value) => Ok(value.clone()),
            _ => Err(self.error_at(&token, format!("expected {what}"))),
        }
    }

    /// Peeks the next token's field-name lexeme without consuming it.
    pub(crate) fn field_key(&self) -> Option<String> {
        match self.peek_kind() {
            TokenKind::Identifier | TokenKind::Keyword(_) => Some(self.peek().lexeme.clone()),
            _ => None,
        }
    }

    pub(crate) fn parse_value(&mut self, what: &str) -> Result<Value, ParseError> {
        let token = self.bump()?;
        match token.kind {
            TokenKind::Str(value) => Ok(Value::String(value)),
            TokenKind::Integer(value) => Ok(Value::Int(value)),
            TokenKind::Float(value) => Ok(Value::Float(value)),
            TokenKind::Bool(value) => Ok(Value::Bool(value)),
            _ => Err(self.error_at(&token, format!("expected {what}"))),
        }
    }

    pub(crate) fn error_at(&self, token: &Token, message: impl Into<String>) -> ParseError {
        ParseError {
            line: token.line,
            column: token.column,
            message: message.into(),
            found: token.lexeme.clone(),
        }
    }

    /// Skips one value: a literal, a reference, or a balanced `{…}` /
    /// `[…]` structure. Used to tolerate fields the grammar does not
    /// recognize.
    pub(crate) fn skip_value(&mut self) -> Result<(), ParseError> {
        match self.peek_kind() {
            TokenKind::LeftBrace | TokenKind::LeftBracket => self.skip_balanced(),
            TokenKind::At => {
                self.bump()?;
                self.bump()?;
                if self.eat(&TokenKind::LeftParen) {
                    while !self.check(&TokenKind::RightParen) && !self.check(&TokenKind::Eof) {
                        self.bump()?;
                    }
                    self.expect(&TokenKind::RightParen, "')' to close reference")?;
                }
                Ok(())
            }
            TokenKind::Eof => {
                let token = self.peek().clone();
                Err(self.error_at(&token, "unexpected end of input"))
            }
            _ => {
                self.bump()?;
                Ok(())
            }
        }
    }

    /// Consumes a `{…}` or `[…]` structure, tracking nesting depth.
    pub(crate) fn skip_balanced(&mut self) -> Result<(), ParseError> {
        let mut depth = 0usize;
        loop {
            let token = self.bump()?;
            match token.kind {
                TokenKind::LeftBrace | TokenKind::LeftBracket => depth += 1,
                TokenKind::RightBrace | TokenKind::RightBracket => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Ok(());
                    }
                }
                TokenKind::Eof => {
                    return Err(self.error_at(&token, "unexpected end of input"));
                }
                _ => {}
            }
        }
    }

    // Section parsers

    /// `states [ "s1", "s2", … ]`
    fn parse_states(&mut self) -> Result<(), ParseError> {
        self.expect(&TokenKind::LeftBracket, "'[' to open states list")?;
        while !self.check(&TokenKind::RightBracket) && !self.check(&TokenKind::Eof) {
            let token = self.peek().clone();
            let name = self.expect_string("state name")?;
            if name.is_empty() {
                return Err(self.error_at(&token, "state name cannot be empty"));
            }
            if self.states.contains(&name) {
                return Err(self.error_at(&token, format!("duplicate state \"{name}\"")));
            }
            self.states.push(name);
            self.eat(&TokenKind::Comma);
        }
        self.expect(&TokenKind::RightBracket, "']' to close states list")?;
        Ok(())
    }

    /// `global_vars [ "Name": { type: "…", default: <literal> }, … ]`
    fn parse_global_vars(&mut self) -> Result<(), ParseError> {
        self.expect(&TokenKind::LeftBracket, "'[' to open global_vars list")?;
        while !self.check(&TokenKind::RightBracket) && !self.check(&TokenKind::Eof) {
            let name_token = self.peek().clone();
            let name = self.expect_string("variable name")?;
            if self.variables.iter().any(|v| v.name == name) {
                return Err(self.error_at(&name_token, format!("duplicate variable \"{name}\"")));
            }
            self.expect(&TokenKind::Colon, "':' after variable name")?;
            self.expect(&TokenKind::LeftBrace, "'{' to open variable body")?;

            let mut value_type: Option<ValueType> = None;
            let mut default: Option<(Value, Token)> = None;
            while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
                let Some(key) = self.field_key() else {
                    self.skip_value()?;
                    continue;
                };
                self.bump()?;
                self.expect(&TokenKind::Colon, "':' after field name")?;
                match key.as_str() {
                    "type" => {
                        let token = self.peek().clone();
                        let type_name = self.expect_string("type name")?;
                        let Some(parsed) = ValueType::from_name(&type_name) else {
                            return Err(self.error_at(
                                &token,
                                format!("unknown variable type \"{type_name}\""),
                            ));
                        };
                        value_type = Some(parsed);
                    }
                    "default" => {
                        let token = self.peek().clone();
                        let value = self.parse_value("default value")?;
                        default = Some((value, token));
                    }
                    _ => self.skip_value()?,
                }
                self.eat(&TokenKind::Comma);
            }
            let close = self.expect(&TokenKind::RightBrace, "'}' to close variable body")?;

            let Some(value_type) = value_type else {
                return Err(self.error_at(&close, format!("variable \"{name}\" is missing its type")));
            };
            let Some((default, default_token)) = default else {
                return Err(self.error_at(
                    &close,
                    format!("variable \"{name}\" is missing its default value"),
                ));
            };
            if default.value_type() != value_type {
                return Err(self.error_at(
                    &default_token,
                    format!("default value does not match declared type \"{value_type}\""),
                ));
            }
            self.variables.push(GlobalVariable {
                name,
                value_type,
                default,
            });
            self.eat(&TokenKind::Comma);
        }
        self.expect(&TokenKind::RightBracket, "']' to close global_vars list")?;
        Ok(())
    }

    /// `linked-lists [ "Name": { scope: "…", structure: { Field: { type:
    /// "…" }, … } }, … ]`
    fn parse_linked_lists(&mut self) -> Result<(), ParseError> {
        self.expect(&TokenKind::LeftBracket, "'[' to open linked-lists list")?;
        while !self.check(&TokenKind::RightBracket) && !self.check(&TokenKind::Eof) {
            let name_token = self.peek().clone();
            let name = self.expect_string("linked-list name")?;
            if self.linked_lists.iter().any(|l| l.name == name) {
                return Err(self.error_at(&name_token, format!("duplicate linked-list \"{name}\"")));
            }
            self.expect(&TokenKind::Colon, "':' after linked-list name")?;
            self.expect(&TokenKind::LeftBrace, "'{' to open linked-list body")?;

            let mut scope: Option<ListScope> = None;
            let mut structure: IndexMap<String, ValueType> = IndexMap::new();
            while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
                let Some(key) = self.field_key() else {
                    self.skip_value()?;
                    continue;
                };
                self.bump()?;
                self.expect(&TokenKind::Colon, "':' after field name")?;
                match key.as_str() {
                    "scope" => {
                        let token = self.peek().clone();
                        let scope_name = self.expect_string("scope name")?;
                        let Some(parsed) = ListScope::from_name(&scope_name) else {
                            return Err(self.error_at(
                                &token,
                                format!("unknown linked-list scope \"{scope_name}\""),
                            ));
                        };
                        scope = Some(parsed);
                    }
                    "structure" => {
                        structure = self.parse_list_structure()?;
                    }
                    _ => self.skip_value()?,
                }
                self.eat(&TokenKind::Comma);
            }
            let close = self.expect(&TokenKind::RightBrace, "'}' to close linked-list body")?;

            let Some(scope) = scope else {
                return Err(
                    self.error_at(&close, format!("linked-list \"{name}\" is missing its scope"))
                );
            };
            if structure.is_empty() {
                return Err(self.error_at(
                    &close,
                    format!("linked-list \"{name}\" must declare a non-empty structure"),
                ));
            }
            self.linked_lists.push(LinkedListType {
                name,
                scope,
                structure,
            });
            self.eat(&TokenKind::Comma);
        }
        self.expect(&TokenKind::RightBracket, "']' to close linked-lists list")?;
        Ok(())
    }

    /// `structure: { Field: { type: "…" }, … }`
    fn parse_list_structure(&mut self) -> Result<IndexMap<String, ValueType>, ParseError> {
        self.expect(&TokenKind::LeftBrace, "'{' to open structure")?;
        let mut structure = IndexMap::new();
        while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
            let field = self.expect_field_name("structure field name")?;
            self.expect(&TokenKind::Colon, "':' after field name")?;
            self.expect(&TokenKind::LeftBrace, "'{' to open field body")?;
            let mut value_type: Option<ValueType> = None;
            while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
                let Some(key) = self.field_key() else {
                    self.skip_value()?;
                    continue;
                };
                self.bump()?;
                self.expect(&TokenKind::Colon, "':' after field name")?;
                if key == "type" {
                    let token = self.peek().clone();
                    let type_name = self.expect_string("type name")?;
                    let Some(parsed) = ValueType::from_name(&type_name) else {
                        return Err(
                            self.error_at(&token, format!("unknown field type \"{type_name}\""))
                        );
                    };
                    value_type = Some(parsed);
                } else {
                    self.skip_value()?;
                }
                self.eat(&TokenKind::Comma);
            }
            let close = self.expect(&TokenKind::RightBrace, "'}' to close field body")?;
            let Some(value_type) = value_type else {
                return Err(
                    self.error_at(&close, format!("structure field \"{field}\" is missing its type"))
                );
            };
            structure.insert(field, value_type);
            self.eat(&TokenKind::Comma);
        }
        self.expect(&TokenKind::RightBrace, "'}' to close structure")?;
        Ok(structure)
    }

    /// `characters [ "Name": { biography: "…", description: "…",
    /// linked-list-data: { … } }, … ]`
    fn parse_characters(&mut self) -> Result<(), ParseError> {
        self.expect(&TokenKind::LeftBracket, "'[' to open characters list")?;
        while !self.check(&TokenKind::RightBracket) && !self.check(&TokenKind::Eof) {
            let name_token = self.peek().clone();
            let name = self.expect_string("character name")?;
            if self.characters.iter().any(|c| c.name == name) {
                return Err(self.error_at(&name_token, format!("duplicate character \"{name}\"")));
            }
            self.expect(&TokenKind::Colon, "':' after character name")?;
            self.expect(&TokenKind::LeftBrace, "'{' to open character body")?;

            let mut biography = String::new();
            let mut description = String::new();
            let mut list_data: IndexMap<String, ListData> = IndexMap::new();
            while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
                let Some(key) = self.field_key() else {
                    self.skip_value()?;
                    continue;
                };
                self.bump()?;
                self.expect(&TokenKind::Colon, "':' after field name")?;
                match key.as_str() {
                    "biography" => biography = self.expect_string("biography text")?,
                    "description" => description = self.expect_string("description text")?,
                    "linked-list-data" => list_data = self.parse_character_list_data()?,
                    _ => self.skip_value()?,
                }
                self.eat(&TokenKind::Comma);
            }
            self.expect(&TokenKind::RightBrace, "'}' to close character body")?;

            self.characters.push(Character {
                name,
                biography,
                description,
                list_data,
            });
            self.eat(&TokenKind::Comma);
        }
        self.expect(&TokenKind::RightBracket, "']' to close characters list")?;
        Ok(())
    }

    /// `linked-list-data: { ListName: {…} | [ "key": {…}, … ], … }`
    fn parse_character_list_data(&mut self) -> Result<IndexMap<String, ListData>, ParseError> {
        self.expect(&TokenKind::LeftBrace, "'{' to open linked-list-data")?;
        let mut list_data = IndexMap::new();
        while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
            let list_name = self.expect_field_name("linked-list name")?;
            self.expect(&TokenKind::Colon, "':' after linked-list name")?;
            let data = match self.peek_kind() {
                TokenKind::LeftBrace => ListData::Single(self.parse_list_record()?),
                TokenKind::LeftBracket => {
                    self.bump()?;
                    let mut records = Vec::new();
                    while !self.check(&TokenKind::RightBracket) && !self.check(&TokenKind::Eof) {
                        let key = self.expect_string("record key")?;
                        self.expect(&TokenKind::Colon, "':' after record key")?;
                        let record = self.parse_list_record()?;
                        records.push((key, record));
                        self.eat(&TokenKind::Comma);
                    }
                    self.expect(&TokenKind::RightBracket, "']' to close record list")?;
                    ListData::Keyed(records)
                }
                _ => {
                    let token = self.peek().clone();
                    return Err(self.error_at(&token, "expected a record or a record list"));
                }
            };
            list_data.insert(list_name, data);
            self.eat(&TokenKind::Comma);
        }
        self.expect(&TokenKind::RightBrace, "'}' to close linked-list-data")?;
        Ok(list_data)
    }

    /// `{ Field: <literal>, … }`
    fn parse_list_record(&mut self) -> Result<ListRecord, ParseError> {
        self.expect(&TokenKind::LeftBrace, "'{' to open record")?;
        let mut record = ListRecord::new();
        while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
            let field = self.expect_field_name("record field name")?;
            self.expect(&TokenKind::Colon, "':' after field name")?;
            let value = self.parse_value("field value")?;
            record.insert(field, value);
            self.eat(&TokenKind::Comma);
        }
        self.expect(&TokenKind::RightBrace, "'}' to close record")?;
        Ok(record)
    }

    /// `tags [ "Name": { type: "…", color: "#…", keys: [ "k1", … ] }, … ]`
    fn parse_tags(&mut self) -> Result<(), ParseError> {
        self.expect(&TokenKind::LeftBracket, "'[' to open tags list")?;
        while !self.check(&TokenKind::RightBracket) && !self.check(&TokenKind::Eof) {
            let name_token = self.peek().clone();
            let name = self.expect_string("tag name")?;
            if self.tags.iter().any(|t| t.name == name) {
                return Err(self.error_at(&name_token, format!("duplicate tag \"{name}\"")));
            }
            self.expect(&TokenKind::Colon, "':' after tag name")?;
            self.expect(&TokenKind::LeftBrace, "'{' to open tag body")?;

            let mut kind: Option<TagKind> = None;
            let mut color: Option<TagColor> = None;
            let mut keys: Vec<String> = Vec::new();
            while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
                let Some(key) = self.field_key() else {
                    self.skip_value()?;
                    continue;
                };
                self.bump()?;
                self.expect(&TokenKind::Colon, "':' after field name")?;
                match key.as_str() {
                    "type" => {
                        let token = self.peek().clone();
                        let kind_name = self.expect_string("tag type")?;
                        let Some(parsed) = TagKind::from_name(&kind_name) else {
                            return Err(self.error_at(
                                &token,
                                format!("unknown tag type \"{kind_name}\""),
                            ));
                        };
                        kind = Some(parsed);
                    }
                    "color" => {
                        let token = self.peek().clone();
                        let color_text = self.expect_string("tag color")?;
                        let Ok(parsed) = TagColor::try_new(color_text.clone()) else {
                            return Err(self.error_at(
                                &token,
                                format!("invalid tag color \"{color_text}\""),
                            ));
                        };
                        color = Some(parsed);
                    }
                    "keys" => keys = self.parse_string_list("tag key")?,
                    _ => self.skip_value()?,
                }
                self.eat(&TokenKind::Comma);
            }
            let close = self.expect(&TokenKind::RightBrace, "'}' to close tag body")?;

            let Some(kind) = kind else {
                return Err(self.error_at(&close, format!("tag \"{name}\" is missing its type")));
            };
            let Some(color) = color else {
                return Err(self.error_at(&close, format!("tag \"{name}\" is missing its color")));
            };
            self.tags.push(TagDefinition {
                name,
                kind,
                color,
                keys,
            });
            self.eat(&TokenKind::Comma);
        }
        self.expect(&TokenKind::RightBracket, "']' to close tags list")?;
        Ok(())
    }

    /// `[ "a", "b", … ]`
    fn parse_string_list(&mut self, what: &str) -> Result<Vec<String>, ParseError> {
        self.expect(&TokenKind::LeftBracket, "'[' to open list")?;
        let mut items = Vec::new();
        while !self.check(&TokenKind::RightBracket) && !self.check(&TokenKind::Eof) {
            items.push(self.expect_string(what)?);
            self.eat(&TokenKind::Comma);
        }
        self.expect(&TokenKind::RightBracket, "']' to close list")?;
        Ok(items)
    }

    /// `chapter N { name: "…" }`
    fn parse_chapter(&mut self) -> Result<(), ParseError> {
        let id_token = self.peek().clone();
        let id = ChapterId::new(self.expect_integer("chapter id")?);
        if self.chapters.iter().any(|c| c.id == id) {
            return Err(self.error_at(
                &id_token,
                format!("duplicate chapter id {}", id.into_inner()),
            ));
        }
        self.expect(&TokenKind::LeftBrace, "'{' to open chapter body")?;

        let mut name = String::new();
        while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
            let Some(key) = self.field_key() else {
                self.skip_value()?;
                continue;
            };
            self.bump()?;
            self.expect(&TokenKind::Colon, "':' after field name")?;
            match key.as_str() {
                "name" => name = self.expect_string("chapter name")?,
                _ => self.skip_value()?,
            }
            self.eat(&TokenKind::Comma);
        }
        self.expect(&TokenKind::RightBrace, "'}' to close chapter body")?;

        self.chapters.push(Chapter { id, name });
        Ok(())
    }

    /// `group N { chapter: N, name: "…", content: "…", parent-group: N,
    /// tags: […], linked-lists: […], nodes: {…} }`
    fn parse_group(&mut self) -> Result<(), ParseError> {
        let id_token = self.peek().clone();
        let id = GroupId::new(self.expect_integer("group id")?);
        if self.groups.iter().any(|g| g.id == id) {
            return Err(self.error_at(
                &id_token,
                format!("duplicate group id {}", id.into_inner()),
            ));
        }
        self.expect(&TokenKind::LeftBrace, "'{' to open group body")?;

        let mut chapter = ChapterId::new(0);
        let mut name = String::new();
        let mut content = String::new();
        let mut parent: Option<GroupId> = None;
        let mut tags: Vec<AppliedTag> = Vec::new();
        let mut linked_lists: Vec<String> = Vec::new();
        let mut node_graph: Option<NodeGraph> = None;
        while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
            let Some(key) = self.field_key() else {
                self.skip_value()?;
                continue;
            };
            self.bump()?;
            self.expect(&TokenKind::Colon, "':' after field name")?;
            match key.as_str() {
                "chapter" => chapter = ChapterId::new(self.expect_integer("chapter id")?),
                "name" => name = self.expect_string("group name")?,
                "content" => content = self.expect_string("group content")?,
                "parent-group" => {
                    parent = Some(GroupId::new(self.expect_integer("parent group id")?));
                }
                "tags" => tags = self.parse_applied_tags()?,
                "linked-lists" => linked_lists = self.parse_string_list("linked-list name")?,
                "nodes" => node_graph = Some(self.parse_node_graph()?),
                _ => self.skip_value()?,
            }
            self.eat(&TokenKind::Comma);
        }
        self.expect(&TokenKind::RightBrace, "'}' to close group body")?;

        self.groups.push(Group {
            id,
            chapter,
            name,
            content,
            parent,
            tags,
            linked_lists,
            node_graph,
        });
        Ok(())
    }

    /// `tags: [ "Name", "Name": { key: "…", value: <literal> }, … ]`
    fn parse_applied_tags(&mut self) -> Result<Vec<AppliedTag>, ParseError> {
        self.expect(&TokenKind::LeftBracket, "'[' to open tags list")?;
        let mut tags = Vec::new();
        while !self.check(&TokenKind::RightBracket) && !self.check(&TokenKind::Eof) {
            let name = self.expect_string("tag name")?;
            let mut key: Option<String> = None;
            let mut value: Option<Value> = None;
            if self.eat(&TokenKind::Colon) {
                self.expect(&TokenKind::LeftBrace, "'{' to open tag application")?;
                while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
                    let Some(field) = self.field_key() else {
                        self.skip_value()?;
                        continue;
                    };
                    self.bump()?;
                    self.expect(&TokenKind::Colon, "':' after field name")?;
                    match field.as_str() {
                        "key" => key = Some(self.expect_string("tag key")?),
                        "value" => value = Some(self.parse_value("tag value")?),
                        _ => self.skip_value()?,
                    }
                    self.eat(&TokenKind::Comma);
                }
                self.expect(&TokenKind::RightBrace, "'}' to close tag application")?;
            }
            tags.push(AppliedTag { name, key, value });
            self.eat(&TokenKind::Comma);
        }
        self.expect(&TokenKind::RightBracket, "']' to close tags list")?;
        Ok(tags)
    }

    /// `nodes: { start: N, end: N, points: { N: [N, N, …], … } }`
    fn parse_node_graph(&mut self) -> Result<NodeGraph, ParseError> {
        self.expect(&TokenKind::LeftBrace, "'{' to open node graph")?;
        let mut start = NodeId::new(0);
        let mut end = NodeId::new(0);
        let mut points: IndexMap<NodeId, Vec<NodeId>> = IndexMap::new();
        while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
            let Some(key) = self.field_key() else {
                self.skip_value()?;
                continue;
            };
            self.bump()?;
            self.expect(&TokenKind::Colon, "':' after field name")?;
            match key.as_str() {
                "start" => start = NodeId::new(self.expect_integer("start node id")?),
                "end" => end = NodeId::new(self.expect_integer("end node id")?),
                "points" => {
                    self.expect(&TokenKind::LeftBrace, "'{' to open point map")?;
                    while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
                        let from = NodeId::new(self.expect_integer("node id")?);
                        self.expect(&TokenKind::Colon, "':' after node id")?;
                        self.expect(&TokenKind::LeftBracket, "'[' to open successor list")?;
                        let mut successors = Vec::new();
                        while !self.check(&TokenKind::RightBracket)
                            && !self.check(&TokenKind::Eof)
                        {
                            successors.push(NodeId::new(self.expect_integer("node id")?));
                            self.eat(&TokenKind::Comma);
                        }
                        self.expect(&TokenKind::RightBracket, "']' to close successor list")?;
                        points.insert(from, successors);
                        self.eat(&TokenKind::Comma);
                    }
                    self.expect(&TokenKind::RightBrace, "'}' to close point map")?;
                }
                _ => self.skip_value()?,
            }
            self.eat(&TokenKind::Comma);
        }
        self.expect(&TokenKind::RightBrace, "'}' to close node graph")?;
        Ok(NodeGraph { start, end, points })
    }

    /// `node N { title: "…", content: "…", timeline: { … } }`
    fn parse_node(&mut self) -> Result<(), ParseError> {
        let id_token = self.peek().clone();
        let id = NodeId::new(self.expect_integer("node id")?);
        if self.nodes.iter().any(|n| n.id == id) {
            return Err(self.error_at(
                &id_token,
                format!("duplicate node id {}", id.into_inner()),
            ));
        }
        self.expect(&TokenKind::LeftBrace, "'{' to open node body")?;

        let mut title = String::new();
        let mut content = String::new();
        let mut timeline = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.check(&TokenKind::Eof) {
            let Some(key) = self.field_key() else {
                self.skip_value()?;
                continue;
            };
            self.bump()?;
            self.expect(&TokenKind::Colon, "':' after field name")?;
            match key.as_str() {
                "title" => title = self.expect_string("node title")?,
                "content" => content = self.expect_string("node content")?,
                "timeline" => timeline = self.parse_timeline()?,
                _ => self.skip_value()?,
            }
            self.eat(&TokenKind::Comma);
        }
        self.expect(&TokenKind::RightBrace, "'}' to close node body")?;

        self.nodes.push(Node {
            id,
            title,
            content,
            timeline,
        });
        Ok(())
    }
}
