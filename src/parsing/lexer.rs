// Copyright (c) 2025 John Wilger
// SPDX-License-Identifier: MIT

//! Lexical analyzer for story documents.
//!
//! The lexer converts raw text into a flat token sequence for the parser.
//! It handles:
//!
//! - Keywords (`states`, `chapter`, `dialogue`, …)
//! - Literals (strings, integers, signed floats, booleans)
//! - Identifiers, which may contain hyphens (`linked-list-data` is one
//!   identifier)
//! - Punctuation (`{ } [ ] : , @ ( )`)
//! - Opaque code blocks delimited by `<!` … `!>`, carried verbatim
//! - Whitespace, `#` comments, and the three line-ending conventions
//!
//! Every token records its starting line and column (1-indexed) and the
//! exact source slice it was scanned from, so concatenating lexemes in
//! order reproduces the source minus whitespace and comments. Lexical
//! faults produce a single [`TokenKind::Error`] token and end the scan.

/// A token with its position in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The type and decoded value of the token.
    pub kind: TokenKind,
    /// The exact source slice the token was scanned from.
    pub lexeme: String,
    /// Starting line, 1-indexed.
    pub line: u32,
    /// Starting column, 1-indexed.
    pub column: u32,
}

/// All token types in the story document format.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Opening brace `{`.
    LeftBrace,
    /// Closing brace `}`.
    RightBrace,
    /// Opening bracket `[`.
    LeftBracket,
    /// Closing bracket `]`.
    RightBracket,
    /// Colon `:`.
    Colon,
    /// Comma `,`.
    Comma,
    /// At sign `@`, introducing a reference.
    At,
    /// Opening parenthesis `(`.
    LeftParen,
    /// Closing parenthesis `)`.
    RightParen,
    /// String literal; the value is the text between the quotes, verbatim.
    Str(String),
    /// Integer literal.
    Integer(i64),
    /// Floating-point literal.
    Float(f64),
    /// Boolean literal (`true` / `false`).
    Bool(bool),
    /// Opaque code block; the value is the text between `<!` and `!>`,
    /// verbatim.
    CodeBlock(String),
    /// User-defined identifier; the text is the lexeme.
    Identifier,
    /// Reserved word.
    Keyword(Keyword),
    /// Lexical fault. The parser treats this as a fatal parse failure.
    Error(LexErrorKind),
    /// End of input marker.
    Eof,
}

/// Reserved words of the story document format.
///
/// Field names inside bodies (`type`, `name`, `content`, …) are ordinary
/// identifiers; only section and construct openers are reserved, plus the
/// three reference kinds which reuse `chapter` / `group` / `node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    /// `states`
    States,
    /// `global_vars`
    GlobalVars,
    /// `linked-lists`
    LinkedLists,
    /// `characters`
    Characters,
    /// `tags`
    Tags,
    /// `chapter`
    Chapter,
    /// `group`
    Group,
    /// `node`
    Node,
    /// `dialogue`
    Dialogue,
    /// `action`
    Action,
}

/// What went wrong when the lexer produced an [`TokenKind::Error`] token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexErrorKind {
    /// A character that begins no token.
    UnexpectedCharacter(char),
    /// A string literal with no closing quote.
    UnterminatedString,
    /// A `<!` with no matching `!>`.
    UnterminatedCodeBlock,
    /// A numeric literal that could not be decoded.
    InvalidNumber,
}

impl LexErrorKind {
    /// A human-readable description, used in parse error messages.
    pub fn message(&self) -> String {
        match self {
            LexErrorKind::UnexpectedCharacter(c) => format!("unexpected character '{c}'"),
            LexErrorKind::UnterminatedString => "unterminated string literal".to_string(),
            LexErrorKind::UnterminatedCodeBlock => "unterminated code block".to_string(),
            LexErrorKind::InvalidNumber => "invalid numeric literal".to_string(),
        }
    }
}

/// Scans `source` to a token list.
///
/// The list always ends with an [`TokenKind::Eof`] token. If a lexical
/// fault occurs, the fault's [`TokenKind::Error`] token appears in its
/// place and the remainder of the source is not scanned.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        let done = matches!(token.kind, TokenKind::Eof | TokenKind::Error(_));
        let errored = matches!(token.kind, TokenKind::Error(_));
        tokens.push(token);
        if done {
            if errored {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    lexeme: String::new(),
                    line: lexer.line,
                    column: lexer.column,
                });
            }
            break;
        }
    }
    tokens
}

/// Hand-written scanner over the source text.
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: u32,
    column: u32,
}

impl Lexer {
    /// Creates a new lexer for the given input.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Returns the next token from the input.
    pub fn next_token(&mut self) -> Token {
        self.skip_trivia();

        let line = self.line;
        let column = self.column;
        let start = self.position;

        let Some(ch) = self.current_char() else {
            return Token {
                kind: TokenKind::Eof,
                lexeme: String::new(),
                line,
                column,
            };
        };

        match ch {
            '{' => self.punctuation(TokenKind::LeftBrace, start, line, column),
            '}' => self.punctuation(TokenKind::RightBrace, start, line, column),
            '[' => self.punctuation(TokenKind::LeftBracket, start, line, column),
            ']' => self.punctuation(TokenKind::RightBracket, start, line, column),
            ':' => self.punctuation(TokenKind::Colon, start, line, column),
            ',' => self.punctuation(TokenKind::Comma, start, line, column),
            '@' => self.punctuation(TokenKind::At, start, line, column),
            '(' => self.punctuation(TokenKind::LeftParen, start, line, column),
            ')' => self.punctuation(TokenKind::RightParen, start, line, column),
            '"' => self.string_literal(start, line, column),
            '<' => self.code_block(start, line, column),
            '-' => self.number(start, line, column),
            c if c.is_ascii_digit() => self.number(start, line, column),
            c if c.is_alphabetic() || c == '_' => self.word(start, line, column),
            c => {
                self.advance();
                self.token(TokenKind::Error(LexErrorKind::UnexpectedCharacter(c)), start, line, column)
            }
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    /// Consumes one character, counting `\n`, `\r`, and `\r\n` as exactly
    /// one line each.
    fn advance(&mut self) {
        match self.current_char() {
            Some('\n') => {
                self.position += 1;
                self.line += 1;
                self.column = 1;
            }
            Some('\r') => {
                self.position += 1;
                if self.current_char() == Some('\n') {
                    self.position += 1;
                }
                self.line += 1;
                self.column = 1;
            }
            Some(_) => {
                self.position += 1;
                self.column += 1;
            }
            None => {}
        }
    }

    fn skip_trivia(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '#' {
                while let Some(c) = self.current_char() {
                    if c == '\n' || c == '\r' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn text(&self, start: usize, end: usize) -> String {
        self.input[start..end].iter().collect()
    }

    fn token(&self, kind: TokenKind, start: usize, line: u32, column: u32) -> Token {
        Token {
            kind,
            lexeme: self.text(start, self.position),
            line,
            column,
        }
    }

    fn punctuation(&mut self, kind: TokenKind, start: usize, line: u32, column: u32) -> Token {
        self.advance();
        self.token(kind, start, line, column)
    }

    fn string_literal(&mut self, start: usize, line: u32, column: u32) -> Token {
        self.advance(); // opening quote
        loop {
            match self.current_char() {
                Some('"') => {
                    self.advance();
                    let content = self.text(start + 1, self.position - 1);
                    return self.token(TokenKind::Str(content), start, line, column);
                }
                Some(_) => self.advance(),
                None => {
                    return Token {
                        kind: TokenKind::Error(LexErrorKind::UnterminatedString),
                        lexeme: "\"".to_string(),
                        line,
                        column,
                    };
                }
            }
        }
    }

    fn code_block(&mut self, start: usize, line: u32, column: u32) -> Token {
        if self.peek_char() != Some('!') {
            self.advance();
            return self.token(
                TokenKind::Error(LexErrorKind::UnexpectedCharacter('<')),
                start,
                line,
                column,
            );
        }
        self.advance(); // <
        self.advance(); // !
        loop {
            match self.current_char() {
                Some('!') if self.peek_char() == Some('>') => {
                    self.advance();
                    self.advance();
                    let content = self.text(start + 2, self.position - 2);
                    return self.token(TokenKind::CodeBlock(content), start, line, column);
                }
                Some(_) => self.advance(),
                None => {
                    return Token {
                        kind: TokenKind::Error(LexErrorKind::UnterminatedCodeBlock),
                        lexeme: "<!".to_string(),
                        line,
                        column,
                    };
                }
            }
        }
    }

    fn number(&mut self, start: usize, line: u32, column: u32) -> Token {
        if self.current_char() == Some('-') {
            if !self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
                return self.token(
                    TokenKind::Error(LexErrorKind::UnexpectedCharacter('-')),
                    start,
                    line,
                    column,
                );
            }
            self.advance();
        }
        while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        let is_float = self.current_char() == Some('.')
            && self.peek_char().is_some_and(|c| c.is_ascii_digit());
        if is_float {
            self.advance(); // .
            while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let lexeme = self.text(start, self.position);
        let kind = if is_float {
            match lexeme.parse::<f64>() {
                Ok(value) => TokenKind::Float(value),
                Err(_) => TokenKind::Error(LexErrorKind::InvalidNumber),
            }
        } else {
            match lexeme.parse::<i64>() {
                Ok(value) => TokenKind::Integer(value),
                Err(_) => TokenKind::Error(LexErrorKind::InvalidNumber),
            }
        };
        self.token(kind, start, line, column)
    }

    fn word(&mut self, start: usize, line: u32, column: u32) -> Token {
        while self
            .current_char()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            self.advance();
        }

        let lexeme = self.text(start, self.position);
        let kind = match lexeme.as_str() {
            "states" => TokenKind::Keyword(Keyword::States),
            "global_vars" => TokenKind::Keyword(Keyword::GlobalVars),
            "linked-lists" => TokenKind::Keyword(Keyword::LinkedLists),
            "characters" => TokenKind::Keyword(Keyword::Characters),
            "tags" => TokenKind::Keyword(Keyword::Tags),
            "chapter" => TokenKind::Keyword(Keyword::Chapter),
            "group" => TokenKind::Keyword(Keyword::Group),
            "node" => TokenKind::Keyword(Keyword::Node),
            "dialogue" => TokenKind::Keyword(Keyword::Dialogue),
            "action" => TokenKind::Keyword(Keyword::Action),
            "true" => TokenKind::Bool(true),
            "false" => TokenKind::Bool(false),
            _ => TokenKind::Identifier,
        };
        self.token(kind, start, line, column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexer_tokenizes_punctuation_and_literals() {
        let tokens = kinds(r#"{ } [ ] : , @ ( ) "hi" 42 -7 3.5 -0.25 true false"#);
        assert_eq!(
            tokens,
            vec![
                TokenKind::LeftBrace,
                TokenKind::RightBrace,
                TokenKind::LeftBracket,
                TokenKind::RightBracket,
                TokenKind::Colon,
                TokenKind::Comma,
                TokenKind::At,
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::Str("hi".to_string()),
                TokenKind::Integer(42),
                TokenKind::Integer(-7),
                TokenKind::Float(3.5),
                TokenKind::Float(-0.25),
                TokenKind::Bool(true),
                TokenKind::Bool(false),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexer_keeps_hyphens_in_identifiers() {
        let tokens = tokenize("linked-list-data my_name-2");
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].lexeme, "linked-list-data");
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].lexeme, "my_name-2");
    }

    #[test]
    fn lexer_recognizes_keywords() {
        let tokens = kinds("states global_vars linked-lists characters tags chapter group node dialogue action");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Keyword(Keyword::States),
                TokenKind::Keyword(Keyword::GlobalVars),
                TokenKind::Keyword(Keyword::LinkedLists),
                TokenKind::Keyword(Keyword::Characters),
                TokenKind::Keyword(Keyword::Tags),
                TokenKind::Keyword(Keyword::Chapter),
                TokenKind::Keyword(Keyword::Group),
                TokenKind::Keyword(Keyword::Node),
                TokenKind::Keyword(Keyword::Dialogue),
                TokenKind::Keyword(Keyword::Action),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexer_takes_string_content_verbatim_across_lines() {
        let tokens = tokenize("\"line one\nline two\"");
        assert_eq!(
            tokens[0].kind,
            TokenKind::Str("line one\nline two".to_string())
        );
        assert_eq!(tokens[0].lexeme, "\"line one\nline two\"");
        // the Eof token sits on line 2
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn lexer_carries_code_block_content_verbatim() {
        let tokens = tokenize("<! x = 1;\n y = 2; !>");
        assert_eq!(
            tokens[0].kind,
            TokenKind::CodeBlock(" x = 1;\n y = 2; ".to_string())
        );
        // line counting continues inside the block
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn lexer_ignores_braces_inside_code_blocks() {
        let tokens = kinds("<! if (a) { b } !>");
        assert_eq!(
            tokens,
            vec![
                TokenKind::CodeBlock(" if (a) { b } ".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexer_reports_unterminated_code_block_at_opener() {
        let tokens = tokenize("node 1 {\n<! foo");
        let error = tokens
            .iter()
            .find(|t| matches!(t.kind, TokenKind::Error(_)))
            .expect("expected an error token");
        assert_eq!(
            error.kind,
            TokenKind::Error(LexErrorKind::UnterminatedCodeBlock)
        );
        assert_eq!(error.line, 2);
        assert_eq!(error.column, 1);
    }

    #[test]
    fn lexer_reports_unterminated_string() {
        let tokens = tokenize("\"never closed");
        assert_eq!(
            tokens[0].kind,
            TokenKind::Error(LexErrorKind::UnterminatedString)
        );
    }

    #[test]
    fn lexer_skips_comments_to_end_of_line() {
        let tokens = tokenize("# heading\nstates # trailing\n[ ]");
        let kinds: Vec<_> = tokens.iter().map(|t| &t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                &TokenKind::Keyword(Keyword::States),
                &TokenKind::LeftBracket,
                &TokenKind::RightBracket,
                &TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn lexer_counts_each_line_ending_convention_once() {
        let tokens = tokenize("a\nb\rc\r\nd");
        let positions: Vec<_> = tokens.iter().map(|t| (t.line, t.column)).collect();
        assert_eq!(
            positions,
            vec![(1, 1), (2, 1), (3, 1), (4, 1), (4, 2)]
        );
    }

    #[test]
    fn lexer_tracks_columns_within_a_line() {
        let tokens = tokenize("chapter 4 {");
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (1, 9));
        assert_eq!((tokens[2].line, tokens[2].column), (1, 11));
    }

    #[test]
    fn lexer_flags_unexpected_characters() {
        let tokens = tokenize("states [ ; ]");
        let error = tokens
            .iter()
            .find(|t| matches!(t.kind, TokenKind::Error(_)))
            .expect("expected an error token");
        assert_eq!(
            error.kind,
            TokenKind::Error(LexErrorKind::UnexpectedCharacter(';'))
        );
    }

    #[test]
    fn lexer_stops_scanning_after_the_first_error() {
        let tokens = tokenize("; states");
        assert!(matches!(tokens[0].kind, TokenKind::Error(_)));
        assert_eq!(tokens[1].kind, TokenKind::Eof);
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn lexer_lexemes_reproduce_source_without_trivia() {
        let source = "chapter 1 { # intro\n  name: \"Begin nings\"\n}\n";
        let concatenated: String = tokenize(source).iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(concatenated, "chapter1{name:\"Begin nings\"}");
    }
}
