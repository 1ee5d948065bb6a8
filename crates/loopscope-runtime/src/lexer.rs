//! Lexical analysis (tokenization)
//!
//! The lexer converts source code into a stream of tokens with accurate
//! span information. The grammar is a JavaScript subset; the only unusual
//! pieces are arrow tokens (`=>`), strict equality (`===`/`!==`), and
//! single- or double-quoted strings.

use crate::diagnostic::{error_codes, Diagnostic};
use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Lexer state for tokenizing source code
pub struct Lexer {
    /// Original source code
    source: String,
    /// Characters of source code
    chars: Vec<char>,
    /// Current position in chars
    current: usize,
    /// Byte offset of the current position in `source`
    byte_pos: usize,
    /// Current line number (1-indexed)
    line: u32,
    /// Byte offset where the current token starts
    start_byte: usize,
    /// Start line of current token
    start_line: u32,
    /// Collected diagnostics
    diagnostics: Vec<Diagnostic>,
}

impl Lexer {
    /// Create a new lexer for the given source code
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let chars: Vec<char> = source.chars().collect();
        Self {
            source,
            chars,
            current: 0,
            byte_pos: 0,
            line: 1,
            start_byte: 0,
            start_line: 1,
            diagnostics: Vec::new(),
        }
    }

    /// Tokenize the source code, returning tokens and any diagnostics
    pub fn tokenize(&mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        (tokens, std::mem::take(&mut self.diagnostics))
    }

    /// Scan the next token
    fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        self.start_byte = self.byte_pos;
        self.start_line = self.line;

        if self.is_at_end() {
            return self.make_token(TokenKind::Eof, "");
        }

        let c = self.advance();

        match c {
            // Single-character tokens
            '(' => self.make_token(TokenKind::LeftParen, "("),
            ')' => self.make_token(TokenKind::RightParen, ")"),
            '{' => self.make_token(TokenKind::LeftBrace, "{"),
            '}' => self.make_token(TokenKind::RightBrace, "}"),
            ';' => self.make_token(TokenKind::Semicolon, ";"),
            ',' => self.make_token(TokenKind::Comma, ","),
            '.' => self.make_token(TokenKind::Dot, "."),
            '+' => self.make_token(TokenKind::Plus, "+"),
            '-' => self.make_token(TokenKind::Minus, "-"),
            '*' => self.make_token(TokenKind::Star, "*"),
            '/' => self.make_token(TokenKind::Slash, "/"),
            '%' => self.make_token(TokenKind::Percent, "%"),

            // Multi-character tokens
            '=' => {
                if self.match_char('=') {
                    if self.match_char('=') {
                        self.make_token(TokenKind::EqualEqualEqual, "===")
                    } else {
                        self.make_token(TokenKind::EqualEqual, "==")
                    }
                } else if self.match_char('>') {
                    self.make_token(TokenKind::Arrow, "=>")
                } else {
                    self.make_token(TokenKind::Equal, "=")
                }
            }
            '!' => {
                if self.match_char('=') {
                    if self.match_char('=') {
                        self.make_token(TokenKind::BangEqualEqual, "!==")
                    } else {
                        self.make_token(TokenKind::BangEqual, "!=")
                    }
                } else {
                    self.make_token(TokenKind::Bang, "!")
                }
            }
            '<' => {
                if self.match_char('=') {
                    self.make_token(TokenKind::LessEqual, "<=")
                } else {
                    self.make_token(TokenKind::Less, "<")
                }
            }
            '>' => {
                if self.match_char('=') {
                    self.make_token(TokenKind::GreaterEqual, ">=")
                } else {
                    self.make_token(TokenKind::Greater, ">")
                }
            }
            '&' => {
                if self.match_char('&') {
                    self.make_token(TokenKind::AmpAmp, "&&")
                } else {
                    self.error_token("Unexpected character '&', did you mean '&&'?")
                }
            }
            '|' => {
                if self.match_char('|') {
                    self.make_token(TokenKind::PipePipe, "||")
                } else {
                    self.error_token("Unexpected character '|', did you mean '||'?")
                }
            }

            // String literals (both quote styles)
            '"' => self.string('"'),
            '\'' => self.string('\''),

            // Numbers
            c if c.is_ascii_digit() => self.number(),

            // Identifiers and keywords
            c if c.is_alphabetic() || c == '_' || c == '$' => self.identifier(),

            // Unexpected character
            _ => self.error_token(&format!("Unexpected character '{}'", c)),
        }
    }

    /// Skip whitespace and comments
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            if self.is_at_end() {
                return;
            }

            match self.peek() {
                ' ' | '\r' | '\t' => {
                    self.advance();
                }
                '\n' => {
                    self.advance();
                    self.line += 1;
                }
                '/' => {
                    if self.peek_next() == Some('/') {
                        // Single-line comment
                        while !self.is_at_end() && self.peek() != '\n' {
                            self.advance();
                        }
                    } else if self.peek_next() == Some('*') {
                        // Multi-line comment
                        self.advance(); // /
                        self.advance(); // *

                        while !self.is_at_end() {
                            if self.peek() == '*' && self.peek_next() == Some('/') {
                                self.advance(); // *
                                self.advance(); // /
                                break;
                            }
                            if self.peek() == '\n' {
                                self.line += 1;
                            }
                            self.advance();
                        }
                    } else {
                        return;
                    }
                }
                _ => return,
            }
        }
    }

    /// Scan a string literal delimited by the given quote character
    fn string(&mut self, quote: char) -> Token {
        let mut value = String::new();

        while !self.is_at_end() && self.peek() != quote {
            if self.peek() == '\n' {
                self.line += 1;
            }

            if self.peek() == '\\' {
                self.advance(); // consume backslash
                if self.is_at_end() {
                    return self.error_token("Unterminated string literal");
                }

                let escaped = match self.peek() {
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    '\\' => '\\',
                    '\'' => '\'',
                    '"' => '"',
                    c => {
                        return self.error_token(&format!("Invalid escape sequence '\\{}'", c));
                    }
                };

                self.advance(); // consume escaped character
                value.push(escaped);
            } else {
                value.push(self.advance());
            }
        }

        if self.is_at_end() {
            return self.error_token("Unterminated string literal");
        }

        self.advance(); // Closing quote
        self.make_token(TokenKind::String, &value)
    }

    /// Scan a number literal (integer or float)
    fn number(&mut self) -> Token {
        let start = self.current - 1; // -1 because we already advanced past first digit

        while !self.is_at_end() && self.peek().is_ascii_digit() {
            self.advance();
        }

        // Check for decimal point followed by a digit
        if !self.is_at_end() && self.peek() == '.' {
            if let Some(c) = self.peek_next() {
                if c.is_ascii_digit() {
                    self.advance(); // consume .

                    while !self.is_at_end() && self.peek().is_ascii_digit() {
                        self.advance();
                    }
                }
            }
        }

        let lexeme: String = self.chars[start..self.current].iter().collect();
        self.make_token(TokenKind::Number, &lexeme)
    }

    /// Scan an identifier or keyword
    fn identifier(&mut self) -> Token {
        let start = self.current - 1;

        while !self.is_at_end() {
            let c = self.peek();
            if c.is_alphanumeric() || c == '_' || c == '$' {
                self.advance();
            } else {
                break;
            }
        }

        let lexeme: String = self.chars[start..self.current].iter().collect();
        let kind = TokenKind::is_keyword(&lexeme).unwrap_or(TokenKind::Identifier);

        self.make_token(kind, &lexeme)
    }

    // === Character navigation ===

    /// Advance to next character and return it
    fn advance(&mut self) -> char {
        let c = self.chars[self.current];
        self.current += 1;
        self.byte_pos += c.len_utf8();
        c
    }

    /// Peek at current character without advancing
    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.chars[self.current]
        }
    }

    /// Peek at next character (current + 1)
    fn peek_next(&self) -> Option<char> {
        if self.current + 1 >= self.chars.len() {
            None
        } else {
            Some(self.chars[self.current + 1])
        }
    }

    /// Check if current character matches expected, and advance if so
    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.chars[self.current] != expected {
            false
        } else {
            self.advance();
            true
        }
    }

    /// Check if we've reached the end of source
    fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }

    // === Token creation ===

    /// Create a token with the given kind and lexeme. Spans are byte
    /// offsets into the source, never char indices.
    fn make_token(&self, kind: TokenKind, lexeme: &str) -> Token {
        let span = Span {
            start: self.start_byte,
            end: self.byte_pos,
        };

        Token {
            kind,
            lexeme: lexeme.to_string(),
            span,
        }
    }

    /// Create an error token and record a diagnostic
    fn error_token(&mut self, message: &str) -> Token {
        let span = Span {
            start: self.start_byte,
            end: self.byte_pos.max(self.start_byte + 1),
        };

        let snippet = self.get_line_snippet(self.start_line);

        self.diagnostics.push(
            Diagnostic::error_with_code(error_codes::LEX, message, span)
                .with_line(self.start_line as usize)
                .with_snippet(snippet),
        );

        Token {
            kind: TokenKind::Error,
            lexeme: message.to_string(),
            span,
        }
    }

    /// Get the source line for a given line number
    fn get_line_snippet(&self, line: u32) -> String {
        self.source
            .lines()
            .nth((line - 1) as usize)
            .unwrap_or("")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        let mut lexer = Lexer::new("");
        let (tokens, diagnostics) = lexer.tokenize();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
        assert_eq!(diagnostics.len(), 0);
    }

    #[test]
    fn test_punctuation() {
        let mut lexer = Lexer::new("(){};,.");
        let (tokens, _) = lexer.tokenize();

        assert_eq!(tokens[0].kind, TokenKind::LeftParen);
        assert_eq!(tokens[1].kind, TokenKind::RightParen);
        assert_eq!(tokens[2].kind, TokenKind::LeftBrace);
        assert_eq!(tokens[3].kind, TokenKind::RightBrace);
        assert_eq!(tokens[4].kind, TokenKind::Semicolon);
        assert_eq!(tokens[5].kind, TokenKind::Comma);
        assert_eq!(tokens[6].kind, TokenKind::Dot);
    }

    #[test]
    fn test_equality_family() {
        let mut lexer = Lexer::new("= == === != !== =>");
        let (tokens, _) = lexer.tokenize();

        let expected = vec![
            TokenKind::Equal,
            TokenKind::EqualEqual,
            TokenKind::EqualEqualEqual,
            TokenKind::BangEqual,
            TokenKind::BangEqualEqual,
            TokenKind::Arrow,
        ];

        for (i, expected_kind) in expected.iter().enumerate() {
            assert_eq!(tokens[i].kind, *expected_kind);
        }
    }

    #[test]
    fn test_keywords() {
        let mut lexer = Lexer::new("let const var function return throw if else new");
        let (tokens, _) = lexer.tokenize();

        let expected = vec![
            TokenKind::Let,
            TokenKind::Const,
            TokenKind::Var,
            TokenKind::Function,
            TokenKind::Return,
            TokenKind::Throw,
            TokenKind::If,
            TokenKind::Else,
            TokenKind::New,
        ];

        for (i, expected_kind) in expected.iter().enumerate() {
            assert_eq!(tokens[i].kind, *expected_kind);
        }
    }

    #[test]
    fn test_single_quoted_string() {
        let mut lexer = Lexer::new("'Start'");
        let (tokens, diagnostics) = lexer.tokenize();
        assert!(diagnostics.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].lexeme, "Start");
    }

    #[test]
    fn test_double_quoted_string_with_escape() {
        let mut lexer = Lexer::new(r#""a\nb""#);
        let (tokens, _) = lexer.tokenize();
        assert_eq!(tokens[0].lexeme, "a\nb");
    }

    #[test]
    fn test_unterminated_string() {
        let mut lexer = Lexer::new("'oops");
        let (tokens, diagnostics) = lexer.tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_numbers() {
        let mut lexer = Lexer::new("42 3.14 0 500");
        let (tokens, _) = lexer.tokenize();

        assert_eq!(tokens[0].lexeme, "42");
        assert_eq!(tokens[1].lexeme, "3.14");
        assert_eq!(tokens[2].lexeme, "0");
        assert_eq!(tokens[3].lexeme, "500");
    }

    #[test]
    fn test_dollar_identifier() {
        let mut lexer = Lexer::new("$val _x abc123");
        let (tokens, _) = lexer.tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].lexeme, "$val");
        assert_eq!(tokens[1].lexeme, "_x");
        assert_eq!(tokens[2].lexeme, "abc123");
    }

    #[test]
    fn test_comments_are_skipped() {
        let mut lexer = Lexer::new("let x = 5; // trailing\n/* block */ let y = 6;");
        let (tokens, diagnostics) = lexer.tokenize();
        assert!(diagnostics.is_empty());
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Let,
                TokenKind::Identifier,
                TokenKind::Equal,
                TokenKind::Number,
                TokenKind::Semicolon,
                TokenKind::Let,
                TokenKind::Identifier,
                TokenKind::Equal,
                TokenKind::Number,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_arrow_function_shape() {
        let mut lexer = Lexer::new("() => { console.log('hi'); }");
        let (tokens, diagnostics) = lexer.tokenize();
        assert!(diagnostics.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::LeftParen);
        assert_eq!(tokens[1].kind, TokenKind::RightParen);
        assert_eq!(tokens[2].kind, TokenKind::Arrow);
    }

    #[test]
    fn test_spans_are_byte_offsets() {
        let source = "let abc = 42;";
        let mut lexer = Lexer::new(source);
        let (tokens, diagnostics) = lexer.tokenize();
        assert!(diagnostics.is_empty());
        for token in tokens.iter().filter(|t| t.kind != TokenKind::Eof) {
            assert_eq!(&source[token.span.start..token.span.end], token.lexeme);
        }
    }

    #[test]
    fn test_spans_stay_byte_aligned_after_non_ascii_string() {
        let source = "console.log('héé');\nsetTimeout(f, 0);";
        let mut lexer = Lexer::new(source);
        let (tokens, diagnostics) = lexer.tokenize();
        assert!(diagnostics.is_empty());

        let ident = tokens
            .iter()
            .find(|t| t.lexeme == "setTimeout")
            .expect("setTimeout token");
        assert_eq!(&source[ident.span.start..ident.span.end], "setTimeout");
        assert_eq!(ident.span.start, source.find("setTimeout").unwrap());
    }

    #[test]
    fn test_invalid_character() {
        let mut lexer = Lexer::new("let x = @;");
        let (_, diagnostics) = lexer.tokenize();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains('@'));
    }
}
