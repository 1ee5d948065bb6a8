//! Token types for lexical analysis
//!
//! Defines all token types recognized by the Loopscope lexer. The language
//! is a small JavaScript subset: just enough surface to write programs that
//! exercise the scheduling primitives.

use crate::span::Span;
use serde::{Deserialize, Serialize};

/// Token produced by the lexer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The source text of this token (unescaped value for strings)
    pub lexeme: String,
    /// Source location
    pub span: Span,
}

impl Token {
    /// Create a new token
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
        }
    }
}

/// Classification of token types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    // Literals
    /// Number literal (42, 3.14)
    Number,
    /// String literal ('hello' or "hello")
    String,
    /// `true` keyword
    True,
    /// `false` keyword
    False,
    /// `null` keyword
    Null,
    /// `undefined` keyword
    Undefined,
    /// Identifier
    Identifier,

    // Keywords
    /// `let` keyword
    Let,
    /// `const` keyword
    Const,
    /// `var` keyword
    Var,
    /// `function` keyword
    Function,
    /// `return` keyword
    Return,
    /// `throw` keyword
    Throw,
    /// `if` keyword
    If,
    /// `else` keyword
    Else,
    /// `new` keyword
    New,

    // Operators
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `!`
    Bang,
    /// `==` (loose equality)
    EqualEqual,
    /// `===` (strict equality)
    EqualEqualEqual,
    /// `!=` (loose inequality)
    BangEqual,
    /// `!==` (strict inequality)
    BangEqualEqual,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
    /// `&&`
    AmpAmp,
    /// `||`
    PipePipe,

    // Punctuation
    /// `=` (assignment)
    Equal,
    /// `=>` (arrow function)
    Arrow,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,
    /// `;`
    Semicolon,
    /// `,`
    Comma,
    /// `.`
    Dot,

    // Special
    /// End of file
    Eof,
    /// Lexer error
    Error,
}

impl TokenKind {
    /// Check if a string is a keyword and return its token kind
    pub fn is_keyword(s: &str) -> Option<TokenKind> {
        match s {
            "let" => Some(TokenKind::Let),
            "const" => Some(TokenKind::Const),
            "var" => Some(TokenKind::Var),
            "function" => Some(TokenKind::Function),
            "return" => Some(TokenKind::Return),
            "throw" => Some(TokenKind::Throw),
            "if" => Some(TokenKind::If),
            "else" => Some(TokenKind::Else),
            "new" => Some(TokenKind::New),
            "true" => Some(TokenKind::True),
            "false" => Some(TokenKind::False),
            "null" => Some(TokenKind::Null),
            "undefined" => Some(TokenKind::Undefined),
            _ => None,
        }
    }

    /// Get the string representation of this token kind
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Number => "number",
            TokenKind::String => "string",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Null => "null",
            TokenKind::Undefined => "undefined",
            TokenKind::Identifier => "identifier",
            TokenKind::Let => "let",
            TokenKind::Const => "const",
            TokenKind::Var => "var",
            TokenKind::Function => "function",
            TokenKind::Return => "return",
            TokenKind::Throw => "throw",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::New => "new",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Bang => "!",
            TokenKind::EqualEqual => "==",
            TokenKind::EqualEqualEqual => "===",
            TokenKind::BangEqual => "!=",
            TokenKind::BangEqualEqual => "!==",
            TokenKind::Less => "<",
            TokenKind::LessEqual => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEqual => ">=",
            TokenKind::AmpAmp => "&&",
            TokenKind::PipePipe => "||",
            TokenKind::Equal => "=",
            TokenKind::Arrow => "=>",
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::LeftBrace => "{",
            TokenKind::RightBrace => "}",
            TokenKind::Semicolon => ";",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Eof => "EOF",
            TokenKind::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_creation() {
        let token = Token::new(TokenKind::Number, "42", Span::new(0, 2));
        assert_eq!(token.kind, TokenKind::Number);
        assert_eq!(token.lexeme, "42");
        assert_eq!(token.span, Span::new(0, 2));
    }

    #[test]
    fn test_keyword_detection() {
        assert_eq!(TokenKind::is_keyword("let"), Some(TokenKind::Let));
        assert_eq!(TokenKind::is_keyword("const"), Some(TokenKind::Const));
        assert_eq!(TokenKind::is_keyword("function"), Some(TokenKind::Function));
        assert_eq!(TokenKind::is_keyword("new"), Some(TokenKind::New));
        assert_eq!(TokenKind::is_keyword("throw"), Some(TokenKind::Throw));
        assert_eq!(
            TokenKind::is_keyword("undefined"),
            Some(TokenKind::Undefined)
        );
    }

    #[test]
    fn test_non_keyword() {
        assert_eq!(TokenKind::is_keyword("setTimeout"), None);
        assert_eq!(TokenKind::is_keyword("Promise"), None);
        assert_eq!(TokenKind::is_keyword("Let"), None); // Case-sensitive
    }

    #[test]
    fn test_token_kind_as_str() {
        assert_eq!(TokenKind::Arrow.as_str(), "=>");
        assert_eq!(TokenKind::EqualEqualEqual.as_str(), "===");
        assert_eq!(TokenKind::Dot.as_str(), ".");
    }
}
