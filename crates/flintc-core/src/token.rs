//! Token kinds for the Flint language.
//!
//! The `logos` patterns cover everything that appears *within* a line; the
//! lexer's per-line pre-pass manufactures `Indent` and `Eol` tokens, which is
//! why their patterns almost never fire directly.

use logos::Logos;
use serde::Serialize;

/// Kind of a single lexed token.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[logos(skip r"[ ]+")]
#[logos(skip(r"//[^\n]*", allow_greedy = true))]
pub enum TokenKind {
    // Definition keywords
    #[token("def")]
    Def,
    #[token("data")]
    Data,
    #[token("func")]
    Func,
    #[token("entity")]
    Entity,
    #[token("enum")]
    Enum,
    #[token("error")]
    Error,
    #[token("variant")]
    Variant,
    #[token("use")]
    Use,
    #[token("requires")]
    Requires,
    #[token("link")]
    Link,

    // Statement keywords
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("return")]
    Return,
    #[token("throw")]
    Throw,
    #[token("catch")]
    Catch,

    // Modifiers
    #[token("const")]
    Const,
    #[token("shared")]
    Shared,
    #[token("immutable")]
    Immutable,
    #[token("aligned")]
    Aligned,

    // Type keywords. `flint` doubles as the float type name and the root of
    // `use flint.*` import paths.
    #[token("int")]
    TypeInt,
    #[token("flint")]
    Flint,
    #[token("str")]
    TypeStr,
    #[token("bool")]
    TypeBool,
    #[token("char")]
    TypeChar,
    #[token("void")]
    TypeVoid,

    // Literals
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[regex(r"[0-9]+\.[0-9]+")]
    FlintValue,
    #[regex(r"[0-9]+")]
    IntValue,
    #[regex(r#""[^"\n]*""#)]
    StrValue,
    #[regex(r"'[^'\n]'")]
    CharValue,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,

    // Operators and punctuation
    #[token("->")]
    Arrow,
    #[token(":=")]
    ColonEqual,
    #[token("==")]
    EqualEqual,
    #[token("!=")]
    NotEqual,
    #[token("<=")]
    LessEqual,
    #[token(">=")]
    GreaterEqual,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("=")]
    Equal,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Mult,
    #[token("/")]
    Div,
    #[token("%")]
    Mod,
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("|")]
    Pipe,
    #[token("?")]
    Question,

    // Layout tokens, produced by the lexer's line pre-pass.
    #[token("\t")]
    Indent,
    #[token("\n")]
    Eol,
}

impl TokenKind {
    /// Whether this kind starts a primitive type.
    pub fn is_primitive_type(self) -> bool {
        matches!(
            self,
            Self::TypeInt
                | Self::Flint
                | Self::TypeStr
                | Self::TypeBool
                | Self::TypeChar
                | Self::TypeVoid
        )
    }

    /// Whether this kind can be the binary operator of an expression.
    pub fn is_binary_operator(self) -> bool {
        matches!(
            self,
            Self::Plus
                | Self::Minus
                | Self::Mult
                | Self::Div
                | Self::Mod
                | Self::Less
                | Self::Greater
                | Self::LessEqual
                | Self::GreaterEqual
                | Self::EqualEqual
                | Self::NotEqual
        )
    }

    /// Binding strength for the two-operator split in expression parsing.
    /// Higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            Self::Mult | Self::Div | Self::Mod => 5,
            Self::Plus | Self::Minus => 4,
            Self::Less | Self::Greater | Self::LessEqual | Self::GreaterEqual => 3,
            Self::EqualEqual | Self::NotEqual => 2,
            _ => 0,
        }
    }

    /// Whether this kind is a literal value.
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            Self::IntValue
                | Self::FlintValue
                | Self::StrValue
                | Self::CharValue
                | Self::True
                | Self::False
        )
    }
}

/// A single token: kind, the lexeme it was scanned from, and its position.
///
/// Lexemes are owned copies; nothing downstream keeps references into the
/// source buffer. Lines and columns are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: u32,
    pub column: u32,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            line,
            column,
        }
    }
}
