// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Tokens produced by the [`Lexer`](crate::lexer::Lexer).

use std::fmt;

/// Kind of a lexical token.
///
/// Keyword and operator variants are named after what they spell; see
/// [`TokenKind::describe`].
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// End of input.
    Eof,
    /// A script region was opened but its close delimiter is missing.
    ScriptNotClosed,
    /// A character or operator sequence that is not part of the language.
    Invalid,
    /// Literal text outside script regions.
    Html,
    /// `=` right after the open delimiter.
    Escape,
    /// `-` right after the open delimiter.
    Unescape,

    Include,
    Content,
    Extend,
    Block,
    If,
    Else,
    For,
    In,
    Switch,
    When,
    End,

    Ident,
    Null,
    True,
    False,
    String,
    Number,

    At,
    Dot,
    QuestionDot,
    Comma,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    Inc,
    Dec,
    Assign,
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Question,
    DoubleQuestion,
    Colon,
    Not,
    And,
    Or,
    Arrow,
}

impl TokenKind {
    /// Returns true for the two lexer error kinds.
    pub fn is_error(self) -> bool {
        matches!(self, TokenKind::ScriptNotClosed | TokenKind::Invalid)
    }

    /// Source spelling of keywords and operators, used in error messages.
    pub fn describe(self) -> &'static str {
        use TokenKind::*;
        match self {
            Eof => "end of input",
            ScriptNotClosed => "unclosed script",
            Invalid => "invalid token",
            Html => "text",
            Escape => "'='",
            Unescape => "'-'",
            Include => "'include'",
            Content => "'content'",
            Extend => "'extend'",
            Block => "'block'",
            If => "'if'",
            Else => "'else'",
            For => "'for'",
            In => "'in'",
            Switch => "'switch'",
            When => "'when'",
            End => "'end'",
            Ident => "identifier",
            Null => "'null'",
            True => "'true'",
            False => "'false'",
            String => "string",
            Number => "number",
            At => "'@'",
            Dot => "'.'",
            QuestionDot => "'?.'",
            Comma => "','",
            LBrace => "'{'",
            RBrace => "'}'",
            LBracket => "'['",
            RBracket => "']'",
            LParen => "'('",
            RParen => "')'",
            Add => "'+'",
            Sub => "'-'",
            Mul => "'*'",
            Div => "'/'",
            Mod => "'%'",
            AddAssign => "'+='",
            SubAssign => "'-='",
            MulAssign => "'*='",
            DivAssign => "'/='",
            ModAssign => "'%='",
            Inc => "'++'",
            Dec => "'--'",
            Assign => "'='",
            Eq => "'=='",
            Ne => "'!='",
            Gt => "'>'",
            Lt => "'<'",
            Ge => "'>='",
            Le => "'<='",
            Question => "'?'",
            DoubleQuestion => "'??'",
            Colon => "':'",
            Not => "'!'",
            And => "'&&'",
            Or => "'||'",
            Arrow => "'->'",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// A token with its optional payload and 1-based source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// What kind of token this is.
    pub kind: TokenKind,
    /// Text of identifiers, strings, numbers, html and error tokens.
    pub value: Option<String>,
    /// Line of the first character (1-indexed).
    pub line: usize,
    /// Column of the first character (1-indexed).
    pub column: usize,
}

impl Token {
    pub(crate) fn new(kind: TokenKind, value: Option<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            value,
            line,
            column,
        }
    }

    /// The payload, or an empty string.
    pub fn text(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.value) {
            (
                kind @ (TokenKind::Ident | TokenKind::String | TokenKind::Number | TokenKind::Invalid),
                Some(v),
            ) => write!(f, "{} '{}'", kind, v),
            (kind, _) => write!(f, "{}", kind),
        }
    }
}
