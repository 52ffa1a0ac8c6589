// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Two-mode template lexer.
//!
//! Template text is scanned in **Html mode** until the open delimiter
//! (`<%` by default) is found; the text before it becomes one
//! [`TokenKind::Html`] token. The lexer then switches to **Script mode**,
//! having already located the matching close delimiter (`%>`), and produces
//! script tokens until it reaches that position.
//!
//! Errors never stop the lexer: an unclosed script region yields a single
//! [`TokenKind::ScriptNotClosed`] token followed by end of input, and
//! unknown characters yield [`TokenKind::Invalid`] tokens carrying the
//! offending text.
//!
//! # Pushback
//!
//! Exactly one token can be un-consumed with [`Lexer::push_back`]. Pushing
//! back twice in a row, or before any token was read, is a bug in the
//! caller and panics.

use crate::token::{Token, TokenKind};
use lazy_static::lazy_static;
use std::collections::HashMap;

/// Default script open delimiter.
pub const DEFAULT_OPEN: &str = "<%";
/// Default script close delimiter.
pub const DEFAULT_CLOSE: &str = "%>";

lazy_static! {
    static ref KEYWORDS: HashMap<&'static str, TokenKind> = {
        let mut m = HashMap::new();
        m.insert("include", TokenKind::Include);
        m.insert("content", TokenKind::Content);
        m.insert("extend", TokenKind::Extend);
        m.insert("block", TokenKind::Block);
        m.insert("if", TokenKind::If);
        m.insert("else", TokenKind::Else);
        m.insert("for", TokenKind::For);
        m.insert("in", TokenKind::In);
        m.insert("switch", TokenKind::Switch);
        m.insert("when", TokenKind::When);
        m.insert("end", TokenKind::End);
        m.insert("null", TokenKind::Null);
        m.insert("true", TokenKind::True);
        m.insert("false", TokenKind::False);
        m
    };

    static ref OPERATORS: HashMap<&'static str, TokenKind> = {
        use TokenKind::*;
        let table: &[(&str, TokenKind)] = &[
            ("@", At), (".", Dot), ("?.", QuestionDot), (",", Comma),
            ("{", LBrace), ("}", RBrace), ("[", LBracket), ("]", RBracket),
            ("(", LParen), (")", RParen),
            ("+", Add), ("-", Sub), ("*", Mul), ("/", Div), ("%", Mod),
            ("+=", AddAssign), ("-=", SubAssign), ("*=", MulAssign),
            ("/=", DivAssign), ("%=", ModAssign),
            ("++", Inc), ("--", Dec),
            ("=", Assign), ("==", Eq), ("===", Eq), ("!=", Ne), ("!==", Ne),
            ("<", Lt), ("<=", Le), (">", Gt), (">=", Ge),
            ("?", Question), (":", Colon), ("??", DoubleQuestion),
            ("!", Not), ("&&", And), ("||", Or),
            ("->", Arrow), ("=>", Arrow),
        ];
        table.iter().copied().collect()
    };

    /// Longest operator starting with a given character.
    static ref OPERATOR_MAX_LEN: HashMap<char, usize> = {
        let mut m: HashMap<char, usize> = HashMap::new();
        for op in OPERATORS.keys() {
            if let Some(first) = op.chars().next() {
                let len = m.entry(first).or_insert(0);
                *len = (*len).max(op.chars().count());
            }
        }
        m
    };
}

fn is_symbol(c: char) -> bool {
    OPERATORS.keys().any(|op| op.contains(c))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Html,
    Script,
}

/// Converts template text into [`Token`]s.
#[derive(Debug)]
pub struct Lexer<'src> {
    template_name: String,
    source: &'src str,
    open: String,
    close: String,
    mode: Mode,
    pos: usize,
    line: usize,
    column: usize,
    /// Byte offset just after the open delimiter of the current script.
    script_start: usize,
    /// Byte offset of the close delimiter of the current script.
    script_end: Option<usize>,
    /// Position of the open delimiter, for unclosed-script reports.
    script_open_at: (usize, usize),
    last: Option<Token>,
    pushed: Option<Token>,
}

impl<'src> Lexer<'src> {
    /// Creates a lexer using the default `<%` / `%>` delimiters.
    pub fn new(template_name: &str, source: &'src str) -> Self {
        Self::with_delimiters(template_name, source, DEFAULT_OPEN, DEFAULT_CLOSE)
    }

    /// Creates a lexer with custom delimiters.
    ///
    /// Both delimiters must be non-empty; [`Options::validate`](crate::Options::validate)
    /// enforces this before the engine constructs a lexer.
    pub fn with_delimiters(template_name: &str, source: &'src str, open: &str, close: &str) -> Self {
        Self {
            template_name: template_name.to_string(),
            source,
            open: open.to_string(),
            close: close.to_string(),
            mode: Mode::Html,
            pos: 0,
            line: 1,
            column: 1,
            script_start: 0,
            script_end: None,
            script_open_at: (1, 1),
            last: None,
            pushed: None,
        }
    }

    /// Name of the template being scanned.
    pub fn template_name(&self) -> &str {
        &self.template_name
    }

    /// The full source text.
    pub fn source(&self) -> &'src str {
        self.source
    }

    /// Current scan position as (line, column), both 1-indexed.
    pub fn position(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    /// Advances and returns the next token.
    pub fn next_token(&mut self) -> Token {
        let token = match self.pushed.take() {
            Some(token) => token,
            None => self.scan(),
        };
        tracing::trace!(
            "{}:{}:{} {}",
            self.template_name,
            token.line,
            token.column,
            token
        );
        self.last = Some(token.clone());
        token
    }

    /// Un-consumes the most recently returned token.
    ///
    /// # Panics
    ///
    /// Panics when called twice without an intervening [`next_token`](Self::next_token),
    /// or before any token was returned.
    pub fn push_back(&mut self) {
        assert!(
            self.pushed.is_none(),
            "lexer pushback slot already occupied"
        );
        let token = self
            .last
            .take()
            .unwrap_or_else(|| panic!("lexer pushback without a consumed token"));
        self.pushed = Some(token);
    }

    /// Returns the next token without consuming it.
    pub fn peek(&mut self) -> Token {
        let token = self.next_token();
        self.push_back();
        token
    }

    fn scan(&mut self) -> Token {
        loop {
            if self.mode == Mode::Html {
                return self.scan_html();
            }
            match self.scan_script() {
                Some(token) => return token,
                // Close delimiter reached, back in Html mode.
                None => continue,
            }
        }
    }

    fn scan_html(&mut self) -> Token {
        let (line, column) = (self.line, self.column);
        if self.pos >= self.source.len() {
            return Token::new(TokenKind::Eof, None, line, column);
        }
        let rest = &self.source[self.pos..];
        match rest.find(self.open.as_str()) {
            None => {
                let text = rest.to_string();
                self.advance_bytes(rest.len());
                Token::new(TokenKind::Html, Some(text), line, column)
            }
            Some(i) => {
                let text = rest[..i].to_string();
                self.advance_bytes(i);
                self.script_open_at = (self.line, self.column);
                self.advance_bytes(self.open.len());
                self.script_start = self.pos;
                self.script_end = self.source[self.pos..]
                    .find(self.close.as_str())
                    .map(|j| self.pos + j);
                self.mode = Mode::Script;
                Token::new(TokenKind::Html, Some(text), line, column)
            }
        }
    }

    /// Scans one script token; `None` means the script region ended.
    fn scan_script(&mut self) -> Option<Token> {
        let Some(end) = self.script_end else {
            let (line, column) = self.script_open_at;
            let message = format!(
                "script opened at line {}, column {} is not closed (missing '{}')",
                line, column, self.close
            );
            // Nothing after an unclosed script can be scanned reliably.
            self.advance_bytes(self.source.len() - self.pos);
            self.mode = Mode::Html;
            return Some(Token::new(TokenKind::ScriptNotClosed, Some(message), line, column));
        };

        if self.pos == self.script_start && self.pos < end {
            let (line, column) = (self.line, self.column);
            match self.peek_char() {
                Some('=') => {
                    self.bump();
                    return Some(Token::new(TokenKind::Escape, None, line, column));
                }
                Some('-') => {
                    self.bump();
                    return Some(Token::new(TokenKind::Unescape, None, line, column));
                }
                _ => {}
            }
        }

        while self.pos < end && self.peek_char().is_some_and(char::is_whitespace) {
            self.bump();
        }

        if self.pos >= end {
            self.advance_bytes(self.close.len());
            self.script_end = None;
            self.mode = Mode::Html;
            return None;
        }

        let (line, column) = (self.line, self.column);
        let c = self.peek_char()?;
        let token = if c == '\'' || c == '"' {
            self.scan_string(c, end, line, column)
        } else if c.is_ascii_digit() {
            self.scan_number(end, line, column)
        } else if c.is_alphabetic() {
            self.scan_ident(end, line, column)
        } else if is_symbol(c) {
            self.scan_operator(c, end, line, column)
        } else {
            self.bump();
            Token::new(TokenKind::Invalid, Some(c.to_string()), line, column)
        };
        Some(token)
    }

    fn scan_string(&mut self, quote: char, end: usize, line: usize, column: usize) -> Token {
        self.bump();
        let mut text = String::new();
        let mut escaping = false;
        while self.pos < end {
            let Some(c) = self.bump() else { break };
            if escaping {
                match c {
                    'n' => text.push('\n'),
                    'r' => text.push('\r'),
                    't' => text.push('\t'),
                    '0' => text.push('\0'),
                    '\\' => text.push('\\'),
                    c if c == quote => text.push(c),
                    _ => {}
                }
                escaping = false;
            } else if c == '\\' {
                escaping = true;
            } else if c == quote {
                return Token::new(TokenKind::String, Some(text), line, column);
            } else {
                text.push(c);
            }
        }
        Token::new(
            TokenKind::Invalid,
            Some(format!("{}{}", quote, text)),
            line,
            column,
        )
    }

    fn scan_number(&mut self, end: usize, line: usize, column: usize) -> Token {
        let start = self.pos;
        self.bump_while(end, |c| c.is_ascii_digit());
        let mut rest = self.source[self.pos..end].chars();
        if rest.next() == Some('.') && rest.next().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            self.bump_while(end, |c| c.is_ascii_digit());
        }
        let text = self.source[start..self.pos].to_string();
        Token::new(TokenKind::Number, Some(text), line, column)
    }

    fn scan_ident(&mut self, end: usize, line: usize, column: usize) -> Token {
        let start = self.pos;
        self.bump_while(end, char::is_alphanumeric);
        let text = &self.source[start..self.pos];
        match KEYWORDS.get(text) {
            Some(kind) => Token::new(*kind, Some(text.to_string()), line, column),
            None => Token::new(TokenKind::Ident, Some(text.to_string()), line, column),
        }
    }

    /// Maximal munch: take as many symbol characters as the longest
    /// operator starting with `first` allows, then shrink until a
    /// registered operator matches.
    fn scan_operator(&mut self, first: char, end: usize, line: usize, column: usize) -> Token {
        let max_len = OPERATOR_MAX_LEN.get(&first).copied().unwrap_or(1);
        let mut candidate: Vec<char> = self.source[self.pos..end]
            .chars()
            .take(max_len)
            .take_while(|c| is_symbol(*c))
            .collect();
        if candidate.is_empty() {
            candidate.push(first);
        }

        loop {
            let sym: String = candidate.iter().collect();
            if let Some(kind) = OPERATORS.get(sym.as_str()) {
                for _ in 0..candidate.len() {
                    self.bump();
                }
                return Token::new(*kind, None, line, column);
            }
            if candidate.len() == 1 {
                self.bump();
                return Token::new(TokenKind::Invalid, Some(sym), line, column);
            }
            candidate.pop();
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn bump_while(&mut self, end: usize, predicate: impl Fn(char) -> bool) {
        while self.pos < end && self.peek_char().is_some_and(&predicate) {
            self.bump();
        }
    }

    fn advance_bytes(&mut self, len: usize) {
        let target = (self.pos + len).min(self.source.len());
        while self.pos < target {
            if self.bump().is_none() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new("test", source);
        let mut out = Vec::new();
        loop {
            let t = lexer.next_token();
            out.push(t.kind);
            if t.kind == TokenKind::Eof {
                break;
            }
        }
        out
    }

    #[test]
    fn test_plain_text_is_one_html_token() {
        let mut lexer = Lexer::new("test", "Hello\nworld");
        let t = lexer.next_token();
        assert_eq!(t.kind, TokenKind::Html);
        assert_eq!(t.text(), "Hello\nworld");
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }

    #[test]
    fn test_escape_and_unescape_markers() {
        use TokenKind::*;
        assert_eq!(kinds("<%= x %>"), vec![Html, Escape, Ident, Eof]);
        assert_eq!(kinds("<%- x %>"), vec![Html, Unescape, Ident, Eof]);
        // Only directly after the delimiter.
        assert_eq!(kinds("<% -x %>"), vec![Html, Sub, Ident, Eof]);
    }

    #[test]
    fn test_keywords_and_literals() {
        use TokenKind::*;
        assert_eq!(
            kinds("<% for x in items %>a<% end %>"),
            vec![Html, For, Ident, In, Ident, Html, End, Eof]
        );
        assert_eq!(kinds("<% null true false %>"), vec![Html, Null, True, False, Eof]);
        // Case-sensitive keyword set.
        assert_eq!(kinds("<% If %>"), vec![Html, Ident, Eof]);
    }

    #[test]
    fn test_maximal_munch() {
        use TokenKind::*;
        assert_eq!(kinds("<% a === b %>"), vec![Html, Ident, Eq, Ident, Eof]);
        assert_eq!(kinds("<% a !== b %>"), vec![Html, Ident, Ne, Ident, Eof]);
        assert_eq!(kinds("<% a?.b %>"), vec![Html, Ident, QuestionDot, Ident, Eof]);
        assert_eq!(kinds("<% a ?? b %>"), vec![Html, Ident, DoubleQuestion, Ident, Eof]);
        assert_eq!(kinds("<% x++ %>"), vec![Html, Ident, Inc, Eof]);
        assert_eq!(kinds("<% (a) => 1 %>"), vec![Html, LParen, Ident, RParen, Arrow, Number, Eof]);
        // '+-' is not an operator: shrinks to '+' then scans '-'.
        assert_eq!(kinds("<% a+-b %>"), vec![Html, Ident, Add, Sub, Ident, Eof]);
    }

    #[test]
    fn test_operator_stops_at_close_delimiter() {
        use TokenKind::*;
        assert_eq!(kinds("<%a%>b"), vec![Html, Ident, Html, Eof]);
        assert_eq!(kinds("<% a %%>"), vec![Html, Ident, Mod, Eof]);
    }

    #[test]
    fn test_unmatched_symbol_is_invalid() {
        let mut lexer = Lexer::new("test", "<% a & b %>");
        lexer.next_token();
        lexer.next_token();
        let t = lexer.next_token();
        assert_eq!(t.kind, TokenKind::Invalid);
        assert_eq!(t.text(), "&");
        assert_eq!(lexer.next_token().kind, TokenKind::Ident);
    }

    #[test]
    fn test_string_escapes() {
        let mut lexer = Lexer::new("test", r#"<% "a\n\t\\\"b\q" 'it\'s' %>"#);
        lexer.next_token();
        assert_eq!(lexer.next_token().text(), "a\n\t\\\"b");
        assert_eq!(lexer.next_token().text(), "it's");
    }

    #[test]
    fn test_numbers() {
        let mut lexer = Lexer::new("test", "<% 42 3.14 7.x %>");
        lexer.next_token();
        assert_eq!(lexer.next_token().text(), "42");
        assert_eq!(lexer.next_token().text(), "3.14");
        assert_eq!(lexer.next_token().text(), "7");
        assert_eq!(lexer.next_token().kind, TokenKind::Dot);
    }

    #[test]
    fn test_unclosed_script() {
        use TokenKind::*;
        assert_eq!(kinds("<% if true"), vec![Html, ScriptNotClosed, Eof]);
        assert_eq!(kinds("abc<%"), vec![Html, ScriptNotClosed, Eof]);
    }

    #[test]
    fn test_positions_are_one_based_and_monotonic() {
        let mut lexer = Lexer::new("test", "ab\n<% foo %>\n<%= bar %>");
        let mut previous = (0, 0);
        loop {
            let t = lexer.next_token();
            assert!((t.line, t.column) >= previous);
            previous = (t.line, t.column);
            if t.kind == TokenKind::Ident && t.text() == "foo" {
                assert_eq!((t.line, t.column), (2, 4));
            }
            if t.kind == TokenKind::Ident && t.text() == "bar" {
                assert_eq!((t.line, t.column), (3, 5));
            }
            if t.kind == TokenKind::Eof {
                break;
            }
        }
    }

    #[test]
    fn test_custom_delimiters() {
        use TokenKind::*;
        let mut lexer = Lexer::with_delimiters("test", "a{{= x }}b", "{{", "}}");
        let mut out = Vec::new();
        loop {
            let t = lexer.next_token();
            out.push(t.kind);
            if t.kind == Eof {
                break;
            }
        }
        assert_eq!(out, vec![Html, Escape, Ident, Html, Eof]);
    }

    #[test]
    fn test_push_back_replays_token() {
        let mut lexer = Lexer::new("test", "<% a b %>");
        lexer.next_token();
        let a = lexer.next_token();
        lexer.push_back();
        assert_eq!(lexer.next_token(), a);
        assert_eq!(lexer.peek().text(), "b");
        assert_eq!(lexer.next_token().text(), "b");
    }

    #[test]
    #[should_panic(expected = "already occupied")]
    fn test_double_push_back_panics() {
        let mut lexer = Lexer::new("test", "<% a b %>");
        lexer.next_token();
        lexer.push_back();
        lexer.push_back();
    }

    #[test]
    #[should_panic(expected = "without a consumed token")]
    fn test_push_back_before_consume_panics() {
        let mut lexer = Lexer::new("test", "text");
        lexer.push_back();
    }
}
