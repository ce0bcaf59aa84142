//! `tokenize(source: bytes) -> sequence<Token>` (spec §4.1).
//!
//! A hand-rolled, indentation-sensitive lexer for the Python subset this
//! compiler accepts. Recognizes identifiers/keywords, numeric literals
//! (int, float, underscore-separated, hex/oct/bin), string literals
//! (single/triple, `f`/`r`/`b` prefixed), operators, delimiters, and
//! INDENT/DEDENT/NEWLINE tracking. Comments are dropped.

use crate::error::{CompileError, ErrorKind};
use crate::span::Span;
use crate::token::{Keyword, Token, TokenKind};
use std::iter::Peekable;
use std::str::Chars;

const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "->", ":=", "**", "//", "==", "!=", "<=", ">=", "<<", ">>",
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "+", "-", "*", "/", "%", "=", "<", ">", "&",
    "|", "^", "~", ".", ",", ":", ";", "@",
];

pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<Chars<'a>>,
    index: usize,
    tokens: Vec<Token>,
    /// Stack of indentation widths, innermost last; starts at `[0]`.
    indents: Vec<usize>,
    /// Nesting depth of `(`/`[`/`{` — newlines are insignificant inside.
    bracket_depth: usize,
    at_line_start: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().peekable(),
            index: 0,
            tokens: Vec::new(),
            indents: vec![0],
            bracket_depth: 0,
            at_line_start: true,
        }
    }

    pub fn tokenize(source: &'a str) -> Result<Vec<Token>, CompileError> {
        let mut lexer = Lexer::new(source);
        lexer.run()?;
        Ok(lexer.tokens)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn peek2(&self) -> Option<char> {
        let mut it = self.source[self.index..].chars();
        it.next();
        it.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.index += c.len_utf8();
        Some(c)
    }

    fn run(&mut self) -> Result<(), CompileError> {
        while self.index < self.source.len() {
            if self.at_line_start && self.bracket_depth == 0 {
                self.handle_indentation()?;
                if self.index >= self.source.len() {
                    break;
                }
            }
            self.skip_intraline_whitespace();
            match self.peek() {
                None => break,
                Some('\n') => {
                    self.bump();
                    if self.bracket_depth == 0 {
                        self.push(TokenKind::Newline, 1);
                        self.at_line_start = true;
                    }
                }
                Some('#') => self.skip_comment(),
                Some(c) if c.is_ascii_digit() => self.lex_number()?,
                Some(c) if is_ident_start(c) => self.lex_ident_or_string()?,
                Some('"') | Some('\'') => self.lex_string(None)?,
                Some(c) if "([{".contains(c) => {
                    self.bracket_depth += 1;
                    let start = self.index as u32;
                    self.bump();
                    self.push_at(TokenKind::Delim(c), start);
                }
                Some(c) if ")]}".contains(c) => {
                    self.bracket_depth = self.bracket_depth.saturating_sub(1);
                    let start = self.index as u32;
                    self.bump();
                    self.push_at(TokenKind::Delim(c), start);
                }
                Some(_) => self.lex_operator()?,
            }
        }

        // Emit trailing DEDENTs and a final NEWLINE/EOF.
        self.push(TokenKind::Newline, 0);
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokenKind::Dedent, 0);
        }
        self.push(TokenKind::Eof, 0);
        Ok(())
    }

    fn handle_indentation(&mut self) -> Result<(), CompileError> {
        loop {
            let line_start = self.index;
            let mut width = 0usize;
            loop {
                match self.peek() {
                    Some(' ') => {
                        width += 1;
                        self.bump();
                    }
                    Some('\t') => {
                        width += 8 - (width % 8);
                        self.bump();
                    }
                    _ => break,
                }
            }
            match self.peek() {
                // Blank line or comment-only line: doesn't affect indentation.
                Some('\n') => {
                    self.bump();
                    continue;
                }
                Some('#') => {
                    self.skip_comment();
                    if self.peek() == Some('\n') {
                        self.bump();
                    }
                    continue;
                }
                None => return Ok(()),
                _ => {}
            }
            let current = *self.indents.last().expect("indents never empty");
            if width > current {
                self.indents.push(width);
                self.push_at(TokenKind::Indent, line_start as u32);
            } else if width < current {
                while *self.indents.last().expect("indents never empty") > width {
                    self.indents.pop();
                    self.push_at(TokenKind::Dedent, line_start as u32);
                }
                if *self.indents.last().expect("indents never empty") != width {
                    return Err(CompileError::at(
                        ErrorKind::LexError("inconsistent indentation".into()),
                        Span::new(line_start as u32, self.index as u32),
                    ));
                }
            }
            self.at_line_start = false;
            return Ok(());
        }
    }

    fn skip_intraline_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ') | Some('\t') | Some('\r')) {
            self.bump();
        }
        // A backslash-newline continues the logical line.
        if self.peek() == Some('\\') && self.peek2() == Some('\n') {
            self.bump();
            self.bump();
            self.skip_intraline_whitespace();
        }
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn lex_number(&mut self) -> Result<(), CompileError> {
        let start = self.index;
        if self.peek() == Some('0') && matches!(self.peek2(), Some('x' | 'X' | 'o' | 'O' | 'b' | 'B'))
        {
            self.bump();
            let radix_char = self.bump().unwrap();
            let radix = match radix_char {
                'x' | 'X' => 16,
                'o' | 'O' => 8,
                _ => 2,
            };
            let digits_start = self.index;
            while matches!(self.peek(), Some(c) if c.is_digit(radix) || c == '_') {
                self.bump();
            }
            let digits: String = self.source[digits_start..self.index]
                .chars()
                .filter(|c| *c != '_')
                .collect();
            let value = i64::from_str_radix(&digits, radix).map_err(|_| {
                CompileError::at(
                    ErrorKind::LexError("malformed numeric literal".into()),
                    Span::new(start as u32, self.index as u32),
                )
            })?;
            self.push_at(TokenKind::Int(value), start as u32);
            return Ok(());
        }

        let mut is_float = false;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '_') {
            self.bump();
        }
        if self.peek() == Some('.') && matches!(self.peek2(), Some(c) if c.is_ascii_digit()) {
            is_float = true;
            self.bump();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '_') {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            is_float = true;
            self.bump();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.bump();
            }
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.bump();
            }
        }
        let text: String = self.source[start..self.index]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        if is_float {
            let value: f64 = text.parse().map_err(|_| {
                CompileError::at(
                    ErrorKind::LexError("malformed float literal".into()),
                    Span::new(start as u32, self.index as u32),
                )
            })?;
            self.push_at(TokenKind::Float(value), start as u32);
        } else {
            let value: i64 = text.parse().map_err(|_| {
                CompileError::at(
                    ErrorKind::LexError("malformed integer literal".into()),
                    Span::new(start as u32, self.index as u32),
                )
            })?;
            self.push_at(TokenKind::Int(value), start as u32);
        }
        Ok(())
    }

    fn lex_ident_or_string(&mut self) -> Result<(), CompileError> {
        let start = self.index;
        // String prefix: f, r, b, fr, rb, etc. (case-insensitive, 1-2 chars).
        if matches!(self.peek(), Some('f' | 'F' | 'r' | 'R' | 'b' | 'B'))
            && self.is_string_prefix()
        {
            let prefix_start = self.index;
            self.bump();
            if matches!(self.peek(), Some('f' | 'F' | 'r' | 'R' | 'b' | 'B'))
                && matches!(self.peek2(), Some('"') | Some('\''))
            {
                self.bump();
            }
            let prefix: String = self.source[prefix_start..self.index].to_lowercase();
            return self.lex_string(Some((prefix, prefix_start)));
        }

        while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
            self.bump();
        }
        let text = &self.source[start..self.index];
        let kind = match text {
            "True" => TokenKind::Bool(true),
            "False" => TokenKind::Bool(false),
            "None" => TokenKind::None,
            _ => match Keyword::from_ident(text) {
                Some(kw) => TokenKind::Keyword(kw),
                None => TokenKind::Ident(text.to_string()),
            },
        };
        self.push_at(kind, start as u32);
        Ok(())
    }

    fn is_string_prefix(&self) -> bool {
        let mut it = self.source[self.index..].chars();
        match it.next() {
            Some(c) if matches!(c, 'f' | 'F' | 'r' | 'R' | 'b' | 'B') => {}
            _ => return false,
        }
        match it.next() {
            Some('"') | Some('\'') => true,
            Some(c) if matches!(c, 'f' | 'F' | 'r' | 'R' | 'b' | 'B') => {
                matches!(it.next(), Some('"') | Some('\''))
            }
            _ => false,
        }
    }

    fn lex_string(&mut self, prefix: Option<(String, usize)>) -> Result<(), CompileError> {
        let start = prefix.as_ref().map_or(self.index, |(_, s)| *s);
        let prefix_str = prefix.map(|(p, _)| p).unwrap_or_default();
        let quote = self.bump().expect("caller checked a quote follows");
        let triple = self.peek() == Some(quote) && self.peek2() == Some(quote);
        if triple {
            self.bump();
            self.bump();
        }
        let body_start = self.index;
        loop {
            match self.peek() {
                None => {
                    return Err(CompileError::at(
                        ErrorKind::LexError("unterminated string literal".into()),
                        Span::new(start as u32, self.index as u32),
                    ))
                }
                Some('\\') if !prefix_str.contains('r') => {
                    self.bump();
                    self.bump();
                }
                Some(c) if c == quote => {
                    if !triple {
                        break;
                    }
                    let save = self.index;
                    self.bump();
                    if self.peek() == Some(quote) && self.peek2() == Some(quote) {
                        self.bump();
                        self.bump();
                        break;
                    }
                    // two stray quote chars inside a triple-string are fine
                    let _ = save;
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
        let body_end = if triple { self.index - 3 } else { self.index - 1 };
        let literal = self.source[body_start..body_end].to_string();
        if !triple {
            self.bump_consumed_closing_quote(quote);
        }
        let kind = if prefix_str.contains('f') {
            TokenKind::FString(literal)
        } else {
            TokenKind::Str(literal)
        };
        self.push_at(kind, start as u32);
        Ok(())
    }

    // The closing quote for a non-triple string was already consumed by
    // the loop above (the `break` happens before bumping); this helper
    // keeps that bump in one obviously-named place.
    fn bump_consumed_closing_quote(&mut self, quote: char) {
        if self.peek() == Some(quote) {
            self.bump();
        }
    }

    fn lex_operator(&mut self) -> Result<(), CompileError> {
        let start = self.index;
        let remaining = &self.source[self.index..];
        for op in OPERATORS {
            if remaining.starts_with(op) {
                for _ in 0..op.chars().count() {
                    self.bump();
                }
                self.push_at(TokenKind::Op(op), start as u32);
                return Ok(());
            }
        }
        let bad = self.bump().unwrap();
        let _ = bad;
        self.push_at(TokenKind::Invalid, start as u32);
        Ok(())
    }

    fn push(&mut self, kind: TokenKind, width: u32) {
        let end = self.index as u32;
        let start = end.saturating_sub(width);
        self.tokens.push(Token::new(kind, Span::new(start, end)));
    }

    fn push_at(&mut self, kind: TokenKind, start: u32) {
        self.tokens
            .push(Token::new(kind, Span::new(start, self.index as u32)));
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::tokenize(src)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_simple_assignment() {
        let ks = kinds("x = 2 + 3 * 4\n");
        assert!(matches!(ks[0], TokenKind::Ident(ref s) if s == "x"));
        assert!(matches!(ks[1], TokenKind::Op("=")));
        assert!(matches!(ks[2], TokenKind::Int(2)));
    }

    #[test]
    fn tracks_indent_dedent() {
        let ks = kinds("if x:\n    y = 1\nz = 2\n");
        assert!(ks.contains(&TokenKind::Indent));
        assert!(ks.contains(&TokenKind::Dedent));
    }

    #[test]
    fn lexes_hex_oct_bin_and_underscored_literals() {
        let ks = kinds("0x1F 0o17 0b101 1_000_000\n");
        assert_eq!(ks[0], TokenKind::Int(31));
        assert_eq!(ks[1], TokenKind::Int(15));
        assert_eq!(ks[2], TokenKind::Int(5));
        assert_eq!(ks[3], TokenKind::Int(1_000_000));
    }

    #[test]
    fn lexes_prefixed_and_triple_strings() {
        let ks = kinds("f\"hi {x}\" r'\\raw' '''multi\nline'''\n");
        assert!(matches!(ks[0], TokenKind::FString(_)));
        assert!(matches!(ks[1], TokenKind::Str(ref s) if s == "\\raw"));
        assert!(matches!(ks[2], TokenKind::Str(ref s) if s == "multi\nline"));
    }

    #[test]
    fn unterminated_string_is_a_lex_error() {
        let err = Lexer::tokenize("x = 'oops\n").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::LexError(_)));
    }

    #[test]
    fn inconsistent_indentation_is_a_lex_error() {
        let err = Lexer::tokenize("if x:\n    y = 1\n  z = 2\n").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::LexError(_)));
    }
}
