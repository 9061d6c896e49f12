//! Module `scanner` implements a one-pass, streaming lexer for the Lox
//! grammar.
//!
//! It walks the raw bytes of a `&str` and yields `Token<'a>`s whose lexemes
//! borrow the original source, skipping whitespace and `//` comments and
//! emitting exactly one `EOF` token at the end.  Designed as a
//! `FusedIterator`, it can be chained safely with other iterator adapters.
//!
//! Lexical errors (unexpected characters, unterminated strings) are yielded
//! in-stream as `Err` items and scanning continues with the next byte, so a
//! single bad character does not hide the diagnostics for the rest of the
//! file.  The caller decides whether any error item means the pipeline must
//! stop before parsing.
//!
//! Byte-level scanning is safe here because every token boundary sits on an
//! ASCII byte; multi-byte characters can only occur inside string literals,
//! whose slice boundaries are the ASCII quotes.

use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile-time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static str, TokenType> = phf_map! {
    "and"    => TokenType::AND,
    "class"  => TokenType::CLASS,
    "else"   => TokenType::ELSE,
    "false"  => TokenType::FALSE,
    "fun"    => TokenType::FUN,
    "for"    => TokenType::FOR,
    "if"     => TokenType::IF,
    "nil"    => TokenType::NIL,
    "or"     => TokenType::OR,
    "print"  => TokenType::PRINT,
    "return" => TokenType::RETURN,
    "super"  => TokenType::SUPER,
    "this"   => TokenType::THIS,
    "true"   => TokenType::TRUE,
    "var"    => TokenType::VAR,
    "while"  => TokenType::WHILE,
};

/// A single pass **scanner / lexer** that converts source text into a
/// sequence of [`Token`]s.  The lifetime `'a` ties every emitted token's
/// `lexeme` slice back to the original source buffer.
pub struct Scanner<'a> {
    source: &'a str,
    bytes: &'a [u8],
    start: usize, // index of the *first* byte of the current lexeme
    curr: usize,  // index *one past* the last byte examined
    line: usize,  // 1-based line counter (\n increments)
    eof: bool,    // has the single EOF token been emitted?
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `source`.
    #[inline]
    pub fn new(source: &'a str) -> Self {
        info!("Scanner created over {} bytes", source.len());

        Self {
            source,
            bytes: source.as_bytes(),
            start: 0,
            curr: 0,
            line: 1,
            eof: false,
        }
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    /// Are we at (or past) the end of input?
    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.bytes.len()
    }

    /// Advance one byte and return it.  Callers guard with [`is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.bytes[self.curr];
        self.curr += 1;
        b
    }

    /// Peek at the current byte without consuming it.  Returns `0` past EOF
    /// to avoid branching at call-site.
    #[inline(always)]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.bytes[self.curr]
        }
    }

    /// Peek one byte beyond [`peek`].  Safe at EOF.
    #[inline(always)]
    fn peek_next(&self) -> u8 {
        if self.curr + 1 >= self.bytes.len() {
            0
        } else {
            self.bytes[self.curr + 1]
        }
    }

    /// Conditionally consume a byte **iff** it matches `expected`.
    /// Returns `true` on success so callers can branch inline.
    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Source slice of the lexeme scanned so far.
    #[inline(always)]
    fn lexeme(&self) -> &'a str {
        &self.source[self.start..self.curr]
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a *single* lexeme starting at `self.start`.  `Ok(Some(kind))` is
    /// a recognised token, `Ok(None)` means whitespace or a comment was
    /// skipped, `Err` is a lexical error at the current line.
    fn scan_token(&mut self) -> Result<Option<TokenType>> {
        let b = self.advance();

        let kind = match b {
            // ── single-character punctuators ──────────────────────────────
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,

            // ── one- or two-character operators ──────────────────────────
            b'!' => {
                if self.match_byte(b'=') {
                    TokenType::BANG_EQUAL
                } else {
                    TokenType::BANG
                }
            }

            b'=' => {
                if self.match_byte(b'=') {
                    TokenType::EQUAL_EQUAL
                } else {
                    TokenType::EQUAL
                }
            }

            b'<' => {
                if self.match_byte(b'=') {
                    TokenType::LESS_EQUAL
                } else {
                    TokenType::LESS
                }
            }

            b'>' => {
                if self.match_byte(b'=') {
                    TokenType::GREATER_EQUAL
                } else {
                    TokenType::GREATER
                }
            }

            // ── whitespace / newline ─────────────────────────────────────
            b' ' | b'\r' | b'\t' => return Ok(None),

            b'\n' => {
                self.line += 1; // track for diagnostics

                return Ok(None);
            }

            // ── comments (// … until newline) ────────────────────────────
            b'/' => {
                if self.match_byte(b'/') {
                    // Fast-forward to the next newline with memchr; the
                    // newline itself is left for the main loop so the line
                    // counter stays in one place.
                    match memchr(b'\n', &self.bytes[self.curr..]) {
                        Some(pos) => self.curr += pos,
                        None => self.curr = self.bytes.len(),
                    }

                    return Ok(None);
                }

                TokenType::SLASH
            }

            // ── string literal " … " ─────────────────────────────────────
            b'"' => return self.scan_string().map(Some),

            // ── number literal (digit-leading) ───────────────────────────
            b'0'..=b'9' => self.scan_number(),

            // ── identifiers / keywords (alpha or underscore-leading) ─────
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.scan_identifier(),

            // ── unexpected character ─────────────────────────────────────
            _ => {
                return Err(LoxError::lex(
                    self.line,
                    format!("Unexpected character '{}'.", b as char),
                ));
            }
        };

        Ok(Some(kind))
    }

    /// Scan a double-quoted string literal.
    ///
    /// `self.start` still points at the opening `"`; on success `self.curr`
    /// points **past** the closing `"`.  Embedded newlines are legal and
    /// advance the line counter.
    fn scan_string(&mut self) -> Result<TokenType> {
        while !self.is_at_end() && self.peek() != b'"' {
            if self.advance() == b'\n' {
                self.line += 1;
            }
        }

        if self.is_at_end() {
            return Err(LoxError::lex(self.line, "Unterminated string."));
        }

        self.advance(); // the closing quote

        // Literal value is the text strictly between the quotes.
        let value: &str = &self.source[self.start + 1..self.curr - 1];

        Ok(TokenType::STRING(value.to_owned()))
    }

    /// Scan a numeric literal (`123`, `3.14`).  A trailing `.` not followed
    /// by a digit is left unconsumed.
    fn scan_number(&mut self) -> TokenType {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance(); // consume "."

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        // Digits with at most one interior dot always parse.
        let n: f64 = self.lexeme().parse().unwrap_or_default();

        TokenType::NUMBER(n)
    }

    /// Scan an identifier and decide via the keyword table whether it is a
    /// **keyword** or a generic `IDENTIFIER` token.
    fn scan_identifier(&mut self) -> TokenType {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_'
        } {
            self.advance();
        }

        KEYWORDS
            .get(self.lexeme())
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // EOF guard: emit exactly one EOF token, then terminate.
            if self.is_at_end() {
                if self.eof {
                    return None;
                }

                self.eof = true;

                return Some(Ok(Token::new(TokenType::EOF, "", self.line)));
            }

            self.start = self.curr;

            match self.scan_token() {
                Err(e) => return Some(Err(e)),

                Ok(Some(kind)) => {
                    debug!("Scanned token ({:?}) on line {}", kind, self.line);

                    return Some(Ok(Token::new(kind, self.lexeme(), self.line)));
                }

                // Whitespace or comment: keep scanning.
                Ok(None) => {}
            }
        }
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
