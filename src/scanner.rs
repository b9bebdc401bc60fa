//! Module `scanner` implements a one-pass, streaming lexer for the Yellow
//! language.
//!
//! It transforms a byte slice (`&[u8]`) into a sequence of owned [`Token`]s,
//! skipping whitespace and comments, and emitting exactly one `EOF` token at
//! the end.  Designed as a `FusedIterator`, it can be chained safely with
//! other iterator adapters.
//!
//! Each `.next()` yields `Result<Token, YellowError>`: `Ok(token)` for a
//! scanned token, `Err` for a lexing error with line information.  Errors do
//! not stop the scan; the bad byte is skipped and lexing continues, so a
//! single pass surfaces every lexical error in the input.
//!
//! Recognized lexemes:
//!
//! - Single-character punctuators `( ) { } , . - + ; *`.
//! - One-or-two-character operators `! != = == < <= > >=`.
//! - `//` comments to end of line (skipped in bulk via `memchr`).
//! - String literals `" ... "`, multi-line allowed; an unterminated string is
//!   an error and the partial token is discarded.
//! - Number literals `digits(.digits)?`, parsed as `f64`.
//! - Identifiers `[A-Za-z_][A-Za-z0-9_]*`, with keywords resolved through a
//!   compile-time perfect-hash `KEYWORDS` map.

use crate::error::{Result, YellowError};
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile-time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"    => TokenType::AND,
    b"class"  => TokenType::CLASS,
    b"else"   => TokenType::ELSE,
    b"false"  => TokenType::FALSE,
    b"fun"    => TokenType::FUN,
    b"for"    => TokenType::FOR,
    b"if"     => TokenType::IF,
    b"nil"    => TokenType::NIL,
    b"or"     => TokenType::OR,
    b"print"  => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super"  => TokenType::SUPER,
    b"this"   => TokenType::THIS,
    b"true"   => TokenType::TRUE,
    b"var"    => TokenType::VAR,
    b"while"  => TokenType::WHILE,
};

/// A single-pass **scanner / lexer** that converts raw UTF-8 bytes into a
/// sequence of [`Token`]s.
pub struct Scanner<'a> {
    src: &'a [u8], // entire source text
    start: usize,  // index of the *first* byte of the current lexeme
    curr: usize,   // index *one past* the last byte examined
    line: usize,   // 1-based line counter (\n increments)
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `src`.
    #[inline]
    pub fn new(src: &'a [u8]) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            start: 0,
            curr: 0,
            line: 1,
        }
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    #[inline(always)]
    const fn len(&self) -> usize {
        self.src.len()
    }

    /// Are we at (or past) the end of input?
    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.len()
    }

    /// Advance one byte and return it.  Callers always guard with
    /// [`Self::is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.src[self.curr];
        self.curr += 1;
        b
    }

    /// Peek at the current byte without consuming it.  Returns `0` if past
    /// EOF to avoid branching at call-site.
    #[inline(always)]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.src[self.curr]
        }
    }

    /// Peek one byte beyond [`Self::peek`].  Safe at EOF.
    #[inline(always)]
    fn peek_next(&self) -> u8 {
        if self.curr + 1 >= self.len() {
            0
        } else {
            self.src[self.curr + 1]
        }
    }

    /// Conditionally consume a byte **iff** it matches `expected`.
    /// Returns `true` on success so callers can branch inline without an else.
    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    /// The current lexeme, `src[start..curr]`.
    #[inline(always)]
    fn lexeme(&self) -> &'a str {
        let slice: &[u8] = &self.src[self.start..self.curr];

        // SAFETY: the source is valid UTF-8 (guaranteed by the caller) and
        // start/curr always sit on ASCII delimiter boundaries when a token is
        // emitted.
        unsafe { std::str::from_utf8_unchecked(slice) }
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a *single* lexeme starting at `self.curr`.  Returns the kind of
    /// the recognized token, or `None` for whitespace and comments.
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

            // ── two-character operators (!=, ==, <=, >=) ─────────────────
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
            b' ' | b'\r' | b'\t' => {
                return Ok(None);
            }

            b'\n' => {
                self.line += 1; // track for diagnostics

                return Ok(None);
            }

            // ── comments (// ... until newline) ──────────────────────────
            b'/' => {
                if self.match_byte(b'/') {
                    // Fast-forward to the next newline with memchr; if none
                    // is found, skip to EOF.
                    if let Some(pos) = memchr(b'\n', &self.src[self.curr..]) {
                        self.curr += pos;
                    } else {
                        self.curr = self.len();
                    }

                    return Ok(None);
                }

                TokenType::SLASH
            }

            // ── string literal " ... " ───────────────────────────────────
            b'"' => return self.scan_string().map(Some),

            // ── number literal (digit-leading) ───────────────────────────
            b'0'..=b'9' => self.scan_number(),

            // ── identifiers / keywords (alpha or underscore-leading) ─────
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.scan_identifier(),

            // ── unexpected character ─────────────────────────────────────
            _ => {
                return Err(YellowError::lex(
                    self.line,
                    format!("Unexpected character: {}", b as char),
                ));
            }
        };

        Ok(Some(kind))
    }

    /// Scan a double-quoted string literal.
    ///
    /// * `self.start` still points to the opening `"`.
    /// * On success, `self.curr` points **past** the closing `"`.
    fn scan_string(&mut self) -> Result<TokenType> {
        while !self.is_at_end() && self.peek() != b'"' {
            if self.advance() == b'\n' {
                self.line += 1; // multi-line strings are allowed
            }
        }

        if self.is_at_end() {
            return Err(YellowError::lex(self.line, "Unterminated string."));
        }

        self.advance(); // consume closing quote

        // Slice excluding the surrounding quotes.
        let slice: &[u8] = &self.src[self.start + 1..self.curr - 1];

        // SAFETY: the source is valid UTF-8 and both endpoints sit on the
        // ASCII quote delimiters.
        let s: &str = unsafe { std::str::from_utf8_unchecked(slice) };

        Ok(TokenType::STRING(s.to_owned()))
    }

    /// Scan a numeric literal (`123`, `3.14`).  Fractions are optional.
    fn scan_number(&mut self) -> TokenType {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // Optional fractional part: a '.' counts only when a digit follows.
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance(); // consume "."

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let n: f64 = self.lexeme().parse::<f64>().unwrap_or(0.0); // digits checked above

        TokenType::NUMBER(n)
    }

    /// Scan an identifier and decide if it is a **keyword** or a generic
    /// `IDENTIFIER` token.
    fn scan_identifier(&mut self) -> TokenType {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_'
        } {
            self.advance();
        }

        KEYWORDS
            .get(&self.src[self.start..self.curr])
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        // Loop until we either emit a token, hit EOF, or see an error.
        while self.curr <= self.len() {
            // 1. EOF guard: emit exactly one EOF, then terminate.
            if self.curr == self.len() {
                self.curr += 1; // ensure fused semantics
                return Some(Ok(Token::new(TokenType::EOF, "", self.line)));
            }

            // 2. Reset per-token state and scan.
            self.start = self.curr;

            match self.scan_token() {
                Err(e) => return Some(Err(e)),

                Ok(Some(tt)) => {
                    debug!("Scanned token ({:?}) on line {}", tt, self.line);

                    return Some(Ok(Token::new(tt, self.lexeme(), self.line)));
                }

                // Whitespace / comment: keep scanning.
                Ok(None) => {}
            }
        }

        None // already yielded EOF
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
