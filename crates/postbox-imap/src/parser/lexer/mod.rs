//! IMAP lexer over a blocking byte stream.
//!
//! [`ImapStream`] pulls bytes from the connection on demand and hands out one
//! [`Token`] at a time. Literal payloads are read by length, so a literal may
//! hold CRLF or parentheses without confusing the line structure.

#![allow(clippy::missing_errors_doc)]

mod token;

pub use token::Token;

use std::io::{ErrorKind, Read, Write};

use bytes::{Buf, BytesMut};
use tracing::{error, trace};

use crate::engine::{Connection, EngineConfig};
use crate::{Error, Result};

/// Tokenizing reader/writer wrapped around a [`Connection`].
pub struct ImapStream {
    conn: Connection,
    buf: BytesMut,
    position: u64,
    line_len: usize,
    lines: u64,
    unget: Option<Token>,
    max_line_length: usize,
    max_literal_size: usize,
    read_size: usize,
}

impl std::fmt::Debug for ImapStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapStream")
            .field("position", &self.position)
            .field("buffered", &self.buf.len())
            .field("unget", &self.unget)
            .finish_non_exhaustive()
    }
}

impl ImapStream {
    /// Wraps a connection, taking buffer sizes and limits from `config`.
    #[must_use]
    pub fn new(conn: Connection, config: &EngineConfig) -> Self {
        Self {
            conn,
            buf: BytesMut::with_capacity(config.read_buffer_size),
            position: 0,
            line_len: 0,
            lines: 0,
            unget: None,
            max_line_length: config.max_line_length,
            max_literal_size: config.max_literal_size,
            read_size: config.read_buffer_size.max(1),
        }
    }

    /// Number of bytes consumed from the connection so far.
    #[must_use]
    pub const fn position(&self) -> u64 {
        self.position
    }

    /// Number of response lines whose end has been consumed.
    #[must_use]
    pub const fn lines(&self) -> u64 {
        self.lines
    }

    /// Reads the next token, skipping spaces.
    pub fn next_token(&mut self) -> Result<Token> {
        let token = match self.unget.take() {
            Some(token) => token,
            None => {
                let token = self.lex()?;
                trace!(?token, "lexed");
                token
            }
        };
        if token == Token::Eol {
            self.lines += 1;
        }
        Ok(token)
    }

    /// Pushes one token back. Only a single token of lookahead is kept.
    pub fn unget_token(&mut self, token: Token) {
        debug_assert!(self.unget.is_none(), "unget slot already occupied");
        if token == Token::Eol {
            self.lines = self.lines.saturating_sub(1);
        }
        self.unget = Some(token);
    }

    /// Returns the next token without consuming it.
    pub fn peek_token(&mut self) -> Result<&Token> {
        let token = match self.unget.take() {
            Some(token) => token,
            None => self.lex()?,
        };
        Ok(self.unget.insert(token))
    }

    /// Consumes an end of line, failing on anything else.
    pub fn expect_eol(&mut self) -> Result<()> {
        match self.next_token()? {
            Token::Eol => Ok(()),
            token => Err(self.mismatch("end of line", token)),
        }
    }

    /// Consumes a specific structural token.
    pub fn expect(&mut self, expected: &Token) -> Result<()> {
        let token = self.next_token()?;
        if &token == expected {
            Ok(())
        } else {
            Err(self.mismatch(format!("{expected:?}"), token))
        }
    }

    /// Reads a number.
    pub fn read_number(&mut self) -> Result<u32> {
        match self.next_token()? {
            Token::Number(n) => Ok(n),
            token => Err(self.mismatch("number", token)),
        }
    }

    /// Reads a 64-bit number. Values above `u32::MAX` arrive as atoms.
    pub fn read_number64(&mut self) -> Result<u64> {
        match self.next_token()? {
            Token::Number(n) => Ok(u64::from(n)),
            Token::Atom(s) => match s.parse() {
                Ok(n) => Ok(n),
                Err(_) => Err(self.mismatch("number", Token::Atom(s))),
            },
            token => Err(self.mismatch("number", token)),
        }
    }

    /// Reads an atom.
    pub fn read_atom(&mut self) -> Result<String> {
        match self.next_token()? {
            Token::Atom(s) => Ok(s),
            token => Err(self.mismatch("atom", token)),
        }
    }

    /// Reads an astring (atom, quoted string or literal). A bare number is
    /// accepted as its decimal text.
    pub fn read_astring(&mut self) -> Result<String> {
        match self.next_token()? {
            Token::Atom(s) | Token::QString(s) => Ok(s),
            Token::Literal(data) => Ok(String::from_utf8_lossy(&data).into_owned()),
            Token::Number(n) => Ok(n.to_string()),
            token => Err(self.mismatch("astring", token)),
        }
    }

    /// Reads an nstring (NIL or string).
    pub fn read_nstring(&mut self) -> Result<Option<String>> {
        match self.next_token()? {
            Token::Nil => Ok(None),
            Token::QString(s) => Ok(Some(s)),
            Token::Literal(data) => Ok(Some(String::from_utf8_lossy(&data).into_owned())),
            token => Err(self.mismatch("nstring", token)),
        }
    }

    /// Reads the remaining text of the current line and consumes its end.
    ///
    /// Leading spaces are dropped. A pushed-back token is rendered in front.
    pub fn read_line(&mut self) -> Result<String> {
        let mut text = String::new();
        if let Some(token) = self.unget.take() {
            if token == Token::Eol {
                self.lines += 1;
                return Ok(text);
            }
            if token == Token::NoData {
                return Ok(text);
            }
            text.push_str(&token.text());
        }
        while self.peek_raw()? == Some(b' ') && text.is_empty() {
            self.bump();
        }
        let mut raw = Vec::new();
        loop {
            match self.peek_raw()? {
                None => break,
                Some(b'\n') => {
                    self.bump();
                    self.line_len = 0;
                    self.lines += 1;
                    break;
                }
                Some(b'\r') => {
                    self.bump();
                    if self.peek_raw()? == Some(b'\n') {
                        self.bump();
                    }
                    self.line_len = 0;
                    self.lines += 1;
                    break;
                }
                Some(b) => {
                    raw.push(b);
                    self.bump();
                    self.check_line_length()?;
                }
            }
        }
        text.push_str(&String::from_utf8_lossy(&raw));
        Ok(text)
    }

    /// Discards tokens through the end of the current line.
    ///
    /// Literals are skipped by length, so an embedded CRLF does not end the
    /// line early.
    pub fn skip_line(&mut self) -> Result<()> {
        loop {
            match self.next_token()? {
                Token::Eol | Token::NoData => return Ok(()),
                token => trace!(?token, "skipped"),
            }
        }
    }

    /// Writes bytes to the connection.
    pub fn write_all(&mut self, data: &[u8]) -> Result<()> {
        trace!(len = data.len(), "write");
        self.conn.write_all(data)?;
        Ok(())
    }

    /// Flushes the connection.
    pub fn flush(&mut self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }

    fn lex(&mut self) -> Result<Token> {
        while self.peek_raw()? == Some(b' ') {
            self.bump();
        }
        let Some(byte) = self.peek_raw()? else {
            return Ok(Token::NoData);
        };

        match byte {
            b'\r' => {
                self.bump();
                if self.peek_raw()? == Some(b'\n') {
                    self.bump();
                    self.line_len = 0;
                    Ok(Token::Eol)
                } else {
                    Err(self.framing("expected LF after CR"))
                }
            }
            b'\n' => {
                self.bump();
                self.line_len = 0;
                Ok(Token::Eol)
            }
            b'(' => self.single(Token::LParen),
            b')' => self.single(Token::RParen),
            b'[' => self.single(Token::LBracket),
            b']' => self.single(Token::RBracket),
            b'*' => self.single(Token::Asterisk),
            b'+' => self.single(Token::Plus),
            b'"' => self.read_quoted(),
            b'{' => self.read_literal(),
            b'\\' => self.read_flag(),
            _ if is_atom_char(byte) => self.read_atom_or_number(),
            _ => Err(self.framing(&format!("unexpected byte {byte:#04x}"))),
        }
    }

    fn single(&mut self, token: Token) -> Result<Token> {
        self.bump();
        self.check_line_length()?;
        Ok(token)
    }

    fn read_quoted(&mut self) -> Result<Token> {
        self.bump();
        let mut raw = Vec::new();
        loop {
            match self.peek_raw()? {
                Some(b'"') => {
                    self.bump();
                    break;
                }
                Some(b'\\') => {
                    self.bump();
                    match self.peek_raw()? {
                        Some(b'\r' | b'\n') | None => {
                            return Err(self.framing("unterminated quoted string"));
                        }
                        Some(b) => {
                            raw.push(b);
                            self.bump();
                        }
                    }
                }
                Some(b'\r' | b'\n') | None => {
                    return Err(self.framing("unterminated quoted string"));
                }
                Some(b) => {
                    raw.push(b);
                    self.bump();
                }
            }
            self.check_line_length()?;
        }
        Ok(Token::QString(String::from_utf8_lossy(&raw).into_owned()))
    }

    fn read_literal(&mut self) -> Result<Token> {
        self.bump();
        let mut size: usize = 0;
        let mut digits = 0;
        while let Some(b @ b'0'..=b'9') = self.peek_raw()? {
            size = size
                .checked_mul(10)
                .and_then(|s| s.checked_add(usize::from(b - b'0')))
                .ok_or_else(|| self.framing("literal length overflow"))?;
            digits += 1;
            self.bump();
        }
        if self.peek_raw()? == Some(b'+') {
            self.bump();
        }
        if digits == 0 || self.peek_raw()? != Some(b'}') {
            return Err(self.framing("malformed literal length"));
        }
        self.bump();
        match self.peek_raw()? {
            Some(b'\r') => {
                self.bump();
                if self.peek_raw()? != Some(b'\n') {
                    return Err(self.framing("expected CRLF after literal length"));
                }
                self.bump();
            }
            Some(b'\n') => self.bump(),
            _ => return Err(self.framing("expected CRLF after literal length")),
        }
        if size > self.max_literal_size {
            return Err(self.framing(&format!(
                "literal of {size} bytes exceeds limit of {}",
                self.max_literal_size
            )));
        }

        while self.buf.len() < size {
            if !self.fill()? {
                return Err(self.framing("stream ended inside literal"));
            }
        }
        let data = self.buf.split_to(size).freeze();
        self.position += size as u64;
        Ok(Token::Literal(data))
    }

    fn read_flag(&mut self) -> Result<Token> {
        self.bump();
        let mut name = String::from("\\");
        if self.peek_raw()? == Some(b'*') {
            self.bump();
            name.push('*');
            return Ok(Token::Flag(name));
        }
        let raw = self.take_atom_bytes()?;
        name.push_str(&String::from_utf8_lossy(&raw));
        Ok(Token::Flag(name))
    }

    fn read_atom_or_number(&mut self) -> Result<Token> {
        let raw = self.take_atom_bytes()?;
        if raw.iter().all(u8::is_ascii_digit) {
            // Digits that overflow u32 stay atoms so 64-bit readers can use them.
            if let Some(n) = std::str::from_utf8(&raw).ok().and_then(|s| s.parse().ok()) {
                return Ok(Token::Number(n));
            }
        }
        let text = String::from_utf8_lossy(&raw).into_owned();
        if text.eq_ignore_ascii_case("NIL") {
            Ok(Token::Nil)
        } else {
            Ok(Token::Atom(text))
        }
    }

    fn take_atom_bytes(&mut self) -> Result<Vec<u8>> {
        let mut raw = Vec::new();
        while let Some(b) = self.peek_raw()? {
            if !is_atom_char(b) {
                break;
            }
            raw.push(b);
            self.bump();
            self.check_line_length()?;
        }
        Ok(raw)
    }

    fn peek_raw(&mut self) -> Result<Option<u8>> {
        if self.buf.is_empty() && !self.fill()? {
            return Ok(None);
        }
        Ok(self.buf.first().copied())
    }

    fn bump(&mut self) {
        if !self.buf.is_empty() {
            self.buf.advance(1);
            self.position += 1;
            self.line_len += 1;
        }
    }

    fn fill(&mut self) -> Result<bool> {
        let start = self.buf.len();
        self.buf.resize(start + self.read_size, 0);
        let read = loop {
            match self.conn.read(&mut self.buf[start..]) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    self.buf.truncate(start);
                    return Err(e.into());
                }
            }
        };
        self.buf.truncate(start + read);
        Ok(read > 0)
    }

    fn check_line_length(&self) -> Result<()> {
        if self.line_len > self.max_line_length {
            return Err(self.framing(&format!(
                "line exceeds {} bytes",
                self.max_line_length
            )));
        }
        Ok(())
    }

    fn framing(&self, message: &str) -> Error {
        error!(position = self.position, reason = message, "framing error");
        Error::Framing {
            position: self.position,
            message: message.to_string(),
        }
    }

    /// Builds an unexpected-token error. A line end is pushed back so the
    /// caller can still find the line boundary.
    fn mismatch(&mut self, expected: impl Into<String>, token: Token) -> Error {
        let err = Error::unexpected(expected, &token);
        if token.is_line_end() && self.unget.is_none() {
            self.unget_token(token);
        }
        err
    }
}

/// Returns true if the byte may appear inside an atom.
///
/// `[` and `]` are excluded so response codes lex structurally.
#[must_use]
pub const fn is_atom_char(b: u8) -> bool {
    b > 0x20 && b != 0x7F && !matches!(b, b'(' | b')' | b'{' | b'"' | b'\\' | b'[' | b']')
}
