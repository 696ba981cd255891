//! IMAP token types.

use bytes::Bytes;

/// Token types produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `NIL`, matched case-insensitively.
    Nil,
    /// Atom (unquoted string without special characters).
    Atom(String),
    /// System or user flag starting with `\`, including `\*`.
    Flag(String),
    /// Quoted string, escapes removed.
    QString(String),
    /// Literal payload read after a `{n}` header.
    Literal(Bytes),
    /// Number.
    Number(u32),
    /// Opening parenthesis.
    LParen,
    /// Closing parenthesis.
    RParen,
    /// Opening bracket.
    LBracket,
    /// Closing bracket.
    RBracket,
    /// Asterisk (untagged response prefix).
    Asterisk,
    /// Plus (continuation response prefix).
    Plus,
    /// End of the current response line.
    Eol,
    /// Clean end of stream.
    NoData,
}

impl Token {
    /// Returns the string value of atoms, quoted strings and literals.
    #[must_use]
    pub fn as_string(&self) -> Option<String> {
        match self {
            Self::Atom(s) | Self::QString(s) => Some(s.clone()),
            Self::Literal(data) => Some(String::from_utf8_lossy(data).into_owned()),
            _ => None,
        }
    }

    /// Returns true for the tokens that end a response line.
    #[must_use]
    pub const fn is_line_end(&self) -> bool {
        matches!(self, Self::Eol | Self::NoData)
    }

    /// Renders the token roughly as it appeared on the wire.
    pub(crate) fn text(&self) -> String {
        match self {
            Self::Nil => "NIL".to_string(),
            Self::Atom(s) | Self::Flag(s) | Self::QString(s) => s.clone(),
            Self::Literal(data) => String::from_utf8_lossy(data).into_owned(),
            Self::Number(n) => n.to_string(),
            Self::LParen => "(".to_string(),
            Self::RParen => ")".to_string(),
            Self::LBracket => "[".to_string(),
            Self::RBracket => "]".to_string(),
            Self::Asterisk => "*".to_string(),
            Self::Plus => "+".to_string(),
            Self::Eol | Self::NoData => String::new(),
        }
    }
}
