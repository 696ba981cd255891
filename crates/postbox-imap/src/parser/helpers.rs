//! Parser helper functions.

use tracing::debug;

use super::lexer::{ImapStream, Token};
use crate::types::{Capability, MessageFlags, Namespace, Namespaces};
use crate::{Error, Result, utf7};

/// Parses capability atoms up to the first non-atom token, which is left
/// unread.
pub fn parse_capability_atoms(stream: &mut ImapStream) -> Result<Vec<Capability>> {
    let mut caps = Vec::new();
    loop {
        match stream.next_token()? {
            Token::Atom(s) => caps.push(Capability::parse(&s)),
            token => {
                stream.unget_token(token);
                return Ok(caps);
            }
        }
    }
}

/// Parses a parenthesized flag list into a bitmask.
///
/// Keywords without a bit of their own are dropped.
pub fn parse_flag_list(stream: &mut ImapStream) -> Result<MessageFlags> {
    stream.expect(&Token::LParen)?;
    let mut flags = MessageFlags::empty();
    loop {
        match stream.next_token()? {
            Token::RParen => return Ok(flags),
            Token::Flag(name) | Token::Atom(name) => flags |= MessageFlags::from_wire(&name),
            token => {
                if token.is_line_end() {
                    stream.unget_token(token.clone());
                }
                return Err(Error::unexpected("flag", &token));
            }
        }
    }
}

/// A LIST response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    /// Name attributes such as `\Noselect`.
    pub attributes: Vec<String>,
    /// Hierarchy delimiter, `None` if the server sent NIL.
    pub delim: Option<char>,
    /// Mailbox name, decoded from modified UTF-7.
    pub name: String,
}

/// Parses the data of a LIST or LSUB response after the keyword.
pub fn parse_list_response(stream: &mut ImapStream) -> Result<ListEntry> {
    stream.expect(&Token::LParen)?;
    let mut attributes = Vec::new();
    loop {
        match stream.next_token()? {
            Token::RParen => break,
            Token::Flag(name) | Token::Atom(name) => attributes.push(name),
            token => {
                if token.is_line_end() {
                    stream.unget_token(token.clone());
                }
                return Err(Error::unexpected("mailbox attribute", &token));
            }
        }
    }

    let delim = read_delim(stream)?;
    let raw = stream.read_astring()?;
    let name = utf7::decode(&raw).unwrap_or_else(|err| {
        debug!(%err, "keeping undecodable mailbox name");
        raw
    });

    Ok(ListEntry {
        attributes,
        delim,
        name,
    })
}

/// Parses NAMESPACE response data: three groups, each NIL or a list of
/// `(prefix delimiter)` pairs.
pub fn parse_namespace(stream: &mut ImapStream) -> Result<Namespaces> {
    Ok(Namespaces {
        personal: parse_namespace_group(stream)?,
        other: parse_namespace_group(stream)?,
        shared: parse_namespace_group(stream)?,
    })
}

fn parse_namespace_group(stream: &mut ImapStream) -> Result<Vec<Namespace>> {
    match stream.next_token()? {
        Token::Nil => return Ok(Vec::new()),
        Token::LParen => {}
        token => return Err(Error::unexpected("namespace list", &token)),
    }

    let mut group = Vec::new();
    loop {
        match stream.next_token()? {
            Token::RParen => return Ok(group),
            Token::LParen => {
                let raw = stream.read_astring()?;
                let path = utf7::decode(&raw).unwrap_or(raw);
                let delim = read_delim(stream)?;
                skip_namespace_extensions(stream)?;
                group.push(Namespace::new(path, delim));
            }
            token => return Err(Error::unexpected("namespace entry", &token)),
        }
    }
}

/// Skips RFC 4466 namespace response extensions up to the entry's `)`.
fn skip_namespace_extensions(stream: &mut ImapStream) -> Result<()> {
    let mut depth = 1usize;
    loop {
        match stream.next_token()? {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            token if token.is_line_end() => {
                stream.unget_token(token.clone());
                return Err(Error::unexpected(")", &token));
            }
            _ => {}
        }
    }
}

fn read_delim(stream: &mut ImapStream) -> Result<Option<char>> {
    match stream.next_token()? {
        Token::Nil => Ok(None),
        Token::QString(s) => Ok(s.chars().next()),
        Token::Literal(data) => Ok(String::from_utf8_lossy(&data).chars().next()),
        token => Err(Error::unexpected("hierarchy delimiter", &token)),
    }
}

/// Skips one value of any shape: a single token, or a parenthesized group
/// with everything nested inside it.
pub fn skip_value(stream: &mut ImapStream) -> Result<()> {
    let mut depth = 0usize;
    loop {
        match stream.next_token()? {
            Token::LParen => depth += 1,
            Token::RParen if depth > 0 => depth -= 1,
            token if token.is_line_end() || token == Token::RParen => {
                let err = Error::unexpected("value", &token);
                if token.is_line_end() {
                    stream.unget_token(token);
                }
                return Err(err);
            }
            _ => {}
        }
        if depth == 0 {
            return Ok(());
        }
    }
}

/// Skips a `[section]` and `<origin>` suffix after a FETCH attribute name.
pub fn skip_section(stream: &mut ImapStream) -> Result<()> {
    if stream.peek_token()? == &Token::LBracket {
        loop {
            match stream.next_token()? {
                Token::RBracket => break,
                token if token.is_line_end() => {
                    let err = Error::unexpected("]", &token);
                    stream.unget_token(token);
                    return Err(err);
                }
                _ => {}
            }
        }
    }
    if matches!(stream.peek_token()?, Token::Atom(s) if s.starts_with('<')) {
        stream.next_token()?;
    }
    Ok(())
}
