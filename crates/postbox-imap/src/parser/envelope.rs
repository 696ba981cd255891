//! ENVELOPE and address-list decoding.

use super::lexer::{ImapStream, Token};
use crate::{Error, Result};

/// Envelope structure from a FETCH response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    /// Date header.
    pub date: Option<String>,
    /// Subject header.
    pub subject: Option<String>,
    /// From addresses.
    pub from: Vec<Address>,
    /// Sender addresses.
    pub sender: Vec<Address>,
    /// Reply-To addresses.
    pub reply_to: Vec<Address>,
    /// To addresses.
    pub to: Vec<Address>,
    /// CC addresses.
    pub cc: Vec<Address>,
    /// BCC addresses.
    pub bcc: Vec<Address>,
    /// In-Reply-To header.
    pub in_reply_to: Option<String>,
    /// Message-ID header.
    pub message_id: Option<String>,
}

/// Email address from envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    /// Display name.
    pub name: Option<String>,
    /// Source route (obsolete).
    pub adl: Option<String>,
    /// Mailbox name (local part), or the group name at a group start.
    pub mailbox: Option<String>,
    /// Host name (domain part). NIL marks group syntax.
    pub host: Option<String>,
}

impl Address {
    /// Returns the full email address.
    #[must_use]
    pub fn email(&self) -> Option<String> {
        match (&self.mailbox, &self.host) {
            (Some(m), Some(h)) => Some(format!("{m}@{h}")),
            _ => None,
        }
    }

    fn is_group_start(&self) -> bool {
        self.mailbox.is_some() && self.host.is_none()
    }

    fn is_group_end(&self) -> bool {
        self.mailbox.is_none() && self.host.is_none()
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let email = self.email().unwrap_or_default();
        match self.name.as_deref().filter(|n| !n.is_empty()) {
            Some(name) => {
                let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "\"{escaped}\" <{email}>")
            }
            None => f.write_str(&email),
        }
    }
}

/// Joins an address list into one RFC 2822 style string.
///
/// Group markers become `name: member, member;`.
#[must_use]
pub fn format_address_list(addresses: &[Address]) -> String {
    let mut out = String::new();
    let mut in_group = false;
    let mut first_in_group = false;

    for addr in addresses {
        if addr.is_group_end() {
            if in_group {
                out.push(';');
                in_group = false;
            }
            continue;
        }
        if !out.is_empty() && !first_in_group {
            out.push_str(", ");
        }
        if addr.is_group_start() {
            out.push_str(addr.mailbox.as_deref().unwrap_or_default());
            out.push(':');
            in_group = true;
            first_in_group = true;
            continue;
        }
        if first_in_group {
            out.push(' ');
            first_in_group = false;
        }
        out.push_str(&addr.to_string());
    }
    if in_group {
        out.push(';');
    }
    out
}

/// Parses an envelope structure.
pub fn parse_envelope(stream: &mut ImapStream) -> Result<Envelope> {
    stream.expect(&Token::LParen)?;

    let date = stream.read_nstring()?;
    let subject = stream.read_nstring()?;
    let from = parse_address_list(stream)?;
    let sender = parse_address_list(stream)?;
    let reply_to = parse_address_list(stream)?;
    let to = parse_address_list(stream)?;
    let cc = parse_address_list(stream)?;
    let bcc = parse_address_list(stream)?;
    let in_reply_to = stream.read_nstring()?;
    let message_id = stream.read_nstring()?;

    stream.expect(&Token::RParen)?;

    Ok(Envelope {
        date,
        subject,
        from,
        sender,
        reply_to,
        to,
        cc,
        bcc,
        in_reply_to,
        message_id,
    })
}

/// Parses an address list.
pub fn parse_address_list(stream: &mut ImapStream) -> Result<Vec<Address>> {
    match stream.next_token()? {
        Token::Nil => Ok(Vec::new()),
        Token::LParen => {
            let mut addresses = Vec::new();
            loop {
                match stream.next_token()? {
                    Token::RParen => return Ok(addresses),
                    Token::LParen => {
                        stream.unget_token(Token::LParen);
                        addresses.push(parse_address(stream)?);
                    }
                    token => {
                        if token.is_line_end() {
                            stream.unget_token(token.clone());
                        }
                        return Err(Error::unexpected("address", &token));
                    }
                }
            }
        }
        token => {
            if token.is_line_end() {
                stream.unget_token(token.clone());
            }
            Err(Error::unexpected("address list", &token))
        }
    }
}

/// Parses a single address.
pub fn parse_address(stream: &mut ImapStream) -> Result<Address> {
    stream.expect(&Token::LParen)?;

    let name = stream.read_nstring()?;
    let adl = stream.read_nstring()?;
    let mailbox = stream.read_nstring()?;
    let host = stream.read_nstring()?;

    stream.expect(&Token::RParen)?;

    Ok(Address {
        name,
        adl,
        mailbox,
        host,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use std::io::Cursor;

    fn stream(input: &str) -> ImapStream {
        ImapStream::new(
            Box::new(Cursor::new(input.as_bytes().to_vec())),
            &EngineConfig::default(),
        )
    }

    fn addr(name: Option<&str>, mailbox: Option<&str>, host: Option<&str>) -> Address {
        Address {
            name: name.map(str::to_string),
            adl: None,
            mailbox: mailbox.map(str::to_string),
            host: host.map(str::to_string),
        }
    }

    #[test]
    fn test_parse_envelope() {
        let mut s = stream(concat!(
            "(\"Wed, 17 Jul 1996 02:23:25 -0700 (PDT)\" \"IMAP4rev1 WG mtg summary\" ",
            "((\"Terry Gray\" NIL \"gray\" \"cac.washington.edu\")) ",
            "((\"Terry Gray\" NIL \"gray\" \"cac.washington.edu\")) ",
            "((\"Terry Gray\" NIL \"gray\" \"cac.washington.edu\")) ",
            "((NIL NIL \"imap\" \"cac.washington.edu\")) ",
            "((NIL NIL \"minutes\" \"CNRI.Reston.VA.US\")(\"John Klensin\" NIL \"KLENSIN\" \"MIT.EDU\")) ",
            "NIL NIL \"<B27397-0100000@cac.washington.edu>\")"
        ));
        let env = parse_envelope(&mut s).unwrap();
        assert_eq!(env.subject.as_deref(), Some("IMAP4rev1 WG mtg summary"));
        assert_eq!(format_address_list(&env.from), "\"Terry Gray\" <gray@cac.washington.edu>");
        assert_eq!(format_address_list(&env.to), "imap@cac.washington.edu");
        assert_eq!(
            format_address_list(&env.cc),
            "minutes@CNRI.Reston.VA.US, \"John Klensin\" <KLENSIN@MIT.EDU>"
        );
        assert!(env.bcc.is_empty());
        assert_eq!(env.in_reply_to, None);
        assert_eq!(
            env.message_id.as_deref(),
            Some("<B27397-0100000@cac.washington.edu>")
        );
    }

    #[test]
    fn test_envelope_with_literal_subject() {
        let mut s = stream("(NIL {10}\r\nhi (there) NIL NIL NIL NIL NIL NIL NIL NIL)");
        let env = parse_envelope(&mut s).unwrap();
        assert_eq!(env.subject.as_deref(), Some("hi (there)"));
        assert!(env.from.is_empty());
    }

    #[test]
    fn test_truncated_envelope_is_unexpected_token() {
        let mut s = stream("(NIL \"subj\" NIL)\r\n");
        assert!(matches!(
            parse_envelope(&mut s),
            Err(Error::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_group_syntax() {
        let list = vec![
            addr(None, Some("undisclosed"), None),
            addr(None, Some("a"), Some("x.org")),
            addr(Some("B"), Some("b"), Some("y.org")),
            addr(None, None, None),
            addr(None, Some("c"), Some("z.org")),
        ];
        assert_eq!(
            format_address_list(&list),
            "undisclosed: a@x.org, \"B\" <b@y.org>;, c@z.org"
        );
    }

    #[test]
    fn test_name_is_escaped() {
        let a = addr(Some("The \"Boss\""), Some("boss"), Some("corp"));
        assert_eq!(a.to_string(), "\"The \\\"Boss\\\"\" <boss@corp>");
    }
}
