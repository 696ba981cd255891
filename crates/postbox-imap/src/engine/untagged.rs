//! Untagged response dispatch.
//!
//! One `* ...` line is routed either to the handler the active command
//! registered for its keyword, or to the generic handling below.

use tracing::{debug, info, trace, warn};

use super::state::{EngineState, Session};
use crate::command::{Command, UntaggedContext};
use crate::handler::{FetchUpdate, ResponseHandler};
use crate::parser::helpers::{parse_capability_atoms, skip_section, skip_value};
use crate::parser::{ImapStream, Token, parse_flag_list, parse_namespace, parse_resp_text};
use crate::types::{ResponseCode, SeqNum, Uid};
use crate::{Error, Result};

/// Dispatches one untagged line. The leading `*` has been consumed.
///
/// The line end may be left unread; the caller discards the rest of the line
/// when it was not consumed here.
pub(crate) fn handle_untagged(
    stream: &mut ImapStream,
    session: &mut Session,
    mut command: Option<&mut Command>,
    handler: &mut dyn ResponseHandler,
) -> Result<()> {
    let (index, keyword) = match stream.next_token()? {
        Token::Number(n) => (Some(n), stream.read_atom()?.to_ascii_uppercase()),
        Token::Atom(atom) => (None, atom.to_ascii_uppercase()),
        token => {
            let err = Error::unexpected("untagged keyword", &token);
            if token.is_line_end() {
                stream.unget_token(token);
            }
            return Err(err);
        }
    };
    trace!(?index, keyword = %keyword, "untagged");

    if let Some(registered) = command
        .as_deref_mut()
        .and_then(|cmd| cmd.untagged_handler(&keyword))
    {
        let mut ctx = UntaggedContext {
            stream,
            index,
            keyword: &keyword,
        };
        return registered(&mut ctx);
    }

    match (index, keyword.as_str()) {
        (None, "OK" | "NO" | "BAD" | "BYE" | "PREAUTH") => {
            let resp = parse_resp_text(stream)?;
            if let Some(code) = resp.code {
                apply_code(session, handler, &code);
                if let Some(cmd) = command {
                    cmd.push_code(code);
                }
            }
            match keyword.as_str() {
                "NO" => handler.on_no(&resp.text),
                "BAD" => handler.on_bad(&resp.text),
                "BYE" => {
                    debug!(text = %resp.text, "server said BYE");
                    handler.on_bye(&resp.text);
                    session.bye = Some(resp.text);
                }
                "PREAUTH" if matches!(session.state, EngineState::Connected) => {
                    session.state = EngineState::PreAuth;
                }
                _ => {}
            }
        }
        (None, "CAPABILITY") => {
            let caps = parse_capability_atoms(stream)?;
            session.set_capabilities(&caps);
        }
        (None, "FLAGS") => handler.on_flags(parse_flag_list(stream)?),
        (None, "NAMESPACE") => session.namespaces = parse_namespace(stream)?,
        (Some(n), "EXISTS") => handler.on_exists(n),
        (Some(n), "RECENT") => handler.on_recent(n),
        (Some(n), "EXPUNGE") => {
            let seq = SeqNum::new(n).ok_or_else(|| Error::unexpected("sequence number", &n))?;
            handler.on_expunge(seq);
        }
        (Some(n), "FETCH") => {
            let seq = SeqNum::new(n).ok_or_else(|| Error::unexpected("sequence number", &n))?;
            let update = parse_fetch_update(stream)?;
            handler.on_fetch(seq, update);
        }
        _ => debug!(?index, keyword = %keyword, "ignoring untagged response"),
    }
    Ok(())
}

/// Folds a response code into the session and reports it to the observer.
pub(crate) fn apply_code(session: &mut Session, handler: &mut dyn ResponseHandler, code: &ResponseCode) {
    match code {
        ResponseCode::Capability(caps) => session.set_capabilities(caps),
        ResponseCode::UidValidity(uidvalidity) => {
            info!(uidvalidity = uidvalidity.get(), "UIDVALIDITY");
            handler.on_uidvalidity(*uidvalidity);
        }
        ResponseCode::UidNext(uid) => handler.on_uidnext(*uid),
        ResponseCode::Unseen(seq) => handler.on_unseen(*seq),
        ResponseCode::PermanentFlags(flags) => handler.on_permanent_flags(*flags),
        ResponseCode::Alert(text) => {
            warn!(text = %text, "server alert");
            handler.on_alert(text);
        }
        _ => {}
    }
}

/// Parses the FLAGS and UID items of a FETCH response, skipping the rest.
fn parse_fetch_update(stream: &mut ImapStream) -> Result<FetchUpdate> {
    stream.expect(&Token::LParen)?;
    let mut update = FetchUpdate::default();
    loop {
        match stream.next_token()? {
            Token::RParen => return Ok(update),
            Token::Atom(name) => match name.to_ascii_uppercase().as_str() {
                "FLAGS" => update.flags = Some(parse_flag_list(stream)?),
                "UID" => update.uid = Uid::new(stream.read_number()?),
                _ => {
                    skip_section(stream)?;
                    skip_value(stream)?;
                }
            },
            token => {
                let err = Error::unexpected("fetch attribute", &token);
                if token.is_line_end() {
                    stream.unget_token(token);
                }
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::handler::{CollectingHandler, UnsolicitedEvent};
    use crate::types::{Capabilities, MessageFlags, UidValidity};
    use std::io::Cursor;

    fn stream(input: &str) -> ImapStream {
        ImapStream::new(
            Box::new(Cursor::new(input.as_bytes().to_vec())),
            &EngineConfig::default(),
        )
    }

    fn dispatch(input: &str, session: &mut Session, handler: &mut CollectingHandler) -> Result<()> {
        let mut s = stream(input);
        assert_eq!(s.next_token().unwrap(), Token::Asterisk);
        handle_untagged(&mut s, session, None, handler)
    }

    #[test]
    fn test_mailbox_counts() {
        let mut session = Session::default();
        let mut handler = CollectingHandler::new();
        dispatch("* 23 EXISTS\r\n", &mut session, &mut handler).unwrap();
        dispatch("* 2 RECENT\r\n", &mut session, &mut handler).unwrap();
        dispatch("* 3 EXPUNGE\r\n", &mut session, &mut handler).unwrap();
        assert_eq!(handler.take(), vec![
            UnsolicitedEvent::Exists(23),
            UnsolicitedEvent::Recent(2),
            UnsolicitedEvent::Expunge(SeqNum::new(3).unwrap()),
        ]);
    }

    #[test]
    fn test_ok_with_uidvalidity() {
        let mut session = Session::default();
        let mut handler = CollectingHandler::new();
        dispatch("* OK [UIDVALIDITY 3857529045] UIDs valid\r\n", &mut session, &mut handler).unwrap();
        assert_eq!(handler.take(), vec![UnsolicitedEvent::UidValidity(
            UidValidity::new(3_857_529_045).unwrap()
        )]);
    }

    #[test]
    fn test_capability_updates_session() {
        let mut session = Session::default();
        let mut handler = CollectingHandler::new();
        dispatch("* CAPABILITY IMAP4rev1 LITERAL+ AUTH=PLAIN\r\n", &mut session, &mut handler).unwrap();
        assert!(session.capabilities.contains(Capabilities::LITERALPLUS));
        assert!(session.has_auth_type("plain"));
    }

    #[test]
    fn test_bye_recorded() {
        let mut session = Session::default();
        let mut handler = CollectingHandler::new();
        dispatch("* BYE shutting down\r\n", &mut session, &mut handler).unwrap();
        assert_eq!(session.bye.as_deref(), Some("shutting down"));
        assert_eq!(handler.take(), vec![UnsolicitedEvent::Bye("shutting down".to_string())]);
    }

    #[test]
    fn test_unsolicited_fetch() {
        let mut session = Session::default();
        let mut handler = CollectingHandler::new();
        dispatch(
            "* 4 FETCH (FLAGS (\\Seen \\Flagged) BODY[HEADER] {3}\r\nabc UID 77)\r\n",
            &mut session,
            &mut handler,
        )
        .unwrap();
        assert_eq!(handler.take(), vec![UnsolicitedEvent::Fetch(
            SeqNum::new(4).unwrap(),
            FetchUpdate {
                uid: Uid::new(77),
                flags: Some(MessageFlags::SEEN | MessageFlags::FLAGGED),
            }
        )]);
    }

    #[test]
    fn test_malformed_fetch_is_unexpected_token() {
        let mut session = Session::default();
        let mut handler = CollectingHandler::new();
        let err = dispatch("* 1 FETCH (UID)\r\n", &mut session, &mut handler).unwrap_err();
        assert!(matches!(err, Error::UnexpectedToken { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_unknown_keyword_ignored() {
        let mut session = Session::default();
        let mut handler = CollectingHandler::new();
        dispatch("* SEARCH 1 2 3\r\n", &mut session, &mut handler).unwrap();
        assert!(handler.events.is_empty());
    }
}
