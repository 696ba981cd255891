//! Pipelined IMAP command.
//!
//! A [`Command`] owns its wire text split into parts at every literal, the
//! untagged handlers registered for it, and the completion state the engine
//! fills in as response lines arrive.
//!
//! # Format placeholders
//!
//! | Placeholder | Argument | Wire form |
//! |-------------|----------|-----------|
//! | `%s` | any text or number | raw |
//! | `%u` / `%d` | [`Arg::Number`] | decimal |
//! | `%S` | text | atom, quoted string or literal |
//! | `%F` | folder name | modified UTF-7, then as `%S` |
//! | `%L` | [`Arg::Literal`] or text | literal |
//! | `%%` | none | `%` |

mod serialize;
mod tag_generator;

pub use serialize::{AstringForm, astring_form};
pub use tag_generator::TagGenerator;

use std::collections::HashMap;
use std::io::Read;

use bytes::Bytes;
use tracing::debug;

use crate::engine::{Engine, Session, untagged};
use crate::handler::ResponseHandler;
use crate::parser::{ImapStream, Token, parse_resp_text};
use crate::types::{CommandId, ResponseCode, Status, Tag};
use crate::{Error, Result, utf7};

use serialize::{write_literal_header, write_quoted};

/// An argument substituted into a command format string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// Text copied verbatim.
    Raw(String),
    /// Number.
    Number(i64),
    /// Text encoded as an astring.
    AString(String),
    /// Mailbox name, encoded to modified UTF-7 and then as an astring.
    Folder(String),
    /// Literal payload.
    Literal(Bytes),
}

impl Arg {
    /// Text copied verbatim.
    pub fn raw(s: impl Into<String>) -> Self {
        Self::Raw(s.into())
    }

    /// Text encoded as an astring.
    pub fn astring(s: impl Into<String>) -> Self {
        Self::AString(s.into())
    }

    /// Mailbox name.
    pub fn folder(s: impl Into<String>) -> Self {
        Self::Folder(s.into())
    }

    /// Literal payload from bytes.
    pub fn literal(data: impl Into<Bytes>) -> Self {
        Self::Literal(data.into())
    }

    /// Literal payload drained from a reader.
    pub fn literal_from_reader(mut reader: impl Read) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(Self::Literal(Bytes::from(data)))
    }

    fn into_text(self) -> Option<String> {
        match self {
            Self::Raw(s) | Self::AString(s) | Self::Folder(s) => Some(s),
            Self::Number(n) => Some(n.to_string()),
            Self::Literal(_) => None,
        }
    }
}

impl From<u32> for Arg {
    fn from(n: u32) -> Self {
        Self::Number(i64::from(n))
    }
}

/// Lifecycle of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandStatus {
    /// Waiting in the engine queue.
    #[default]
    Queued,
    /// Written (at least partly); response lines are being read for it.
    Active,
    /// Tagged response received.
    Complete,
    /// Tagged response received, but a response parser failed on the way.
    Error,
}

/// Tagged result of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandResult {
    /// No tagged response yet.
    #[default]
    None,
    /// OK.
    Ok,
    /// NO.
    No,
    /// BAD.
    Bad,
}

/// Outcome of advancing a command by one unit of I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// More to send or receive.
    Pending,
    /// Tagged response consumed.
    Complete,
    /// Tagged response consumed after an earlier parse failure.
    Failed,
}

/// What the engine has to do once a command completes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) enum CommandKind {
    #[default]
    Plain,
    Login,
    Select {
        mailbox: String,
        read_only: bool,
    },
    Logout,
}

/// What an untagged handler sees: the stream positioned after the keyword.
pub struct UntaggedContext<'a> {
    /// Stream to read the response data from.
    pub stream: &'a mut ImapStream,
    /// Number in front of the keyword (`* 12 FETCH`), if any.
    pub index: Option<u32>,
    /// Uppercased keyword.
    pub keyword: &'a str,
}

/// Callback for one untagged keyword.
///
/// It may stop reading anywhere on the line; the engine discards whatever is
/// left.
pub type UntaggedHandler = Box<dyn FnMut(&mut UntaggedContext<'_>) -> Result<()>>;

/// Callback for `+` continuation requests not caused by a literal.
pub type ContinuationHandler = Box<dyn FnMut(&mut ImapStream, &str) -> Result<()>>;

#[derive(Debug, Clone)]
struct Part {
    buffer: Bytes,
    literal: Option<Bytes>,
}

/// One pipelined IMAP command.
pub struct Command {
    id: Option<CommandId>,
    tag: Tag,
    folder: Option<String>,
    pub(crate) kind: CommandKind,
    parts: Vec<Part>,
    part: usize,
    non_sync: bool,
    awaiting_continuation: bool,
    untagged: HashMap<String, UntaggedHandler>,
    continuation: Option<ContinuationHandler>,
    status: CommandStatus,
    result: CommandResult,
    resp_codes: Vec<ResponseCode>,
    text: String,
    error: Option<Error>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id)
            .field("tag", &self.tag)
            .field("folder", &self.folder)
            .field("status", &self.status)
            .field("result", &self.result)
            .field("parts", &self.parts.len())
            .field("untagged", &self.untagged.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Command {
    /// Builds a command from a format string and its arguments.
    ///
    /// The tag is taken from the engine now. `folder` names the mailbox the
    /// command operates on; the engine selects it first if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the placeholders and arguments
    /// do not line up.
    pub fn new(
        engine: &mut Engine,
        folder: Option<&str>,
        format: &str,
        args: Vec<Arg>,
    ) -> Result<Self> {
        let non_sync = engine.literal_plus();
        let tag = engine.allocate_tag();
        let parts = build_parts(&tag, format, args, non_sync)?;
        Ok(Self {
            id: None,
            tag,
            folder: folder.map(str::to_string),
            kind: CommandKind::Plain,
            parts,
            part: 0,
            non_sync,
            awaiting_continuation: false,
            untagged: HashMap::new(),
            continuation: None,
            status: CommandStatus::Queued,
            result: CommandResult::None,
            resp_codes: Vec::new(),
            text: String::new(),
            error: None,
        })
    }

    pub(crate) fn with_kind(mut self, kind: CommandKind) -> Self {
        self.kind = kind;
        self
    }

    /// Registers a handler for an untagged keyword, matched case-insensitively.
    ///
    /// It runs once per matching line while this command is active.
    pub fn register_untagged<F>(&mut self, keyword: &str, handler: F)
    where
        F: FnMut(&mut UntaggedContext<'_>) -> Result<()> + 'static,
    {
        self.untagged
            .insert(keyword.to_ascii_uppercase(), Box::new(handler));
    }

    /// Sets the callback for continuation requests other than literals.
    pub fn set_continuation<F>(&mut self, handler: F)
    where
        F: FnMut(&mut ImapStream, &str) -> Result<()> + 'static,
    {
        self.continuation = Some(Box::new(handler));
    }

    /// Rewinds the command so it can be sent again.
    pub fn reset(&mut self) {
        self.part = 0;
        self.awaiting_continuation = false;
        self.status = CommandStatus::Queued;
        self.result = CommandResult::None;
        self.resp_codes.clear();
        self.text.clear();
        self.error = None;
    }

    /// Id assigned when the command was queued.
    #[must_use]
    pub const fn id(&self) -> Option<CommandId> {
        self.id
    }

    /// Command tag.
    #[must_use]
    pub const fn tag(&self) -> &Tag {
        &self.tag
    }

    /// Mailbox this command is bound to.
    #[must_use]
    pub fn folder(&self) -> Option<&str> {
        self.folder.as_deref()
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> CommandStatus {
        self.status
    }

    /// Tagged result.
    #[must_use]
    pub const fn result(&self) -> CommandResult {
        self.result
    }

    /// Response codes collected from this command's lines.
    #[must_use]
    pub fn resp_codes(&self) -> &[ResponseCode] {
        &self.resp_codes
    }

    /// First error a response parser hit while this command was active.
    #[must_use]
    pub const fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Complete wire text with literals inlined.
    #[must_use]
    pub fn wire_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for part in &self.parts {
            out.extend_from_slice(&part.buffer);
            if let Some(literal) = &part.literal {
                out.extend_from_slice(literal);
            }
        }
        out
    }

    pub(crate) const fn set_id(&mut self, id: CommandId) {
        self.id = Some(id);
    }

    pub(crate) fn untagged_handler(&mut self, keyword: &str) -> Option<&mut UntaggedHandler> {
        self.untagged.get_mut(keyword)
    }

    pub(crate) fn push_code(&mut self, code: ResponseCode) {
        self.resp_codes.push(code);
    }

    pub(crate) fn fail(&mut self, err: Error) {
        debug!(tag = %self.tag, %err, "command failed");
        if self.error.is_none() {
            self.error = Some(err);
        }
        self.status = CommandStatus::Error;
    }

    /// Advances the command by one unit of I/O: writes it if it is still
    /// queued, otherwise reads and dispatches one response line.
    ///
    /// Errors returned here are fatal to the connection. Parser failures on
    /// untagged data are recorded on the command instead and surface as
    /// [`Step::Failed`] once the tagged line arrives.
    pub(crate) fn step(
        &mut self,
        stream: &mut ImapStream,
        session: &mut Session,
        handler: &mut dyn ResponseHandler,
    ) -> Result<Step> {
        match self.status {
            CommandStatus::Queued => {
                debug!(tag = %self.tag, "activating command");
                self.status = CommandStatus::Active;
                self.write_next(stream)?;
                return Ok(Step::Pending);
            }
            CommandStatus::Complete => return Ok(Step::Complete),
            CommandStatus::Error => return Ok(Step::Failed),
            CommandStatus::Active => {}
        }

        match stream.next_token()? {
            Token::Asterisk => {
                let line = stream.lines();
                match untagged::handle_untagged(stream, session, Some(&mut *self), handler) {
                    Ok(()) => {}
                    Err(err) if err.is_fatal() => return Err(err),
                    Err(err) => {
                        debug!(tag = %self.tag, %err, "untagged response rejected");
                        if self.error.is_none() {
                            self.error = Some(err);
                        }
                    }
                }
                if stream.lines() == line {
                    stream.skip_line()?;
                }
                Ok(Step::Pending)
            }
            Token::Plus => {
                let text = stream.read_line()?;
                self.handle_continuation(stream, &text)?;
                Ok(Step::Pending)
            }
            Token::Atom(tag) if self.tag.matches(&tag) => self.complete(stream, session, handler),
            Token::Eol => Ok(Step::Pending),
            Token::NoData => Err(session
                .bye
                .clone()
                .map_or(Error::ConnectionLost, Error::Bye)),
            token => Err(Error::Protocol(format!(
                "unexpected {token:?} while waiting for {}",
                self.tag
            ))),
        }
    }

    fn handle_continuation(&mut self, stream: &mut ImapStream, text: &str) -> Result<()> {
        if self.awaiting_continuation {
            return self.send_literal(stream);
        }
        if let Some(handler) = self.continuation.as_mut() {
            handler(stream, text)?;
            return stream.flush();
        }
        Err(Error::Protocol(format!(
            "unexpected continuation request for {}: {text}",
            self.tag
        )))
    }

    fn complete(
        &mut self,
        stream: &mut ImapStream,
        session: &mut Session,
        handler: &mut dyn ResponseHandler,
    ) -> Result<Step> {
        let status = match stream.next_token()? {
            Token::Atom(atom) => Status::parse(&atom),
            _ => None,
        };
        self.result = match status {
            Some(Status::Ok) => CommandResult::Ok,
            Some(Status::No) => CommandResult::No,
            Some(Status::Bad) => CommandResult::Bad,
            _ => {
                return Err(Error::Protocol(format!(
                    "malformed tagged response for {}",
                    self.tag
                )));
            }
        };

        let line = stream.lines();
        match parse_resp_text(stream) {
            Ok(resp) => {
                if let Some(code) = resp.code {
                    untagged::apply_code(session, handler, &code);
                    self.resp_codes.push(code);
                }
                self.text = resp.text;
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                debug!(tag = %self.tag, %err, "unparsable tagged response code");
                if stream.lines() == line {
                    stream.skip_line()?;
                }
            }
        }

        if self.error.is_some() {
            self.status = CommandStatus::Error;
            debug!(tag = %self.tag, "command completed with error");
            Ok(Step::Failed)
        } else {
            self.status = CommandStatus::Complete;
            debug!(tag = %self.tag, result = ?self.result, "command completed");
            Ok(Step::Complete)
        }
    }

    /// Writes parts from the cursor until the end or a literal that has to
    /// wait for a continuation request.
    fn write_next(&mut self, stream: &mut ImapStream) -> Result<()> {
        while let Some(part) = self.parts.get(self.part) {
            stream.write_all(&part.buffer)?;
            match &part.literal {
                None => self.part += 1,
                Some(literal) if self.non_sync => {
                    stream.write_all(literal)?;
                    self.part += 1;
                }
                Some(_) => {
                    self.awaiting_continuation = true;
                    break;
                }
            }
        }
        stream.flush()
    }

    fn send_literal(&mut self, stream: &mut ImapStream) -> Result<()> {
        self.awaiting_continuation = false;
        if let Some(literal) = self.parts.get(self.part).and_then(|p| p.literal.as_ref()) {
            stream.write_all(literal)?;
        }
        self.part += 1;
        self.write_next(stream)
    }

    pub(crate) fn into_outcome(self) -> CommandOutcome {
        CommandOutcome {
            id: self.id,
            tag: self.tag,
            status: self.status,
            result: self.result,
            resp_codes: self.resp_codes,
            text: self.text,
            error: self.error,
        }
    }
}

/// Snapshot of a finished command handed back to the caller.
#[derive(Debug)]
pub struct CommandOutcome {
    /// Id the command was queued under.
    pub id: Option<CommandId>,
    /// Command tag.
    pub tag: Tag,
    /// Final status.
    pub status: CommandStatus,
    /// Tagged result.
    pub result: CommandResult,
    /// Response codes collected while the command was active.
    pub resp_codes: Vec<ResponseCode>,
    /// Text of the tagged response line.
    pub text: String,
    /// Parser or connection error, if any.
    pub error: Option<Error>,
}

impl CommandOutcome {
    /// Returns `true` for a clean tagged OK.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == CommandStatus::Complete && self.result == CommandResult::Ok
    }

    /// Turns a failed outcome into the matching error.
    ///
    /// # Errors
    ///
    /// The recorded error first, then [`Error::No`] / [`Error::Bad`] for a
    /// tagged NO or BAD.
    pub fn into_result(mut self) -> Result<Self> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        match self.result {
            CommandResult::Ok => Ok(self),
            CommandResult::No => Err(Error::No(self.text)),
            CommandResult::Bad => Err(Error::Bad(self.text)),
            CommandResult::None => Err(Error::ConnectionLost),
        }
    }
}

struct PartsBuilder {
    parts: Vec<Part>,
    buf: Vec<u8>,
    non_sync: bool,
}

impl PartsBuilder {
    fn push_literal(&mut self, data: Bytes) {
        write_literal_header(&mut self.buf, data.len(), self.non_sync);
        self.parts.push(Part {
            buffer: Bytes::from(std::mem::take(&mut self.buf)),
            literal: Some(data),
        });
    }

    fn push_astring(&mut self, s: String) {
        match astring_form(&s) {
            AstringForm::Atom => self.buf.extend_from_slice(s.as_bytes()),
            AstringForm::Quoted => write_quoted(&mut self.buf, &s),
            AstringForm::Literal => self.push_literal(Bytes::from(s.into_bytes())),
        }
    }

    fn push_arg(&mut self, conv: char, arg: Arg) -> Result<()> {
        match (conv, arg) {
            ('u', Arg::Number(n)) if n >= 0 => self.buf.extend_from_slice(n.to_string().as_bytes()),
            ('d', Arg::Number(n)) => self.buf.extend_from_slice(n.to_string().as_bytes()),
            ('L', Arg::Literal(data)) => self.push_literal(data),
            ('s' | 'S' | 'F', Arg::Literal(_)) => {
                return Err(Error::InvalidArgument(format!(
                    "%{conv} cannot take a literal payload"
                )));
            }
            ('s', arg) => {
                let text = arg.into_text().unwrap_or_default();
                self.buf.extend_from_slice(text.as_bytes());
            }
            ('S', arg) => self.push_astring(arg.into_text().unwrap_or_default()),
            ('F', arg) => self.push_astring(utf7::encode(&arg.into_text().unwrap_or_default())),
            ('L', arg) => {
                let text = arg.into_text().unwrap_or_default();
                self.push_literal(Bytes::from(text.into_bytes()));
            }
            (conv, arg) => {
                return Err(Error::InvalidArgument(format!(
                    "placeholder %{conv} does not accept {arg:?}"
                )));
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Vec<Part> {
        self.buf.extend_from_slice(b"\r\n");
        self.parts.push(Part {
            buffer: Bytes::from(self.buf),
            literal: None,
        });
        self.parts
    }
}

fn build_parts(tag: &Tag, format: &str, args: Vec<Arg>, non_sync: bool) -> Result<Vec<Part>> {
    let mut builder = PartsBuilder {
        parts: Vec::new(),
        buf: Vec::with_capacity(format.len() + 16),
        non_sync,
    };
    builder.buf.extend_from_slice(tag.as_str().as_bytes());
    builder.buf.push(b' ');

    let mut args = args.into_iter();
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            let mut utf8 = [0u8; 4];
            builder
                .buf
                .extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
            continue;
        }
        let conv = chars
            .next()
            .ok_or_else(|| Error::InvalidArgument("format ends with %".to_string()))?;
        if conv == '%' {
            builder.buf.push(b'%');
            continue;
        }
        if !matches!(conv, 's' | 'u' | 'd' | 'S' | 'F' | 'L') {
            return Err(Error::InvalidArgument(format!("unknown placeholder %{conv}")));
        }
        let arg = args
            .next()
            .ok_or_else(|| Error::InvalidArgument(format!("missing argument for %{conv}")))?;
        builder.push_arg(conv, arg)?;
    }
    if args.next().is_some() {
        return Err(Error::InvalidArgument(
            "more arguments than placeholders".to_string(),
        ));
    }
    Ok(builder.finish())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;

    fn build(format: &str, args: Vec<Arg>) -> Result<Vec<Part>> {
        build_parts(&Tag::new("A00001"), format, args, false)
    }

    fn wire(parts: &[Part]) -> Vec<u8> {
        let mut out = Vec::new();
        for part in parts {
            out.extend_from_slice(&part.buffer);
            if let Some(literal) = &part.literal {
                out.extend_from_slice(literal);
            }
        }
        out
    }

    #[test]
    fn test_plain_command() {
        let parts = build("CAPABILITY", vec![]).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(&parts[0].buffer[..], b"A00001 CAPABILITY\r\n");
    }

    #[test]
    fn test_placeholders() {
        let parts = build(
            "UID FETCH %u:%s (FLAGS) %d%%",
            vec![Arg::from(5), Arg::raw("*"), Arg::Number(-1)],
        )
        .unwrap();
        assert_eq!(wire(&parts), b"A00001 UID FETCH 5:* (FLAGS) -1%\r\n");
    }

    #[test]
    fn test_astring_and_folder() {
        let parts = build(
            "LOGIN %S %S",
            vec![Arg::astring("user"), Arg::astring("pa ss\"word")],
        )
        .unwrap();
        assert_eq!(wire(&parts), b"A00001 LOGIN user \"pa ss\\\"word\"\r\n");

        let parts = build("SELECT %F", vec![Arg::folder("Entw\u{fc}rfe")]).unwrap();
        assert_eq!(wire(&parts), b"A00001 SELECT Entw&APw-rfe\r\n");
    }

    #[test]
    fn test_literal_splits_parts() {
        let parts = build(
            "APPEND %F (\\Seen) %L",
            vec![Arg::folder("INBOX"), Arg::literal("Subject: hi\r\n\r\nbody")],
        )
        .unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(&parts[0].buffer[..], b"A00001 APPEND INBOX (\\Seen) {19}\r\n");
        assert_eq!(parts[0].literal.as_deref(), Some(&b"Subject: hi\r\n\r\nbody"[..]));
        assert_eq!(&parts[1].buffer[..], b"\r\n");
    }

    #[test]
    fn test_astring_with_crlf_becomes_literal() {
        let parts = build("LOGIN %S %S", vec![Arg::astring("me"), Arg::astring("a\r\nb")]).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(&parts[0].buffer[..], b"A00001 LOGIN me {4}\r\n");
    }

    #[test]
    fn test_non_sync_literal_header() {
        let parts = build_parts(&Tag::new("A1"), "X %L", vec![Arg::literal("abc")], true).unwrap();
        assert_eq!(&parts[0].buffer[..], b"A1 X {3+}\r\n");
    }

    #[test]
    fn test_literal_from_reader() {
        let arg = Arg::literal_from_reader(&b"streamed"[..]).unwrap();
        assert_eq!(arg, Arg::Literal(Bytes::from_static(b"streamed")));
    }

    #[test]
    fn test_argument_mismatch() {
        assert!(matches!(build("FETCH %u", vec![]), Err(Error::InvalidArgument(_))));
        assert!(matches!(
            build("NOOP", vec![Arg::from(1)]),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            build("FETCH %u", vec![Arg::Number(-3)]),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(build("X %q", vec![Arg::from(1)]), Err(Error::InvalidArgument(_))));
        assert!(matches!(
            build("X %S", vec![Arg::literal("raw")]),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(build("X %", vec![]), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_new_takes_engine_tags_in_order() {
        let mut engine = Engine::new(EngineConfig::default());
        let a = Command::new(&mut engine, None, "NOOP", vec![]).unwrap();
        let b = Command::new(&mut engine, Some("INBOX"), "NOOP", vec![]).unwrap();
        assert_eq!(a.tag().as_str(), "A00000");
        assert_eq!(b.tag().as_str(), "A00001");
        assert_eq!(b.folder(), Some("INBOX"));
        assert_eq!(a.status(), CommandStatus::Queued);
        assert_eq!(a.wire_bytes(), b"A00000 NOOP\r\n");
    }

    #[test]
    fn test_reset_rewinds_state() {
        let mut engine = Engine::new(EngineConfig::default());
        let mut cmd = Command::new(&mut engine, None, "NOOP", vec![]).unwrap();
        cmd.part = 1;
        cmd.fail(Error::Protocol("boom".to_string()));
        cmd.push_code(ResponseCode::Parse);
        assert_eq!(cmd.status(), CommandStatus::Error);
        cmd.reset();
        assert_eq!(cmd.status(), CommandStatus::Queued);
        assert!(cmd.error().is_none());
        assert!(cmd.resp_codes().is_empty());
        assert_eq!(cmd.part, 0);
    }

    #[test]
    fn test_outcome_into_result() {
        let mut engine = Engine::new(EngineConfig::default());
        let mut cmd = Command::new(&mut engine, None, "SELECT x", vec![]).unwrap();
        cmd.status = CommandStatus::Complete;
        cmd.result = CommandResult::No;
        cmd.text = "no such mailbox".to_string();
        let outcome = cmd.into_outcome();
        assert!(!outcome.is_ok());
        assert!(matches!(outcome.into_result(), Err(Error::No(text)) if text == "no such mailbox"));
    }
}
