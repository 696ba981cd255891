//! FETCH response accumulation for the summary.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use chrono::DateTime;

use super::info::{BaseMessageInfo, ImapMessageInfo};
use super::message_id::MessageId;
use crate::command::{Command, UntaggedContext};
use crate::parser::helpers::{skip_section, skip_value};
use crate::parser::{Envelope, ImapStream, Token, format_address_list, parse_envelope, parse_flag_list};
use crate::types::{MessageFlags, Uid};
use crate::{Error, Result};

/// Attributes gathered for one sequence number. A server may spread them
/// over several FETCH lines.
#[derive(Debug, Clone, Default)]
pub struct FetchRecord {
    /// UID.
    pub uid: Option<Uid>,
    /// FLAGS.
    pub flags: Option<MessageFlags>,
    /// INTERNALDATE as Unix time.
    pub internal_date: Option<i64>,
    /// RFC822.SIZE.
    pub size: Option<u32>,
    /// ENVELOPE.
    pub envelope: Option<Envelope>,
}

impl FetchRecord {
    /// Returns `true` once all five attribute groups have been seen.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.uid.is_some()
            && self.flags.is_some()
            && self.internal_date.is_some()
            && self.size.is_some()
            && self.envelope.is_some()
    }

    /// Builds a message info. Incomplete records yield `None`.
    #[must_use]
    pub fn into_info(self) -> Option<ImapMessageInfo> {
        let (Some(uid), Some(flags), Some(date_received), Some(size), Some(envelope)) = (
            self.uid,
            self.flags,
            self.internal_date,
            self.size,
            self.envelope,
        ) else {
            return None;
        };
        let base = BaseMessageInfo {
            uid: uid.get().to_string(),
            flags,
            size,
            date_sent: envelope.date.as_deref().map_or(0, parse_envelope_date),
            date_received,
            subject: envelope.subject.unwrap_or_default(),
            from: format_address_list(&envelope.from),
            to: format_address_list(&envelope.to),
            cc: format_address_list(&envelope.cc),
            message_id: envelope.message_id.as_deref().and_then(MessageId::from_header),
            references: envelope
                .in_reply_to
                .as_deref()
                .map(MessageId::parse_list)
                .unwrap_or_default(),
        };
        Some(ImapMessageInfo {
            base,
            server_flags: flags,
        })
    }
}

/// Scratch records keyed by sequence number.
pub(crate) type Scratch = Rc<RefCell<BTreeMap<u32, FetchRecord>>>;

/// Registers a FETCH handler that folds every line into `scratch`.
pub(crate) fn collect_into(command: &mut Command, scratch: &Scratch) {
    let sink = Rc::clone(scratch);
    command.register_untagged("FETCH", move |ctx: &mut UntaggedContext<'_>| {
        let seq = ctx
            .index
            .ok_or_else(|| Error::unexpected("sequence number", &ctx.keyword))?;
        let mut records = sink.borrow_mut();
        let record = records.entry(seq).or_default();
        parse_fetch_record(ctx.stream, record)
    });
}

/// Parses a FETCH attribute list into `record`, skipping attributes the
/// summary has no use for.
pub fn parse_fetch_record(stream: &mut ImapStream, record: &mut FetchRecord) -> Result<()> {
    stream.expect(&Token::LParen)?;
    loop {
        match stream.next_token()? {
            Token::RParen => return Ok(()),
            Token::Atom(name) => match name.to_ascii_uppercase().as_str() {
                "UID" => record.uid = Uid::new(stream.read_number()?),
                "FLAGS" => record.flags = Some(parse_flag_list(stream)?),
                "INTERNALDATE" => {
                    let raw = stream.read_astring()?;
                    record.internal_date = Some(parse_internal_date(&raw));
                }
                "RFC822.SIZE" => record.size = Some(stream.read_number()?),
                "ENVELOPE" => record.envelope = Some(parse_envelope(stream)?),
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

/// Parses an RFC 2822 date, ignoring a trailing `(comment)`. Returns 0 if
/// the date is unparsable.
#[must_use]
pub fn parse_envelope_date(raw: &str) -> i64 {
    let trimmed = match raw.rfind('(') {
        Some(pos) if raw.trim_end().ends_with(')') => &raw[..pos],
        _ => raw,
    };
    DateTime::parse_from_rfc2822(trimmed.trim()).map_or(0, |d| d.timestamp())
}

/// Parses an INTERNALDATE (`17-Jul-1996 02:44:25 -0700`). Returns 0 if the
/// date is unparsable.
#[must_use]
pub fn parse_internal_date(raw: &str) -> i64 {
    DateTime::parse_from_str(raw.trim(), "%d-%b-%Y %H:%M:%S %z").map_or(0, |d| d.timestamp())
}
