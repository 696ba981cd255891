//! Response-code parser.
//!
//! Decodes the bracketed `[CODE ...]` annotation that may follow OK, NO, BAD,
//! PREAUTH and BYE, plus the human-readable text after it.

use super::helpers::{parse_capability_atoms, parse_flag_list};
use super::lexer::{ImapStream, Token};
use crate::types::{ResponseCode, SeqNum, Uid, UidValidity};
use crate::{Error, Result};

/// Response text: an optional code and the trailing human-readable text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RespText {
    /// Bracketed code, if one was present.
    pub code: Option<ResponseCode>,
    /// Remaining text of the line.
    pub text: String,
}

/// Parses `[CODE ...] text` through the end of the line.
///
/// The ALERT code carries the line text as its payload.
pub fn parse_resp_text(stream: &mut ImapStream) -> Result<RespText> {
    let code = if stream.peek_token()? == &Token::LBracket {
        stream.next_token()?;
        Some(parse_resp_code(stream)?)
    } else {
        None
    };
    let text = stream.read_line()?;
    let code = match code {
        Some(ResponseCode::Alert(_)) => Some(ResponseCode::Alert(text.clone())),
        other => other,
    };
    Ok(RespText { code, text })
}

/// Parses one response code. The opening `[` must already be consumed; the
/// closing `]` is consumed here.
///
/// Unknown codes are skipped up to the closing bracket.
pub fn parse_resp_code(stream: &mut ImapStream) -> Result<ResponseCode> {
    let keyword = stream.read_atom()?.to_ascii_uppercase();
    let code = match keyword.as_str() {
        "ALERT" => ResponseCode::Alert(String::new()),
        "PARSE" => ResponseCode::Parse,
        "READ-ONLY" => ResponseCode::ReadOnly,
        "READ-WRITE" => ResponseCode::ReadWrite,
        "TRYCREATE" => ResponseCode::TryCreate,
        "NOMODSEQ" => ResponseCode::NoModSeq,
        "BADCHARSET" => {
            let mut charsets = Vec::new();
            if stream.peek_token()? == &Token::LParen {
                stream.next_token()?;
                loop {
                    match stream.next_token()? {
                        Token::RParen => break,
                        token => match token.as_string() {
                            Some(charset) => charsets.push(charset),
                            None => return Err(Error::unexpected("charset", &token)),
                        },
                    }
                }
            }
            ResponseCode::BadCharset(charsets)
        }
        "CAPABILITY" => ResponseCode::Capability(parse_capability_atoms(stream)?),
        "PERMANENTFLAGS" => ResponseCode::PermanentFlags(parse_flag_list(stream)?),
        "UIDNEXT" => ResponseCode::UidNext(read_uid(stream)?),
        "UIDVALIDITY" => ResponseCode::UidValidity(read_uid_validity(stream)?),
        "UNSEEN" => {
            let n = stream.read_number()?;
            ResponseCode::Unseen(SeqNum::new(n).ok_or_else(|| Error::unexpected("sequence number", &n))?)
        }
        "NEWNAME" => {
            let old = stream.read_astring()?;
            let new = stream.read_astring()?;
            ResponseCode::NewName { old, new }
        }
        "APPENDUID" => {
            let uidvalidity = read_uid_validity(stream)?;
            let uid = read_uid(stream)?;
            ResponseCode::AppendUid { uidvalidity, uid }
        }
        "COPYUID" => {
            let uidvalidity = read_uid_validity(stream)?;
            let source = read_set(stream)?;
            let dest = read_set(stream)?;
            ResponseCode::CopyUid {
                uidvalidity,
                source,
                dest,
            }
        }
        "HIGHESTMODSEQ" => ResponseCode::HighestModSeq(stream.read_number64()?),
        _ => ResponseCode::Unknown(keyword),
    };
    skip_to_close_bracket(stream)?;
    Ok(code)
}

fn read_uid(stream: &mut ImapStream) -> Result<Uid> {
    let n = stream.read_number()?;
    Uid::new(n).ok_or_else(|| Error::unexpected("non-zero UID", &n))
}

fn read_uid_validity(stream: &mut ImapStream) -> Result<UidValidity> {
    let n = stream.read_number()?;
    UidValidity::new(n).ok_or_else(|| Error::unexpected("non-zero UIDVALIDITY", &n))
}

fn read_set(stream: &mut ImapStream) -> Result<String> {
    match stream.next_token()? {
        Token::Number(n) => Ok(n.to_string()),
        Token::Atom(s) => Ok(s),
        token => Err(Error::unexpected("sequence set", &token)),
    }
}

fn skip_to_close_bracket(stream: &mut ImapStream) -> Result<()> {
    loop {
        match stream.next_token()? {
            Token::RBracket => return Ok(()),
            token if token.is_line_end() => {
                stream.unget_token(token.clone());
                return Err(Error::unexpected("]", &token));
            }
            _ => {}
        }
    }
}
