//! IMAP response parsing.
//!
//! Parsing is pull-based: the engine reads the first tokens of a line and
//! hands the stream to a specialised parser for the rest.

pub mod envelope;
pub mod helpers;
pub mod lexer;
pub mod resp_code;

pub use envelope::{Address, Envelope, format_address_list, parse_envelope};
pub use helpers::{ListEntry, parse_flag_list, parse_list_response, parse_namespace};
pub use lexer::{ImapStream, Token};
pub use resp_code::{RespText, parse_resp_code, parse_resp_text};
