//! # postbox-imap
//!
//! A pipelined IMAP4rev1 client engine (RFC 3501) with an offline folder
//! summary synchronizer.
//!
//! ## Features
//!
//! - **Pipelined commands**: any number of commands may be queued; they are
//!   written and completed strictly in FIFO order, one active at a time
//! - **Streaming lexer**: literals are read by length, so binary payloads
//!   and embedded CRLFs never break line framing
//! - **Per-command untagged handlers**: a command claims the untagged
//!   keywords it cares about (`FETCH`, `LIST`, ...) while it is active
//! - **Folder summaries**: cached envelope/flag/UID data per folder,
//!   reconciled with a three-way flag merge and persisted to a cache file
//! - **Blocking I/O over any stream**: anything implementing `Read + Write`
//!   can carry the session; TLS and sockets stay with the caller
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::net::TcpStream;
//!
//! use postbox_imap::{Arg, Engine, EngineConfig, FolderSummary, NoopHandler};
//!
//! fn main() -> postbox_imap::Result<()> {
//!     let mut engine = Engine::new(EngineConfig::default());
//!     engine.take_stream(Box::new(TcpStream::connect("imap.example.com:143")?))?;
//!     engine.login("user@example.com", "password")?;
//!
//!     // Keep a summary of INBOX current
//!     let mut inbox = FolderSummary::load_or_new("INBOX", "inbox.summary")?;
//!     inbox.flush_updates(&mut engine)?;
//!     println!("{} messages", inbox.len());
//!     inbox.save("inbox.summary")?;
//!
//!     // Pipeline two commands and wait for the second
//!     engine.submit(Some("INBOX"), "NOOP", vec![])?;
//!     let id = engine.submit(Some("INBOX"), "UID FETCH %u:* (FLAGS)", vec![Arg::from(1)])?;
//!     engine.wait_for(id, &mut NoopHandler)?.into_result()?;
//!
//!     engine.logout()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! Disconnected ─ take_stream ─→ Connected ─ login ─→ Authenticated ─ select ─→ Selected
//!                     └──────── PREAUTH greeting ──────────┘
//! ```
//!
//! A fatal error (I/O, framing, unexpected continuation) drops the engine
//! back to `Disconnected` from any state and fails every pending command.
//!
//! ## Modules
//!
//! - [`engine`]: connection, state machine and command queue
//! - [`command`]: command construction and the per-command response state
//! - [`parser`]: lexer and response parsers
//! - [`summary`]: folder summary synchronizer and cache codec
//! - [`handler`]: observer for unsolicited mailbox data
//! - [`types`]: identifiers, capabilities, flags and response codes

pub mod command;
pub mod engine;
pub mod error;
pub mod handler;
pub mod parser;
pub mod summary;
pub mod types;
pub mod utf7;

#[cfg(test)]
mod testing;

pub use command::{Arg, Command, CommandOutcome, CommandResult, CommandStatus};
pub use engine::{Engine, EngineConfig, EngineState};
pub use error::{Error, Result};
pub use handler::{CollectingHandler, LoggingHandler, NoopHandler, ResponseHandler};
pub use summary::{FolderSummary, ImapMessageInfo};
pub use types::{MessageFlags, merge_flags};
