//! Observer for mailbox data the server pushes while commands run.
//!
//! IMAP servers may send EXISTS, EXPUNGE, FETCH and response codes such as
//! UIDVALIDITY at any time. The engine parses them and reports them to the
//! [`ResponseHandler`] passed to [`Engine::iterate`](crate::Engine::iterate).
//!
//! # Example
//!
//! ```
//! use postbox_imap::handler::ResponseHandler;
//!
//! struct Counter {
//!     exists: u32,
//! }
//!
//! impl ResponseHandler for Counter {
//!     fn on_exists(&mut self, count: u32) {
//!         self.exists = count;
//!     }
//! }
//! ```

use crate::types::{MessageFlags, SeqNum, Uid, UidValidity};

/// Data from an unsolicited FETCH response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchUpdate {
    /// UID, when the server included it.
    pub uid: Option<Uid>,
    /// New flag set, when the server included it.
    pub flags: Option<MessageFlags>,
}

/// Handler for unsolicited server responses.
///
/// Every method defaults to doing nothing.
pub trait ResponseHandler {
    /// Called when the message count changes (EXISTS response).
    fn on_exists(&mut self, count: u32) {
        let _ = count;
    }

    /// Called when the recent count changes.
    fn on_recent(&mut self, count: u32) {
        let _ = count;
    }

    /// Called when a message is expunged (EXPUNGE response).
    ///
    /// The sequence number refers to the message's position before removal.
    /// Sequence numbers of subsequent messages decrease by one.
    fn on_expunge(&mut self, seq: SeqNum) {
        let _ = seq;
    }

    /// Called for FETCH responses no command asked to handle itself.
    ///
    /// This typically indicates flag changes made by another client.
    fn on_fetch(&mut self, seq: SeqNum, update: FetchUpdate) {
        let _ = (seq, update);
    }

    /// Called when the available flags for the mailbox change.
    fn on_flags(&mut self, flags: MessageFlags) {
        let _ = flags;
    }

    /// Called for a PERMANENTFLAGS response code.
    fn on_permanent_flags(&mut self, flags: MessageFlags) {
        let _ = flags;
    }

    /// Called for a UIDVALIDITY response code.
    fn on_uidvalidity(&mut self, uidvalidity: UidValidity) {
        let _ = uidvalidity;
    }

    /// Called for a UIDNEXT response code.
    fn on_uidnext(&mut self, uidnext: Uid) {
        let _ = uidnext;
    }

    /// Called for an UNSEEN response code.
    fn on_unseen(&mut self, seq: SeqNum) {
        let _ = seq;
    }

    /// Called when the server is closing the connection (BYE response).
    fn on_bye(&mut self, text: &str) {
        let _ = text;
    }

    /// Called when the server sends an ALERT response code.
    ///
    /// ALERT text is meant to be shown to the user.
    fn on_alert(&mut self, text: &str) {
        let _ = text;
    }

    /// Called for untagged NO responses (warnings).
    fn on_no(&mut self, text: &str) {
        let _ = text;
    }

    /// Called for untagged BAD responses.
    fn on_bad(&mut self, text: &str) {
        let _ = text;
    }
}

/// A no-op handler that ignores all unsolicited responses.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl ResponseHandler for NoopHandler {}

/// A handler that logs unsolicited responses using tracing.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ResponseHandler for LoggingHandler {
    fn on_exists(&mut self, count: u32) {
        tracing::debug!(count, "EXISTS");
    }

    fn on_recent(&mut self, count: u32) {
        tracing::debug!(count, "RECENT");
    }

    fn on_expunge(&mut self, seq: SeqNum) {
        tracing::debug!(seq = seq.get(), "EXPUNGE");
    }

    fn on_fetch(&mut self, seq: SeqNum, update: FetchUpdate) {
        tracing::debug!(seq = seq.get(), ?update, "FETCH");
    }

    fn on_flags(&mut self, flags: MessageFlags) {
        tracing::debug!(?flags, "FLAGS");
    }

    fn on_uidvalidity(&mut self, uidvalidity: UidValidity) {
        tracing::debug!(uidvalidity = uidvalidity.get(), "UIDVALIDITY");
    }

    fn on_bye(&mut self, text: &str) {
        tracing::info!(text, "BYE");
    }

    fn on_alert(&mut self, text: &str) {
        tracing::warn!(text, "ALERT");
    }

    fn on_no(&mut self, text: &str) {
        tracing::warn!(text, "NO");
    }

    fn on_bad(&mut self, text: &str) {
        tracing::error!(text, "BAD");
    }
}

/// A handler that collects events for later processing.
#[derive(Debug, Default, Clone)]
pub struct CollectingHandler {
    /// Collected events.
    pub events: Vec<UnsolicitedEvent>,
}

impl CollectingHandler {
    /// Creates a new collecting handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes all collected events, leaving the handler empty.
    pub fn take(&mut self) -> Vec<UnsolicitedEvent> {
        std::mem::take(&mut self.events)
    }
}

impl ResponseHandler for CollectingHandler {
    fn on_exists(&mut self, count: u32) {
        self.events.push(UnsolicitedEvent::Exists(count));
    }

    fn on_recent(&mut self, count: u32) {
        self.events.push(UnsolicitedEvent::Recent(count));
    }

    fn on_expunge(&mut self, seq: SeqNum) {
        self.events.push(UnsolicitedEvent::Expunge(seq));
    }

    fn on_fetch(&mut self, seq: SeqNum, update: FetchUpdate) {
        self.events.push(UnsolicitedEvent::Fetch(seq, update));
    }

    fn on_flags(&mut self, flags: MessageFlags) {
        self.events.push(UnsolicitedEvent::Flags(flags));
    }

    fn on_uidvalidity(&mut self, uidvalidity: UidValidity) {
        self.events.push(UnsolicitedEvent::UidValidity(uidvalidity));
    }

    fn on_uidnext(&mut self, uidnext: Uid) {
        self.events.push(UnsolicitedEvent::UidNext(uidnext));
    }

    fn on_bye(&mut self, text: &str) {
        self.events.push(UnsolicitedEvent::Bye(text.to_string()));
    }

    fn on_alert(&mut self, text: &str) {
        self.events.push(UnsolicitedEvent::Alert(text.to_string()));
    }
}

/// An unsolicited event collected by [`CollectingHandler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsolicitedEvent {
    /// EXISTS response.
    Exists(u32),
    /// RECENT response.
    Recent(u32),
    /// EXPUNGE response.
    Expunge(SeqNum),
    /// FETCH response.
    Fetch(SeqNum, FetchUpdate),
    /// FLAGS response.
    Flags(MessageFlags),
    /// UIDVALIDITY response code.
    UidValidity(UidValidity),
    /// UIDNEXT response code.
    UidNext(Uid),
    /// BYE response.
    Bye(String),
    /// ALERT response code.
    Alert(String),
}
