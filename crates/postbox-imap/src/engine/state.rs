//! Engine state types.
//!
//! The engine moves DISCONNECTED → CONNECTED (or PREAUTH) → AUTHENTICATED →
//! SELECTED while the connection is healthy. A network failure drops it back
//! to DISCONNECTED from any state.

use std::collections::BTreeSet;

use crate::types::{Capabilities, Capability, Namespaces, ProtocolLevel};

/// Connection/session state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EngineState {
    /// No stream, or the stream failed.
    #[default]
    Disconnected,
    /// Greeting received, not authenticated yet.
    Connected,
    /// Server greeted with PREAUTH.
    PreAuth,
    /// Logged in, nothing selected.
    Authenticated,
    /// A mailbox is selected.
    Selected(SelectedState),
}

impl EngineState {
    /// Returns `true` if a stream is attached and usable.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        !matches!(self, Self::Disconnected)
    }

    /// Returns `true` if we're authenticated (pre-authenticated, authenticated
    /// or selected).
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::PreAuth | Self::Authenticated | Self::Selected(_))
    }

    /// Returns the selected mailbox name, if any.
    #[must_use]
    pub fn selected_mailbox(&self) -> Option<&str> {
        match self {
            Self::Selected(state) => Some(&state.mailbox),
            _ => None,
        }
    }

    /// Returns `true` if the selected mailbox is read-only.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        match self {
            Self::Selected(state) => state.read_only,
            _ => false,
        }
    }
}

/// State information when a mailbox is selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedState {
    /// Name of the selected mailbox.
    pub mailbox: String,
    /// Whether the mailbox is read-only (EXAMINE, or READ-ONLY code).
    pub read_only: bool,
}

/// Session data the response parsers update while lines are dispatched.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Connection/session state.
    pub state: EngineState,
    /// Protocol level implied by the capabilities.
    pub level: ProtocolLevel,
    /// Capability bitset.
    pub capabilities: Capabilities,
    /// Advertised SASL mechanisms, uppercased.
    pub auth_types: BTreeSet<String>,
    /// Discovered namespaces.
    pub namespaces: Namespaces,
    /// Text of a BYE received on this connection.
    pub bye: Option<String>,
}

impl Session {
    /// Replaces the capability set with a freshly advertised list.
    pub fn set_capabilities(&mut self, caps: &[Capability]) {
        self.capabilities = Capabilities::empty();
        self.auth_types.clear();
        for cap in caps {
            self.capabilities |= cap.bit();
            if let Capability::Auth(mech) = cap {
                self.auth_types.insert(mech.to_ascii_uppercase());
            }
        }
        self.level = self.capabilities.level();
    }

    /// Returns `true` if the server advertised `AUTH=<mechanism>`.
    #[must_use]
    pub fn has_auth_type(&self, mechanism: &str) -> bool {
        self.auth_types.contains(&mechanism.to_ascii_uppercase())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_state_default() {
        assert_eq!(EngineState::default(), EngineState::Disconnected);
        assert!(!EngineState::Disconnected.is_connected());
    }

    #[test]
    fn test_is_authenticated() {
        assert!(!EngineState::Connected.is_authenticated());
        assert!(EngineState::PreAuth.is_authenticated());
        assert!(EngineState::Authenticated.is_authenticated());
        let selected = EngineState::Selected(SelectedState {
            mailbox: "INBOX".to_string(),
            read_only: true,
        });
        assert!(selected.is_authenticated());
        assert_eq!(selected.selected_mailbox(), Some("INBOX"));
        assert!(selected.is_read_only());
    }

    #[test]
    fn test_capabilities_and_auth_registry() {
        let mut session = Session::default();
        session.set_capabilities(&[
            Capability::Imap4Rev1,
            Capability::LiteralPlus,
            Capability::Auth("plain".to_string()),
            Capability::Auth("XOAUTH2".to_string()),
        ]);
        assert_eq!(session.level, ProtocolLevel::Imap4Rev1);
        assert!(session.capabilities.contains(Capabilities::LITERALPLUS));
        assert!(session.has_auth_type("PLAIN"));
        assert!(session.has_auth_type("xoauth2"));
        assert!(!session.has_auth_type("CRAM-MD5"));

        session.set_capabilities(&[Capability::Imap4]);
        assert_eq!(session.level, ProtocolLevel::Imap4);
        assert!(!session.has_auth_type("PLAIN"));
    }
}
