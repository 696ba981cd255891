//! Server capabilities, protocol level and response status.

use bitflags::bitflags;

/// Result keyword of a status response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Command completed successfully.
    Ok,
    /// Command failed (operational error).
    No,
    /// Command failed (protocol/syntax error).
    Bad,
    /// Server greeting (pre-authenticated).
    PreAuth,
    /// Server is closing connection.
    Bye,
}

impl Status {
    /// Parses a status keyword, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "OK" => Some(Self::Ok),
            "NO" => Some(Self::No),
            "BAD" => Some(Self::Bad),
            "PREAUTH" => Some(Self::PreAuth),
            "BYE" => Some(Self::Bye),
            _ => None,
        }
    }

    /// Returns true if this is a successful status.
    #[must_use]
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok | Self::PreAuth)
    }
}

/// Negotiated protocol level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ProtocolLevel {
    /// Plain IMAP4 (RFC 1730).
    #[default]
    Imap4,
    /// `IMAP4rev1` (RFC 3501).
    Imap4Rev1,
}

/// A single capability atom as advertised by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `IMAP4`
    Imap4,
    /// `IMAP4rev1` (RFC 3501)
    Imap4Rev1,
    /// `STATUS` extension (pre-rev1 servers)
    Status,
    /// NAMESPACE command support (RFC 2342)
    Namespace,
    /// UIDPLUS extension (RFC 4315)
    UidPlus,
    /// LITERAL+ extension (RFC 7888)
    LiteralPlus,
    /// LOGIN disabled
    LoginDisabled,
    /// STARTTLS support
    StartTls,
    /// QUOTA extension (RFC 2087)
    Quota,
    /// ACL extension (RFC 4314)
    Acl,
    /// IDLE command support (RFC 2177)
    Idle,
    /// MULTIAPPEND extension (RFC 3502)
    MultiAppend,
    /// AUTH mechanism
    Auth(String),
    /// Unknown capability
    Unknown(String),
}

impl Capability {
    /// Parses a capability atom.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let upper = s.to_ascii_uppercase();
        match upper.as_str() {
            "IMAP4" => Self::Imap4,
            "IMAP4REV1" => Self::Imap4Rev1,
            "STATUS" => Self::Status,
            "NAMESPACE" => Self::Namespace,
            "UIDPLUS" => Self::UidPlus,
            "LITERAL+" => Self::LiteralPlus,
            "LOGINDISABLED" => Self::LoginDisabled,
            "STARTTLS" => Self::StartTls,
            "QUOTA" => Self::Quota,
            "ACL" => Self::Acl,
            "IDLE" => Self::Idle,
            "MULTIAPPEND" => Self::MultiAppend,
            _ if upper.starts_with("AUTH=") => Self::Auth(s[5..].to_string()),
            _ => Self::Unknown(s.to_string()),
        }
    }

    /// Returns the bit this capability sets in a [`Capabilities`] set, if any.
    #[must_use]
    pub const fn bit(&self) -> Capabilities {
        match self {
            Self::Imap4 => Capabilities::IMAP4,
            Self::Imap4Rev1 => Capabilities::IMAP4REV1,
            Self::Status => Capabilities::STATUS,
            Self::Namespace => Capabilities::NAMESPACE,
            Self::UidPlus => Capabilities::UIDPLUS,
            Self::LiteralPlus => Capabilities::LITERALPLUS,
            Self::LoginDisabled => Capabilities::LOGINDISABLED,
            Self::StartTls => Capabilities::STARTTLS,
            Self::Quota => Capabilities::QUOTA,
            Self::Acl => Capabilities::ACL,
            Self::Idle => Capabilities::IDLE,
            Self::MultiAppend => Capabilities::MULTIAPPEND,
            Self::Auth(_) | Self::Unknown(_) => Capabilities::empty(),
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Imap4 => f.write_str("IMAP4"),
            Self::Imap4Rev1 => f.write_str("IMAP4rev1"),
            Self::Status => f.write_str("STATUS"),
            Self::Namespace => f.write_str("NAMESPACE"),
            Self::UidPlus => f.write_str("UIDPLUS"),
            Self::LiteralPlus => f.write_str("LITERAL+"),
            Self::LoginDisabled => f.write_str("LOGINDISABLED"),
            Self::StartTls => f.write_str("STARTTLS"),
            Self::Quota => f.write_str("QUOTA"),
            Self::Acl => f.write_str("ACL"),
            Self::Idle => f.write_str("IDLE"),
            Self::MultiAppend => f.write_str("MULTIAPPEND"),
            Self::Auth(mech) => write!(f, "AUTH={mech}"),
            Self::Unknown(s) => f.write_str(s),
        }
    }
}

bitflags! {
    /// Capability bitset kept by the engine.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u32 {
        /// `IMAP4`
        const IMAP4 = 1 << 0;
        /// `IMAP4rev1`
        const IMAP4REV1 = 1 << 1;
        /// `STATUS`
        const STATUS = 1 << 2;
        /// `NAMESPACE`
        const NAMESPACE = 1 << 3;
        /// `UIDPLUS`
        const UIDPLUS = 1 << 4;
        /// `LITERAL+`
        const LITERALPLUS = 1 << 5;
        /// `LOGINDISABLED`
        const LOGINDISABLED = 1 << 6;
        /// `STARTTLS`
        const STARTTLS = 1 << 7;
        /// `QUOTA`
        const QUOTA = 1 << 8;
        /// `ACL`
        const ACL = 1 << 9;
        /// `IDLE`
        const IDLE = 1 << 10;
        /// `MULTIAPPEND`
        const MULTIAPPEND = 1 << 11;
    }
}

impl Capabilities {
    /// Highest protocol level implied by this set.
    #[must_use]
    pub const fn level(self) -> ProtocolLevel {
        if self.contains(Self::IMAP4REV1) {
            ProtocolLevel::Imap4Rev1
        } else {
            ProtocolLevel::Imap4
        }
    }
}
