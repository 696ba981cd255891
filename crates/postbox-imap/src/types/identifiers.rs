//! Identifiers used on the wire and inside the engine.

use std::num::NonZeroU32;

/// IMAP command tag, e.g. `A00042`.
///
/// The server echoes the tag on the line that completes the command, which is
/// how the engine routes a tagged response back to its command.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag(String);

impl Tag {
    /// Creates a new tag from a string.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compares against a tag read off the wire. Tags are case-sensitive.
    #[must_use]
    pub fn matches(&self, wire: &str) -> bool {
        self.0 == wire
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Engine-local identifier of a queued command.
///
/// Ids are handed out per session and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommandId(pub(crate) u32);

impl CommandId {
    /// Returns the underlying value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Message sequence number (1-based position in the selected mailbox).
///
/// Sequence numbers are positional: an EXPUNGE shifts every later message
/// down by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeqNum(pub NonZeroU32);

impl SeqNum {
    /// Creates a new sequence number. Returns `None` for 0.
    #[must_use]
    pub fn new(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(Self)
    }

    /// Returns the underlying value.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// Returns the zero-based index this sequence number designates.
    #[must_use]
    pub fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

impl std::fmt::Display for SeqNum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier of a message within one UIDVALIDITY epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uid(pub NonZeroU32);

impl Uid {
    /// Creates a new UID. Returns `None` for 0.
    #[must_use]
    pub fn new(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(Self)
    }

    /// Returns the underlying value.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Uid {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<NonZeroU32>().map(Self)
    }
}

/// UIDVALIDITY value for a mailbox.
///
/// A change of this value invalidates every cached UID for the mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UidValidity(pub NonZeroU32);

impl UidValidity {
    /// Creates a new UIDVALIDITY. Returns `None` for 0.
    #[must_use]
    pub fn new(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(Self)
    }

    /// Returns the underlying value.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl std::fmt::Display for UidValidity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::unreadable_literal)]
mod tests {
    use super::*;

    #[test]
    fn tag_matching_is_exact() {
        let tag = Tag::new("A00001");
        assert!(tag.matches("A00001"));
        assert!(!tag.matches("a00001"));
        assert_eq!(tag.to_string(), "A00001");
    }

    #[test]
    fn seq_num_index() {
        assert!(SeqNum::new(0).is_none());
        assert_eq!(SeqNum::new(1).unwrap().index(), 0);
        assert_eq!(SeqNum::new(7).unwrap().index(), 6);
    }

    #[test]
    fn uid_from_str() {
        let uid: Uid = "4827943".parse().unwrap();
        assert_eq!(uid.get(), 4827943);
        assert!("0".parse::<Uid>().is_err());
        assert!("abc".parse::<Uid>().is_err());
    }

    #[test]
    fn uid_ordering_is_numeric() {
        let a: Uid = "9".parse().unwrap();
        let b: Uid = "10".parse().unwrap();
        assert!(a < b);
    }

    #[test]
    fn uid_validity_rejects_zero() {
        assert!(UidValidity::new(0).is_none());
        assert_eq!(UidValidity::new(987654321).unwrap().get(), 987654321);
    }

    #[test]
    fn command_id_display() {
        assert_eq!(CommandId(12).to_string(), "#12");
    }
}
