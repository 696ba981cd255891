//! IMAP command tag generator.
//!
//! Tags are used to match commands with their responses.

use crate::types::Tag;

/// Tag generator for IMAP commands.
///
/// Generates unique sequential tags in the format "A00000", "A00001", etc.
#[derive(Debug, Clone)]
pub struct TagGenerator {
    counter: u32,
    prefix: char,
}

impl TagGenerator {
    /// Creates a new tag generator with the given prefix.
    #[must_use]
    pub const fn new(prefix: char) -> Self {
        Self { counter: 0, prefix }
    }

    /// Generates the next tag.
    ///
    /// The counter wraps after `u32::MAX` tags; by then every earlier command
    /// of the session has long completed.
    pub fn next_tag(&mut self) -> Tag {
        let n = self.counter;
        self.counter = self.counter.wrapping_add(1);
        Tag::new(format!("{}{:05}", self.prefix, n))
    }

    /// Returns the current counter value without incrementing.
    #[must_use]
    pub const fn current(&self) -> u32 {
        self.counter
    }

    /// Returns the tag prefix.
    #[must_use]
    pub const fn prefix(&self) -> char {
        self.prefix
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new('A')
    }
}
