//! Message flags and the three-way flag merge.

use bitflags::bitflags;

bitflags! {
    /// Message flags as a bitmask.
    ///
    /// Bits outside the named set are preserved by every operation here, so
    /// the merge functions stay total over arbitrary `u32` values.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MessageFlags: u32 {
        /// `\Answered`
        const ANSWERED = 1 << 0;
        /// `\Deleted`
        const DELETED = 1 << 1;
        /// `\Draft`
        const DRAFT = 1 << 2;
        /// `\Flagged`
        const FLAGGED = 1 << 3;
        /// `\Seen`
        const SEEN = 1 << 4;
        /// `$Junk` / `Junk` keyword.
        const JUNK = 1 << 7;
        /// `\Recent`
        const RECENT = 1 << 17;
        /// `\*` in PERMANENTFLAGS: client may create keywords.
        const USER = 1 << 31;
    }
}

impl MessageFlags {
    /// Maps a single flag as it appears on the wire to its bit.
    ///
    /// Keywords with no bit of their own map to the empty set.
    #[must_use]
    pub fn from_wire(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "\\ANSWERED" => Self::ANSWERED,
            "\\DELETED" => Self::DELETED,
            "\\DRAFT" => Self::DRAFT,
            "\\FLAGGED" => Self::FLAGGED,
            "\\SEEN" => Self::SEEN,
            "\\RECENT" => Self::RECENT,
            "\\*" => Self::USER,
            "$JUNK" | "JUNK" => Self::JUNK,
            _ => Self::empty(),
        }
    }

    /// Builds a set from a list of wire flag names.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        names
            .into_iter()
            .fold(Self::empty(), |acc, name| acc | Self::from_wire(name))
    }

    /// Returns the wire names of the set bits, in bit order.
    #[must_use]
    pub fn names(self) -> Vec<&'static str> {
        const NAMES: [(MessageFlags, &str); 8] = [
            (MessageFlags::ANSWERED, "\\Answered"),
            (MessageFlags::DELETED, "\\Deleted"),
            (MessageFlags::DRAFT, "\\Draft"),
            (MessageFlags::FLAGGED, "\\Flagged"),
            (MessageFlags::SEEN, "\\Seen"),
            (MessageFlags::JUNK, "$Junk"),
            (MessageFlags::RECENT, "\\Recent"),
            (MessageFlags::USER, "\\*"),
        ];
        NAMES
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect()
    }
}

/// The bit flips between two flag sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagsDiff {
    /// Bits that differ between the two sets.
    pub changed: u32,
    /// New values of exactly the changed bits.
    pub bits: u32,
}

impl FlagsDiff {
    /// Computes the flips that turn `old` into `new`.
    #[must_use]
    pub const fn between(old: MessageFlags, new: MessageFlags) -> Self {
        let changed = old.bits() ^ new.bits();
        Self {
            changed,
            bits: new.bits() & changed,
        }
    }

    /// Replays these flips onto `flags`, leaving every other bit alone.
    #[must_use]
    pub const fn apply(self, flags: MessageFlags) -> MessageFlags {
        MessageFlags::from_bits_retain((flags.bits() & !self.changed) | self.bits)
    }

    /// Returns true if the two sets were identical.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.changed == 0
    }
}

/// Computes the diff between `old` and `new`.
#[must_use]
pub const fn diff(old: MessageFlags, new: MessageFlags) -> FlagsDiff {
    FlagsDiff::between(old, new)
}

/// Applies `diff` to `flags`.
#[must_use]
pub const fn merge(diff: FlagsDiff, flags: MessageFlags) -> MessageFlags {
    diff.apply(flags)
}

/// Three-way flag merge.
///
/// `original` is the last flag set seen from the server, `local` the current
/// local set and `server` what the server reports now. Local edits made since
/// `original` are replayed onto `server`.
#[must_use]
pub const fn merge_flags(
    original: MessageFlags,
    local: MessageFlags,
    server: MessageFlags,
) -> MessageFlags {
    merge(diff(original, local), server)
}
