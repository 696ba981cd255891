//! Fixed-width message ids.

use sha2::{Digest, Sha256};

/// Eight-byte hash of a normalised `Message-ID` / `In-Reply-To` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId([u8; 8]);

impl MessageId {
    /// Width of an encoded id.
    pub const LEN: usize = 8;

    /// Wraps raw id bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Raw id bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Hashes one header value. Angle brackets and surrounding whitespace are
    /// ignored; an empty value has no id.
    #[must_use]
    pub fn from_header(raw: &str) -> Option<Self> {
        let id = normalise(raw);
        (!id.is_empty()).then(|| Self::hash(id))
    }

    /// Hashes every `<...>` id in a header value, in order. A value without
    /// brackets counts as a single id.
    #[must_use]
    pub fn parse_list(raw: &str) -> Vec<Self> {
        if !raw.contains('<') {
            return Self::from_header(raw).into_iter().collect();
        }
        raw.split('<')
            .skip(1)
            .filter_map(|chunk| chunk.split_once('>').map(|(id, _)| id))
            .filter_map(Self::from_header)
            .collect()
    }

    fn hash(id: &str) -> Self {
        let digest = Sha256::digest(id.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..Self::LEN]);
        Self(bytes)
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

fn normalise(raw: &str) -> &str {
    raw.trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_brackets_and_whitespace_ignored() {
        let a = MessageId::from_header("<1234@local.machine.example>").unwrap();
        let b = MessageId::from_header("  1234@local.machine.example ").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, MessageId::from_header("<5678@local.machine.example>").unwrap());
    }

    #[test]
    fn test_empty_has_no_id() {
        assert!(MessageId::from_header("").is_none());
        assert!(MessageId::from_header(" <> ").is_none());
    }

    #[test]
    fn test_parse_list() {
        let ids = MessageId::parse_list("<a@x> <b@x>\r\n <c@x>");
        assert_eq!(ids.len(), 3);
        assert_eq!(ids[1], MessageId::from_header("b@x").unwrap());
        assert_eq!(MessageId::parse_list("bare@x").len(), 1);
        assert!(MessageId::parse_list("").is_empty());
    }

    #[test]
    fn test_display_is_hex() {
        let id = MessageId::from_bytes([0, 1, 2, 3, 0xa, 0xb, 0xc, 0xff]);
        assert_eq!(id.to_string(), "000102030a0b0cff");
    }
}
