//! Error types for the IMAP engine.

use thiserror::Error;

/// Errors that can occur while driving an IMAP session.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error on the underlying byte stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The byte stream no longer frames as IMAP (bad literal, unterminated
    /// string, stray control byte). The connection cannot be trusted after this.
    #[error("Framing error at byte {position}: {message}")]
    Framing {
        /// Offset into the stream where the problem was detected.
        position: u64,
        /// Description of what went wrong.
        message: String,
    },

    /// A response parser met a token it did not expect.
    #[error("Unexpected token: expected {expected}, got {found}")]
    UnexpectedToken {
        /// What the parser was looking for.
        expected: String,
        /// Debug rendering of the token that was read instead.
        found: String,
    },

    /// Server returned NO.
    #[error("Server returned NO: {0}")]
    No(String),

    /// Server returned BAD.
    #[error("Server returned BAD: {0}")]
    Bad(String),

    /// Server sent BYE.
    #[error("Server sent BYE: {0}")]
    Bye(String),

    /// The connection went away while the command was queued or in flight.
    #[error("Connection lost")]
    ConnectionLost,

    /// Invalid state for the requested operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A command could not be built from the supplied format and arguments.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Protocol violation that does not fit the other categories.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Summary cache file is truncated or has an unknown layout.
    #[error("Summary cache error: {0}")]
    Cache(String),
}

impl Error {
    /// Returns `true` if this error leaves the connection unusable.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Framing { .. } | Self::ConnectionLost | Self::Bye(_)
        )
    }

    pub(crate) fn unexpected(expected: impl Into<String>, found: &impl std::fmt::Debug) -> Self {
        Self::UnexpectedToken {
            expected: expected.into(),
            found: format!("{found:?}"),
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        assert!(Error::ConnectionLost.is_fatal());
        assert!(
            Error::Framing {
                position: 3,
                message: "bad literal".to_string()
            }
            .is_fatal()
        );
        assert!(!Error::No("nope".to_string()).is_fatal());
        assert!(!Error::unexpected("number", &")").is_fatal());
    }

    #[test]
    fn unexpected_token_message() {
        let err = Error::unexpected("atom", &42u32);
        assert_eq!(err.to_string(), "Unexpected token: expected atom, got 42");
    }
}
