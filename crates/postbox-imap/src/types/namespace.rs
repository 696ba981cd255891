//! Namespaces (RFC 2342).

/// One namespace: a path prefix and its hierarchy separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    /// Prefix, e.g. `""` or `"INBOX."`.
    pub path: String,
    /// Hierarchy delimiter, `None` for a flat namespace.
    pub delim: Option<char>,
}

impl Namespace {
    /// Creates a namespace entry.
    #[must_use]
    pub fn new(path: impl Into<String>, delim: Option<char>) -> Self {
        Self {
            path: path.into(),
            delim,
        }
    }
}

/// The three namespace classes the server may advertise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespaces {
    /// The user's own mailboxes.
    pub personal: Vec<Namespace>,
    /// Other users' mailboxes.
    pub other: Vec<Namespace>,
    /// Shared mailboxes.
    pub shared: Vec<Namespace>,
}

impl Namespaces {
    /// Returns true if nothing has been discovered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.personal.is_empty() && self.other.is_empty() && self.shared.is_empty()
    }

    /// Hierarchy separator of the first personal namespace.
    #[must_use]
    pub fn personal_delim(&self) -> Option<char> {
        self.personal.first().and_then(|ns| ns.delim)
    }
}
