//! Byte-stream abstraction the engine runs over.
//!
//! Socket setup, TLS and timeouts belong to whoever builds the stream; the
//! engine only needs blocking reads and writes.

use std::io::{Read, Write};

/// A blocking, bidirectional byte stream to an IMAP server.
pub trait ImapConnection: Read + Write {}

impl<T> ImapConnection for T where T: Read + Write {}

/// Boxed connection owned by the engine's stream.
pub type Connection = Box<dyn ImapConnection>;
