//! Scripted connection for unit tests.

use std::cell::RefCell;
use std::io::{Cursor, Read, Write};
use std::rc::Rc;

use crate::engine::{Engine, EngineConfig};

/// Replays canned server bytes and records everything the client writes.
pub(crate) struct ScriptedConnection {
    input: Cursor<Vec<u8>>,
    output: Rc<RefCell<Vec<u8>>>,
}

impl ScriptedConnection {
    pub(crate) fn new(script: &str) -> (Self, Rc<RefCell<Vec<u8>>>) {
        let output = Rc::new(RefCell::new(Vec::new()));
        let conn = Self {
            input: Cursor::new(script.as_bytes().to_vec()),
            output: Rc::clone(&output),
        };
        (conn, output)
    }
}

impl Read for ScriptedConnection {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for ScriptedConnection {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.output.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Engine attached to a scripted server. The script starts after the
/// greeting, which advertises IMAP4rev1 without LITERAL+.
pub(crate) fn engine(script: &str) -> (Engine, Rc<RefCell<Vec<u8>>>) {
    let full = format!("* OK [CAPABILITY IMAP4rev1 NAMESPACE] ready\r\n{script}");
    let (conn, output) = ScriptedConnection::new(&full);
    let mut engine = Engine::new(EngineConfig::default());
    #[allow(clippy::unwrap_used)]
    engine.take_stream(Box::new(conn)).unwrap();
    (engine, output)
}

/// Everything written so far, as text.
pub(crate) fn written(output: &Rc<RefCell<Vec<u8>>>) -> String {
    String::from_utf8_lossy(&output.borrow()).into_owned()
}
