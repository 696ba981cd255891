//! Integration tests for the engine and the folder summary.
//!
//! These tests run against a scripted connection that replays server bytes
//! and captures what the client writes, so no real server is needed.

#![allow(clippy::unwrap_used)]

use std::cell::RefCell;
use std::io::{self, Cursor, Read, Write};
use std::rc::Rc;

use postbox_imap::engine::EngineState;
use postbox_imap::handler::UnsolicitedEvent;
use postbox_imap::types::{SeqNum, UidValidity};
use postbox_imap::{
    Arg, CollectingHandler, CommandResult, CommandStatus, Engine, EngineConfig, Error,
    FolderSummary, MessageFlags, NoopHandler,
};

/// Mock connection that returns predefined responses.
struct MockStream {
    /// Responses to return (in order).
    responses: Cursor<Vec<u8>>,
    /// Captured commands sent by the client.
    sent: Rc<RefCell<Vec<u8>>>,
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.responses.read(buf)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sent.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct Server {
    sent: Rc<RefCell<Vec<u8>>>,
}

impl Server {
    fn sent(&self) -> String {
        String::from_utf8_lossy(&self.sent.borrow()).into_owned()
    }
}

/// Connects an engine to a scripted server. `script` follows the greeting.
fn connect(script: &str) -> (Engine, Server) {
    let sent = Rc::new(RefCell::new(Vec::new()));
    let stream = MockStream {
        responses: Cursor::new(
            format!("* OK [CAPABILITY IMAP4rev1] server ready\r\n{script}").into_bytes(),
        ),
        sent: Rc::clone(&sent),
    };
    let mut engine = Engine::new(EngineConfig::default());
    engine.take_stream(Box::new(stream)).unwrap();
    (engine, Server { sent })
}

/// A complete FETCH line as the summary requests it.
fn fetch_line(seq: u32, uid: u32, flags: &str) -> String {
    format!(
        "* {seq} FETCH (UID {uid} FLAGS ({flags}) INTERNALDATE \"17-Jul-1996 02:44:25 -0700\" \
         RFC822.SIZE {size} ENVELOPE (\"Wed, 17 Jul 1996 02:23:25 -0700 (PDT)\" \"subject {uid}\" \
         ((\"Terry Gray\" NIL \"gray\" \"cac.washington.edu\")) NIL NIL \
         ((NIL NIL \"imap\" \"cac.washington.edu\")) NIL NIL NIL \"<{uid}@example.com>\"))\r\n",
        size = uid * 100,
    )
}

fn select_lines(exists: u32, uidvalidity: u32, tag: &str) -> String {
    format!(
        "* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n\
         * {exists} EXISTS\r\n* 0 RECENT\r\n\
         * OK [UIDVALIDITY {uidvalidity}] UIDs valid\r\n\
         * OK [UIDNEXT 4392] Predicted next UID\r\n\
         {tag} OK [READ-WRITE] SELECT completed\r\n"
    )
}

fn uids(summary: &FolderSummary) -> Vec<u32> {
    summary.messages().iter().map(|m| m.uid_number()).collect()
}

#[test]
fn test_pipelined_commands_complete_in_order() {
    let (mut engine, server) = connect(concat!(
        "A00000 OK LOGIN completed\r\n",
        "* 2 EXISTS\r\n",
        "A00001 OK NOOP completed\r\n",
        "A00002 NO CHECK failed\r\n",
        "A00003 OK NOOP completed\r\n",
    ));
    let a = engine
        .submit(None, "LOGIN %S %S", vec![Arg::astring("fred"), Arg::astring("secret")])
        .unwrap();
    let b = engine.submit(None, "NOOP", vec![]).unwrap();
    let c = engine.submit(None, "CHECK", vec![]).unwrap();
    let d = engine.submit(None, "NOOP", vec![]).unwrap();
    assert_eq!(engine.queued(), 4);

    let mut completed = Vec::new();
    let mut events = CollectingHandler::new();
    while completed.len() < 4 {
        if let Some(id) = engine.iterate(&mut events).unwrap() {
            completed.push(id);
        }
    }
    assert_eq!(completed, vec![a, b, c, d]);
    assert_eq!(events.take(), vec![UnsolicitedEvent::Exists(2)]);

    let failed = engine.take_outcome(c).unwrap();
    assert_eq!(failed.status, CommandStatus::Complete);
    assert_eq!(failed.result, CommandResult::No);
    assert!(matches!(failed.into_result(), Err(Error::No(text)) if text == "CHECK failed"));
    assert!(engine.state().is_connected());
    assert_eq!(
        server.sent(),
        "A00000 LOGIN fred secret\r\nA00001 NOOP\r\nA00002 CHECK\r\nA00003 NOOP\r\n"
    );
}

#[test]
fn test_login_select_logout() {
    let script = format!(
        "A00000 OK LOGIN completed\r\n{}* BYE logging out\r\nA00002 OK LOGOUT completed\r\n",
        select_lines(172, 3_857_529_045, "A00001"),
    );
    let (mut engine, server) = connect(&script);
    engine.login("fred", "secret").unwrap();
    assert_eq!(engine.state(), &EngineState::Authenticated);

    let mut events = CollectingHandler::new();
    engine.select_folder("INBOX", &mut events).unwrap();
    assert_eq!(engine.selected_folder(), Some("INBOX"));
    let events = events.take();
    assert!(events.contains(&UnsolicitedEvent::Exists(172)));
    assert!(events.contains(&UnsolicitedEvent::UidValidity(
        UidValidity::new(3_857_529_045).unwrap()
    )));

    engine.logout().unwrap();
    assert_eq!(engine.state(), &EngineState::Disconnected);
    assert_eq!(
        server.sent(),
        "A00000 LOGIN fred secret\r\nA00001 SELECT INBOX\r\nA00002 LOGOUT\r\n"
    );
}

#[test]
fn test_append_waits_for_continuation() {
    let (mut engine, server) = connect(concat!(
        "+ Ready for literal data\r\n",
        "A00000 OK APPEND completed\r\n",
    ));
    let message = "Subject: hi\r\n\r\nhello\r\n";
    let id = engine
        .submit(
            None,
            "APPEND %F (\\Seen) %L",
            vec![Arg::folder("Sent"), Arg::literal(message)],
        )
        .unwrap();
    engine.wait_for(id, &mut NoopHandler).unwrap().into_result().unwrap();
    assert_eq!(
        server.sent(),
        format!("A00000 APPEND Sent (\\Seen) {{{}}}\r\n{message}\r\n", message.len())
    );
}

#[test]
fn test_framing_error_fails_everything_pending() {
    let (mut engine, _server) = connect("* 1 FETCH (BODY[] {99999999999999999999}\r\n");
    let a = engine.submit(None, "FETCH 1 BODY[]", vec![]).unwrap();
    let b = engine.submit(None, "NOOP", vec![]).unwrap();

    assert!(matches!(
        engine.wait_for(a, &mut NoopHandler),
        Err(Error::Framing { .. })
    ));
    assert_eq!(engine.state(), &EngineState::Disconnected);
    let queued = engine.take_outcome(b).unwrap();
    assert_eq!(queued.status, CommandStatus::Error);
    assert!(matches!(queued.error, Some(Error::ConnectionLost)));
}

#[test]
fn test_summary_initial_sync_drops_partial_records() {
    let script = format!(
        "{}{}{}{}* 4 FETCH (UID 31 FLAGS (\\Seen))\r\nA00001 OK FETCH completed\r\n",
        select_lines(4, 1, "A00000"),
        fetch_line(1, 30, "\\Seen"),
        fetch_line(2, 7, ""),
        fetch_line(3, 12, "\\Flagged"),
    );
    let (mut engine, server) = connect(&script);
    engine.set_authenticated().unwrap();

    let mut summary = FolderSummary::new("INBOX");
    summary.flush_updates(&mut engine).unwrap();

    assert_eq!(uids(&summary), vec![7, 12, 30]);
    assert_eq!(summary.exists(), 4);
    assert_eq!(summary.nextuid(), 4392);
    assert!(!summary.exists_changed());
    assert!(!summary.uidvalidity_changed());

    let info = summary.message("12").unwrap();
    assert_eq!(info.flags, MessageFlags::FLAGGED);
    assert_eq!(info.size, 1200);
    assert_eq!(info.subject, "subject 12");
    assert_eq!(info.from, "\"Terry Gray\" <gray@cac.washington.edu>");
    assert_eq!(info.date_received, 837_596_665);
    assert_eq!(
        server.sent(),
        "A00000 SELECT INBOX\r\nA00001 FETCH 1:* (UID FLAGS INTERNALDATE RFC822.SIZE ENVELOPE)\r\n"
    );
}

#[test]
fn test_summary_follows_expunge_during_command() {
    let script = format!(
        "{}{}{}{}{}A00001 OK FETCH completed\r\n* 3 EXPUNGE\r\nA00002 OK NOOP completed\r\n",
        select_lines(4, 1, "A00000"),
        fetch_line(1, 10, ""),
        fetch_line(2, 20, ""),
        fetch_line(3, 30, ""),
        fetch_line(4, 40, ""),
    );
    let (mut engine, server) = connect(&script);
    engine.set_authenticated().unwrap();

    let mut summary = FolderSummary::new("INBOX");
    summary.flush_updates(&mut engine).unwrap();
    engine.noop(&mut summary).unwrap();

    assert_eq!(uids(&summary), vec![10, 20, 40]);
    assert_eq!(summary.exists(), 3);
    assert!(!summary.exists_changed());

    // Nothing left to reconcile.
    summary.flush_updates(&mut engine).unwrap();
    assert!(!server.sent().contains("A00003"));
}

#[test]
fn test_summary_cache_round_trip_and_flag_merge() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("INBOX.summary");

    let missing = FolderSummary::load_or_new("INBOX", &path).unwrap();
    assert!(missing.is_empty());

    let first = format!(
        "{}{}{}A00001 OK FETCH completed\r\n",
        select_lines(2, 9, "A00000"),
        fetch_line(1, 5, "\\Seen"),
        fetch_line(2, 6, ""),
    );
    let (mut engine, _server) = connect(&first);
    engine.set_authenticated().unwrap();
    let mut summary = FolderSummary::new("INBOX");
    summary.flush_updates(&mut engine).unwrap();
    summary.save(&path).unwrap();

    let mut summary = FolderSummary::load("INBOX", &path).unwrap();
    assert_eq!(uids(&summary), vec![5, 6]);
    assert_eq!(summary.uidvalidity(), UidValidity::new(9));
    assert_eq!(summary.nextuid(), 4392);
    assert!(summary.set_message_flags("6", MessageFlags::FLAGGED));

    // Another client cleared \Seen on 5 and set it on 6; one message arrived.
    let second = format!(
        "{}* 1 FETCH (UID 5 FLAGS ())\r\n* 2 FETCH (UID 6 FLAGS (\\Seen))\r\n\
         * 3 FETCH (UID 8 FLAGS (\\Draft))\r\n\
         A00001 OK FETCH completed\r\n{}A00002 OK FETCH completed\r\n",
        select_lines(3, 9, "A00000"),
        fetch_line(3, 8, "\\Draft"),
    );
    let (mut engine, server) = connect(&second);
    engine.set_authenticated().unwrap();
    summary.flush_updates(&mut engine).unwrap();

    assert_eq!(uids(&summary), vec![5, 6, 8]);
    assert_eq!(summary.message("5").unwrap().flags, MessageFlags::empty());
    let six = summary.message("6").unwrap();
    assert_eq!(six.flags, MessageFlags::SEEN | MessageFlags::FLAGGED);
    assert_eq!(six.server_flags, MessageFlags::SEEN);
    assert_eq!(summary.message("8").unwrap().flags, MessageFlags::DRAFT);
    assert_eq!(
        server.sent(),
        "A00000 SELECT INBOX\r\n\
         A00001 FETCH 1:3 (UID FLAGS)\r\n\
         A00002 FETCH 3:* (UID FLAGS INTERNALDATE RFC822.SIZE ENVELOPE)\r\n"
    );

    summary.save(&path).unwrap();
    let reloaded = FolderSummary::load("INBOX", &path).unwrap();
    assert_eq!(reloaded.messages(), summary.messages());
}

#[test]
fn test_summary_rebuilds_after_uidvalidity_change() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Work.summary");

    let first = format!(
        "{}{}{}A00001 OK FETCH completed\r\n",
        select_lines(2, 100, "A00000"),
        fetch_line(1, 1, ""),
        fetch_line(2, 2, ""),
    );
    let (mut engine, _server) = connect(&first);
    engine.set_authenticated().unwrap();
    let mut summary = FolderSummary::new("Work");
    summary.flush_updates(&mut engine).unwrap();
    summary.save(&path).unwrap();

    let second = format!(
        "{}{}A00001 OK FETCH completed\r\n",
        select_lines(1, 101, "A00000"),
        fetch_line(1, 77, "\\Seen"),
    );
    let (mut engine, server) = connect(&second);
    engine.set_authenticated().unwrap();
    let mut summary = FolderSummary::load_or_new("Work", &path).unwrap();
    assert_eq!(summary.len(), 2);
    summary.flush_updates(&mut engine).unwrap();

    assert_eq!(uids(&summary), vec![77]);
    assert_eq!(summary.uidvalidity(), UidValidity::new(101));
    assert!(!summary.uidvalidity_changed());
    assert!(server.sent().ends_with("A00001 FETCH 1:* (UID FLAGS INTERNALDATE RFC822.SIZE ENVELOPE)\r\n"));
}

#[test]
fn test_summary_expunge_beyond_cache_marks_dirty() {
    let mut summary = FolderSummary::new("INBOX");
    assert!(summary.expunge(SeqNum::new(1).unwrap()).is_none());
    assert!(summary.exists_changed());
}
