//! IMAP engine.
//!
//! The [`Engine`] owns the connection, hands out tags, keeps the FIFO of
//! pending [`Command`]s and drives exactly one of them at a time. Each call to
//! [`Engine::iterate`] performs one unit of blocking I/O; the synchronous
//! helpers ([`Engine::capability`], [`Engine::select_folder`], ...) loop on it
//! until their command completes.
//!
//! # Example
//!
//! ```no_run
//! use std::net::TcpStream;
//!
//! use postbox_imap::engine::{Engine, EngineConfig};
//! use postbox_imap::handler::LoggingHandler;
//!
//! # fn main() -> postbox_imap::Result<()> {
//! let tcp = TcpStream::connect("imap.example.com:143")?;
//! let mut engine = Engine::new(EngineConfig::default());
//! engine.take_stream(Box::new(tcp))?;
//! engine.login("user", "secret")?;
//! engine.select_folder("INBOX", &mut LoggingHandler)?;
//! engine.logout()?;
//! # Ok(())
//! # }
//! ```

mod config;
mod connection;
mod state;
pub(crate) mod untagged;

pub use config::{
    DEFAULT_MAX_FINISHED_OUTCOMES, DEFAULT_MAX_LINE_LENGTH, DEFAULT_MAX_LITERAL_SIZE,
    DEFAULT_READ_BUFFER_SIZE, EngineConfig, EngineConfigBuilder,
};
pub use connection::{Connection, ImapConnection};
pub use state::{EngineState, SelectedState, Session};

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::command::{
    Arg, Command, CommandKind, CommandOutcome, CommandResult, CommandStatus, Step, TagGenerator,
};
use crate::handler::{LoggingHandler, ResponseHandler};
use crate::parser::{ImapStream, Token, parse_list_response, parse_resp_text};
use crate::types::{
    Capabilities, CommandId, Namespace, Namespaces, ProtocolLevel, ResponseCode, Tag,
};
use crate::{Error, Result};

/// Pipelined IMAP client engine.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    stream: Option<ImapStream>,
    session: Session,
    tags: TagGenerator,
    next_id: u32,
    queue: VecDeque<Command>,
    current: Option<Command>,
    /// Uncollected outcomes with the order they were stored in.
    finished: HashMap<CommandId, (u64, CommandOutcome)>,
    stored: u64,
}

impl Engine {
    /// Creates a disconnected engine.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let tags = TagGenerator::new(config.tag_prefix);
        Self {
            config,
            stream: None,
            session: Session::default(),
            tags,
            next_id: 1,
            queue: VecDeque::new(),
            current: None,
            finished: HashMap::new(),
            stored: 0,
        }
    }

    /// Engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Adopts a connected byte stream and performs the greeting and
    /// capability handshake.
    ///
    /// An engine that already had a stream is disconnected first.
    ///
    /// # Errors
    ///
    /// [`Error::Bye`] if the server refuses the connection,
    /// [`Error::Protocol`] if the greeting is unparsable, or any I/O error.
    pub fn take_stream(&mut self, conn: Connection) -> Result<()> {
        if self.stream.is_some() {
            self.disconnect();
        }
        self.session = Session::default();

        let mut stream = ImapStream::new(conn, &self.config);
        let caps_known = read_greeting(&mut stream, &mut self.session, &mut LoggingHandler)?;
        self.stream = Some(stream);

        if !caps_known {
            self.capability()?;
        }
        Ok(())
    }

    /// Issues CAPABILITY and waits for it.
    pub fn capability(&mut self) -> Result<()> {
        let command = Command::new(self, None, "CAPABILITY", vec![])?;
        self.run(command, &mut LoggingHandler)?.into_result()?;
        Ok(())
    }

    /// Discovers the server's namespaces.
    ///
    /// Without the NAMESPACE capability, `LIST "" ""` is used to learn the
    /// hierarchy separator and a single personal namespace is derived from it.
    pub fn namespace(&mut self) -> Result<&Namespaces> {
        if self.session.capabilities.contains(Capabilities::NAMESPACE) {
            let command = Command::new(self, None, "NAMESPACE", vec![])?;
            self.run(command, &mut LoggingHandler)?.into_result()?;
            return Ok(&self.session.namespaces);
        }

        let found: Rc<RefCell<Option<Option<char>>>> = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&found);
        let mut command = Command::new(self, None, "LIST \"\" \"\"", vec![])?;
        command.register_untagged("LIST", move |ctx| {
            let entry = parse_list_response(ctx.stream)?;
            *sink.borrow_mut() = Some(entry.delim);
            Ok(())
        });
        self.run(command, &mut LoggingHandler)?.into_result()?;

        let delim = (*found.borrow()).flatten();
        debug!(?delim, "derived namespace from LIST");
        self.session.namespaces = Namespaces {
            personal: vec![Namespace::new("", delim)],
            ..Namespaces::default()
        };
        Ok(&self.session.namespaces)
    }

    /// Authenticates with LOGIN.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] if the server advertises LOGINDISABLED,
    /// [`Error::No`] for rejected credentials.
    pub fn login(&mut self, user: &str, password: &str) -> Result<()> {
        if self.session.capabilities.contains(Capabilities::LOGINDISABLED) {
            return Err(Error::InvalidState(
                "server advertises LOGINDISABLED".to_string(),
            ));
        }
        if !matches!(self.session.state, EngineState::Connected) {
            return Err(Error::InvalidState(format!(
                "LOGIN not allowed in state {:?}",
                self.session.state
            )));
        }
        let command = Command::new(
            self,
            None,
            "LOGIN %S %S",
            vec![Arg::astring(user), Arg::astring(password)],
        )?
        .with_kind(CommandKind::Login);
        self.run(command, &mut LoggingHandler)?.into_result()?;
        Ok(())
    }

    /// Marks the session authenticated after an external authenticator
    /// finished (e.g. a SASL exchange driven through a continuation handler).
    pub fn set_authenticated(&mut self) -> Result<()> {
        match self.session.state {
            EngineState::Connected | EngineState::PreAuth => {
                self.session.state = EngineState::Authenticated;
                Ok(())
            }
            EngineState::Authenticated | EngineState::Selected(_) => Ok(()),
            EngineState::Disconnected => Err(Error::InvalidState("not connected".to_string())),
        }
    }

    /// Issues LOGOUT, waits for it and drops the stream.
    pub fn logout(&mut self) -> Result<()> {
        let command = Command::new(self, None, "LOGOUT", vec![])?.with_kind(CommandKind::Logout);
        self.run(command, &mut LoggingHandler)?.into_result()?;
        Ok(())
    }

    /// Issues NOOP, reporting whatever the server pushes to `handler`.
    pub fn noop(&mut self, handler: &mut dyn ResponseHandler) -> Result<()> {
        let command = Command::new(self, None, "NOOP", vec![])?;
        self.run(command, handler)?.into_result()?;
        Ok(())
    }

    /// Selects a mailbox read-write.
    ///
    /// Mailbox data sent while selecting (EXISTS, UIDVALIDITY, ...) goes to
    /// `handler`.
    pub fn select_folder(
        &mut self,
        folder: &str,
        handler: &mut dyn ResponseHandler,
    ) -> Result<CommandOutcome> {
        self.open_folder(folder, false, handler)
    }

    /// Selects a mailbox read-only with EXAMINE.
    pub fn examine_folder(
        &mut self,
        folder: &str,
        handler: &mut dyn ResponseHandler,
    ) -> Result<CommandOutcome> {
        self.open_folder(folder, true, handler)
    }

    fn open_folder(
        &mut self,
        folder: &str,
        read_only: bool,
        handler: &mut dyn ResponseHandler,
    ) -> Result<CommandOutcome> {
        if !self.session.state.is_authenticated() {
            return Err(Error::InvalidState(format!(
                "cannot select {folder} in state {:?}",
                self.session.state
            )));
        }
        let command = self.select_command(folder, read_only)?;
        self.run(command, handler)?.into_result()
    }

    fn select_command(&mut self, folder: &str, read_only: bool) -> Result<Command> {
        let format = if read_only { "EXAMINE %F" } else { "SELECT %F" };
        Ok(Command::new(self, None, format, vec![Arg::folder(folder)])?
            .with_kind(CommandKind::Select {
                mailbox: folder.to_string(),
                read_only,
            }))
    }

    /// Builds a command and appends it to the queue.
    pub fn submit(&mut self, folder: Option<&str>, format: &str, args: Vec<Arg>) -> Result<CommandId> {
        let command = Command::new(self, folder, format, args)?;
        self.queue(command)
    }

    /// Appends a command to the queue without blocking.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] if no stream is attached.
    pub fn queue(&mut self, command: Command) -> Result<CommandId> {
        let (id, command) = self.admit(command)?;
        self.queue.push_back(command);
        Ok(id)
    }

    /// Inserts a command at the head of the queue. It becomes active as soon
    /// as the currently active command completes.
    pub fn prequeue(&mut self, command: Command) -> Result<CommandId> {
        let (id, command) = self.admit(command)?;
        self.queue.push_front(command);
        Ok(id)
    }

    fn admit(&mut self, mut command: Command) -> Result<(CommandId, Command)> {
        if !self.session.state.is_connected() {
            return Err(Error::InvalidState("not connected".to_string()));
        }
        if command.status() != CommandStatus::Queued {
            return Err(Error::InvalidState(format!(
                "command {} was already sent",
                command.tag()
            )));
        }
        let id = self.allocate_id();
        command.set_id(id);
        debug!(%id, tag = %command.tag(), "queued command");
        Ok((id, command))
    }

    /// Removes a command that has not been activated yet.
    pub fn dequeue(&mut self, id: CommandId) -> Option<Command> {
        let index = self.queue.iter().position(|c| c.id() == Some(id))?;
        debug!(%id, "dequeued command");
        self.queue.remove(index)
    }

    /// Performs one unit of blocking I/O.
    ///
    /// With no active command, the head of the queue is activated and written.
    /// Otherwise one response line is read and dispatched. Returns the id of
    /// the command that completed on this call, if any.
    ///
    /// # Errors
    ///
    /// Any error returned here is fatal: the engine has already disconnected
    /// and failed every pending command.
    pub fn iterate(&mut self, handler: &mut dyn ResponseHandler) -> Result<Option<CommandId>> {
        if self.stream.is_none() {
            return Err(Error::InvalidState("no stream attached".to_string()));
        }
        if self.current.is_none() {
            match self.activate_next() {
                Ok(true) => {}
                Ok(false) => return Ok(None),
                Err(err) => {
                    self.disconnect();
                    return Err(err);
                }
            }
        }

        let (Some(stream), Some(command)) = (self.stream.as_mut(), self.current.as_mut()) else {
            return Ok(None);
        };
        match command.step(stream, &mut self.session, handler) {
            Ok(Step::Pending) => Ok(None),
            Ok(Step::Complete | Step::Failed) => Ok(self.finish_current()),
            Err(err) => {
                warn!(%err, "fatal connection error");
                self.disconnect();
                Err(err)
            }
        }
    }

    /// Drives the engine until the command `id` completes.
    ///
    /// The outcome is returned even for NO/BAD results; use
    /// [`CommandOutcome::into_result`] to turn those into errors.
    pub fn wait_for(
        &mut self,
        id: CommandId,
        handler: &mut dyn ResponseHandler,
    ) -> Result<CommandOutcome> {
        loop {
            if let Some((_, outcome)) = self.finished.remove(&id) {
                return Ok(outcome);
            }
            if !self.is_pending(id) {
                return Err(Error::InvalidState(format!("command {id} is not pending")));
            }
            if let Err(err) = self.iterate(handler) {
                self.finished.remove(&id);
                return Err(err);
            }
        }
    }

    /// Takes the outcome of a command that completed during `iterate`.
    ///
    /// Only the most recent [`EngineConfig::max_finished_outcomes`]
    /// uncollected outcomes are kept.
    pub fn take_outcome(&mut self, id: CommandId) -> Option<CommandOutcome> {
        self.finished.remove(&id).map(|(_, outcome)| outcome)
    }

    /// Returns `true` if the command is queued or active.
    #[must_use]
    pub fn is_pending(&self, id: CommandId) -> bool {
        self.current.as_ref().is_some_and(|c| c.id() == Some(id))
            || self.queue.iter().any(|c| c.id() == Some(id))
    }

    /// Number of commands waiting behind the active one.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Connection/session state.
    #[must_use]
    pub const fn state(&self) -> &EngineState {
        &self.session.state
    }

    /// Capability bitset.
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        self.session.capabilities
    }

    /// Returns `true` if the server advertised `AUTH=<mechanism>`.
    #[must_use]
    pub fn has_auth_type(&self, mechanism: &str) -> bool {
        self.session.has_auth_type(mechanism)
    }

    /// Protocol level implied by the capabilities.
    #[must_use]
    pub const fn protocol_level(&self) -> ProtocolLevel {
        self.session.level
    }

    /// Namespaces discovered so far.
    #[must_use]
    pub const fn namespaces(&self) -> &Namespaces {
        &self.session.namespaces
    }

    /// Currently selected mailbox.
    #[must_use]
    pub fn selected_folder(&self) -> Option<&str> {
        self.session.state.selected_mailbox()
    }

    pub(crate) fn allocate_tag(&mut self) -> Tag {
        self.tags.next_tag()
    }

    pub(crate) fn literal_plus(&self) -> bool {
        self.config.use_literal_plus
            && self
                .session
                .capabilities
                .contains(Capabilities::LITERALPLUS)
    }

    fn allocate_id(&mut self) -> CommandId {
        let id = CommandId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }

    fn run(
        &mut self,
        command: Command,
        handler: &mut dyn ResponseHandler,
    ) -> Result<CommandOutcome> {
        let id = self.queue(command)?;
        self.wait_for(id, handler)
    }

    /// Moves the queue head into the active slot, selecting its folder first
    /// when needed.
    fn activate_next(&mut self) -> Result<bool> {
        let Some(next) = self.queue.pop_front() else {
            return Ok(false);
        };
        let folder = next
            .folder()
            .filter(|f| self.selected_folder() != Some(*f))
            .map(str::to_string);
        match folder {
            Some(folder) => {
                debug!(%folder, tag = %next.tag(), "selecting folder for queued command");
                self.queue.push_front(next);
                self.current = Some(self.select_command(&folder, false)?);
            }
            None => self.current = Some(next),
        }
        Ok(true)
    }

    fn finish_current(&mut self) -> Option<CommandId> {
        let command = self.current.take()?;
        let ok = command.status() == CommandStatus::Complete
            && command.result() == CommandResult::Ok;

        match &command.kind {
            CommandKind::Login if ok => self.session.state = EngineState::Authenticated,
            CommandKind::Select { mailbox, read_only } if ok => {
                let read_only = *read_only
                    || command
                        .resp_codes()
                        .iter()
                        .any(|c| matches!(c, ResponseCode::ReadOnly));
                info!(%mailbox, read_only, "selected");
                self.session.state = EngineState::Selected(SelectedState {
                    mailbox: mailbox.clone(),
                    read_only,
                });
            }
            CommandKind::Select { mailbox, .. } => {
                debug!(%mailbox, "select failed");
                if self.session.state.is_authenticated() {
                    self.session.state = EngineState::Authenticated;
                }
                let mailbox = mailbox.clone();
                self.fail_waiting_on(&mailbox);
            }
            CommandKind::Logout => {
                debug!("logged out");
                let id = command.id();
                self.store(command);
                self.disconnect();
                return id;
            }
            _ => {}
        }

        let id = command.id();
        self.store(command);
        id
    }

    /// Fails the queue head if it was waiting for a selection that did not
    /// happen.
    fn fail_waiting_on(&mut self, mailbox: &str) {
        if self.queue.front().and_then(Command::folder) == Some(mailbox) {
            if let Some(mut command) = self.queue.pop_front() {
                command.fail(Error::No(format!("cannot select {mailbox}")));
                self.store(command);
            }
        }
    }

    fn store(&mut self, command: Command) {
        let Some(id) = command.id() else {
            return;
        };
        self.stored = self.stored.wrapping_add(1);
        self.finished.insert(id, (self.stored, command.into_outcome()));
        while self.finished.len() > self.config.max_finished_outcomes {
            let oldest = self
                .finished
                .iter()
                .min_by_key(|(_, (order, _))| *order)
                .map(|(id, _)| *id);
            let Some(oldest) = oldest else {
                break;
            };
            debug!(id = %oldest, "discarding uncollected outcome");
            self.finished.remove(&oldest);
        }
    }

    /// Fails the active and every queued command and drops the stream.
    fn disconnect(&mut self) {
        if let Some(mut command) = self.current.take() {
            command.fail(Error::ConnectionLost);
            self.store(command);
        }
        while let Some(mut command) = self.queue.pop_front() {
            command.fail(Error::ConnectionLost);
            self.store(command);
        }
        self.stream = None;
        self.session.state = EngineState::Disconnected;
        debug!("disconnected");
    }
}

/// Reads the server greeting. Returns `true` if it carried capabilities.
fn read_greeting(
    stream: &mut ImapStream,
    session: &mut Session,
    handler: &mut dyn ResponseHandler,
) -> Result<bool> {
    let first = loop {
        match stream.next_token()? {
            Token::Eol => {}
            token => break token,
        }
    };
    match first {
        Token::Asterisk => {}
        Token::NoData => return Err(Error::ConnectionLost),
        token => return Err(Error::Protocol(format!("unexpected greeting {token:?}"))),
    }
    let status = match stream.next_token()? {
        Token::Atom(atom) => atom.to_ascii_uppercase(),
        token => return Err(Error::Protocol(format!("unexpected greeting {token:?}"))),
    };
    let resp = parse_resp_text(stream).map_err(|err| {
        if err.is_fatal() {
            err
        } else {
            Error::Protocol(format!("unparsable greeting: {err}"))
        }
    })?;

    let mut caps_known = false;
    if let Some(code) = &resp.code {
        caps_known = matches!(code, ResponseCode::Capability(_));
        untagged::apply_code(session, handler, code);
    }
    session.state = match status.as_str() {
        "OK" => EngineState::Connected,
        "PREAUTH" => EngineState::PreAuth,
        "BYE" => {
            handler.on_bye(&resp.text);
            return Err(Error::Bye(resp.text));
        }
        other => return Err(Error::Protocol(format!("unexpected greeting status {other}"))),
    };
    debug!(state = ?session.state, caps_known, "greeting received");
    Ok(caps_known)
}
