//! Folder summary synchronizer.
//!
//! A [`FolderSummary`] caches envelope, flag and UID data for one folder and
//! keeps it current with [`FolderSummary::flush_updates`]. It is also the
//! [`ResponseHandler`] for that folder: EXISTS, EXPUNGE, UIDVALIDITY and
//! flag changes the server pushes are folded into the cache as they arrive.
//!
//! # Example
//!
//! ```no_run
//! use std::net::TcpStream;
//!
//! use postbox_imap::engine::{Engine, EngineConfig};
//! use postbox_imap::summary::FolderSummary;
//!
//! # fn main() -> postbox_imap::Result<()> {
//! let mut engine = Engine::new(EngineConfig::default());
//! engine.take_stream(Box::new(TcpStream::connect("imap.example.com:143")?))?;
//! engine.login("user", "secret")?;
//!
//! let mut summary = FolderSummary::load_or_new("INBOX", "inbox.summary")?;
//! summary.flush_updates(&mut engine)?;
//! for info in summary.messages() {
//!     println!("{} {}", info.uid, info.subject);
//! }
//! summary.save("inbox.summary")?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod fetch;
pub mod info;
pub mod message_id;

pub use cache::{BaseSummaryHeader, CACHE_VERSION, CacheRecord, ImapSummaryHeader};
pub use fetch::{FetchRecord, parse_envelope_date, parse_fetch_record, parse_internal_date};
pub use info::{BaseMessageInfo, ImapMessageInfo};
pub use message_id::MessageId;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use bytes::{Bytes, BytesMut};
use tracing::{debug, info, warn};

use crate::command::{Arg, Command};
use crate::engine::Engine;
use crate::handler::{FetchUpdate, ResponseHandler};
use crate::types::{MessageFlags, SeqNum, Uid, UidValidity, merge_flags};
use crate::{Error, Result};

use fetch::{Scratch, collect_into};

/// Cached message list and counters for one folder.
#[derive(Debug, Clone, Default)]
pub struct FolderSummary {
    folder: String,
    exists: u32,
    recent: u32,
    unseen: u32,
    uidvalidity: Option<UidValidity>,
    nextuid: u32,
    flags: u32,
    uidvalidity_changed: bool,
    exists_changed: bool,
    messages: Vec<ImapMessageInfo>,
}

impl FolderSummary {
    /// Creates an empty summary for `folder`.
    #[must_use]
    pub fn new(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            ..Self::default()
        }
    }

    /// Folder name.
    #[must_use]
    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// Cached records, ascending by UID.
    #[must_use]
    pub fn messages(&self) -> &[ImapMessageInfo] {
        &self.messages
    }

    /// Looks up a record by UID.
    #[must_use]
    pub fn message(&self, uid: &str) -> Option<&ImapMessageInfo> {
        self.messages.iter().find(|m| m.uid == uid)
    }

    /// Number of cached records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Message count last reported by the server.
    #[must_use]
    pub const fn exists(&self) -> u32 {
        self.exists
    }

    /// RECENT count last reported by the server.
    #[must_use]
    pub const fn recent(&self) -> u32 {
        self.recent
    }

    /// First unseen sequence number last reported by the server.
    #[must_use]
    pub const fn unseen(&self) -> u32 {
        self.unseen
    }

    /// UIDVALIDITY the cached records belong to.
    #[must_use]
    pub const fn uidvalidity(&self) -> Option<UidValidity> {
        self.uidvalidity
    }

    /// UIDNEXT last reported by the server.
    #[must_use]
    pub const fn nextuid(&self) -> u32 {
        self.nextuid
    }

    /// Returns `true` if UIDVALIDITY changed since the last flush.
    #[must_use]
    pub const fn uidvalidity_changed(&self) -> bool {
        self.uidvalidity_changed
    }

    /// Returns `true` if the message count changed since the last flush.
    #[must_use]
    pub const fn exists_changed(&self) -> bool {
        self.exists_changed
    }

    /// Sets the local flags of a message. The server flags are left as they
    /// were so the next reconciliation can replay the edit.
    pub fn set_message_flags(&mut self, uid: &str, flags: MessageFlags) -> bool {
        match self.messages.iter_mut().find(|m| m.uid == uid) {
            Some(info) => {
                info.flags = flags;
                true
            }
            None => false,
        }
    }

    /// Removes the record at 1-based sequence position `seq`.
    ///
    /// Later records move down one position.
    pub fn expunge(&mut self, seq: SeqNum) -> Option<ImapMessageInfo> {
        let index = seq.index();
        if index >= self.messages.len() {
            debug!(folder = %self.folder, seq = seq.get(), "expunge beyond cached range");
            self.exists = self.exists.saturating_sub(1);
            self.exists_changed = true;
            return None;
        }
        self.exists = self.exists.saturating_sub(1);
        let removed = self.messages.remove(index);
        debug!(folder = %self.folder, seq = seq.get(), uid = %removed.uid, "expunged");
        Some(removed)
    }

    /// Brings the summary up to date with the server.
    ///
    /// Selects the folder if needed, then rebuilds everything after a
    /// UIDVALIDITY change. After the message count changed, cached records
    /// are matched to the server by UID and only sequence numbers whose UID
    /// is not cached are fetched in full. Incomplete or duplicate records are logged
    /// and dropped. The dirty flags are cleared only on success.
    ///
    /// # Errors
    ///
    /// Any engine or command error; the dirty flags stay set so the next
    /// flush retries.
    pub fn flush_updates(&mut self, engine: &mut Engine) -> Result<()> {
        if engine.selected_folder() != Some(self.folder.as_str()) {
            let folder = self.folder.clone();
            engine.select_folder(&folder, self)?;
        }
        match self.reconcile(engine) {
            Ok(()) => {
                self.uidvalidity_changed = false;
                self.exists_changed = false;
                Ok(())
            }
            Err(err) => {
                warn!(folder = %self.folder, %err, "summary update failed");
                Err(err)
            }
        }
    }

    fn reconcile(&mut self, engine: &mut Engine) -> Result<()> {
        if self.uidvalidity_changed || (self.exists_changed && self.messages.is_empty()) {
            if self.uidvalidity_changed {
                info!(folder = %self.folder, "rebuilding summary");
            }
            self.messages.clear();
            if self.exists > 0 {
                let fetched = self.fetch_all(engine, "1:*")?;
                self.admit(fetched);
            }
        } else if self.exists_changed {
            if self.exists == 0 {
                debug!(folder = %self.folder, dropped = self.messages.len(), "folder is empty");
                self.messages.clear();
            } else {
                let missing = self.reconcile_flags(engine)?;
                if !missing.is_empty() {
                    let set = sequence_set(&missing, self.exists);
                    let fetched = self.fetch_all(engine, &set)?;
                    self.admit(fetched);
                }
            }
        } else {
            return Ok(());
        }
        self.messages.sort_by_key(|m| m.uid_number());
        Ok(())
    }

    /// Matches the cache against `FETCH 1:exists (UID FLAGS)` by UID.
    ///
    /// Cached records the server still has get the server flags merged in;
    /// the rest are removed. Returns the ascending sequence numbers whose
    /// UIDs are not cached.
    fn reconcile_flags(&mut self, engine: &mut Engine) -> Result<Vec<u32>> {
        let server = self.fetch_flags(engine, self.exists)?;
        let by_uid: HashMap<u32, Option<MessageFlags>> = server
            .values()
            .filter_map(|r| Some((r.uid?.get(), r.flags)))
            .collect();

        let before = self.messages.len();
        self.messages
            .retain_mut(|info| match by_uid.get(&info.uid_number()) {
                Some(&Some(flags)) => {
                    info.base.flags = merge_flags(info.server_flags, info.base.flags, flags);
                    info.server_flags = flags;
                    true
                }
                Some(None) => true,
                None => false,
            });
        let removed = before - self.messages.len();
        if removed > 0 {
            debug!(folder = %self.folder, removed, "dropped messages gone from server");
        }

        let cached: HashSet<u32> = self.messages.iter().map(|m| m.uid_number()).collect();
        Ok((1..=self.exists)
            .filter(|seq| {
                server
                    .get(seq)
                    .and_then(|r| r.uid)
                    .is_none_or(|uid| !cached.contains(&uid.get()))
            })
            .collect())
    }

    /// `FETCH 1:last (UID FLAGS)`. Returns what arrived by sequence number.
    fn fetch_flags(&mut self, engine: &mut Engine, last: u32) -> Result<BTreeMap<u32, FetchRecord>> {
        let scratch = Scratch::default();
        let mut command = Command::new(
            engine,
            Some(self.folder.as_str()),
            "FETCH 1:%u (UID FLAGS)",
            vec![Arg::from(last)],
        )?;
        collect_into(&mut command, &scratch);
        let id = engine.queue(command)?;
        engine.wait_for(id, self)?.into_result()?;
        Ok(scratch.take())
    }

    /// `FETCH <set> (UID FLAGS INTERNALDATE RFC822.SIZE ENVELOPE)`.
    fn fetch_all(&mut self, engine: &mut Engine, set: &str) -> Result<BTreeMap<u32, FetchRecord>> {
        let scratch = Scratch::default();
        let mut command = Command::new(
            engine,
            Some(self.folder.as_str()),
            "FETCH %s (UID FLAGS INTERNALDATE RFC822.SIZE ENVELOPE)",
            vec![Arg::raw(set)],
        )?;
        collect_into(&mut command, &scratch);
        let id = engine.queue(command)?;
        engine.wait_for(id, self)?.into_result()?;
        Ok(scratch.take())
    }

    fn admit(&mut self, fetched: BTreeMap<u32, FetchRecord>) {
        let mut known: HashSet<u32> = self.messages.iter().map(|m| m.uid_number()).collect();
        for (seq, record) in fetched {
            let Some(info) = record.into_info() else {
                warn!(folder = %self.folder, seq, "dropping incomplete FETCH record");
                continue;
            };
            if !known.insert(info.uid_number()) {
                warn!(folder = %self.folder, seq, uid = %info.uid, "dropping duplicate UID");
                continue;
            }
            self.messages.push(info);
        }
    }

    /// Encodes the header and records.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let header = ImapSummaryHeader {
            base: BaseSummaryHeader {
                version: CACHE_VERSION,
                flags: self.flags,
                nextuid: self.nextuid,
                time: chrono::Utc::now().timestamp(),
                count: u32::try_from(self.messages.len()).unwrap_or(u32::MAX),
            },
            uidvalidity: self.uidvalidity.map_or(0, UidValidity::get),
        };
        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        for info in &self.messages {
            info.encode(&mut buf);
        }
        buf.freeze()
    }

    /// Decodes a summary for `folder` from cache bytes.
    ///
    /// # Errors
    ///
    /// [`Error::Cache`] if the data is truncated or from another layout.
    pub fn decode(folder: impl Into<String>, mut data: Bytes) -> Result<Self> {
        let header = ImapSummaryHeader::decode(&mut data)?;
        let messages = (0..header.base.count)
            .map(|_| ImapMessageInfo::decode(&mut data))
            .collect::<Result<Vec<_>>>()?;
        if !data.is_empty() {
            return Err(Error::Cache(format!(
                "{} trailing bytes after {} records",
                data.len(),
                header.base.count
            )));
        }
        Ok(Self {
            folder: folder.into(),
            exists: header.base.count,
            uidvalidity: UidValidity::new(header.uidvalidity),
            nextuid: header.base.nextuid,
            flags: header.base.flags,
            messages,
            ..Self::default()
        })
    }

    /// Writes the cache file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.encode())?;
        Ok(())
    }

    /// Reads a cache file.
    pub fn load(folder: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::decode(folder, Bytes::from(data))
    }

    /// Reads a cache file, or starts empty if there is none.
    pub fn load_or_new(folder: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let folder = folder.into();
        match Self::load(folder.clone(), path) {
            Err(Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::new(folder)),
            other => other,
        }
    }
}

/// Renders ascending sequence numbers as an IMAP sequence set. A run that
/// reaches `exists` is left open (`n:*`).
fn sequence_set(seqs: &[u32], exists: u32) -> String {
    let mut runs: Vec<(u32, u32)> = Vec::new();
    for &seq in seqs {
        match runs.last_mut() {
            Some((_, end)) if end.checked_add(1) == Some(seq) => *end = seq,
            _ => runs.push((seq, seq)),
        }
    }
    runs.iter()
        .map(|&(start, end)| {
            if end >= exists {
                format!("{start}:*")
            } else if start == end {
                start.to_string()
            } else {
                format!("{start}:{end}")
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

impl ResponseHandler for FolderSummary {
    fn on_exists(&mut self, count: u32) {
        if count != self.exists || count as usize != self.messages.len() {
            self.exists_changed = true;
        }
        self.exists = count;
    }

    fn on_recent(&mut self, count: u32) {
        self.recent = count;
    }

    fn on_expunge(&mut self, seq: SeqNum) {
        self.expunge(seq);
    }

    fn on_fetch(&mut self, seq: SeqNum, update: FetchUpdate) {
        let Some(server) = update.flags else {
            return;
        };
        let index = match update.uid {
            Some(uid) => self
                .messages
                .iter()
                .position(|m| m.uid_number() == uid.get()),
            None => Some(seq.index()).filter(|&i| i < self.messages.len()),
        };
        match index.and_then(|i| self.messages.get_mut(i)) {
            Some(info) => {
                info.base.flags = merge_flags(info.server_flags, info.base.flags, server);
                info.server_flags = server;
            }
            None => self.exists_changed = true,
        }
    }

    fn on_uidvalidity(&mut self, uidvalidity: UidValidity) {
        if self.uidvalidity != Some(uidvalidity) {
            if self.uidvalidity.is_some() || !self.messages.is_empty() {
                info!(folder = %self.folder, uidvalidity = uidvalidity.get(), "UIDVALIDITY changed, clearing summary");
            }
            self.messages.clear();
            self.uidvalidity = Some(uidvalidity);
            self.uidvalidity_changed = true;
        }
    }

    fn on_uidnext(&mut self, uidnext: Uid) {
        self.nextuid = uidnext.get();
    }

    fn on_unseen(&mut self, seq: SeqNum) {
        self.unseen = seq.get();
    }
}
