//! Message-info records.

use std::ops::{Deref, DerefMut};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::cache::{CacheRecord, get_string, need, put_string};
use super::message_id::MessageId;
use crate::Result;
use crate::types::MessageFlags;

/// Per-message data every folder summary keeps.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BaseMessageInfo {
    /// UID as a decimal string.
    pub uid: String,
    /// User-visible flags, local edits included.
    pub flags: MessageFlags,
    /// Size in bytes (RFC822.SIZE).
    pub size: u32,
    /// Envelope date as Unix time, 0 if unparsable.
    pub date_sent: i64,
    /// INTERNALDATE as Unix time, 0 if unparsable.
    pub date_received: i64,
    /// Subject.
    pub subject: String,
    /// From addresses, formatted.
    pub from: String,
    /// To addresses, formatted.
    pub to: String,
    /// Cc addresses, formatted.
    pub cc: String,
    /// Hashed Message-ID.
    pub message_id: Option<MessageId>,
    /// Hashed ids of the messages this one replies to.
    pub references: Vec<MessageId>,
}

impl BaseMessageInfo {
    /// Numeric UID, 0 if the string is not a number.
    #[must_use]
    pub fn uid_number(&self) -> u32 {
        self.uid.parse().unwrap_or(0)
    }
}

impl CacheRecord for BaseMessageInfo {
    fn encode(&self, buf: &mut BytesMut) {
        put_string(buf, &self.uid);
        buf.put_u32(self.flags.bits());
        buf.put_u32(self.size);
        buf.put_i64(self.date_sent);
        buf.put_i64(self.date_received);
        put_string(buf, &self.subject);
        put_string(buf, &self.from);
        put_string(buf, &self.to);
        put_string(buf, &self.cc);
        match &self.message_id {
            Some(id) => {
                buf.put_u8(1);
                buf.put_slice(id.as_bytes());
            }
            None => buf.put_u8(0),
        }
        buf.put_u32(u32::try_from(self.references.len()).unwrap_or(u32::MAX));
        for id in &self.references {
            buf.put_slice(id.as_bytes());
        }
    }

    fn decode(buf: &mut Bytes) -> Result<Self> {
        let uid = get_string(buf)?;
        need(buf, 24, "message info")?;
        let flags = MessageFlags::from_bits_retain(buf.get_u32());
        let size = buf.get_u32();
        let date_sent = buf.get_i64();
        let date_received = buf.get_i64();
        let subject = get_string(buf)?;
        let from = get_string(buf)?;
        let to = get_string(buf)?;
        let cc = get_string(buf)?;

        need(buf, 1, "message-id marker")?;
        let message_id = if buf.get_u8() == 0 {
            None
        } else {
            Some(read_id(buf)?)
        };
        need(buf, 4, "reference count")?;
        let count = buf.get_u32() as usize;
        need(buf, count.saturating_mul(MessageId::LEN), "references")?;
        let references = (0..count).map(|_| read_id(buf)).collect::<Result<_>>()?;

        Ok(Self {
            uid,
            flags,
            size,
            date_sent,
            date_received,
            subject,
            from,
            to,
            cc,
            message_id,
            references,
        })
    }
}

fn read_id(buf: &mut Bytes) -> Result<MessageId> {
    need(buf, MessageId::LEN, "message id")?;
    let mut bytes = [0u8; MessageId::LEN];
    buf.copy_to_slice(&mut bytes);
    Ok(MessageId::from_bytes(bytes))
}

/// IMAP message info: the base record plus the last flags the server
/// reported, kept apart from the merged user-visible flags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImapMessageInfo {
    /// Base record.
    pub base: BaseMessageInfo,
    /// Flags as last fetched from the server.
    pub server_flags: MessageFlags,
}

impl Deref for ImapMessageInfo {
    type Target = BaseMessageInfo;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl DerefMut for ImapMessageInfo {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.base
    }
}

impl CacheRecord for ImapMessageInfo {
    fn encode(&self, buf: &mut BytesMut) {
        self.base.encode(buf);
        buf.put_u32(self.server_flags.bits());
    }

    fn decode(buf: &mut Bytes) -> Result<Self> {
        let base = BaseMessageInfo::decode(buf)?;
        need(buf, 4, "server flags")?;
        Ok(Self {
            base,
            server_flags: MessageFlags::from_bits_retain(buf.get_u32()),
        })
    }
}
