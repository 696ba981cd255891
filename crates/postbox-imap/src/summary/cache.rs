//! Summary cache codec.
//!
//! Everything is big-endian and fixed width. Strings carry a `u32` byte
//! length. The IMAP layouts append their extra fields after the base layout,
//! so a base reader can still parse the leading part of an IMAP record.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{Error, Result};

/// Layout version written into every header.
pub const CACHE_VERSION: u32 = 1;

/// A value with a fixed on-disk layout.
pub trait CacheRecord: Sized {
    /// Appends the encoded value.
    fn encode(&self, buf: &mut BytesMut);

    /// Decodes one value from the front of `buf`.
    ///
    /// # Errors
    ///
    /// [`Error::Cache`] if `buf` is truncated or malformed.
    fn decode(buf: &mut Bytes) -> Result<Self>;
}

/// Header shared by every summary cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BaseSummaryHeader {
    /// Layout version.
    pub version: u32,
    /// Summary-level flags.
    pub flags: u32,
    /// Next UID the folder will assign.
    pub nextuid: u32,
    /// Unix time of the save.
    pub time: i64,
    /// Number of records that follow.
    pub count: u32,
}

impl CacheRecord for BaseSummaryHeader {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.version);
        buf.put_u32(self.flags);
        buf.put_u32(self.nextuid);
        buf.put_i64(self.time);
        buf.put_u32(self.count);
    }

    fn decode(buf: &mut Bytes) -> Result<Self> {
        need(buf, 24, "summary header")?;
        let header = Self {
            version: buf.get_u32(),
            flags: buf.get_u32(),
            nextuid: buf.get_u32(),
            time: buf.get_i64(),
            count: buf.get_u32(),
        };
        if header.version != CACHE_VERSION {
            return Err(Error::Cache(format!(
                "unsupported cache version {}",
                header.version
            )));
        }
        Ok(header)
    }
}

/// Base header plus the folder's UIDVALIDITY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImapSummaryHeader {
    /// Shared header fields.
    pub base: BaseSummaryHeader,
    /// UIDVALIDITY the records belong to, 0 if unknown.
    pub uidvalidity: u32,
}

impl CacheRecord for ImapSummaryHeader {
    fn encode(&self, buf: &mut BytesMut) {
        self.base.encode(buf);
        buf.put_u32(self.uidvalidity);
    }

    fn decode(buf: &mut Bytes) -> Result<Self> {
        let base = BaseSummaryHeader::decode(buf)?;
        need(buf, 4, "uidvalidity")?;
        Ok(Self {
            base,
            uidvalidity: buf.get_u32(),
        })
    }
}

pub(crate) fn need(buf: &Bytes, len: usize, what: &str) -> Result<()> {
    if buf.remaining() < len {
        return Err(Error::Cache(format!(
            "truncated {what}: need {len} bytes, have {}",
            buf.remaining()
        )));
    }
    Ok(())
}

pub(crate) fn put_string(buf: &mut BytesMut, s: &str) {
    let len = u32::try_from(s.len()).unwrap_or(u32::MAX);
    buf.put_u32(len);
    buf.put_slice(&s.as_bytes()[..len as usize]);
}

pub(crate) fn get_string(buf: &mut Bytes) -> Result<String> {
    need(buf, 4, "string length")?;
    let len = buf.get_u32() as usize;
    need(buf, len, "string")?;
    let raw = buf.split_to(len);
    String::from_utf8(raw.to_vec()).map_err(|_| Error::Cache("string is not UTF-8".to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_imap_header_layout() {
        let header = ImapSummaryHeader {
            base: BaseSummaryHeader {
                version: CACHE_VERSION,
                flags: 0,
                nextuid: 1201,
                time: 1_700_000_000,
                count: 7,
            },
            uidvalidity: 3_857_529_045,
        };
        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        assert_eq!(buf.len(), 28);
        assert_eq!(&buf[24..], &3_857_529_045u32.to_be_bytes());

        let mut bytes = buf.freeze();
        assert_eq!(ImapSummaryHeader::decode(&mut bytes).unwrap(), header);
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_base_reader_ignores_extension() {
        let header = ImapSummaryHeader {
            base: BaseSummaryHeader {
                version: CACHE_VERSION,
                count: 2,
                ..BaseSummaryHeader::default()
            },
            uidvalidity: 9,
        };
        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        let mut bytes = buf.freeze();
        assert_eq!(BaseSummaryHeader::decode(&mut bytes).unwrap(), header.base);
        assert_eq!(bytes.len(), 4);
    }

    #[test]
    fn test_truncated_header() {
        let mut bytes = Bytes::from_static(&[0, 0, 0, 1, 0, 0]);
        assert!(matches!(
            BaseSummaryHeader::decode(&mut bytes),
            Err(Error::Cache(_))
        ));
    }

    #[test]
    fn test_wrong_version() {
        let mut buf = BytesMut::new();
        BaseSummaryHeader {
            version: 99,
            ..BaseSummaryHeader::default()
        }
        .encode(&mut buf);
        assert!(matches!(
            BaseSummaryHeader::decode(&mut buf.freeze()),
            Err(Error::Cache(_))
        ));
    }

    #[test]
    fn test_strings() {
        let mut buf = BytesMut::new();
        put_string(&mut buf, "");
        put_string(&mut buf, "Gr\u{fc}\u{df}e");
        let mut bytes = buf.freeze();
        assert_eq!(get_string(&mut bytes).unwrap(), "");
        assert_eq!(get_string(&mut bytes).unwrap(), "Gr\u{fc}\u{df}e");
        assert!(matches!(get_string(&mut bytes), Err(Error::Cache(_))));
    }
}
