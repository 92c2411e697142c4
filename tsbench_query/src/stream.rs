//! Framed binary stream of [`Query`] values.
//!
//! A stream starts with [`STREAM_IDENTIFIER`], followed by one frame per query:
//!
//! ```text
//! +----------------+----------------+------------------------+
//! | len: u32 (BE)  | crc32: u32 (BE)| bitcode payload (len)  |
//! +----------------+----------------+------------------------+
//! ```
//!
//! The checksum covers the payload bytes only.

use std::io::{self, Read, Write};

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use thiserror::Error;

use crate::Query;

/// The first bytes written into a query stream to identify it and its version.
pub const STREAM_IDENTIFIER: &[u8] = b"tsbq.001";

/// Frames larger than this are rejected rather than allocated.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid query stream identifier")]
    InvalidStreamIdentifier,

    #[error("crc32 checksum mismatch in query frame {frame}")]
    Crc32Mismatch { frame: u64 },

    #[error("query frame {frame} is truncated")]
    Truncated { frame: u64 },

    #[error("query frame {frame} has length {len} which exceeds the maximum of {MAX_FRAME_LEN}")]
    FrameTooLarge { frame: u64, len: usize },

    #[error("failed to encode or decode query: {0}")]
    Bitcode(#[from] bitcode::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Writes queries into a framed stream
#[derive(Debug)]
pub struct QueryWriter<W: Write> {
    inner: W,
    written: u64,
}

impl<W: Write> QueryWriter<W> {
    /// Create a [`QueryWriter`], writing the stream identifier immediately
    pub fn new(mut inner: W) -> Result<Self> {
        inner.write_all(STREAM_IDENTIFIER)?;
        Ok(Self { inner, written: 0 })
    }

    pub fn write(&mut self, query: &Query) -> Result<()> {
        let data = bitcode::serialize(query)?;
        if data.len() > MAX_FRAME_LEN {
            return Err(Error::FrameTooLarge {
                frame: self.written,
                len: data.len(),
            });
        }

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&data);
        let checksum = hasher.finalize();

        self.inner.write_u32::<BigEndian>(data.len() as u32)?;
        self.inner.write_u32::<BigEndian>(checksum)?;
        self.inner.write_all(&data)?;
        self.written += 1;
        Ok(())
    }

    /// Number of queries written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush and hand back the underlying writer
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Reads queries back out of a framed stream
#[derive(Debug)]
pub struct QueryReader<R: Read> {
    inner: R,
    read: u64,
}

impl<R: Read> QueryReader<R> {
    /// Create a [`QueryReader`], verifying the stream identifier
    pub fn new(mut inner: R) -> Result<Self> {
        let mut identifier = [0u8; STREAM_IDENTIFIER.len()];
        match inner.read_exact(&mut identifier) {
            Ok(()) => (),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(Error::InvalidStreamIdentifier);
            }
            Err(e) => return Err(e.into()),
        }
        if identifier != STREAM_IDENTIFIER {
            return Err(Error::InvalidStreamIdentifier);
        }
        Ok(Self { inner, read: 0 })
    }

    /// Read the next query, returning `None` at a clean end of stream
    pub fn next_query(&mut self) -> Result<Option<Query>> {
        let frame = self.read;
        let mut header = [0u8; 8];
        match read_full(&mut self.inner, &mut header)? {
            0 => return Ok(None),
            8 => (),
            _ => return Err(Error::Truncated { frame }),
        }

        let len = BigEndian::read_u32(&header[..4]) as usize;
        let expected_checksum = BigEndian::read_u32(&header[4..]);
        if len > MAX_FRAME_LEN {
            return Err(Error::FrameTooLarge { frame, len });
        }

        let mut data = vec![0u8; len];
        if read_full(&mut self.inner, &mut data)? != len {
            return Err(Error::Truncated { frame });
        }

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&data);
        if hasher.finalize() != expected_checksum {
            return Err(Error::Crc32Mismatch { frame });
        }

        let query: Query = bitcode::deserialize(&data)?;
        self.read += 1;
        Ok(Some(query))
    }

    /// Number of queries read so far
    pub fn read(&self) -> u64 {
        self.read
    }
}

impl<R: Read> Iterator for QueryReader<R> {
    type Item = Result<Query>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_query().transpose()
    }
}

/// Fill as much of `buf` as the reader can provide, returning the number of bytes read.
///
/// Unlike [`Read::read_exact`] this tells a clean end of stream (zero bytes) apart from a
/// partially written frame.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{Payload, SqlQuery};

    fn sql_query(label: &str, sql: &str) -> Query {
        let mut q = Query::new(Payload::Sql(SqlQuery {
            hypertable: "cpu".to_string(),
            sql: sql.to_string(),
        }));
        q.set_human_label(label);
        q.set_human_description(format!("{label}: 2016-01-01T00:00:00Z"));
        q.set_affinity_key(Some("host_1".to_string()));
        q
    }

    fn encode(queries: &[Query]) -> Vec<u8> {
        let mut writer = QueryWriter::new(Vec::new()).unwrap();
        for q in queries {
            writer.write(q).unwrap();
        }
        assert_eq!(writer.written(), queries.len() as u64);
        writer.finish().unwrap()
    }

    #[test]
    fn stream_preserves_queries_in_order() {
        let queries = vec![
            sql_query(
                "TimescaleDB last row per host",
                "SELECT DISTINCT ON (hostname) *",
            ),
            sql_query(
                "TimescaleDB CPU over threshold, all hosts",
                "SELECT * FROM cpu",
            ),
        ];
        let bytes = encode(&queries);

        let reader = QueryReader::new(bytes.as_slice()).unwrap();
        let decoded = reader.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(decoded, queries);
    }

    #[test]
    fn empty_stream_has_no_queries() {
        let bytes = encode(&[]);
        let mut reader = QueryReader::new(bytes.as_slice()).unwrap();
        assert!(reader.next_query().unwrap().is_none());
        assert_eq!(reader.read(), 0);
    }

    #[test]
    fn rejects_unknown_identifier() {
        let err = QueryReader::new(&b"gob.0001"[..]).unwrap_err();
        assert!(matches!(err, Error::InvalidStreamIdentifier));

        let err = QueryReader::new(&b"ts"[..]).unwrap_err();
        assert!(matches!(err, Error::InvalidStreamIdentifier));
    }

    #[test]
    fn detects_corrupted_payload() {
        let mut bytes = encode(&[sql_query("label", "SELECT 1")]);
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;

        let mut reader = QueryReader::new(bytes.as_slice()).unwrap();
        let err = reader.next_query().unwrap_err();
        assert!(matches!(err, Error::Crc32Mismatch { frame: 0 }));
    }

    #[test]
    fn detects_truncated_frame() {
        let bytes = encode(&[sql_query("a", "SELECT 1"), sql_query("b", "SELECT 2")]);
        let truncated = &bytes[..bytes.len() - 3];

        let mut reader = QueryReader::new(truncated).unwrap();
        assert!(reader.next_query().unwrap().is_some());
        let err = reader.next_query().unwrap_err();
        assert!(matches!(err, Error::Truncated { frame: 1 }));
    }

    #[test]
    fn rejects_oversized_frame_header() {
        let mut bytes = STREAM_IDENTIFIER.to_vec();
        bytes.extend_from_slice(&u32::MAX.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());

        let mut reader = QueryReader::new(bytes.as_slice()).unwrap();
        let err = reader.next_query().unwrap_err();
        assert!(matches!(err, Error::FrameTooLarge { frame: 0, .. }));
    }
}
