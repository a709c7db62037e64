//! Length-framed record codec used by log segments.
//!
//! Each record on disk is `[u32 length (LE)][msgpack payload]`. Framing by
//! length (rather than the source's whole-segment re-serialization) lets
//! `Segment::append` write exactly one record with one `write_all` call.

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

use crate::actions::Action;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub action: Action,
}

impl Record {
    pub fn new(action: Action) -> Self {
        Record { action }
    }

    pub fn encode(&self) -> io::Result<Vec<u8>> {
        let payload = rmp_serde::to_vec(self).map_err(to_io_error)?;
        let mut framed = Vec::with_capacity(4 + payload.len());
        framed.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        framed.extend_from_slice(&payload);
        Ok(framed)
    }

    pub fn write_to(&self, w: &mut impl Write) -> io::Result<()> {
        w.write_all(&self.encode()?)
    }

    /// Reads one length-framed record from `r`. Returns `Ok(None)` at a
    /// clean EOF between records; any other read failure (including a
    /// truncated trailing record from a crash mid-append) is an error.
    pub fn read_from(r: &mut impl Read) -> io::Result<Option<Record>> {
        let mut len_buf = [0u8; 4];
        match read_exact_or_eof(r, &mut len_buf)? {
            false => return Ok(None),
            true => {}
        }
        let len = u32::from_le_bytes(len_buf) as usize;
        let mut payload = vec![0u8; len];
        r.read_exact(&mut payload)?;
        let record: Record = rmp_serde::from_slice(&payload).map_err(to_io_error)?;
        Ok(Some(record))
    }
}

/// Like `read_exact`, but returns `Ok(false)` if the stream is already at
/// EOF before any byte is read, instead of erroring.
fn read_exact_or_eof(r: &mut impl Read, buf: &mut [u8]) -> io::Result<bool> {
    let mut read = 0;
    while read < buf.len() {
        match r.read(&mut buf[read..]) {
            Ok(0) => {
                if read == 0 {
                    return Ok(false);
                }
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated record header"));
            }
            Ok(n) => read += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

fn to_io_error(e: impl std::error::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Action;

    #[test]
    fn encode_then_read_round_trip() {
        let record = Record::new(Action::SetString { key: "k".to_string(), value: b"v".to_vec() });
        let mut buf = Vec::new();
        record.write_to(&mut buf).unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let decoded = Record::read_from(&mut cursor).unwrap().unwrap();
        match decoded.action {
            Action::SetString { key, value } => {
                assert_eq!(key, "k");
                assert_eq!(value, b"v");
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn read_from_empty_stream_returns_none() {
        let mut cursor = std::io::Cursor::new(Vec::new());
        assert!(Record::read_from(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn multiple_records_read_in_order() {
        let mut buf = Vec::new();
        Record::new(Action::SetString { key: "a".to_string(), value: vec![1] }).write_to(&mut buf).unwrap();
        Record::new(Action::SetString { key: "b".to_string(), value: vec![2] }).write_to(&mut buf).unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let first = Record::read_from(&mut cursor).unwrap().unwrap();
        let second = Record::read_from(&mut cursor).unwrap().unwrap();
        assert!(matches!(first.action, Action::SetString { key, .. } if key == "a"));
        assert!(matches!(second.action, Action::SetString { key, .. } if key == "b"));
        assert!(Record::read_from(&mut cursor).unwrap().is_none());
    }
}
