/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Atomic snapshot primitives.
//!
//! Fixed-width little-endian integers and floats, plus length-prefixed
//! strings, sequences, maps, and sets built on top of them. Sequence and
//! string prefixes are 64-bit words; vertex indices and relation-type
//! masks travel as 32 bits (the engine does not support graphs with more
//! than 2³² vertices), weights as 32-bit floats.
//!
//! Short reads are reported as
//! [`TruncatedSnapshot`](crate::error::KbError::TruncatedSnapshot) with
//! the section being decoded.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Read, Write};

use crate::error::KbError;

fn fill<R: Read>(reader: &mut R, buf: &mut [u8], context: &'static str) -> Result<(), KbError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => KbError::TruncatedSnapshot { context },
        _ => KbError::Io(e),
    })
}

pub(crate) fn read_word<R: Read>(reader: &mut R, context: &'static str) -> Result<u64, KbError> {
    let mut buf = [0; 8];
    fill(reader, &mut buf, context)?;
    Ok(u64::from_le_bytes(buf))
}

pub(crate) fn write_word<W: Write>(writer: &mut W, value: u64) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub(crate) fn read_u32<R: Read>(reader: &mut R, context: &'static str) -> Result<u32, KbError> {
    let mut buf = [0; 4];
    fill(reader, &mut buf, context)?;
    Ok(u32::from_le_bytes(buf))
}

pub(crate) fn write_u32<W: Write>(writer: &mut W, value: u32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub(crate) fn read_f32<R: Read>(reader: &mut R, context: &'static str) -> Result<f32, KbError> {
    let mut buf = [0; 4];
    fill(reader, &mut buf, context)?;
    Ok(f32::from_le_bytes(buf))
}

pub(crate) fn write_f32<W: Write>(writer: &mut W, value: f32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub(crate) fn read_string<R: Read>(
    reader: &mut R,
    context: &'static str,
) -> Result<String, KbError> {
    let len = read_word(reader, context)? as usize;
    let mut buf = vec![0; len];
    fill(reader, &mut buf, context)?;
    String::from_utf8(buf)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
}

pub(crate) fn write_string<W: Write>(writer: &mut W, value: &str) -> io::Result<()> {
    write_word(writer, value.len() as u64)?;
    writer.write_all(value.as_bytes())
}

/// Reads a sequence of 32-bit vertex or edge indices.
pub(crate) fn read_index_seq<R: Read>(
    reader: &mut R,
    context: &'static str,
) -> Result<Vec<usize>, KbError> {
    let len = read_word(reader, context)? as usize;
    let mut seq = Vec::with_capacity(len);
    for _ in 0..len {
        seq.push(read_u32(reader, context)? as usize);
    }
    Ok(seq)
}

pub(crate) fn write_index_seq<W: Write>(writer: &mut W, seq: &[usize]) -> io::Result<()> {
    write_word(writer, seq.len() as u64)?;
    for &value in seq {
        debug_assert!(value <= u32::MAX as usize);
        write_u32(writer, value as u32)?;
    }
    Ok(())
}

pub(crate) fn read_string_seq<R: Read>(
    reader: &mut R,
    context: &'static str,
) -> Result<Vec<String>, KbError> {
    let len = read_word(reader, context)? as usize;
    let mut seq = Vec::with_capacity(len);
    for _ in 0..len {
        seq.push(read_string(reader, context)?);
    }
    Ok(seq)
}

pub(crate) fn write_string_seq<W: Write>(writer: &mut W, seq: &[String]) -> io::Result<()> {
    write_word(writer, seq.len() as u64)?;
    for value in seq {
        write_string(writer, value)?;
    }
    Ok(())
}

pub(crate) fn read_string_set<R: Read>(
    reader: &mut R,
    context: &'static str,
) -> Result<BTreeSet<String>, KbError> {
    let len = read_word(reader, context)? as usize;
    let mut set = BTreeSet::new();
    for _ in 0..len {
        set.insert(read_string(reader, context)?);
    }
    Ok(set)
}

pub(crate) fn write_string_set<W: Write>(
    writer: &mut W,
    set: &BTreeSet<String>,
) -> io::Result<()> {
    write_word(writer, set.len() as u64)?;
    for value in set {
        write_string(writer, value)?;
    }
    Ok(())
}

/// Reads a name-to-index mapping; indices are 32 bits on the wire.
pub(crate) fn read_string_map<R: Read>(
    reader: &mut R,
    context: &'static str,
) -> Result<BTreeMap<String, usize>, KbError> {
    let len = read_word(reader, context)? as usize;
    let mut map = BTreeMap::new();
    for _ in 0..len {
        let key = read_string(reader, context)?;
        let value = read_u32(reader, context)? as usize;
        map.insert(key, value);
    }
    Ok(map)
}

pub(crate) fn write_string_map<W: Write>(
    writer: &mut W,
    map: &BTreeMap<String, usize>,
) -> io::Result<()> {
    write_word(writer, map.len() as u64)?;
    for (key, &value) in map {
        write_string(writer, key)?;
        debug_assert!(value <= u32::MAX as usize);
        write_u32(writer, value as u32)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_round_trip() {
        let mut buf = Vec::new();
        write_word(&mut buf, 0x110501).unwrap();
        write_string(&mut buf, "hypernym").unwrap();
        write_index_seq(&mut buf, &[0, 3, 5]).unwrap();
        write_f32(&mut buf, 2.5).unwrap();

        let mut cursor = Cursor::new(buf);
        assert_eq!(read_word(&mut cursor, "t").unwrap(), 0x110501);
        assert_eq!(read_string(&mut cursor, "t").unwrap(), "hypernym");
        assert_eq!(read_index_seq(&mut cursor, "t").unwrap(), vec![0, 3, 5]);
        assert_eq!(read_f32(&mut cursor, "t").unwrap(), 2.5);
    }

    #[test]
    fn test_short_read() {
        let mut buf = Vec::new();
        write_word(&mut buf, 17).unwrap();
        buf.truncate(3);
        assert!(matches!(
            read_word(&mut Cursor::new(buf), "sizes"),
            Err(KbError::TruncatedSnapshot { context: "sizes" })
        ));
    }
}
