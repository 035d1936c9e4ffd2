//! Minimal QuickTime / ISO base media atom reader.
//!
//! Only walks far enough to find `moov/mvhd` and read the movie creation time.

use std::io::{self, Read, Seek, SeekFrom};

/// Seconds between 1904-01-01 (QuickTime epoch) and 1970-01-01
const QUICKTIME_EPOCH_OFFSET: i64 = 2_082_844_800;

#[derive(Debug)]
struct AtomHeader {
    kind: [u8; 4],
    start: u64,
    header_len: u64,
    size: u64,
}

impl AtomHeader {
    fn end(&self) -> u64 {
        self.start + self.size
    }

    fn payload_start(&self) -> u64 {
        self.start + self.header_len
    }
}

fn malformed(message: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.into())
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_be_bytes(buf))
}

/// Read the atom header at `pos`. Returns `None` when `pos` is exactly `end`.
fn read_atom_header<R: Read + Seek>(
    reader: &mut R,
    pos: u64,
    end: u64,
) -> io::Result<Option<AtomHeader>> {
    if pos == end {
        return Ok(None);
    }
    if end - pos < 8 {
        return Err(malformed(format!("truncated atom header at offset {pos}")));
    }

    reader.seek(SeekFrom::Start(pos))?;
    let size32 = read_u32(reader)?;
    let mut kind = [0u8; 4];
    reader.read_exact(&mut kind)?;

    if !kind.iter().all(|b| b.is_ascii_alphanumeric() || *b == b' ') {
        return Err(malformed(format!("invalid atom type at offset {pos}")));
    }

    let (size, header_len) = match size32 {
        0 => (end - pos, 8),
        1 => (read_u64(reader)?, 16),
        n => (u64::from(n), 8),
    };

    // `pos < end` here, so the remaining length cannot underflow
    if size < header_len || size > end - pos {
        return Err(malformed(format!(
            "atom '{}' at offset {pos} has invalid size {size}",
            String::from_utf8_lossy(&kind)
        )));
    }

    Ok(Some(AtomHeader {
        kind,
        start: pos,
        header_len,
        size,
    }))
}

fn read_mvhd_creation<R: Read + Seek>(reader: &mut R, mvhd: &AtomHeader) -> io::Result<u64> {
    let payload_len = mvhd.size - mvhd.header_len;
    reader.seek(SeekFrom::Start(mvhd.payload_start()))?;

    let version_and_flags = read_u32(reader)?;
    let version = version_and_flags >> 24;
    match version {
        0 if payload_len >= 8 => Ok(u64::from(read_u32(reader)?)),
        1 if payload_len >= 12 => read_u64(reader),
        0 | 1 => Err(malformed("truncated mvhd atom")),
        v => Err(malformed(format!("unsupported mvhd version {v}"))),
    }
}

/// Find the movie header creation time, as Unix seconds.
///
/// `Ok(None)` means the container has no movie header or the creation time is unset.
pub fn movie_creation_time<R: Read + Seek>(reader: &mut R, len: u64) -> io::Result<Option<i64>> {
    let mut pos = 0;
    while let Some(atom) = read_atom_header(reader, pos, len)? {
        if &atom.kind == b"moov" {
            let mut child_pos = atom.payload_start();
            while let Some(child) = read_atom_header(reader, child_pos, atom.end())? {
                if &child.kind == b"mvhd" {
                    let created = read_mvhd_creation(reader, &child)?;
                    if created == 0 {
                        return Ok(None);
                    }
                    let created = i64::try_from(created)
                        .map_err(|_| malformed("mvhd creation time out of range"))?;
                    return Ok(Some(created - QUICKTIME_EPOCH_OFFSET));
                }
                child_pos = child.end();
            }
            return Ok(None);
        }
        pos = atom.end();
    }
    Ok(None)
}
