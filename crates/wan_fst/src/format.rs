//! Shared block/varint plumbing for the FST codec.
//!
//! FST is laid out as a sequence of length-prefixed blocks: a one-byte block
//! type, an 8-byte big-endian section length (counted from the length field
//! itself, i.e. `8 + payload.len()`), then the payload. This mirrors the
//! block framing the teacher's own hand-rolled FST writer uses
//! (`aion_sim::fst`), except every section here is also *readable*: the
//! teacher only ever writes FST, this workspace additionally parses it back.
//!
//! No external `libfst`/LZ4 binding is available to this workspace (see
//! `DESIGN.md`), so every compressed section uses `flate2`'s zlib/gzip
//! codecs, exactly the crates the teacher already reaches for.

use std::io::{Read, Write};

use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;

use crate::error::FstError;
use wan_core::{ScopeKind, SignalKind};

/// Maps a [`ScopeKind`] to its FST hierarchy tag byte.
pub fn scope_kind_to_u8(kind: ScopeKind) -> u8 {
    match kind {
        ScopeKind::Module => 0,
        ScopeKind::Task => 1,
        ScopeKind::Function => 2,
        ScopeKind::Block => 3,
    }
}

/// Inverse of [`scope_kind_to_u8`].
pub fn scope_kind_from_u8(b: u8) -> Result<ScopeKind, FstError> {
    match b {
        0 => Ok(ScopeKind::Module),
        1 => Ok(ScopeKind::Task),
        2 => Ok(ScopeKind::Function),
        3 => Ok(ScopeKind::Block),
        other => Err(FstError::BadHierarchyTag(other)),
    }
}

/// Maps a [`SignalKind`] to its FST hierarchy tag byte.
///
/// Values are chosen disjoint from [`TAG_SCOPE`]/[`TAG_UPSCOPE`] so a single
/// tag byte can discriminate scope-open/scope-close/var entries.
pub fn signal_kind_to_u8(kind: SignalKind) -> u8 {
    match kind {
        SignalKind::Register => 0,
        SignalKind::Wire => 1,
        SignalKind::Integer => 2,
    }
}

/// Inverse of [`signal_kind_to_u8`].
pub fn signal_kind_from_u8(b: u8) -> Result<SignalKind, FstError> {
    match b {
        0 => Ok(SignalKind::Register),
        1 => Ok(SignalKind::Wire),
        2 => Ok(SignalKind::Integer),
        other => Err(FstError::BadHierarchyTag(other)),
    }
}

/// FST block type tags.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum BlockType {
    /// Fixed-layout metadata: time range, timescale, version/date/comment.
    Header = 0,
    /// Value-change data: the time table and per-signal change stream.
    VcData = 1,
    /// Per-signal bit widths.
    Geometry = 3,
    /// The scope/signal hierarchy tree.
    Hierarchy = 4,
}

impl BlockType {
    /// Maps a raw tag byte back to a `BlockType`.
    pub fn from_u8(b: u8) -> Result<Self, FstError> {
        match b {
            0 => Ok(BlockType::Header),
            1 => Ok(BlockType::VcData),
            3 => Ok(BlockType::Geometry),
            4 => Ok(BlockType::Hierarchy),
            other => Err(FstError::BadBlockType(other)),
        }
    }
}

/// Hierarchy tag byte for a scope-open entry.
pub const TAG_SCOPE: u8 = 0xFE;
/// Hierarchy tag byte for a scope-close entry.
pub const TAG_UPSCOPE: u8 = 0xFF;

/// Writes one varint (unsigned LEB128) to `buf`.
pub fn write_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Writes a null-terminated UTF-8 string.
pub fn write_cstr(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
}

/// Writes a block's framing (type byte + big-endian section length) followed
/// by its payload.
pub fn write_block<W: Write>(out: &mut W, kind: BlockType, payload: &[u8]) -> std::io::Result<()> {
    out.write_all(&[kind as u8])?;
    let section_len = 8u64 + payload.len() as u64;
    out.write_all(&section_len.to_be_bytes())?;
    out.write_all(payload)?;
    Ok(())
}

/// Compresses `data` with zlib (used for geometry, time tables, and the
/// change stream).
pub fn compress_zlib(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data)?;
    enc.finish()
}

/// Decompresses a zlib stream.
pub fn decompress_zlib(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut dec = ZlibDecoder::new(data);
    let mut out = Vec::new();
    dec.read_to_end(&mut out)?;
    Ok(out)
}

/// Compresses `data` with gzip (used for the hierarchy block).
pub fn compress_gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data)?;
    enc.finish()
}

/// Decompresses a gzip stream.
pub fn decompress_gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut dec = GzDecoder::new(data);
    let mut out = Vec::new();
    dec.read_to_end(&mut out)?;
    Ok(out)
}

/// A cursor over an in-memory byte slice with the primitive reads the FST
/// codec needs: fixed-width big-endian integers, varints, null-terminated
/// strings, and raw byte runs.
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Wraps `data` for sequential reading from offset 0.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current byte offset, for error reporting.
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// True once every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn need(&self, n: usize) -> Result<(), FstError> {
        if self.pos + n > self.data.len() {
            Err(FstError::Truncated {
                offset: self.pos,
                expected: n,
            })
        } else {
            Ok(())
        }
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self) -> Result<u8, FstError> {
        self.need(1)?;
        let b = self.data[self.pos];
        self.pos += 1;
        Ok(b)
    }

    /// Reads a big-endian `u64`.
    pub fn read_u64_be(&mut self) -> Result<u64, FstError> {
        self.need(8)?;
        let bytes: [u8; 8] = self.data[self.pos..self.pos + 8].try_into().unwrap();
        self.pos += 8;
        Ok(u64::from_be_bytes(bytes))
    }

    /// Reads exactly `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], FstError> {
        self.need(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Reads an unsigned LEB128 varint.
    pub fn read_varint(&mut self) -> Result<u64, FstError> {
        let mut result: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            result |= ((byte & 0x7F) as u64) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        Ok(result)
    }

    /// Reads a null-terminated UTF-8 string.
    pub fn read_cstr(&mut self) -> Result<String, FstError> {
        let start = self.pos;
        loop {
            let b = self.read_u8()?;
            if b == 0 {
                break;
            }
        }
        let slice = &self.data[start..self.pos - 1];
        std::str::from_utf8(slice)
            .map(|s| s.to_string())
            .map_err(|_| FstError::BadUtf8)
    }
}

/// Reads one block's framing and payload from `r`, positioned at the block's
/// type byte. Returns `None` at a clean end-of-stream (zero bytes read for
/// the type byte).
pub fn read_block<R: Read>(r: &mut R) -> Result<Option<(BlockType, Vec<u8>)>, FstError> {
    let mut type_byte = [0u8; 1];
    let n = r.read(&mut type_byte)?;
    if n == 0 {
        return Ok(None);
    }
    let kind = BlockType::from_u8(type_byte[0])?;
    let mut len_bytes = [0u8; 8];
    r.read_exact(&mut len_bytes)?;
    let section_len = u64::from_be_bytes(len_bytes);
    let payload_len = section_len.saturating_sub(8) as usize;
    let mut payload = vec![0u8; payload_len];
    r.read_exact(&mut payload)?;
    Ok(Some((kind, payload)))
}
