//! FST parsing: the full hierarchy + value-change reader and the restricted
//! quick-times scan.
//!
//! Blocks are consumed in file order. `Hierarchy` populates the scope tree
//! and assigns each handle a [`SignalIdx`]; `Geometry` recovers per-handle
//! widths (redundant with the hierarchy's own width field, kept for layout
//! parity with the teacher's format); `VcData` replays the time table and
//! change stream against whichever state the earlier blocks produced.

use std::io::Read;

use wan_core::{SignalIdx, SignalKind, Waveform};

use crate::error::FstError;
use crate::format::{
    decompress_gzip, decompress_zlib, read_block, scope_kind_from_u8, signal_kind_from_u8,
    ByteReader, BlockType, TAG_SCOPE, TAG_UPSCOPE,
};

struct Reader {
    waveform: Waveform,
    scope_path: Vec<String>,
    /// `handle_to_idx[h - 1]` is the signal registered for handle `h`.
    handle_to_idx: Vec<SignalIdx>,
}

impl Reader {
    fn new() -> Self {
        Self {
            waveform: Waveform::new(),
            scope_path: Vec::new(),
            handle_to_idx: Vec::new(),
        }
    }

    fn current_full_name(&self) -> String {
        self.scope_path.last().cloned().unwrap_or_default()
    }

    fn enter_scope(&mut self, kind: wan_core::ScopeKind, name: &str) {
        let parent = self.current_full_name();
        {
            let parent_scope = self
                .waveform
                .root_mut()
                .find_scope_mut(&parent)
                .expect("parent scope exists");
            parent_scope.add_scope(name, kind);
        }
        let full = if parent.is_empty() {
            name.to_string()
        } else {
            format!("{parent}.{name}")
        };
        self.scope_path.push(full);
    }

    fn leave_scope(&mut self) {
        self.scope_path.pop();
    }

    fn declare_var(
        &mut self,
        kind: SignalKind,
        width: u32,
        name: &str,
        alias: u64,
    ) -> Result<(), FstError> {
        let scope = self.current_full_name();
        if alias == 0 {
            let idx = match kind {
                SignalKind::Register => self.waveform.add_register(&scope, name, width),
                SignalKind::Wire => self.waveform.add_wire(&scope, name, width),
                SignalKind::Integer => self.waveform.add_integer(&scope, name, width),
            }?;
            self.handle_to_idx.push(idx);
        } else {
            let existing = *self
                .handle_to_idx
                .get((alias - 1) as usize)
                .ok_or(FstError::DanglingFstAlias { handle: alias })?;
            match kind {
                SignalKind::Register => self.waveform.add_register_alias(&scope, name, width, existing),
                SignalKind::Wire => self.waveform.add_wire_alias(&scope, name, width, existing),
                SignalKind::Integer => self.waveform.add_integer_alias(&scope, name, width, existing),
            }?;
        }
        Ok(())
    }
}

fn parse_hierarchy_entries(raw: &[u8], state: &mut Reader) -> Result<(), FstError> {
    let mut r = ByteReader::new(raw);
    while !r.is_empty() {
        let tag = r.read_u8()?;
        match tag {
            TAG_SCOPE => {
                let kind_byte = r.read_u8()?;
                let kind = scope_kind_from_u8(kind_byte)?;
                let name = r.read_cstr()?;
                state.enter_scope(kind, &name);
            }
            TAG_UPSCOPE => state.leave_scope(),
            other => {
                let kind = signal_kind_from_u8(other)?;
                let _direction = r.read_u8()?;
                let name = r.read_cstr()?;
                let width = r.read_varint()? as u32;
                let alias = r.read_varint()?;
                state.declare_var(kind, width, &name, alias)?;
            }
        }
    }
    Ok(())
}

fn parse_header_block(payload: &[u8], waveform: &mut Waveform) -> Result<(), FstError> {
    let mut r = ByteReader::new(payload);
    let start = r.read_u64_be()?;
    let end = r.read_u64_be()?;
    let time_zero = r.read_u64_be()?;
    let exponent = r.read_u8()? as i8;
    let version = r.read_cstr()?;
    let date = r.read_cstr()?;
    let comment = r.read_cstr()?;
    waveform.set_start_time(start);
    waveform.set_end_time(end);
    waveform.set_time_zero(time_zero);
    waveform.set_time_scale(exponent);
    waveform.set_version(version);
    waveform.set_date(date);
    waveform.set_comment(comment);
    Ok(())
}

fn header_exponent(payload: &[u8]) -> Result<i8, FstError> {
    let mut r = ByteReader::new(payload);
    let _start = r.read_u64_be()?;
    let _end = r.read_u64_be()?;
    let _time_zero = r.read_u64_be()?;
    Ok(r.read_u8()? as i8)
}

fn parse_hierarchy_block(payload: &[u8], state: &mut Reader) -> Result<(), FstError> {
    let mut r = ByteReader::new(payload);
    let _uncompressed_len = r.read_u64_be()?;
    let compressed = r.read_bytes(payload.len() - r.offset())?;
    let raw = decompress_gzip(compressed)?;
    parse_hierarchy_entries(&raw, state)
}

fn parse_geometry_block(payload: &[u8]) -> Result<Vec<u32>, FstError> {
    let mut r = ByteReader::new(payload);
    let _uncompressed_len = r.read_u64_be()?;
    let count = r.read_u64_be()?;
    let compressed = r.read_bytes(payload.len() - r.offset())?;
    let raw = decompress_zlib(compressed)?;
    let mut rr = ByteReader::new(&raw);
    let mut widths = Vec::with_capacity(count as usize);
    for _ in 0..count {
        widths.push(rr.read_varint()? as u32);
    }
    Ok(widths)
}

/// Decodes the delta-coded, zlib-compressed time table embedded at the
/// reader's current position, consuming exactly its length-prefixed bytes.
fn read_time_table(r: &mut ByteReader<'_>, num_times: u64) -> Result<Vec<u64>, FstError> {
    let _uncompressed_len = r.read_u64_be()?;
    let compressed_len = r.read_u64_be()?;
    let compressed = r.read_bytes(compressed_len as usize)?;
    let raw = decompress_zlib(compressed)?;
    let mut tr = ByteReader::new(&raw);
    let mut times = Vec::with_capacity(num_times as usize);
    let mut acc = 0u64;
    for _ in 0..num_times {
        acc += tr.read_varint()?;
        times.push(acc);
    }
    Ok(times)
}

fn parse_vcdata_block(
    payload: &[u8],
    waveform: &mut Waveform,
    handle_to_idx: &[SignalIdx],
    widths: &[u32],
) -> Result<(), FstError> {
    let mut r = ByteReader::new(payload);
    let _start = r.read_u64_be()?;
    let _end = r.read_u64_be()?;
    let num_times = r.read_u64_be()?;
    let times = read_time_table(&mut r, num_times)?;
    waveform.add_times(times.iter().copied())?;

    let _num_signals = r.read_u64_be()?;
    let _change_uncompressed_len = r.read_u64_be()?;
    let change_compressed_len = r.read_u64_be()?;
    let change_compressed = r.read_bytes(change_compressed_len as usize)?;
    let change_raw = decompress_zlib(change_compressed)?;
    let mut cr = ByteReader::new(&change_raw);

    for &t in &times {
        let count = cr.read_varint()?;
        for _ in 0..count {
            let handle = cr.read_varint()?;
            let idx = *handle_to_idx
                .get((handle - 1) as usize)
                .ok_or(FstError::DanglingFstAlias { handle })?;
            let width = *widths
                .get((handle - 1) as usize)
                .ok_or(FstError::DanglingFstAlias { handle })?;
            let bytes = cr.read_bytes(width as usize)?;
            let s = std::str::from_utf8(bytes).map_err(|_| FstError::BadUtf8)?;
            waveform.add_value_change_str(idx, t, s)?;
        }
    }
    Ok(())
}

/// Parses a complete FST stream into a fresh [`Waveform`].
pub fn read_fst<R: Read>(mut r: R) -> Result<Waveform, FstError> {
    let mut buf = Vec::new();
    r.read_to_end(&mut buf)?;
    let mut cursor = std::io::Cursor::new(&buf);

    let mut state = Reader::new();
    let mut widths: Vec<u32> = Vec::new();

    while let Some((kind, payload)) = read_block(&mut cursor)? {
        match kind {
            BlockType::Header => parse_header_block(&payload, &mut state.waveform)?,
            BlockType::Hierarchy => parse_hierarchy_block(&payload, &mut state)?,
            BlockType::Geometry => widths = parse_geometry_block(&payload)?,
            BlockType::VcData => {
                parse_vcdata_block(&payload, &mut state.waveform, &state.handle_to_idx, &widths)?
            }
        }
    }
    Ok(state.waveform)
}

/// Reads only the timescale exponent and the sorted set of distinct change
/// times, skipping the `Hierarchy` and `Geometry` blocks entirely (their
/// length prefixes let this scan skip straight past their payloads without
/// decompressing them). The single required input to a merge (see
/// `wan_merge`).
pub fn quick_times<R: Read>(mut r: R) -> Result<(i8, Vec<u64>), FstError> {
    let mut buf = Vec::new();
    r.read_to_end(&mut buf)?;
    let mut cursor = std::io::Cursor::new(&buf);

    let mut exponent: i8 = 0;
    let mut times: Vec<u64> = Vec::new();
    let mut found_vcdata = false;

    while let Some((kind, payload)) = read_block(&mut cursor)? {
        match kind {
            BlockType::Header => exponent = header_exponent(&payload)?,
            BlockType::VcData => {
                let mut r2 = ByteReader::new(&payload);
                let _start = r2.read_u64_be()?;
                let _end = r2.read_u64_be()?;
                let num_times = r2.read_u64_be()?;
                times = read_time_table(&mut r2, num_times)?;
                found_vcdata = true;
            }
            BlockType::Geometry | BlockType::Hierarchy => {}
        }
    }

    if !found_vcdata {
        return Err(FstError::MissingVcData);
    }
    Ok((exponent, times))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_block_type_propagates() {
        let mut buf = Vec::new();
        buf.push(99u8);
        buf.extend_from_slice(&8u64.to_be_bytes());
        let err = read_fst(std::io::Cursor::new(&buf)).unwrap_err();
        assert!(matches!(err, FstError::BadBlockType(99)));
    }

    #[test]
    fn truncated_stream_errors() {
        let mut buf = Vec::new();
        buf.push(BlockType::Header as u8);
        buf.extend_from_slice(&20u64.to_be_bytes()); // claims 12 bytes of payload
        buf.extend_from_slice(&[0u8; 4]); // only 4 supplied
        let err = read_fst(std::io::Cursor::new(&buf)).unwrap_err();
        assert!(matches!(err, FstError::Io(_)));
    }

    #[test]
    fn quick_times_without_vcdata_block_fails() {
        let mut buf = Vec::new();
        // Write only a Header block directly, bypassing write_fst.
        crate::format::write_block(
            &mut buf,
            BlockType::Header,
            &{
                let mut p = Vec::new();
                p.extend_from_slice(&0u64.to_be_bytes());
                p.extend_from_slice(&0u64.to_be_bytes());
                p.extend_from_slice(&0u64.to_be_bytes());
                p.push((-6i8) as u8);
                crate::format::write_cstr(&mut p, "");
                crate::format::write_cstr(&mut p, "");
                crate::format::write_cstr(&mut p, "");
                p
            },
        )
        .unwrap();
        let err = quick_times(std::io::Cursor::new(&buf)).unwrap_err();
        assert!(matches!(err, FstError::MissingVcData));
    }

    #[test]
    fn dangling_alias_handle_is_rejected() {
        let mut reader = Reader::new();
        reader.enter_scope(wan_core::ScopeKind::Module, "top");
        let err = reader.declare_var(SignalKind::Wire, 1, "x", 99).unwrap_err();
        assert!(matches!(err, FstError::DanglingFstAlias { handle: 99 }));
    }
}
