//! FST serialization: a hierarchy block built from a [`Visitor`] pass over
//! the scope tree, a geometry block of per-handle widths, and a value-change
//! block built directly from each [`Signal`]'s packed change log.

use std::collections::HashMap;
use std::io::Write;

use wan_core::{visit, Scope, ScopeKind, SignalDesc, SignalIdx, VisitOptions, Visitor, Waveform};

use crate::error::FstError;
use crate::format::{
    compress_gzip, compress_zlib, scope_kind_to_u8, signal_kind_to_u8, write_block, write_cstr,
    write_varint, BlockType, TAG_SCOPE, TAG_UPSCOPE,
};

/// Builds the hierarchy block's raw bytes while assigning each distinct
/// signal a 1-based handle on its first traversal encounter. Later
/// descriptors of the same signal (VCD-style aliases) are written as `Var`
/// entries with a nonzero `alias` field referencing that handle.
struct HierarchyBuilder<'a> {
    waveform: &'a Waveform,
    raw: Vec<u8>,
    handles: HashMap<SignalIdx, u32>,
    /// Signal indices in handle-assignment order; `order[h - 1]` is the
    /// signal for handle `h`.
    order: Vec<SignalIdx>,
}

impl<'a> HierarchyBuilder<'a> {
    fn new(waveform: &'a Waveform) -> Self {
        Self {
            waveform,
            raw: Vec::new(),
            handles: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<'a> Visitor for HierarchyBuilder<'a> {
    fn enter_scope(&mut self, scope: &Scope) {
        self.raw.push(TAG_SCOPE);
        self.raw.push(scope_kind_to_u8(scope.kind));
        write_cstr(&mut self.raw, &scope.instance_name);
    }

    fn leave_scope(&mut self) {
        self.raw.push(TAG_UPSCOPE);
    }

    fn visit_signal(&mut self, _full_scope_name: &str, desc: &SignalDesc) {
        self.raw.push(signal_kind_to_u8(desc.kind));
        self.raw.push(0); // direction: not retained, round-trips as IMPLICIT
        write_cstr(&mut self.raw, &desc.name);
        let width = self.waveform.signal(desc.idx).width();
        write_varint(&mut self.raw, width as u64);
        let alias = match self.handles.get(&desc.idx) {
            Some(&handle) => handle,
            None => {
                let handle = self.order.len() as u32 + 1;
                self.handles.insert(desc.idx, handle);
                self.order.push(desc.idx);
                0
            }
        };
        write_varint(&mut self.raw, alias as u64);
    }
}

/// Writes a complete FST stream for `waveform`.
///
/// Blocks are emitted in a fixed order: `Header`, `Hierarchy`, `Geometry`,
/// `VcData`. Readers rely on this order: `Geometry`'s widths and
/// `Hierarchy`'s handle assignments must both be available before `VcData`
/// can be decoded.
pub fn write_fst<W: Write>(waveform: &Waveform, mut out: W) -> Result<(), FstError> {
    write_header_block(waveform, &mut out)?;

    let mut builder = HierarchyBuilder::new(waveform);
    visit(waveform.root(), &mut builder, &VisitOptions::visit_all());
    write_hierarchy_block(&builder.raw, &mut out)?;

    let widths: Vec<u32> = builder
        .order
        .iter()
        .map(|&idx| waveform.signal(idx).width())
        .collect();
    write_geometry_block(&widths, &mut out)?;

    write_vcdata_block(waveform, &builder.handles, &mut out)?;
    Ok(())
}

fn write_header_block<W: Write>(waveform: &Waveform, out: &mut W) -> Result<(), FstError> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&waveform.start_time().to_be_bytes());
    payload.extend_from_slice(&waveform.end_time().to_be_bytes());
    payload.extend_from_slice(&waveform.time_zero().to_be_bytes());
    payload.push(waveform.time_scale() as u8);
    write_cstr(&mut payload, waveform.version());
    write_cstr(&mut payload, waveform.date());
    write_cstr(&mut payload, waveform.comment());
    write_block(out, BlockType::Header, &payload)?;
    Ok(())
}

fn write_hierarchy_block<W: Write>(raw: &[u8], out: &mut W) -> Result<(), FstError> {
    let compressed = compress_gzip(raw)?;
    let mut payload = Vec::with_capacity(8 + compressed.len());
    payload.extend_from_slice(&(raw.len() as u64).to_be_bytes());
    payload.extend_from_slice(&compressed);
    write_block(out, BlockType::Hierarchy, &payload)?;
    Ok(())
}

fn write_geometry_block<W: Write>(widths: &[u32], out: &mut W) -> Result<(), FstError> {
    let mut raw = Vec::new();
    for &w in widths {
        write_varint(&mut raw, w as u64);
    }
    let compressed = compress_zlib(&raw)?;
    let mut payload = Vec::with_capacity(16 + compressed.len());
    payload.extend_from_slice(&(raw.len() as u64).to_be_bytes());
    payload.extend_from_slice(&(widths.len() as u64).to_be_bytes());
    payload.extend_from_slice(&compressed);
    write_block(out, BlockType::Geometry, &payload)?;
    Ok(())
}

fn write_vcdata_block<W: Write>(
    waveform: &Waveform,
    handles: &HashMap<SignalIdx, u32>,
    out: &mut W,
) -> Result<(), FstError> {
    let all_times = waveform.all_times();

    let mut time_raw = Vec::new();
    let mut prev = 0u64;
    for &t in all_times {
        write_varint(&mut time_raw, t - prev);
        prev = t;
    }
    let time_compressed = compress_zlib(&time_raw)?;

    let mut by_time: Vec<Vec<(SignalIdx, usize)>> = vec![Vec::new(); all_times.len()];
    for (idx, sig) in waveform.signals() {
        if handles.contains_key(&idx) {
            for k in 0..sig.len() {
                by_time[sig.time_idx_at_change(k) as usize].push((idx, k));
            }
        }
    }

    let mut change_raw = Vec::new();
    for events in &by_time {
        write_varint(&mut change_raw, events.len() as u64);
        for &(idx, k) in events {
            let handle = handles[&idx];
            write_varint(&mut change_raw, handle as u64);
            let sig = waveform.signal(idx);
            let value = sig.value_at_change(k);
            for b in (0..value.width()).rev() {
                let c = value.get(b).expect("index within width").to_char();
                change_raw.push(c as u8);
            }
        }
    }
    let change_compressed = compress_zlib(&change_raw)?;

    let mut payload = Vec::new();
    payload.extend_from_slice(&waveform.start_time().to_be_bytes());
    payload.extend_from_slice(&waveform.end_time().to_be_bytes());
    payload.extend_from_slice(&(all_times.len() as u64).to_be_bytes());
    payload.extend_from_slice(&(time_raw.len() as u64).to_be_bytes());
    payload.extend_from_slice(&(time_compressed.len() as u64).to_be_bytes());
    payload.extend_from_slice(&time_compressed);
    payload.extend_from_slice(&(handles.len() as u64).to_be_bytes());
    payload.extend_from_slice(&(change_raw.len() as u64).to_be_bytes());
    payload.extend_from_slice(&(change_compressed.len() as u64).to_be_bytes());
    payload.extend_from_slice(&change_compressed);

    write_block(out, BlockType::VcData, &payload)?;
    Ok(())
}
