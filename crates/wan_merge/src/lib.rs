//! Merges several VCD/FST waveform files into one shared [`Waveform`].
//!
//! Per the merge algorithm: each file's *quick-times* scan is unioned into
//! one shared time axis, the first file's metadata is retained, and every
//! file is then fully re-read and overlaid onto the same waveform — scopes
//! and signals already declared by an earlier file are reused by full scope
//! name and signal name, rather than redeclared.

mod error;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use wan_core::{visit, Scope, SignalDesc, SignalIdx, SignalKind, VisitOptions, Visitor, Waveform};

pub use error::MergeError;

fn is_suffix(path: &Path, suffix: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(suffix))
        .unwrap_or(false)
}

fn quick_times_for(path: &Path) -> Result<(i8, Vec<u64>), MergeError> {
    let file = File::open(path)?;
    if is_suffix(path, "vcd") {
        Ok(wan_vcd::quick_times(BufReader::new(file))?)
    } else if is_suffix(path, "fst") {
        Ok(wan_fst::quick_times(BufReader::new(file))?)
    } else {
        Err(MergeError::UnknownFormat(path.to_path_buf()))
    }
}

fn read_full(path: &Path) -> Result<Waveform, MergeError> {
    let file = File::open(path)?;
    let mut waveform = if is_suffix(path, "vcd") {
        wan_vcd::read_vcd(BufReader::new(file))?
    } else if is_suffix(path, "fst") {
        wan_fst::read_fst(BufReader::new(file))?
    } else {
        return Err(MergeError::UnknownFormat(path.to_path_buf()));
    };
    waveform.set_file_name(path.to_string_lossy());
    Ok(waveform)
}

/// A [`Visitor`] that overlays one source waveform's scope tree, signals,
/// and value changes onto a shared target waveform.
///
/// Scopes and signal descriptors are matched by full scope name / signal
/// name: an existing match is reused (its change list simply gets more
/// changes appended), a genuinely new name creates a new signal in the
/// target. Within one source file, a signal's alias descriptors are mapped
/// back to whichever target index its first (non-alias) occurrence
/// resolved to, via `idx_map`.
struct Overlay<'a> {
    target: &'a mut Waveform,
    source: &'a Waveform,
    scope_path: Vec<String>,
    idx_map: std::collections::HashMap<SignalIdx, SignalIdx>,
    err: Option<MergeError>,
}

impl<'a> Overlay<'a> {
    fn current_full_name(&self) -> String {
        self.scope_path.last().cloned().unwrap_or_default()
    }

    fn fail(&mut self, e: impl Into<MergeError>) {
        if self.err.is_none() {
            self.err = Some(e.into());
        }
    }
}

impl<'a> Visitor for Overlay<'a> {
    fn enter_scope(&mut self, scope: &Scope) {
        if self.err.is_some() {
            return;
        }
        let parent = self.current_full_name();
        {
            let parent_scope = self
                .target
                .root_mut()
                .find_scope_mut(&parent)
                .expect("parent scope was entered first");
            parent_scope.add_scope(&scope.instance_name, scope.kind);
        }
        let full = if parent.is_empty() {
            scope.instance_name.clone()
        } else {
            format!("{parent}.{}", scope.instance_name)
        };
        self.scope_path.push(full);
    }

    fn leave_scope(&mut self) {
        if self.err.is_some() {
            return;
        }
        self.scope_path.pop();
    }

    fn visit_signal(&mut self, full_scope_name: &str, desc: &SignalDesc) {
        if self.err.is_some() {
            return;
        }
        let target_idx = if let Ok(existing) = self.target.find_signal_desc(full_scope_name, &desc.name) {
            existing.idx
        } else if let Some(&mapped) = self.idx_map.get(&desc.idx) {
            let width = self.source.signal(desc.idx).width();
            let result = match desc.kind {
                SignalKind::Register => {
                    self.target
                        .add_register_alias(full_scope_name, &desc.name, width, mapped)
                }
                SignalKind::Wire => {
                    self.target
                        .add_wire_alias(full_scope_name, &desc.name, width, mapped)
                }
                SignalKind::Integer => {
                    self.target
                        .add_integer_alias(full_scope_name, &desc.name, width, mapped)
                }
            };
            match result {
                Ok(idx) => idx,
                Err(e) => {
                    self.fail(e);
                    return;
                }
            }
        } else {
            let width = self.source.signal(desc.idx).width();
            let result = match desc.kind {
                SignalKind::Register => self.target.add_register(full_scope_name, &desc.name, width),
                SignalKind::Wire => self.target.add_wire(full_scope_name, &desc.name, width),
                SignalKind::Integer => self.target.add_integer(full_scope_name, &desc.name, width),
            };
            match result {
                Ok(idx) => idx,
                Err(e) => {
                    self.fail(e);
                    return;
                }
            }
        };
        self.idx_map.insert(desc.idx, target_idx);

        let sig = self.source.signal(desc.idx);
        for k in 0..sig.len() {
            let t = sig.time_at_change(self.source.all_times(), k);
            let value = sig.value_at_change(k);
            if let Err(e) = self.target.add_value_change(target_idx, t, &value) {
                self.fail(e);
                return;
            }
        }
    }
}

fn overlay(target: &mut Waveform, source: &Waveform) -> Result<(), MergeError> {
    let mut overlay = Overlay {
        target,
        source,
        scope_path: Vec::new(),
        idx_map: std::collections::HashMap::new(),
        err: None,
    };
    visit(source.root(), &mut overlay, &VisitOptions::visit_all());
    match overlay.err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Merges `paths` into one [`Waveform`].
///
/// An empty slice yields an empty waveform. Otherwise the first path's
/// metadata (file name, version, date, comment, time scale, time zero,
/// start/end time) is retained on the result. Any single file failing to
/// open or parse aborts the whole merge.
pub fn merge<P: AsRef<Path>>(paths: &[P]) -> Result<Waveform, MergeError> {
    let mut all_times: Vec<u64> = Vec::new();
    for p in paths {
        let (_exponent, times) = quick_times_for(p.as_ref())?;
        all_times.extend(times);
    }
    all_times.sort_unstable();
    all_times.dedup();

    let mut merged = Waveform::new();
    if paths.is_empty() {
        return Ok(merged);
    }
    merged.add_times(all_times)?;

    for (i, p) in paths.iter().enumerate() {
        let source = read_full(p.as_ref())?;
        if i == 0 {
            merged.set_file_name(source.file_name());
            merged.set_version(source.version());
            merged.set_date(source.date());
            merged.set_comment(source.comment());
            merged.set_time_scale(source.time_scale());
            merged.set_time_zero(source.time_zero());
            merged.set_start_time(source.start_time());
            merged.set_end_time(source.end_time().max(merged.end_time()));
        } else {
            merged.set_end_time(merged.end_time().max(source.end_time()));
        }
        overlay(&mut merged, &source)?;
    }
    Ok(merged)
}
