//! The waveform aggregate: metadata, the shared time axis, every signal,
//! and the scope tree that names them.

use crate::error::WaveformError;
use crate::scope::{Scope, ScopeKind, SignalKind};
use crate::signal::{Signal, SignalIdx};
use serde::{Deserialize, Serialize};
use wan_common::{Arena, BitVector};

/// An in-memory digital-simulation waveform: a hierarchical set of signals,
/// each a packed change log over one shared, monotone time axis.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Waveform {
    file_name: String,
    version: String,
    date: String,
    comment: String,
    start_time: u64,
    end_time: u64,
    time_zero: u64,
    time_scale: i8,
    all_times: Vec<u64>,
    signals: Arena<SignalIdx, Signal>,
    root: Scope,
}

impl Default for Waveform {
    fn default() -> Self {
        Self::new()
    }
}

impl Waveform {
    /// Creates an empty waveform, ready to be populated by a reader or builder.
    pub fn new() -> Self {
        Self {
            file_name: String::new(),
            version: String::new(),
            date: String::new(),
            comment: String::new(),
            start_time: 0,
            end_time: 0,
            time_zero: 0,
            time_scale: 0,
            all_times: Vec::new(),
            signals: Arena::new(),
            root: Scope::root(),
        }
    }

    // ---- metadata ----

    /// The name of the file this waveform was loaded from, if any.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Sets the source file name.
    pub fn set_file_name(&mut self, name: impl Into<String>) {
        self.file_name = name.into();
    }

    /// The `$version` string, or empty if never set.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Sets the `$version` string.
    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
    }

    /// The `$date` string, or empty if never set.
    pub fn date(&self) -> &str {
        &self.date
    }

    /// Sets the `$date` string.
    pub fn set_date(&mut self, date: impl Into<String>) {
        self.date = date.into();
    }

    /// The `$comment` string, or empty if never set.
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Sets the `$comment` string.
    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
    }

    /// The time of the first recorded value change.
    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    /// Sets the start time.
    pub fn set_start_time(&mut self, t: u64) {
        self.start_time = t;
    }

    /// The time of the last recorded value change.
    pub fn end_time(&self) -> u64 {
        self.end_time
    }

    /// Sets the end time.
    pub fn set_end_time(&mut self, t: u64) {
        self.end_time = t;
    }

    /// The `$timezero` offset.
    pub fn time_zero(&self) -> u64 {
        self.time_zero
    }

    /// Sets the `$timezero` offset.
    pub fn set_time_zero(&mut self, t: u64) {
        self.time_zero = t;
    }

    /// The signed base-10 time-scale exponent, in `-15..=3`.
    pub fn time_scale(&self) -> i8 {
        self.time_scale
    }

    /// Sets the time-scale exponent.
    pub fn set_time_scale(&mut self, exponent: i8) {
        self.time_scale = exponent;
    }

    /// Expands the time-scale exponent into a mantissa + unit string, e.g.
    /// `"1ns"` for exponent `-9`, `"1000s"` for exponent `3`.
    pub fn get_time_scale(&self) -> String {
        let exp = self.time_scale;
        if exp >= 0 {
            let mantissa = 10i64.pow(exp as u32);
            format!("{mantissa}s")
        } else {
            let offset = -1 - exp as i32;
            let units = ["ms", "us", "ns", "ps", "fs"];
            let group = (offset / 3) as usize;
            let mantissa = [100, 10, 1][(offset % 3) as usize];
            format!("{mantissa}{}", units[group])
        }
    }

    // ---- time axis ----

    /// The shared time axis every signal's `time_idx` refers into.
    pub fn all_times(&self) -> &[u64] {
        &self.all_times
    }

    /// Registers `t` on the shared time axis, returning its index.
    ///
    /// - If `t` is greater than the last recorded time (or the axis is
    ///   empty), it is appended and a new index returned.
    /// - If `t` equals the last recorded time, the existing last index is
    ///   returned (no growth).
    /// - Otherwise, `t` must already be present somewhere in the axis; if it
    ///   is, that index is returned. If it is not, inserting it would shift
    ///   every later index already handed out to a signal, so this fails
    ///   with [`WaveformError::TimeOrderingBroken`].
    pub fn add_time(&mut self, t: u64) -> Result<u32, WaveformError> {
        match self.all_times.last() {
            None => {
                self.all_times.push(t);
                Ok(0)
            }
            Some(&last) if t > last => {
                self.all_times.push(t);
                Ok((self.all_times.len() - 1) as u32)
            }
            Some(&last) if t == last => Ok((self.all_times.len() - 1) as u32),
            Some(&last) => match self.all_times.binary_search(&t) {
                Ok(idx) => Ok(idx as u32),
                Err(_) => Err(WaveformError::TimeOrderingBroken {
                    inserted: t,
                    last,
                }),
            },
        }
    }

    /// Registers a run of already-sorted times, in order.
    pub fn add_times(&mut self, times: impl IntoIterator<Item = u64>) -> Result<(), WaveformError> {
        for t in times {
            self.add_time(t)?;
        }
        Ok(())
    }

    // ---- scope tree ----

    /// The root scope. Its children (not itself) are named and visitable.
    pub fn root(&self) -> &Scope {
        &self.root
    }

    /// Mutable access to the root scope, e.g. for direct tree construction.
    pub fn root_mut(&mut self) -> &mut Scope {
        &mut self.root
    }

    /// Adds (or returns the existing) top-level module scope named `instance_name`.
    pub fn add_module(&mut self, instance_name: &str) -> &mut Scope {
        self.root.add_scope(instance_name, ScopeKind::Module)
    }

    /// Adds (or returns the existing) top-level task scope named `instance_name`.
    pub fn add_task(&mut self, instance_name: &str) -> &mut Scope {
        self.root.add_scope(instance_name, ScopeKind::Task)
    }

    /// Adds (or returns the existing) top-level function scope named `instance_name`.
    pub fn add_function(&mut self, instance_name: &str) -> &mut Scope {
        self.root.add_scope(instance_name, ScopeKind::Function)
    }

    /// Adds (or returns the existing) top-level block scope named `instance_name`.
    pub fn add_block(&mut self, instance_name: &str) -> &mut Scope {
        self.root.add_scope(instance_name, ScopeKind::Block)
    }

    /// Finds the signal descriptor named `signal_name` in the scope whose
    /// full name is `full_scope_name`.
    pub fn find_signal_desc(
        &self,
        full_scope_name: &str,
        signal_name: &str,
    ) -> Result<&crate::scope::SignalDesc, WaveformError> {
        self.root
            .find_signal_desc(full_scope_name, signal_name)
            .ok_or_else(|| WaveformError::NotFound {
                scope: full_scope_name.to_string(),
                signal: signal_name.to_string(),
            })
    }

    // ---- signals ----

    /// The number of signals held in this waveform (aliases do not add to this count).
    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    /// True if the waveform holds no signals.
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Read access to a signal by index.
    pub fn signal(&self, idx: SignalIdx) -> &Signal {
        self.signals.get(idx)
    }

    /// Mutable access to a signal by index.
    pub fn signal_mut(&mut self, idx: SignalIdx) -> &mut Signal {
        self.signals.get_mut(idx)
    }

    /// Iterates over every signal, in allocation order, alongside its index.
    pub fn signals(&self) -> impl Iterator<Item = (SignalIdx, &Signal)> {
        self.signals.iter()
    }

    fn add_new_signal(
        &mut self,
        full_scope_name: &str,
        name: &str,
        kind: SignalKind,
        width: u32,
    ) -> Result<SignalIdx, WaveformError> {
        let idx = self.signals.alloc(Signal::new(width));
        let scope = self.root.find_scope_mut(full_scope_name).ok_or_else(|| {
            WaveformError::NotFound {
                scope: full_scope_name.to_string(),
                signal: name.to_string(),
            }
        })?;
        scope.add_signal(name, kind, false, idx)?;
        Ok(idx)
    }

    fn add_alias_signal(
        &mut self,
        full_scope_name: &str,
        name: &str,
        kind: SignalKind,
        width: u32,
        existing: SignalIdx,
    ) -> Result<SignalIdx, WaveformError> {
        let existing_width = self.signals.get(existing).width();
        if existing_width != width {
            return Err(WaveformError::AliasWidthMismatch {
                existing: existing_width,
                requested: width,
            });
        }
        let scope = self.root.find_scope_mut(full_scope_name).ok_or_else(|| {
            WaveformError::NotFound {
                scope: full_scope_name.to_string(),
                signal: name.to_string(),
            }
        })?;
        scope.add_signal(name, kind, true, existing)?;
        Ok(existing)
    }

    /// Declares a new `REGISTER` signal of `width` bits in the scope named
    /// `full_scope_name`.
    pub fn add_register(
        &mut self,
        full_scope_name: &str,
        name: &str,
        width: u32,
    ) -> Result<SignalIdx, WaveformError> {
        self.add_new_signal(full_scope_name, name, SignalKind::Register, width)
    }

    /// Declares an alias to an existing signal as a `REGISTER` descriptor.
    /// `width` must match the existing signal's width.
    pub fn add_register_alias(
        &mut self,
        full_scope_name: &str,
        name: &str,
        width: u32,
        existing: SignalIdx,
    ) -> Result<SignalIdx, WaveformError> {
        self.add_alias_signal(full_scope_name, name, SignalKind::Register, width, existing)
    }

    /// Declares a new `WIRE` signal of `width` bits in the scope named
    /// `full_scope_name`.
    pub fn add_wire(
        &mut self,
        full_scope_name: &str,
        name: &str,
        width: u32,
    ) -> Result<SignalIdx, WaveformError> {
        self.add_new_signal(full_scope_name, name, SignalKind::Wire, width)
    }

    /// Declares an alias to an existing signal as a `WIRE` descriptor.
    pub fn add_wire_alias(
        &mut self,
        full_scope_name: &str,
        name: &str,
        width: u32,
        existing: SignalIdx,
    ) -> Result<SignalIdx, WaveformError> {
        self.add_alias_signal(full_scope_name, name, SignalKind::Wire, width, existing)
    }

    /// Declares a new `INTEGER` signal of `width` bits in the scope named
    /// `full_scope_name`.
    pub fn add_integer(
        &mut self,
        full_scope_name: &str,
        name: &str,
        width: u32,
    ) -> Result<SignalIdx, WaveformError> {
        self.add_new_signal(full_scope_name, name, SignalKind::Integer, width)
    }

    /// Declares an alias to an existing signal as an `INTEGER` descriptor.
    pub fn add_integer_alias(
        &mut self,
        full_scope_name: &str,
        name: &str,
        width: u32,
        existing: SignalIdx,
    ) -> Result<SignalIdx, WaveformError> {
        self.add_alias_signal(full_scope_name, name, SignalKind::Integer, width, existing)
    }

    /// Records a value change for signal `idx` at time `t`, registering `t`
    /// on the shared time axis first.
    pub fn add_value_change(
        &mut self,
        idx: SignalIdx,
        t: u64,
        value: &BitVector,
    ) -> Result<(), WaveformError> {
        let time_idx = self.add_time(t)?;
        self.signals.get_mut(idx).append(time_idx, value)
    }

    /// Records a value change from a string, MSB-first with zero-extension
    /// (see [`Signal::append_str`]).
    pub fn add_value_change_str(
        &mut self,
        idx: SignalIdx,
        t: u64,
        value: &str,
    ) -> Result<(), WaveformError> {
        let time_idx = self.add_time(t)?;
        self.signals.get_mut(idx).append_str(time_idx, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bv(width: u32, s: &str) -> BitVector {
        let mut v = BitVector::new(width);
        for (i, c) in s.chars().rev().enumerate() {
            v.set(
                i as u32,
                wan_common::LogicValue::from_char(c).unwrap(),
            )
            .unwrap();
        }
        v
    }

    #[test]
    fn new_waveform_is_empty() {
        let w = Waveform::new();
        assert!(w.is_empty());
        assert_eq!(w.signal_count(), 0);
        assert!(w.all_times().is_empty());
    }

    #[test]
    fn add_time_policy() {
        let mut w = Waveform::new();
        assert_eq!(w.add_time(0).unwrap(), 0);
        assert_eq!(w.add_time(5).unwrap(), 1);
        // repeat of last reuses index, does not grow
        assert_eq!(w.add_time(5).unwrap(), 1);
        assert_eq!(w.all_times(), &[0, 5]);
        // between two existing times with no exact match fails
        let err = w.add_time(3).unwrap_err();
        assert_eq!(
            err,
            WaveformError::TimeOrderingBroken {
                inserted: 3,
                last: 5
            }
        );
    }

    #[test]
    fn add_time_existing_value_reused() {
        let mut w = Waveform::new();
        w.add_times([0, 5, 10]).unwrap();
        // 5 is already present: reuse its index without growing
        assert_eq!(w.add_time(5).unwrap(), 1);
        assert_eq!(w.all_times().len(), 3);
    }

    #[test]
    fn get_time_scale_boundaries() {
        let mut w = Waveform::new();
        w.set_time_scale(-9);
        assert_eq!(w.get_time_scale(), "1ns");
        w.set_time_scale(-12);
        assert_eq!(w.get_time_scale(), "1ps");
        w.set_time_scale(-15);
        assert_eq!(w.get_time_scale(), "1fs");
        w.set_time_scale(0);
        assert_eq!(w.get_time_scale(), "1s");
        w.set_time_scale(3);
        assert_eq!(w.get_time_scale(), "1000s");
        w.set_time_scale(-1);
        assert_eq!(w.get_time_scale(), "100ms");
        w.set_time_scale(-13);
        assert_eq!(w.get_time_scale(), "100fs");
    }

    #[test]
    fn scenario_s2_build_and_inspect() {
        let mut w = Waveform::new();
        w.add_module("test");
        let idx = w.add_wire("test", "a_signal", 4).unwrap();
        w.add_value_change_str(idx, 0, "0000").unwrap();
        w.add_value_change_str(idx, 5, "0010").unwrap();
        w.add_value_change_str(idx, 10, "1010").unwrap();
        w.add_value_change_str(idx, 15, "100").unwrap();
        w.add_value_change_str(idx, 20, "1").unwrap();

        assert_eq!(w.signal_count(), 1);
        assert_eq!(w.all_times(), &[0, 5, 10, 15, 20]);
        let sig = w.signal(idx);
        assert_eq!(sig.len(), 5);
        assert_eq!(sig.value_at_change(1).to_string(), "0010");
        assert_eq!(sig.value_at_change(3).to_string(), "0100");
    }

    #[test]
    fn scenario_s4_alias_preservation() {
        let mut w = Waveform::new();
        w.add_module("top");
        let idx = w.add_wire("top", "w1", 1).unwrap();
        w.add_value_change(idx, 0, &bv(1, "1")).unwrap();
        let alias_idx = w.add_wire_alias("top", "w1_alias", 1, idx).unwrap();

        assert_eq!(alias_idx, idx);
        assert_eq!(w.signal_count(), 1);
        let desc = w.find_signal_desc("top", "w1_alias").unwrap();
        assert!(desc.alias);
        assert_eq!(desc.idx, idx);
    }

    #[test]
    fn alias_width_mismatch_is_rejected() {
        let mut w = Waveform::new();
        w.add_module("top");
        let idx = w.add_wire("top", "w1", 4).unwrap();
        let err = w.add_wire_alias("top", "w1_alias", 8, idx).unwrap_err();
        assert_eq!(
            err,
            WaveformError::AliasWidthMismatch {
                existing: 4,
                requested: 8
            }
        );
    }

    #[test]
    fn add_signal_in_unknown_scope_fails() {
        let mut w = Waveform::new();
        let err = w.add_wire("nope", "x", 1).unwrap_err();
        assert_eq!(
            err,
            WaveformError::NotFound {
                scope: "nope".into(),
                signal: "x".into()
            }
        );
    }

    #[test]
    fn find_signal_desc_not_found() {
        let w = Waveform::new();
        let err = w.find_signal_desc("top", "missing").unwrap_err();
        assert_eq!(
            err,
            WaveformError::NotFound {
                scope: "top".into(),
                signal: "missing".into()
            }
        );
    }

    #[test]
    fn serde_roundtrip() {
        let mut w = Waveform::new();
        w.add_module("top");
        let idx = w.add_wire("top", "w", 2).unwrap();
        w.add_value_change_str(idx, 0, "10").unwrap();
        let json = serde_json::to_string(&w).unwrap();
        let back: Waveform = serde_json::from_str(&json).unwrap();
        assert_eq!(back.signal_count(), 1);
        assert_eq!(back.all_times(), w.all_times());
    }
}
