//! FST (compressed binary waveform) codec layered on the in-memory waveform
//! core.
//!
//! This is a self-contained block format inspired by GTKWave's FST, not a
//! byte-compatible reimplementation of it — no `libfst`/LZ4 binding is
//! available to this workspace (see `DESIGN.md`). [`read_fst`] parses a
//! complete stream into a fresh [`Waveform`](wan_core::Waveform);
//! [`write_fst`] serializes one back out. [`quick_times`] is the restricted
//! scan used by merge: it recovers only the timescale exponent and the
//! sorted set of distinct change times, without touching the hierarchy.

mod error;
mod format;
mod reader;
mod writer;

pub use error::FstError;
pub use reader::{quick_times, read_fst};
pub use writer::write_fst;
