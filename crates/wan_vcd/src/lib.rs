//! Value Change Dump (VCD) codec layered on the in-memory waveform core.
//!
//! [`read_vcd`] parses a complete header and value-change body into a fresh
//! [`Waveform`](wan_core::Waveform). [`write_vcd`] serializes one back out.
//! [`quick_times`] is the restricted scan used by merge: it recovers only
//! the timescale exponent and the sorted set of distinct change times.

mod error;
mod reader;
mod writer;

pub use error::VcdError;
pub use reader::{quick_times, read_vcd};
pub use writer::write_vcd;
