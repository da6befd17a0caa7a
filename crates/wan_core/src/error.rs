//! Structural errors produced by the in-memory waveform data model.
//!
//! These are the errors a caller can hit purely from mutating a [`Waveform`]
//! in memory — independent of any file format. Codec crates layered on top
//! (`wan_vcd`, `wan_fst`) wrap this enum via `#[from]` to report the same
//! failure in terms of the bytes that triggered it.
//!
//! [`Waveform`]: crate::waveform::Waveform

use wan_common::BitVectorError;

/// Errors that can occur while building or querying a [`Waveform`](crate::waveform::Waveform).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WaveformError {
    /// A value string or [`wan_common::BitVector`] did not match the target signal's width.
    #[error("width mismatch: expected {expected}, got {actual}")]
    WidthMismatch {
        /// Width the signal was declared with.
        expected: u32,
        /// Width of the value that was supplied.
        actual: u32,
    },

    /// A value string carried more bits than the signal's declared width allows.
    #[error("value of {actual} bits overflows signal width {expected}")]
    WidthOverflow {
        /// Width the signal was declared with.
        expected: u32,
        /// Number of bits present in the offending value.
        actual: u32,
    },

    /// A character outside `{0,1,x,X,z,Z}` was encountered where a logic value was expected.
    #[error("invalid logic character: {0:?}")]
    BadLogicChar(char),

    /// A [`Signal`](crate::signal::Signal) received an append whose time index
    /// precedes the last recorded change.
    #[error("append at time index {attempted} precedes last recorded time index {last}")]
    NonMonotonicAppend {
        /// The time index that was rejected.
        attempted: u32,
        /// The most recent time index already recorded on the signal.
        last: u32,
    },

    /// Inserting a time into `AllTimes` would have shifted indices already
    /// handed out to existing signals.
    #[error("inserting time {inserted} would invalidate existing time indices (last recorded {last})")]
    TimeOrderingBroken {
        /// The time value that could not be inserted in place.
        inserted: u64,
        /// The last time value already present in `AllTimes`.
        last: u64,
    },

    /// Two signal descriptors in the same scope share a name.
    #[error("signal {name:?} already declared in scope {scope:?}")]
    DuplicateSignalInScope {
        /// The scope the duplicate was declared in.
        scope: String,
        /// The repeated signal name.
        name: String,
    },

    /// `find_signal_desc` found no descriptor for the given scope/signal pair.
    #[error("no signal named {signal:?} found in scope {scope:?}")]
    NotFound {
        /// The scope name that was searched.
        scope: String,
        /// The signal name that was not found.
        signal: String,
    },

    /// An alias was registered against an index whose existing width differs.
    #[error("alias width mismatch: existing signal has width {existing}, alias requested width {requested}")]
    AliasWidthMismatch {
        /// Width of the signal already present at the aliased index.
        existing: u32,
        /// Width requested by the new alias descriptor.
        requested: u32,
    },
}

impl From<BitVectorError> for WaveformError {
    fn from(e: BitVectorError) -> Self {
        match e {
            BitVectorError::WidthMismatch { left, right } => WaveformError::WidthMismatch {
                expected: left,
                actual: right,
            },
            BitVectorError::WidthOverflow { index, width } => WaveformError::WidthOverflow {
                expected: width,
                actual: index,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_mismatch_display() {
        let e = WaveformError::WidthMismatch {
            expected: 4,
            actual: 8,
        };
        assert_eq!(e.to_string(), "width mismatch: expected 4, got 8");
    }

    #[test]
    fn width_overflow_display() {
        let e = WaveformError::WidthOverflow {
            expected: 4,
            actual: 9,
        };
        assert_eq!(e.to_string(), "value of 9 bits overflows signal width 4");
    }

    #[test]
    fn bad_logic_char_display() {
        let e = WaveformError::BadLogicChar('q');
        assert_eq!(e.to_string(), "invalid logic character: 'q'");
    }

    #[test]
    fn non_monotonic_append_display() {
        let e = WaveformError::NonMonotonicAppend {
            attempted: 2,
            last: 5,
        };
        assert_eq!(
            e.to_string(),
            "append at time index 2 precedes last recorded time index 5"
        );
    }

    #[test]
    fn time_ordering_broken_display() {
        let e = WaveformError::TimeOrderingBroken {
            inserted: 3,
            last: 10,
        };
        assert!(e.to_string().contains("would invalidate"));
    }

    #[test]
    fn duplicate_signal_display() {
        let e = WaveformError::DuplicateSignalInScope {
            scope: "top".into(),
            name: "clk".into(),
        };
        assert_eq!(
            e.to_string(),
            "signal \"clk\" already declared in scope \"top\""
        );
    }

    #[test]
    fn not_found_display() {
        let e = WaveformError::NotFound {
            scope: "top".into(),
            signal: "missing".into(),
        };
        assert_eq!(
            e.to_string(),
            "no signal named \"missing\" found in scope \"top\""
        );
    }

    #[test]
    fn from_bitvector_width_mismatch() {
        let e: WaveformError = BitVectorError::WidthMismatch { left: 4, right: 8 }.into();
        assert_eq!(
            e,
            WaveformError::WidthMismatch {
                expected: 4,
                actual: 8
            }
        );
    }
}
