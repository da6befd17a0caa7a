//! Errors raised while parsing or writing Value Change Dump text.

use wan_core::WaveformError;

/// Errors that can occur while reading or writing a VCD stream.
#[derive(Debug, thiserror::Error)]
pub enum VcdError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A structural error from the underlying waveform (width mismatch,
    /// duplicate signal, broken time ordering, alias width mismatch, ...).
    #[error(transparent)]
    Waveform(#[from] WaveformError),

    /// A header keyword outside `{date, version, comment, timescale, scope,
    /// upscope, var, enddefinitions}` was encountered.
    #[error("line {line}: unexpected keyword {keyword:?}")]
    UnexpectedKeyword {
        /// 1-based line number.
        line: usize,
        /// The offending keyword, without its leading `$`.
        keyword: String,
    },

    /// A multi-line header entry was never closed with `$end`.
    #[error("line {line}: missing $end")]
    MissingEnd {
        /// The line on which the unterminated entry began.
        line: usize,
    },

    /// `$timescale` body did not parse as `<mantissa><unit>`.
    #[error("line {line}: bad timescale {text:?}")]
    BadTimescale {
        /// 1-based line number.
        line: usize,
        /// The offending text.
        text: String,
    },

    /// A `#<time>` marker failed to parse as an unsigned integer.
    #[error("line {line}: bad time marker {text:?}")]
    BadTimeMarker {
        /// 1-based line number.
        line: usize,
        /// The offending text.
        text: String,
    },

    /// A value-change or `$var` line did not match the expected grammar.
    #[error("line {line}: bad value line {text:?}")]
    BadValueLine {
        /// 1-based line number.
        line: usize,
        /// The offending text.
        text: String,
    },

    /// A value-change line referenced an `<id>` never declared by `$var`.
    #[error("line {line}: unknown signal id {id:?}")]
    UnknownSignalId {
        /// 1-based line number.
        line: usize,
        /// The unrecognized id code.
        id: String,
    },

    /// A `#<time>` marker was less than the previously recorded time.
    #[error("line {line}: time {time} precedes last recorded time {last}")]
    NonMonotonicTime {
        /// 1-based line number.
        line: usize,
        /// The offending time value.
        time: u64,
        /// The most recently recorded time.
        last: u64,
    },
}
