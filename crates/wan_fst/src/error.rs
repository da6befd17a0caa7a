//! Errors raised while parsing or writing the FST block format.

use wan_core::WaveformError;

/// Errors that can occur while reading or writing an FST stream.
#[derive(Debug, thiserror::Error)]
pub enum FstError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A structural error from the underlying waveform (width mismatch,
    /// duplicate signal, broken time ordering, alias width mismatch, ...).
    #[error(transparent)]
    Waveform(#[from] WaveformError),

    /// The byte stream ended before a block's declared length was satisfied.
    #[error("truncated FST stream: expected {expected} more bytes at offset {offset}")]
    Truncated {
        /// Byte offset at which the read was attempted.
        offset: usize,
        /// Number of bytes the read required.
        expected: usize,
    },

    /// A block's type byte did not match any of `{Header, Hierarchy, Geometry, VcData}`.
    #[error("unrecognized FST block type {0}")]
    BadBlockType(u8),

    /// A hierarchy entry's tag byte was neither a scope, upscope, nor a known signal kind.
    #[error("bad hierarchy tag byte {0:#x}")]
    BadHierarchyTag(u8),

    /// A string field was not valid UTF-8.
    #[error("invalid UTF-8 in FST string field")]
    BadUtf8,

    /// A hierarchy `Var` entry declared itself an alias of a handle that was
    /// never previously declared.
    #[error("FST alias referenced undeclared handle {handle}")]
    DanglingFstAlias {
        /// The dangling handle value.
        handle: u64,
    },

    /// The file ended without ever producing a `VcData` block (required for
    /// both the full reader and the quick-times scan).
    #[error("FST stream has no value-change data block")]
    MissingVcData,
}
