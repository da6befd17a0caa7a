//! Errors raised by the facade's file-suffix dispatch.

use std::path::PathBuf;

use wan_core::WaveformError;
use wan_fst::FstError;
use wan_merge::MergeError;
use wan_vcd::VcdError;

/// Errors that can occur through the facade's unified read/write/quick-times
/// surface.
#[derive(Debug, thiserror::Error)]
pub enum WanError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A path's suffix was neither `.vcd` nor `.fst`.
    #[error("unrecognized waveform file suffix: {0}")]
    UnknownFormat(PathBuf),

    /// A `.vcd` file failed to parse or serialize.
    #[error(transparent)]
    Vcd(#[from] VcdError),

    /// A `.fst` file failed to parse or serialize.
    #[error(transparent)]
    Fst(#[from] FstError),

    /// A structural error from the underlying waveform data model.
    #[error(transparent)]
    Waveform(#[from] WaveformError),

    /// A merge of several files failed.
    #[error(transparent)]
    Merge(#[from] MergeError),
}
