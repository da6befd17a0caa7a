//! Errors raised while merging several waveform files into one.

use std::path::PathBuf;

use wan_core::WaveformError;
use wan_fst::FstError;
use wan_vcd::VcdError;

/// Errors that can occur while merging a set of VCD/FST files.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// Underlying I/O failure opening or reading one of the input files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A file's suffix was neither `.vcd` nor `.fst`.
    #[error("unrecognized waveform file suffix: {0}")]
    UnknownFormat(PathBuf),

    /// A `.vcd` input failed to parse.
    #[error(transparent)]
    Vcd(#[from] VcdError),

    /// A `.fst` input failed to parse.
    #[error(transparent)]
    Fst(#[from] FstError),

    /// A structural error overlaying one file's signals onto the shared waveform.
    #[error(transparent)]
    Waveform(#[from] WaveformError),
}
