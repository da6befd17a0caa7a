//! Waveform core facade.
//!
//! External collaborators (a fault-injection planner, a side-channel
//! analysis tool, CLI front-ends) go through this crate rather than
//! `wan_vcd`/`wan_fst`/`wan_merge` directly: a [`Codec`] dispatches on file
//! suffix, exposes a unified `read`/`write`/`quick_times` surface, and the
//! re-exported [`Waveform`] data model (signal access by [`SignalIdx`],
//! scope lookup by full scope name, the [`Visitor`] protocol) is all a
//! consumer needs to inspect a loaded waveform.

mod error;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub use error::WanError;
pub use wan_core::{
    visit, Scope, ScopeFilterResult, ScopeKind, SignalDesc, SignalIdx, SignalKind, VisitOptions,
    Visitor, Waveform, WaveformError, ROOT_INSTANCE_NAME,
};
pub use wan_fst::FstError;
pub use wan_merge::{merge, MergeError};
pub use wan_vcd::VcdError;

/// The waveform file format a path's suffix resolves to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Codec {
    /// Value Change Dump — human-readable text.
    Vcd,
    /// The compressed binary format implemented by `wan_fst`.
    Fst,
}

impl Codec {
    /// Resolves a codec from `path`'s suffix (`.vcd` or `.fst`, case-insensitive).
    ///
    /// Fails with [`WanError::UnknownFormat`] for any other suffix, matching
    /// spec.md's "unknown suffix fails `UnknownFormat`".
    pub fn from_path(path: &Path) -> Result<Self, WanError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(e) if e.eq_ignore_ascii_case("vcd") => Ok(Codec::Vcd),
            Some(e) if e.eq_ignore_ascii_case("fst") => Ok(Codec::Fst),
            _ => Err(WanError::UnknownFormat(path.to_path_buf())),
        }
    }
}

/// Reads a complete [`Waveform`] from `path`, dispatching on its suffix.
pub fn read(path: impl AsRef<Path>) -> Result<Waveform, WanError> {
    let path = path.as_ref();
    let file = BufReader::new(File::open(path)?);
    match Codec::from_path(path)? {
        Codec::Vcd => Ok(wan_vcd::read_vcd(file)?),
        Codec::Fst => Ok(wan_fst::read_fst(file)?),
    }
}

/// Writes `waveform` to `path`, dispatching on its suffix.
pub fn write(path: impl AsRef<Path>, waveform: &Waveform) -> Result<(), WanError> {
    let path = path.as_ref();
    let file = File::create(path)?;
    match Codec::from_path(path)? {
        Codec::Vcd => wan_vcd::write_vcd(waveform, file)?,
        Codec::Fst => wan_fst::write_fst(waveform, file)?,
    }
    Ok(())
}

/// Runs the restricted quick-times scan on `path`: the timescale exponent
/// and the sorted set of distinct change times, without building a full
/// [`Waveform`]. The single required input to [`merge`].
pub fn quick_times(path: impl AsRef<Path>) -> Result<(i8, Vec<u64>), WanError> {
    let path = path.as_ref();
    let file = BufReader::new(File::open(path)?);
    match Codec::from_path(path)? {
        Codec::Vcd => Ok(wan_vcd::quick_times(file)?),
        Codec::Fst => Ok(wan_fst::quick_times(file)?),
    }
}
