//! In-memory digital-simulation waveform data model.
//!
//! A [`Waveform`] owns a shared time axis, every [`Signal`]'s packed change
//! log, and a hierarchical [`Scope`] tree naming them. Codec crates built on
//! top of this one (VCD, FST readers/writers) populate and drain a
//! `Waveform`; a [`Visitor`] walks its scope tree for formats or analyses
//! that need ordered, filtered traversal instead of direct indexing.
//!
//! # Modules
//!
//! - `error` — structural errors raised while building or querying a waveform
//! - `signal` — packed, width-checked per-signal change logs
//! - `scope` — the hierarchical scope tree and signal descriptors
//! - `waveform` — the aggregate tying time axis, signals, and scopes together
//! - `visitor` — depth-first traversal with skip flags and scope filters

pub mod error;
pub mod scope;
pub mod signal;
pub mod visitor;
pub mod waveform;

pub use error::WaveformError;
pub use scope::{Scope, ScopeKind, SignalDesc, SignalKind, ROOT_INSTANCE_NAME};
pub use signal::{Change, Changes, Pack, Signal, SignalIdx, SLOTS_PER_PACK};
pub use visitor::{visit, ScopeFilterResult, VisitOptions, Visitor};
pub use waveform::Waveform;
