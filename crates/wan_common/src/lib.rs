//! Foundational types shared across the waveform core.
//!
//! This crate provides the pieces that have no opinion about waveforms,
//! scopes, or codecs: 4-state logic values, the packed bit vector built from
//! them, and a generic append-only arena used to hand out stable indices to
//! the layers above.

#![warn(missing_docs)]

pub mod arena;
pub mod bitvector;
pub mod logic;

pub use arena::{Arena, ArenaId};
pub use bitvector::{BitVector, BitVectorError};
pub use logic::LogicValue;
