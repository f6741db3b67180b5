//! Bounded buffer of recent flag evaluations.
//!
//! This module keeps the last N distinct flag evaluations in recency order
//! so they can be attached to an error report. Re-evaluating a flag moves
//! it to the most recent position; a new flag at capacity evicts the flag
//! least recently set.

mod flag_buffer;

pub use flag_buffer::{BufferStats, FlagBuffer};
