//! Audio feature extraction and heuristic genre classification
//!
//! `features::analyze` is the single entry point: it decodes a file, runs the
//! framed spectral analysis, estimates tempo and dominant pitch class, and
//! attaches genre hints. It always returns a record, degrading to a
//! null-field record on failure.

pub mod classify;
pub mod features;
pub mod tempo;

pub use features::analyze;
