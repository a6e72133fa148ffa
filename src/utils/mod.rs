//! Terminal helpers for the `repograph` binary.
//!
//! - [`progress`] - spinner listener shown while a graph resolves

pub mod progress;

pub use progress::ProgressListener;
