//! Core types for repograph
//!
//! Error taxonomy and user-facing error reporting shared by the resolution engine
//! and the CLI. See [`error`] for details.

pub mod error;

pub use error::{
    ErrorContext, GraphError, ModelLoadError, ModelLoadErrorKind, ResolutionError,
    user_friendly_error,
};
