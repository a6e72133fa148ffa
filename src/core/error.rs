//! Error handling for repograph
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** for precise handling inside the resolution engine
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Error Taxonomy
//!
//! - [`ModelLoadError`] - the model loader failed for one coordinate. Non-fatal: the node
//!   stays unresolved and the resolve loop decides whether to skip or abort.
//! - [`ResolutionError`] - the root could not be resolved, or resolution was cancelled.
//!   Fatal to graph creation.
//! - [`GraphError::GraphInvariant`] - an internal assertion; a correct engine never
//!   produces it.
//! - [`GraphError::RelocationLoop`] - relocations that lead back to an already relocated
//!   coordinate.
//!
//! Application layers work with [`anyhow::Error`]; the binary converts whatever reaches
//! `main` into an [`ErrorContext`] via [`user_friendly_error`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use repograph_cli::core::{ErrorContext, GraphError, user_friendly_error};
//!
//! let error = GraphError::ConfigError { message: "max_parallel must be > 0".into() };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

use crate::coordinate::VersionedReference;

/// Why a model could not be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelLoadErrorKind {
    /// No descriptor exists for the reference.
    NotFound,
    /// A descriptor exists but cannot be parsed.
    Malformed,
    /// Reading the descriptor failed; may succeed on retry.
    Io,
}

/// The model loader failed for a referenced coordinate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to load project model for {reference}: {reason}")]
pub struct ModelLoadError {
    pub reference: VersionedReference,
    pub kind: ModelLoadErrorKind,
    pub reason: String,
}

impl ModelLoadError {
    pub fn not_found(reference: &VersionedReference) -> Self {
        Self {
            reference: reference.clone(),
            kind: ModelLoadErrorKind::NotFound,
            reason: "no project descriptor found".to_string(),
        }
    }

    pub fn malformed(reference: &VersionedReference, reason: impl Into<String>) -> Self {
        Self {
            reference: reference.clone(),
            kind: ModelLoadErrorKind::Malformed,
            reason: reason.into(),
        }
    }

    pub fn io(reference: &VersionedReference, reason: impl Into<String>) -> Self {
        Self {
            reference: reference.clone(),
            kind: ModelLoadErrorKind::Io,
            reason: reason.into(),
        }
    }

    /// Only I/O failures are worth retrying; a missing or malformed descriptor stays so.
    pub fn is_transient(&self) -> bool {
        self.kind == ModelLoadErrorKind::Io
    }
}

/// Failure to produce a graph for a root reference.
///
/// Wraps the error that prevented the root from resolving, or records that the
/// caller cancelled the resolution (`cancelled == true`). A cancelled resolution
/// still leaves a structurally valid graph behind in the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionError {
    pub reference: VersionedReference,
    pub cancelled: bool,
    pub cause: Option<Box<GraphError>>,
}

impl ResolutionError {
    pub fn root_failed(reference: &VersionedReference, cause: GraphError) -> Self {
        Self {
            reference: reference.clone(),
            cancelled: false,
            cause: Some(Box::new(cause)),
        }
    }

    pub fn cancelled(reference: &VersionedReference) -> Self {
        Self {
            reference: reference.clone(),
            cancelled: true,
            cause: None,
        }
    }
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cancelled {
            write!(f, "Resolution of {} was cancelled", self.reference)
        } else {
            write!(f, "Failed to resolve root artifact {}", self.reference)
        }
    }
}

impl std::error::Error for ResolutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_deref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// The main error type for graph resolution and the surrounding CLI.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A project model could not be loaded
    #[error(transparent)]
    ModelLoad(#[from] ModelLoadError),

    /// The root could not be resolved, or resolution was cancelled
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// A structural operation was asked to act on a node or edge that is not present
    #[error("Graph invariant violated: {message}")]
    GraphInvariant {
        /// Description of the violated invariant
        message: String,
    },

    /// A relocation chain leads back to a coordinate that was already relocated away
    #[error("Relocation loop detected: {chain}")]
    RelocationLoop {
        /// The relocation chain rendered as `a -> b -> a`
        chain: String,
    },

    /// Invalid resolver configuration
    #[error("Configuration error: {message}")]
    ConfigError {
        /// What is wrong with the configuration
        message: String,
    },

    /// A file system operation failed
    #[error("File system error: {operation} on {path}")]
    FileSystemError {
        /// The operation that failed
        operation: String,
        /// The path involved
        path: String,
    },

    /// Insufficient permissions for a file operation
    #[error("Permission denied: {operation} on {path}")]
    PermissionDenied {
        /// The operation that was denied
        operation: String,
        /// The path involved
        path: String,
    },

    /// Anything else
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl GraphError {
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::GraphInvariant {
            message: message.into(),
        }
    }

    /// True when this error is a cancelled resolution.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Resolution(ResolutionError { cancelled: true, .. }))
    }
}

/// Error wrapper with a suggestion and details for terminal display.
#[derive(Debug)]
pub struct ErrorContext {
    pub error: GraphError,
    pub suggestion: Option<String>,
    pub details: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub const fn new(error: GraphError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with suggestions where we know of one.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(graph_error) = error.downcast_ref::<GraphError>() {
        return create_error_context(graph_error.clone());
    }
    if let Some(resolution) = error.downcast_ref::<ResolutionError>() {
        return create_error_context(GraphError::Resolution(resolution.clone()));
    }
    if let Some(load) = error.downcast_ref::<ModelLoadError>() {
        return create_error_context(GraphError::ModelLoad(load.clone()));
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(GraphError::PermissionDenied {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                })
                .with_suggestion("Check file ownership and permissions of the repository directory")
                .with_details("repograph needs read access to every descriptor it resolves");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(GraphError::FileSystemError {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct")
                .with_details("A required file or directory could not be found");
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(GraphError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax. Verify quotes, brackets, and key names")
        .with_details(
            "TOML parsing errors are usually caused by missing quotes or mismatched brackets",
        );
    }

    // Generic error: keep the full chain for diagnostics
    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(GraphError::Other {
        message,
    })
}

fn create_error_context(error: GraphError) -> ErrorContext {
    match &error {
        GraphError::ModelLoad(load) => {
            let suggestion = format!(
                "Verify that {} is deployed to the repository and its descriptor is valid TOML",
                load.reference
            );
            ErrorContext::new(error).with_suggestion(suggestion).with_details(concat!(
                "Descriptors are looked up as ",
                "<group/as/path>/<artifactId>/<version>/<artifactId>-<version>.toml",
            ))
        }
        GraphError::Resolution(resolution) if resolution.cancelled => ErrorContext::new(error)
            .with_suggestion("Increase --timeout or check for very long relocation chains")
            .with_details("The partially resolved graph was discarded"),
        GraphError::Resolution(resolution) => {
            let details = resolution.cause.as_ref().map_or_else(
                || "The root model could not be loaded".to_string(),
                |c| c.to_string(),
            );
            ErrorContext::new(error)
                .with_suggestion("Check the root coordinate and the --repo path")
                .with_details(details)
        }
        GraphError::RelocationLoop { .. } => ErrorContext::new(error)
            .with_suggestion("Fix the [relocation] tables so that they do not point at each other")
            .with_details("Relocations are followed transitively and must end at a real model"),
        GraphError::GraphInvariant { .. } => ErrorContext::new(error)
            .with_details("This is a bug in repograph; please report it with RUST_LOG=debug"),
        GraphError::ConfigError { .. } => ErrorContext::new(error)
            .with_suggestion("Check ~/.repograph/config.toml or the file passed with --config"),
        _ => ErrorContext::new(error),
    }
}
