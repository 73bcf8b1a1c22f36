//! # Stowage
//!
//! Runtime codec resolution for loading and saving values.
//!
//! Given a value, a destination (a path or a seekable byte stream) and an
//! optional name-like hint such as `"scan.npy.gz"`, stowage decides which of
//! the installed codecs should do the work. When the hint is missing, it
//! falls back to recognising the format from the bytes themselves.
//!
//! ## Features
//!
//! - Ordered candidate matching with `Certain` / `Unsure` confidence
//! - Speculative attempts with seek-and-truncate rollback between candidates
//! - Compound suffixes (`.npy.gz`, `.json.gz`) through a composable gzip wrapper
//! - Codecs for JSON, text, CSV, YAML, NumPy arrays, raster images, NIfTI-1
//!   volumes, DICOM files and a CBOR-packed catch-all, each behind a cargo feature
//!
//! ## Example
//!
//! ```rust,ignore
//! use stowage::{Stowage, SaveOptions, Value};
//!
//! let stowage = Stowage::standard();
//! let suffix = stowage.save_path(&Value::from(serde_json::json!({"a": 1})), "out.json.gz", &SaveOptions::new())?;
//! assert_eq!(suffix, ".json.gz");
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;
use thiserror::Error as ThisError;

// Module declarations
pub mod api;
pub mod cli;
pub mod codec;
pub mod config;
pub mod formats;
pub mod io;
pub mod observability;
pub mod value;

// Re-exports for convenience
pub use api::{
    LoadOptions, SaveOptions, Stowage, load, load_json, load_text, save, save_json, save_text,
};
#[cfg(feature = "npy")]
pub use api::{load_npy, save_npy};
#[cfg(feature = "csv")]
pub use api::{load_csv, save_csv};
#[cfg(feature = "packed")]
pub use api::{load_packed, save_packed};
pub use codec::{
    Attempt, Candidate, Capability, Codec, Confidence, Direction, ExtensionMatch, Format, Gzip,
    HintSource, LoadRequest, Params, Registry, Resolver, ResolverSettings, SaveRequest, TargetKind,
    Targets,
};
pub use config::StowageConfig;
pub use io::{PathAdapter, ReadStream, Sink, Source, WriteStream};
pub use value::{DType, DicomFile, LazyArray, NdArray, Table, Value, Volume};

/// Error type for stowage operations.
///
/// Only two outcomes of a codec attempt are recoverable, and neither of them
/// is an `Error`: a codec that does not recognise its input returns
/// [`Attempt::WrongFormat`], and one that needs a capability the caller did
/// not grant returns [`Attempt::RequiresCapability`]. Everything here ends the
/// call.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `Exhausted` | No registered codec matched, or every candidate declined |
/// | `RequiresCapability` | The only codecs able to decode needed lazy access that was refused |
/// | `Format` | The chosen codec's backing encoder or decoder failed |
/// | `NotFound` | A source path or destination directory does not exist |
/// | `Io` | Any other I/O failure while reading, writing or rolling back |
/// | `InvalidInput` | A parameter has the wrong type or range, or a value is malformed |
/// | `OperationFailed` | Configuration loading or logging setup fails |
#[derive(Debug, ThisError)]
pub enum Error {
    /// No codec accepted the operation.
    ///
    /// Raised when the candidate list was empty or every candidate reported
    /// the input as not its format.
    #[error("{}", exhausted_message(.direction, .hint, .value_type))]
    Exhausted {
        /// Whether a load or a save was attempted.
        direction: Direction,
        /// The hint the codecs were matched against.
        hint: Option<String>,
        /// Type name of the value being saved (`None` for loads).
        value_type: Option<&'static str>,
    },

    /// A candidate required a capability the caller disallowed.
    ///
    /// Only surfaced when no other candidate succeeded; it carries more
    /// actionable information than a bare exhaustion.
    #[error("{codec} requires {capability}, which is not available for this call")]
    RequiresCapability {
        /// The codec that asked for the capability.
        codec: String,
        /// The capability it asked for.
        capability: Capability,
    },

    /// The backing encoder or decoder of the chosen codec failed.
    #[error("{codec} failed to {direction}: {source}")]
    Format {
        /// The codec that failed.
        codec: String,
        /// Whether it was loading or saving.
        direction: Direction,
        /// The underlying cause.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A path does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// An I/O operation failed.
    #[error("I/O error during {operation}: {source}")]
    Io {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        #[source]
        source: std::io::Error,
    },

    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - A parameter has the wrong type (e.g. `indent: "wide"`)
    /// - A numeric parameter is out of range (e.g. `compression: 12`)
    /// - Array data does not match its declared shape and dtype
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - The configuration file cannot be read or parsed
    /// - Logging has already been initialised
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Wraps a backing format failure.
    pub fn format(
        codec: impl Into<String>,
        direction: Direction,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Format {
            codec: codec.into(),
            direction,
            source: source.into(),
        }
    }

    /// Wraps an I/O failure.
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Returns `true` for [`Error::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

fn exhausted_message(
    direction: &Direction,
    hint: &Option<String>,
    value_type: &Option<&'static str>,
) -> String {
    let hint = hint
        .as_deref()
        .map_or_else(|| "no hint".to_string(), |h| format!("hint {h:?}"));
    match value_type {
        Some(ty) => format!("no codec was able to {direction} a {ty} value ({hint})"),
        None => format!("no codec was able to {direction} the input ({hint})"),
    }
}

/// Result type alias for stowage operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::Exhausted {
            direction: Direction::Load,
            hint: None,
            value_type: None,
        };
        assert_eq!(
            err.to_string(),
            "no codec was able to load the input (no hint)"
        );

        let err = Error::Exhausted {
            direction: Direction::Save,
            hint: Some("x.bin".to_string()),
            value_type: Some("table"),
        };
        assert_eq!(
            err.to_string(),
            "no codec was able to save a table value (hint \"x.bin\")"
        );

        let err = Error::RequiresCapability {
            codec: "npy".to_string(),
            capability: Capability::LazyLoading,
        };
        assert_eq!(
            err.to_string(),
            "npy requires lazy loading, which is not available for this call"
        );
    }

    #[test]
    fn test_not_found_is_distinct() {
        let err = Error::NotFound(PathBuf::from("/some/file.json"));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "file not found: /some/file.json");
        assert!(!Error::InvalidInput(String::new()).is_not_found());
    }
}
