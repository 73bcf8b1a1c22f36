//! Targets of load and save operations.
//!
//! A target is either a filesystem path, which the chosen codec opens
//! itself, or a caller-owned byte stream borrowed for the duration of one
//! call.

mod path;
mod stream;

pub use path::{PathAdapter, PendingFile};
pub use stream::{ReadStream, Unseekable, WriteStream, read_magic};

use crate::codec::TargetKind;
use std::path::Path;

/// Where a value is loaded from.
pub enum Source<'a> {
    /// A file on disk.
    Path(&'a Path),
    /// A readable stream.
    Stream(&'a mut dyn ReadStream),
}

impl Source<'_> {
    /// The kind of this target.
    #[must_use]
    pub const fn kind(&self) -> TargetKind {
        match self {
            Self::Path(_) => TargetKind::Path,
            Self::Stream(_) => TargetKind::Stream,
        }
    }
}

impl std::fmt::Debug for Source<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Where a value is saved to.
pub enum Sink<'a> {
    /// A file on disk.
    Path(&'a Path),
    /// A writable stream.
    Stream(&'a mut dyn WriteStream),
}

impl Sink<'_> {
    /// The kind of this target.
    #[must_use]
    pub const fn kind(&self) -> TargetKind {
        match self {
            Self::Path(_) => TargetKind::Path,
            Self::Stream(_) => TargetKind::Stream,
        }
    }
}

impl std::fmt::Debug for Sink<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}
