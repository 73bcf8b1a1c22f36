//! Suffix-driven matching for leaf formats.
//!
//! A [`Format`] knows how to read and write one encoding. Wrapped in an
//! [`ExtensionMatch`] it becomes a [`Codec`] that accepts a request when the
//! hint ends with one of the format's suffixes, every parameter is one the
//! format understands, the value is of a supported type, and the target kind
//! is supported.

use super::hint::ends_with_suffix;
use super::{Attempt, Candidate, Codec, Confidence, Direction, LoadRequest, SaveRequest, TargetKind};
use crate::io::{PathAdapter, ReadStream, Sink, Source, WriteStream};
use crate::value::Value;
use crate::{Error, Result};
use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

/// Target kinds a format can work with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Targets {
    /// Paths and streams.
    #[default]
    Both,
    /// Paths only; the format needs to open the file itself.
    PathOnly,
    /// Streams only.
    StreamOnly,
}

impl Targets {
    /// Returns `true` if `kind` is supported.
    #[must_use]
    pub const fn supports(self, kind: TargetKind) -> bool {
        matches!(
            (self, kind),
            (Self::Both, _) | (Self::PathOnly, TargetKind::Path) | (Self::StreamOnly, TargetKind::Stream)
        )
    }
}

/// A leaf encoding.
///
/// Stream operations default to declining; path operations default to
/// opening the path through [`PathAdapter`] and running the stream
/// operation on it. A path-only format overrides the path operations.
pub trait Format: Send + Sync + 'static {
    /// Short name, e.g. `"json"`.
    fn name(&self) -> &'static str;

    /// Claimed suffixes, lowercase with the leading dot.
    fn extensions(&self) -> &'static [&'static str];

    /// Supported target kinds.
    fn targets(&self) -> Targets {
        Targets::Both
    }

    /// Whether the content can be recognised without a hint.
    fn sniffable(&self) -> bool {
        false
    }

    /// Parameter keys accepted when loading.
    fn load_params(&self) -> &'static [&'static str] {
        &[]
    }

    /// Parameter keys accepted when saving.
    fn save_params(&self) -> &'static [&'static str] {
        &[]
    }

    /// Whether `value` can be saved in this format.
    fn accepts(&self, value: &Value) -> bool {
        let _ = value;
        true
    }

    /// Whether saving requires a hint to pick the concrete encoding.
    fn save_needs_hint(&self) -> bool {
        false
    }

    /// Decodes from a stream.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, or a format error when a hint named
    /// this format but the content does not decode.
    fn load_stream(
        &self,
        source: &mut dyn ReadStream,
        request: &LoadRequest<'_>,
    ) -> Result<Attempt<Value>> {
        let _ = (source, request);
        Ok(Attempt::wrong_format(format!(
            "{} cannot read from a stream",
            self.name()
        )))
    }

    /// Encodes into a stream, returning the suffix written.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O or encoder failure.
    fn save_stream(
        &self,
        value: &Value,
        sink: &mut dyn WriteStream,
        request: &SaveRequest<'_>,
    ) -> Result<Attempt<String>> {
        let _ = (value, sink, request);
        Ok(Attempt::wrong_format(format!(
            "{} cannot write to a stream",
            self.name()
        )))
    }

    /// Decodes from a file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for a missing file, otherwise as
    /// [`Format::load_stream`].
    fn load_path(&self, path: &Path, request: &LoadRequest<'_>) -> Result<Attempt<Value>> {
        let mut file = PathAdapter::open(path)?;
        self.load_stream(&mut file, request)
    }

    /// Encodes into a file, replacing it only if the encoding succeeds.
    ///
    /// # Errors
    ///
    /// As [`Format::save_stream`], plus failures creating or committing the
    /// file.
    fn save_path(
        &self,
        value: &Value,
        path: &Path,
        request: &SaveRequest<'_>,
    ) -> Result<Attempt<String>> {
        let mut pending = PathAdapter::create(path)?;
        let outcome = self.save_stream(value, pending.file_mut(), request)?;
        if outcome.is_done() {
            pending.commit()?;
        }
        Ok(outcome)
    }
}

/// Returns the declared suffix the hint ends with, preferring the longest;
/// without a match, the first declared suffix.
#[must_use]
pub fn matched_suffix(extensions: &[&str], hint: Option<&str>) -> String {
    hint.and_then(|hint| {
        extensions
            .iter()
            .filter(|ext| ends_with_suffix(hint, ext))
            .max_by_key(|ext| ext.len())
    })
    .or_else(|| extensions.first())
    .map_or_else(String::new, |ext| (*ext).to_string())
}

/// Classifies a decoding failure.
///
/// Without a hint the codec was only guessing, so the failure just means
/// "not this format". With a hint the caller named the format and the
/// failure is reported.
///
/// # Errors
///
/// Returns [`Error::Format`] when `hint` is present.
pub fn decode_failure<T>(
    codec: &str,
    hint: Option<&str>,
    cause: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> Result<Attempt<T>> {
    let cause = cause.into();
    match hint {
        None => Ok(Attempt::WrongFormat(cause.to_string())),
        Some(_) => Err(Error::format(codec, Direction::Load, cause)),
    }
}

/// Adapts a [`Format`] into a [`Codec`] that matches on suffix.
#[derive(Debug, Clone, Default)]
pub struct ExtensionMatch<F>(F);

impl<F: Format> ExtensionMatch<F> {
    /// Wraps `format`.
    pub const fn new(format: F) -> Self {
        Self(format)
    }

    /// Returns the wrapped format.
    pub const fn format(&self) -> &F {
        &self.0
    }

    fn named_by(&self, hint: &str) -> bool {
        self.0
            .extensions()
            .iter()
            .any(|ext| ends_with_suffix(hint, ext))
    }

    fn load_confidence(&self, kind: TargetKind, request: &LoadRequest<'_>) -> Option<Confidence> {
        if !self.0.targets().supports(kind) || !request.params.keys_within(self.0.load_params()) {
            return None;
        }
        match request.hint {
            Some(hint) => self.named_by(hint).then_some(Confidence::Certain),
            None => self.0.sniffable().then_some(Confidence::Unsure),
        }
    }

    fn save_confidence(
        &self,
        value: &Value,
        kind: TargetKind,
        request: &SaveRequest<'_>,
    ) -> Option<Confidence> {
        if !self.0.targets().supports(kind)
            || !request.params.keys_within(self.0.save_params())
            || !self.0.accepts(value)
        {
            return None;
        }
        match request.hint {
            Some(hint) => self.named_by(hint).then_some(Confidence::Certain),
            None => (!self.0.save_needs_hint()).then_some(Confidence::Unsure),
        }
    }
}

impl<F: Format> Codec for ExtensionMatch<F> {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(self.0.name())
    }

    fn suffixes(&self) -> Vec<String> {
        self.0.extensions().iter().map(|ext| (*ext).to_string()).collect()
    }

    fn match_load(
        self: Arc<Self>,
        kind: TargetKind,
        request: &LoadRequest<'_>,
    ) -> Option<Candidate> {
        let confidence = self.load_confidence(kind, request)?;
        Some(Candidate::new(confidence, self))
    }

    fn match_save(
        self: Arc<Self>,
        value: &Value,
        kind: TargetKind,
        request: &SaveRequest<'_>,
    ) -> Option<Candidate> {
        let confidence = self.save_confidence(value, kind, request)?;
        Some(Candidate::new(confidence, self))
    }

    fn load(&self, source: Source<'_>, request: &LoadRequest<'_>) -> Result<Attempt<Value>> {
        if !self.0.targets().supports(source.kind()) {
            return Ok(Attempt::wrong_format(format!(
                "{} does not support {:?} targets",
                self.0.name(),
                source.kind()
            )));
        }
        match source {
            Source::Path(path) => self.0.load_path(path, request),
            Source::Stream(stream) => self.0.load_stream(stream, request),
        }
    }

    fn save(
        &self,
        value: &Value,
        sink: Sink<'_>,
        request: &SaveRequest<'_>,
    ) -> Result<Attempt<String>> {
        if !self.0.targets().supports(sink.kind()) {
            return Ok(Attempt::wrong_format(format!(
                "{} does not support {:?} targets",
                self.0.name(),
                sink.kind()
            )));
        }
        if !self.0.accepts(value) {
            return Ok(Attempt::wrong_format(format!(
                "{} cannot store a {} value",
                self.0.name(),
                value.type_name()
            )));
        }
        match sink {
            Sink::Path(path) => self.0.save_path(value, path, request),
            Sink::Stream(stream) => self.0.save_stream(value, stream, request),
        }
    }
}
