//! Candidate matching and the attempt loop.
//!
//! A [`Resolver`] is built per call from a borrowed [`Registry`]. It asks
//! every installed codec for a match, ranks the survivors by confidence
//! (stable, so registration order breaks ties) and then attempts them in
//! turn. A candidate that declines gets its effects undone before the next
//! one runs:
//!
//! | Target | Rollback |
//! |--------|----------|
//! | Seekable source | seek back to the starting position |
//! | Non-seekable source | spooled into memory first when more than one candidate matched |
//! | Seekable sink | seek back and truncate at the starting position |
//! | Non-seekable sink | each attempt is buffered and copied out only on success |
//! | Path | each candidate writes its own temporary file, discarded unless committed |

use super::{Attempt, Candidate, Codec, Direction, LoadRequest, Registry, SaveRequest, TargetKind};
use crate::config::StowageConfig;
use crate::io::{PathAdapter, ReadStream, Sink, Source, WriteStream};
use crate::value::Value;
use crate::{Error, Result};
use std::io::{Cursor, Read, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolver behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverSettings {
    /// Retry path operations by content when the hint matched no codec.
    pub sniff_fallback: bool,
    /// Permit lazily loaded values. Combined with the per-request flag.
    pub allow_lazy: bool,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            sniff_fallback: true,
            allow_lazy: true,
        }
    }
}

impl From<&StowageConfig> for ResolverSettings {
    fn from(config: &StowageConfig) -> Self {
        Self {
            sniff_fallback: config.resolver.sniff_fallback,
            allow_lazy: config.resolver.allow_lazy,
        }
    }
}

/// Result of running the attempt loop to the end.
enum Settled<T> {
    Done(T),
    /// Every candidate declined. Holds the first capability refusal, if any.
    Declined(Option<Error>),
}

impl<T> Settled<T> {
    fn finish(self, exhausted: impl FnOnce() -> Error) -> Result<T> {
        match self {
            Self::Done(output) => Ok(output),
            Self::Declined(Some(refusal)) => Err(refusal),
            Self::Declined(None) => Err(exhausted()),
        }
    }
}

/// Per-call resolution over a registry.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'r> {
    registry: &'r Registry,
    settings: ResolverSettings,
}

impl<'r> Resolver<'r> {
    /// Creates a resolver.
    #[must_use]
    pub const fn new(registry: &'r Registry, settings: ResolverSettings) -> Self {
        Self { registry, settings }
    }

    /// The settings this resolver runs with.
    #[must_use]
    pub const fn settings(&self) -> ResolverSettings {
        self.settings
    }

    /// Ranked load candidates for a target of `kind`.
    #[must_use]
    pub fn load_candidates(&self, kind: TargetKind, request: &LoadRequest<'_>) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = self
            .registry
            .codecs()
            .iter()
            .filter_map(|codec| Arc::clone(codec).match_load(kind, request))
            .collect();
        candidates.sort_by_key(|candidate| candidate.confidence);
        candidates
    }

    /// Ranked save candidates for `value` and a target of `kind`.
    #[must_use]
    pub fn save_candidates(
        &self,
        value: &Value,
        kind: TargetKind,
        request: &SaveRequest<'_>,
    ) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = self
            .registry
            .codecs()
            .iter()
            .filter_map(|codec| Arc::clone(codec).match_save(value, kind, request))
            .collect();
        candidates.sort_by_key(|candidate| candidate.confidence);
        candidates
    }

    /// Loads a value from a file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the file does not exist,
    /// [`Error::Exhausted`] if no codec could decode it, and any hard error
    /// raised by the chosen codec.
    pub fn load_path(&self, path: &Path, request: &LoadRequest<'_>) -> Result<Value> {
        let request = self.effective(request);
        let candidates = self.load_candidates(TargetKind::Path, &request);

        if candidates.is_empty() && request.hint.is_some() && self.settings.sniff_fallback {
            debug!(
                hint = request.hint,
                path = %path.display(),
                "No codec matched the hint, sniffing content"
            );
            let mut file = PathAdapter::open(path)?;
            let sniffing = request.with_hint(None).with_allow_lazy(false);
            return self
                .load_stream(&mut file, &sniffing)
                .map_err(|e| with_hint(e, request.hint));
        }

        drive(Direction::Load, &candidates, |codec| {
            codec.load(Source::Path(path), &request)
        })?
        .finish(|| exhausted(Direction::Load, request.hint, None))
    }

    /// Loads a value from a stream.
    ///
    /// A non-seekable stream is read into memory first when more than one
    /// codec could claim it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Exhausted`] if no codec could decode the input,
    /// [`Error::RequiresCapability`] if the only willing codec needed lazy
    /// access, and any hard error raised by the chosen codec.
    pub fn load_stream(&self, source: &mut dyn ReadStream, request: &LoadRequest<'_>) -> Result<Value> {
        let request = self.effective(request);
        let candidates = self.load_candidates(TargetKind::Stream, &request);

        if source.is_seekable() || candidates.len() <= 1 {
            return load_rewinding(source, &candidates, &request);
        }

        debug!(candidates = candidates.len(), "Spooling non-seekable source");
        let mut spooled = Vec::new();
        source
            .read_to_end(&mut spooled)
            .map_err(|e| Error::io("spool source", e))?;
        load_rewinding(&mut Cursor::new(spooled), &candidates, &request)
    }

    /// Saves a value to a file and returns the suffix actually written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the destination directory does not
    /// exist, [`Error::Exhausted`] if no codec could encode the value, and
    /// any hard error raised by the chosen codec.
    pub fn save_path(&self, value: &Value, path: &Path, request: &SaveRequest<'_>) -> Result<String> {
        let candidates = self.save_candidates(value, TargetKind::Path, request);

        if candidates.is_empty() && request.hint.is_some() && self.settings.sniff_fallback {
            debug!(
                hint = request.hint,
                path = %path.display(),
                value_type = value.type_name(),
                "No codec matched the hint, choosing by value type"
            );
            let mut pending = PathAdapter::create(path)?;
            let suffix = self
                .save_stream(value, pending.file_mut(), &request.with_hint(None))
                .map_err(|e| with_hint(e, request.hint))?;
            pending.commit()?;
            return Ok(suffix);
        }

        drive(Direction::Save, &candidates, |codec| {
            codec.save(value, Sink::Path(path), request)
        })?
        .finish(|| exhausted(Direction::Save, request.hint, Some(value.type_name())))
    }

    /// Saves a value to a stream and returns the suffix actually written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Exhausted`] if no codec could encode the value, and
    /// any hard error raised by the chosen codec or the sink.
    pub fn save_stream(
        &self,
        value: &Value,
        sink: &mut dyn WriteStream,
        request: &SaveRequest<'_>,
    ) -> Result<String> {
        let candidates = self.save_candidates(value, TargetKind::Stream, request);
        let exhausted_save = || exhausted(Direction::Save, request.hint, Some(value.type_name()));

        if sink.is_seekable() || candidates.len() <= 1 {
            return save_truncating(value, sink, &candidates, request)?.finish(exhausted_save);
        }

        debug!(candidates = candidates.len(), "Buffering attempts for non-seekable sink");
        drive(Direction::Save, &candidates, |codec| {
            let mut buffer = Cursor::new(Vec::new());
            let outcome = codec.save(value, Sink::Stream(&mut buffer), request)?;
            if outcome.is_done() {
                sink.write_all(buffer.get_ref())
                    .and_then(|()| sink.flush())
                    .map_err(|e| Error::io("copy buffered output", e))?;
            }
            Ok(outcome)
        })?
        .finish(exhausted_save)
    }

    fn effective<'a>(&self, request: &LoadRequest<'a>) -> LoadRequest<'a> {
        request.with_allow_lazy(request.allow_lazy && self.settings.allow_lazy)
    }
}

fn load_rewinding(
    source: &mut dyn ReadStream,
    candidates: &[Candidate],
    request: &LoadRequest<'_>,
) -> Result<Value> {
    let start = if source.is_seekable() {
        Some(
            source
                .position()
                .map_err(|e| Error::io("record source position", e))?,
        )
    } else {
        None
    };

    drive(Direction::Load, candidates, |codec| {
        let outcome = codec.load(Source::Stream(&mut *source), request)?;
        if let (false, Some(start)) = (outcome.is_done(), start) {
            debug!(position = start, "Rewinding source");
            source
                .rewind_to(start)
                .map_err(|e| Error::io("rewind source", e))?;
        }
        Ok(outcome)
    })?
    .finish(|| exhausted(Direction::Load, request.hint, None))
}

fn save_truncating(
    value: &Value,
    sink: &mut dyn WriteStream,
    candidates: &[Candidate],
    request: &SaveRequest<'_>,
) -> Result<Settled<String>> {
    let start = if sink.is_seekable() {
        Some(
            sink.position()
                .map_err(|e| Error::io("record sink position", e))?,
        )
    } else {
        None
    };

    drive(Direction::Save, candidates, |codec| {
        let outcome = codec.save(value, Sink::Stream(&mut *sink), request)?;
        if let (false, Some(start)) = (outcome.is_done(), start) {
            debug!(position = start, "Truncating sink");
            sink.rewind_to(start)
                .and_then(|()| sink.truncate_at(start))
                .map_err(|e| Error::io("truncate sink", e))?;
        }
        Ok(outcome)
    })
}

/// Attempts `candidates` in order until one succeeds or all decline.
///
/// `attempt` is responsible for undoing a declined candidate's effects.
/// Hard errors stop the loop immediately.
fn drive<T>(
    direction: Direction,
    candidates: &[Candidate],
    mut attempt: impl FnMut(&dyn Codec) -> Result<Attempt<T>>,
) -> Result<Settled<T>> {
    let mut refusal = None;
    for candidate in candidates {
        let codec = candidate.codec.name();
        debug!(
            %direction,
            codec = %codec,
            confidence = ?candidate.confidence,
            "Attempting codec"
        );
        match attempt(candidate.codec.as_ref())? {
            Attempt::Done(output) => {
                debug!(%direction, codec = %codec, "Codec succeeded");
                return Ok(Settled::Done(output));
            }
            Attempt::WrongFormat(reason) => {
                debug!(%direction, codec = %codec, %reason, "Codec declined");
            }
            Attempt::RequiresCapability(capability) => {
                debug!(%direction, codec = %codec, %capability, "Codec needs a withheld capability");
                refusal.get_or_insert_with(|| Error::RequiresCapability {
                    codec: codec.into_owned(),
                    capability,
                });
            }
        }
    }
    Ok(Settled::Declined(refusal))
}

fn exhausted(direction: Direction, hint: Option<&str>, value_type: Option<&'static str>) -> Error {
    warn!(%direction, hint, value_type, "No codec was able to handle the request");
    Error::Exhausted {
        direction,
        hint: hint.map(str::to_string),
        value_type,
    }
}

/// Restores the caller's hint on an exhaustion raised by a hint-less retry.
fn with_hint(error: Error, hint: Option<&str>) -> Error {
    match error {
        Error::Exhausted {
            direction,
            value_type,
            ..
        } => Error::Exhausted {
            direction,
            hint: hint.map(str::to_string),
            value_type,
        },
        other => other,
    }
}
