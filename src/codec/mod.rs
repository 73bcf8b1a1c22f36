//! Codec contract and the resolution engine.
//!
//! Every installed codec implements [`Codec`]: a pure matching half that
//! reports whether (and how confidently) it can serve a request, and an
//! effectful half that performs the actual load or save.
//!
//! # Matching
//!
//! Matching returns `Option<Candidate>`. `None` rejects the request. A
//! present candidate carries a [`Confidence`] used for ranking and the
//! concrete codec instance that will run, which for wrappers such as
//! [`Gzip`] is a freshly composed wrapper around the matched inner codec.
//!
//! # Attempting
//!
//! `load` and `save` return `Result<Attempt<T>>`. Hard failures are `Err`
//! and abort the whole call; [`Attempt::WrongFormat`] and
//! [`Attempt::RequiresCapability`] are interpreted by the [`Resolver`],
//! which rolls the stream back and moves on to the next candidate.

mod extension;
mod gzip;
mod hint;
mod params;
mod registry;
mod resolver;

pub use extension::{ExtensionMatch, Format, Targets, decode_failure, matched_suffix};
pub use gzip::{DEFAULT_LEVEL, GZIP_MAGIC, Gzip};
pub use hint::{HintSource, append_suffix, ends_with_suffix, strip_suffix};
pub use params::Params;
pub use registry::Registry;
pub use resolver::{Resolver, ResolverSettings};

use crate::Result;
use crate::io::{Sink, Source};
use crate::value::Value;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Direction of an operation. Matching is computed independently per direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Decoding a value from a source.
    Load,
    /// Encoding a value into a sink.
    Save,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => write!(f, "load"),
            Self::Save => write!(f, "save"),
        }
    }
}

/// Kind of target an operation runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// A filesystem path; the codec opens it itself.
    Path,
    /// A caller-owned byte stream.
    Stream,
}

/// How confident a codec is that it owns a request.
///
/// Ordered best first, so an ascending sort ranks `Certain` ahead of `Unsure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Confidence {
    /// The hint names this codec's format.
    Certain,
    /// No naming information; the codec will have to inspect the content.
    Unsure,
}

/// A capability a codec may need that the caller can withhold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Returning a value that reads its payload from the source later.
    LazyLoading,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LazyLoading => write!(f, "lazy loading"),
        }
    }
}

/// Outcome of a single codec attempt that did not fail hard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T> {
    /// The codec handled the request.
    Done(T),
    /// The input is not in this codec's format; try the next candidate.
    WrongFormat(String),
    /// The codec could handle the input only with a withheld capability.
    RequiresCapability(Capability),
}

impl<T> Attempt<T> {
    /// Shorthand for [`Attempt::WrongFormat`].
    pub fn wrong_format(reason: impl Into<String>) -> Self {
        Self::WrongFormat(reason.into())
    }

    /// Maps the successful payload.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Attempt<U> {
        match self {
            Self::Done(value) => Attempt::Done(f(value)),
            Self::WrongFormat(reason) => Attempt::WrongFormat(reason),
            Self::RequiresCapability(capability) => Attempt::RequiresCapability(capability),
        }
    }

    /// Returns `true` for [`Attempt::Done`].
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }
}

/// A matched codec, ready to be attempted.
#[derive(Clone)]
pub struct Candidate {
    /// Rank of this candidate.
    pub confidence: Confidence,
    /// The instance that will perform the operation.
    pub codec: Arc<dyn Codec>,
}

impl Candidate {
    /// Creates a candidate.
    #[must_use]
    pub fn new(confidence: Confidence, codec: Arc<dyn Codec>) -> Self {
        Self { confidence, codec }
    }
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate")
            .field("confidence", &self.confidence)
            .field("codec", &self.codec.name())
            .finish()
    }
}

/// Parameters of a load request, shared by matching and loading.
#[derive(Debug, Clone, Copy)]
pub struct LoadRequest<'a> {
    /// Name-like hint, or `None` to infer from content.
    pub hint: Option<&'a str>,
    /// Format-specific parameters.
    pub params: &'a Params,
    /// Whether the caller permits lazily loaded values.
    pub allow_lazy: bool,
}

impl<'a> LoadRequest<'a> {
    /// Creates a request that permits lazy loading.
    #[must_use]
    pub const fn new(hint: Option<&'a str>, params: &'a Params) -> Self {
        Self {
            hint,
            params,
            allow_lazy: true,
        }
    }

    /// Returns a copy with a different hint.
    #[must_use]
    pub const fn with_hint(self, hint: Option<&'a str>) -> Self {
        Self { hint, ..self }
    }

    /// Returns a copy with different parameters.
    #[must_use]
    pub const fn with_params(self, params: &'a Params) -> Self {
        Self { params, ..self }
    }

    /// Returns a copy with lazy loading permitted or refused.
    #[must_use]
    pub const fn with_allow_lazy(self, allow_lazy: bool) -> Self {
        Self { allow_lazy, ..self }
    }
}

/// Parameters of a save request, shared by matching and saving.
#[derive(Debug, Clone, Copy)]
pub struct SaveRequest<'a> {
    /// Name-like hint, or `None` to choose from the value type alone.
    pub hint: Option<&'a str>,
    /// Format-specific parameters.
    pub params: &'a Params,
}

impl<'a> SaveRequest<'a> {
    /// Creates a request.
    #[must_use]
    pub const fn new(hint: Option<&'a str>, params: &'a Params) -> Self {
        Self { hint, params }
    }

    /// Returns a copy with a different hint.
    #[must_use]
    pub const fn with_hint(self, hint: Option<&'a str>) -> Self {
        Self { hint, ..self }
    }

    /// Returns a copy with different parameters.
    #[must_use]
    pub const fn with_params(self, params: &'a Params) -> Self {
        Self { params, ..self }
    }
}

/// Uniform capability contract of an installed codec.
///
/// Matching must be pure: only `load` and `save` may perform I/O.
/// Implementations are shared read-only across threads through the
/// [`Registry`].
pub trait Codec: Send + Sync {
    /// Human-readable name, e.g. `"json"` or `"gzip(npy)"`.
    fn name(&self) -> Cow<'static, str>;

    /// Suffixes this codec claims, e.g. `[".npy.gz"]`.
    fn suffixes(&self) -> Vec<String>;

    /// Decides whether this codec can load from a target of `kind`.
    fn match_load(self: Arc<Self>, kind: TargetKind, request: &LoadRequest<'_>)
    -> Option<Candidate>;

    /// Decides whether this codec can save `value` to a target of `kind`.
    fn match_save(
        self: Arc<Self>,
        value: &Value,
        kind: TargetKind,
        request: &SaveRequest<'_>,
    ) -> Option<Candidate>;

    /// Decodes a value from `source`.
    fn load(&self, source: Source<'_>, request: &LoadRequest<'_>) -> Result<Attempt<Value>>;

    /// Encodes `value` into `sink`, returning the canonical suffix written.
    fn save(&self, value: &Value, sink: Sink<'_>, request: &SaveRequest<'_>)
    -> Result<Attempt<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_orders_certain_first() {
        let mut ranks = vec![Confidence::Unsure, Confidence::Certain, Confidence::Unsure];
        ranks.sort();
        assert_eq!(
            ranks,
            vec![Confidence::Certain, Confidence::Unsure, Confidence::Unsure]
        );
    }

    #[test]
    fn test_attempt_map() {
        let done: Attempt<u8> = Attempt::Done(2);
        assert_eq!(done.map(|v| v * 2), Attempt::Done(4));

        let wrong: Attempt<u8> = Attempt::wrong_format("nope");
        assert_eq!(wrong.map(|v| v * 2), Attempt::WrongFormat("nope".to_string()));
        assert!(!Attempt::<u8>::RequiresCapability(Capability::LazyLoading).is_done());
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(Direction::Load.to_string(), "load");
        assert_eq!(Direction::Save.to_string(), "save");
    }

    #[test]
    fn test_request_builders() {
        let params = Params::new();
        let request = LoadRequest::new(Some("a.json"), &params);
        assert!(request.allow_lazy);
        let stripped = request.with_hint(None).with_allow_lazy(false);
        assert_eq!(stripped.hint, None);
        assert!(!stripped.allow_lazy);
    }
}
