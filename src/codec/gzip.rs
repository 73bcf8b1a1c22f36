//! Gzip composition.
//!
//! [`Gzip`] wraps any codec. It claims hints ending in `.gz`, strips that
//! suffix and asks the inner codec about the rest, so `"x.npy.gz"` resolves
//! to `gzip(npy)` and `"x.json.gz.gz"` to `gzip(gzip(json))` when nested.
//! The inner codec always sees a stream: a decoding view on load and an
//! encoding view on save.

use super::hint::{append_suffix, strip_suffix};
use super::{Attempt, Candidate, Codec, Confidence, Direction, LoadRequest, SaveRequest, TargetKind};
use crate::io::{PathAdapter, ReadStream, Sink, Source, Unseekable, WriteStream, read_magic};
use crate::value::Value;
use crate::{Error, Result};
use flate2::read::GzDecoder;
use flate2::{Compression, GzBuilder};
use std::borrow::Cow;
use std::io::{self, Read, Write};
use std::sync::Arc;

/// Leading bytes of every gzip member.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Compression level used when neither the request nor the configuration
/// names one.
pub const DEFAULT_LEVEL: u32 = 1;

const SUFFIX: &str = ".gz";
const LEVEL_PARAM: &str = "compression";

/// Gzip wrapper around an inner codec.
#[derive(Clone)]
pub struct Gzip {
    inner: Arc<dyn Codec>,
    default_level: u32,
}

impl Gzip {
    /// Wraps `inner` with the default compression level.
    pub fn new(inner: Arc<dyn Codec>) -> Self {
        Self {
            inner,
            default_level: DEFAULT_LEVEL,
        }
    }

    /// Sets the level used when a save request has no `compression` parameter.
    ///
    /// Levels above 9 are capped.
    #[must_use]
    pub fn with_level(mut self, level: u32) -> Self {
        self.default_level = level.min(9);
        self
    }

    /// The wrapped codec.
    pub const fn inner(&self) -> &Arc<dyn Codec> {
        &self.inner
    }

    fn wrap(&self, matched: Candidate, confidence: Confidence) -> Candidate {
        let wrapper = Self {
            inner: matched.codec,
            default_level: self.default_level,
        };
        Candidate::new(confidence, Arc::new(wrapper))
    }

    fn level(&self, request: &SaveRequest<'_>) -> Result<u32> {
        match request.params.get_u64(LEVEL_PARAM)? {
            None => Ok(self.default_level),
            Some(level) if level <= 9 => Ok(u32::try_from(level).unwrap_or(9)),
            Some(level) => Err(Error::InvalidInput(format!(
                "gzip compression level must be between 0 and 9, got {level}"
            ))),
        }
    }

    fn structural<T>(&self, hint: Option<&str>, cause: impl Into<String>) -> Result<Attempt<T>> {
        let cause = cause.into();
        match hint {
            None => Ok(Attempt::WrongFormat(cause)),
            Some(_) => Err(Error::format(self.name(), Direction::Load, cause)),
        }
    }

    fn load_from(
        &self,
        source: &mut dyn ReadStream,
        request: &LoadRequest<'_>,
    ) -> Result<Attempt<Value>> {
        let magic = read_magic::<2>(source).map_err(|e| Error::io("read gzip header", e))?;
        match magic {
            Some(magic) if magic == GZIP_MAGIC => {}
            Some(_) => return self.structural(request.hint, "missing gzip magic"),
            None => return self.structural(request.hint, "input is shorter than a gzip header"),
        }

        let params = request.params.without(LEVEL_PARAM);
        let inner_request = request
            .with_hint(inner_hint(request.hint))
            .with_params(&params)
            .with_allow_lazy(false);

        let decoder = GzDecoder::new((&GZIP_MAGIC[..]).chain(source));
        let mut view = Unseekable::new(Tracked::new(decoder));
        let outcome = self.inner.load(Source::Stream(&mut view), &inner_request);

        // A broken gzip layer takes precedence over whatever the inner codec
        // made of the truncated or corrupt payload.
        if let Some(failure) = view.get_ref().failure.as_ref() {
            return self.structural(request.hint, format!("corrupt gzip stream: {failure}"));
        }
        outcome
    }

    fn save_to(
        &self,
        value: &Value,
        sink: &mut dyn WriteStream,
        request: &SaveRequest<'_>,
    ) -> Result<Attempt<String>> {
        let level = self.level(request)?;
        let params = request.params.without(LEVEL_PARAM);
        let inner_request = request
            .with_hint(inner_hint(request.hint))
            .with_params(&params);

        let encoder = GzBuilder::new()
            .mtime(0)
            .write(sink, Compression::new(level));
        let mut view = Unseekable::new(Deferred(encoder));
        let outcome = self.inner.save(value, Sink::Stream(&mut view), &inner_request)?;
        match outcome {
            Attempt::Done(suffix) => {
                view.into_inner()
                    .0
                    .finish()
                    .map_err(|e| Error::io("finish gzip stream", e))?;
                Ok(Attempt::Done(append_suffix(suffix, SUFFIX)))
            }
            declined => Ok(declined),
        }
    }
}

fn inner_hint(hint: Option<&str>) -> Option<&str> {
    hint.map(|h| strip_suffix(Some(h), SUFFIX).unwrap_or(h))
}

impl std::fmt::Debug for Gzip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gzip")
            .field("inner", &self.inner.name())
            .field("default_level", &self.default_level)
            .finish()
    }
}

impl Codec for Gzip {
    fn name(&self) -> Cow<'static, str> {
        Cow::Owned(format!("gzip({})", self.inner.name()))
    }

    fn suffixes(&self) -> Vec<String> {
        self.inner
            .suffixes()
            .into_iter()
            .map(|suffix| append_suffix(suffix, SUFFIX))
            .collect()
    }

    fn match_load(
        self: Arc<Self>,
        _kind: TargetKind,
        request: &LoadRequest<'_>,
    ) -> Option<Candidate> {
        let params = request.params.without(LEVEL_PARAM);
        match request.hint {
            Some(hint) => {
                let stripped = strip_suffix(Some(hint), SUFFIX)?;
                let inner_request = request.with_hint(Some(stripped)).with_params(&params);
                let matched = Arc::clone(&self.inner).match_load(TargetKind::Stream, &inner_request)?;
                let confidence = matched.confidence;
                Some(self.wrap(matched, confidence))
            }
            None => {
                let inner_request = request.with_params(&params);
                let matched = Arc::clone(&self.inner).match_load(TargetKind::Stream, &inner_request)?;
                Some(self.wrap(matched, Confidence::Unsure))
            }
        }
    }

    fn match_save(
        self: Arc<Self>,
        value: &Value,
        _kind: TargetKind,
        request: &SaveRequest<'_>,
    ) -> Option<Candidate> {
        let stripped = strip_suffix(request.hint, SUFFIX)?;
        let params = request.params.without(LEVEL_PARAM);
        let inner_request = request.with_hint(Some(stripped)).with_params(&params);
        let matched =
            Arc::clone(&self.inner).match_save(value, TargetKind::Stream, &inner_request)?;
        let confidence = matched.confidence;
        Some(self.wrap(matched, confidence))
    }

    fn load(&self, source: Source<'_>, request: &LoadRequest<'_>) -> Result<Attempt<Value>> {
        match source {
            Source::Path(path) => {
                let mut file = PathAdapter::open(path)?;
                self.load_from(&mut file, request)
            }
            Source::Stream(stream) => self.load_from(stream, request),
        }
    }

    fn save(
        &self,
        value: &Value,
        sink: Sink<'_>,
        request: &SaveRequest<'_>,
    ) -> Result<Attempt<String>> {
        match sink {
            Sink::Path(path) => {
                let mut pending = PathAdapter::create(path)?;
                let outcome = self.save_to(value, pending.file_mut(), request)?;
                if outcome.is_done() {
                    pending.commit()?;
                }
                Ok(outcome)
            }
            Sink::Stream(stream) => self.save_to(value, stream, request),
        }
    }
}

/// Reader that remembers the first error it passed on.
struct Tracked<R> {
    inner: R,
    failure: Option<io::Error>,
}

impl<R> Tracked<R> {
    const fn new(inner: R) -> Self {
        Self {
            inner,
            failure: None,
        }
    }
}

impl<R: Read> Read for Tracked<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.read(buf) {
            Ok(n) => Ok(n),
            Err(e) => {
                if self.failure.is_none() {
                    self.failure = Some(io::Error::new(e.kind(), e.to_string()));
                }
                Err(e)
            }
        }
    }
}

/// Writer whose `flush` is a no-op.
///
/// Flushing a deflate encoder emits a sync block, so the member is only
/// completed by `finish`.
struct Deferred<W>(W);

impl<W: Write> Write for Deferred<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{ExtensionMatch, Params};
    use crate::formats::{Json, Text};
    use std::io::Cursor;

    fn gzip_json() -> Arc<Gzip> {
        Arc::new(Gzip::new(Arc::new(ExtensionMatch::new(Json))))
    }

    #[test]
    fn test_match_strips_one_layer() {
        let params = Params::new().with("compression", 9);
        let codec = gzip_json();

        let request = LoadRequest::new(Some("data.json.gz"), &params);
        let matched = Arc::clone(&codec).match_load(TargetKind::Path, &request).unwrap();
        assert_eq!(matched.confidence, Confidence::Certain);
        assert_eq!(matched.codec.name(), "gzip(json)");

        let request = LoadRequest::new(Some("data.json"), &params);
        assert!(Arc::clone(&codec).match_load(TargetKind::Path, &request).is_none());

        let request = LoadRequest::new(Some("data.npy.gz"), &params);
        assert!(codec.match_load(TargetKind::Stream, &request).is_none());
    }

    #[test]
    fn test_never_claims_hintless_save() {
        let params = Params::new();
        let value = Value::from(serde_json::json!({"a": 1}));
        let request = SaveRequest::new(None, &params);
        assert!(gzip_json().match_save(&value, TargetKind::Stream, &request).is_none());
    }

    #[test]
    fn test_save_is_deterministic_and_reports_compound_suffix() {
        let params = Params::new();
        let value = Value::Text("hello gzip".to_string());
        let codec = Gzip::new(Arc::new(ExtensionMatch::new(Text)));
        let request = SaveRequest::new(Some("note.txt.gz"), &params);

        let mut first = Cursor::new(Vec::new());
        let mut second = Cursor::new(Vec::new());
        let suffix = codec.save(&value, Sink::Stream(&mut first), &request).unwrap();
        codec.save(&value, Sink::Stream(&mut second), &request).unwrap();

        assert_eq!(suffix, Attempt::Done(".txt.gz".to_string()));
        assert_eq!(first.get_ref(), second.get_ref());
        assert_eq!(&first.get_ref()[..2], &GZIP_MAGIC);
    }

    #[test]
    fn test_payload_equals_gzip_of_inner_bytes() {
        let params = Params::new();
        let value = Value::from(serde_json::json!({"rows": [1, 2, 3], "name": "flush"}));

        let mut plain = Cursor::new(Vec::new());
        ExtensionMatch::new(Json)
            .save(&value, Sink::Stream(&mut plain), &SaveRequest::new(Some(".json"), &params))
            .unwrap();

        let mut wrapped = Cursor::new(Vec::new());
        gzip_json()
            .save(&value, Sink::Stream(&mut wrapped), &SaveRequest::new(Some(".json.gz"), &params))
            .unwrap();

        let mut expected = GzBuilder::new()
            .mtime(0)
            .write(Vec::new(), Compression::new(DEFAULT_LEVEL));
        expected.write_all(plain.get_ref()).unwrap();
        assert_eq!(wrapped.into_inner(), expected.finish().unwrap());
    }

    #[test]
    fn test_flush_does_not_reach_encoder() {
        let encoder = GzBuilder::new()
            .mtime(0)
            .write(Vec::new(), Compression::new(DEFAULT_LEVEL));
        let mut view = Deferred(encoder);
        view.write_all(b"abc").unwrap();
        view.flush().unwrap();
        view.write_all(b"def").unwrap();
        let flushed = view.0.finish().unwrap();

        let mut direct = GzBuilder::new()
            .mtime(0)
            .write(Vec::new(), Compression::new(DEFAULT_LEVEL));
        direct.write_all(b"abcdef").unwrap();
        assert_eq!(flushed, direct.finish().unwrap());
    }

    #[test]
    fn test_bad_magic_depends_on_hint() {
        let params = Params::new();
        let codec = gzip_json();
        let mut source = Cursor::new(b"{\"plain\": true}".to_vec());

        let outcome = codec
            .load(Source::Stream(&mut source), &LoadRequest::new(None, &params))
            .unwrap();
        assert!(matches!(outcome, Attempt::WrongFormat(_)));

        source.set_position(0);
        let err = codec
            .load(
                Source::Stream(&mut source),
                &LoadRequest::new(Some("x.json.gz"), &params),
            )
            .unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
    }

    #[test]
    fn test_truncated_stream_is_structural() {
        let params = Params::new();
        let codec = Gzip::new(Arc::new(ExtensionMatch::new(Text)));
        let mut encoded = Cursor::new(Vec::new());
        codec
            .save(
                &Value::Text("some text that compresses".repeat(20)),
                Sink::Stream(&mut encoded),
                &SaveRequest::new(Some(".txt.gz"), &params),
            )
            .unwrap();
        let mut bytes = encoded.into_inner();
        bytes.truncate(bytes.len() / 2);

        let outcome = codec
            .load(
                Source::Stream(&mut Cursor::new(bytes)),
                &LoadRequest::new(None, &params),
            )
            .unwrap();
        assert!(matches!(outcome, Attempt::WrongFormat(_)));
    }

    #[test]
    fn test_level_out_of_range() {
        let params = Params::new().with("compression", 12);
        let codec = Gzip::new(Arc::new(ExtensionMatch::new(Text)));
        let err = codec
            .save(
                &Value::Text(String::new()),
                Sink::Stream(&mut Cursor::new(Vec::new())),
                &SaveRequest::new(Some(".txt.gz"), &params),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
