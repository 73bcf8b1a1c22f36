//! Caller-facing facade.
//!
//! [`Stowage`] bundles a [`Registry`] with the configuration it was built
//! from. The crate-level free functions share one process-wide instance,
//! created on first use from the default configuration lookup.

use crate::codec::{HintSource, LoadRequest, Params, Registry, Resolver, ResolverSettings, SaveRequest};
use crate::config::StowageConfig;
use crate::io::{ReadStream, Sink, Source, WriteStream};
use crate::value::{NdArray, Value};
use crate::{Error, Result};
use serde_json::Value as JsonValue;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::instrument;

#[cfg(feature = "csv")]
use crate::value::Table;

/// Options for a load.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Where the hint comes from.
    pub hint: HintSource,
    /// Format-specific parameters.
    pub params: Params,
    /// Overrides the configured lazy-loading permission for this call.
    pub allow_lazy: Option<bool>,
}

impl LoadOptions {
    /// Creates options that derive the hint from the target.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses an explicit hint.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<HintSource>) -> Self {
        self.hint = hint.into();
        self
    }

    /// Ignores naming and infers the format from content.
    #[must_use]
    pub fn sniff(mut self) -> Self {
        self.hint = HintSource::Sniff;
        self
    }

    /// Adds a format parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.params.insert(key, value);
        self
    }

    /// Permits or refuses lazily loaded values.
    #[must_use]
    pub const fn with_allow_lazy(mut self, allow_lazy: bool) -> Self {
        self.allow_lazy = Some(allow_lazy);
        self
    }

    fn request<'a>(&'a self, hint: Option<&'a str>) -> LoadRequest<'a> {
        LoadRequest::new(hint, &self.params).with_allow_lazy(self.allow_lazy.unwrap_or(true))
    }
}

/// Options for a save.
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Where the hint comes from.
    pub hint: HintSource,
    /// Format-specific parameters.
    pub params: Params,
}

impl SaveOptions {
    /// Creates options that derive the hint from the target.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses an explicit hint.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<HintSource>) -> Self {
        self.hint = hint.into();
        self
    }

    /// Ignores naming and chooses the format from the value type.
    #[must_use]
    pub fn sniff(mut self) -> Self {
        self.hint = HintSource::Sniff;
        self
    }

    /// Adds a format parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.params.insert(key, value);
        self
    }
}

/// A registry plus the configuration it runs with.
#[derive(Debug, Clone)]
pub struct Stowage {
    registry: Arc<Registry>,
    config: Arc<StowageConfig>,
}

impl Stowage {
    /// Creates a facade over a custom registry.
    #[must_use]
    pub fn new(registry: Registry, config: StowageConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            config: Arc::new(config),
        }
    }

    /// Creates a facade over the standard registry built from `config`.
    #[must_use]
    pub fn with_config(config: StowageConfig) -> Self {
        Self::new(Registry::standard(&config), config)
    }

    /// Creates a facade from the default configuration lookup.
    ///
    /// A configuration file that cannot be read is logged and replaced by
    /// the defaults.
    #[must_use]
    pub fn standard() -> Self {
        let config = StowageConfig::load(None).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default configuration");
            StowageConfig::default()
        });
        Self::with_config(config)
    }

    /// The installed codecs.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The configuration in effect.
    #[must_use]
    pub fn config(&self) -> &StowageConfig {
        &self.config
    }

    /// A resolver for one call.
    #[must_use]
    pub fn resolver(&self) -> Resolver<'_> {
        self.registry
            .resolver(ResolverSettings::from(self.config.as_ref()))
    }

    /// Loads a value from a path or a stream.
    ///
    /// # Errors
    ///
    /// See [`load_path`](Self::load_path) and [`load_stream`](Self::load_stream).
    pub fn load(&self, source: Source<'_>, options: &LoadOptions) -> Result<Value> {
        match source {
            Source::Path(path) => self.load_path(path, options),
            Source::Stream(stream) => self.load_stream(stream, options),
        }
    }

    /// Saves a value to a path or a stream and returns the suffix written.
    ///
    /// # Errors
    ///
    /// See [`save_path`](Self::save_path) and [`save_stream`](Self::save_stream).
    pub fn save(&self, value: &Value, sink: Sink<'_>, options: &SaveOptions) -> Result<String> {
        match sink {
            Sink::Path(path) => self.save_path(value, path, options),
            Sink::Stream(stream) => self.save_stream(value, stream, options),
        }
    }

    /// Loads a value from a file.
    ///
    /// With the default [`HintSource::Derive`] the file name is the hint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for a missing file, [`Error::Exhausted`]
    /// when no codec recognises it, and any hard codec error.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load_path(&self, path: impl AsRef<Path>, options: &LoadOptions) -> Result<Value> {
        let path = path.as_ref();
        let hint = options.hint.resolve(Some(path));
        self.resolver()
            .load_path(path, &options.request(hint.as_deref()))
    }

    /// Loads a value from a stream.
    ///
    /// Streams carry no name, so only an explicit hint is used.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Exhausted`] when no codec recognises the input, and
    /// any hard codec or stream error.
    #[instrument(skip_all)]
    pub fn load_stream(&self, source: &mut dyn ReadStream, options: &LoadOptions) -> Result<Value> {
        let hint = options.hint.resolve(None);
        self.resolver()
            .load_stream(source, &options.request(hint.as_deref()))
    }

    /// Saves a value to a file and returns the suffix written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the directory does not exist,
    /// [`Error::Exhausted`] when no codec takes the value, and any hard
    /// codec error.
    #[instrument(
        skip_all,
        fields(path = %path.as_ref().display(), value_type = value.type_name())
    )]
    pub fn save_path(
        &self,
        value: &Value,
        path: impl AsRef<Path>,
        options: &SaveOptions,
    ) -> Result<String> {
        let path = path.as_ref();
        let hint = options.hint.resolve(Some(path));
        self.resolver().save_path(
            value,
            path,
            &SaveRequest::new(hint.as_deref(), &options.params),
        )
    }

    /// Saves a value to a stream and returns the suffix written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Exhausted`] when no codec takes the value, and any
    /// hard codec or stream error.
    #[instrument(skip_all, fields(value_type = value.type_name()))]
    pub fn save_stream(
        &self,
        value: &Value,
        sink: &mut dyn WriteStream,
        options: &SaveOptions,
    ) -> Result<String> {
        let hint = options.hint.resolve(None);
        self.resolver().save_stream(
            value,
            sink,
            &SaveRequest::new(hint.as_deref(), &options.params),
        )
    }
}

impl Default for Stowage {
    fn default() -> Self {
        Self::with_config(StowageConfig::default())
    }
}

static DEFAULT: OnceLock<Stowage> = OnceLock::new();

/// The process-wide instance behind the free functions.
pub fn global() -> &'static Stowage {
    DEFAULT.get_or_init(Stowage::standard)
}

fn unexpected(expected: &str, value: &Value) -> Error {
    Error::InvalidInput(format!(
        "expected a {expected} value, found {}",
        value.type_name()
    ))
}

/// Loads any supported file, choosing the codec from its name or content.
///
/// # Errors
///
/// See [`Stowage::load_path`].
pub fn load(path: impl AsRef<Path>) -> Result<Value> {
    global().load_path(path, &LoadOptions::new())
}

/// Saves a value, choosing the codec from the file name or the value type.
///
/// # Errors
///
/// See [`Stowage::save_path`].
pub fn save(value: &Value, path: impl AsRef<Path>) -> Result<String> {
    global().save_path(value, path, &SaveOptions::new())
}

/// Loads a JSON document.
///
/// # Errors
///
/// Returns an error if the file cannot be decoded as JSON.
pub fn load_json(path: impl AsRef<Path>) -> Result<JsonValue> {
    match global().load_path(path, &LoadOptions::new().with_hint(".json"))? {
        Value::Json(document) => Ok(document),
        other => Err(unexpected("json", &other)),
    }
}

/// Saves a JSON document, optionally indented by `indent` spaces.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_json(value: &JsonValue, path: impl AsRef<Path>, indent: Option<u64>) -> Result<()> {
    let mut options = SaveOptions::new().with_hint(".json");
    if let Some(indent) = indent {
        options = options.with_param("indent", indent);
    }
    global()
        .save_path(&Value::Json(value.clone()), path, &options)
        .map(|_| ())
}

/// Loads a UTF-8 text file.
///
/// # Errors
///
/// Returns an error if the file is not valid UTF-8.
pub fn load_text(path: impl AsRef<Path>) -> Result<String> {
    match global().load_path(path, &LoadOptions::new().with_hint(".txt"))? {
        Value::Text(text) => Ok(text),
        other => Err(unexpected("text", &other)),
    }
}

/// Saves a UTF-8 text file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_text(text: &str, path: impl AsRef<Path>) -> Result<()> {
    global()
        .save_path(
            &Value::Text(text.to_string()),
            path,
            &SaveOptions::new().with_hint(".txt"),
        )
        .map(|_| ())
}

/// Loads a CSV table whose first record is the header.
///
/// # Errors
///
/// Returns an error if the file is not valid CSV.
#[cfg(feature = "csv")]
pub fn load_csv(path: impl AsRef<Path>) -> Result<Table> {
    match global().load_path(path, &LoadOptions::new().with_hint(".csv"))? {
        Value::Table(table) => Ok(table),
        other => Err(unexpected("table", &other)),
    }
}

/// Saves a CSV table.
///
/// `index` prepends a row-number column. A `compression` level writes a
/// gzip-compressed file instead.
///
/// # Errors
///
/// Returns an error if the file cannot be written or the level is above 9.
#[cfg(feature = "csv")]
pub fn save_csv(
    table: &Table,
    path: impl AsRef<Path>,
    index: bool,
    compression: Option<u32>,
) -> Result<String> {
    let mut options = SaveOptions::new()
        .with_hint(if compression.is_some() { ".csv.gz" } else { ".csv" })
        .with_param("index", index);
    if let Some(level) = compression {
        options = options.with_param("compression", level);
    }
    global().save_path(&Value::Table(table.clone()), path, &options)
}

/// Loads a NumPy array, decompressing a gzip layer if asked to.
///
/// # Errors
///
/// Returns an error if the file is not a supported `.npy` array.
#[cfg(feature = "npy")]
pub fn load_npy(path: impl AsRef<Path>, decompress: bool) -> Result<NdArray> {
    let hint = if decompress { ".npy.gz" } else { ".npy" };
    match global().load_path(path, &LoadOptions::new().with_hint(hint))? {
        Value::Array(array) => Ok(array),
        other => Err(unexpected("array", &other)),
    }
}

/// Saves a NumPy array. A `compression` level forces a `.npy.gz` file.
///
/// # Errors
///
/// Returns an error if the file cannot be written or the level is above 9.
#[cfg(feature = "npy")]
pub fn save_npy(array: &NdArray, path: impl AsRef<Path>, compression: Option<u32>) -> Result<String> {
    let options = match compression {
        Some(level) => SaveOptions::new()
            .with_hint(".npy.gz")
            .with_param("compression", level),
        None => SaveOptions::new().with_hint(".npy"),
    };
    global().save_path(&Value::Array(array.clone()), path, &options)
}

/// Loads a packed value.
///
/// # Errors
///
/// Returns an error if the file is not a packed value.
#[cfg(feature = "packed")]
pub fn load_packed(path: impl AsRef<Path>) -> Result<Value> {
    global().load_path(path, &LoadOptions::new().with_hint(".pkl"))
}

/// Saves any in-memory value in packed form.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
#[cfg(feature = "packed")]
pub fn save_packed(value: &Value, path: impl AsRef<Path>) -> Result<()> {
    global()
        .save_path(value, path, &SaveOptions::new().with_hint(".pkl"))
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_options_builders() {
        let options = LoadOptions::new()
            .with_hint("a.npy")
            .with_param("lazy", true)
            .with_allow_lazy(false);
        assert_eq!(options.hint, HintSource::Explicit("a.npy".to_string()));
        assert_eq!(options.params.get("lazy"), Some(&json!(true)));
        assert_eq!(options.allow_lazy, Some(false));
        assert_eq!(SaveOptions::new().sniff().hint, HintSource::Sniff);
    }

    #[test]
    fn test_stream_roundtrip_through_facade() {
        let stowage = Stowage::default();
        let value = Value::from(json!({"a": [1, 2]}));
        let mut sink = Cursor::new(Vec::new());
        let suffix = stowage
            .save_stream(&value, &mut sink, &SaveOptions::new().with_hint("x.json"))
            .unwrap();
        assert_eq!(suffix, ".json");

        sink.set_position(0);
        let loaded = stowage.load_stream(&mut sink, &LoadOptions::new()).unwrap();
        assert_eq!(loaded, value);
    }

    #[test]
    fn test_text_helpers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes");
        save_text("hello", &path).unwrap();
        assert_eq!(load_text(&path).unwrap(), "hello");
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
    }

    #[test]
    #[cfg(feature = "npy")]
    fn test_npy_compression_forces_gz() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("weights.bin");
        let array = NdArray::from_elements(&[3], &[1i32, 2, 3]).unwrap();

        assert_eq!(save_npy(&array, &path, Some(9)).unwrap(), ".npy.gz");
        assert_eq!(&std::fs::read(&path).unwrap()[..2], &[0x1f, 0x8b]);
        assert_eq!(load_npy(&path, true).unwrap(), array);
    }

    #[test]
    fn test_json_helper_and_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json");
        save_json(&json!("just a string"), &path, None).unwrap();
        assert_eq!(load_json(&path).unwrap(), json!("just a string"));
        let err = load_text(dir.path().join("missing.txt")).unwrap_err();
        assert!(err.is_not_found());
    }
}
