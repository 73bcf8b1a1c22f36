//! The ordered list of installed codecs.

use super::resolver::{Resolver, ResolverSettings};
use super::{Codec, ExtensionMatch, Format, Gzip};
use crate::config::StowageConfig;
use crate::formats;
use std::sync::Arc;

/// Installed codecs, in registration order.
///
/// Registration order breaks ties between candidates of equal confidence,
/// so more specific codecs go first and catch-alls last. A registry is only
/// ever extended; builders consume and return it.
#[derive(Clone, Default)]
pub struct Registry {
    codecs: Vec<Arc<dyn Codec>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the standard registry.
    ///
    /// Order: npy, gzip(npy), json, gzip(json), text, gzip(text), csv,
    /// gzip(csv), yaml, image, nifti, dicom, gzip(dicom), packed,
    /// gzip(packed). Formats whose cargo feature is disabled are left out.
    #[must_use]
    pub fn standard(config: &StowageConfig) -> Self {
        let level = config.gzip.level;
        let registry = Self::new();

        #[cfg(feature = "npy")]
        let registry = registry.with_compressed(formats::Npy, level);
        let registry = registry
            .with_compressed(formats::Json, level)
            .with_compressed(formats::Text, level);
        #[cfg(feature = "csv")]
        let registry = registry.with_compressed(formats::Csv, level);
        #[cfg(feature = "yaml")]
        let registry = registry.with_format(formats::Yaml);
        #[cfg(feature = "image")]
        let registry = registry.with_format(formats::Image);
        #[cfg(feature = "nifti")]
        let registry = registry.with_format(formats::Nifti::default().with_level(level));
        #[cfg(feature = "dicom")]
        let registry = registry.with_compressed(formats::Dicom, level);
        #[cfg(feature = "packed")]
        let registry = registry.with_compressed(formats::Packed, level);

        tracing::debug!(codecs = registry.len(), "Built standard registry");
        registry
    }

    /// Appends a codec.
    #[must_use]
    pub fn with(mut self, codec: impl Codec + 'static) -> Self {
        self.codecs.push(Arc::new(codec));
        self
    }

    /// Appends an already shared codec.
    #[must_use]
    pub fn with_shared(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codecs.push(codec);
        self
    }

    /// Appends a suffix-matched format.
    #[must_use]
    pub fn with_format(self, format: impl Format) -> Self {
        self.with(ExtensionMatch::new(format))
    }

    /// Appends a suffix-matched format followed by its gzip wrapper.
    #[must_use]
    pub fn with_compressed(self, format: impl Format, level: u32) -> Self {
        let plain: Arc<dyn Codec> = Arc::new(ExtensionMatch::new(format));
        let wrapped = Gzip::new(Arc::clone(&plain)).with_level(level);
        self.with_shared(plain).with(wrapped)
    }

    /// Installed codecs in order.
    #[must_use]
    pub fn codecs(&self) -> &[Arc<dyn Codec>] {
        &self.codecs
    }

    /// Number of installed codecs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    /// Returns `true` if nothing is installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    /// Creates a resolver over this registry.
    #[must_use]
    pub const fn resolver(&self, settings: ResolverSettings) -> Resolver<'_> {
        Resolver::new(self, settings)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.codecs.iter().map(|codec| codec.name()))
            .finish()
    }
}
