//! Configuration management.

use crate::codec::DEFAULT_LEVEL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming a configuration file.
pub const CONFIG_PATH_ENV: &str = "STOWAGE_CONFIG_PATH";

/// Main configuration for stowage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StowageConfig {
    /// Resolver behaviour.
    pub resolver: ResolverConfig,
    /// Gzip wrapper defaults.
    pub gzip: GzipConfig,
    /// Logging setup used by the binary.
    pub logging: LoggingConfig,
}

/// Resolver section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolverConfig {
    /// Retry path operations by content when the hint matches no codec.
    pub sniff_fallback: bool,
    /// Permit codecs to return lazily loaded values.
    pub allow_lazy: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            sniff_fallback: true,
            allow_lazy: true,
        }
    }
}

/// Gzip section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GzipConfig {
    /// Compression level (0-9) used when a save names none.
    pub level: u32,
}

impl Default for GzipConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name. Unknown names fall back to pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Logging section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// File to append events to instead of stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "warn".to_string(),
            file: None,
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Resolver section.
    pub resolver: Option<ConfigFileResolver>,
    /// Gzip section.
    pub gzip: Option<ConfigFileGzip>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// Resolver section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileResolver {
    /// Sniff fallback.
    pub sniff_fallback: Option<bool>,
    /// Lazy loading.
    pub allow_lazy: Option<bool>,
}

/// Gzip section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileGzip {
    /// Compression level.
    pub level: Option<u32>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// Format name.
    pub format: Option<String>,
    /// Filter directive.
    pub filter: Option<String>,
    /// Log file.
    pub file: Option<String>,
}

impl StowageConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration, honouring an explicit path first.
    ///
    /// Lookup order:
    /// 1. `explicit` (the `--config` flag)
    /// 2. The file named by `STOWAGE_CONFIG_PATH`
    /// 3. The default locations (see [`load_default`](Self::load_default))
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file cannot be read or parsed.
    pub fn load(explicit: Option<&Path>) -> crate::Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
            return Self::load_from_file(Path::new(&path));
        }
        Ok(Self::load_default())
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: format!("{}: {e}", path.display()),
            })?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration TOML.
    pub fn from_toml(contents: &str) -> crate::Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;
        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/stowage/` on macOS)
    /// 2. XDG config dir (`~/.config/stowage/` for Unix compatibility)
    ///
    /// Returns default configuration if no config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let platform_config = base_dirs.config_dir().join("stowage").join("config.toml");
        let xdg_config = base_dirs
            .home_dir()
            .join(".config")
            .join("stowage")
            .join("config.toml");

        for candidate in [platform_config, xdg_config] {
            if !candidate.exists() {
                continue;
            }
            match Self::load_from_file(&candidate) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %candidate.display(), error = %e, "Ignoring unreadable config file");
                }
            }
        }

        Self::default()
    }

    /// Renders the effective configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> crate::Result<String> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::OperationFailed {
            operation: "render_config".to_string(),
            cause: e.to_string(),
        })
    }

    /// Converts a `ConfigFile` to `StowageConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(resolver) = file.resolver {
            if let Some(v) = resolver.sniff_fallback {
                config.resolver.sniff_fallback = v;
            }
            if let Some(v) = resolver.allow_lazy {
                config.resolver.allow_lazy = v;
            }
        }
        if let Some(level) = file.gzip.and_then(|gzip| gzip.level) {
            if level > 9 {
                tracing::warn!(level, "gzip level out of range, using 9");
            }
            config.gzip.level = level.min(9);
        }
        if let Some(logging) = file.logging {
            if let Some(format) = logging.format {
                config.logging.format = LogFormat::parse(&format);
            }
            if let Some(filter) = logging.filter {
                config.logging.filter = filter;
            }
            config.logging.file = logging.file.map(PathBuf::from);
        }

        config
    }

    /// Sets the gzip level, capped at 9.
    #[must_use]
    pub fn with_gzip_level(mut self, level: u32) -> Self {
        self.gzip.level = level.min(9);
        self
    }

    /// Enables or disables the sniff fallback.
    #[must_use]
    pub const fn with_sniff_fallback(mut self, enabled: bool) -> Self {
        self.resolver.sniff_fallback = enabled;
        self
    }

    /// Enables or disables lazy loading.
    #[must_use]
    pub const fn with_allow_lazy(mut self, enabled: bool) -> Self {
        self.resolver.allow_lazy = enabled;
        self
    }
}
