//! Log filter selection.

use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Directive used with `--verbose`.
const VERBOSE_DIRECTIVE: &str = "stowage=debug";

/// Builds the event filter.
///
/// `RUST_LOG` wins when set and valid. Otherwise `--verbose` selects debug
/// output for this crate, and the configured directive applies in all other
/// cases. An unparsable configured directive falls back to `warn`.
pub fn build_filter(config: &LoggingConfig, verbose: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let directive = if verbose {
        VERBOSE_DIRECTIVE
    } else {
        config.filter.as_str()
    };
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("warn"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_overrides_configured_filter() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LoggingConfig::default();
        assert_eq!(build_filter(&config, true).to_string(), VERBOSE_DIRECTIVE);
        assert_eq!(build_filter(&config, false).to_string(), "warn");
    }

    #[test]
    fn test_bad_directive_falls_back() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LoggingConfig {
            filter: "stowage=loud".to_string(),
            ..LoggingConfig::default()
        };
        assert_eq!(build_filter(&config, false).to_string(), "warn");
    }
}
