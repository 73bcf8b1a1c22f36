//! Hint resolution and compound-suffix algebra.
//!
//! A hint is a file name or a bare suffix sequence such as `".npy.gz"`.
//! Wrapping codecs peel one suffix off per layer with [`strip_suffix`] and
//! put it back on the reported result with [`append_suffix`], so compound
//! names survive any nesting depth.

use std::path::Path;

/// Where the hint for an operation comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HintSource {
    /// Use the base name of a path target; stream targets get no hint.
    #[default]
    Derive,
    /// Use this string.
    Explicit(String),
    /// No naming information: infer from content (load) or value type (save).
    Sniff,
}

impl HintSource {
    /// Resolves the hint for a target, given its path if it has one.
    #[must_use]
    pub fn resolve(&self, path: Option<&Path>) -> Option<String> {
        match self {
            Self::Derive => path
                .and_then(Path::file_name)
                .and_then(|name| name.to_str())
                .map(String::from),
            Self::Explicit(hint) => Some(hint.clone()),
            Self::Sniff => None,
        }
    }
}

impl From<&str> for HintSource {
    fn from(hint: &str) -> Self {
        Self::Explicit(hint.to_string())
    }
}

impl From<String> for HintSource {
    fn from(hint: String) -> Self {
        Self::Explicit(hint)
    }
}

impl From<Option<String>> for HintSource {
    fn from(hint: Option<String>) -> Self {
        hint.map_or(Self::Derive, Self::Explicit)
    }
}

/// Returns `true` if `hint` ends with `suffix`, ignoring ASCII case.
#[must_use]
pub fn ends_with_suffix(hint: &str, suffix: &str) -> bool {
    let (hint, suffix) = (hint.as_bytes(), suffix.as_bytes());
    hint.len() >= suffix.len() && hint[hint.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

/// Strips `suffix` from the end of `hint`.
///
/// Returns `None` when the hint is absent or does not end with the suffix.
/// Exactly one layer is removed: `"x.npy.gz"` minus `".gz"` is `"x.npy"`.
#[must_use]
pub fn strip_suffix<'a>(hint: Option<&'a str>, suffix: &str) -> Option<&'a str> {
    let hint = hint?;
    if !ends_with_suffix(hint, suffix) {
        return None;
    }
    // The matched tail is ASCII, so the cut lands on a char boundary.
    hint.get(..hint.len() - suffix.len())
}

/// Re-appends a wrapper's suffix to the suffix reported by its inner codec.
#[must_use]
pub fn append_suffix(inner: String, outer: &str) -> String {
    let mut reported = inner;
    reported.push_str(outer);
    reported
}
