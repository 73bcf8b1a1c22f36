//! CLI command for describing a file's contents.

use super::CommandResult;
use crate::api::{LoadOptions, Stowage};
use std::io::Write;
use std::path::Path;

/// Loads `path` and writes its value type and a one-line summary.
///
/// # Errors
///
/// Returns an error if the file cannot be loaded or output fails.
pub fn cmd_inspect<W: Write>(
    writer: &mut W,
    stowage: &Stowage,
    path: &Path,
    options: &LoadOptions,
) -> CommandResult {
    let value = stowage.load_path(path, options)?;
    writeln!(writer, "{}: {}", path.display(), value.type_name())?;
    writeln!(writer, "  {}", value.summary())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_inspect_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json");
        std::fs::write(&path, br#"{"a": 1, "b": 2}"#).unwrap();

        let mut buffer = Vec::new();
        cmd_inspect(&mut buffer, &Stowage::default(), &path, &LoadOptions::new()).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert!(output.contains(": json\n"));
        assert!(output.contains("json object with 2 keys"));
    }

    #[test]
    fn test_inspect_missing_file() {
        let mut buffer = Vec::new();
        let err = cmd_inspect(
            &mut buffer,
            &Stowage::default(),
            Path::new("/nonexistent/file.json"),
            &LoadOptions::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("file not found"));
        assert!(
            err.downcast_ref::<crate::Error>()
                .is_some_and(crate::Error::is_not_found)
        );
        assert!(buffer.is_empty());
    }
}
