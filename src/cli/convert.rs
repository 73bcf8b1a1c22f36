//! CLI command for re-encoding a file.

use super::CommandResult;
use crate::api::{LoadOptions, SaveOptions, Stowage};
use std::io::Write;
use std::path::Path;

/// Loads `input`, saves the value to `output` and writes the suffix the
/// chosen codec reported.
///
/// # Errors
///
/// Returns an error if loading, saving or output fails.
pub fn cmd_convert<W: Write>(
    writer: &mut W,
    stowage: &Stowage,
    input: &Path,
    output: &Path,
    load: &LoadOptions,
    save: &SaveOptions,
) -> CommandResult {
    let value = stowage.load_path(input, load)?;
    let suffix = stowage.save_path(&value, output, save)?;
    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        %suffix,
        "Converted"
    );
    writeln!(writer, "{suffix}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_convert_json_to_compressed_json() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("doc.json");
        let output = dir.path().join("doc.json.gz");
        std::fs::write(&input, br#"{"k": [1, 2, 3]}"#).unwrap();

        let stowage = Stowage::default();
        let mut buffer = Vec::new();
        cmd_convert(
            &mut buffer,
            &stowage,
            &input,
            &output,
            &LoadOptions::new(),
            &SaveOptions::new(),
        )
        .unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), ".json.gz\n");

        let loaded = stowage.load_path(&output, &LoadOptions::new()).unwrap();
        assert_eq!(loaded.as_json(), Some(&json!({"k": [1, 2, 3]})));
    }

    #[test]
    fn test_explicit_save_hint() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("notes.txt");
        let output = dir.path().join("notes.out");
        std::fs::write(&input, "plain words").unwrap();

        let mut buffer = Vec::new();
        cmd_convert(
            &mut buffer,
            &Stowage::default(),
            &input,
            &output,
            &LoadOptions::new(),
            &SaveOptions::new().with_hint(".txt.gz"),
        )
        .unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), ".txt.gz\n");
        assert_eq!(&std::fs::read(&output).unwrap()[..2], &[0x1f, 0x8b]);
    }
}
