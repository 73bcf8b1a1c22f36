//! CLI command for listing installed codecs.

use super::CommandResult;
use crate::codec::Registry;
use serde::Serialize;
use std::io::{self, Write};
use std::str::FromStr;

/// Information about an installed codec.
#[derive(Debug, Clone, Serialize)]
pub struct CodecInfo {
    /// Registration position, starting at 1.
    pub position: usize,
    /// Codec name.
    pub name: String,
    /// Suffixes the codec claims.
    pub suffixes: Vec<String>,
}

/// Describes every codec in `registry`, in order.
#[must_use]
pub fn codec_infos(registry: &Registry) -> Vec<CodecInfo> {
    registry
        .codecs()
        .iter()
        .enumerate()
        .map(|(i, codec)| CodecInfo {
            position: i + 1,
            name: codec.name().into_owned(),
            suffixes: codec.suffixes(),
        })
        .collect()
}

/// Output format for listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Table format (default).
    #[default]
    Table,
    /// JSON format.
    Json,
}

impl FromStr for OutputFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Table,
        })
    }
}

fn write_table<W: Write>(writer: &mut W, codecs: &[CodecInfo]) -> io::Result<()> {
    writeln!(writer, "{:<4}{:<16}SUFFIXES", "#", "CODEC")?;
    for codec in codecs {
        writeln!(
            writer,
            "{:<4}{:<16}{}",
            codec.position,
            codec.name,
            codec.suffixes.join(", ")
        )?;
    }
    Ok(())
}

/// Executes the codecs command.
///
/// # Errors
///
/// Returns an error if serialization or output fails.
pub fn cmd_codecs<W: Write>(writer: &mut W, registry: &Registry, format: OutputFormat) -> CommandResult {
    let codecs = codec_infos(registry);
    match format {
        OutputFormat::Table => write_table(writer, &codecs)?,
        OutputFormat::Json => writeln!(writer, "{}", serde_json::to_string_pretty(&codecs)?)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{Json, Text};

    fn registry() -> Registry {
        Registry::new().with_format(Json).with_compressed(Text, 6)
    }

    #[test]
    fn test_codec_infos_follow_registration() {
        let infos = codec_infos(&registry());
        let names: Vec<&str> = infos.iter().map(|info| info.name.as_str()).collect();
        assert_eq!(names, ["json", "text", "gzip(text)"]);
        assert_eq!(infos[2].position, 3);
        assert_eq!(infos[2].suffixes, [".txt.gz"]);
    }

    #[test]
    fn test_table_output() {
        let mut buffer = Vec::new();
        cmd_codecs(&mut buffer, &registry(), OutputFormat::Table).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert!(output.starts_with("#   CODEC"));
        assert!(output.contains("gzip(text)"));
        assert!(output.contains(".txt.gz"));
    }

    #[test]
    fn test_json_output() {
        let mut buffer = Vec::new();
        cmd_codecs(&mut buffer, &registry(), OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(parsed[0]["name"], "json");
        assert_eq!(parsed[0]["suffixes"][0], ".json");
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("JSON").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str("other").unwrap(), OutputFormat::Table);
    }
}
