//! Config CLI command.

use super::CommandResult;
use crate::config::StowageConfig;
use std::io::Write;

/// Writes the effective configuration, or usage help without `show`.
///
/// # Errors
///
/// Returns an error if rendering or output fails.
pub fn cmd_config<W: Write>(writer: &mut W, config: &StowageConfig, show: bool) -> CommandResult {
    if show {
        write!(writer, "{}", config.to_toml()?)?;
    } else {
        writeln!(writer, "Use --show to display configuration")?;
    }
    Ok(())
}
