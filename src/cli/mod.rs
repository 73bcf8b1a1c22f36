//! CLI command implementations.
//!
//! Each submodule implements one subcommand of the `stowage` binary. Output
//! goes to a caller-supplied writer so the commands can be tested without
//! touching stdout.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `codecs` | List the installed codecs in registration order |
//! | `inspect` | Load a file and describe the decoded value |
//! | `convert` | Load a file and save it under a new name or hint |
//! | `config` | Show the effective configuration |
//!
//! # Example Usage
//!
//! ```bash
//! # Which codecs are compiled in?
//! stowage codecs
//!
//! # What is in this file?
//! stowage inspect scan.npy.gz
//!
//! # Re-encode a CSV table as compressed JSON-packed data
//! stowage convert table.csv table.pkl.gz
//! ```

mod codecs;
mod config;
mod convert;
mod inspect;

pub use codecs::{CodecInfo, OutputFormat, cmd_codecs, codec_infos};
pub use config::cmd_config;
pub use convert::cmd_convert;
pub use inspect::cmd_inspect;

/// Result type shared by the command functions.
///
/// Library errors keep their type inside the [`anyhow::Error`], so callers
/// can still downcast to [`crate::Error`].
pub type CommandResult = anyhow::Result<()>;
