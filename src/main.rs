//! Binary entry point for stowage.
//!
//! This binary provides the CLI interface for inspecting and converting
//! files through the codec registry.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::Value as JsonValue;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use stowage::cli::{OutputFormat, cmd_codecs, cmd_config, cmd_convert, cmd_inspect};
use stowage::config::StowageConfig;
use stowage::observability::{self, InitOptions};
use stowage::{LoadOptions, SaveOptions, Stowage};

/// Stowage - load and save values through hint- and content-driven codecs.
#[derive(Parser)]
#[command(name = "stowage")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "STOWAGE_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// List installed codecs in registration order.
    Codecs {
        /// Output format: table or json.
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Load a file and describe the decoded value.
    Inspect {
        /// File to load.
        path: PathBuf,

        /// Hint to use instead of the file name.
        #[arg(long, conflicts_with = "sniff")]
        hint: Option<String>,

        /// Ignore the file name and recognise the format from content.
        #[arg(long)]
        sniff: bool,

        /// Load parameter, as KEY=VALUE (repeatable).
        #[arg(short, long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },

    /// Load a file and save its value under a new name.
    Convert {
        /// File to load.
        input: PathBuf,

        /// File to write.
        output: PathBuf,

        /// Hint for loading instead of the input file name.
        #[arg(long)]
        from: Option<String>,

        /// Hint for saving instead of the output file name.
        #[arg(long)]
        to: Option<String>,

        /// Save parameter, as KEY=VALUE (repeatable).
        #[arg(short, long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },

    /// Manage configuration.
    Config {
        /// Show the effective configuration.
        #[arg(long)]
        show: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match StowageConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = observability::init(
        &config.logging,
        InitOptions {
            verbose: cli.verbose,
        },
    ) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Runs the selected command.
fn run_command(command: Commands, config: StowageConfig) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::Codecs { format } => {
            let stowage = Stowage::with_config(config);
            let format = OutputFormat::from_str(&format).unwrap_or_default();
            cmd_codecs(&mut out, stowage.registry(), format).context("failed to list codecs")
        }

        Commands::Inspect {
            path,
            hint,
            sniff,
            params,
        } => {
            let mut options = LoadOptions::new();
            if let Some(hint) = hint {
                options = options.with_hint(hint);
            }
            if sniff {
                options = options.sniff();
            }
            for (key, value) in parse_params(&params)? {
                options = options.with_param(key, value);
            }
            let stowage = Stowage::with_config(config);
            cmd_inspect(&mut out, &stowage, &path, &options)
                .with_context(|| format!("failed to inspect {}", path.display()))
        }

        Commands::Convert {
            input,
            output,
            from,
            to,
            params,
        } => {
            let load = from.map_or_else(LoadOptions::new, |hint| LoadOptions::new().with_hint(hint));
            let mut save = to.map_or_else(SaveOptions::new, |hint| SaveOptions::new().with_hint(hint));
            for (key, value) in parse_params(&params)? {
                save = save.with_param(key, value);
            }
            let stowage = Stowage::with_config(config);
            cmd_convert(&mut out, &stowage, &input, &output, &load, &save)
                .with_context(|| {
                    format!("failed to convert {} to {}", input.display(), output.display())
                })
        }

        Commands::Config { show } => {
            cmd_config(&mut out, &config, show).context("failed to show configuration")
        }
    }
}

/// Parses `KEY=VALUE` pairs. Values are read as JSON when they parse,
/// otherwise kept as strings.
fn parse_params(raw: &[String]) -> Result<Vec<(String, JsonValue)>> {
    raw.iter()
        .map(|pair| {
            let Some((key, value)) = pair.split_once('=') else {
                bail!("parameter {pair:?} is not KEY=VALUE");
            };
            let value = serde_json::from_str(value)
                .unwrap_or_else(|_| JsonValue::String(value.to_string()));
            Ok((key.to_string(), value))
        })
        .collect()
}
