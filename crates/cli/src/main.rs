// shipcheck - batch audit of shipment workbooks against a master register

mod exit_codes;
mod pipeline;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "shipcheck")]
#[command(about = "Batch extraction and verification of shipment workbooks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit a folder of workbooks against its master register
    #[command(after_help = "\
Examples:
  shipcheck run ./inbox
  shipcheck run ./inbox --master ./inbox/Shipment\\ Master.csv
  shipcheck run ./inbox --config mappings.toml --jobs 8
  shipcheck run ./inbox --json > audit.json")]
    Run {
        /// Folder containing the shipment workbooks
        folder: PathBuf,

        /// Master register file (default: first *master* file in the folder)
        #[arg(long)]
        master: Option<PathBuf>,

        /// Mapping config (default: shipcheck.toml in the folder)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Worker threads for workbook extraction
        #[arg(long, default_value_t = 4)]
        jobs: usize,

        /// Output a JSON summary to stdout instead of the human report
        #[arg(long)]
        json: bool,
    },

    /// Validate a mapping config without running an audit
    #[command(after_help = "\
Examples:
  shipcheck validate mappings.toml")]
    Validate {
        /// Path to the mapping config file
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        None => {
            eprintln!("Usage: shipcheck <command> [options]");
            eprintln!("       shipcheck --help for more information");
            Ok(())
        }
        Some(Commands::Run { folder, master, config, jobs, json }) => {
            pipeline::cmd_run(folder, master, config, jobs, json)
        }
        Some(Commands::Validate { config }) => pipeline::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }
}
