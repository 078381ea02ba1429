//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use flow_logger::application::OutputFormat;

/// Flow Logger - durable buffered logging for flow-sensor readings.
///
/// Records are read from stdin by `run`, one CSV line per record.
#[derive(Parser, Debug)]
#[command(name = "flowlog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format: text or json.
    #[arg(short, long, default_value = "text", global = true)]
    pub format: String,

    /// Use this config file instead of the default location.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the default config and create the card and flash directories.
    Init,

    /// Boot the logger and log stdin lines until EOF or Ctrl-C.
    Run {
        /// Do not start logging until a ":start" line is received.
        #[arg(long)]
        paused: bool,
    },

    /// Show the persisted logger state.
    Status,

    /// List log files on the card.
    Files,

    /// Boot the logger and print diagnostics.
    Diagnostics,

    /// Boot the logger and switch to a new log file.
    Rotate,

    /// Boot the logger and run maintenance.
    Maintain,

    /// Boot the logger and run the recovery path.
    Recover {
        /// Remove the recovery point afterwards.
        #[arg(long)]
        clear: bool,
    },
}

impl Cli {
    /// Parse the output format argument.
    pub fn output_format(&self) -> Result<OutputFormat, String> {
        self.format.parse()
    }
}
