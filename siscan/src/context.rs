use std::path::PathBuf;

use clap::{Parser, Subcommand};

use siscan::scan::PlatformKind;

#[derive(Debug, Parser)]
#[clap(name = "siscan")]
#[clap(about = "siscan reassembles DVB service information and resolves logical channel numbers.", long_about = None)]
#[clap(version)]
pub(crate) struct Cli {
    /// Configuration file (TOML).{n}
    /// Defaults to `siscan.toml` in the working directory when present.
    #[clap(short = 'f', long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the topology database.
    #[clap(short, long, global = true)]
    pub database: Option<PathBuf>,

    /// Enable debug-level logging.
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Directory for rotated log files.
    #[clap(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

/// Output format for listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Parse a tuning string.{n}
    /// Prints the canonical form, the Linux DVB tuning-file form,
    /// the equivalence key and the raw property list.
    #[clap(name = "describe")]
    Describe {
        /// Tuning string, e.g. `S2 11428000 H 27500000 2/3 25 8PSK`.
        tuning: String,
    },

    /// List the tuning candidates a platform would sweep.
    #[clap(name = "presets")]
    Presets {
        /// Platform whose candidates are listed.{n}
        /// Falls back to `[scan] platform` in the config file.
        #[clap(short, long, value_enum)]
        platform: Option<PlatformKind>,

        /// First UHF channel of the DVB-T sweep.
        #[clap(long)]
        first_channel: Option<u32>,

        /// Last UHF channel of the DVB-T sweep.
        #[clap(long)]
        last_channel: Option<u32>,
    },

    /// Resolve logical channel numbers and store them for clients.
    #[clap(name = "lcns")]
    Lcns {
        /// Source namespace in the database.
        #[clap(short, long)]
        source: Option<String>,

        /// Network (or bouquet) name as broadcast.
        #[clap(short, long)]
        network: String,

        /// Region name. Unknown or absent regions use the default region.
        #[clap(short, long)]
        region: Option<String>,

        /// Platform, selects how original network ids are looked up.
        #[clap(short, long, value_enum)]
        platform: Option<PlatformKind>,

        /// Output format.
        #[clap(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// List the source namespaces stored in the database.
    #[clap(name = "sources")]
    Sources,
}
