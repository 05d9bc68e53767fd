//! siscan: DVB topology database tool.

use std::path::{Path, PathBuf};

use clap::Parser;
use log::{debug, error};

mod commands;
mod context;

use siscan::config::{load_config, ConfigFile};
use siscan::logging;
use siscan::scan::{Platform, PlatformKind};

use crate::commands::LcnsArgs;
use crate::context::{Cli, Commands};

const DEFAULT_CONFIG_FILE: &str = "siscan.toml";
const DEFAULT_RETENTION_DAYS: u64 = 7;

fn read_config(explicit: Option<&Path>) -> Result<ConfigFile, String> {
    match explicit {
        Some(path) => load_config(path).map_err(|e| format!("{}: {}", path.display(), e)),
        None => {
            let path = Path::new(DEFAULT_CONFIG_FILE);
            if path.exists() {
                load_config(path).map_err(|e| format!("{}: {}", path.display(), e))
            } else {
                Ok(ConfigFile::default())
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match read_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(2);
        }
    };

    let log_dir = cli
        .log_dir
        .clone()
        .or_else(|| config.logging.log_dir.as_ref().map(PathBuf::from));
    let retention_days = config.logging.retention_days.unwrap_or(DEFAULT_RETENTION_DAYS);
    if let Err(e) = logging::init_logging(
        log_dir.as_deref(),
        retention_days,
        config.logging.level.as_deref(),
        cli.verbose,
    ) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(2);
    }
    debug!("{:?}", config);

    let database = cli
        .database
        .clone()
        .or_else(|| config.database.path.as_ref().map(PathBuf::from))
        .unwrap_or_else(commands::default_database_path);
    let config_platform = config.scan.platform.unwrap_or_default();

    let code = match cli.command {
        Commands::Describe { tuning } => commands::cmd_describe(&tuning),
        Commands::Presets { platform, first_channel, last_channel } => {
            let channels = match (first_channel, last_channel) {
                (None, None) => config.scan.channel_range(),
                (first, last) => Some((first.unwrap_or(21), last.unwrap_or(68))),
            };
            commands::cmd_presets(platform.unwrap_or(config_platform), channels)
        }
        Commands::Lcns { source, network, region, platform, format } => {
            let kind: PlatformKind = platform.unwrap_or(config_platform);
            let source = source
                .or_else(|| config.scan.source.clone())
                .unwrap_or_else(|| kind.to_string());
            commands::cmd_lcns(LcnsArgs {
                database,
                source,
                network,
                region,
                lookup: Platform::new(kind).lcn_lookup,
                fallbacks: config.lcn.fallbacks(),
                format,
            })
            .await
        }
        Commands::Sources => commands::cmd_sources(&database),
    };

    if code != 0 {
        error!("Exiting with status {}", code);
    }
    std::process::exit(code);
}
