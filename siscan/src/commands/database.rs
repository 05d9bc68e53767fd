//! Database-backed commands.

use std::path::{Path, PathBuf};

use log::{error, info};

use siscan::database::{ClientLcn, Database, DatabaseError, StorageWorker};
use siscan::lcn::{self, LcnFallbacks};
use siscan::scan::OnidLookup;

use crate::context::OutputFormat;

/// Default database location under the user data directory.
pub(crate) fn default_database_path() -> PathBuf {
    #[cfg(windows)]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("siscan").join("topology.db");
        }
    }

    #[cfg(unix)]
    {
        if let Some(data_home) = std::env::var_os("XDG_DATA_HOME") {
            return PathBuf::from(data_home).join("siscan").join("topology.db");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("siscan")
                .join("topology.db");
        }
    }

    PathBuf::from("topology.db")
}

fn open_database(path: &Path) -> Result<Database, Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    info!("Using database: {}", path.display());
    Ok(Database::open(path)?)
}

pub(crate) struct LcnsArgs {
    pub database: PathBuf,
    pub source: String,
    pub network: String,
    pub region: Option<String>,
    pub lookup: OnidLookup,
    pub fallbacks: LcnFallbacks,
    pub format: OutputFormat,
}

pub(crate) async fn cmd_lcns(args: LcnsArgs) -> i32 {
    let db = match open_database(&args.database) {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return 1;
        }
    };
    let worker = match StorageWorker::spawn(db) {
        Ok(worker) => worker,
        Err(e) => {
            error!("Failed to start storage worker: {}", e);
            return 1;
        }
    };

    let LcnsArgs { source, network, region, lookup, fallbacks, format, .. } = args;
    let result = worker
        .handle()
        .query(move |db| {
            lcn::resolve_and_store(db, &source, &network, region.as_deref(), lookup, &fallbacks)
        })
        .await;
    worker.shutdown();

    match result {
        Ok(lcns) => {
            match format {
                OutputFormat::Table => print_lcns_table(&lcns),
                OutputFormat::Json => print_lcns_json(&lcns),
                OutputFormat::Csv => print_lcns_csv(&lcns),
            }
            0
        }
        Err(DatabaseError::NotFound(what)) => {
            error!("Not found: {}", what);
            1
        }
        Err(e) => {
            error!("LCN resolution failed: {}", e);
            1
        }
    }
}

pub(crate) fn cmd_sources(database: &Path) -> i32 {
    let db = match open_database(database) {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return 1;
        }
    };

    match db.source_names() {
        Ok(names) if names.is_empty() => {
            println!("No sources found.");
            0
        }
        Ok(names) => {
            for name in names {
                println!("{}", name);
            }
            0
        }
        Err(e) => {
            error!("Failed to list sources: {}", e);
            1
        }
    }
}

fn print_lcns_table(lcns: &[ClientLcn]) {
    if lcns.is_empty() {
        println!("No channel numbers resolved.");
        return;
    }

    println!(
        "{:<6} {:<8} {:<8} {:<8} {}",
        "LCN", "ONID", "SID", "Region", "Freesat ID"
    );
    println!("{}", "-".repeat(44));
    for row in lcns {
        println!(
            "{:<6} 0x{:04X}   0x{:04X}   {:<8} {}",
            row.lcn, row.onid, row.service_id, row.region_code, row.freesat_id
        );
    }
    println!();
    println!("Total: {} channels", lcns.len());
}

fn print_lcns_json(lcns: &[ClientLcn]) {
    match serde_json::to_string_pretty(lcns) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to serialize: {}", e),
    }
}

fn print_lcns_csv(lcns: &[ClientLcn]) {
    println!("lcn,onid,service_id,region_code,freesat_id");
    for row in lcns {
        println!(
            "{},{},{},{},{}",
            row.lcn, row.onid, row.service_id, row.region_code, row.freesat_id
        );
    }
}
