//! Tuning string inspection.

use log::error;

use siscan::scan::{Platform, PlatformKind};
use siscan_tuning::TuningProperties;

pub(crate) fn cmd_describe(tuning: &str) -> i32 {
    let props = match TuningProperties::parse(tuning) {
        Ok(props) => props,
        Err(e) => {
            error!("{}", e);
            return 1;
        }
    };

    println!("Tuning:");
    println!("  Description:  {}", props.describe());
    println!("  Linux DVB:    {}", props.linuxtv_description());
    println!("  Equivalence:  {}", props.equivalence());
    println!("  Properties:");
    for (key, value) in props.iter() {
        println!("    {:<18} {}", key.token(), value);
    }
    0
}

pub(crate) fn cmd_presets(kind: PlatformKind, channels: Option<(u32, u32)>) -> i32 {
    if let Some((first, last)) = channels {
        if first > last {
            error!("Invalid channel range {}..{}", first, last);
            return 1;
        }
    }

    let platform = Platform::new(kind);
    let candidates: Vec<TuningProperties> = platform.iterator(channels).collect();
    if candidates.is_empty() {
        println!("No tuning candidates.");
        return 0;
    }

    println!("{:<4} {:<20} {}", "#", "Description", "Tuning");
    println!("{}", "-".repeat(70));
    for (i, props) in candidates.iter().enumerate() {
        println!("{:<4} {:<20} {}", i + 1, props.describe(), props.linuxtv_description());
    }
    println!();
    println!("Total: {} candidates ({})", candidates.len(), kind);
    0
}
