//! Command implementations.
//!
//! Each command returns the process exit code.

mod database;
mod tuning;

pub(crate) use database::{cmd_lcns, cmd_sources, default_database_path, LcnsArgs};
pub(crate) use tuning::{cmd_describe, cmd_presets};
