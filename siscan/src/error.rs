//! Error types for scanning.

use std::io;

use siscan_tuning::ParseError;
use thiserror::Error;

use crate::database::DatabaseError;
use crate::si::SiError;

/// I/O failure reported by a section filter.
#[derive(Error, Debug)]
#[error("Section filter pid 0x{pid:04X} table 0x{table_id:02X} failed: {source}")]
pub struct FilterError {
    pub pid: u16,
    pub table_id: u8,
    #[source]
    pub source: io::Error,
}

impl FilterError {
    pub fn new(pid: u16, table_id: u8, source: io::Error) -> Self {
        Self {
            pid,
            table_id,
            source,
        }
    }

    /// Filter ran out of time without a section.
    pub fn is_timeout(&self) -> bool {
        self.source.kind() == io::ErrorKind::TimedOut
    }
}

/// Errors surfaced by the scanning engine.
///
/// Only device unavailability and storage failures end a sweep; everything
/// else is folded into per-filter or per-candidate status.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Tuning device could not be opened or is busy.
    #[error("Tuning device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Tune request rejected for this candidate.
    #[error("Failed to tune: {0}")]
    Tune(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("Malformed section: {0}")]
    Si(#[from] SiError),

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}

impl ScanError {
    /// Whether the sweep has to stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScanError::DeviceUnavailable(_) | ScanError::Storage(_))
    }
}
