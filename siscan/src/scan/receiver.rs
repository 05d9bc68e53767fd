//! Seams to the device and demultiplexer layers.
//!
//! The scanner never blocks: it asks a [`Receiver`] to tune or to open a
//! filter, and the outcome comes back later as a [`ScanEvent`] carrying the
//! id the request was made with.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use siscan_tuning::TuningProperties;

use crate::error::{FilterError, ScanError};

/// Identifies one section filter for the lifetime of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterId(pub u64);

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "filter#{}", self.0)
    }
}

/// Identifies one tune request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttemptId(pub u64);

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attempt#{}", self.0)
    }
}

/// What to capture on a section filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterParams {
    pub pid: u16,
    pub table_id: u8,
    pub table_id_mask: u8,
    /// The filter stops by itself when no section arrives in this time.
    pub timeout: Duration,
}

/// Notifications delivered to the scanner.
#[derive(Debug)]
pub enum ScanEvent {
    /// Outcome of a tune request.
    Lock { attempt: AttemptId, locked: bool },
    /// A section, a filter failure, or `Ok(None)` when the filter stopped.
    Section {
        filter: FilterId,
        result: Result<Option<Bytes>, FilterError>,
    },
    /// The frontend lost its tuning; in-flight filters are abandoned.
    Detuned,
}

/// Handle to an open section filter.
pub trait SectionFilter: Send {
    /// Stop delivering sections. No event for this filter may follow.
    fn stop(&mut self);
}

/// Tuner plus demultiplexer.
pub trait Receiver {
    /// Start tuning. Lock or no-lock arrives as [`ScanEvent::Lock`].
    ///
    /// [`ScanError::DeviceUnavailable`] means no candidate can succeed.
    fn tune(
        &mut self,
        attempt: AttemptId,
        tuning: &TuningProperties,
        timeout: Duration,
    ) -> Result<(), ScanError>;

    /// Parameters the frontend actually locked with, if it reports them.
    fn current_tuning(&self) -> Option<TuningProperties>;

    /// Open a section filter delivering [`ScanEvent::Section`] with `id`.
    fn open_filter(
        &mut self,
        id: FilterId,
        params: &FilterParams,
    ) -> Result<Box<dyn SectionFilter>, FilterError>;
}
