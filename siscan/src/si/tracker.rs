//! Section receipt, completeness and version tracking.
//!
//! One tracker covers a set of logical tables that share a stream and an id
//! space, e.g. every bouquet on the BAT pid or every transport in SDT other.
//! State is kept per `section_id` and torn down with the tracker.

use std::collections::HashMap;

use super::section::SectionHeader;

/// Outcome of tracking one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackResult {
    /// New section, table not yet complete.
    Ok,
    /// This section completed the table (and every other tracked table).
    Complete,
    /// Section already seen in this version.
    Repeat,
    /// Section for a table that was already complete, with every tracked table complete.
    RepeatComplete,
    /// Older version than the adopted one; dropped without changing state.
    OldVersion,
    /// `current_next_indicator` is clear: not applicable yet.
    Next,
    /// Section number beyond `last_section_number`.
    Error,
}

impl TrackResult {
    /// Whether the table is known complete after this section.
    pub fn is_complete(self) -> bool {
        matches!(self, TrackResult::Complete | TrackResult::RepeatComplete)
    }

    /// Whether the section carries new content worth processing.
    pub fn is_fresh(self) -> bool {
        matches!(self, TrackResult::Ok | TrackResult::Complete)
    }
}

/// Version numbers are 5 bits. A higher version is newer, and so is a low
/// version following a high one (the counter wrapped).
const VERSION_MODULUS: u8 = 32;
const WRAP_WINDOW: u8 = 8;

fn is_newer(candidate: u8, adopted: u8) -> bool {
    candidate > adopted
        || (adopted >= VERSION_MODULUS - WRAP_WINDOW && candidate < WRAP_WINDOW)
}

#[derive(Debug, Clone)]
struct TableState {
    version: u8,
    seen: Vec<bool>,
    complete: bool,
}

impl TableState {
    fn new(version: u8) -> Self {
        Self {
            version,
            seen: Vec::new(),
            complete: false,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct TableTracker {
    tables: HashMap<u16, TableState>,
}

impl TableTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a section and classify it.
    pub fn track(&mut self, header: &SectionHeader) -> TrackResult {
        if !header.current_next_indicator {
            return TrackResult::Next;
        }
        if header.section_number > header.last_section_number {
            return TrackResult::Error;
        }

        let version = header.version_number & (VERSION_MODULUS - 1);
        let state = self
            .tables
            .entry(header.section_id)
            .or_insert_with(|| TableState::new(version));

        if state.version != version {
            if !is_newer(version, state.version) {
                return TrackResult::OldVersion;
            }
            *state = TableState::new(version);
        }

        let needed = header.last_section_number as usize + 1;
        if state.seen.len() < needed {
            state.seen.resize(needed, false);
            state.complete = false;
        }

        let index = header.section_number as usize;
        let repeat = state.seen[index];
        state.seen[index] = true;

        let local = if state.complete {
            TrackResult::RepeatComplete
        } else {
            state.complete = state.seen.iter().all(|&s| s);
            if state.complete {
                TrackResult::Complete
            } else if repeat {
                TrackResult::Repeat
            } else {
                TrackResult::Ok
            }
        };

        match local {
            TrackResult::Complete if !self.complete() => TrackResult::Ok,
            TrackResult::RepeatComplete if !self.complete() => TrackResult::Repeat,
            other => other,
        }
    }

    /// Forget every table.
    pub fn reset(&mut self) {
        self.tables.clear();
    }

    /// Whether at least one table is tracked and all tracked tables are complete.
    pub fn complete(&self) -> bool {
        !self.tables.is_empty() && self.tables.values().all(|t| t.complete)
    }

    pub fn is_table_complete(&self, section_id: u16) -> bool {
        self.tables.get(&section_id).is_some_and(|t| t.complete)
    }

    /// Adopted version for a table.
    pub fn version(&self, section_id: u16) -> Option<u8> {
        self.tables.get(&section_id).map(|t| t.version)
    }

    pub fn table_ids(&self) -> impl Iterator<Item = u16> + '_ {
        self.tables.keys().copied()
    }
}
