//! Per-channel scanner.
//!
//! Opens one section filter per table the platform needs and feeds each
//! section to the matching table processor. The channel is done when every
//! filter has reached a terminal status; a fast table never preempts a slow
//! one.

use std::collections::{BTreeMap, HashMap};
use std::mem;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use log::{debug, trace, warn};

use super::platform::{FilterSpec, Platform, TableRole};
use super::receiver::{FilterId, FilterParams, Receiver, SectionFilter};
use crate::error::FilterError;
use crate::si::{
    DescriptorTable, NetworkKind, NetworkTableProcessor, Section, ServiceTableProcessor,
    SiCollector, SiError, TrackResult,
};

/// Status of one filter on the current channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStatus {
    Blank,
    Ok,
    /// Table complete; the filter stays open until a repeat confirms it.
    Complete,
    RepeatComplete,
    Error,
    /// Stopped or timed out before completing.
    Stopped,
}

impl FilterStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, FilterStatus::Blank | FilterStatus::Ok)
    }

    pub fn is_success(self) -> bool {
        matches!(self, FilterStatus::Complete | FilterStatus::RepeatComplete)
    }

    fn closes_filter(self) -> bool {
        matches!(
            self,
            FilterStatus::RepeatComplete | FilterStatus::Error | FilterStatus::Stopped
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Idle,
    AwaitingSections,
    Done,
}

/// Result of feeding the channel scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOutcome {
    Running,
    /// `success` is true when at least one table completed.
    Finished { success: bool },
}

struct FilterSlot {
    spec: FilterSpec,
    status: FilterStatus,
    handle: Option<Box<dyn SectionFilter>>,
}

impl FilterSlot {
    fn update(&mut self, status: FilterStatus) {
        let next = match (self.status, status) {
            (current, next) if current == next => return,
            (FilterStatus::Blank | FilterStatus::Ok, next) => next,
            (FilterStatus::Complete, FilterStatus::Ok | FilterStatus::RepeatComplete) => status,
            // stays complete, but the filter is gone
            (FilterStatus::Complete, FilterStatus::Error | FilterStatus::Stopped) => {
                self.close();
                return;
            }
            _ => return,
        };
        self.status = next;
        if next.closes_filter() {
            self.close();
        }
    }

    fn close(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.stop();
        }
    }
}

/// One network or bouquet id seen on the current channel.
#[derive(Debug)]
struct NetworkData {
    processor: NetworkTableProcessor,
    complete: bool,
}

pub struct ChannelScanner {
    filters: Vec<FilterSpec>,
    filter_timeout: Duration,
    descriptors: Arc<DescriptorTable>,
    state: ChannelState,
    next_filter: u64,
    slots: HashMap<FilterId, FilterSlot>,
    networks: BTreeMap<u16, NetworkData>,
    bouquets: BTreeMap<u16, NetworkData>,
    services: ServiceTableProcessor,
}

impl ChannelScanner {
    pub fn new(platform: &Platform, filter_timeout: Duration) -> Self {
        let expect_actual = platform.filter(TableRole::ServicesActual).is_some();
        let expect_other = platform.filter(TableRole::ServicesOther).is_some();
        Self {
            filters: platform.filters.clone(),
            filter_timeout,
            descriptors: platform.descriptors.clone(),
            state: ChannelState::Idle,
            next_filter: 0,
            slots: HashMap::new(),
            networks: BTreeMap::new(),
            bouquets: BTreeMap::new(),
            services: ServiceTableProcessor::new(
                platform.descriptors.clone(),
                expect_actual,
                expect_other,
            ),
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Open the platform's filters on the tuned channel.
    pub fn start<R: Receiver + ?Sized>(&mut self, receiver: &mut R) -> ChannelOutcome {
        self.cancel();
        self.networks.clear();
        self.bouquets.clear();
        self.services.reset();

        for spec in self.filters.clone() {
            self.next_filter += 1;
            let id = FilterId(self.next_filter);
            let params = FilterParams {
                pid: spec.pid,
                table_id: spec.table_id,
                table_id_mask: spec.table_id_mask,
                timeout: self.filter_timeout,
            };
            match receiver.open_filter(id, &params) {
                Ok(handle) => {
                    trace!("ChannelScanner: {} {:?} pid 0x{:04x}", id, spec.role, spec.pid);
                    self.slots.insert(
                        id,
                        FilterSlot {
                            spec,
                            status: FilterStatus::Blank,
                            handle: Some(handle),
                        },
                    );
                }
                Err(e) => warn!("ChannelScanner: {}", e),
            }
        }

        if self.slots.is_empty() {
            self.state = ChannelState::Done;
            return ChannelOutcome::Finished { success: false };
        }
        self.state = ChannelState::AwaitingSections;
        ChannelOutcome::Running
    }

    /// Feed a filter event.
    pub fn handle_section(
        &mut self,
        filter: FilterId,
        result: Result<Option<Bytes>, FilterError>,
        sink: &mut dyn SiCollector,
    ) -> ChannelOutcome {
        if self.state != ChannelState::AwaitingSections {
            trace!("ChannelScanner: dropping event for {} while {:?}", filter, self.state);
            return self.outcome();
        }
        let Some(role) = self.slots.get(&filter).map(|s| s.spec.role) else {
            trace!("ChannelScanner: dropping event for unknown {}", filter);
            return self.outcome();
        };

        let status = match result {
            Err(e) => {
                warn!("ChannelScanner: {}", e);
                FilterStatus::Error
            }
            Ok(None) => {
                debug!("ChannelScanner: {} {:?} stopped", filter, role);
                FilterStatus::Stopped
            }
            Ok(Some(bytes)) => match self.process(role, &bytes, sink) {
                Ok(status) => status,
                Err(e) => {
                    warn!("ChannelScanner: {:?} section rejected: {}", role, e);
                    FilterStatus::Error
                }
            },
        };
        if let Some(slot) = self.slots.get_mut(&filter) {
            slot.update(status);
        }

        if self.slots.values().all(|s| s.status.is_terminal()) {
            self.state = ChannelState::Done;
        }
        self.outcome()
    }

    /// Returns the new status for the filter that delivered `bytes`.
    fn process(
        &mut self,
        role: TableRole,
        bytes: &[u8],
        sink: &mut dyn SiCollector,
    ) -> Result<FilterStatus, SiError> {
        let section = Section::parse(bytes)?;
        let current = self
            .slots
            .values()
            .find(|s| s.spec.role == role)
            .map_or(FilterStatus::Blank, |s| s.status);

        let (result, all_complete) = match role {
            TableRole::Network | TableRole::Bouquet => {
                let (kind, map) = if role == TableRole::Network {
                    (NetworkKind::Network, &mut self.networks)
                } else {
                    (NetworkKind::Bouquet, &mut self.bouquets)
                };
                let descriptors = &self.descriptors;
                let data = map.entry(section.section_id()).or_insert_with(|| NetworkData {
                    processor: NetworkTableProcessor::new(kind, descriptors.clone()),
                    complete: false,
                });
                let result = data.processor.process(&section, sink)?;
                if result.is_complete() {
                    data.complete = true;
                } else if result == TrackResult::Ok {
                    data.complete = false;
                }
                (result, map.values().all(|d| d.complete))
            }
            TableRole::ServicesActual | TableRole::ServicesOther => {
                let result = self.services.process(&section, sink)?;
                let done = if role == TableRole::ServicesActual {
                    self.services.actual_complete()
                } else {
                    self.services.other_complete()
                };
                (result, done)
            }
        };

        Ok(match result {
            TrackResult::Complete if all_complete => FilterStatus::Complete,
            TrackResult::RepeatComplete if all_complete => FilterStatus::RepeatComplete,
            TrackResult::Complete | TrackResult::Ok => FilterStatus::Ok,
            TrackResult::Error => FilterStatus::Error,
            TrackResult::Repeat
            | TrackResult::RepeatComplete
            | TrackResult::OldVersion
            | TrackResult::Next => current,
        })
    }

    /// Current outcome; `Running` until every filter is terminal.
    pub fn outcome(&self) -> ChannelOutcome {
        match self.state {
            ChannelState::Done => ChannelOutcome::Finished {
                success: self.success(),
            },
            _ => ChannelOutcome::Running,
        }
    }

    /// Whether any table completed on this channel.
    pub fn success(&self) -> bool {
        self.slots.values().any(|s| s.status.is_success())
    }

    pub fn filter_status(&self, role: TableRole) -> Option<FilterStatus> {
        self.slots
            .values()
            .find(|s| s.spec.role == role)
            .map(|s| s.status)
    }

    /// Stop every open filter. Safe to call repeatedly.
    pub fn cancel(&mut self) {
        // Slots go first so nothing routes to a handle being stopped.
        let slots = mem::take(&mut self.slots);
        for (_, mut slot) in slots {
            slot.close();
        }
        if self.state == ChannelState::AwaitingSections {
            self.state = ChannelState::Done;
        }
    }

    /// Stop filters and report what was achieved so far.
    pub fn finish(&mut self) -> bool {
        let success = self.success();
        self.cancel();
        self.state = ChannelState::Idle;
        success
    }
}

impl Drop for ChannelScanner {
    fn drop(&mut self) {
        self.cancel();
    }
}
