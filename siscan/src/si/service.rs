//! SDT processing.

use std::sync::Arc;

use log::{debug, trace};

use super::descriptors::{Descriptor, DescriptorTable};
use super::network::collect_descriptors;
use super::section::{DescriptorLoop, FieldReader, Section, HEADER_LEN};
use super::tracker::{TableTracker, TrackResult};
use super::{table_id, SiCollector, SiError};

/// What an SDT entry says about one service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceInfo {
    pub service_type: Option<u8>,
    pub name: Option<String>,
    pub provider: Option<String>,
    pub free_ca: bool,
    pub running_status: u8,
}

/// SDT service loop entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceEntry {
    pub service_id: u16,
    pub running_status: u8,
    pub free_ca: bool,
    pub descriptors: Vec<Descriptor>,
}

impl ServiceEntry {
    pub fn info(&self) -> ServiceInfo {
        let mut info = ServiceInfo {
            free_ca: self.free_ca,
            running_status: self.running_status,
            ..ServiceInfo::default()
        };
        for descriptor in &self.descriptors {
            if let Descriptor::Service(s) = descriptor {
                info.service_type = Some(s.service_type);
                info.name = Some(s.service_name.clone());
                info.provider = Some(s.provider_name.clone());
            }
        }
        info
    }
}

/// A parsed SDT section.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSection {
    pub transport_stream_id: u16,
    pub original_network_id: u16,
    pub services: Vec<ServiceEntry>,
}

impl ServiceSection {
    pub fn parse(section: &Section<'_>, table: &DescriptorTable) -> Result<Self, SiError> {
        let bytes = section.bytes();
        let end = section.payload_end();
        let original_network_id = bytes.word16(HEADER_LEN)?;

        let mut services = Vec::new();
        let mut pos = HEADER_LEN + 3;
        while pos + 5 <= end {
            let service_id = bytes.word16(pos)?;
            let flags = bytes.word8(pos + 3)?;
            let loop_len = bytes.word12(pos + 3)? as usize;
            let data = bytes.field(pos + 5, loop_len)?;
            if pos + 5 + loop_len > end {
                return Err(SiError::Truncated {
                    offset: pos + 5,
                    needed: loop_len,
                    len: end,
                });
            }
            services.push(ServiceEntry {
                service_id,
                running_status: (flags & 0xe0) >> 5,
                free_ca: flags & 0x10 != 0,
                descriptors: collect_descriptors(DescriptorLoop::new(data).iter(), table),
            });
            pos += 5 + loop_len;
        }

        Ok(ServiceSection {
            transport_stream_id: section.section_id(),
            original_network_id,
            services,
        })
    }
}

/// Processes SDT actual and SDT other.
///
/// The two are independent logical tables; the service table is complete
/// when every expected one is.
#[derive(Debug)]
pub struct ServiceTableProcessor {
    descriptors: Arc<DescriptorTable>,
    actual: TableTracker,
    other: TableTracker,
    expect_actual: bool,
    expect_other: bool,
}

impl ServiceTableProcessor {
    pub fn new(descriptors: Arc<DescriptorTable>, expect_actual: bool, expect_other: bool) -> Self {
        Self {
            descriptors,
            actual: TableTracker::new(),
            other: TableTracker::new(),
            expect_actual,
            expect_other,
        }
    }

    pub fn process(
        &mut self,
        section: &Section<'_>,
        sink: &mut dyn SiCollector,
    ) -> Result<TrackResult, SiError> {
        let is_actual = match section.table_id() {
            table_id::SDT_ACTUAL => true,
            table_id::SDT_OTHER => false,
            other => return Err(SiError::UnexpectedTable(other)),
        };
        let parsed = ServiceSection::parse(section, &self.descriptors)?;
        let tracker = if is_actual { &mut self.actual } else { &mut self.other };
        let result = tracker.track(&section.header);
        if !result.is_fresh() {
            trace!(
                "ServiceTable: ts 0x{:04x} section {} -> {:?}",
                parsed.transport_stream_id,
                section.header.section_number,
                result
            );
            return Ok(result);
        }

        debug!(
            "ServiceTable: {} onid 0x{:04x} ts 0x{:04x} v{} section {}/{} with {} services",
            if is_actual { "actual" } else { "other" },
            parsed.original_network_id,
            parsed.transport_stream_id,
            section.header.version_number,
            section.header.section_number,
            section.header.last_section_number,
            parsed.services.len()
        );

        let (onid, tsid) = (parsed.original_network_id, parsed.transport_stream_id);
        if is_actual {
            sink.current_transport(onid, tsid);
        }
        for service in &parsed.services {
            sink.service(onid, tsid, service.service_id, &service.info());
        }
        Ok(result)
    }

    pub fn actual_complete(&self) -> bool {
        self.actual.complete()
    }

    pub fn other_complete(&self) -> bool {
        self.other.complete()
    }

    /// Conjunction of the expected logical tables.
    pub fn complete(&self) -> bool {
        (self.expect_actual || self.expect_other)
            && (!self.expect_actual || self.actual.complete())
            && (!self.expect_other || self.other.complete())
    }

    pub fn reset(&mut self) {
        self.actual.reset();
        self.other.reset();
    }
}
