//! DVB Service Information parsing and table reassembly.
//!
//! # Supported Tables
//! - NIT (Network Information Table) - actual and other
//! - BAT (Bouquet Association Table)
//! - SDT (Service Description Table) - actual and other
//!
//! Table processors feed what they find into an [`SiCollector`].

mod descriptors;
mod network;
mod section;
mod service;
pub mod text;
mod tracker;

pub use descriptors::{
    parse_freesat_channels, parse_freesat_regions, parse_logical_channels, Descriptor,
    DescriptorParser, DescriptorTable, FreesatChannel, FreesatNumber, FreesatRegion,
    LogicalChannel, SatelliteDelivery, ServiceDescriptor, ServiceListEntry, T2Delivery,
    T2Details, TerrestrialDelivery,
};
pub use network::{NetworkKind, NetworkSection, NetworkTableProcessor, TransportEntry};
pub use section::{
    DescriptorIter, DescriptorLoop, FieldReader, RawDescriptor, Section, SectionHeader, CRC_LEN,
    HEADER_LEN,
};
pub use service::{ServiceEntry, ServiceInfo, ServiceSection, ServiceTableProcessor};
pub use tracker::{TableTracker, TrackResult};

use siscan_tuning::TuningProperties;
use thiserror::Error;

/// Errors raised while parsing sections and descriptors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SiError {
    /// A field lies beyond the end of the data.
    #[error("Data too short: need {needed} bytes at offset {offset}, have {len}")]
    Truncated {
        offset: usize,
        needed: usize,
        len: usize,
    },

    /// Section length cannot hold a long-form header and CRC.
    #[error("Section length too small: {0}")]
    SectionLengthTooSmall(u16),

    /// Buffer shorter than the section length claims.
    #[error("Incomplete section: expected {expected} bytes, got {actual}")]
    Incomplete { expected: usize, actual: usize },

    /// Section delivered to a processor that does not handle its table id.
    #[error("Unexpected table id 0x{0:02X}")]
    UnexpectedTable(u8),
}

/// Well-known PIDs.
pub mod pid {
    /// Network Information Table PID.
    pub const NIT: u16 = 0x0010;
    /// SDT and BAT PID.
    pub const SDT_BAT: u16 = 0x0011;
    /// Freesat NIT PID.
    pub const FREESAT_NIT: u16 = 3840;
    /// Freesat SDT and BAT PID.
    pub const FREESAT_SDT_BAT: u16 = 3841;
}

/// Table IDs.
pub mod table_id {
    /// Network Information Section - actual.
    pub const NIT_ACTUAL: u8 = 0x40;
    /// Network Information Section - other.
    pub const NIT_OTHER: u8 = 0x41;
    /// Service Description Section - actual.
    pub const SDT_ACTUAL: u8 = 0x42;
    /// Service Description Section - other.
    pub const SDT_OTHER: u8 = 0x46;
    /// Bouquet Association Section.
    pub const BAT: u8 = 0x4a;
}

/// Descriptor tags.
pub mod descriptor_tag {
    /// Network name descriptor (0x40).
    pub const NETWORK_NAME: u8 = 0x40;
    /// Service list descriptor (0x41).
    pub const SERVICE_LIST: u8 = 0x41;
    /// Satellite delivery system descriptor (0x43).
    pub const SATELLITE_DELIVERY: u8 = 0x43;
    /// Bouquet name descriptor (0x47).
    pub const BOUQUET_NAME: u8 = 0x47;
    /// Service descriptor (0x48).
    pub const SERVICE: u8 = 0x48;
    /// Terrestrial delivery system descriptor (0x5A).
    pub const TERRESTRIAL_DELIVERY: u8 = 0x5a;
    /// Extension descriptor (0x7F).
    pub const EXTENSION: u8 = 0x7f;
    /// T2 delivery system, as descriptor_tag_extension.
    pub const EXT_T2_DELIVERY: u8 = 0x04;
    /// Freeview logical channel descriptor.
    pub const FREEVIEW_LCN: u8 = 0x83;
    /// Freesat channel (LCN) descriptor.
    pub const FREESAT_LCN: u8 = 0xd3;
    /// Freesat region name descriptor.
    pub const FREESAT_REGION: u8 = 0xd4;
}

/// Receives topology found by the table processors.
///
/// All methods default to doing nothing so tests can implement only what
/// they observe.
#[allow(unused_variables)]
pub trait SiCollector {
    /// Network or bouquet name (overwrites any earlier name).
    fn network_name(&mut self, kind: NetworkKind, id: u16, name: &str) {}

    /// Delivery system parameters for a transport.
    fn transport_tuning(&mut self, network_id: u16, onid: u16, tsid: u16, tuning: TuningProperties) {}

    /// Services a network table lists for a transport.
    fn transport_services(&mut self, network_id: u16, onid: u16, tsid: u16, services: &[ServiceListEntry]) {}

    /// A service observed directly in an SDT.
    fn service(&mut self, onid: u16, tsid: u16, service_id: u16, info: &ServiceInfo) {}

    /// A logical channel number assignment.
    fn logical_channel(&mut self, network_id: u16, service_id: u16, region_code: u16, lcn: u16, freesat_id: u16) {}

    /// A bouquet region name.
    fn region(&mut self, bouquet_id: u16, region_code: u16, name: &str) {}

    /// The SDT actual identified the transport currently tuned.
    fn current_transport(&mut self, onid: u16, tsid: u16) {}
}

#[cfg(test)]
pub(crate) mod test_util {
    //! Section builders for tests. CRCs are dummies.

    /// Build a long-form section around `payload` with a dummy CRC.
    pub fn build_section(
        table_id: u8,
        id: u16,
        version: u8,
        number: u8,
        last: u8,
        payload: &[u8],
    ) -> Vec<u8> {
        let len = (5 + payload.len() + 4) as u16;
        let mut v = vec![
            table_id,
            0xf0 | (len >> 8) as u8,
            len as u8,
            (id >> 8) as u8,
            id as u8,
            0xc1 | (version << 1),
            number,
            last,
        ];
        v.extend_from_slice(payload);
        v.extend_from_slice(&[0, 0, 0, 0]);
        v
    }

    pub fn descriptor_loop(descriptors: &[(u8, Vec<u8>)]) -> Vec<u8> {
        let body: Vec<u8> = descriptors
            .iter()
            .flat_map(|(tag, data)| {
                let mut d = vec![*tag, data.len() as u8];
                d.extend_from_slice(data);
                d
            })
            .collect();
        let mut v = vec![0xf0 | (body.len() >> 8) as u8, body.len() as u8];
        v.extend(body);
        v
    }

    /// NIT/BAT payload: table descriptors then (tsid, onid, descriptors) entries.
    pub fn network_payload(
        table: &[(u8, Vec<u8>)],
        transports: &[(u16, u16, Vec<(u8, Vec<u8>)>)],
    ) -> Vec<u8> {
        let mut v = descriptor_loop(table);
        let mut ts_loop = Vec::new();
        for (tsid, onid, descs) in transports {
            ts_loop.extend_from_slice(&tsid.to_be_bytes());
            ts_loop.extend_from_slice(&onid.to_be_bytes());
            ts_loop.extend(descriptor_loop(descs));
        }
        v.push(0xf0 | (ts_loop.len() >> 8) as u8);
        v.push(ts_loop.len() as u8);
        v.extend(ts_loop);
        v
    }

    /// Terrestrial delivery descriptor payload for 578 MHz, 8 MHz.
    pub fn terrestrial_578() -> Vec<u8> {
        vec![0x03, 0x71, 0xf5, 0x40, 0x1f, 0x81, 0x03, 0xff, 0xff, 0xff, 0xff]
    }

    /// SDT payload: onid, reserved byte, then (sid, running/free_ca, descriptors) entries.
    pub fn service_payload(onid: u16, services: &[(u16, bool, Vec<(u8, Vec<u8>)>)]) -> Vec<u8> {
        let mut v = onid.to_be_bytes().to_vec();
        v.push(0xff);
        for (sid, free_ca, descs) in services {
            v.extend_from_slice(&sid.to_be_bytes());
            v.push(0xfc);
            let mut d = descriptor_loop(descs);
            // running status 4 (running) in the top bits of the loop length
            d[0] = (d[0] & 0x0f) | 0x80 | if *free_ca { 0x10 } else { 0 };
            v.extend(d);
        }
        v
    }

    /// Service descriptor payload.
    pub fn service_descriptor(service_type: u8, provider: &str, name: &str) -> Vec<u8> {
        let mut v = vec![service_type, provider.len() as u8];
        v.extend_from_slice(provider.as_bytes());
        v.push(name.len() as u8);
        v.extend_from_slice(name.as_bytes());
        v
    }
}
