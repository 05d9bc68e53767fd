//! NIT and BAT processing.
//!
//! Both tables share one layout: a table-level descriptor loop followed by a
//! transport stream loop whose entries carry their own descriptors.

use std::sync::Arc;

use log::{debug, trace, warn};

use super::descriptors::{Descriptor, DescriptorTable};
use super::section::{FieldReader, RawDescriptor, Section, HEADER_LEN};
use super::tracker::{TableTracker, TrackResult};
use super::{SiCollector, SiError};

/// Which of the two network-shaped tables a processor handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkKind {
    Network,
    Bouquet,
}

/// Transport stream loop entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportEntry {
    pub transport_stream_id: u16,
    pub original_network_id: u16,
    pub descriptors: Vec<Descriptor>,
}

/// A parsed NIT or BAT section. Unknown descriptors are already dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkSection {
    /// Network id (NIT) or bouquet id (BAT).
    pub id: u16,
    pub descriptors: Vec<Descriptor>,
    pub transports: Vec<TransportEntry>,
}

impl NetworkSection {
    pub fn parse(section: &Section<'_>, table: &DescriptorTable) -> Result<Self, SiError> {
        let bytes = section.bytes();
        let end = section.payload_end();

        let network_loop = section.descriptors_at(HEADER_LEN)?;
        let descriptors = collect_descriptors(network_loop.iter(), table);

        let ts_loop_offset = HEADER_LEN + 2 + network_loop.byte_len();
        let ts_loop_len = bytes.word12(ts_loop_offset)? as usize;
        let mut pos = ts_loop_offset + 2;
        let ts_loop_end = (pos + ts_loop_len).min(end);

        let mut transports = Vec::new();
        while pos + 6 <= ts_loop_end {
            let transport_stream_id = bytes.word16(pos)?;
            let original_network_id = bytes.word16(pos + 2)?;
            let entry_loop = section.descriptors_at(pos + 4)?;
            transports.push(TransportEntry {
                transport_stream_id,
                original_network_id,
                descriptors: collect_descriptors(entry_loop.iter(), table),
            });
            pos += 6 + entry_loop.byte_len();
        }

        Ok(NetworkSection {
            id: section.section_id(),
            descriptors,
            transports,
        })
    }
}

/// Parse a descriptor loop, skipping unknown tags and logging bad ones.
pub(super) fn collect_descriptors<'a, I>(raw: I, table: &DescriptorTable) -> Vec<Descriptor>
where
    I: Iterator<Item = Result<RawDescriptor<'a>, SiError>>,
{
    let mut out = Vec::new();
    for item in raw {
        match item.and_then(|d| table.parse(&d).map(|parsed| (d.tag, parsed))) {
            Ok((_, Some(descriptor))) => out.push(descriptor),
            Ok((tag, None)) => trace!("Descriptor: skipping tag 0x{:02x}", tag),
            Err(e) => {
                warn!("Descriptor: malformed entry: {}", e);
            }
        }
    }
    out
}

/// Turns NIT or BAT sections for one network/bouquet id into collector events.
#[derive(Debug)]
pub struct NetworkTableProcessor {
    kind: NetworkKind,
    descriptors: Arc<DescriptorTable>,
    tracker: TableTracker,
}

impl NetworkTableProcessor {
    pub fn new(kind: NetworkKind, descriptors: Arc<DescriptorTable>) -> Self {
        Self {
            kind,
            descriptors,
            tracker: TableTracker::new(),
        }
    }

    pub fn kind(&self) -> NetworkKind {
        self.kind
    }

    /// Process one section. Repeats, old versions and not-yet-current
    /// sections are tracked but produce no events.
    pub fn process(
        &mut self,
        section: &Section<'_>,
        sink: &mut dyn SiCollector,
    ) -> Result<TrackResult, SiError> {
        let parsed = NetworkSection::parse(section, &self.descriptors)?;
        let result = self.tracker.track(&section.header);
        if !result.is_fresh() {
            trace!(
                "NetworkTable: {:?} 0x{:04x} section {} -> {:?}",
                self.kind,
                parsed.id,
                section.header.section_number,
                result
            );
            return Ok(result);
        }

        debug!(
            "NetworkTable: {:?} 0x{:04x} v{} section {}/{} with {} transports",
            self.kind,
            parsed.id,
            section.header.version_number,
            section.header.section_number,
            section.header.last_section_number,
            parsed.transports.len()
        );
        self.emit(&parsed, sink);
        Ok(result)
    }

    pub fn complete(&self) -> bool {
        self.tracker.complete()
    }

    pub fn reset(&mut self) {
        self.tracker.reset();
    }

    fn emit(&self, parsed: &NetworkSection, sink: &mut dyn SiCollector) {
        let id = parsed.id;
        for descriptor in &parsed.descriptors {
            match descriptor {
                Descriptor::NetworkName(name) | Descriptor::BouquetName(name) => {
                    sink.network_name(self.kind, id, name)
                }
                Descriptor::FreesatRegions(regions) => {
                    for region in regions {
                        sink.region(id, region.region_code, &region.name);
                    }
                }
                _ => {}
            }
        }

        for ts in &parsed.transports {
            let (onid, tsid) = (ts.original_network_id, ts.transport_stream_id);
            for descriptor in &ts.descriptors {
                match descriptor {
                    Descriptor::SatelliteDelivery(d) => {
                        sink.transport_tuning(id, onid, tsid, d.to_tuning())
                    }
                    Descriptor::TerrestrialDelivery(d) => {
                        sink.transport_tuning(id, onid, tsid, d.to_tuning())
                    }
                    Descriptor::T2Delivery(d) => match d.to_tuning() {
                        Some(tuning) => sink.transport_tuning(id, onid, tsid, tuning),
                        None => trace!("NetworkTable: T2 descriptor for 0x{:04x} has no frequency", tsid),
                    },
                    Descriptor::ServiceList(services) => {
                        sink.transport_services(id, onid, tsid, services)
                    }
                    Descriptor::LogicalChannels(channels) => {
                        for ch in channels {
                            sink.logical_channel(id, ch.service_id, 0, ch.lcn, 0);
                        }
                    }
                    Descriptor::FreesatChannels(channels) => {
                        for ch in channels {
                            for number in &ch.numbers {
                                sink.logical_channel(
                                    id,
                                    ch.service_id,
                                    number.region_code,
                                    number.lcn,
                                    ch.freesat_id,
                                );
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::si::test_util::{build_section, network_payload, terrestrial_578};
    use crate::si::descriptors::{parse_freesat_channels, parse_logical_channels, ServiceListEntry};
    use crate::si::descriptor_tag;
    use siscan_tuning::{PropertyKey, TuningProperties};

    #[derive(Default)]
    struct Recorder {
        names: Vec<(NetworkKind, u16, String)>,
        tunings: Vec<(u16, u16, u16, TuningProperties)>,
        services: Vec<(u16, u16, Vec<ServiceListEntry>)>,
        lcns: Vec<(u16, u16, u16, u16, u16)>,
        regions: Vec<(u16, u16, String)>,
    }

    impl SiCollector for Recorder {
        fn network_name(&mut self, kind: NetworkKind, id: u16, name: &str) {
            self.names.push((kind, id, name.to_string()));
        }
        fn transport_tuning(&mut self, network_id: u16, onid: u16, tsid: u16, tuning: TuningProperties) {
            self.tunings.push((network_id, onid, tsid, tuning));
        }
        fn transport_services(&mut self, _network_id: u16, onid: u16, tsid: u16, services: &[ServiceListEntry]) {
            self.services.push((onid, tsid, services.to_vec()));
        }
        fn logical_channel(&mut self, network_id: u16, service_id: u16, region_code: u16, lcn: u16, freesat_id: u16) {
            self.lcns.push((network_id, service_id, region_code, lcn, freesat_id));
        }
        fn region(&mut self, bouquet_id: u16, region_code: u16, name: &str) {
            self.regions.push((bouquet_id, region_code, name.to_string()));
        }
    }

    #[test]
    fn test_nit_terrestrial_transport() {
        let payload = network_payload(
            &[(descriptor_tag::NETWORK_NAME, b"London".to_vec())],
            &[(
                0x1004,
                0x233a,
                vec![
                    (descriptor_tag::TERRESTRIAL_DELIVERY, terrestrial_578()),
                    (descriptor_tag::SERVICE_LIST, vec![0x10, 0x4b, 0x01, 0x10, 0x4c, 0x01]),
                ],
            )],
        );
        let data = build_section(0x40, 0x1001, 0, 0, 0, &payload);
        let section = Section::parse(&data).unwrap();

        let mut processor =
            NetworkTableProcessor::new(NetworkKind::Network, Arc::new(DescriptorTable::standard()));
        let mut rec = Recorder::default();
        assert_eq!(processor.process(&section, &mut rec).unwrap(), TrackResult::Complete);
        assert!(processor.complete());

        assert_eq!(rec.names, vec![(NetworkKind::Network, 0x1001, "London".to_string())]);
        assert_eq!(rec.tunings.len(), 1);
        let (network_id, onid, tsid, tuning) = &rec.tunings[0];
        assert_eq!((*network_id, *onid, *tsid), (0x1001, 0x233a, 0x1004));
        assert_eq!(tuning.frequency(), Some(578_000_000));
        assert_eq!(tuning.get(PropertyKey::BandwidthHz), Some(8_000_000));
        let sids: Vec<u16> = rec.services[0].2.iter().map(|s| s.service_id).collect();
        assert_eq!(sids, vec![4171, 4172]);

        // a repeat yields no further events
        let mut again = Recorder::default();
        assert_eq!(
            processor.process(&section, &mut again).unwrap(),
            TrackResult::RepeatComplete
        );
        assert!(again.tunings.is_empty());
    }

    #[test]
    fn test_nit_unknown_private_tag_skipped() {
        let payload = network_payload(
            &[],
            &[(0x1004, 0x233a, vec![(descriptor_tag::FREEVIEW_LCN, vec![0x10, 0x4b, 0xfc, 0x01])])],
        );
        let data = build_section(0x40, 0x1001, 0, 0, 0, &payload);
        let section = Section::parse(&data).unwrap();

        let mut rec = Recorder::default();
        let mut standard =
            NetworkTableProcessor::new(NetworkKind::Network, Arc::new(DescriptorTable::standard()));
        standard.process(&section, &mut rec).unwrap();
        assert!(rec.lcns.is_empty());

        let table = DescriptorTable::standard().with(descriptor_tag::FREEVIEW_LCN, parse_logical_channels);
        let mut freeview = NetworkTableProcessor::new(NetworkKind::Network, Arc::new(table));
        freeview.process(&section, &mut rec).unwrap();
        assert_eq!(rec.lcns, vec![(0x1001, 4171, 0, 1, 0)]);
    }

    #[test]
    fn test_bat_freesat_regions_and_channels() {
        let payload = network_payload(
            &[
                (descriptor_tag::BOUQUET_NAME, b"England HD".to_vec()),
                (
                    descriptor_tag::FREESAT_REGION,
                    vec![0x00, 0x0c, b'e', b'n', b'g', 0x06, b'L', b'o', b'n', b'd', b'o', b'n'],
                ),
            ],
            &[(
                0x07e8,
                0x0002,
                vec![(
                    descriptor_tag::FREESAT_LCN,
                    vec![0x00, 0x65, 0x81, 0x23, 0x04, 0xf0, 0x65, 0x00, 0x0c],
                )],
            )],
        );
        let data = build_section(0x4a, 0x0110, 3, 0, 0, &payload);
        let section = Section::parse(&data).unwrap();

        let table = DescriptorTable::standard()
            .with(descriptor_tag::FREESAT_LCN, parse_freesat_channels)
            .with(descriptor_tag::FREESAT_REGION, crate::si::parse_freesat_regions);
        let mut processor = NetworkTableProcessor::new(NetworkKind::Bouquet, Arc::new(table));
        let mut rec = Recorder::default();
        processor.process(&section, &mut rec).unwrap();

        assert_eq!(rec.names, vec![(NetworkKind::Bouquet, 0x0110, "England HD".to_string())]);
        assert_eq!(rec.regions, vec![(0x0110, 12, "London".to_string())]);
        assert_eq!(rec.lcns, vec![(0x0110, 101, 12, 101, 0x0123)]);
    }

    #[test]
    fn test_old_version_produces_no_events() {
        let payload = network_payload(&[(descriptor_tag::NETWORK_NAME, b"A".to_vec())], &[]);
        let v2 = build_section(0x40, 1, 2, 0, 0, &payload);
        let v1 = build_section(0x40, 1, 1, 0, 0, &payload);
        let mut processor =
            NetworkTableProcessor::new(NetworkKind::Network, Arc::new(DescriptorTable::standard()));
        let mut rec = Recorder::default();
        processor.process(&Section::parse(&v2).unwrap(), &mut rec).unwrap();
        let r = processor.process(&Section::parse(&v1).unwrap(), &mut rec).unwrap();
        assert_eq!(r, TrackResult::OldVersion);
        assert_eq!(rec.names.len(), 1);
    }

    #[test]
    fn test_truncated_transport_loop_is_an_error() {
        let mut payload = network_payload(&[], &[(1, 2, vec![(0x41, vec![0, 1, 1])])]);
        // claim a longer descriptor loop than the section holds
        payload[8] = 0xf0;
        payload[9] = 0x40;
        let data = build_section(0x40, 1, 0, 0, 0, &payload);
        let section = Section::parse(&data).unwrap();
        let mut processor =
            NetworkTableProcessor::new(NetworkKind::Network, Arc::new(DescriptorTable::standard()));
        assert!(processor.process(&section, &mut Recorder::default()).is_err());
        assert!(!processor.complete());
    }
}
