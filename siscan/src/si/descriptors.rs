//! Descriptor parsing for NIT, BAT and SDT.
//!
//! Each wire descriptor maps to one variant of the closed [`Descriptor`]
//! enum. A [`DescriptorTable`] maps tags to parser functions; platforms
//! extend the standard table with their private tags.

use std::collections::HashMap;

use siscan_tuning::{
    CodeRate, DeliverySystem, GuardInterval, Hierarchy, Modulation, Polarization, Rolloff,
    SatelliteParams, TerrestrialParams, TransmissionMode, TuningProperties,
};

use super::section::{FieldReader, RawDescriptor};
use super::text;
use super::{descriptor_tag, SiError};

/// A descriptor this scanner understands.
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptor {
    NetworkName(String),
    BouquetName(String),
    ServiceList(Vec<ServiceListEntry>),
    SatelliteDelivery(SatelliteDelivery),
    TerrestrialDelivery(TerrestrialDelivery),
    T2Delivery(T2Delivery),
    Service(ServiceDescriptor),
    /// Freeview logical channel numbers.
    LogicalChannels(Vec<LogicalChannel>),
    /// Freesat per-region logical channel numbers.
    FreesatChannels(Vec<FreesatChannel>),
    /// Freesat region names.
    FreesatRegions(Vec<FreesatRegion>),
}

/// Parses one descriptor payload. `Ok(None)` means the payload is well formed
/// but not of interest (e.g. an unhandled extension descriptor).
pub type DescriptorParser = fn(&[u8]) -> Result<Option<Descriptor>, SiError>;

/// Tag to parser dispatch table.
#[derive(Debug, Clone)]
pub struct DescriptorTable {
    parsers: HashMap<u8, DescriptorParser>,
}

impl DescriptorTable {
    /// Table with the EN 300 468 descriptors used for scanning.
    pub fn standard() -> Self {
        let mut parsers: HashMap<u8, DescriptorParser> = HashMap::new();
        parsers.insert(descriptor_tag::NETWORK_NAME, |d| {
            Ok(Some(Descriptor::NetworkName(text::decode(d))))
        });
        parsers.insert(descriptor_tag::BOUQUET_NAME, |d| {
            Ok(Some(Descriptor::BouquetName(text::decode(d))))
        });
        parsers.insert(descriptor_tag::SERVICE_LIST, |d| {
            ServiceListEntry::parse_list(d).map(|l| Some(Descriptor::ServiceList(l)))
        });
        parsers.insert(descriptor_tag::SATELLITE_DELIVERY, |d| {
            SatelliteDelivery::parse(d).map(|s| Some(Descriptor::SatelliteDelivery(s)))
        });
        parsers.insert(descriptor_tag::TERRESTRIAL_DELIVERY, |d| {
            TerrestrialDelivery::parse(d).map(|t| Some(Descriptor::TerrestrialDelivery(t)))
        });
        parsers.insert(descriptor_tag::SERVICE, |d| {
            ServiceDescriptor::parse(d).map(|s| Some(Descriptor::Service(s)))
        });
        parsers.insert(descriptor_tag::EXTENSION, parse_extension);
        Self { parsers }
    }

    /// Add or replace the parser for `tag`.
    pub fn with(mut self, tag: u8, parser: DescriptorParser) -> Self {
        self.parsers.insert(tag, parser);
        self
    }

    pub fn handles(&self, tag: u8) -> bool {
        self.parsers.contains_key(&tag)
    }

    /// Parse a raw descriptor. Unknown tags yield `Ok(None)`.
    pub fn parse(&self, raw: &RawDescriptor<'_>) -> Result<Option<Descriptor>, SiError> {
        match self.parsers.get(&raw.tag) {
            Some(parser) => parser(raw.data),
            None => Ok(None),
        }
    }
}

impl Default for DescriptorTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn parse_extension(data: &[u8]) -> Result<Option<Descriptor>, SiError> {
    match data.word8(0)? {
        descriptor_tag::EXT_T2_DELIVERY => T2Delivery::parse(data).map(|t| Some(Descriptor::T2Delivery(t))),
        _ => Ok(None),
    }
}

/// Entry of a service list descriptor (0x41).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceListEntry {
    pub service_id: u16,
    pub service_type: u8,
}

impl ServiceListEntry {
    pub fn parse_list(data: &[u8]) -> Result<Vec<Self>, SiError> {
        data.chunks(3)
            .map(|entry| {
                Ok(ServiceListEntry {
                    service_id: entry.word16(0)?,
                    service_type: entry.word8(2)?,
                })
            })
            .collect()
    }
}

/// Service descriptor (0x48).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Service type.
    pub service_type: u8,
    /// Service provider name.
    pub provider_name: String,
    /// Service name.
    pub service_name: String,
}

impl ServiceDescriptor {
    pub fn parse(data: &[u8]) -> Result<Self, SiError> {
        let service_type = data.word8(0)?;
        let provider_len = data.word8(1)? as usize;
        let provider = data.field(2, provider_len)?;
        let name_offset = 2 + provider_len;
        let name_len = data.word8(name_offset)? as usize;
        let name = data.field(name_offset + 1, name_len)?;

        Ok(ServiceDescriptor {
            service_type,
            provider_name: text::decode(provider),
            service_name: text::decode(name),
        })
    }
}

/// Inner FEC / code rate field shared by the delivery descriptors.
fn code_rate(code: u8) -> CodeRate {
    match code {
        1 => CodeRate::Fec1_2,
        2 => CodeRate::Fec2_3,
        3 => CodeRate::Fec3_4,
        4 => CodeRate::Fec5_6,
        5 => CodeRate::Fec7_8,
        6 => CodeRate::Fec8_9,
        7 => CodeRate::Fec3_5,
        8 => CodeRate::Fec4_5,
        9 => CodeRate::Fec9_10,
        15 => CodeRate::None,
        _ => CodeRate::Auto,
    }
}

fn bandwidth_hz(code: u8) -> u32 {
    match code {
        0 => 8_000_000,
        1 => 7_000_000,
        2 => 6_000_000,
        3 => 5_000_000,
        4 => 10_000_000,
        5 => 1_712_000,
        _ => 0,
    }
}

fn guard_interval(code: u8) -> GuardInterval {
    match code {
        0 => GuardInterval::Gi1_32,
        1 => GuardInterval::Gi1_16,
        2 => GuardInterval::Gi1_8,
        3 => GuardInterval::Gi1_4,
        4 => GuardInterval::Gi1_128,
        5 => GuardInterval::Gi19_128,
        6 => GuardInterval::Gi19_256,
        _ => GuardInterval::Auto,
    }
}

fn transmission_mode(code: u8) -> TransmissionMode {
    match code {
        0 => TransmissionMode::Mode2K,
        1 => TransmissionMode::Mode8K,
        2 => TransmissionMode::Mode4K,
        3 => TransmissionMode::Mode1K,
        4 => TransmissionMode::Mode16K,
        5 => TransmissionMode::Mode32K,
        _ => TransmissionMode::Auto,
    }
}

/// Satellite delivery system descriptor (0x43).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SatelliteDelivery {
    /// Downlink frequency in kHz.
    pub frequency_khz: u32,
    /// Orbital position in tenths of a degree.
    pub orbital_position: u32,
    pub east: bool,
    pub polarization: Polarization,
    pub rolloff: Rolloff,
    pub s2: bool,
    pub modulation: Modulation,
    /// Symbols per second.
    pub symbol_rate: u32,
    pub fec: CodeRate,
}

impl SatelliteDelivery {
    pub fn parse(data: &[u8]) -> Result<Self, SiError> {
        let flags = data.word8(6)?;
        let polarization = match (flags & 0x60) >> 5 {
            0 => Polarization::Horizontal,
            1 => Polarization::Vertical,
            2 => Polarization::Left,
            _ => Polarization::Right,
        };
        let rolloff = match (flags & 0x18) >> 3 {
            0 => Rolloff::R35,
            1 => Rolloff::R25,
            2 => Rolloff::R20,
            _ => Rolloff::Auto,
        };
        let modulation = match flags & 0x03 {
            1 => Modulation::Qpsk,
            2 => Modulation::Psk8,
            3 => Modulation::Qam16,
            _ => Modulation::Auto,
        };

        Ok(SatelliteDelivery {
            frequency_khz: data.bcd32(0)? * 10,
            orbital_position: data.bcd16(4)?,
            east: flags & 0x80 != 0,
            polarization,
            rolloff,
            s2: flags & 0x04 != 0,
            modulation,
            // seven BCD digits of 100 sym/s, then the FEC nibble
            symbol_rate: (data.bcd24(7)? * 10 + (data.word8(10)? >> 4) as u32) * 100,
            fec: code_rate(data.word8(10)? & 0x0f),
        })
    }

    pub fn to_tuning(&self) -> TuningProperties {
        let system = if self.s2 {
            DeliverySystem::DvbS2
        } else {
            DeliverySystem::DvbS
        };
        TuningProperties::satellite(&SatelliteParams {
            system,
            frequency_khz: self.frequency_khz,
            polarization: self.polarization,
            symbol_rate: self.symbol_rate,
            fec: self.fec,
            rolloff: self.s2.then_some(self.rolloff),
            modulation: self.s2.then_some(self.modulation),
        })
    }
}

/// Terrestrial delivery system descriptor (0x5A).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrestrialDelivery {
    /// Centre frequency in Hz.
    pub frequency_hz: u32,
    pub bandwidth_hz: u32,
    pub modulation: Modulation,
    pub hierarchy: Hierarchy,
    pub code_rate_hp: CodeRate,
    pub code_rate_lp: CodeRate,
    pub guard_interval: GuardInterval,
    pub transmission_mode: TransmissionMode,
}

impl TerrestrialDelivery {
    pub fn parse(data: &[u8]) -> Result<Self, SiError> {
        let b4 = data.word8(4)?;
        let b5 = data.word8(5)?;
        let b6 = data.word8(6)?;

        let modulation = match (b5 & 0xc0) >> 6 {
            0 => Modulation::Qpsk,
            1 => Modulation::Qam16,
            2 => Modulation::Qam64,
            _ => Modulation::Auto,
        };
        let hierarchy = match (b5 & 0x18) >> 3 {
            0 => Hierarchy::None,
            1 => Hierarchy::H1,
            2 => Hierarchy::H2,
            _ => Hierarchy::H4,
        };

        Ok(TerrestrialDelivery {
            frequency_hz: data.word32(0)?.saturating_mul(10),
            bandwidth_hz: bandwidth_hz((b4 & 0xe0) >> 5),
            modulation,
            hierarchy,
            code_rate_hp: code_rate((b5 & 0x07) + 1),
            code_rate_lp: code_rate(((b6 & 0xe0) >> 5) + 1),
            guard_interval: guard_interval((b6 & 0x18) >> 3),
            transmission_mode: transmission_mode((b6 & 0x06) >> 1),
        })
    }

    pub fn to_tuning(&self) -> TuningProperties {
        TuningProperties::terrestrial(&TerrestrialParams {
            system: DeliverySystem::DvbT,
            frequency_hz: self.frequency_hz,
            bandwidth_hz: self.bandwidth_hz,
            code_rate_hp: self.code_rate_hp,
            code_rate_lp: self.code_rate_lp,
            modulation: self.modulation,
            transmission_mode: self.transmission_mode,
            guard_interval: self.guard_interval,
            hierarchy: self.hierarchy,
            plp_id: None,
        })
    }
}

/// T2 delivery system descriptor (extension 0x04).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct T2Delivery {
    pub plp_id: u8,
    pub t2_system_id: u16,
    /// Present when the descriptor carries more than the ids.
    pub details: Option<T2Details>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct T2Details {
    pub siso_miso: u8,
    pub bandwidth_hz: u32,
    pub guard_interval: GuardInterval,
    pub transmission_mode: TransmissionMode,
    /// Centre frequency of the first cell in Hz.
    pub centre_frequency_hz: Option<u32>,
}

impl T2Delivery {
    /// `data` starts at the descriptor_tag_extension byte.
    pub fn parse(data: &[u8]) -> Result<Self, SiError> {
        let plp_id = data.word8(1)?;
        let t2_system_id = data.word16(2)?;

        let details = if data.len() > 4 {
            let b4 = data.word8(4)?;
            let b5 = data.word8(5)?;
            let tfs = b5 & 0x01 != 0;
            // cell_id (2), then frequency_loop_length (1) when TFS is in use
            let freq_offset = if tfs { 9 } else { 8 };
            let centre_frequency_hz = data
                .word32(freq_offset)
                .ok()
                .map(|f| f.saturating_mul(10));
            Some(T2Details {
                siso_miso: b4 >> 6,
                bandwidth_hz: bandwidth_hz((b4 & 0x3c) >> 2),
                guard_interval: guard_interval((b5 & 0xe0) >> 5),
                transmission_mode: transmission_mode((b5 & 0x1c) >> 2),
                centre_frequency_hz,
            })
        } else {
            None
        };

        Ok(T2Delivery {
            plp_id,
            t2_system_id,
            details,
        })
    }

    /// Tuning parameters, available only when the descriptor lists a cell frequency.
    pub fn to_tuning(&self) -> Option<TuningProperties> {
        let details = self.details.as_ref()?;
        let frequency_hz = details.centre_frequency_hz?;
        Some(TuningProperties::terrestrial(&TerrestrialParams {
            system: DeliverySystem::DvbT2,
            frequency_hz,
            bandwidth_hz: details.bandwidth_hz,
            code_rate_hp: CodeRate::Auto,
            code_rate_lp: CodeRate::Auto,
            modulation: Modulation::Auto,
            transmission_mode: details.transmission_mode,
            guard_interval: details.guard_interval,
            hierarchy: Hierarchy::Auto,
            plp_id: Some(u32::from(self.plp_id)),
        }))
    }
}

/// Freeview logical channel descriptor entry (0x83).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalChannel {
    pub service_id: u16,
    pub lcn: u16,
    pub visible: bool,
}

pub fn parse_logical_channels(data: &[u8]) -> Result<Option<Descriptor>, SiError> {
    let channels = data
        .chunks(4)
        .map(|entry| {
            let word = entry.word16(2)?;
            Ok(LogicalChannel {
                service_id: entry.word16(0)?,
                lcn: word & 0x03ff,
                visible: word & 0x8000 != 0,
            })
        })
        .collect::<Result<Vec<_>, SiError>>()?;
    Ok(Some(Descriptor::LogicalChannels(channels)))
}

/// Freesat channel descriptor entry: one service numbered per region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreesatChannel {
    pub service_id: u16,
    pub freesat_id: u16,
    pub numbers: Vec<FreesatNumber>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreesatNumber {
    pub lcn: u16,
    pub region_code: u16,
}

pub fn parse_freesat_channels(data: &[u8]) -> Result<Option<Descriptor>, SiError> {
    let mut channels = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let service_id = data.word16(i)?;
        let freesat_id = data.word16(i + 2)? & 0x7fff;
        let pairs_len = data.word8(i + 4)? as usize;
        let pairs = data.field(i + 5, pairs_len)?;
        let numbers = pairs
            .chunks(4)
            .map(|pair| {
                Ok(FreesatNumber {
                    lcn: pair.word12(0)?,
                    region_code: pair.word16(2)?,
                })
            })
            .collect::<Result<Vec<_>, SiError>>()?;
        channels.push(FreesatChannel {
            service_id,
            freesat_id,
            numbers,
        });
        i += pairs_len + 5;
    }
    Ok(Some(Descriptor::FreesatChannels(channels)))
}

/// Freesat region list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreesatRegion {
    pub region_code: u16,
    pub language: String,
    pub name: String,
}

pub fn parse_freesat_regions(data: &[u8]) -> Result<Option<Descriptor>, SiError> {
    let mut regions = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let region_code = data.word16(i)?;
        let language = String::from_utf8_lossy(data.field(i + 2, 3)?).into_owned();
        let name_len = data.word8(i + 5)? as usize;
        let name = text::decode(data.field(i + 6, name_len)?);
        regions.push(FreesatRegion {
            region_code,
            language,
            name,
        });
        i += name_len + 6;
    }
    Ok(Some(Descriptor::FreesatRegions(regions)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use siscan_tuning::{PropertyKey, Voltage};

    #[test]
    fn test_terrestrial_delivery() {
        // 578 MHz, 8 MHz, QAM64, no hierarchy, HP 2/3, LP 1/2, GI 1/32, 8K
        let data = [0x03, 0x71, 0xf5, 0x40, 0x1f, 0x81, 0x03, 0xff, 0xff, 0xff, 0xff];
        let t = TerrestrialDelivery::parse(&data).unwrap();
        assert_eq!(t.frequency_hz, 578_000_000);
        assert_eq!(t.bandwidth_hz, 8_000_000);
        assert_eq!(t.modulation, Modulation::Qam64);
        assert_eq!(t.hierarchy, Hierarchy::None);
        assert_eq!(t.code_rate_hp, CodeRate::Fec2_3);
        assert_eq!(t.code_rate_lp, CodeRate::Fec1_2);
        assert_eq!(t.guard_interval, GuardInterval::Gi1_32);
        assert_eq!(t.transmission_mode, TransmissionMode::Mode8K);

        let props = t.to_tuning();
        assert_eq!(props.frequency(), Some(578_000_000));
        assert_eq!(props.get(PropertyKey::BandwidthHz), Some(8_000_000));
        assert_eq!(props.describe(), "578MHz (chan 34)");
    }

    #[test]
    fn test_satellite_delivery() {
        // 11.42733 GHz, 28.2E, H, 0.35, S2 8PSK, 27.5 Msym/s, FEC 2/3
        let data = [
            0x01, 0x14, 0x27, 0x33, 0x02, 0x82, 0x86, 0x02, 0x75, 0x00, 0x02,
        ];
        let s = SatelliteDelivery::parse(&data).unwrap();
        assert_eq!(s.frequency_khz, 11_427_330);
        assert_eq!(s.orbital_position, 282);
        assert!(s.east);
        assert_eq!(s.polarization, Polarization::Horizontal);
        assert_eq!(s.rolloff, Rolloff::R35);
        assert!(s.s2);
        assert_eq!(s.modulation, Modulation::Psk8);
        assert_eq!(s.symbol_rate, 27_500_000);
        assert_eq!(s.fec, CodeRate::Fec2_3);

        let props = s.to_tuning();
        assert_eq!(props.delivery_system(), Some(DeliverySystem::DvbS2));
        assert_eq!(props.voltage(), Some(Voltage::V18));
        assert_eq!(props.linuxtv_description(), "S2 11427330 H 27500000 2/3 35 8PSK");
    }

    #[test]
    fn test_satellite_symbol_rate_ignores_fec_nibble() {
        // 22.0005 Msym/s, FEC 0xF (no convolutional coding)
        let data = [
            0x01, 0x14, 0x27, 0x33, 0x02, 0x82, 0x86, 0x02, 0x20, 0x00, 0x5f,
        ];
        let s = SatelliteDelivery::parse(&data).unwrap();
        assert_eq!(s.symbol_rate, 22_000_500);
        assert_eq!(s.fec, CodeRate::None);

        let mut no_coding = [
            0x01, 0x14, 0x27, 0x33, 0x02, 0x82, 0x86, 0x02, 0x75, 0x00, 0x0f,
        ];
        assert_eq!(SatelliteDelivery::parse(&no_coding).unwrap().symbol_rate, 27_500_000);
        no_coding[10] = 0x02;
        assert_eq!(SatelliteDelivery::parse(&no_coding).unwrap().fec, CodeRate::Fec2_3);
    }

    #[test]
    fn test_t2_delivery() {
        let short = [0x04, 0x00, 0x80, 0x01];
        let t2 = T2Delivery::parse(&short).unwrap();
        assert_eq!(t2.plp_id, 0);
        assert_eq!(t2.t2_system_id, 0x8001);
        assert!(t2.details.is_none());
        assert!(t2.to_tuning().is_none());

        // 8 MHz, GI 1/128, 32K, one cell at 474 MHz
        let long = [0x04, 0x01, 0x80, 0x01, 0x00, 0x94, 0x00, 0x01, 0x02, 0xd3, 0x44, 0x40];
        let t2 = T2Delivery::parse(&long).unwrap();
        let details = t2.details.clone().unwrap();
        assert_eq!(details.bandwidth_hz, 8_000_000);
        assert_eq!(details.guard_interval, GuardInterval::Gi1_128);
        assert_eq!(details.transmission_mode, TransmissionMode::Mode32K);
        assert_eq!(details.centre_frequency_hz, Some(474_000_000));
        let props = t2.to_tuning().unwrap();
        assert_eq!(props.delivery_system(), Some(DeliverySystem::DvbT2));
        assert_eq!(props.get(PropertyKey::StreamId), Some(1));
    }

    #[test]
    fn test_service_descriptor() {
        let data = [0x01, 0x03, b'B', b'B', b'C', 0x07, b'B', b'B', b'C', b' ', b'O', b'N', b'E'];
        let s = ServiceDescriptor::parse(&data).unwrap();
        assert_eq!(s.service_type, 1);
        assert_eq!(s.provider_name, "BBC");
        assert_eq!(s.service_name, "BBC ONE");

        assert!(ServiceDescriptor::parse(&data[..6]).is_err());
    }

    #[test]
    fn test_service_list() {
        let data = [0x10, 0x4b, 0x01, 0x10, 0x4c, 0x02];
        let list = ServiceListEntry::parse_list(&data).unwrap();
        assert_eq!(
            list,
            vec![
                ServiceListEntry { service_id: 4171, service_type: 1 },
                ServiceListEntry { service_id: 4172, service_type: 2 },
            ]
        );
        assert!(ServiceListEntry::parse_list(&data[..4]).is_err());
    }

    #[test]
    fn test_logical_channels() {
        let data = [0x10, 0x4b, 0xfc, 0x01, 0x10, 0x4c, 0x7c, 0x02];
        let Some(Descriptor::LogicalChannels(lcns)) = parse_logical_channels(&data).unwrap() else {
            panic!("expected logical channels");
        };
        assert_eq!(lcns[0], LogicalChannel { service_id: 4171, lcn: 1, visible: true });
        assert_eq!(lcns[1], LogicalChannel { service_id: 4172, lcn: 2, visible: false });
    }

    #[test]
    fn test_freesat_channels() {
        // sid 101, freesat id 0x8123 (top bit flag), two numbers
        let data = [
            0x00, 0x65, 0x81, 0x23, 0x08, 0xf0, 0x65, 0xff, 0xff, 0x00, 0x6a, 0x00, 0x0c,
        ];
        let Some(Descriptor::FreesatChannels(channels)) = parse_freesat_channels(&data).unwrap()
        else {
            panic!("expected freesat channels");
        };
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].service_id, 101);
        assert_eq!(channels[0].freesat_id, 0x0123);
        assert_eq!(
            channels[0].numbers,
            vec![
                FreesatNumber { lcn: 101, region_code: 65535 },
                FreesatNumber { lcn: 106, region_code: 12 },
            ]
        );
    }

    #[test]
    fn test_freesat_regions() {
        let data = [0x00, 0x0c, b'e', b'n', b'g', 0x06, b'L', b'o', b'n', b'd', b'o', b'n'];
        let Some(Descriptor::FreesatRegions(regions)) = parse_freesat_regions(&data).unwrap() else {
            panic!("expected regions");
        };
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].region_code, 12);
        assert_eq!(regions[0].language, "eng");
        assert_eq!(regions[0].name, "London");
    }

    #[test]
    fn test_dispatch_table() {
        let table = DescriptorTable::standard();
        let raw = RawDescriptor { tag: 0x40, data: b"Freeview" };
        assert_eq!(
            table.parse(&raw).unwrap(),
            Some(Descriptor::NetworkName("Freeview".to_string()))
        );

        let private = RawDescriptor { tag: 0x83, data: &[0x10, 0x4b, 0xfc, 0x01] };
        assert_eq!(table.parse(&private).unwrap(), None);

        let extended = table.with(0x83, parse_logical_channels);
        assert!(matches!(
            extended.parse(&private).unwrap(),
            Some(Descriptor::LogicalChannels(_))
        ));

        let other_extension = RawDescriptor { tag: 0x7f, data: &[0x06, 0x00] };
        assert_eq!(DescriptorTable::standard().parse(&other_extension).unwrap(), None);
    }
}
