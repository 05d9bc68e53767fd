//! Ordered DVB frontend property lists.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::types::{
    CodeRate, DeliveryFamily, DeliverySystem, GuardInterval, Hierarchy, Inversion, Modulation,
    Pilot, Polarization, PropertyKey, Rolloff, Tone, TransmissionMode, Voltage,
};

/// Universal LNB switch frequency (kHz).
pub const SLOF: u32 = 11_700_000;
/// Universal LNB low-band local oscillator (kHz).
pub const LOF1: u32 = 9_750_000;
/// Universal LNB high-band local oscillator (kHz).
pub const LOF2: u32 = 10_600_000;

/// UK UHF channel raster: centre = channel * 8 MHz + 306 MHz.
const UHF_BASE_MHZ: u32 = 306;
const UHF_STEP_MHZ: u32 = 8;
const UHF_CHANNELS: std::ops::RangeInclusive<u32> = 21..=69;

/// Parameters of a satellite transponder, as found in tuning strings or
/// satellite delivery system descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SatelliteParams {
    pub system: DeliverySystem,
    /// Downlink frequency in kHz.
    pub frequency_khz: u32,
    pub polarization: Polarization,
    /// Symbols per second.
    pub symbol_rate: u32,
    pub fec: CodeRate,
    pub rolloff: Option<Rolloff>,
    pub modulation: Option<Modulation>,
}

/// Parameters of a terrestrial multiplex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrestrialParams {
    pub system: DeliverySystem,
    /// Centre frequency in Hz.
    pub frequency_hz: u32,
    /// Channel bandwidth in Hz, 0 for automatic.
    pub bandwidth_hz: u32,
    pub code_rate_hp: CodeRate,
    pub code_rate_lp: CodeRate,
    pub modulation: Modulation,
    pub transmission_mode: TransmissionMode,
    pub guard_interval: GuardInterval,
    pub hierarchy: Hierarchy,
    /// DVB-T2 physical layer pipe.
    pub plp_id: Option<u32>,
}

impl TerrestrialParams {
    /// A DVB-T multiplex with every OFDM parameter left automatic.
    pub fn auto(frequency_hz: u32, bandwidth_hz: u32) -> Self {
        Self {
            system: DeliverySystem::DvbT,
            frequency_hz,
            bandwidth_hz,
            code_rate_hp: CodeRate::Auto,
            code_rate_lp: CodeRate::Auto,
            modulation: Modulation::Auto,
            transmission_mode: TransmissionMode::Auto,
            guard_interval: GuardInterval::Auto,
            hierarchy: Hierarchy::Auto,
            plp_id: None,
        }
    }
}

/// Coarse key identifying a physical channel for scan deduplication.
///
/// Combines delivery-system family, LNB tone and voltage, and frequency in
/// 2 MHz buckets. It is never used to tune.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EquivalenceKey(u64);

impl EquivalenceKey {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EquivalenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Ordered list of frontend properties, always ending with `DTV_TUNE`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TuningProperties {
    props: Vec<(PropertyKey, u32)>,
}

impl TuningProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw `(cmd, data)` pairs, e.g. rows loaded from storage.
    /// Unknown commands are skipped.
    pub fn from_raw_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (u32, u32)>,
    {
        let mut props = Self::new();
        for (key, value) in pairs {
            if let Some(key) = PropertyKey::from_raw(key) {
                props.set(key, value);
            }
        }
        props
    }

    /// Set a property. An existing key keeps its position; a new key goes
    /// before the trailing tune command.
    pub fn set(&mut self, key: PropertyKey, value: u32) {
        if let Some(slot) = self.props.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
            return;
        }
        if key == PropertyKey::Tune {
            self.props.push((key, value));
            return;
        }
        match self.props.last() {
            Some((PropertyKey::Tune, _)) => {
                let at = self.props.len() - 1;
                self.props.insert(at, (key, value));
            }
            _ => {
                self.props.push((key, value));
                self.props.push((PropertyKey::Tune, 1));
            }
        }
    }

    pub fn get(&self, key: PropertyKey) -> Option<u32> {
        self.props.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PropertyKey, u32)> + '_ {
        self.props.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    pub fn delivery_system(&self) -> Option<DeliverySystem> {
        self.get(PropertyKey::DeliverySystem)
            .and_then(DeliverySystem::from_raw)
    }

    pub fn family(&self) -> Option<DeliveryFamily> {
        self.delivery_system().map(DeliverySystem::family)
    }

    /// Frequency as programmed: intermediate kHz for satellite, Hz for terrestrial.
    pub fn frequency(&self) -> Option<u32> {
        self.get(PropertyKey::Frequency)
    }

    pub fn voltage(&self) -> Option<Voltage> {
        self.get(PropertyKey::Voltage).and_then(Voltage::from_raw)
    }

    pub fn tone(&self) -> Option<Tone> {
        self.get(PropertyKey::Tone).and_then(Tone::from_raw)
    }

    /// Properties for a satellite transponder behind a universal LNB.
    pub fn satellite(params: &SatelliteParams) -> Self {
        let (frequency, tone) = if params.frequency_khz < SLOF {
            (params.frequency_khz.saturating_sub(LOF1), Tone::Off)
        } else {
            (params.frequency_khz.saturating_sub(LOF2), Tone::On)
        };

        let mut props = Self::new();
        props.set(PropertyKey::DeliverySystem, params.system.raw());
        props.set(PropertyKey::Frequency, frequency);
        props.set(PropertyKey::Voltage, params.polarization.voltage().raw());
        props.set(PropertyKey::Tone, tone.raw());
        props.set(PropertyKey::SymbolRate, params.symbol_rate);
        props.set(PropertyKey::InnerFec, params.fec.raw());
        if params.system == DeliverySystem::DvbS2 {
            props.set(PropertyKey::Pilot, Pilot::Auto.raw());
            if let Some(rolloff) = params.rolloff {
                props.set(PropertyKey::Rolloff, rolloff.raw());
            }
            if let Some(modulation) = params.modulation {
                props.set(PropertyKey::Modulation, modulation.raw());
            }
        }
        props.set(PropertyKey::Inversion, Inversion::Auto.raw());
        props
    }

    /// Properties for a terrestrial multiplex.
    pub fn terrestrial(params: &TerrestrialParams) -> Self {
        let mut props = Self::new();
        props.set(PropertyKey::DeliverySystem, params.system.raw());
        if let Some(plp) = params.plp_id {
            props.set(PropertyKey::StreamId, plp);
        }
        props.set(PropertyKey::Frequency, params.frequency_hz);
        props.set(PropertyKey::BandwidthHz, params.bandwidth_hz);
        props.set(PropertyKey::CodeRateHp, params.code_rate_hp.raw());
        props.set(PropertyKey::CodeRateLp, params.code_rate_lp.raw());
        props.set(PropertyKey::Modulation, params.modulation.raw());
        props.set(PropertyKey::TransmissionMode, params.transmission_mode.raw());
        props.set(PropertyKey::GuardInterval, params.guard_interval.raw());
        props.set(PropertyKey::Hierarchy, params.hierarchy.raw());
        props.set(PropertyKey::Inversion, Inversion::Auto.raw());
        props
    }

    /// Parse a Linux-style tuning string such as
    /// `S2 11023250 H 23000000 2/3 25 8PSK` or
    /// `T 578000000 8MHz 2/3 NONE QAM64 8K 1/32 NONE`.
    /// Anything from a `#` token onwards is a comment.
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        let tokens: Vec<&str> = s
            .split_whitespace()
            .take_while(|t| !t.starts_with('#'))
            .collect();
        let parser = Parser { input: s, tokens };
        let first = parser.tokens.first().copied().ok_or_else(|| ParseError::Empty {
            input: s.to_string(),
        })?;

        let upper = first.to_ascii_uppercase();
        match upper.as_str() {
            "S" | "S1" | "S2" => parser.satellite(&upper),
            "T" | "T1" => parser.terrestrial(DeliverySystem::DvbT),
            "T2" => parser.terrestrial(DeliverySystem::DvbT2),
            _ => Err(ParseError::InvalidType {
                token: first.to_string(),
                input: s.to_string(),
            }),
        }
    }

    /// Short human-readable description, e.g. `11023MHz H` or `578MHz (chan 34)`.
    pub fn describe(&self) -> String {
        match self.family() {
            Some(DeliveryFamily::Satellite) => {
                let pol = match self.voltage() {
                    Some(Voltage::V13) => 'V',
                    _ => 'H',
                };
                format!("{}MHz {}", self.downlink_khz() / 1000, pol)
            }
            Some(DeliveryFamily::Terrestrial) => {
                let mhz = self.frequency().unwrap_or(0) / 1_000_000;
                match uhf_channel(mhz) {
                    Some(chan) => format!("{}MHz (chan {})", mhz, chan),
                    None => format!("{}MHz", mhz),
                }
            }
            None => format!("{}", self.frequency().unwrap_or(0)),
        }
    }

    /// Description in the Linux tuning-file syntax accepted by [`parse`](Self::parse).
    pub fn linuxtv_description(&self) -> String {
        match self.delivery_system() {
            Some(system @ (DeliverySystem::DvbT | DeliverySystem::DvbT2)) => {
                let mut s = String::new();
                if system == DeliverySystem::DvbT2 {
                    // T2 system id is not a frontend property
                    s.push_str(&format!(
                        "T2 {} 0",
                        self.get(PropertyKey::StreamId).unwrap_or(0)
                    ));
                } else {
                    s.push('T');
                }
                s.push_str(&format!(
                    " {} {} {} {} {} {} {} {}",
                    self.frequency().unwrap_or(0),
                    format_bandwidth(self.get(PropertyKey::BandwidthHz).unwrap_or(0)),
                    self.token_of(PropertyKey::CodeRateHp, CodeRate::from_raw),
                    self.token_of(PropertyKey::CodeRateLp, CodeRate::from_raw),
                    self.token_of(PropertyKey::Modulation, Modulation::from_raw),
                    self.token_of(PropertyKey::TransmissionMode, TransmissionMode::from_raw),
                    self.token_of(PropertyKey::GuardInterval, GuardInterval::from_raw),
                    self.token_of(PropertyKey::Hierarchy, Hierarchy::from_raw),
                ));
                s
            }
            Some(system @ (DeliverySystem::DvbS | DeliverySystem::DvbS2)) => {
                let pol = match self.voltage() {
                    Some(Voltage::V13) => "V",
                    _ => "H",
                };
                let mut s = format!(
                    "{} {} {} {} {}",
                    system.token(),
                    self.downlink_khz(),
                    pol,
                    self.get(PropertyKey::SymbolRate).unwrap_or(0),
                    self.token_of(PropertyKey::InnerFec, CodeRate::from_raw),
                );
                if system == DeliverySystem::DvbS2 {
                    if let (Some(rolloff), Some(modulation)) = (
                        self.get(PropertyKey::Rolloff).and_then(Rolloff::from_raw),
                        self.get(PropertyKey::Modulation).and_then(Modulation::from_raw),
                    ) {
                        s.push_str(&format!(" {} {}", rolloff, modulation));
                    }
                }
                s
            }
            None => self.describe(),
        }
    }

    /// Deduplication key; see [`EquivalenceKey`].
    pub fn equivalence(&self) -> EquivalenceKey {
        let (family, divisor) = match self.family() {
            Some(DeliveryFamily::Satellite) => (1u64, 1_000),
            Some(DeliveryFamily::Terrestrial) => (2u64, 1_000_000),
            None => (0u64, 1_000_000),
        };
        let bucket = u64::from(self.frequency().unwrap_or(0) / divisor / 2);
        let tone = u64::from(self.tone().unwrap_or(Tone::Off).raw());
        let voltage = u64::from(self.voltage().unwrap_or(Voltage::Off).raw());
        EquivalenceKey(family << 40 | tone << 36 | voltage << 32 | bucket)
    }

    /// Whether both sets address the same physical channel.
    pub fn is_equivalent(&self, other: &TuningProperties) -> bool {
        self.equivalence() == other.equivalence()
    }

    fn downlink_khz(&self) -> u32 {
        let lof = match self.tone() {
            Some(Tone::On) => LOF2,
            _ => LOF1,
        };
        self.frequency().unwrap_or(0).saturating_add(lof)
    }

    fn token_of<T: fmt::Display>(&self, key: PropertyKey, lookup: fn(u32) -> Option<T>) -> String {
        self.get(key)
            .and_then(lookup)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "AUTO".to_string())
    }
}

impl FromStr for TuningProperties {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TuningProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.linuxtv_description())
    }
}

fn uhf_channel(mhz: u32) -> Option<u32> {
    let offset = mhz.checked_sub(UHF_BASE_MHZ)?;
    if offset % UHF_STEP_MHZ != 0 {
        return None;
    }
    let chan = offset / UHF_STEP_MHZ;
    UHF_CHANNELS.contains(&chan).then_some(chan)
}

fn format_bandwidth(hz: u32) -> String {
    match hz {
        0 => "AUTO".to_string(),
        1_712_000 => "1.712MHz".to_string(),
        _ => format!("{}MHz", hz / 1_000_000),
    }
}

fn parse_bandwidth(token: &str) -> Option<u32> {
    if token.eq_ignore_ascii_case("AUTO") {
        return Some(0);
    }
    let upper = token.to_ascii_uppercase();
    let number = upper.strip_suffix("MHZ").unwrap_or(&upper);
    match number {
        "1.712" => Some(1_712_000),
        _ => number.parse::<u32>().ok().map(|mhz| mhz * 1_000_000),
    }
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<&'a str>,
}

impl Parser<'_> {
    fn require(&self, needed: usize) -> Result<(), ParseError> {
        if self.tokens.len() < needed {
            return Err(ParseError::TooFewParameters {
                needed,
                got: self.tokens.len(),
                input: self.input.to_string(),
            });
        }
        Ok(())
    }

    fn invalid(&self, field: &'static str, index: usize) -> ParseError {
        ParseError::InvalidToken {
            field,
            token: self.tokens[index].to_string(),
            input: self.input.to_string(),
        }
    }

    fn number(&self, field: &'static str, index: usize) -> Result<u32, ParseError> {
        self.tokens[index]
            .parse()
            .map_err(|_| self.invalid(field, index))
    }

    fn value<T>(
        &self,
        field: &'static str,
        index: usize,
        lookup: fn(&str) -> Option<T>,
    ) -> Result<T, ParseError> {
        lookup(self.tokens[index]).ok_or_else(|| self.invalid(field, index))
    }

    fn satellite(&self, system_token: &str) -> Result<TuningProperties, ParseError> {
        self.require(5)?;
        let extended = self.tokens.len() > 5;
        let system = match system_token {
            "S1" => DeliverySystem::DvbS,
            "S2" => DeliverySystem::DvbS2,
            _ if extended => DeliverySystem::DvbS2,
            _ => DeliverySystem::DvbS,
        };

        let (rolloff, modulation) = if extended && system == DeliverySystem::DvbS2 {
            self.require(7)?;
            (
                Some(self.value("roll-off", 5, Rolloff::from_token)?),
                Some(self.value("modulation", 6, Modulation::from_token)?),
            )
        } else {
            (None, None)
        };

        let params = SatelliteParams {
            system,
            frequency_khz: self.number("frequency", 1)?,
            polarization: self.value("polarization", 2, Polarization::from_token)?,
            symbol_rate: self.number("symbol rate", 3)?,
            fec: self.value("code rate", 4, CodeRate::from_token)?,
            rolloff,
            modulation,
        };
        Ok(TuningProperties::satellite(&params))
    }

    fn terrestrial(&self, system: DeliverySystem) -> Result<TuningProperties, ParseError> {
        // T2 carries plp id and T2 system id ahead of the DVB-T fields
        let (base, plp_id) = if system == DeliverySystem::DvbT2 {
            self.require(11)?;
            self.number("T2 system id", 2)?;
            (2, Some(self.number("plp id", 1)?))
        } else {
            self.require(9)?;
            (0, None)
        };

        let params = TerrestrialParams {
            system,
            frequency_hz: self.number("frequency", base + 1)?,
            bandwidth_hz: self.value("bandwidth", base + 2, parse_bandwidth)?,
            code_rate_hp: self.value("code rate", base + 3, CodeRate::from_token)?,
            code_rate_lp: self.value("code rate", base + 4, CodeRate::from_token)?,
            modulation: self.value("modulation", base + 5, Modulation::from_token)?,
            transmission_mode: self.value("transmission mode", base + 6, TransmissionMode::from_token)?,
            guard_interval: self.value("guard interval", base + 7, GuardInterval::from_token)?,
            hierarchy: self.value("hierarchy", base + 8, Hierarchy::from_token)?,
            plp_id,
        };
        Ok(TuningProperties::terrestrial(&params))
    }
}
