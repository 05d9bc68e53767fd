//! Static tuning candidate sources.

use std::ops::RangeInclusive;

use log::warn;
use siscan_tuning::{ParseError, TerrestrialParams, TuningProperties};

/// Candidates for the sweep driver when no discovered transport is pending.
pub trait TuningIterator: Iterator<Item = TuningProperties> + Send {
    /// Rewind to the first candidate.
    fn reset(&mut self);
}

const UHF_STEP_HZ: u32 = 8_000_000;
const UHF_BASE_HZ: u32 = 306_000_000;

/// UK UHF sweep: channel * 8 MHz + 306 MHz.
#[derive(Debug, Clone)]
pub struct DvbtSweep {
    channels: RangeInclusive<u32>,
    next: u32,
}

impl DvbtSweep {
    pub const DEFAULT_CHANNELS: RangeInclusive<u32> = 21..=68;

    pub fn new(channels: RangeInclusive<u32>) -> Self {
        let next = *channels.start();
        Self { channels, next }
    }

    pub fn frequency_of(channel: u32) -> u32 {
        channel * UHF_STEP_HZ + UHF_BASE_HZ
    }
}

impl Default for DvbtSweep {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CHANNELS)
    }
}

impl Iterator for DvbtSweep {
    type Item = TuningProperties;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.channels.contains(&self.next) {
            return None;
        }
        let frequency = Self::frequency_of(self.next);
        self.next += 1;
        Some(TuningProperties::terrestrial(&TerrestrialParams::auto(
            frequency,
            UHF_STEP_HZ,
        )))
    }
}

impl TuningIterator for DvbtSweep {
    fn reset(&mut self) {
        self.next = *self.channels.start();
    }
}

/// Freesat home transponders.
pub const FREESAT_PRESETS: &[&str] = &[
    "S2 11023250 H 23000000 2/3 25 8PSK",
    "S2 10935500 V 23000000 8/9 25 QPSK",
    "S2 10847000 V 23000000 2/3 25 8PSK",
    "S1 11307000 V 27500000 2/3 35 QPSK",
    "S1 11344500 H 27500000 2/3 35 QPSK",
    "S1 11223670 V 27500000 2/3 35 QPSK",
    "S1 11222170 H 27500000 2/3 35 QPSK",
    "S1 11426330 V 27500000 2/3 35 QPSK",
    "S1 11343000 V 27500000 2/3 35 QPSK",
];

/// A fixed list of tuning candidates.
#[derive(Debug, Clone, Default)]
pub struct PresetList {
    presets: Vec<TuningProperties>,
    position: usize,
}

impl PresetList {
    pub fn new(presets: Vec<TuningProperties>) -> Self {
        Self {
            presets,
            position: 0,
        }
    }

    pub fn from_strings<S: AsRef<str>>(lines: &[S]) -> Result<Self, ParseError> {
        let presets = lines
            .iter()
            .map(|line| TuningProperties::parse(line.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(presets))
    }

    pub fn freesat() -> Self {
        // The built-in list is known good; skip anything that fails to parse.
        let presets = FREESAT_PRESETS
            .iter()
            .filter_map(|line| match TuningProperties::parse(line) {
                Ok(props) => Some(props),
                Err(e) => {
                    warn!("Presets: {}", e);
                    None
                }
            })
            .collect();
        Self::new(presets)
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

impl Iterator for PresetList {
    type Item = TuningProperties;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.presets.get(self.position).cloned();
        if item.is_some() {
            self.position += 1;
        }
        item
    }
}

impl TuningIterator for PresetList {
    fn reset(&mut self) {
        self.position = 0;
    }
}
