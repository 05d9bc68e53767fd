//! Tuning parameter codec for DVB frontends.
//!
//! This crate turns compact tuning strings in the conventional Linux
//! tuning-file syntax into ordered `DTV_*` property lists, describes them
//! back, and derives a coarse equivalence key used to avoid tuning the same
//! physical channel twice during a scan.
//!
//! # Tuning Strings
//!
//! ```text
//! S[1|2] <freq kHz> <H|V|L|R> <symbol rate> <fec> [<roll-off> <modulation>]
//! T  <freq Hz> <bandwidth> <hp> <lp> <modulation> <mode> <guard> <hierarchy>
//! T2 <plp> <system id> <freq Hz> <bandwidth> <hp> <lp> <modulation> <mode> <guard> <hierarchy>
//! ```
//!
//! # Example
//!
//! ```rust
//! use siscan_tuning::{DeliverySystem, TuningProperties};
//!
//! let props = TuningProperties::parse("S2 11023250 H 23000000 2/3 25 8PSK").unwrap();
//! assert_eq!(props.delivery_system(), Some(DeliverySystem::DvbS2));
//! assert_eq!(props.describe(), "11023MHz H");
//! ```

pub mod error;
pub mod properties;
pub mod types;

pub use error::ParseError;
pub use properties::{
    EquivalenceKey, SatelliteParams, TerrestrialParams, TuningProperties, LOF1, LOF2, SLOF,
};
pub use types::{
    CodeRate, DeliveryFamily, DeliverySystem, GuardInterval, Hierarchy, Inversion, Modulation,
    Pilot, Polarization, PropertyKey, Rolloff, Tone, TransmissionMode, Voltage,
};
