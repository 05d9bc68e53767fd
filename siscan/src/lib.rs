//! DVB service information scanning.
//!
//! [`si`] reassembles NIT/BAT/SDT sections into topology records, [`scan`]
//! drives single-channel and multi-transport sweeps over an abstract
//! [`Receiver`](scan::Receiver), [`database`] persists what a sweep found and
//! [`lcn`] turns stored channel-number assignments into client rows.

pub mod config;
pub mod database;
pub mod error;
pub mod lcn;
pub mod logging;
pub mod scan;
pub mod si;

pub use error::{FilterError, ScanError};
