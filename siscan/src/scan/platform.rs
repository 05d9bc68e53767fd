//! Per-platform scanning profiles.
//!
//! A profile fixes which tables are filtered on each channel, which private
//! descriptors are understood, when a sweep has harvested enough, and how
//! logical channel numbers are tied back to an original network id.

use std::fmt;
use std::sync::Arc;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::iterator::{DvbtSweep, PresetList, TuningIterator};
use crate::si::{
    descriptor_tag, parse_freesat_channels, parse_freesat_regions, parse_logical_channels, pid,
    table_id, DescriptorTable,
};

/// Broadcast platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    /// Plain EN 300 468 network.
    #[default]
    Standard,
    /// UK digital terrestrial.
    Freeview,
    /// UK free-to-air satellite.
    Freesat,
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlatformKind::Standard => "standard",
            PlatformKind::Freeview => "freeview",
            PlatformKind::Freesat => "freesat",
        };
        f.write_str(name)
    }
}

/// Which table a filter feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableRole {
    Network,
    ServicesActual,
    ServicesOther,
    Bouquet,
}

/// One section filter opened on every tuned channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSpec {
    pub role: TableRole,
    pub pid: u16,
    pub table_id: u8,
    pub table_id_mask: u8,
}

impl FilterSpec {
    const fn exact(role: TableRole, pid: u16, table_id: u8) -> Self {
        Self {
            role,
            pid,
            table_id,
            table_id_mask: 0xff,
        }
    }
}

/// Conditions under which a sweep may stop early. Every selected condition
/// must hold; with none selected the sweep runs until candidates run out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestPolicy {
    /// At least two channels scanned and one table completed.
    pub at_least_two: bool,
    /// No discovered transport still pending.
    pub all_discovered: bool,
    /// Every referenced service seen in an SDT.
    pub all_services: bool,
}

impl HarvestPolicy {
    pub fn is_empty(&self) -> bool {
        !(self.at_least_two || self.all_discovered || self.all_services)
    }
}

/// How the LCN resolver finds the original network id of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnidLookup {
    /// Service ids are unique across the platform.
    ByServiceId,
    /// Join through the transport/service relation of the network.
    ByNetworkAndService,
}

/// Scanning profile for one platform.
#[derive(Debug, Clone)]
pub struct Platform {
    pub kind: PlatformKind,
    pub filters: Vec<FilterSpec>,
    pub policy: HarvestPolicy,
    pub lcn_lookup: OnidLookup,
    pub descriptors: Arc<DescriptorTable>,
}

impl Platform {
    pub fn new(kind: PlatformKind) -> Self {
        match kind {
            PlatformKind::Standard => Self::standard(),
            PlatformKind::Freeview => Self::freeview(),
            PlatformKind::Freesat => Self::freesat(),
        }
    }

    fn standard_filters() -> Vec<FilterSpec> {
        vec![
            FilterSpec::exact(TableRole::Network, pid::NIT, table_id::NIT_ACTUAL),
            FilterSpec::exact(TableRole::ServicesActual, pid::SDT_BAT, table_id::SDT_ACTUAL),
            FilterSpec::exact(TableRole::ServicesOther, pid::SDT_BAT, table_id::SDT_OTHER),
        ]
    }

    pub fn standard() -> Self {
        Self {
            kind: PlatformKind::Standard,
            filters: Self::standard_filters(),
            policy: HarvestPolicy {
                all_discovered: true,
                ..HarvestPolicy::default()
            },
            lcn_lookup: OnidLookup::ByNetworkAndService,
            descriptors: Arc::new(DescriptorTable::standard()),
        }
    }

    /// T2 multiplexes are missing from the DVB-T NIT, so the sweep also
    /// waits for every referenced service.
    pub fn freeview() -> Self {
        Self {
            kind: PlatformKind::Freeview,
            filters: Self::standard_filters(),
            policy: HarvestPolicy {
                all_discovered: true,
                all_services: true,
                ..HarvestPolicy::default()
            },
            lcn_lookup: OnidLookup::ByNetworkAndService,
            descriptors: Arc::new(
                DescriptorTable::standard()
                    .with(descriptor_tag::FREEVIEW_LCN, parse_logical_channels),
            ),
        }
    }

    /// Each transport only describes the others, never itself.
    pub fn freesat() -> Self {
        Self {
            kind: PlatformKind::Freesat,
            filters: vec![
                FilterSpec::exact(TableRole::Network, pid::FREESAT_NIT, table_id::NIT_OTHER),
                FilterSpec::exact(TableRole::ServicesOther, pid::FREESAT_SDT_BAT, table_id::SDT_OTHER),
                FilterSpec::exact(TableRole::Bouquet, pid::FREESAT_SDT_BAT, table_id::BAT),
            ],
            policy: HarvestPolicy {
                at_least_two: true,
                ..HarvestPolicy::default()
            },
            lcn_lookup: OnidLookup::ByServiceId,
            descriptors: Arc::new(
                DescriptorTable::standard()
                    .with(descriptor_tag::FREESAT_LCN, parse_freesat_channels)
                    .with(descriptor_tag::FREESAT_REGION, parse_freesat_regions),
            ),
        }
    }

    pub fn filter(&self, role: TableRole) -> Option<&FilterSpec> {
        self.filters.iter().find(|f| f.role == role)
    }

    /// Static candidates for this platform. `channels` bounds the DVB-T sweep.
    pub fn iterator(&self, channels: Option<(u32, u32)>) -> Box<dyn TuningIterator> {
        match self.kind {
            PlatformKind::Freesat => Box::new(PresetList::freesat()),
            PlatformKind::Standard | PlatformKind::Freeview => match channels {
                Some((first, last)) => Box::new(DvbtSweep::new(first..=last)),
                None => Box::new(DvbtSweep::default()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freesat_has_no_sdt_actual() {
        let platform = Platform::freesat();
        assert!(platform.filter(TableRole::ServicesActual).is_none());
        let bat = platform.filter(TableRole::Bouquet).unwrap();
        assert_eq!((bat.pid, bat.table_id), (3841, 0x4a));
        assert!(platform.descriptors.handles(0xd3));
        assert!(!platform.descriptors.handles(0x83));
        assert!(platform.policy.at_least_two);
    }

    #[test]
    fn test_freeview_extends_standard() {
        let standard = Platform::standard();
        let freeview = Platform::freeview();
        assert_eq!(standard.filters, freeview.filters);
        assert!(freeview.descriptors.handles(0x83));
        assert!(!standard.descriptors.handles(0x83));
        assert!(freeview.policy.all_services && freeview.policy.all_discovered);
    }

    #[test]
    fn test_platform_kind_from_config() {
        #[derive(Deserialize)]
        struct Wrapper {
            platform: PlatformKind,
        }
        let w: Wrapper = toml::from_str("platform = \"freesat\"").unwrap();
        assert_eq!(w.platform, PlatformKind::Freesat);
        assert_eq!(w.platform.to_string(), "freesat");
    }
}
