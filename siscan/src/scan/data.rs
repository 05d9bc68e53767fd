//! Topology aggregated over a sweep.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace};
use serde::Serialize;
use siscan_tuning::TuningProperties;

use crate::si::{NetworkKind, ServiceInfo, ServiceListEntry, SiCollector};

/// Transport stream identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TransportKey {
    pub onid: u16,
    pub tsid: u16,
}

/// Service identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ServiceKey {
    pub onid: u16,
    pub service_id: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ScanStatus {
    #[default]
    Pending,
    Scanned,
    Failed,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TransportStreamData {
    /// First delivery descriptor (or locked tuning) wins.
    pub tuning: Option<TuningProperties>,
    pub network_id: Option<u16>,
    pub service_ids: BTreeSet<u16>,
    pub status: ScanStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ServiceData {
    pub name: Option<String>,
    pub provider: Option<String>,
    pub service_type: Option<u8>,
    pub free_ca: bool,
    /// Seen directly in an SDT.
    pub scanned: bool,
    pub tsid: Option<u16>,
}

/// One broadcast LCN assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LcnKey {
    pub network_id: u16,
    pub service_id: u16,
    pub region_code: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LcnValue {
    pub lcn: u16,
    pub freesat_id: u16,
}

/// Everything table processors reported, folded into maps.
#[derive(Debug, Clone, Default)]
pub struct ScanData {
    pub networks: BTreeMap<u16, String>,
    pub bouquets: BTreeMap<u16, String>,
    pub transports: BTreeMap<TransportKey, TransportStreamData>,
    pub services: BTreeMap<ServiceKey, ServiceData>,
    pub lcns: BTreeMap<LcnKey, LcnValue>,
    pub regions: BTreeMap<(u16, u16), String>,
    locked_tuning: Option<TuningProperties>,
}

impl ScanData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember what the frontend locked to, for the SDT actual that follows.
    pub fn begin_channel(&mut self, tuning: TuningProperties) {
        self.locked_tuning = Some(tuning);
    }

    pub fn end_channel(&mut self) {
        self.locked_tuning = None;
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
            && self.bouquets.is_empty()
            && self.transports.is_empty()
            && self.services.is_empty()
    }

    pub fn count_transports(&self, status: ScanStatus) -> usize {
        self.transports.values().filter(|t| t.status == status).count()
    }

    /// Pending transports that could be tuned.
    pub fn pending(&self) -> impl Iterator<Item = (TransportKey, &TuningProperties)> + '_ {
        self.transports.iter().filter_map(|(key, ts)| match (&ts.status, &ts.tuning) {
            (ScanStatus::Pending, Some(tuning)) => Some((*key, tuning)),
            _ => None,
        })
    }

    pub fn set_status(&mut self, key: TransportKey, status: ScanStatus) {
        if let Some(ts) = self.transports.get_mut(&key) {
            ts.status = status;
        }
    }

    /// Mark every pending transport whose tuning matches `equivalence`.
    pub fn settle_equivalent(&mut self, tuning: &TuningProperties, status: ScanStatus) -> usize {
        let key = tuning.equivalence();
        let mut settled = 0;
        for ts in self.transports.values_mut() {
            if ts.status != ScanStatus::Pending {
                continue;
            }
            if ts.tuning.as_ref().is_some_and(|t| t.equivalence() == key) {
                ts.status = status;
                settled += 1;
            }
        }
        settled
    }

    /// Every pending transport is settled; false while nothing is known.
    pub fn all_discovered_scanned(&self) -> bool {
        !self.transports.is_empty()
            && self
                .transports
                .values()
                .all(|ts| ts.status != ScanStatus::Pending)
    }

    /// Every service id referenced by a service list or an LCN has been seen
    /// in an SDT; false while nothing is referenced.
    pub fn all_services_found(&self) -> bool {
        let mut referenced: BTreeSet<u16> = self
            .transports
            .values()
            .flat_map(|ts| ts.service_ids.iter().copied())
            .collect();
        referenced.extend(self.lcns.keys().map(|k| k.service_id));
        if referenced.is_empty() {
            return false;
        }
        let observed: BTreeSet<u16> = self
            .services
            .iter()
            .filter(|(_, s)| s.scanned)
            .map(|(k, _)| k.service_id)
            .collect();
        referenced.is_subset(&observed)
    }

    fn transport(&mut self, onid: u16, tsid: u16) -> &mut TransportStreamData {
        self.transports.entry(TransportKey { onid, tsid }).or_default()
    }
}

impl SiCollector for ScanData {
    fn network_name(&mut self, kind: NetworkKind, id: u16, name: &str) {
        let names = match kind {
            NetworkKind::Network => &mut self.networks,
            NetworkKind::Bouquet => &mut self.bouquets,
        };
        names.insert(id, name.to_string());
    }

    fn transport_tuning(&mut self, network_id: u16, onid: u16, tsid: u16, tuning: TuningProperties) {
        let ts = self.transport(onid, tsid);
        ts.network_id.get_or_insert(network_id);
        if ts.tuning.is_none() {
            trace!("ScanData: ts 0x{:04x}/0x{:04x} at {}", onid, tsid, tuning.describe());
            ts.tuning = Some(tuning);
        }
    }

    fn transport_services(&mut self, network_id: u16, onid: u16, tsid: u16, services: &[ServiceListEntry]) {
        let ts = self.transport(onid, tsid);
        ts.network_id.get_or_insert(network_id);
        ts.service_ids.extend(services.iter().map(|s| s.service_id));
        for entry in services {
            let service = self
                .services
                .entry(ServiceKey { onid, service_id: entry.service_id })
                .or_default();
            service.service_type.get_or_insert(entry.service_type);
            service.tsid.get_or_insert(tsid);
        }
    }

    fn service(&mut self, onid: u16, tsid: u16, service_id: u16, info: &ServiceInfo) {
        self.transport(onid, tsid).service_ids.insert(service_id);
        let service = self
            .services
            .entry(ServiceKey { onid, service_id })
            .or_default();
        if info.name.is_some() {
            service.name = info.name.clone();
        }
        if info.provider.is_some() {
            service.provider = info.provider.clone();
        }
        if info.service_type.is_some() {
            service.service_type = info.service_type;
        }
        service.free_ca = info.free_ca;
        service.scanned = true;
        service.tsid = Some(tsid);
    }

    fn logical_channel(&mut self, network_id: u16, service_id: u16, region_code: u16, lcn: u16, freesat_id: u16) {
        self.lcns.insert(
            LcnKey { network_id, service_id, region_code },
            LcnValue { lcn, freesat_id },
        );
    }

    fn region(&mut self, bouquet_id: u16, region_code: u16, name: &str) {
        self.regions.insert((bouquet_id, region_code), name.to_string());
    }

    fn current_transport(&mut self, onid: u16, tsid: u16) {
        let locked = self.locked_tuning.clone();
        let ts = self.transport(onid, tsid);
        if ts.tuning.is_none() {
            ts.tuning = locked;
        }
        if ts.status != ScanStatus::Scanned {
            debug!("ScanData: on ts 0x{:04x}/0x{:04x}", onid, tsid);
        }
        ts.status = ScanStatus::Scanned;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siscan_tuning::TerrestrialParams;

    fn tuning(mhz: u32) -> TuningProperties {
        TuningProperties::terrestrial(&TerrestrialParams::auto(mhz * 1_000_000, 8_000_000))
    }

    #[test]
    fn test_tuning_first_write_wins() {
        let mut data = ScanData::new();
        data.transport_tuning(0x3001, 0x233a, 0x1004, tuning(578));
        data.transport_tuning(0x3001, 0x233a, 0x1004, tuning(490));
        let ts = &data.transports[&TransportKey { onid: 0x233a, tsid: 0x1004 }];
        assert_eq!(ts.tuning.as_ref().unwrap().frequency(), Some(578_000_000));
        assert_eq!(ts.network_id, Some(0x3001));
    }

    #[test]
    fn test_names_overwrite() {
        let mut data = ScanData::new();
        data.network_name(NetworkKind::Network, 1, "Old");
        data.network_name(NetworkKind::Network, 1, "New");
        data.network_name(NetworkKind::Bouquet, 1, "Bouquet");
        assert_eq!(data.networks[&1], "New");
        assert_eq!(data.bouquets[&1], "Bouquet");
    }

    #[test]
    fn test_current_transport_uses_locked_tuning() {
        let mut data = ScanData::new();
        data.begin_channel(tuning(578));
        data.current_transport(0x233a, 0x1004);
        let ts = &data.transports[&TransportKey { onid: 0x233a, tsid: 0x1004 }];
        assert_eq!(ts.status, ScanStatus::Scanned);
        assert_eq!(ts.tuning.as_ref().unwrap().frequency(), Some(578_000_000));
    }

    #[test]
    fn test_all_services_found() {
        let mut data = ScanData::new();
        assert!(!data.all_services_found());
        data.transport_services(
            1,
            2,
            3,
            &[ServiceListEntry { service_id: 10, service_type: 1 }],
        );
        data.logical_channel(1, 11, 0, 2, 0);
        assert!(!data.all_services_found());
        data.service(2, 3, 10, &ServiceInfo::default());
        assert!(!data.all_services_found());
        data.service(2, 4, 11, &ServiceInfo::default());
        assert!(data.all_services_found());
    }

    #[test]
    fn test_settle_equivalent() {
        let mut data = ScanData::new();
        data.transport_tuning(1, 2, 3, tuning(578));
        data.transport_tuning(1, 2, 4, tuning(490));
        assert_eq!(data.settle_equivalent(&tuning(578), ScanStatus::Failed), 1);
        assert_eq!(data.count_transports(ScanStatus::Failed), 1);
        assert_eq!(data.pending().count(), 1);
        assert!(!data.all_discovered_scanned());
        data.set_status(TransportKey { onid: 2, tsid: 4 }, ScanStatus::Scanned);
        assert!(data.all_discovered_scanned());
    }
}
