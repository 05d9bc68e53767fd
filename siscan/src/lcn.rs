//! Logical channel number resolution.
//!
//! Runs after a sweep has been committed. Broadcast LCN assignments are
//! keyed by network (or bouquet), service id and region; a client wants one
//! service per number for its own region. For every number the best row is
//! picked by region (exact, then the universal sentinel, then the default
//! sentinel) and the service's original network id is looked up the way the
//! platform requires.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::database::{ClientLcn, Database, DatabaseError, NetworkLcnRow, Result};
use crate::scan::OnidLookup;

/// Region codes tried when a number has no row for the requested region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LcnFallbacks {
    /// Region code meaning "every region".
    pub universal_region: u16,
    /// Region code used for assignments that are not regional at all.
    pub default_region: u16,
}

impl Default for LcnFallbacks {
    fn default() -> Self {
        Self {
            universal_region: 0xffff,
            default_region: 0,
        }
    }
}

/// Resolve every LCN of `network_id` for `region_code`.
pub fn resolve(
    db: &Database,
    source: &str,
    network_id: u16,
    region_code: u16,
    lookup: OnidLookup,
    fallbacks: &LcnFallbacks,
) -> Result<Vec<ClientLcn>> {
    let mut by_lcn: BTreeMap<u16, Vec<NetworkLcnRow>> = BTreeMap::new();
    for row in db.network_lcns(source)? {
        if row.network_id == network_id {
            by_lcn.entry(row.lcn).or_default().push(row);
        }
    }
    if by_lcn.is_empty() {
        warn!("LCN: no assignments for network 0x{:04x} in {}", network_id, source);
    }

    let mut resolved = Vec::with_capacity(by_lcn.len());
    for (lcn, rows) in by_lcn {
        let preferred = [
            region_code,
            fallbacks.universal_region,
            fallbacks.default_region,
        ];
        let Some(row) = preferred
            .iter()
            .find_map(|region| rows.iter().find(|r| r.region_code == *region))
        else {
            debug!("LCN: no mapping for {} in region {}", lcn, region_code);
            continue;
        };

        let onid = match lookup {
            OnidLookup::ByServiceId => db.onid_by_service_id(source, row.service_id)?,
            OnidLookup::ByNetworkAndService => {
                db.onid_by_network_and_service(source, network_id, row.service_id)?
            }
        };
        let Some(onid) = onid else {
            warn!(
                "LCN: can't find original network id of service {} (lcn {})",
                row.service_id, lcn
            );
            continue;
        };

        resolved.push(ClientLcn {
            lcn,
            onid,
            service_id: row.service_id,
            region_code,
            freesat_id: row.freesat_id,
        });
    }
    Ok(resolved)
}

/// Resolve by names and store the result as the source's client LCNs.
///
/// An unknown network is an error. An unknown or absent region falls back
/// to the default region.
pub fn resolve_and_store(
    db: &mut Database,
    source: &str,
    network_name: &str,
    region_name: Option<&str>,
    lookup: OnidLookup,
    fallbacks: &LcnFallbacks,
) -> Result<Vec<ClientLcn>> {
    let network_id = db
        .network_id_by_name(source, network_name)?
        .ok_or_else(|| DatabaseError::NotFound(format!("network '{}' in {}", network_name, source)))?;

    let region_code = match region_name {
        Some(name) => match db.region_code_by_name(source, network_id, name)? {
            Some(code) => code,
            None => {
                warn!("LCN: unknown region '{}', using default", name);
                fallbacks.default_region
            }
        },
        None => fallbacks.default_region,
    };

    let rows = resolve(db, source, network_id, region_code, lookup, fallbacks)?;
    db.replace_client_lcns(source, &rows)?;
    info!(
        "LCN: {} channels for {} region {} in {}",
        rows.len(),
        network_name,
        region_code,
        source
    );
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{InsertBatch, NetworkNameRow, RegionRow, ServiceIdRow, TransportServiceRow};

    fn lcn(network_id: u16, service_id: u16, region_code: u16, lcn: u16) -> NetworkLcnRow {
        NetworkLcnRow {
            network_id,
            service_id,
            region_code,
            lcn,
            freesat_id: 0,
        }
    }

    fn service(onid: u16, service_id: u16) -> ServiceIdRow {
        ServiceIdRow {
            onid,
            tsid: None,
            service_id,
            service_type: Some(1),
            free_ca: false,
        }
    }

    #[test]
    fn test_falls_back_to_universal_region() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert("freesat", &InsertBatch::NetworkLcns(vec![lcn(9018, 101, 65535, 101)]))
            .unwrap();
        db.insert("freesat", &InsertBatch::ServiceIds(vec![service(9018, 101)]))
            .unwrap();

        let rows = resolve(
            &db,
            "freesat",
            9018,
            12,
            OnidLookup::ByServiceId,
            &LcnFallbacks::default(),
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!((rows[0].onid, rows[0].service_id), (9018, 101));
        assert_eq!(rows[0].region_code, 12);
    }

    #[test]
    fn test_exact_region_beats_fallbacks() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert(
            "freesat",
            &InsertBatch::NetworkLcns(vec![
                lcn(0x100c, 6301, 65535, 101),
                lcn(0x100c, 6351, 12, 101),
                lcn(0x100c, 6940, 0, 106),
                lcn(0x100c, 8500, 3, 700),
            ]),
        )
        .unwrap();
        db.insert(
            "freesat",
            &InsertBatch::ServiceIds(vec![service(2, 6301), service(2, 6351), service(2, 6940)]),
        )
        .unwrap();

        let rows = resolve(
            &db,
            "freesat",
            0x100c,
            12,
            OnidLookup::ByServiceId,
            &LcnFallbacks::default(),
        )
        .unwrap();
        let pairs: Vec<_> = rows.iter().map(|r| (r.lcn, r.service_id)).collect();
        assert_eq!(pairs, vec![(101, 6351), (106, 6940)]);
    }

    #[test]
    fn test_configurable_sentinels() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert("s", &InsertBatch::NetworkLcns(vec![lcn(1, 10, 7, 1)])).unwrap();
        db.insert("s", &InsertBatch::ServiceIds(vec![service(2, 10)])).unwrap();
        let fallbacks = LcnFallbacks {
            universal_region: 7,
            default_region: 0,
        };
        let rows = resolve(&db, "s", 1, 12, OnidLookup::ByServiceId, &fallbacks).unwrap();
        assert_eq!(rows.len(), 1);
        let rows = resolve(&db, "s", 1, 12, OnidLookup::ByServiceId, &LcnFallbacks::default()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_resolve_and_store_by_names() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert(
            "dvbt",
            &InsertBatch::NetworkNames(vec![NetworkNameRow {
                network_id: 12339,
                name: "London".to_string(),
            }]),
        )
        .unwrap();
        db.insert("dvbt", &InsertBatch::NetworkLcns(vec![lcn(12339, 4171, 0, 1)]))
            .unwrap();
        db.insert(
            "dvbt",
            &InsertBatch::TransportServices(vec![TransportServiceRow {
                onid: 0x233a,
                network_id: 12339,
                tsid: 0x1004,
                service_id: 4171,
            }]),
        )
        .unwrap();
        db.insert(
            "dvbt",
            &InsertBatch::Regions(vec![RegionRow {
                bouquet_id: 12339,
                region_code: 5,
                name: "Kent".to_string(),
            }]),
        )
        .unwrap();

        let rows = resolve_and_store(
            &mut db,
            "dvbt",
            "London",
            Some("Nowhere"),
            OnidLookup::ByNetworkAndService,
            &LcnFallbacks::default(),
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].onid, 0x233a);
        assert_eq!(db.client_lcns("dvbt").unwrap(), rows);

        let err = resolve_and_store(
            &mut db,
            "dvbt",
            "Paris",
            None,
            OnidLookup::ByNetworkAndService,
            &LcnFallbacks::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound(_)));
    }
}
