//! Topology inserts and lookups.

use std::collections::BTreeSet;

use rusqlite::{params, OptionalExtension};
use siscan_tuning::TuningProperties;

use super::{ClientLcn, Database, InsertBatch, NetworkLcnRow, Result};

impl Database {
    /// Run one named insert operation in a transaction. Returns rows written.
    pub fn insert(&mut self, source: &str, batch: &InsertBatch) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut count = 0;
        match batch {
            InsertBatch::Source => {
                count += tx.execute(
                    "INSERT OR IGNORE INTO sources (name) VALUES (?1)",
                    params![source],
                )?;
            }
            InsertBatch::NetworkNames(rows) => {
                let mut stmt = tx.prepare(
                    "INSERT INTO network_info (source, network_id, name) VALUES (?1, ?2, ?3)",
                )?;
                for row in rows {
                    count += stmt.execute(params![source, row.network_id, row.name])?;
                }
            }
            InsertBatch::Tuning(rows) => {
                // a transport's property list is replaced as a whole
                let transports: BTreeSet<(u16, u16)> =
                    rows.iter().map(|r| (r.onid, r.tsid)).collect();
                let mut delete = tx.prepare(
                    "DELETE FROM tuning WHERE source = ?1 AND onid = ?2 AND tsid = ?3",
                )?;
                for (onid, tsid) in transports {
                    delete.execute(params![source, onid, tsid])?;
                }
                let mut stmt = tx.prepare(
                    "INSERT INTO tuning (source, onid, tsid, position, tuning_key, tuning_val)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for row in rows {
                    count += stmt.execute(params![
                        source,
                        row.onid,
                        row.tsid,
                        row.position,
                        row.key,
                        row.value
                    ])?;
                }
            }
            InsertBatch::TransportServices(rows) => {
                let mut stmt = tx.prepare(
                    "INSERT INTO transport_services (source, onid, network_id, tsid, service_id)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for row in rows {
                    count += stmt.execute(params![
                        source,
                        row.onid,
                        row.network_id,
                        row.tsid,
                        row.service_id
                    ])?;
                }
            }
            InsertBatch::ServiceIds(rows) => {
                let mut stmt = tx.prepare(
                    "INSERT INTO service_ids (source, onid, tsid, service_id, service_type, free_ca_mode)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for row in rows {
                    count += stmt.execute(params![
                        source,
                        row.onid,
                        row.tsid,
                        row.service_id,
                        row.service_type,
                        row.free_ca
                    ])?;
                }
            }
            InsertBatch::ServiceNames(rows) => {
                let mut stmt = tx.prepare(
                    "INSERT INTO service_names (source, onid, service_id, name) VALUES (?1, ?2, ?3, ?4)",
                )?;
                for row in rows {
                    count += stmt.execute(params![source, row.onid, row.service_id, row.name])?;
                }
            }
            InsertBatch::ProviderNames(names) => {
                let mut stmt = tx.prepare(
                    "INSERT INTO provider_names (source, provider_name) VALUES (?1, ?2)",
                )?;
                for name in names {
                    count += stmt.execute(params![source, name])?;
                }
            }
            InsertBatch::ServiceProviders(rows) => {
                let mut stmt = tx.prepare(
                    "INSERT INTO service_providers (source, onid, service_id, provider_id)
                     SELECT ?1, ?2, ?3, provider_id FROM provider_names
                     WHERE source = ?1 AND provider_name = ?4",
                )?;
                for row in rows {
                    count += stmt.execute(params![
                        source,
                        row.onid,
                        row.service_id,
                        row.provider_name
                    ])?;
                }
            }
            InsertBatch::Regions(rows) => {
                let mut stmt = tx.prepare(
                    "INSERT INTO regions (source, bouquet_id, region_code, region_name)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for row in rows {
                    count += stmt.execute(params![source, row.bouquet_id, row.region_code, row.name])?;
                }
            }
            InsertBatch::NetworkLcns(rows) => {
                let mut stmt = tx.prepare(
                    "INSERT INTO network_lcns (source, network_id, service_id, region_code, lcn, freesat_id)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for row in rows {
                    count += stmt.execute(params![
                        source,
                        row.network_id,
                        row.service_id,
                        row.region_code,
                        row.lcn,
                        row.freesat_id
                    ])?;
                }
            }
        }
        tx.commit()?;
        Ok(count)
    }

    /// Network or bouquet id by name.
    pub fn network_id_by_name(&self, source: &str, name: &str) -> Result<Option<u16>> {
        let id = self
            .conn
            .query_row(
                "SELECT network_id FROM network_info WHERE source = ?1 AND name = ?2
                 ORDER BY network_id LIMIT 1",
                params![source, name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    pub fn region_code_by_name(&self, source: &str, bouquet_id: u16, name: &str) -> Result<Option<u16>> {
        let code = self
            .conn
            .query_row(
                "SELECT region_code FROM regions
                 WHERE source = ?1 AND bouquet_id = ?2 AND region_name = ?3
                 ORDER BY region_code LIMIT 1",
                params![source, bouquet_id, name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(code)
    }

    /// Original network id of a service, for platforms with unique service ids.
    pub fn onid_by_service_id(&self, source: &str, service_id: u16) -> Result<Option<u16>> {
        let onid = self
            .conn
            .query_row(
                "SELECT onid FROM service_ids WHERE source = ?1 AND service_id = ?2
                 ORDER BY onid LIMIT 1",
                params![source, service_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(onid)
    }

    /// Original network id of a service through the network's service lists.
    pub fn onid_by_network_and_service(
        &self,
        source: &str,
        network_id: u16,
        service_id: u16,
    ) -> Result<Option<u16>> {
        let onid = self
            .conn
            .query_row(
                "SELECT onid FROM transport_services
                 WHERE source = ?1 AND network_id = ?2 AND service_id = ?3
                 ORDER BY onid LIMIT 1",
                params![source, network_id, service_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(onid)
    }

    /// All broadcast LCN assignments of a source.
    pub fn network_lcns(&self, source: &str) -> Result<Vec<NetworkLcnRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT network_id, service_id, region_code, lcn, freesat_id FROM network_lcns
             WHERE source = ?1 ORDER BY network_id, lcn, region_code, service_id",
        )?;
        let rows = stmt
            .query_map([source], |row| {
                Ok(NetworkLcnRow {
                    network_id: row.get(0)?,
                    service_id: row.get(1)?,
                    region_code: row.get(2)?,
                    lcn: row.get(3)?,
                    freesat_id: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn network_ids(&self, source: &str) -> Result<Vec<u16>> {
        let mut stmt = self
            .conn
            .prepare("SELECT network_id FROM network_info WHERE source = ?1 ORDER BY network_id")?;
        let ids = stmt
            .query_map([source], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    pub fn source_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM sources ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Stored tuning of a transport.
    pub fn tuning(&self, source: &str, onid: u16, tsid: u16) -> Result<Option<TuningProperties>> {
        let mut stmt = self.conn.prepare(
            "SELECT tuning_key, tuning_val FROM tuning
             WHERE source = ?1 AND onid = ?2 AND tsid = ?3 ORDER BY position",
        )?;
        let pairs = stmt
            .query_map(params![source, onid, tsid], |row| {
                Ok((row.get::<_, u32>(0)?, row.get::<_, u32>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if pairs.is_empty() {
            return Ok(None);
        }
        Ok(Some(TuningProperties::from_raw_pairs(pairs)))
    }

    /// Replace the resolved channel list of a source.
    pub fn replace_client_lcns(&mut self, source: &str, rows: &[ClientLcn]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM client_lcns WHERE source = ?1", params![source])?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO client_lcns (source, lcn, onid, service_id, region_code, freesat_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for row in rows {
                count += stmt.execute(params![
                    source,
                    row.lcn,
                    row.onid,
                    row.service_id,
                    row.region_code,
                    row.freesat_id
                ])?;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    pub fn client_lcns(&self, source: &str) -> Result<Vec<ClientLcn>> {
        let mut stmt = self.conn.prepare(
            "SELECT lcn, onid, service_id, region_code, freesat_id FROM client_lcns
             WHERE source = ?1 ORDER BY lcn",
        )?;
        let rows = stmt
            .query_map([source], |row| {
                Ok(ClientLcn {
                    lcn: row.get(0)?,
                    onid: row.get(1)?,
                    service_id: row.get(2)?,
                    region_code: row.get(3)?,
                    freesat_id: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
