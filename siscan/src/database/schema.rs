//! Database schema definitions.

/// SQL schema for the topology store. Every table is scoped by `source`.
pub const SCHEMA_SQL: &str = r#"
-- Source namespaces (one per platform or dish)
CREATE TABLE IF NOT EXISTS sources (
    name TEXT PRIMARY KEY NOT NULL,
    created_at INTEGER DEFAULT (strftime('%s', 'now'))
);

-- Network and bouquet names
CREATE TABLE IF NOT EXISTS network_info (
    source TEXT NOT NULL,
    network_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    UNIQUE(source, network_id) ON CONFLICT REPLACE
);

-- Frontend properties per transport, in tuning order
CREATE TABLE IF NOT EXISTS tuning (
    source TEXT NOT NULL,
    onid INTEGER NOT NULL,
    tsid INTEGER NOT NULL,
    position INTEGER NOT NULL,
    tuning_key INTEGER NOT NULL,       -- DTV_* property code
    tuning_val INTEGER NOT NULL,
    UNIQUE(source, onid, tsid, tuning_key) ON CONFLICT REPLACE
);

-- Services listed for a transport by a network or bouquet table
CREATE TABLE IF NOT EXISTS transport_services (
    source TEXT NOT NULL,
    onid INTEGER NOT NULL,
    network_id INTEGER NOT NULL,
    tsid INTEGER NOT NULL,
    service_id INTEGER NOT NULL,
    UNIQUE(source, onid, network_id, tsid, service_id) ON CONFLICT IGNORE
);

-- Services and where they are carried
CREATE TABLE IF NOT EXISTS service_ids (
    source TEXT NOT NULL,
    onid INTEGER NOT NULL,
    tsid INTEGER,
    service_id INTEGER NOT NULL,
    service_type INTEGER,
    free_ca_mode INTEGER NOT NULL DEFAULT 0,
    UNIQUE(source, onid, service_id) ON CONFLICT REPLACE
);

CREATE TABLE IF NOT EXISTS service_names (
    source TEXT NOT NULL,
    onid INTEGER NOT NULL,
    service_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    UNIQUE(source, onid, service_id) ON CONFLICT REPLACE
);

CREATE TABLE IF NOT EXISTS provider_names (
    provider_id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT NOT NULL,
    provider_name TEXT NOT NULL,
    UNIQUE(source, provider_name) ON CONFLICT IGNORE
);

CREATE TABLE IF NOT EXISTS service_providers (
    source TEXT NOT NULL,
    onid INTEGER NOT NULL,
    service_id INTEGER NOT NULL,
    provider_id INTEGER NOT NULL,
    UNIQUE(source, onid, service_id) ON CONFLICT REPLACE,
    FOREIGN KEY(provider_id) REFERENCES provider_names(provider_id)
);

-- Bouquet region names
CREATE TABLE IF NOT EXISTS regions (
    source TEXT NOT NULL,
    bouquet_id INTEGER NOT NULL,
    region_code INTEGER NOT NULL,
    region_name TEXT NOT NULL,
    UNIQUE(source, bouquet_id, region_code) ON CONFLICT REPLACE
);

-- LCN assignments as broadcast
CREATE TABLE IF NOT EXISTS network_lcns (
    source TEXT NOT NULL,
    network_id INTEGER NOT NULL,
    service_id INTEGER NOT NULL,
    region_code INTEGER NOT NULL,
    lcn INTEGER NOT NULL,
    freesat_id INTEGER NOT NULL DEFAULT 0,
    UNIQUE(source, network_id, service_id, region_code) ON CONFLICT REPLACE
);

-- Resolved channel list
CREATE TABLE IF NOT EXISTS client_lcns (
    source TEXT NOT NULL,
    lcn INTEGER NOT NULL,
    onid INTEGER NOT NULL,
    service_id INTEGER NOT NULL,
    region_code INTEGER NOT NULL,
    freesat_id INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_network_info_name ON network_info(source, name);
CREATE INDEX IF NOT EXISTS idx_service_ids_sid ON service_ids(source, service_id);
CREATE INDEX IF NOT EXISTS idx_transport_services_sid ON transport_services(source, network_id, service_id);
CREATE INDEX IF NOT EXISTS idx_network_lcns_network ON network_lcns(source, network_id);
CREATE INDEX IF NOT EXISTS idx_client_lcns_source ON client_lcns(source, lcn);
"#;
