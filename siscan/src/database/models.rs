//! Database model definitions.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkNameRow {
    pub network_id: u16,
    pub name: String,
}

/// One frontend property of a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TuningRow {
    pub onid: u16,
    pub tsid: u16,
    pub position: u32,
    pub key: u32,
    pub value: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportServiceRow {
    pub onid: u16,
    pub network_id: u16,
    pub tsid: u16,
    pub service_id: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceIdRow {
    pub onid: u16,
    pub tsid: Option<u16>,
    pub service_id: u16,
    pub service_type: Option<u8>,
    pub free_ca: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceNameRow {
    pub onid: u16,
    pub service_id: u16,
    pub name: String,
}

/// Links a service to a row of `provider_names` by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceProviderRow {
    pub onid: u16,
    pub service_id: u16,
    pub provider_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionRow {
    pub bouquet_id: u16,
    pub region_code: u16,
    pub name: String,
}

/// LCN assignment as broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NetworkLcnRow {
    pub network_id: u16,
    pub service_id: u16,
    pub region_code: u16,
    pub lcn: u16,
    pub freesat_id: u16,
}

/// Resolved channel: what a client puts on its channel list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClientLcn {
    pub lcn: u16,
    pub onid: u16,
    pub service_id: u16,
    pub region_code: u16,
    pub freesat_id: u16,
}

/// Rows for one named insert operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertBatch {
    /// Registers the source namespace itself.
    Source,
    NetworkNames(Vec<NetworkNameRow>),
    Tuning(Vec<TuningRow>),
    TransportServices(Vec<TransportServiceRow>),
    ServiceIds(Vec<ServiceIdRow>),
    ServiceNames(Vec<ServiceNameRow>),
    ProviderNames(Vec<String>),
    ServiceProviders(Vec<ServiceProviderRow>),
    Regions(Vec<RegionRow>),
    NetworkLcns(Vec<NetworkLcnRow>),
}

impl InsertBatch {
    pub fn name(&self) -> &'static str {
        match self {
            InsertBatch::Source => "source",
            InsertBatch::NetworkNames(_) => "network_info",
            InsertBatch::Tuning(_) => "tuning",
            InsertBatch::TransportServices(_) => "transport_services",
            InsertBatch::ServiceIds(_) => "service_ids",
            InsertBatch::ServiceNames(_) => "service_names",
            InsertBatch::ProviderNames(_) => "provider_names",
            InsertBatch::ServiceProviders(_) => "service_providers",
            InsertBatch::Regions(_) => "regions",
            InsertBatch::NetworkLcns(_) => "network_lcns",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            InsertBatch::Source => 1,
            InsertBatch::NetworkNames(rows) => rows.len(),
            InsertBatch::Tuning(rows) => rows.len(),
            InsertBatch::TransportServices(rows) => rows.len(),
            InsertBatch::ServiceIds(rows) => rows.len(),
            InsertBatch::ServiceNames(rows) => rows.len(),
            InsertBatch::ProviderNames(rows) => rows.len(),
            InsertBatch::ServiceProviders(rows) => rows.len(),
            InsertBatch::Regions(rows) => rows.len(),
            InsertBatch::NetworkLcns(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
