//! Sweep driver.
//!
//! Walks tuning candidates, runs a [`ChannelScanner`] on every channel that
//! locks and folds what the tables say into [`ScanData`]. Transports found
//! in network tables are preferred over static candidates, physical channels
//! are tuned at most once, and the harvest policy is checked before every
//! tune so a sweep stops as soon as it knows enough.

use std::collections::HashSet;
use std::mem;
use std::time::Duration;

use log::{debug, error, info, trace, warn};
use serde::Serialize;
use siscan_tuning::{EquivalenceKey, TuningProperties};

use super::channel::{ChannelOutcome, ChannelScanner};
use super::data::{ScanData, ScanStatus, ServiceData, ServiceKey, TransportKey, TransportStreamData};
use super::iterator::TuningIterator;
use super::platform::Platform;
use super::receiver::{AttemptId, Receiver, ScanEvent};
use crate::database::{
    InsertBatch, NetworkLcnRow, NetworkNameRow, RegionRow, ServiceIdRow, ServiceNameRow,
    ServiceProviderRow, StorageHandle, TransportServiceRow, TuningRow,
};
use crate::error::ScanError;

/// Overall result of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SweepStatus {
    /// Nothing found (yet).
    Blank,
    /// Some topology found, but no confirmation it is all of it.
    Partial,
    /// Harvest policy satisfied with at least one complete table.
    Complete,
    Cancelled,
    /// The tuning device was unusable.
    Failed,
}

/// Timeouts for one sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub tune_timeout: Duration,
    pub filter_timeout: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            tune_timeout: Duration::from_millis(5000),
            filter_timeout: Duration::from_millis(5000),
        }
    }
}

#[derive(Debug, Clone)]
struct Target {
    props: TuningProperties,
    equivalence: EquivalenceKey,
    transport: Option<TransportKey>,
}

#[derive(Debug)]
enum Phase {
    Idle,
    Tuning { attempt: AttemptId, target: Target },
    Scanning { target: Target },
    Finished,
}

/// Counters for progress reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepCounts {
    pub networks: usize,
    pub transports_pending: usize,
    pub transports_scanned: usize,
    pub transports_failed: usize,
    pub services: usize,
    pub channels_scanned: usize,
}

pub struct MultiScanner<R: Receiver> {
    receiver: R,
    platform: Platform,
    iterator: Box<dyn TuningIterator>,
    options: ScanOptions,
    channel: ChannelScanner,
    data: ScanData,
    attempted: HashSet<EquivalenceKey>,
    phase: Phase,
    status: SweepStatus,
    next_attempt: u64,
    channels_scanned: usize,
    any_complete: bool,
}

impl<R: Receiver> MultiScanner<R> {
    pub fn new(
        receiver: R,
        platform: Platform,
        iterator: Box<dyn TuningIterator>,
        options: ScanOptions,
    ) -> Self {
        let channel = ChannelScanner::new(&platform, options.filter_timeout);
        Self {
            receiver,
            platform,
            iterator,
            options,
            channel,
            data: ScanData::new(),
            attempted: HashSet::new(),
            phase: Phase::Idle,
            status: SweepStatus::Blank,
            next_attempt: 0,
            channels_scanned: 0,
            any_complete: false,
        }
    }

    /// Begin the sweep with the first candidate.
    pub fn start(&mut self) -> Result<(), ScanError> {
        info!(
            "Sweep: starting {} scan, policy {:?}",
            self.platform.kind, self.platform.policy
        );
        self.iterator.reset();
        self.advance()
    }

    /// Feed one collaborator event. Only a fatal condition is returned as an
    /// error; everything else moves the sweep on.
    pub fn handle_event(&mut self, event: ScanEvent) -> Result<(), ScanError> {
        match event {
            ScanEvent::Lock { attempt, locked } => {
                let target = match mem::replace(&mut self.phase, Phase::Idle) {
                    Phase::Tuning { attempt: current, target } if current == attempt => target,
                    other => {
                        trace!("Sweep: stale lock event for {}", attempt);
                        self.phase = other;
                        return Ok(());
                    }
                };
                if locked {
                    self.on_lock(target)
                } else {
                    self.on_no_lock(target)
                }
            }
            ScanEvent::Section { filter, result } => {
                if !matches!(self.phase, Phase::Scanning { .. }) {
                    trace!("Sweep: dropping section for {} outside a channel", filter);
                    return Ok(());
                }
                match self.channel.handle_section(filter, result, &mut self.data) {
                    ChannelOutcome::Running => Ok(()),
                    ChannelOutcome::Finished { success } => self.on_channel_finished(success),
                }
            }
            ScanEvent::Detuned => {
                if matches!(self.phase, Phase::Scanning { .. }) {
                    warn!("Sweep: detuned, abandoning channel");
                    let success = self.channel.success();
                    self.on_channel_finished(success)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// No event arrived for a while: treat a pending tune as no-lock and a
    /// running channel as detuned.
    pub fn on_stall(&mut self) -> Result<(), ScanError> {
        match &self.phase {
            Phase::Tuning { attempt, .. } => {
                let attempt = *attempt;
                warn!("Sweep: no lock report for {}", attempt);
                self.handle_event(ScanEvent::Lock {
                    attempt,
                    locked: false,
                })
            }
            Phase::Scanning { .. } => self.handle_event(ScanEvent::Detuned),
            Phase::Idle | Phase::Finished => Ok(()),
        }
    }

    /// Stop the sweep. Safe to call repeatedly.
    pub fn cancel(&mut self) {
        if matches!(self.phase, Phase::Finished) {
            return;
        }
        self.channel.cancel();
        self.data.end_channel();
        self.phase = Phase::Finished;
        self.status = SweepStatus::Cancelled;
        info!("Sweep: cancelled");
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Finished)
    }

    pub fn status(&self) -> SweepStatus {
        self.status
    }

    pub fn data(&self) -> &ScanData {
        &self.data
    }

    pub fn receiver(&self) -> &R {
        &self.receiver
    }

    pub fn receiver_mut(&mut self) -> &mut R {
        &mut self.receiver
    }

    pub fn counts(&self) -> SweepCounts {
        SweepCounts {
            networks: self.data.networks.len() + self.data.bouquets.len(),
            transports_pending: self.data.count_transports(ScanStatus::Pending),
            transports_scanned: self.data.count_transports(ScanStatus::Scanned),
            transports_failed: self.data.count_transports(ScanStatus::Failed),
            services: self.data.services.len(),
            channels_scanned: self.channels_scanned,
        }
    }

    pub fn transports(&self) -> impl Iterator<Item = (&TransportKey, &TransportStreamData)> + '_ {
        self.data.transports.iter()
    }

    pub fn services(&self) -> impl Iterator<Item = (&ServiceKey, &ServiceData)> + '_ {
        self.data.services.iter()
    }

    fn on_lock(&mut self, target: Target) -> Result<(), ScanError> {
        let tuning = self
            .receiver
            .current_tuning()
            .unwrap_or_else(|| target.props.clone());
        info!("Sweep: locked {}", tuning.describe());
        self.data.begin_channel(tuning);
        self.phase = Phase::Scanning { target };
        match self.channel.start(&mut self.receiver) {
            ChannelOutcome::Running => Ok(()),
            ChannelOutcome::Finished { success } => self.on_channel_finished(success),
        }
    }

    fn on_no_lock(&mut self, target: Target) -> Result<(), ScanError> {
        debug!("Sweep: no lock on {}", target.props.describe());
        self.settle(&target, ScanStatus::Failed);
        self.advance()
    }

    fn on_channel_finished(&mut self, success: bool) -> Result<(), ScanError> {
        self.channel.finish();
        self.data.end_channel();
        let target = match mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Scanning { target } => target,
            other => {
                self.phase = other;
                return Ok(());
            }
        };

        self.channels_scanned += 1;
        self.any_complete |= success;
        let counts = self.counts();
        info!(
            "Sweep: finished {} ({}), {} transports scanned, {} pending, {} services",
            target.props.describe(),
            if success { "complete" } else { "incomplete" },
            counts.transports_scanned,
            counts.transports_pending,
            counts.services
        );

        let status = if success {
            ScanStatus::Scanned
        } else {
            ScanStatus::Failed
        };
        self.settle(&target, status);
        if self.status == SweepStatus::Blank && !self.data.is_empty() {
            self.status = SweepStatus::Partial;
        }
        self.advance()
    }

    /// Mark pending transports on the target's physical channel.
    fn settle(&mut self, target: &Target, status: ScanStatus) {
        self.data.settle_equivalent(&target.props, status);
        if let Some(key) = target.transport {
            if self.data.transports.get(&key).map(|t| t.status) == Some(ScanStatus::Pending) {
                self.data.set_status(key, status);
            }
        }
    }

    fn harvest_satisfied(&self) -> bool {
        let policy = self.platform.policy;
        if policy.is_empty() {
            return false;
        }
        (!policy.at_least_two || (self.channels_scanned >= 2 && self.any_complete))
            && (!policy.all_discovered || self.data.all_discovered_scanned())
            && (!policy.all_services || self.data.all_services_found())
    }

    fn next_target(&mut self) -> Option<Target> {
        let pending: Vec<(TransportKey, TuningProperties)> = self
            .data
            .pending()
            .map(|(key, tuning)| (key, tuning.clone()))
            .collect();
        for (key, props) in pending {
            let equivalence = props.equivalence();
            if self.attempted.contains(&equivalence) {
                // its channel was tried and did not identify it
                debug!(
                    "Sweep: ts 0x{:04x}/0x{:04x} not found on {}",
                    key.onid,
                    key.tsid,
                    props.describe()
                );
                self.data.set_status(key, ScanStatus::Failed);
                continue;
            }
            return Some(Target {
                props,
                equivalence,
                transport: Some(key),
            });
        }

        for props in self.iterator.by_ref() {
            let equivalence = props.equivalence();
            if self.attempted.contains(&equivalence) {
                trace!("Sweep: skipping {}, already tried", props.describe());
                continue;
            }
            return Some(Target {
                props,
                equivalence,
                transport: None,
            });
        }
        None
    }

    fn advance(&mut self) -> Result<(), ScanError> {
        loop {
            if self.harvest_satisfied() {
                self.status = if self.any_complete {
                    SweepStatus::Complete
                } else {
                    SweepStatus::Partial
                };
                return self.finalize("harvest policy satisfied");
            }

            let Some(target) = self.next_target() else {
                self.status = if self.data.is_empty() {
                    SweepStatus::Blank
                } else {
                    SweepStatus::Partial
                };
                return self.finalize("candidates exhausted");
            };

            self.attempted.insert(target.equivalence);
            self.next_attempt += 1;
            let attempt = AttemptId(self.next_attempt);
            debug!("Sweep: {} tuning {}", attempt, target.props.describe());

            match self
                .receiver
                .tune(attempt, &target.props, self.options.tune_timeout)
            {
                Ok(()) => {
                    self.phase = Phase::Tuning { attempt, target };
                    return Ok(());
                }
                Err(e) if e.is_fatal() => {
                    error!("Sweep: {}", e);
                    self.phase = Phase::Finished;
                    self.status = SweepStatus::Failed;
                    return Err(e);
                }
                Err(e) => {
                    warn!("Sweep: {}", e);
                    self.settle(&target, ScanStatus::Failed);
                }
            }
        }
    }

    fn finalize(&mut self, reason: &str) -> Result<(), ScanError> {
        self.phase = Phase::Finished;
        let counts = self.counts();
        info!(
            "Sweep: {} -> {:?} ({} networks, {} transports, {} services, {} channels)",
            reason,
            self.status,
            counts.networks,
            counts.transports_scanned + counts.transports_pending + counts.transports_failed,
            counts.services,
            counts.channels_scanned
        );
        Ok(())
    }

    /// Flatten the aggregated topology into insert batches, in dependency order.
    pub fn batches(&self) -> Vec<InsertBatch> {
        let data = &self.data;

        let network_names = data
            .networks
            .iter()
            .chain(data.bouquets.iter())
            .map(|(id, name)| NetworkNameRow {
                network_id: *id,
                name: name.clone(),
            })
            .collect();

        let mut tuning = Vec::new();
        let mut transport_services = Vec::new();
        for (key, ts) in &data.transports {
            if let Some(props) = &ts.tuning {
                tuning.extend(props.iter().enumerate().map(|(position, (k, value))| TuningRow {
                    onid: key.onid,
                    tsid: key.tsid,
                    position: position as u32,
                    key: k.raw(),
                    value,
                }));
            }
            if let Some(network_id) = ts.network_id {
                transport_services.extend(ts.service_ids.iter().map(|&service_id| {
                    TransportServiceRow {
                        onid: key.onid,
                        network_id,
                        tsid: key.tsid,
                        service_id,
                    }
                }));
            }
        }

        let mut service_ids = Vec::new();
        let mut service_names = Vec::new();
        let mut providers = Vec::new();
        let mut service_providers = Vec::new();
        for (key, service) in &data.services {
            service_ids.push(ServiceIdRow {
                onid: key.onid,
                tsid: service.tsid,
                service_id: key.service_id,
                service_type: service.service_type,
                free_ca: service.free_ca,
            });
            if let Some(name) = &service.name {
                service_names.push(ServiceNameRow {
                    onid: key.onid,
                    service_id: key.service_id,
                    name: name.clone(),
                });
            }
            if let Some(provider) = &service.provider {
                if !providers.contains(provider) {
                    providers.push(provider.clone());
                }
                service_providers.push(ServiceProviderRow {
                    onid: key.onid,
                    service_id: key.service_id,
                    provider_name: provider.clone(),
                });
            }
        }

        let regions = data
            .regions
            .iter()
            .map(|(&(bouquet_id, region_code), name)| RegionRow {
                bouquet_id,
                region_code,
                name: name.clone(),
            })
            .collect();

        let network_lcns = data
            .lcns
            .iter()
            .map(|(key, value)| NetworkLcnRow {
                network_id: key.network_id,
                service_id: key.service_id,
                region_code: key.region_code,
                lcn: value.lcn,
                freesat_id: value.freesat_id,
            })
            .collect();

        vec![
            InsertBatch::Source,
            InsertBatch::NetworkNames(network_names),
            InsertBatch::Tuning(tuning),
            InsertBatch::TransportServices(transport_services),
            InsertBatch::ServiceIds(service_ids),
            InsertBatch::ServiceNames(service_names),
            InsertBatch::ProviderNames(providers),
            InsertBatch::ServiceProviders(service_providers),
            InsertBatch::Regions(regions),
            InsertBatch::NetworkLcns(network_lcns),
        ]
    }

    /// Write everything found to storage under `source` and wait for it.
    pub async fn commit(&self, storage: &StorageHandle, source: &str) -> Result<(), ScanError> {
        for batch in self.batches() {
            if batch.is_empty() {
                continue;
            }
            debug!("Sweep: committing {} {} rows", batch.len(), batch.name());
            storage.enqueue_insert(source, batch)?;
        }
        storage.drain().await?;
        info!("Sweep: committed to source {}", source);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Database, StorageWorker};
    use crate::scan::iterator::{DvbtSweep, PresetList};
    use crate::scan::testing::FakeReceiver;
    use crate::si::test_util::{build_section, network_payload, service_payload, terrestrial_578};
    use crate::si::{descriptor_tag, table_id};
    use bytes::Bytes;
    use siscan_tuning::TerrestrialParams;

    fn service_list(sids: &[u16]) -> Vec<u8> {
        sids.iter().flat_map(|sid| [(sid >> 8) as u8, *sid as u8, 0x01]).collect()
    }

    /// NIT on 578 MHz describing itself (0x1004) and 490 MHz (0x2005).
    fn nit() -> Bytes {
        let payload = network_payload(
            &[(descriptor_tag::NETWORK_NAME, b"London".to_vec())],
            &[
                (
                    0x1004,
                    0x233a,
                    vec![
                        (descriptor_tag::TERRESTRIAL_DELIVERY, terrestrial_578()),
                        (descriptor_tag::SERVICE_LIST, service_list(&[4171, 4172])),
                    ],
                ),
                (
                    0x2005,
                    0x233a,
                    vec![
                        (
                            descriptor_tag::TERRESTRIAL_DELIVERY,
                            vec![0x02, 0xeb, 0xae, 0x40, 0x1f, 0x81, 0x03, 0xff, 0xff, 0xff, 0xff],
                        ),
                        (descriptor_tag::SERVICE_LIST, service_list(&[8261])),
                    ],
                ),
            ],
        );
        Bytes::from(build_section(table_id::NIT_ACTUAL, 0x3001, 0, 0, 0, &payload))
    }

    fn sdt_actual(tsid: u16, sids: &[u16]) -> Bytes {
        let services: Vec<_> = sids.iter().map(|&sid| (sid, false, vec![])).collect();
        let payload = service_payload(0x233a, &services);
        Bytes::from(build_section(table_id::SDT_ACTUAL, tsid, 0, 0, 0, &payload))
    }

    fn scanner(iterator: Box<dyn TuningIterator>) -> MultiScanner<FakeReceiver> {
        MultiScanner::new(
            FakeReceiver::default(),
            Platform::standard(),
            iterator,
            ScanOptions::default(),
        )
    }

    /// Lock the pending attempt and deliver NIT, SDT actual and an SDT
    /// other timeout on the channel's three filters.
    fn scan_channel(scanner: &mut MultiScanner<FakeReceiver>, nit: Option<Bytes>, sdt: Bytes) {
        let attempt = scanner.receiver().last_attempt().unwrap();
        scanner
            .handle_event(ScanEvent::Lock { attempt, locked: true })
            .unwrap();
        let ids = scanner.receiver().filter_ids();
        let ids = &ids[ids.len() - 3..];
        let events = [(ids[0], nit), (ids[1], Some(sdt)), (ids[2], None)];
        for (filter, section) in events {
            scanner
                .handle_event(ScanEvent::Section {
                    filter,
                    result: Ok(section),
                })
                .unwrap();
        }
    }

    #[test]
    fn test_scan_all_discovered_finalizes() {
        let mut scanner = scanner(Box::new(DvbtSweep::new(34..=40)));
        scanner.start().unwrap();
        assert_eq!(scanner.receiver().tunes.len(), 1);

        // 578 MHz: NIT reveals 490 MHz as pending
        scan_channel(&mut scanner, Some(nit()), sdt_actual(0x1004, &[4171, 4172]));
        assert!(!scanner.is_finished());
        assert_eq!(scanner.counts().transports_pending, 1);
        let last = scanner.receiver().tunes.last().unwrap().1.clone();
        assert_eq!(last.frequency(), Some(490_000_000));

        // 490 MHz settles the last pending transport; no further tune
        scan_channel(&mut scanner, Some(nit()), sdt_actual(0x2005, &[8261]));
        assert!(scanner.is_finished());
        assert_eq!(scanner.status(), SweepStatus::Complete);
        assert_eq!(scanner.receiver().tunes.len(), 2);
        assert_eq!(scanner.counts().transports_scanned, 2);
    }

    fn sdt_other(tsid: u16, sids: &[u16]) -> Bytes {
        let services: Vec<_> = sids.iter().map(|&sid| (sid, false, vec![])).collect();
        let payload = service_payload(0x233a, &services);
        Bytes::from(build_section(table_id::SDT_OTHER, tsid, 0, 0, 0, &payload))
    }

    /// Lock the pending attempt and deliver one event per platform filter,
    /// in filter order; `None` stops the filter.
    fn lock_and_deliver(scanner: &mut MultiScanner<FakeReceiver>, sections: [Option<Bytes>; 3]) {
        let attempt = scanner.receiver().last_attempt().unwrap();
        scanner
            .handle_event(ScanEvent::Lock { attempt, locked: true })
            .unwrap();
        let ids = scanner.receiver().filter_ids();
        let ids = ids[ids.len() - 3..].to_vec();
        for (filter, section) in ids.into_iter().zip(sections) {
            scanner
                .handle_event(ScanEvent::Section {
                    filter,
                    result: Ok(section),
                })
                .unwrap();
        }
    }

    #[test]
    fn test_at_least_two_waits_for_second_transport() {
        let mut scanner = MultiScanner::new(
            FakeReceiver::default(),
            Platform::freesat(),
            Box::new(PresetList::freesat()),
            ScanOptions::default(),
        );
        scanner.start().unwrap();

        // NIT other, SDT other, BAT
        lock_and_deliver(&mut scanner, [None, Some(sdt_other(0x07d2, &[6301])), None]);
        assert!(!scanner.is_finished());
        assert_eq!(scanner.counts().channels_scanned, 1);
        assert_eq!(scanner.receiver().tunes.len(), 2);

        lock_and_deliver(&mut scanner, [None, Some(sdt_other(0x07d3, &[6302])), None]);
        assert!(scanner.is_finished());
        assert_eq!(scanner.status(), SweepStatus::Complete);
        assert_eq!(scanner.counts().channels_scanned, 2);
        assert_eq!(scanner.receiver().tunes.len(), 2);
    }

    #[test]
    fn test_at_least_two_needs_a_complete_table() {
        let mut scanner = MultiScanner::new(
            FakeReceiver::default(),
            Platform::freesat(),
            Box::new(PresetList::freesat()),
            ScanOptions::default(),
        );
        scanner.start().unwrap();

        lock_and_deliver(&mut scanner, [None, None, None]);
        lock_and_deliver(&mut scanner, [None, None, None]);
        assert!(!scanner.is_finished());
        assert_eq!(scanner.receiver().tunes.len(), 3);

        lock_and_deliver(&mut scanner, [None, Some(sdt_other(0x07d2, &[6301])), None]);
        assert!(scanner.is_finished());
        assert_eq!(scanner.status(), SweepStatus::Complete);
    }

    #[test]
    fn test_find_all_services_keeps_scanning() {
        let mut scanner = MultiScanner::new(
            FakeReceiver::default(),
            Platform::freeview(),
            Box::new(DvbtSweep::new(34..=40)),
            ScanOptions::default(),
        );
        scanner.start().unwrap();

        // the NIT lists 4172 but this transport's SDT only carries 4171
        let nit = network_payload(
            &[],
            &[(
                0x1004,
                0x233a,
                vec![
                    (descriptor_tag::TERRESTRIAL_DELIVERY, terrestrial_578()),
                    (descriptor_tag::SERVICE_LIST, service_list(&[4171, 4172])),
                ],
            )],
        );
        let nit = Bytes::from(build_section(table_id::NIT_ACTUAL, 0x3001, 0, 0, 0, &nit));
        lock_and_deliver(&mut scanner, [Some(nit), Some(sdt_actual(0x1004, &[4171])), None]);
        assert!(!scanner.is_finished());
        assert_eq!(scanner.counts().transports_pending, 0);
        assert_eq!(scanner.receiver().tunes.len(), 2);

        // a T2 multiplex the NIT does not describe carries the missing service
        lock_and_deliver(&mut scanner, [None, Some(sdt_actual(0x3006, &[4172])), None]);
        assert!(scanner.is_finished());
        assert_eq!(scanner.status(), SweepStatus::Complete);
        assert_eq!(scanner.receiver().tunes.len(), 2);
    }

    #[test]
    fn test_pending_transport_blocks_harvest() {
        let mut scanner = scanner(Box::new(DvbtSweep::new(34..=40)));
        scanner.start().unwrap();
        scan_channel(&mut scanner, Some(nit()), sdt_actual(0x1004, &[4171, 4172]));
        assert!(!scanner.is_finished());
        let pending = scanner
            .transports()
            .filter(|(_, ts)| ts.status == ScanStatus::Pending)
            .count();
        assert_eq!(pending, 1);
    }

    #[test]
    fn test_no_lock_advances_and_exhausts() {
        let mut scanner = scanner(Box::new(DvbtSweep::new(21..=22)));
        scanner.start().unwrap();
        for _ in 0..2 {
            let attempt = scanner.receiver().last_attempt().unwrap();
            scanner
                .handle_event(ScanEvent::Lock { attempt, locked: false })
                .unwrap();
        }
        assert!(scanner.is_finished());
        assert_eq!(scanner.status(), SweepStatus::Blank);
    }

    #[test]
    fn test_stale_lock_ignored() {
        let mut scanner = scanner(Box::new(DvbtSweep::new(21..=22)));
        scanner.start().unwrap();
        scanner
            .handle_event(ScanEvent::Lock {
                attempt: AttemptId(99),
                locked: false,
            })
            .unwrap();
        assert_eq!(scanner.receiver().tunes.len(), 1);
    }

    #[test]
    fn test_equivalent_candidates_tuned_once() {
        let tuning = |hz| TuningProperties::terrestrial(&TerrestrialParams::auto(hz, 8_000_000));
        let presets = PresetList::new(vec![
            tuning(578_000_000),
            tuning(578_166_000),
            tuning(586_000_000),
        ]);
        let mut scanner = scanner(Box::new(presets));
        scanner.start().unwrap();
        let attempt = scanner.receiver().last_attempt().unwrap();
        scanner
            .handle_event(ScanEvent::Lock { attempt, locked: false })
            .unwrap();
        let tuned: Vec<_> = scanner
            .receiver()
            .tunes
            .iter()
            .map(|(_, t)| t.frequency().unwrap())
            .collect();
        assert_eq!(tuned, vec![578_000_000, 586_000_000]);
    }

    #[test]
    fn test_device_unavailable_is_fatal() {
        let mut scanner = MultiScanner::new(
            FakeReceiver {
                unavailable: true,
                ..FakeReceiver::default()
            },
            Platform::standard(),
            Box::new(DvbtSweep::default()),
            ScanOptions::default(),
        );
        assert!(matches!(scanner.start(), Err(ScanError::DeviceUnavailable(_))));
        assert_eq!(scanner.status(), SweepStatus::Failed);
        assert!(scanner.is_finished());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut scanner = scanner(Box::new(DvbtSweep::default()));
        scanner.start().unwrap();
        let attempt = scanner.receiver().last_attempt().unwrap();
        scanner
            .handle_event(ScanEvent::Lock { attempt, locked: true })
            .unwrap();
        scanner.cancel();
        scanner.cancel();
        assert_eq!(scanner.status(), SweepStatus::Cancelled);
        assert_eq!(scanner.receiver().stopped(), 3);
    }

    #[test]
    fn test_detuned_finishes_channel() {
        let mut scanner = scanner(Box::new(DvbtSweep::new(34..=35)));
        scanner.start().unwrap();
        let attempt = scanner.receiver().last_attempt().unwrap();
        scanner
            .handle_event(ScanEvent::Lock { attempt, locked: true })
            .unwrap();
        scanner.handle_event(ScanEvent::Detuned).unwrap();
        assert_eq!(scanner.receiver().tunes.len(), 2);
        assert_eq!(scanner.counts().channels_scanned, 1);
    }

    #[tokio::test]
    async fn test_commit_writes_topology() {
        let mut scanner = scanner(Box::new(DvbtSweep::new(34..=40)));
        scanner.start().unwrap();
        scan_channel(&mut scanner, Some(nit()), sdt_actual(0x1004, &[4171, 4172]));

        let worker = StorageWorker::spawn(Database::open_in_memory().unwrap()).unwrap();
        let storage = worker.handle();
        scanner.commit(&storage, "dvbt").await.unwrap();

        let (network, tuning, sources) = storage
            .query(|db| {
                Ok((
                    db.network_id_by_name("dvbt", "London")?,
                    db.tuning("dvbt", 0x233a, 0x1004)?,
                    db.source_names()?,
                ))
            })
            .await
            .unwrap();
        assert_eq!(network, Some(0x3001));
        assert_eq!(tuning.unwrap().frequency(), Some(578_000_000));
        assert_eq!(sources, vec!["dvbt"]);
        assert_eq!(
            storage
                .query(|db| db.onid_by_network_and_service("dvbt", 0x3001, 8261))
                .await
                .unwrap(),
            Some(0x233a)
        );
    }
}
