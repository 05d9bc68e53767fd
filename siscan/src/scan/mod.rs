//! Scanning engine.
//!
//! [`MultiScanner`] drives a sweep over tuning candidates, running a
//! [`ChannelScanner`] on each locked channel. Both are sans-IO: they act
//! through a [`Receiver`] and react to [`ScanEvent`]s, which
//! [`runner::run_sweep`] pumps from a channel.

mod channel;
mod data;
mod iterator;
mod multi;
mod platform;
mod receiver;
pub mod runner;

pub use channel::{ChannelOutcome, ChannelScanner, ChannelState, FilterStatus};
pub use data::{
    LcnKey, LcnValue, ScanData, ScanStatus, ServiceData, ServiceKey, TransportKey,
    TransportStreamData,
};
pub use iterator::{DvbtSweep, PresetList, TuningIterator, FREESAT_PRESETS};
pub use multi::{MultiScanner, ScanOptions, SweepCounts, SweepStatus};
pub use platform::{FilterSpec, HarvestPolicy, OnidLookup, Platform, PlatformKind, TableRole};
pub use receiver::{AttemptId, FilterId, FilterParams, Receiver, ScanEvent, SectionFilter};

#[cfg(test)]
pub(crate) mod testing {
    //! Receiver double that records requests and never emits events.

    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use siscan_tuning::TuningProperties;

    use super::{AttemptId, FilterId, FilterParams, Receiver, SectionFilter};
    use crate::error::{FilterError, ScanError};

    #[derive(Default)]
    pub struct FakeReceiver {
        pub unavailable: bool,
        pub fail_filters: bool,
        pub locked: Option<TuningProperties>,
        pub tunes: Vec<(AttemptId, TuningProperties)>,
        pub opened: Vec<(FilterId, FilterParams)>,
        pub stops: Arc<AtomicUsize>,
    }

    impl FakeReceiver {
        pub fn filter_ids(&self) -> Vec<FilterId> {
            self.opened.iter().map(|(id, _)| *id).collect()
        }

        pub fn last_attempt(&self) -> Option<AttemptId> {
            self.tunes.last().map(|(id, _)| *id)
        }

        pub fn stopped(&self) -> usize {
            self.stops.load(Ordering::SeqCst)
        }
    }

    struct FakeFilter {
        pub stops: Arc<AtomicUsize>,
    }

    impl SectionFilter for FakeFilter {
        fn stop(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Receiver for FakeReceiver {
        fn tune(
            &mut self,
            attempt: AttemptId,
            tuning: &TuningProperties,
            _timeout: Duration,
        ) -> Result<(), ScanError> {
            if self.unavailable {
                return Err(ScanError::DeviceUnavailable("/dev/dvb/adapter0".to_string()));
            }
            self.tunes.push((attempt, tuning.clone()));
            Ok(())
        }

        fn current_tuning(&self) -> Option<TuningProperties> {
            self.locked.clone()
        }

        fn open_filter(
            &mut self,
            id: FilterId,
            params: &FilterParams,
        ) -> Result<Box<dyn SectionFilter>, FilterError> {
            if self.fail_filters {
                return Err(FilterError::new(
                    params.pid,
                    params.table_id,
                    io::Error::new(io::ErrorKind::NotFound, "no demux"),
                ));
            }
            self.opened.push((id, *params));
            Ok(Box::new(FakeFilter {
                stops: self.stops.clone(),
            }))
        }
    }
}
